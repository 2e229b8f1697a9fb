//! Service layer module.
//!
//! This module provides the service container that wires the application
//! together and owns its shared resources.

pub mod container;

pub use container::ServiceContainer;
