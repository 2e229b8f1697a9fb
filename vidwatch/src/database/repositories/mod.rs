//! Repository layer for database access.

pub mod account;

pub use account::*;
