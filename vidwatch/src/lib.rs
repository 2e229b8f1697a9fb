//! vidwatch library crate.
//!
//! Watches accounts on several video platforms and posts one Discord
//! notification per newly published item.

pub mod accounts;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod services;
pub mod utils;

pub use error::{Error, Result};
