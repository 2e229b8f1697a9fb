//! Domain types shared by the monitors, the ledger and the scheduler.

mod account;
mod content;
mod platform;

pub use account::Account;
pub use content::{ContentItem, NotificationPayload, UNKNOWN};
pub use platform::Platform;
