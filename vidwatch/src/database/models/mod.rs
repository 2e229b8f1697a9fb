//! Database models.

mod account;
mod seen;

pub use account::AccountDbModel;
pub use seen::SeenContentDbModel;
