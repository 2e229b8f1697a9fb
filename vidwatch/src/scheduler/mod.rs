//! Scheduler module for driving account checks.
//!
//! The Scheduler is responsible for:
//! - Starting a check cycle on a fixed interval
//! - Staggering the cycle's checks evenly across the spread window
//! - Skipping an account whose previous check is still running
//! - Announcing new items exactly once through the ledger gate
//! - Draining in-flight checks on shutdown

mod clock;
mod guard;
mod plan;
mod service;

pub use clock::{Clock, TokioClock};
pub use guard::{CheckState, InFlightGuard, InFlightTicket};
pub use plan::{TimerQueue, per_account_delay, stagger_offsets};
pub use service::{CheckOutcome, Scheduler, SchedulerConfig};

use async_trait::async_trait;

use crate::Result;
use crate::domain::Account;

/// Source of the tracked account list.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Snapshot of all accounts, ordered by id.
    async fn list(&self) -> Result<Vec<Account>>;
}
