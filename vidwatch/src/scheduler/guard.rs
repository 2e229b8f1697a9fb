use std::sync::Arc;

use dashmap::DashSet;

/// Lifecycle of one account's check as seen by the overlap guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CheckState {
    Idle,
    InFlight,
}

/// Prevents two checks of the same account from running at once.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    in_flight: Arc<DashSet<i64>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `account_id` in flight. Returns `None` when it already is.
    pub fn try_acquire(&self, account_id: i64) -> Option<InFlightTicket> {
        self.in_flight.insert(account_id).then(|| InFlightTicket {
            account_id,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn state(&self, account_id: i64) -> CheckState {
        if self.in_flight.contains(&account_id) {
            CheckState::InFlight
        } else {
            CheckState::Idle
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Held for the duration of a check; returns the account to idle when dropped,
/// including during a panic unwind.
#[derive(Debug)]
pub struct InFlightTicket {
    account_id: i64,
    in_flight: Arc<DashSet<i64>>,
}

impl InFlightTicket {
    pub fn account_id(&self) -> i64 {
        self.account_id
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.in_flight.remove(&self.account_id);
    }
}
