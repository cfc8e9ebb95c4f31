//! Once-per-day idempotency gate.

use crate::domain::error::TacticianError;
use chrono::NaiveDate;

pub trait RunGate {
    fn already_ran(&self, date: NaiveDate) -> Result<bool, TacticianError>;
    fn mark_done(&mut self, date: NaiveDate) -> Result<(), TacticianError>;
}
