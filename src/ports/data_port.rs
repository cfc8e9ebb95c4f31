//! Price data port trait.

use crate::domain::error::TacticianError;
use crate::domain::price_panel::PricePanel;
use chrono::NaiveDate;

pub trait PriceProvider {
    /// Aligned, filled panel for the universe, truncated after `as_of` when
    /// given.
    fn get_panel(&self, as_of: Option<NaiveDate>) -> Result<PricePanel, TacticianError>;
}
