//! Aligned multi-instrument price panel and point-in-time views.
//!
//! A [`PricePanel`] owns one column set per instrument, all aligned on the
//! unified timeline. Engine components never see the panel directly: they get a
//! [`PanelView`], a borrowed prefix ending at the evaluation date. A view only
//! exposes an instrument from its first real bar onward, so the padding ahead
//! of a late listing never leaks a future close into an earlier date.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use log::warn;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceColumns {
    /// Row of the first real bar; earlier rows are padding.
    pub first_row: usize,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

impl PriceColumns {
    fn with_capacity(first_row: usize, n: usize) -> Self {
        PriceColumns {
            first_row,
            open: Vec::with_capacity(n),
            high: Vec::with_capacity(n),
            low: Vec::with_capacity(n),
            close: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, bar: &OhlcvBar) {
        let or_close = |v: f64| if v.is_finite() && v > 0.0 { v } else { bar.close };
        self.open.push(or_close(bar.open));
        self.high.push(or_close(bar.high));
        self.low.push(or_close(bar.low));
        self.close.push(bar.close);
    }

    fn truncate(&mut self, len: usize) {
        self.open.truncate(len);
        self.high.truncate(len);
        self.low.truncate(len);
        self.close.truncate(len);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    date_index: HashMap<NaiveDate, usize>,
    series: BTreeMap<String, PriceColumns>,
}

/// Sorted union of every date present in any instrument.
pub fn build_unified_timeline<'a, I>(bars: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a Vec<OhlcvBar>>,
{
    let unique_dates: BTreeSet<NaiveDate> = bars
        .into_iter()
        .flat_map(|series| series.iter().map(|bar| bar.date))
        .collect();
    unique_dates.into_iter().collect()
}

impl PricePanel {
    /// Align per-instrument bars on the unified timeline.
    ///
    /// Bars with an unusable close count as missing. Each instrument is
    /// forward-filled from its first valid bar; rows before that bar are
    /// padded for alignment and hidden from every view. Instruments without a
    /// single valid close are dropped.
    pub fn from_bars(bars_by_ticker: BTreeMap<String, Vec<OhlcvBar>>) -> Self {
        let dates = build_unified_timeline(bars_by_ticker.values());
        let mut series = BTreeMap::new();

        for (ticker, bars) in &bars_by_ticker {
            let by_date: HashMap<NaiveDate, &OhlcvBar> = bars
                .iter()
                .filter(|b| b.has_valid_close())
                .map(|b| (b.date, b))
                .collect();

            let Some((first_row, first_valid)) = dates
                .iter()
                .enumerate()
                .find_map(|(i, d)| by_date.get(d).map(|b| (i, *b)))
            else {
                warn!("dropping {ticker}: no valid closes");
                continue;
            };

            let mut columns = PriceColumns::with_capacity(first_row, dates.len());
            let mut last = first_valid;
            for date in &dates {
                if let Some(bar) = by_date.get(date).copied() {
                    last = bar;
                }
                columns.push(last);
            }
            series.insert(ticker.clone(), columns);
        }

        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        PricePanel {
            dates,
            date_index,
            series,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.series.contains_key(ticker)
    }

    pub fn date_position(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// View over rows `[0, index]`.
    pub fn view_through(&self, index: usize) -> Option<PanelView<'_>> {
        (index < self.dates.len()).then_some(PanelView {
            panel: self,
            end: index + 1,
        })
    }

    /// View over the whole panel (live mode).
    pub fn latest(&self) -> Option<PanelView<'_>> {
        self.dates.len().checked_sub(1).and_then(|i| self.view_through(i))
    }

    /// View ending at the last date on or before `date`.
    pub fn view_as_of(&self, date: NaiveDate) -> Option<PanelView<'_>> {
        let end = self.dates.partition_point(|d| *d <= date);
        end.checked_sub(1).and_then(|i| self.view_through(i))
    }

    /// Drop every row after `date`.
    pub fn truncate_as_of(mut self, date: NaiveDate) -> Self {
        let end = self.dates.partition_point(|d| *d <= date);
        self.dates.truncate(end);
        self.date_index.retain(|_, i| *i < end);
        self.series.retain(|_, columns| columns.first_row < end);
        for columns in self.series.values_mut() {
            columns.truncate(end);
        }
        self
    }
}

/// Borrowed prefix of a [`PricePanel`]; the last row is the evaluation date.
#[derive(Debug, Clone, Copy)]
pub struct PanelView<'a> {
    panel: &'a PricePanel,
    end: usize,
}

impl<'a> PanelView<'a> {
    pub fn date(&self) -> NaiveDate {
        self.panel.dates[self.end - 1]
    }

    pub fn index(&self) -> usize {
        self.end - 1
    }

    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// Listed on or before the view date.
    pub fn contains(&self, ticker: &str) -> bool {
        self.listed(ticker).is_some()
    }

    fn listed(&self, ticker: &str) -> Option<&'a PriceColumns> {
        self.panel
            .series
            .get(ticker)
            .filter(|c| c.first_row < self.end)
    }

    /// Real history only: starts at the instrument's first bar.
    pub fn closes(&self, ticker: &str) -> Option<&'a [f64]> {
        self.listed(ticker).map(|c| &c.close[c.first_row..self.end])
    }

    pub fn highs(&self, ticker: &str) -> Option<&'a [f64]> {
        self.listed(ticker).map(|c| &c.high[c.first_row..self.end])
    }

    pub fn lows(&self, ticker: &str) -> Option<&'a [f64]> {
        self.listed(ticker).map(|c| &c.low[c.first_row..self.end])
    }

    /// Latest usable close, `None` if the instrument is absent or the price
    /// is not finite and positive.
    pub fn last_close(&self, ticker: &str) -> Option<f64> {
        self.closes(ticker)
            .and_then(|c| c.last().copied())
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Latest usable close of every instrument.
    pub fn latest_prices(&self) -> BTreeMap<String, f64> {
        self.panel
            .series
            .keys()
            .filter_map(|t| self.last_close(t).map(|p| (t.clone(), p)))
            .collect()
    }
}
