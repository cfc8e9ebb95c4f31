//! Asset universe: the fixed instrument lists the engine scans.
//!
//! Lists keep their configured order; that order is the scan order used for
//! tie-breaking in regime and candidate selection.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetUniverse {
    /// Broad-market instrument driving the regime.
    pub benchmark: String,
    /// Monitored for distress, never traded.
    pub canaries: Vec<String>,
    /// Refuge instruments scanned in DEFENSE.
    pub defense: Vec<String>,
    pub growth: Vec<String>,
    pub sectors: Vec<String>,
    /// Risk-free placeholder; fallback defense asset, never auto-traded.
    pub cash_symbol: String,
    /// Cash-like instruments excluded from ATTACK candidates.
    pub cash_equivalents: Vec<String>,
}

impl Default for AssetUniverse {
    fn default() -> Self {
        let list = |s: &[&str]| s.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        AssetUniverse {
            benchmark: "SPY".into(),
            canaries: list(&["EEM", "AGG"]),
            defense: list(&["IEF", "BIL", "GLD", "UUP"]),
            growth: list(&[
                "NVDA", "MSFT", "META", "AMZN", "GOOGL", "AAPL", "TSLA", "AVGO", "AMD", "PLTR",
                "MSTR", "COIN", "SMCI", "NET", "CRWD", "UBER", "DKNG", "APP", "DDOG", "CELH",
                "NOW", "ARM", "RDDT",
            ]),
            sectors: Vec::new(),
            cash_symbol: "BIL".into(),
            cash_equivalents: list(&["BIL", "IEF"]),
        }
    }
}

impl AssetUniverse {
    /// Growth ∪ sectors in scan order, minus canaries and cash equivalents.
    pub fn attack_candidates(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.growth
            .iter()
            .chain(self.sectors.iter())
            .filter(|t| !self.is_reserved(t))
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    fn is_reserved(&self, ticker: &str) -> bool {
        self.canaries.iter().any(|c| c == ticker)
            || self.cash_equivalents.iter().any(|c| c == ticker)
    }

    /// Every instrument the engine may read, deduplicated, benchmark first.
    pub fn all_tickers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::iter::once(&self.benchmark)
            .chain(self.canaries.iter())
            .chain(self.defense.iter())
            .chain(self.growth.iter())
            .chain(self.sectors.iter())
            .chain(std::iter::once(&self.cash_symbol))
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.all_tickers().len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Parse a comma-separated ticker list. An empty (or all-blank) input is an
/// empty list; a blank token between commas is an error.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}
