//! CSV file adapters: per-ticker price files, holdings snapshots and the
//! simulation history.

use crate::domain::error::TacticianError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_panel::PricePanel;
use crate::domain::rebalance::Holdings;
use crate::domain::simulation::SimulationPoint;
use crate::ports::data_port::PriceProvider;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads `<TICKER>.csv` files with header `date,open,high,low,close[,volume]`.
pub struct CsvPriceAdapter {
    base_path: PathBuf,
    tickers: Vec<String>,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf, tickers: Vec<String>) -> Self {
        Self { base_path, tickers }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    /// Bars sorted by date, `None` when the file does not exist.
    pub fn read_bars(&self, ticker: &str) -> Result<Option<Vec<OhlcvBar>>, TacticianError> {
        let path = self.csv_path(ticker);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TacticianError::Data {
                reason: format!("{}: CSV parse error: {e}", path.display()),
            })?;
            let at = |field: &str| format!("{} row {}: {field}", path.display(), line + 1);

            let date_str = record.get(0).ok_or_else(|| TacticianError::Data {
                reason: at("missing date column"),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                TacticianError::Data {
                    reason: at(&format!("invalid date {date_str:?}: {e}")),
                }
            })?;

            let close = parse_price(record.get(4)).ok_or_else(|| TacticianError::Data {
                reason: at("missing or invalid close"),
            })?;

            bars.push(OhlcvBar {
                ticker: ticker.to_string(),
                date,
                open: parse_price(record.get(1)).unwrap_or(f64::NAN),
                high: parse_price(record.get(2)).unwrap_or(f64::NAN),
                low: parse_price(record.get(3)).unwrap_or(f64::NAN),
                close,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(Some(bars))
    }
}

/// Empty or unparseable fields are `None`; `NaN` text parses to NaN.
fn parse_price(field: Option<&str>) -> Option<f64> {
    field.map(str::trim).filter(|s| !s.is_empty())?.parse().ok()
}

impl PriceProvider for CsvPriceAdapter {
    fn get_panel(&self, as_of: Option<NaiveDate>) -> Result<PricePanel, TacticianError> {
        let mut bars_by_ticker = BTreeMap::new();

        for ticker in &self.tickers {
            let Some(mut bars) = self.read_bars(ticker)? else {
                warn!("no price file for {ticker} in {}", self.base_path.display());
                continue;
            };
            if let Some(limit) = as_of {
                bars.retain(|b| b.date <= limit);
            }
            if bars.is_empty() {
                warn!("no bars for {ticker}");
                continue;
            }
            bars_by_ticker.insert(ticker.clone(), bars);
        }

        let panel = PricePanel::from_bars(bars_by_ticker);
        if panel.is_empty() || panel.tickers().next().is_none() {
            return Err(TacticianError::NoData {
                ticker: self.tickers.first().cloned().unwrap_or_default(),
            });
        }
        info!(
            "loaded {} instruments over {} dates from {}",
            panel.tickers().count(),
            panel.len(),
            self.base_path.display()
        );
        Ok(panel)
    }
}

/// Read a `ticker,market_value` snapshot.
pub fn read_holdings(path: &Path) -> Result<Holdings, TacticianError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| TacticianError::Io(e.into()))?;
    let mut holdings = Holdings::new();

    for result in rdr.records() {
        let record = result.map_err(|e| TacticianError::Data {
            reason: format!("{}: CSV parse error: {e}", path.display()),
        })?;
        let ticker = record.get(0).map(|t| t.trim().to_uppercase()).unwrap_or_default();
        if ticker.is_empty() {
            return Err(TacticianError::Data {
                reason: format!("{}: empty ticker", path.display()),
            });
        }
        let value: f64 = record
            .get(1)
            .and_then(|v| v.trim().parse().ok())
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| TacticianError::Data {
                reason: format!("{}: invalid market value for {ticker}", path.display()),
            })?;
        if holdings.insert(ticker.clone(), value).is_some() {
            return Err(TacticianError::Data {
                reason: format!("{}: duplicate ticker {ticker}", path.display()),
            });
        }
    }

    Ok(holdings)
}

/// Write `date,equity,regime,benchmark` rows.
pub fn write_history(path: &Path, points: &[SimulationPoint]) -> Result<(), TacticianError> {
    let io = |e: csv::Error| TacticianError::Io(e.into());
    let mut wtr = csv::Writer::from_path(path).map_err(io)?;
    wtr.write_record(["date", "equity", "regime", "benchmark"]).map_err(io)?;
    for point in points {
        wtr.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", point.equity),
            point.regime.to_string(),
            point.benchmark_price.map(|p| format!("{p:.4}")).unwrap_or_default(),
        ])
        .map_err(io)?;
    }
    wtr.flush()?;
    Ok(())
}
