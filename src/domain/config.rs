//! Immutable run configuration built from a [`ConfigPort`].
//!
//! Every key is optional; absent keys take the reference defaults carried by
//! each parameter struct's `Default`. Parsing errors name the section and key.

use crate::domain::allocation::AllocationParams;
use crate::domain::error::TacticianError;
use crate::domain::rebalance::RebalanceParams;
use crate::domain::regime::RegimeParams;
use crate::domain::signal::MomentumParams;
use crate::domain::simulation::SimulationConfig;
use crate::domain::universe::{AssetUniverse, parse_tickers};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Parameters the decision engine and diff engine run with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub universe: AssetUniverse,
    pub momentum: MomentumParams,
    pub regime: RegimeParams,
    pub allocation: AllocationParams,
    pub rebalance: RebalanceParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    /// File holding the date of the last completed live cycle.
    pub run_marker: PathBuf,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            run_marker: PathBuf::from(".tactician_last_run"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// Directory of `<TICKER>.csv` price files.
    pub directory: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            directory: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub simulation: SimulationConfig,
    pub live: LiveConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn from_config_port(config: &dyn ConfigPort) -> Result<Self, TacticianError> {
        Ok(AppConfig {
            engine: EngineConfig::from_config_port(config)?,
            simulation: simulation_config(config)?,
            live: LiveConfig {
                run_marker: config
                    .get_string("live", "run_marker")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| LiveConfig::default().run_marker),
            },
            data: DataConfig {
                directory: config
                    .get_string("data", "directory")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| DataConfig::default().directory),
            },
        })
    }
}

impl EngineConfig {
    pub fn from_config_port(config: &dyn ConfigPort) -> Result<Self, TacticianError> {
        Ok(EngineConfig {
            universe: universe(config)?,
            momentum: momentum(config)?,
            regime: regime(config)?,
            allocation: allocation(config)?,
            rebalance: rebalance(config)?,
        })
    }
}

fn universe(config: &dyn ConfigPort) -> Result<AssetUniverse, TacticianError> {
    let d = AssetUniverse::default();
    let list = |key: &str, default: Vec<String>| -> Result<Vec<String>, TacticianError> {
        match config.get_string("universe", key) {
            Some(raw) => parse_tickers(&raw).map_err(|e| TacticianError::invalid("universe", key, e.to_string())),
            None => Ok(default),
        }
    };
    let symbol = |key: &str, default: String| {
        config
            .get_string("universe", key)
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(default)
    };

    Ok(AssetUniverse {
        benchmark: symbol("benchmark", d.benchmark),
        canaries: list("canaries", d.canaries)?,
        defense: list("defense", d.defense)?,
        growth: list("growth", d.growth)?,
        sectors: list("sectors", d.sectors)?,
        cash_symbol: symbol("cash_symbol", d.cash_symbol),
        cash_equivalents: list("cash_equivalents", d.cash_equivalents)?,
    })
}

fn momentum(config: &dyn ConfigPort) -> Result<MomentumParams, TacticianError> {
    let d = MomentumParams::default();
    let windows = match config.get_list("momentum", "windows") {
        Some(tokens) => {
            let parsed = tokens
                .iter()
                .map(|t| t.parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| TacticianError::invalid("momentum", "windows", "expected non-negative integers"))?;
            <[usize; 4]>::try_from(parsed)
                .map_err(|_| TacticianError::invalid("momentum", "windows", "expected exactly 4 windows"))?
        }
        None => d.windows,
    };
    let weights = match config.get_list("momentum", "weights") {
        Some(tokens) => {
            let parsed = tokens
                .iter()
                .map(|t| t.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| TacticianError::invalid("momentum", "weights", "expected numbers"))?;
            <[f64; 4]>::try_from(parsed)
                .map_err(|_| TacticianError::invalid("momentum", "weights", "expected exactly 4 weights"))?
        }
        None => d.weights,
    };
    Ok(MomentumParams { windows, weights })
}

fn regime(config: &dyn ConfigPort) -> Result<RegimeParams, TacticianError> {
    let d = RegimeParams::default();
    Ok(RegimeParams {
        trend_window: get_usize(config, "regime", "trend_window", d.trend_window)?,
        defense_lookback: get_usize(config, "regime", "defense_lookback", d.defense_lookback)?,
    })
}

fn allocation(config: &dyn ConfigPort) -> Result<AllocationParams, TacticianError> {
    let d = AllocationParams::default();
    let s = "allocation";
    Ok(AllocationParams {
        lookback: get_usize(config, s, "lookback", d.lookback)?,
        volatility_window: get_usize(config, s, "volatility_window", d.volatility_window)?,
        slots: get_usize(config, s, "slots", d.slots)?,
        target_volatility: config.get_double(s, "target_volatility", d.target_volatility),
        max_weight: config.get_double(s, "max_weight", d.max_weight),
        breakout_window: get_usize(config, s, "breakout_window", d.breakout_window)?,
        breakout_threshold: config.get_double(s, "breakout_threshold", d.breakout_threshold),
        breakout_boost: config.get_double(s, "breakout_boost", d.breakout_boost),
        atr_window: get_usize(config, s, "atr_window", d.atr_window)?,
    })
}

fn rebalance(config: &dyn ConfigPort) -> Result<RebalanceParams, TacticianError> {
    let d = RebalanceParams::default();
    let s = "rebalance";
    Ok(RebalanceParams {
        tolerance: config.get_double(s, "tolerance", d.tolerance),
        cost_rate: config.get_double(s, "cost_rate", d.cost_rate),
        min_buy: config.get_double(s, "min_buy", d.min_buy),
        min_order: config.get_double(s, "min_order", d.min_order),
        buying_power_haircut: config.get_double(s, "buying_power_haircut", d.buying_power_haircut),
        settle_millis: get_usize(config, s, "settle_millis", d.settle_millis as usize)? as u64,
    })
}

fn simulation_config(config: &dyn ConfigPort) -> Result<SimulationConfig, TacticianError> {
    let d = SimulationConfig::default();
    Ok(SimulationConfig {
        initial_capital: config.get_double("simulation", "initial_capital", d.initial_capital),
        warmup: get_usize(config, "simulation", "warmup", d.warmup)?,
        start_date: get_date(config, "simulation", "start_date")?,
        end_date: get_date(config, "simulation", "end_date")?,
    })
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, TacticianError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| TacticianError::invalid(section, key, format!("{key} must be non-negative")))
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn get_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>, TacticianError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| TacticianError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn load(content: &str) -> Result<AppConfig, TacticianError> {
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        AppConfig::from_config_port(&adapter)
    }

    #[test]
    fn empty_config_takes_defaults() {
        let config = load("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.engine.universe.benchmark, "SPY");
        assert_eq!(config.engine.allocation.slots, 3);
        assert!((config.engine.rebalance.tolerance - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.simulation.warmup, 252);
    }

    #[test]
    fn overrides_are_read() {
        let config = load(
            r#"
[universe]
benchmark = qqq
growth = aaa, bbb
sectors = xle

[momentum]
windows = 5,10,20,40
weights = 1, 1, 1, 1

[allocation]
slots = 2
max_weight = 0.5

[rebalance]
settle_millis = 0

[simulation]
initial_capital = 5000
start_date = 2021-01-04

[data]
directory = /tmp/prices
"#,
        )
        .unwrap();
        assert_eq!(config.engine.universe.benchmark, "QQQ");
        assert_eq!(config.engine.universe.growth, vec!["AAA", "BBB"]);
        assert_eq!(config.engine.universe.sectors, vec!["XLE"]);
        assert_eq!(config.engine.momentum.windows, [5, 10, 20, 40]);
        assert_eq!(config.engine.allocation.slots, 2);
        assert!((config.engine.allocation.max_weight - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.engine.rebalance.settle_millis, 0);
        assert!((config.simulation.initial_capital - 5000.0).abs() < f64::EPSILON);
        assert_eq!(config.simulation.start_date, NaiveDate::from_ymd_opt(2021, 1, 4));
        assert_eq!(config.data.directory, PathBuf::from("/tmp/prices"));
    }

    #[test]
    fn wrong_window_count_is_invalid() {
        let err = load("[momentum]\nwindows = 21,63\n").unwrap_err();
        assert!(matches!(err, TacticianError::ConfigInvalid { key, .. } if key == "windows"));
    }

    #[test]
    fn non_numeric_weight_is_invalid() {
        let err = load("[momentum]\nweights = 1,2,x,4\n").unwrap_err();
        assert!(matches!(err, TacticianError::ConfigInvalid { key, .. } if key == "weights"));
    }

    #[test]
    fn duplicate_ticker_is_invalid() {
        let err = load("[universe]\ngrowth = NVDA,nvda\n").unwrap_err();
        assert!(matches!(err, TacticianError::ConfigInvalid { key, .. } if key == "growth"));
    }

    #[test]
    fn negative_window_is_invalid() {
        let err = load("[regime]\ntrend_window = -5\n").unwrap_err();
        assert!(matches!(err, TacticianError::ConfigInvalid { key, .. } if key == "trend_window"));
    }

    #[test]
    fn bad_date_is_invalid() {
        let err = load("[simulation]\nend_date = 2024/01/01\n").unwrap_err();
        assert!(matches!(err, TacticianError::ConfigInvalid { key, .. } if key == "end_date"));
    }
}
