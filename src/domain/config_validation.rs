//! Configuration validation.
//!
//! Range checks on a parsed [`AppConfig`], run before any simulation or live
//! cycle. Errors name the offending section and key.

use crate::domain::config::{AppConfig, EngineConfig};
use crate::domain::error::TacticianError;
use crate::domain::simulation::SimulationConfig;
use crate::ports::config_port::ConfigPort;

/// Parse and validate in one step.
pub fn load_config(config: &dyn ConfigPort) -> Result<AppConfig, TacticianError> {
    let app = AppConfig::from_config_port(config)?;
    validate_config(&app)?;
    Ok(app)
}

pub fn validate_config(config: &AppConfig) -> Result<(), TacticianError> {
    validate_engine_config(&config.engine)?;
    validate_simulation(&config.simulation, config.engine.momentum.longest_window())?;
    Ok(())
}

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), TacticianError> {
    validate_universe(config)?;
    validate_momentum(config)?;
    validate_regime(config)?;
    validate_allocation(config)?;
    validate_rebalance(config)?;
    Ok(())
}

fn validate_universe(config: &EngineConfig) -> Result<(), TacticianError> {
    let u = &config.universe;
    if u.benchmark.is_empty() {
        return Err(TacticianError::ConfigMissing {
            section: "universe".to_string(),
            key: "benchmark".to_string(),
        });
    }
    if u.cash_symbol.is_empty() {
        return Err(TacticianError::ConfigMissing {
            section: "universe".to_string(),
            key: "cash_symbol".to_string(),
        });
    }
    if u.attack_candidates().is_empty() {
        return Err(TacticianError::invalid(
            "universe",
            "growth",
            "no tradable candidates after excluding canaries and cash equivalents",
        ));
    }
    Ok(())
}

fn validate_momentum(config: &EngineConfig) -> Result<(), TacticianError> {
    let m = &config.momentum;
    if m.windows.iter().any(|w| *w == 0) {
        return Err(TacticianError::invalid("momentum", "windows", "windows must be positive"));
    }
    if m.weights.iter().any(|w| !w.is_finite()) {
        return Err(TacticianError::invalid("momentum", "weights", "weights must be finite"));
    }
    Ok(())
}

fn validate_regime(config: &EngineConfig) -> Result<(), TacticianError> {
    let r = &config.regime;
    if r.trend_window == 0 {
        return Err(TacticianError::invalid("regime", "trend_window", "trend_window must be at least 1"));
    }
    if r.defense_lookback == 0 {
        return Err(TacticianError::invalid(
            "regime",
            "defense_lookback",
            "defense_lookback must be at least 1",
        ));
    }
    Ok(())
}

fn validate_allocation(config: &EngineConfig) -> Result<(), TacticianError> {
    let a = &config.allocation;
    let s = "allocation";
    if a.lookback == 0 {
        return Err(TacticianError::invalid(s, "lookback", "lookback must be at least 1"));
    }
    if a.volatility_window < 2 {
        return Err(TacticianError::invalid(s, "volatility_window", "volatility_window must be at least 2"));
    }
    if a.slots == 0 {
        return Err(TacticianError::invalid(s, "slots", "slots must be at least 1"));
    }
    if !(a.target_volatility > 0.0) {
        return Err(TacticianError::invalid(s, "target_volatility", "target_volatility must be positive"));
    }
    if !(a.max_weight > 0.0 && a.max_weight <= 1.0) {
        return Err(TacticianError::invalid(s, "max_weight", "max_weight must be in (0, 1]"));
    }
    if a.breakout_window == 0 {
        return Err(TacticianError::invalid(s, "breakout_window", "breakout_window must be at least 1"));
    }
    if !(a.breakout_threshold > 0.0 && a.breakout_threshold <= 1.0) {
        return Err(TacticianError::invalid(s, "breakout_threshold", "breakout_threshold must be in (0, 1]"));
    }
    if !(a.breakout_boost >= 1.0) {
        return Err(TacticianError::invalid(s, "breakout_boost", "breakout_boost must be at least 1"));
    }
    if a.atr_window == 0 {
        return Err(TacticianError::invalid(s, "atr_window", "atr_window must be at least 1"));
    }
    Ok(())
}

fn validate_rebalance(config: &EngineConfig) -> Result<(), TacticianError> {
    let r = &config.rebalance;
    let s = "rebalance";
    if !(0.0..1.0).contains(&r.tolerance) {
        return Err(TacticianError::invalid(s, "tolerance", "tolerance must be in [0, 1)"));
    }
    if !(0.0..1.0).contains(&r.cost_rate) {
        return Err(TacticianError::invalid(s, "cost_rate", "cost_rate must be in [0, 1)"));
    }
    if !(r.min_buy >= 0.0) {
        return Err(TacticianError::invalid(s, "min_buy", "min_buy must be non-negative"));
    }
    if !(r.min_order >= 0.0) {
        return Err(TacticianError::invalid(s, "min_order", "min_order must be non-negative"));
    }
    if !(r.buying_power_haircut > 0.0 && r.buying_power_haircut <= 1.0) {
        return Err(TacticianError::invalid(
            s,
            "buying_power_haircut",
            "buying_power_haircut must be in (0, 1]",
        ));
    }
    Ok(())
}

/// Warm-up must cover the longest momentum window.
fn validate_simulation(config: &SimulationConfig, min_warmup: usize) -> Result<(), TacticianError> {
    if !(config.initial_capital > 0.0) {
        return Err(TacticianError::invalid(
            "simulation",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if config.warmup < min_warmup {
        return Err(TacticianError::invalid(
            "simulation",
            "warmup",
            format!("warmup must be at least {min_warmup} rows"),
        ));
    }
    if let (Some(start), Some(end)) = (config.start_date, config.end_date) {
        if start >= end {
            return Err(TacticianError::invalid(
                "simulation",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}
