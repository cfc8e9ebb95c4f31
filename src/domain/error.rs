//! Domain error types.

use crate::domain::universe::UniverseError;

/// Top-level error type for tactician.
#[derive(Debug, thiserror::Error)]
pub enum TacticianError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TacticianError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TacticianError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TacticianError> for std::process::ExitCode {
    fn from(err: &TacticianError) -> Self {
        let code: u8 = match err {
            TacticianError::Io(_) => 1,
            TacticianError::ConfigParse { .. }
            | TacticianError::ConfigMissing { .. }
            | TacticianError::ConfigInvalid { .. }
            | TacticianError::Universe(_) => 2,
            TacticianError::Data { .. } => 3,
            TacticianError::Broker { .. } => 4,
            TacticianError::NoData { .. } | TacticianError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
