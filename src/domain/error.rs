//! Domain error types.

/// Top-level error type for dualmom.
///
/// An undefined signal or an undefined monthly return is not an error: those
/// are carried as `None` through the signal and return series.
#[derive(Debug, thiserror::Error)]
pub enum DualmomError {
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

    #[error("no price data for {symbol} between {start} and {end}")]
    DataUnavailable {
        symbol: String,
        start: String,
        end: String,
    },

    #[error("price source error: {reason}")]
    PriceSource { reason: String },

    #[error("insufficient history: {months} defined monthly returns, need at least 2")]
    InsufficientHistory { months: usize },

    #[error("{metric} is not a finite number")]
    NonFiniteMetric { metric: String },

    #[error("holdings do not match the tradable universe: {}", symbols.join(", "))]
    ReconciliationMismatch { symbols: Vec<String> },

    #[error("target {symbol} is not part of the tradable universe")]
    InvalidTarget { symbol: String },

    #[error("capital error: {reason}")]
    Capital { reason: String },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DualmomError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        DualmomError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&DualmomError> for std::process::ExitCode {
    fn from(err: &DualmomError) -> Self {
        let code: u8 = match err {
            DualmomError::Io(_) | DualmomError::Report { .. } => 1,
            DualmomError::ConfigParse { .. }
            | DualmomError::ConfigMissing { .. }
            | DualmomError::ConfigInvalid { .. } => 2,
            DualmomError::PriceSource { .. } | DualmomError::Broker { .. } => 3,
            DualmomError::DataUnavailable { .. }
            | DualmomError::InsufficientHistory { .. }
            | DualmomError::NonFiniteMetric { .. } => 5,
            DualmomError::ReconciliationMismatch { .. }
            | DualmomError::InvalidTarget { .. }
            | DualmomError::Capital { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
