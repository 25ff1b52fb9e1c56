//! Domain error types.

/// Top-level error type for kestrel.
#[derive(Debug, thiserror::Error)]
pub enum KestrelError {
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

    #[error("fetch failed ({context}): {reason}")]
    Fetch { context: String, reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid position state: {reason}")]
    InvalidPosition { reason: String },

    #[error("journal error: {reason}")]
    Journal { reason: String },

    #[error("journal query error: {reason}")]
    JournalQuery { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KestrelError {
    /// Errors that may abort a single symbol's cycle but must never take
    /// down the scan loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KestrelError::Fetch { .. } | KestrelError::InsufficientData { .. }
        )
    }
}

impl From<&KestrelError> for std::process::ExitCode {
    fn from(err: &KestrelError) -> Self {
        let code: u8 = match err {
            KestrelError::Io(_) => 1,
            KestrelError::ConfigParse { .. }
            | KestrelError::ConfigMissing { .. }
            | KestrelError::ConfigInvalid { .. } => 2,
            KestrelError::Journal { .. } | KestrelError::JournalQuery { .. } => 3,
            KestrelError::Fetch { .. } | KestrelError::InsufficientData { .. } => 4,
            KestrelError::InvalidPosition { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
