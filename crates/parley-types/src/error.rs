use thiserror::Error;

/// Errors from session store operations (used by `SessionStore` in parley-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session '{0}' already exists")]
    Conflict(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    /// Whether this is a backend read/write failure rather than a missing record.
    ///
    /// `Conflict` counts: creating an existing record is a failed write.
    pub fn is_persistence(&self) -> bool {
        !matches!(self, StoreError::NotFound(_))
    }
}

/// Errors raised while validating configuration, before any turn can run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Errors from the NLU layer.
#[derive(Debug, Error)]
pub enum NluError {
    #[error("NLU request failed: {0}")]
    Request(String),

    #[error("NLU returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid NLU response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("conv-1".to_string());
        assert_eq!(err.to_string(), "session 'conv-1' not found");
        let err = StoreError::Persistence("disk full".to_string());
        assert_eq!(err.to_string(), "persistence error: disk full");
    }

    #[test]
    fn test_store_error_classification() {
        assert!(!StoreError::NotFound("a".into()).is_persistence());
        assert!(StoreError::Conflict("a".into()).is_persistence());
        assert!(StoreError::Persistence("a".into()).is_persistence());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            field: "persistence.port",
            reason: "must be non-zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid setting 'persistence.port': must be non-zero"
        );
        assert_eq!(
            ConfigError::Missing("language").to_string(),
            "missing required setting: language"
        );
    }

    #[test]
    fn test_nlu_error_display() {
        let err = NluError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("unavailable"));
    }
}
