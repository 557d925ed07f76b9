//! Domain-specific error types for personality-mirror

use thiserror::Error;

/// Main error type for the pipeline and its transports
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Remote call failed with status {status}: {body}")]
    RemoteCall { status: u16, body: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl MirrorError {
    /// Error raised when no API key can be resolved from any layer.
    pub fn missing_api_key() -> Self {
        MirrorError::Config {
            message: "GEMINI_API_KEY missing.\n\n\
                      Add it to the secrets file (default: secrets.toml):\n  \
                      GEMINI_API_KEY = \"your-key\"\n\n\
                      Or export it in the environment / .env:\n  \
                      GEMINI_API_KEY=your-key\n"
                .to_string(),
        }
    }

    /// Whether a stage with a retry policy may recover from this error.
    ///
    /// Configuration problems are never recoverable by calling again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MirrorError::RemoteCall { .. } | MirrorError::Transport { .. }
        )
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key as a query parameter
        MirrorError::Transport {
            message: format!("HTTP request failed: {}", err.without_url()),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MirrorError {
    fn from(err: toml::de::Error) -> Self {
        MirrorError::Config {
            message: format!("Invalid TOML: {}", err),
        }
    }
}

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::Transport {
            message: format!("I/O failure: {}", err),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, MirrorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_call_error_keeps_status_and_body() {
        let err = MirrorError::RemoteCall {
            status: 429,
            body: "quota exhausted".into(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("quota exhausted"));
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_key_is_config_and_not_retryable() {
        let err = MirrorError::missing_api_key();
        assert!(matches!(err, MirrorError::Config { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
