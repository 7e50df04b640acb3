use thiserror::Error;

/// Errors raised while assembling [`crate::AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    /// The credential still holds the template value shipped in `.env.example`.
    #[error("{0} still holds a placeholder value; set your real credentials")]
    PlaceholderCredentials(String),
}
