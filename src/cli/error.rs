use thiserror::Error;

/// Error type for the aria-health CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing password: set the {0} environment variable")]
    MissingPassword(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Aria Operations error: {0}")]
    Sdk(#[from] crate::core::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an export error
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::Export(msg.into())
    }

    /// Check if running the command again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Sdk(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingPassword(var) => format!(
                "No password supplied. Export {} before running aria-health; passwords are never read from the config file.",
                var
            ),
            Self::Configuration(msg) => format!(
                "Invalid configuration: {}. Run 'aria-health config show' to inspect the effective settings.",
                msg
            ),
            Self::Export(msg) => format!(
                "Could not write the report: {}. Use --output with a plain file name.",
                msg
            ),
            Self::Sdk(err) => err.user_message(),
            _ => self.to_string(),
        }
    }
}

/// Convenient result type for the CLI
pub type Result<T> = std::result::Result<T, CliError>;
