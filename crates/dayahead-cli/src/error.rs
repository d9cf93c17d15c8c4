use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Validation(#[from] dayahead_core::ValidationError),

    #[error(transparent)]
    Config(#[from] dayahead_core::ConfigError),

    #[error("retrieval failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Output(#[from] dayahead_core::OutputError),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Validation(_) => 2,
            Self::Config(_) => 3,
            Self::Fetch(_) => 4,
            Self::Output(_) => 10,
        }
    }
}
