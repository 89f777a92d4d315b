use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ferrotap_core::ConfigError),

    #[error(transparent)]
    Sync(#[from] ferrotap_core::SyncError),

    #[error("{failed} partition(s) failed")]
    PartialFailure { failed: usize },

    #[error("interrupted")]
    Interrupted,

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Logging(_) => 2,
            Self::PartialFailure { .. } => 3,
            Self::Sync(_) => 4,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
            Self::Interrupted => 130,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_setup_from_sync_failures() {
        let config = CliError::from(ferrotap_core::ConfigError::ZeroAttempts);
        assert_eq!(config.exit_code(), 2);
        assert_eq!(CliError::PartialFailure { failed: 2 }.exit_code(), 3);
        assert_eq!(
            CliError::PartialFailure { failed: 2 }.to_string(),
            "2 partition(s) failed"
        );
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }
}
