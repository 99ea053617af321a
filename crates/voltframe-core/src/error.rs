use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EffectsError {
    #[error("failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid option `{field}`: {reason}")]
    InvalidOption { field: &'static str, reason: String },
}

impl EffectsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EffectsError>;
