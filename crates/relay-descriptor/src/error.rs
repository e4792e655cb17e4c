use thiserror::Error;

/// Errors raised while building a descriptor tree.
///
/// Construction either produces a complete, valid tree or one of these
/// errors; a partially built descriptor is never returned.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Group must contain at least one child")]
    EmptyGroup,

    #[error("Duplicate target '{address}' in group")]
    DuplicateTarget { address: String },

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Invalid {field}: {value}ms must not be negative")]
    NegativeTimeout { field: &'static str, value: i64 },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported descriptor file format: {0}")]
    UnsupportedFormat(String),
}

impl DescriptorError {
    pub(crate) fn invalid_address(address: &str, reason: impl Into<String>) -> Self {
        DescriptorError::InvalidAddress {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DescriptorError>;
