use thiserror::Error;

/// Error type for the configuration boundaries of attrkit.
///
/// The attribute store itself never fails: rejected attributes are counted as
/// drops. Errors only come from building limits and loading configuration.
#[derive(Debug, Error)]
pub enum AttrKitError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, AttrKitError>;
