//! Error types for part construction

use fidget_cad::{CadError, ProfileError, StlError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building fidget parts
#[derive(Debug, Clone, Error)]
pub enum FidgetError {
    #[error("CAD error: {0}")]
    Cad(#[from] CadError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("STL error: {0}")]
    Stl(#[from] StlError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid gear: {0}")]
    InvalidGear(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for fidget operations
pub type FidgetResult<T> = Result<T, FidgetError>;
