use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SafetyError {
    #[error("Dimension mismatch: expected {expected} coordinates, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Path is empty: {0}")]
    EmptyPath(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Component {component} is not active")]
    NotActive { component: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SafetyError {
    pub(crate) fn invalid(name: &str, reason: &str) -> Self {
        SafetyError::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type SafetyResult<T> = Result<T, SafetyError>;
