use thiserror::Error;

#[derive(Error, Debug)]
pub enum HumError {
    #[error("Profile data corrupt: {0}")]
    ProfileCorrupt(String),

    #[error("Correlation matrix rejection sampling exhausted after {attempts} attempts")]
    MatrixRejectionExhausted { attempts: u32 },

    #[error("Actuation failed: {0}")]
    Actuation(String),

    #[error("No active session")]
    SessionInactive,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HumError>;
