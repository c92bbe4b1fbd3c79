use crate::algorithms::parameters::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{kind} ({id}) not in model")]
    MissingEntity { kind: EntityKind, id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unsupported checkpoint format version {0}")]
    UnsupportedCheckpointVersion(u32),

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ModelError::InvalidConfiguration(message.into())
    }

    pub fn missing(kind: EntityKind, id: &str) -> Self {
        ModelError::MissingEntity {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
