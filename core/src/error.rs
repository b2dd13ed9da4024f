use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Financial entity {id} not found")]
    UnknownEntity { id: i64 },

    #[error("Vehicle {id} not found")]
    UnknownVehicle { id: i64 },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FinanceResult<T> = Result<T, FinanceError>;
