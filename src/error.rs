use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Invalid import document: {0}")]
    InvalidDocument(String),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
