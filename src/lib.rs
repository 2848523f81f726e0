pub mod config;
pub mod entity;
pub mod error;
pub mod store;

pub use config::{Config, StorageConfig};
pub use error::StoreError;
pub use store::{
    AnalysisRecord, Category, ChatMessage, ConversationRecord, ExportDocument, ScrapingRecord,
    SessionStore, StoreStats,
};
