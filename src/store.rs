mod category;
mod payload;
mod records;
mod transfer;

pub use category::Category;
pub use records::{
    AnalysisRecord, ChatMessage, ConversationRecord, ScrapingRecord, StoreStats,
};
pub use transfer::{
    AnalysisEntry, ConversationEntry, ExportDocument, ImportSummary, ScrapingEntry,
};

use crate::config::StorageConfig;
use crate::entity::{self, analysis_results, conversations, preferences, scraping_results};
use crate::error::StoreError;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Durable local history of conversations, scraping and analysis results,
/// plus key/value preferences.
///
/// Every call opens its own connection and drops it before returning. The
/// public operations never fail loudly: faults are logged and reported as
/// `false`, an empty list, or the caller's default.
///
/// Not safe for overlapping writers. Wrap it in a lock if more than one
/// thread needs it.
pub struct SessionStore {
    db_url: String,
    db_path: PathBuf,
}

impl SessionStore {
    /// Creates the data directory and the four tables when they are missing.
    /// Existing data is left alone.
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db_path = config.database_path();
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let store = Self { db_url, db_path };

        let db = store.connect()?;
        for statement in entity::SCHEMA {
            db.execute_unprepared(statement)?;
        }

        info!("Session store ready at {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn append_conversation(&self, messages: &[ChatMessage]) -> bool {
        let result = payload::encode(messages)
            .and_then(|data| {
                let db = self.connect()?;
                insert_conversation(&db, local_timestamp(), data)
            });

        self.contain("save conversation", result)
            .inspect(|id| debug!(id, "Saved conversation"))
            .is_some()
    }

    /// Newest first, at most `limit` records.
    pub fn load_conversations(&self, limit: u64) -> Vec<ConversationRecord> {
        let result = self.connect().and_then(|db| {
            conversations::Entity::find()
                .order_by_desc(conversations::Column::Id)
                .limit(row_limit(limit))
                .all(&db)?
                .into_iter()
                .map(|r| ConversationRecord::try_from(r).map_err(StoreError::from))
                .collect()
        });

        self.contain("load conversations", result)
            .unwrap_or_default()
    }

    pub fn set_preference<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let result = payload::encode(value)
            .and_then(|value| {
                let db = self.connect()?;
                insert_preference(&db, key, value)
            });

        self.contain("save preference", result)
            .inspect(|_| debug!(key, "Saved preference"))
            .is_some()
    }

    /// Returns `default` when the key was never set or cannot be read.
    pub fn get_preference(&self, key: &str, default: Value) -> Value {
        let result = self.connect().and_then(|db| {
            match preferences::Entity::find_by_id(key.to_string()).one(&db)? {
                Some(row) => Ok(Some(serde_json::from_str(&row.value)?)),
                None => Ok(None),
            }
        });

        self.contain("load preference", result)
            .flatten()
            .unwrap_or(default)
    }

    pub fn append_scraping_result<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> bool {
        let result = payload::encode(data)
            .and_then(|data| {
                let db = self.connect()?;
                insert_scraping(&db, local_timestamp(), url, data)
            });

        self.contain("save scraping result", result)
            .inspect(|id| debug!(id, url, "Saved scraping result"))
            .is_some()
    }

    pub fn load_scraping_results(&self, limit: u64) -> Vec<ScrapingRecord> {
        let result = self.connect().and_then(|db| {
            scraping_results::Entity::find()
                .order_by_desc(scraping_results::Column::Id)
                .limit(row_limit(limit))
                .all(&db)?
                .into_iter()
                .map(|r| ScrapingRecord::try_from(r).map_err(StoreError::from))
                .collect()
        });

        self.contain("load scraping results", result)
            .unwrap_or_default()
    }

    pub fn append_analysis_result<T: Serialize + ?Sized>(
        &self,
        description: &str,
        data: &T,
    ) -> bool {
        let result = payload::encode(data)
            .and_then(|data| {
                let db = self.connect()?;
                insert_analysis(&db, local_timestamp(), description, data)
            });

        self.contain("save analysis result", result)
            .inspect(|id| debug!(id, "Saved analysis result"))
            .is_some()
    }

    pub fn load_analysis_results(&self, limit: u64) -> Vec<AnalysisRecord> {
        let result = self.connect().and_then(|db| {
            analysis_results::Entity::find()
                .order_by_desc(analysis_results::Column::Id)
                .limit(row_limit(limit))
                .all(&db)?
                .into_iter()
                .map(|r| AnalysisRecord::try_from(r).map_err(StoreError::from))
                .collect()
        });

        self.contain("load analysis results", result)
            .unwrap_or_default()
    }

    /// Deletes every record in `category`. Clearing an empty category
    /// succeeds.
    pub fn clear_category(&self, category: Category) -> bool {
        let result = self.connect().and_then(|db| {
            let txn = db.begin()?;
            let removed = clear_tables(&txn, category)?;
            txn.commit()?;
            Ok(removed)
        });

        self.contain(&format!("clear {category} data"), result)
            .inspect(|removed| info!(%category, removed, "Cleared session data"))
            .is_some()
    }

    pub fn stats(&self) -> Option<StoreStats> {
        let result = self.connect().and_then(|db| {
            Ok(StoreStats {
                conversations: conversations::Entity::find().count(&db)?,
                preferences: preferences::Entity::find().count(&db)?,
                scraping_results: scraping_results::Entity::find().count(&db)?,
                analysis_results: analysis_results::Entity::find().count(&db)?,
            })
        });

        self.contain("count records", result)
    }

    fn connect(&self) -> Result<DatabaseConnection, StoreError> {
        Ok(Database::connect(&self.db_url)?)
    }

    fn contain<T>(&self, operation: &str, result: Result<T, StoreError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Failed to {} ({}): {}", operation, self.db_path.display(), e);
                None
            }
        }
    }
}

// SQLite binds LIMIT as a signed 64-bit integer.
fn row_limit(limit: u64) -> u64 {
    limit.min(i64::MAX as u64)
}

pub(crate) fn local_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn insert_conversation<C: ConnectionTrait>(
    db: &C,
    timestamp: String,
    data: String,
) -> Result<i64, StoreError> {
    let record = conversations::ActiveModel {
        id: NotSet,
        timestamp: Set(timestamp),
        conversation_data: Set(data),
    };
    Ok(conversations::Entity::insert(record).exec(db)?.last_insert_id)
}

fn insert_preference<C: ConnectionTrait>(
    db: &C,
    key: &str,
    value: String,
) -> Result<(), StoreError> {
    let record = preferences::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
    };
    preferences::Entity::insert(record)
        .on_conflict(
            OnConflict::column(preferences::Column::Key)
                .update_column(preferences::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(db)?;
    Ok(())
}

fn insert_scraping<C: ConnectionTrait>(
    db: &C,
    timestamp: String,
    url: &str,
    data: String,
) -> Result<i64, StoreError> {
    let record = scraping_results::ActiveModel {
        id: NotSet,
        timestamp: Set(timestamp),
        url: Set(url.to_string()),
        data: Set(data),
    };
    Ok(scraping_results::Entity::insert(record).exec(db)?.last_insert_id)
}

fn insert_analysis<C: ConnectionTrait>(
    db: &C,
    timestamp: String,
    description: &str,
    data: String,
) -> Result<i64, StoreError> {
    let record = analysis_results::ActiveModel {
        id: NotSet,
        timestamp: Set(timestamp),
        description: Set(description.to_string()),
        data: Set(data),
    };
    Ok(analysis_results::Entity::insert(record).exec(db)?.last_insert_id)
}

/// Returns the number of rows removed.
fn clear_tables<C: ConnectionTrait>(db: &C, category: Category) -> Result<u64, StoreError> {
    let mut removed = 0;
    if matches!(category, Category::All | Category::Conversations) {
        removed += conversations::Entity::delete_many().exec(db)?.rows_affected;
    }
    if matches!(category, Category::All | Category::Preferences) {
        removed += preferences::Entity::delete_many().exec(db)?.rows_affected;
    }
    if matches!(category, Category::All | Category::Scraping) {
        removed += scraping_results::Entity::delete_many().exec(db)?.rows_affected;
    }
    if matches!(category, Category::All | Category::Analysis) {
        removed += analysis_results::Entity::delete_many().exec(db)?.rows_affected;
    }
    Ok(removed)
}
