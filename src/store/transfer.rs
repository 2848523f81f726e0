use super::records::{AnalysisRecord, ConversationRecord, ScrapingRecord};
use super::{
    Category, SessionStore, clear_tables, insert_analysis, insert_conversation,
    insert_preference, insert_scraping, local_timestamp, payload,
};
use crate::entity::{analysis_results, conversations, preferences, scraping_results};
use crate::error::StoreError;
use sea_orm::{EntityTrait, QueryOrder, TransactionTrait};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// The whole store as written by [`SessionStore::export_all`] and read back
/// by [`SessionStore::import_all`]. Absent or `null` sections read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversations: Vec<ConversationEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub preferences: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scraping_results: Vec<ScrapingEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analysis_results: Vec<AnalysisEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_timestamp: Option<String>,
}

// Ids are informational on import. A missing timestamp is stamped with the
// import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub url: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub description: String,
    pub data: Value,
}

impl From<ConversationRecord> for ConversationEntry {
    fn from(r: ConversationRecord) -> Self {
        Self {
            id: Some(r.id),
            timestamp: Some(r.timestamp),
            data: r.messages,
        }
    }
}

impl From<ScrapingRecord> for ScrapingEntry {
    fn from(r: ScrapingRecord) -> Self {
        Self {
            id: Some(r.id),
            timestamp: Some(r.timestamp),
            url: r.url,
            data: r.data,
        }
    }
}

impl From<AnalysisRecord> for AnalysisEntry {
    fn from(r: AnalysisRecord) -> Self {
        Self {
            id: Some(r.id),
            timestamp: Some(r.timestamp),
            description: r.description,
            data: r.data,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExportDocument {
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let raw: Value = serde_json::from_str(content)?;
        if !raw.is_object() {
            return Err(StoreError::InvalidDocument(
                "top level must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(raw)?)
    }
}

/// Number of records written by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub conversations: usize,
    pub preferences: usize,
    pub scraping_results: usize,
    pub analysis_results: usize,
}

impl SessionStore {
    /// Writes every category to `destination` as one pretty-printed JSON
    /// document. All four tables are read inside a single transaction.
    pub fn export_all(&self, destination: &Path) -> bool {
        self.contain("export data", self.write_export(destination))
            .is_some()
    }

    /// Loads a document produced by [`SessionStore::export_all`].
    ///
    /// With `replace_existing` every category is emptied first. Otherwise
    /// records are appended under fresh ids and preferences are upserted by
    /// key. Nothing is written unless the whole document goes in.
    pub fn import_all(&self, source: &Path, replace_existing: bool) -> bool {
        self.contain("import data", self.read_import(source, replace_existing))
            .is_some()
    }

    pub fn snapshot(&self) -> Result<ExportDocument, StoreError> {
        let db = self.connect()?;
        let txn = db.begin()?;

        let conversations = conversations::Entity::find()
            .order_by_asc(conversations::Column::Id)
            .all(&txn)?
            .into_iter()
            .map(|r| ConversationRecord::try_from(r).map(ConversationEntry::from))
            .collect::<Result<Vec<_>, _>>()?;

        let preferences = preferences::Entity::find()
            .order_by_asc(preferences::Column::Key)
            .all(&txn)?
            .into_iter()
            .map(|r| Ok((r.key, serde_json::from_str(&r.value)?)))
            .collect::<Result<Map<String, Value>, serde_json::Error>>()?;

        let scraping_results = scraping_results::Entity::find()
            .order_by_asc(scraping_results::Column::Id)
            .all(&txn)?
            .into_iter()
            .map(|r| ScrapingRecord::try_from(r).map(ScrapingEntry::from))
            .collect::<Result<Vec<_>, _>>()?;

        let analysis_results = analysis_results::Entity::find()
            .order_by_asc(analysis_results::Column::Id)
            .all(&txn)?
            .into_iter()
            .map(|r| AnalysisRecord::try_from(r).map(AnalysisEntry::from))
            .collect::<Result<Vec<_>, _>>()?;

        txn.commit()?;

        Ok(ExportDocument {
            conversations,
            preferences,
            scraping_results,
            analysis_results,
            export_timestamp: Some(local_timestamp()),
        })
    }

    pub fn apply(
        &self,
        document: &ExportDocument,
        replace_existing: bool,
    ) -> Result<ImportSummary, StoreError> {
        let db = self.connect()?;
        let txn = db.begin()?;

        if replace_existing {
            clear_tables(&txn, Category::All)?;
        }

        let now = local_timestamp();
        let stamp = |timestamp: &Option<String>| {
            timestamp.clone().unwrap_or_else(|| now.clone())
        };

        for entry in &document.conversations {
            insert_conversation(
                &txn,
                stamp(&entry.timestamp),
                payload::encode(&entry.data)?,
            )?;
        }
        for (key, value) in &document.preferences {
            insert_preference(&txn, key, payload::encode(value)?)?;
        }
        for entry in &document.scraping_results {
            insert_scraping(
                &txn,
                stamp(&entry.timestamp),
                &entry.url,
                payload::encode(&entry.data)?,
            )?;
        }
        for entry in &document.analysis_results {
            insert_analysis(
                &txn,
                stamp(&entry.timestamp),
                &entry.description,
                payload::encode(&entry.data)?,
            )?;
        }

        txn.commit()?;

        Ok(ImportSummary {
            conversations: document.conversations.len(),
            preferences: document.preferences.len(),
            scraping_results: document.scraping_results.len(),
            analysis_results: document.analysis_results.len(),
        })
    }

    fn write_export(&self, destination: &Path) -> Result<(), StoreError> {
        let document = self.snapshot()?;
        let content = serde_json::to_string_pretty(&document)?;
        std::fs::write(destination, content)?;

        info!(
            conversations = document.conversations.len(),
            preferences = document.preferences.len(),
            scraping_results = document.scraping_results.len(),
            analysis_results = document.analysis_results.len(),
            "Exported session data to {}",
            destination.display()
        );
        Ok(())
    }

    fn read_import(&self, source: &Path, replace_existing: bool) -> Result<(), StoreError> {
        let content = std::fs::read_to_string(source)?;
        let document = ExportDocument::from_json(&content)?;
        let summary = self.apply(&document, replace_existing)?;

        info!(
            conversations = summary.conversations,
            preferences = summary.preferences,
            scraping_results = summary.scraping_results,
            analysis_results = summary.analysis_results,
            replace_existing,
            "Imported session data from {}",
            source.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_null_sections_read_as_empty() {
        let document =
            ExportDocument::from_json(r#"{"conversations": null, "preferences": {"theme": "dark"}}"#)
                .unwrap();

        assert!(document.conversations.is_empty());
        assert!(document.scraping_results.is_empty());
        assert!(document.analysis_results.is_empty());
        assert_eq!(document.preferences.get("theme"), Some(&json!("dark")));
        assert_eq!(document.export_timestamp, None);
    }

    #[test]
    fn rejects_non_object_document() {
        let err = ExportDocument::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[test]
    fn rejects_section_of_wrong_shape() {
        assert!(ExportDocument::from_json(r#"{"conversations": "nope"}"#).is_err());
        assert!(ExportDocument::from_json(r#"{"scraping_results": [{"data": {}}]}"#).is_err());
    }

    #[test]
    fn entry_without_id_or_timestamp_is_accepted() {
        let document = ExportDocument::from_json(
            r#"{"analysis_results": [{"description": "mean", "data": {"value": 2.5}}]}"#,
        )
        .unwrap();

        let entry = &document.analysis_results[0];
        assert_eq!(entry.id, None);
        assert_eq!(entry.timestamp, None);
        assert_eq!(entry.data, json!({"value": 2.5}));
    }

    #[test]
    fn serializes_with_the_documented_top_level_keys() {
        let document = ExportDocument {
            export_timestamp: Some("2026-10-19 12:00:00".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&document).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

        assert_eq!(
            keys,
            [
                "conversations",
                "preferences",
                "scraping_results",
                "analysis_results",
                "export_timestamp"
            ]
        );
    }
}
