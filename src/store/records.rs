use crate::entity::{analysis_results, conversations, scraping_results};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chat turn as handed over by the conversation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub timestamp: String,
    /// Stored verbatim. Usually a list of [`ChatMessage`], but records
    /// brought in by an import may hold anything.
    pub messages: Value,
}

impl ConversationRecord {
    pub fn chat_messages(&self) -> Result<Vec<ChatMessage>, serde_json::Error> {
        Vec::<ChatMessage>::deserialize(&self.messages)
    }
}

impl TryFrom<conversations::Model> for ConversationRecord {
    type Error = serde_json::Error;

    fn try_from(r: conversations::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            timestamp: r.timestamp,
            messages: serde_json::from_str(&r.conversation_data)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapingRecord {
    pub id: i64,
    pub timestamp: String,
    pub url: String,
    pub data: Value,
}

impl TryFrom<scraping_results::Model> for ScrapingRecord {
    type Error = serde_json::Error;

    fn try_from(r: scraping_results::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            timestamp: r.timestamp,
            url: r.url,
            data: serde_json::from_str(&r.data)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub timestamp: String,
    pub description: String,
    pub data: Value,
}

impl TryFrom<analysis_results::Model> for AnalysisRecord {
    type Error = serde_json::Error;

    fn try_from(r: analysis_results::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            timestamp: r.timestamp,
            description: r.description,
            data: serde_json::from_str(&r.data)?,
        })
    }
}

/// Row counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub conversations: u64,
    pub preferences: u64,
    pub scraping_results: u64,
    pub analysis_results: u64,
}
