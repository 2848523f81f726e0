use crate::error::StoreError;
use std::fmt;
use std::str::FromStr;

/// A group of records that can be cleared on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    All,
    Conversations,
    Preferences,
    Scraping,
    Analysis,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Conversations => "conversations",
            Self::Preferences => "preferences",
            Self::Scraping => "scraping",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "conversations" => Ok(Self::Conversations),
            "preferences" => Ok(Self::Preferences),
            "scraping" => Ok(Self::Scraping),
            "analysis" => Ok(Self::Analysis),
            _ => Err(StoreError::UnknownCategory(s.to_string())),
        }
    }
}
