use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use session_store::{Category, ChatMessage, Config, SessionStore};
use std::path::PathBuf;

/// Inspect and maintain the local session history
#[derive(Parser, Debug)]
#[command(name = "session-store")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show record counts per category
    Status,

    /// List the most recent records of one category, newest first
    History {
        #[arg(value_enum)]
        kind: HistoryKind,

        /// Maximum number of records (defaults to history.limit)
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Append a record
    Record {
        #[command(subcommand)]
        record: RecordCommand,
    },

    /// Read or write a preference
    Pref {
        #[command(subcommand)]
        pref: PrefCommand,
    },

    /// Delete every record in a category (all, conversations, preferences, scraping, analysis)
    Clear {
        #[arg(value_parser = parse_category)]
        category: Category,
    },

    /// Write all data to a JSON file
    Export { path: PathBuf },

    /// Load data from a JSON file produced by `export`
    Import {
        path: PathBuf,

        /// Empty every category before loading
        #[arg(long)]
        replace: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum HistoryKind {
    Conversations,
    Scraping,
    Analysis,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// Messages as a JSON array of {"role", "content"} objects
    Conversation { messages: String },

    Scraping { url: String, data: String },

    Analysis { description: String, data: String },
}

#[derive(Subcommand, Debug)]
pub enum PrefCommand {
    Get {
        key: String,

        /// JSON value printed when the key is not set
        #[arg(short, long, default_value = "null")]
        default: String,
    },

    Set { key: String, value: String },
}

/// Runs one command against `store`. `Ok(false)` means the store reported a
/// failure, which has already been logged.
pub fn run(store: &SessionStore, config: &Config, command: Command) -> Result<bool> {
    match command {
        Command::Status => match store.stats() {
            Some(stats) => print_json(&stats),
            None => Ok(false),
        },
        Command::History { kind, limit } => {
            let limit = limit.unwrap_or(config.history_limit);
            match kind {
                HistoryKind::Conversations => print_json(&store.load_conversations(limit)),
                HistoryKind::Scraping => print_json(&store.load_scraping_results(limit)),
                HistoryKind::Analysis => print_json(&store.load_analysis_results(limit)),
            }
        }
        Command::Record { record } => match record {
            RecordCommand::Conversation { messages } => {
                let messages: Vec<ChatMessage> = serde_json::from_str(&messages)
                    .context("Messages must be a JSON array of {role, content} objects")?;
                Ok(report(store.append_conversation(&messages), "Failed to save conversation"))
            }
            RecordCommand::Scraping { url, data } => {
                let data = parse_json(&data)?;
                Ok(report(
                    store.append_scraping_result(&url, &data),
                    "Failed to save scraping result",
                ))
            }
            RecordCommand::Analysis { description, data } => {
                let data = parse_json(&data)?;
                Ok(report(
                    store.append_analysis_result(&description, &data),
                    "Failed to save analysis result",
                ))
            }
        },
        Command::Pref { pref } => match pref {
            PrefCommand::Get { key, default } => {
                let default = parse_json(&default)?;
                print_json(&store.get_preference(&key, default))
            }
            PrefCommand::Set { key, value } => {
                let value = parse_json(&value)?;
                Ok(report(store.set_preference(&key, &value), "Failed to save preference"))
            }
        },
        Command::Clear { category } => Ok(report(
            store.clear_category(category),
            "Failed to clear data",
        )),
        Command::Export { path } => Ok(report(store.export_all(&path), "Failed to export data")),
        Command::Import { path, replace } => Ok(report(
            store.import_all(&path, replace),
            "Failed to import data",
        )),
    }
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse().map_err(|e: session_store::StoreError| e.to_string())
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON: {}", raw))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(true)
}

fn report(success: bool, message: &str) -> bool {
    if !success {
        eprintln!("{}", message);
    }
    success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_with_replace_flag() {
        let cli = Cli::try_parse_from(["session-store", "import", "backup.json", "--replace"])
            .unwrap();
        match cli.command {
            Command::Import { path, replace } => {
                assert_eq!(path, PathBuf::from("backup.json"));
                assert!(replace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn history_limit_is_optional() {
        let cli = Cli::try_parse_from(["session-store", "history", "scraping"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History {
                kind: HistoryKind::Scraping,
                limit: None
            }
        ));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn unknown_clear_category_is_rejected_by_the_parser() {
        let err = Cli::try_parse_from(["session-store", "clear", "everything"]).unwrap_err();
        assert!(err.to_string().contains("Unknown category: everything"));
    }

    #[test]
    fn clear_category_is_parsed_case_insensitively() {
        let cli = Cli::try_parse_from(["session-store", "clear", "Scraping"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Clear {
                category: Category::Scraping
            }
        ));
    }

    #[test]
    fn clear_command_empties_the_category() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: session_store::StorageConfig::new(dir.path()),
            history_limit: 10,
        };
        let store = SessionStore::open(&config.storage).unwrap();
        assert!(store.set_preference("theme", "dark"));

        let ok = run(
            &store,
            &config,
            Command::Clear {
                category: Category::Preferences,
            },
        )
        .unwrap();
        assert!(ok);
        assert_eq!(store.get_preference("theme", Value::Null), Value::Null);
    }

    #[test]
    fn record_then_read_preference() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: session_store::StorageConfig::new(dir.path()),
            history_limit: 10,
        };
        let store = SessionStore::open(&config.storage).unwrap();

        let ok = run(
            &store,
            &config,
            Command::Pref {
                pref: PrefCommand::Set {
                    key: "theme".to_string(),
                    value: r#""dark""#.to_string(),
                },
            },
        )
        .unwrap();
        assert!(ok);
        assert_eq!(
            store.get_preference("theme", Value::Null),
            Value::String("dark".to_string())
        );
    }

    #[test]
    fn malformed_messages_are_rejected_before_touching_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: session_store::StorageConfig::new(dir.path()),
            history_limit: 10,
        };
        let store = SessionStore::open(&config.storage).unwrap();

        let result = run(
            &store,
            &config,
            Command::Record {
                record: RecordCommand::Conversation {
                    messages: r#"{"role": "user"}"#.to_string(),
                },
            },
        );
        assert!(result.is_err());
        assert!(store.load_conversations(10).is_empty());
    }
}
