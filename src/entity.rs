pub mod analysis_results;
pub mod conversations;
pub mod preferences;
pub mod scraping_results;

/// Table definitions matching the entities above. `AUTOINCREMENT` keeps
/// SQLite from handing out an id again after its row has been deleted.
pub(crate) const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        conversation_data TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS scraping_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        url TEXT NOT NULL,
        data TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS analysis_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        description TEXT NOT NULL,
        data TEXT NOT NULL
    )",
];
