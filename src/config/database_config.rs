use serde_derive::{Deserialize, Serialize};

/// Configuration for the embedded database.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://toolvault.db?mode=rwc` or `sqlite::memory:`.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://toolvault.db?mode=rwc".to_string(),
        }
    }
}
