//! Durable user preferences.
//!
//! A single SQLite key-value table backs the one preference the shell
//! persists today: the theme flag. The flag is written on every toggle
//! so the choice survives restarts.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Preference key for the theme flag.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create preferences directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Color theme of the shell. Dark unless the stored flag says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Interpret a stored flag. Only the explicit `light` value selects
    /// the light theme; anything else (including no flag) is dark.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Unknown theme: {s}")),
        }
    }
}

/// Key-value preference store over a SQLite file.
pub struct PreferencesStore {
    conn: Connection,
}

impl PreferencesStore {
    /// Open (and initialize) the store at the given path, creating
    /// parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, PreferencesError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, PreferencesError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PreferencesError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Get a preference by key. Returns None if not set.
    pub fn get(&self, key: &str) -> Result<Option<String>, PreferencesError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_preferences WHERE key = ?1")?;
        match stmt.query_row([key], |row| row.get::<_, String>(0)) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(PreferencesError::from(e)),
        }
    }

    /// Set a preference (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        self.conn.execute(
            "INSERT INTO user_preferences (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn theme(&self) -> Result<Theme, PreferencesError> {
        Ok(Theme::from_flag(self.get(THEME_KEY)?.as_deref()))
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), PreferencesError> {
        self.set(THEME_KEY, theme.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn get_missing_key_returns_none() {
        let store = PreferencesStore::open_in_memory().unwrap();
        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn set_and_get_round_trip() {
        let store = PreferencesStore::open_in_memory().unwrap();
        store.set("theme", "light").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = PreferencesStore::open_in_memory().unwrap();
        store.set("theme", "light").unwrap();
        store.set("theme", "dark").unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn theme_defaults_to_dark() {
        let store = PreferencesStore::open_in_memory().unwrap();
        assert_eq!(store.theme().unwrap(), Theme::Dark);
    }

    #[test]
    fn explicit_light_flag_selects_light() {
        let store = PreferencesStore::open_in_memory().unwrap();
        store.set_theme(Theme::Light).unwrap();
        assert_eq!(store.theme().unwrap(), Theme::Light);
    }

    #[test]
    fn unrecognized_flag_falls_back_to_dark() {
        let store = PreferencesStore::open_in_memory().unwrap();
        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(store.theme().unwrap(), Theme::Dark);
    }

    #[test]
    fn theme_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.db");

        {
            let store = PreferencesStore::open(&path).unwrap();
            store.set_theme(Theme::Light).unwrap();
        }

        let reopened = PreferencesStore::open(&path).unwrap();
        assert_eq!(reopened.theme().unwrap(), Theme::Light);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("prefs.db");
        let store = PreferencesStore::open(&path).unwrap();
        store.set_theme(Theme::Dark).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn theme_toggle_flips_both_ways() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[test]
    fn theme_parses_from_str() {
        assert_eq!(Theme::from_str("light").unwrap(), Theme::Light);
        assert_eq!(Theme::from_str("dark").unwrap(), Theme::Dark);
        assert!(Theme::from_str("sepia").is_err());
    }
}
