//! Small key/value store remembering state between runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Key under which the last opened document path of `site` is kept.
///
/// Every site gets its own entry, so one store can serve many sites.
pub fn last_path_key(site: &str) -> String {
    format!("docshelf:lastPath:{site}")
}

/// String key/value pairs persisted as a JSON object.
///
/// An in-memory store (no backing file) behaves the same but forgets
/// everything on exit.
#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`.
    ///
    /// A missing or unreadable file yields an empty store; the session is a
    /// convenience, never a reason to fail startup.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "discarding unreadable session file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            values,
        }
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set `key` and write the store through to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.get(key) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session dir {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write session {}", path.display()))?;
        debug!(path = %path.display(), "session saved");
        Ok(())
    }
}

/// Default location of the session file in the user's cache directory.
pub fn default_session_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(local) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local).join("docshelf").join("session.json");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Caches")
                .join("docshelf")
                .join("session.json");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
            return PathBuf::from(xdg).join("docshelf").join("session.json");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".cache")
                .join("docshelf")
                .join("session.json");
        }
    }

    PathBuf::from(".docshelf-session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let key = last_path_key("https://example.com/docs/");
        let mut store = SessionStore::open(&path);
        assert_eq!(store.get(&key), None);
        store.set(&key, "content/a.md").unwrap();

        let reopened = SessionStore::open(&path);
        assert_eq!(reopened.get(&key), Some("content/a.md"));
    }

    #[test]
    fn test_last_path_is_kept_per_site() {
        let mut store = SessionStore::in_memory();
        store.set(&last_path_key("/srv/alpha"), "alpha.md").unwrap();
        store.set(&last_path_key("/srv/beta"), "beta.md").unwrap();
        assert_eq!(store.get(&last_path_key("/srv/alpha")), Some("alpha.md"));
        assert_eq!(store.get(&last_path_key("/srv/beta")), Some("beta.md"));
        assert_eq!(store.get(&last_path_key("/srv/gamma")), None);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let mut store = SessionStore::open(&path);
        assert_eq!(store.get(&last_path_key("site")), None);
        store.set("k", "v").unwrap();
        assert_eq!(SessionStore::open(&path).get("k"), Some("v"));
    }

    #[test]
    fn test_in_memory_store_never_touches_disk() {
        let mut store = SessionStore::in_memory();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v"));
        assert!(store.backing_file().is_none());
    }
}
