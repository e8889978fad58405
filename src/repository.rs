//! Settings file loading and the shared, atomically replaced snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::resolver;
use crate::types::KeyChain;

/// One parsed version of the settings file. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// The file contents the tree was parsed from, for the locator.
    pub raw: String,
    /// The parsed document.
    pub tree: Value,
}

impl Settings {
    /// The `{}` document used when there is no usable file.
    pub fn empty() -> Self {
        return Self {
            raw: String::new(),
            tree: Value::Object(Map::new()),
        };
    }

    /// Parse settings from text. Blank text is an empty document, which is
    /// what a freshly created file looks like.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedSettings` if the text is not valid JSON.
    pub fn parse(path: &Path, raw: String) -> Result<Self, Error> {
        if raw.trim().is_empty() {
            return Ok(Self { raw, tree: Value::Object(Map::new()) });
        }
        let tree = serde_json::from_str(&raw).map_err(|e| {
            return Error::MalformedSettings {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        })?;
        return Ok(Self { raw, tree });
    }
}

/// Read and parse the settings file at `path`.
/// A missing file is the normal "not created yet" state and loads as `{}`.
///
/// # Errors
///
/// Returns `Error::Io` if reading fails (other than not-found),
/// or `Error::MalformedSettings` if the JSON is invalid.
pub fn load(path: &Path) -> Result<Settings, Error> {
    let raw = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "settings file absent, using empty settings");
            return Ok(Settings::empty());
        },
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };
    return Settings::parse(path, raw);
}

/// Owns the current settings snapshot for one settings file.
///
/// One writer (reload, clear) and any number of readers. Readers take an
/// `Arc` snapshot and keep using it even if a reload lands meanwhile; a
/// reload parses outside the lock and only swaps the pointer under it.
#[derive(Debug)]
pub struct SettingsRepository {
    /// Current snapshot.
    current: RwLock<Arc<Settings>>,
    /// Settings file on disk.
    path: PathBuf,
}

impl SettingsRepository {
    /// A repository for `path` holding empty settings until the first reload.
    pub fn new(path: PathBuf) -> Self {
        return Self {
            current: RwLock::new(Arc::new(Settings::empty())),
            path,
        };
    }

    /// The settings file this repository reads.
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Re-read the file and swap in the result.
    ///
    /// On failure the held settings become empty, so every resolution behaves
    /// as `{}` until a later reload succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedSettings` or `Error::Io`; report it once, not per reference.
    pub fn reload(&self) -> Result<(), Error> {
        return match load(&self.path) {
            Ok(settings) => {
                tracing::info!(path = %self.path.display(), "settings loaded");
                self.replace(settings);
                Ok(())
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "settings unusable, treating as empty");
                self.replace(Settings::empty());
                Err(e)
            },
        };
    }

    /// The settings file was deleted.
    pub fn clear(&self) {
        tracing::info!(path = %self.path.display(), "settings file removed, clearing settings");
        self.replace(Settings::empty());
    }

    /// Swap in a new snapshot.
    pub fn replace(&self, settings: Settings) {
        let next = Arc::new(settings);
        *self.current.write() = next;
    }

    /// The current snapshot. Stays valid and unchanged across later reloads.
    pub fn snapshot(&self) -> Arc<Settings> {
        return Arc::clone(&self.current.read());
    }

    /// A copy of the node at `chain` in the current snapshot, if it exists.
    pub fn lookup(&self, chain: &KeyChain) -> Option<Value> {
        let snapshot = self.snapshot();
        return resolver::resolve(&snapshot.tree, chain).value.cloned();
    }
}
