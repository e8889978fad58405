use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Name of the project config file, looked up in the workspace root.
pub const CONFIG_FILE: &str = ".settingsref.toml";

/// Project configuration loaded from `.settingsref.toml`.
/// Include/exclude patterns are path prefixes applied to source documents.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path segment (substring) that marks client-side code.
    pub client_segment: String,
    /// Prefixes of document paths to skip.
    exclude: Vec<String>,
    /// Prefixes of document paths to lint; empty means everything.
    include: Vec<String>,
    /// Root namespace token, e.g. `Meteor`.
    pub namespace: String,
    /// Workspace root every relative path is resolved against.
    pub root: PathBuf,
    /// Settings file, absolute or relative to `root`.
    pub settings_file: PathBuf,
}

/// Raw TOML structure for `.settingsref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsrefTomlConfig {
    /// See `Config::client_segment`.
    client_segment: Option<String>,
    /// See `Config::exclude`.
    #[serde(default)]
    exclude: Vec<String>,
    /// See `Config::include`.
    #[serde(default)]
    include: Vec<String>,
    /// See `Config::namespace`.
    namespace: Option<String>,
    /// See `Config::settings_file`.
    settings_file: Option<PathBuf>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Explicit config file instead of `<root>/.settingsref.toml`.
    pub config: Option<PathBuf>,
    /// `--namespace`.
    pub namespace: Option<String>,
    /// `--settings`.
    pub settings_file: Option<PathBuf>,
}

impl Config {
    /// Load config from `.settingsref.toml` in `root`, then apply overrides.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed: never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if an explicitly named config is missing,
    /// `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path, overrides: &Overrides) -> Result<Self, Error> {
        let path = overrides.config.clone().unwrap_or_else(|| return root.join(CONFIG_FILE));
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && overrides.config.is_some() => {
                return Err(Error::ConfigNotFound { path });
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => Some(c),
        };

        let mut config = Self::defaults(root);
        if let Some(content) = content {
            let raw: SettingsrefTomlConfig = toml::from_str(&content)?;
            config.apply_file(raw);
        }
        config.apply_overrides(overrides);
        tracing::debug!(config = ?config, "configuration loaded");
        return Ok(config);
    }

    /// Defaults for a Meteor project: `settings.json`, `Meteor`, `client`.
    pub fn defaults(root: &Path) -> Self {
        return Self {
            client_segment: "client".to_string(),
            exclude: Vec::new(),
            include: Vec::new(),
            namespace: "Meteor".to_string(),
            root: root.to_path_buf(),
            settings_file: PathBuf::from("settings.json"),
        };
    }

    /// Copy the values present in the file.
    fn apply_file(&mut self, raw: SettingsrefTomlConfig) {
        if let Some(segment) = raw.client_segment {
            self.client_segment = segment;
        }
        if let Some(namespace) = raw.namespace {
            self.namespace = namespace;
        }
        if let Some(settings_file) = raw.settings_file {
            self.settings_file = settings_file;
        }
        self.include = raw.include;
        self.exclude = raw.exclude;
    }

    /// Copy the values given on the command line.
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(namespace) = &overrides.namespace {
            self.namespace.clone_from(namespace);
        }
        if let Some(settings_file) = &overrides.settings_file {
            self.settings_file.clone_from(settings_file);
        }
    }

    /// The settings file on disk: absolute paths are used as-is, relative ones
    /// are joined to the workspace root.
    pub fn settings_path(&self) -> PathBuf {
        if self.settings_file.is_absolute() {
            return self.settings_file.clone();
        }
        return self.root.join(&self.settings_file);
    }

    /// Check whether a document path (relative to the root) should be linted.
    ///
    /// A path is included if no include patterns are set (lint everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Whether a document belongs to client code: any directory or file name
    /// in its path contains the client segment.
    ///
    /// A path heuristic; `imports/client/app.js` and `client.js` are client
    /// code, `imports/server/clientele.js` is too.
    pub fn is_client_scoped(&self, path: &Path) -> bool {
        if self.client_segment.is_empty() {
            return false;
        }
        return path.components().any(|component| {
            let Component::Normal(name) = component else {
                return false;
            };
            return name.to_string_lossy().contains(self.client_segment.as_str());
        });
    }
}
