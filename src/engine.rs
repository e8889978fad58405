//! One workspace: config, settings repository, and scanner, shared by every command.

use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::completion::{self, CompletionItem};
use crate::config::Config;
use crate::diagnostics::{self, Diagnostic};
use crate::document::{self, Document};
use crate::error::Error;
use crate::hover::{self, Hover};
use crate::links::{self, DocumentLink};
use crate::repository::SettingsRepository;
use crate::scanner::ReferenceScanner;
use crate::types::KeyChain;

/// Directories never descended into when collecting documents.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build"];

/// Owns the settings for one workspace. Every request resolves against the
/// snapshot current when it starts; nothing is cached across reloads.
#[derive(Debug)]
pub struct Engine {
    /// Loaded configuration.
    config: Config,
    /// Settings file state.
    repository: SettingsRepository,
    /// Reference patterns for the configured namespace.
    scanner: ReferenceScanner,
}

impl Engine {
    /// Set up an engine with empty settings; call `reload` to read the file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if the namespace cannot be compiled.
    pub fn new(config: Config) -> Result<Self, Error> {
        let scanner = ReferenceScanner::new(&config.namespace)?;
        let repository = SettingsRepository::new(config.settings_path());
        return Ok(Self { config, repository, scanner });
    }

    /// The loaded configuration.
    pub const fn config(&self) -> &Config {
        return &self.config;
    }

    /// The settings repository.
    pub const fn repository(&self) -> &SettingsRepository {
        return &self.repository;
    }

    /// Re-read the settings file.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedSettings` or `Error::Io`; settings are empty afterwards.
    pub fn reload(&self) -> Result<(), Error> {
        return self.repository.reload();
    }

    /// Read a document and classify it as client code or not. Classification
    /// uses the path relative to the workspace root, so a root directory that
    /// happens to be named like the client segment does not mark everything.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the document cannot be read.
    pub fn open_document(&self, path: &Path) -> Result<Document, Error> {
        let path = absolute(path);
        let relative = path.strip_prefix(&self.config.root).unwrap_or(&path);
        return Document::read(&path, self.config.is_client_scoped(relative));
    }

    /// Fresh diagnostics batch for a document.
    pub fn diagnostics(&self, document: &Document) -> Vec<Diagnostic> {
        let snapshot = self.repository.snapshot();
        let found = diagnostics::collect(
            &self.scanner,
            &snapshot.tree,
            &document.text,
            document.client_scoped,
            &self.config.namespace,
        );
        tracing::debug!(
            path = %document.path.display(),
            client = document.client_scoped,
            count = found.len(),
            "linted document"
        );
        return found;
    }

    /// Hover for the key at `offset`.
    pub fn hover(&self, document: &Document, offset: usize) -> Option<Hover> {
        let snapshot = self.repository.snapshot();
        return hover::hover(
            &self.scanner,
            &snapshot.tree,
            &document.text,
            offset,
            document.client_scoped,
            &self.config.namespace,
        );
    }

    /// Completion items for the cursor at `offset`.
    pub fn completions(&self, document: &Document, offset: usize) -> Vec<CompletionItem> {
        let snapshot = self.repository.snapshot();
        return completion::complete(&self.scanner, &snapshot.tree, &document.text, offset, document.client_scoped);
    }

    /// Navigation links into the settings file.
    pub fn links(&self, document: &Document) -> Vec<DocumentLink> {
        let snapshot = self.repository.snapshot();
        return links::links(&self.scanner, &snapshot, &document.text, self.repository.path());
    }

    /// The node at `chain` in the current settings.
    pub fn lookup(&self, chain: &KeyChain) -> Option<Value> {
        return self.repository.lookup(chain);
    }

    /// Collect the JS/TS documents under `paths` (the root when empty), applying
    /// the config include/exclude prefixes relative to the root. Sorted.
    pub fn documents(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let roots = if paths.is_empty() {
            vec![self.config.root.clone()]
        } else {
            paths.iter().map(|p| return absolute(p)).collect()
        };

        let mut found: Vec<PathBuf> = roots
            .iter()
            .flat_map(|root| {
                return WalkDir::new(root)
                    .into_iter()
                    .filter_entry(|e| return e.depth() == 0 || !is_skipped_dir(e))
                    .filter_map(Result::ok);
            })
            .filter(|e| return e.file_type().is_file() && document::is_source_file(e.path()))
            .map(walkdir::DirEntry::into_path)
            .filter(|path| {
                let relative = path.strip_prefix(&self.config.root).unwrap_or(path);
                return self.config.should_scan(&relative.to_string_lossy());
            })
            .collect();

        found.sort();
        found.dedup();
        return found;
    }
}

/// Command-line paths are relative to the working directory, the root may not be.
fn absolute(path: &Path) -> PathBuf {
    return std::path::absolute(path).unwrap_or_else(|_err| return path.to_path_buf());
}

/// Hidden directories and dependency/build output.
fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    return name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::Overrides;

    /// A workspace on disk with a settings file and a client and a server document.
    fn workspace(settings: &str) -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), settings).unwrap();
        std::fs::create_dir_all(dir.path().join("client")).unwrap();
        std::fs::create_dir_all(dir.path().join("server")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "Meteor.settings.nope").unwrap();

        let config = Config::load(dir.path(), &Overrides::default()).unwrap();
        let engine = Engine::new(config).unwrap();
        engine.reload().unwrap();
        return (dir, engine);
    }

    fn write_doc(dir: &tempfile::TempDir, relative: &str, text: &str) -> PathBuf {
        let path = dir.path().join(relative);
        std::fs::write(&path, text).unwrap();
        return path;
    }

    #[test]
    fn client_document_sees_policy_violations() {
        let (dir, engine) = workspace(r#"{"public":{"x":1},"secret":2}"#);
        let client = write_doc(&dir, "client/main.js", "Meteor.settings.secret");
        let server = write_doc(&dir, "server/main.js", "Meteor.settings.secret");

        let client_doc = engine.open_document(&client).unwrap();
        let server_doc = engine.open_document(&server).unwrap();
        assert!(client_doc.client_scoped);
        assert_eq!(engine.diagnostics(&client_doc).len(), 1);
        assert!(engine.diagnostics(&server_doc).is_empty());
    }

    #[test]
    fn deleted_settings_make_every_reference_unresolved() {
        let (dir, engine) = workspace(r#"{"a":{"b":2}}"#);
        let path = write_doc(&dir, "server/a.js", "Meteor.settings.a.b");
        let doc = engine.open_document(&path).unwrap();
        assert!(engine.diagnostics(&doc).is_empty());

        std::fs::remove_file(dir.path().join("settings.json")).unwrap();
        engine.repository().clear();
        assert_eq!(engine.diagnostics(&doc).len(), 1);
        assert_eq!(engine.lookup(&KeyChain::root()), Some(json!({})));

        std::fs::write(dir.path().join("settings.json"), r#"{"a":{"b":5}}"#).unwrap();
        engine.reload().unwrap();
        assert!(engine.diagnostics(&doc).is_empty());
        assert_eq!(engine.lookup(&KeyChain::new(["a", "b"])), Some(json!(5)));
    }

    #[test]
    fn documents_skip_dependencies_and_non_sources() {
        let (dir, engine) = workspace("{}");
        write_doc(&dir, "client/main.jsx", "");
        write_doc(&dir, "server/main.ts", "");
        write_doc(&dir, "server/notes.md", "");

        let docs = engine.documents(&[]);
        let names: Vec<String> = docs
            .iter()
            .map(|p| return p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["client/main.jsx", "server/main.ts"]);
    }

    #[test]
    fn links_point_into_the_settings_file() {
        let (dir, engine) = workspace("{\n  \"public\": {\n    \"x\": 1\n  }\n}");
        let path = write_doc(&dir, "client/a.js", "Meteor.settings.public.x");
        let doc = engine.open_document(&path).unwrap();
        let found = engine.links(&doc);
        assert_eq!(found.len(), 3);
        assert_eq!(found[2].target.line, 2);
        assert!(found[2].target_uri.ends_with("settings.json#L3,5"));
    }
}
