//! File watcher: runs `check` on startup, then reloads settings and re-checks on changes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{EventKind, RecursiveMode, Watcher as _};

use crate::commands::{self, Format};
use crate::diagnostics;
use crate::document;
use crate::engine::Engine;
use crate::error::Error;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// What a batch of filesystem events means for the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// A JS/TS document changed; settings are unchanged.
    Documents,
    /// The settings file was removed.
    SettingsDeleted,
    /// The settings file was created or modified.
    SettingsWritten,
}

/// Classify one filesystem event, ignoring everything that cannot affect results.
fn classify(event: &notify::Event, settings_path: &Path) -> Option<Change> {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
        return None;
    }
    if event.paths.iter().any(|p| return same_file(p, settings_path)) {
        if matches!(event.kind, EventKind::Remove(_)) {
            return Some(Change::SettingsDeleted);
        }
        return Some(Change::SettingsWritten);
    }
    if event.paths.iter().any(|p| return document::is_source_file(p)) {
        return Some(Change::Documents);
    }
    return None;
}

/// Event paths are absolute; the configured settings path may not be.
fn same_file(event_path: &Path, settings_path: &Path) -> bool {
    let absolute = |p: &Path| return std::path::absolute(p).unwrap_or_else(|_err| return p.to_path_buf());
    return absolute(event_path) == absolute(settings_path);
}

/// Fold a debounced batch into the one change to act on.
/// A settings change outranks document edits, and the last settings event wins
/// (an editor's atomic save is a remove followed by a create).
fn coalesce(changes: impl IntoIterator<Item = Change>) -> Option<Change> {
    return changes.into_iter().fold(None, |acc, change| {
        return match (acc, change) {
            (Some(Change::SettingsDeleted | Change::SettingsWritten), Change::Documents) => acc,
            _ => Some(change),
        };
    });
}

/// Directories to watch: the settings file's parent and every document root.
/// A directory that is both is watched recursively.
fn collect_watch_dirs(engine: &Engine, paths: &[PathBuf]) -> HashMap<PathBuf, RecursiveMode> {
    let mut dirs = HashMap::new();
    let settings_dir = engine
        .repository()
        .path()
        .parent()
        .filter(|p| return !p.as_os_str().is_empty())
        .map_or_else(|| return PathBuf::from("."), Path::to_path_buf);
    dirs.insert(settings_dir, RecursiveMode::NonRecursive);

    if paths.is_empty() {
        dirs.insert(engine.config().root.clone(), RecursiveMode::Recursive);
    }
    for path in paths {
        let dir = if path.is_dir() {
            path.clone()
        } else {
            path.parent().map_or_else(|| return PathBuf::from("."), Path::to_path_buf)
        };
        dirs.insert(dir, RecursiveMode::Recursive);
    }
    return dirs;
}

/// Create a filesystem watcher that sends classified changes on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<Change>,
    settings_path: PathBuf,
) -> Result<notify::RecommendedWatcher, Error> {
    let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        match res {
            Ok(event) => {
                if let Some(change) = classify(&event, &settings_path) {
                    tracing::debug!(?change, paths = ?event.paths, "filesystem event");
                    let _ = tx.send(change);
                }
            },
            Err(e) => tracing::warn!(error = %e, "watcher error"),
        }
    })?;
    return Ok(watcher);
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the settings file and the documents and
/// re-checks on changes. A deleted settings file clears the settings; a
/// malformed one is reported once per change.
///
/// # Errors
///
/// Returns errors from settings reading or watcher setup.
pub fn run(engine: &Engine, paths: &[PathBuf], format: Format) -> Result<ExitCode, Error> {
    eprintln!("watch: initial check");
    let mut malformed = commands::reload_settings(engine)?;
    let mut last_code = run_lint(engine, paths, format, malformed);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx, engine.repository().path().to_path_buf())?;

    let watch_dirs = collect_watch_dirs(engine, paths);
    for (dir, mode) in &watch_dirs {
        if dir.exists()
            && let Err(e) = watcher.watch(dir, *mode)
        {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot watch directory");
        }
    }

    let dir_count = watch_dirs.len();
    eprintln!("watch: monitoring {dir_count} directories, press Ctrl+C to stop");

    while let Ok(first) = rx.recv() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        let mut batch = vec![first];
        while let Ok(next) = rx.recv_timeout(debounce) {
            batch.push(next);
        }

        match coalesce(batch) {
            Some(Change::SettingsDeleted) if !engine.repository().path().exists() => {
                eprintln!("watch: settings file removed, re-checking...");
                engine.repository().clear();
                malformed = false;
            },
            Some(Change::SettingsDeleted | Change::SettingsWritten) => {
                eprintln!("watch: settings changed, re-checking...");
                malformed = reload_or_report(engine);
            },
            Some(Change::Documents) => eprintln!("watch: change detected, re-checking..."),
            None => continue,
        }
        last_code = run_lint(engine, paths, format, malformed);
    }

    return Ok(last_code);
}

/// Reload after a change; a read failure is reported and treated as empty settings.
fn reload_or_report(engine: &Engine) -> bool {
    return match commands::reload_settings(engine) {
        Ok(malformed) => malformed,
        Err(e) => {
            diagnostics::print_error(&e);
            false
        },
    };
}

/// Run one lint pass and print the result. Returns the exit code from check.
fn run_lint(engine: &Engine, paths: &[PathBuf], format: Format, malformed: bool) -> ExitCode {
    return match commands::lint(engine, paths, format, malformed) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}
