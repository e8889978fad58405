//! Core CLI commands for settingsref: check, hover, complete, links, show.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::completion::CompletionItem;
use crate::diagnostics::{self, Diagnostic, DiagnosticKind, Severity};
use crate::document::Document;
use crate::engine::Engine;
use crate::error::Error;
use crate::hover;
use crate::types::KeyChain;

/// Exit code when any diagnostic is reported, or a query finds nothing.
const EXIT_FINDINGS: u8 = 1;
/// Exit code when the settings file cannot be parsed.
const EXIT_MALFORMED: u8 = 2;

/// Output format shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON on stdout.
    Json,
    /// Human-readable lines on stdout.
    #[default]
    Text,
}

/// One diagnostic with one-based positions, for printing.
#[derive(Debug, Serialize)]
struct Finding {
    /// One-based column of the first character.
    column: usize,
    /// One-based column just past the last character.
    end_column: usize,
    /// One-based line of the last character.
    end_line: usize,
    /// Document path, relative to the root when possible.
    file: String,
    /// Rule that fired.
    kind: DiagnosticKind,
    /// One-based line of the first character.
    line: usize,
    /// Message as reported.
    message: String,
    /// Severity.
    severity: Severity,
}

/// Everything `check` prints in JSON mode.
#[derive(Debug, Serialize)]
struct CheckReport {
    /// Every diagnostic of every document, in path then span order.
    diagnostics: Vec<Finding>,
    /// Number of documents linted.
    files: usize,
    /// Whether the settings file failed to parse.
    malformed_settings: bool,
}

/// A link with one-based source positions, for printing.
#[derive(Debug, Serialize)]
struct LinkLine {
    /// One-based column in the document.
    column: usize,
    /// One-based line in the document.
    line: usize,
    /// Linked token text.
    text: String,
    /// `file://` URI into the settings file.
    target_uri: String,
}

/// Reload settings, printing the malformed-settings notice once.
/// Returns whether the file was malformed.
///
/// # Errors
///
/// Returns `Error::Io` if the settings file exists but cannot be read.
pub fn reload_settings(engine: &Engine) -> Result<bool, Error> {
    return match engine.reload() {
        Ok(()) => Ok(false),
        Err(e @ Error::MalformedSettings { .. }) => {
            diagnostics::print_error(&e);
            Ok(true)
        },
        Err(e) => Err(e),
    };
}

/// Load settings, then lint every document under `paths`.
///
/// # Errors
///
/// Returns errors from settings reading, document reading, or JSON output.
pub fn check(engine: &Engine, paths: &[PathBuf], format: Format) -> Result<ExitCode, Error> {
    let malformed = reload_settings(engine)?;
    return lint(engine, paths, format, malformed);
}

/// Lint every document under `paths` against the settings already loaded.
///
/// Exit code priority: malformed settings (2) > diagnostics (1) > clean (0).
///
/// # Errors
///
/// Returns errors from document reading or JSON output.
pub fn lint(engine: &Engine, paths: &[PathBuf], format: Format, malformed: bool) -> Result<ExitCode, Error> {
    let documents = engine.documents(paths);
    let mut findings = Vec::new();
    let mut dirty_files = 0_usize;

    for path in &documents {
        let document = engine.open_document(path)?;
        let found = engine.diagnostics(&document);
        if !found.is_empty() {
            dirty_files = dirty_files.saturating_add(1);
        }
        let file = display_path(engine, path);
        findings.extend(found.iter().map(|d| return finding(&document, &file, d)));
    }

    match format {
        Format::Json => {
            let report = CheckReport {
                files: documents.len(),
                malformed_settings: malformed,
                diagnostics: findings,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(check_exit_code(malformed, !report.diagnostics.is_empty()));
        },
        Format::Text => {
            for f in &findings {
                println!("{}:{}:{}: {}: {}", f.file, f.line, f.column, severity_label(f.severity), f.message);
            }
            let total = documents.len();
            if findings.is_empty() {
                println!("No problems in {total} files");
            } else {
                println!();
                println!("{} problems in {dirty_files} of {total} files", findings.len());
            }
            return Ok(check_exit_code(malformed, !findings.is_empty()));
        },
    }
}

/// Map check results to the documented exit codes.
fn check_exit_code(malformed: bool, has_findings: bool) -> ExitCode {
    if malformed {
        return ExitCode::from(EXIT_MALFORMED);
    }
    if has_findings {
        return ExitCode::from(EXIT_FINDINGS);
    }
    return ExitCode::SUCCESS;
}

/// Convert a byte-span diagnostic to one-based line/column.
fn finding(document: &Document, file: &str, diagnostic: &Diagnostic) -> Finding {
    let start = document.position(diagnostic.span.start);
    let end = document.position(diagnostic.span.end);
    return Finding {
        column: start.column.saturating_add(1),
        end_column: end.column.saturating_add(1),
        end_line: end.line.saturating_add(1),
        file: file.to_string(),
        kind: diagnostic.kind,
        line: start.line.saturating_add(1),
        message: diagnostic.message.clone(),
        severity: diagnostic.severity,
    };
}

/// Lowercase name used in `path:line:col: error: ...` lines.
const fn severity_label(severity: Severity) -> &'static str {
    return match severity {
        Severity::Error => "error",
    };
}

/// Path relative to the workspace root, with forward slashes.
fn display_path(engine: &Engine, path: &Path) -> String {
    let relative = path.strip_prefix(&engine.config().root).unwrap_or(path);
    return relative.to_string_lossy().replace('\\', "/");
}

/// Print the hover for the key at a one-based `LINE:COL`.
/// Exits 1 when the position is not on a settings reference.
///
/// # Errors
///
/// Returns errors from settings or document reading, position parsing, or JSON output.
pub fn hover(engine: &Engine, file: &Path, position: &str, format: Format) -> Result<ExitCode, Error> {
    reload_settings(engine)?;
    let document = engine.open_document(file)?;
    let offset = document.offset_of_argument(position)?;

    let Some(found) = engine.hover(&document, offset) else {
        eprintln!("No settings reference at {}:{position}.", file.display());
        return Ok(ExitCode::from(EXIT_FINDINGS));
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&found)?),
        Format::Text => print!("{}", hover::render_markdown(&found)),
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print completion items for the text before a one-based `LINE:COL`.
/// Exits 1 when nothing can be offered.
///
/// # Errors
///
/// Returns errors from settings or document reading, position parsing, or JSON output.
pub fn complete(engine: &Engine, file: &Path, position: &str, format: Format) -> Result<ExitCode, Error> {
    reload_settings(engine)?;
    let document = engine.open_document(file)?;
    let offset = document.offset_of_argument(position)?;
    let items = engine.completions(&document, offset);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        Format::Text => {
            for item in &items {
                println!("{}", completion_line(item));
            }
        },
    }

    if items.is_empty() {
        return Ok(ExitCode::from(EXIT_FINDINGS));
    }
    return Ok(ExitCode::SUCCESS);
}

/// `label  Detail`, flagged when the key is not public in client code.
fn completion_line(item: &CompletionItem) -> String {
    let flag = if item.documentation.starts_with("**⚠️") { "  (non-public)" } else { "" };
    return format!("{:<24} {}{flag}", item.label, item.detail);
}

/// Print every navigation link in a document.
///
/// # Errors
///
/// Returns errors from settings or document reading, or JSON output.
pub fn links(engine: &Engine, file: &Path, format: Format) -> Result<ExitCode, Error> {
    reload_settings(engine)?;
    let document = engine.open_document(file)?;

    let lines: Vec<LinkLine> = engine
        .links(&document)
        .into_iter()
        .map(|link| {
            let start = document.position(link.span.start);
            return LinkLine {
                column: start.column.saturating_add(1),
                line: start.line.saturating_add(1),
                text: document.slice(link.span).to_string(),
                target_uri: link.target_uri,
            };
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
        Format::Text => {
            for l in &lines {
                println!("{}:{}  {}  ->  {}", l.line, l.column, l.text, l.target_uri);
            }
        },
    }
    return Ok(ExitCode::SUCCESS);
}

/// Pretty-print the parsed settings, or the subtree at a dotted path.
///
/// Exits 2 when the file is malformed (after printing the notice) and 1 when
/// the path does not exist.
///
/// # Errors
///
/// Returns errors from settings reading or JSON output.
pub fn show(engine: &Engine, path: Option<&str>) -> Result<ExitCode, Error> {
    if reload_settings(engine)? {
        return Ok(ExitCode::from(EXIT_MALFORMED));
    }

    let chain = path.map_or_else(KeyChain::root, KeyChain::parse_dotted);
    let Some(node) = engine.lookup(&chain) else {
        let namespace = &engine.config().namespace;
        eprintln!("`{}` does not exist in the settings.", chain.qualified(namespace));
        return Ok(ExitCode::from(EXIT_FINDINGS));
    };

    println!("{}", serde_json::to_string_pretty(&node)?);
    return Ok(ExitCode::SUCCESS);
}
