use std::ops::Range;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::policy;
use crate::resolver;
use crate::scanner::ReferenceScanner;
use crate::types::{Origin, ReferenceTarget};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Message for a client document reading a non-public key.
pub const NON_PUBLIC_MESSAGE: &str = "Accessing non-public settings from client code.";

/// How bad a diagnostic is, mirroring editor severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed.
    Error,
}

/// Which rule produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Client code reads a key outside `public`.
    PolicyViolation,
    /// The chain does not exist in the settings.
    UnresolvedKey,
}

/// One problem at one span of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Rule that fired.
    pub kind: DiagnosticKind,
    /// Human-readable message.
    pub message: String,
    /// Severity to render with.
    pub severity: Severity,
    /// Byte span in the document.
    pub span: Range<usize>,
}

/// Lint one document against a settings tree.
///
/// Returns a fresh batch that replaces whatever was reported before for this
/// document. Unknown keys and policy violations are independent: one
/// reference can produce both. Sorted by span, then message.
pub fn collect(
    scanner: &ReferenceScanner,
    tree: &Value,
    text: &str,
    client_scoped: bool,
    namespace: &str,
) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = scanner
        .scan(text)
        .flat_map(|reference| return reference.targets())
        .flat_map(|target| return diagnose_target(tree, &target, client_scoped, namespace))
        .collect();

    diagnostics.sort_by(|a, b| {
        return (a.span.start, a.span.end, &a.message).cmp(&(b.span.start, b.span.end, &b.message));
    });
    return diagnostics;
}

/// Diagnostics for a single effective chain.
fn diagnose_target(tree: &Value, target: &ReferenceTarget, client_scoped: bool, namespace: &str) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    if policy::evaluate(&target.chain, client_scoped).violates_policy {
        found.push(Diagnostic {
            kind: DiagnosticKind::PolicyViolation,
            message: NON_PUBLIC_MESSAGE.to_string(),
            severity: Severity::Error,
            span: target.span.clone(),
        });
    }

    if !resolver::resolve(tree, &target.chain).found {
        let message = match &target.origin {
            Origin::Destructured { prefix } => {
                let key = target.chain.last().unwrap_or_default();
                format!("Destructured key `{key}` does not exist in `{prefix}`.")
            },
            Origin::Direct => format!("Settings key does not exist: `{}`.", target.chain.qualified(namespace)),
        };
        found.push(Diagnostic {
            kind: DiagnosticKind::UnresolvedKey,
            message,
            severity: Severity::Error,
            span: target.span.clone(),
        });
    }

    return found;
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => format!("\
# Error: Config Not Found

`{}` does not exist.

## Fix

Drop `--config` to use `.settingsref.toml` in the workspace root, or create the file.
", path.display()),

        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist or cannot be read.
", path.display()),

        Error::InvalidPosition { file, position } => format!("\
# Error: Invalid Position

`{position}` is not a position inside `{}`.

## Fix

Pass a one-based `LINE:COL`, e.g. `12:27`.
", file.display()),

        Error::MalformedSettings { path, reason } => render_malformed_settings(path, reason),

        Error::Pattern(err) => format!("\
# Error: Invalid Namespace

The namespace does not form a valid pattern: {err}
"),

        Error::TomlDe(err) => format!("\
# Error: Invalid Config

{err}
"),

        Error::Watch(err) => format!("\
# Error: Watch Failed

{err}
"),

        Error::Io(_) | Error::Json(_) => format!("\
# Error

{e}
"),
    };
}

/// The single notice shown while the settings file cannot be parsed.
fn render_malformed_settings(path: &std::path::Path, reason: &str) -> String {
    return format!("\
# Warning: Malformed Settings

`{}` is not valid JSON: {reason}

## Effect

Every settings reference is checked against empty settings until the file parses again.
", path.display());
}
