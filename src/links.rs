//! Navigation links from settings references to the settings file.

use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::locator::LocatorCursor;
use crate::repository::Settings;
use crate::resolver;
use crate::scanner::ReferenceScanner;
use crate::types::{DestructuredReference, DirectReference, LocatedPosition, SourceReference, chain_of};

/// A clickable span that opens the settings file at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    /// Byte span in the document.
    pub span: Range<usize>,
    /// Zero-based target position in the settings file.
    pub target: LocatedPosition,
    /// `file://` URI with a one-based `#L{line},{column}` fragment.
    pub target_uri: String,
}

/// Link every located key of every reference in `text`.
///
/// The `settings` token always links to the top of the file. A key links only
/// when it exists in the tree and its quoted name is found in the raw text;
/// otherwise it is skipped. One locator cursor serves the whole scan and only
/// moves down the file, so `db.name` under `private` is not confused with
/// `db.name` under `public` when `private` comes first in the chain. A key
/// whose only occurrence lies above the cursor gets no link.
pub fn links(scanner: &ReferenceScanner, settings: &Settings, text: &str, settings_path: &Path) -> Vec<DocumentLink> {
    let mut found = Vec::new();
    let mut cursor = LocatorCursor::new(&settings.raw);
    let mut link = |span: Range<usize>, target: LocatedPosition| {
        found.push(DocumentLink {
            span,
            target,
            target_uri: target_uri(settings_path, target),
        });
    };

    for reference in scanner.scan(text) {
        match &reference {
            SourceReference::Direct(d) => link_direct(settings, d, &mut cursor, &mut link),
            SourceReference::Destructured(d) => link_destructured(settings, d, &mut cursor, &mut link),
        }
    }

    tracing::debug!(count = found.len(), "links");
    return found;
}

/// Link the `settings` token and each existing key of a dotted expression.
fn link_direct(
    settings: &Settings,
    reference: &DirectReference,
    cursor: &mut LocatorCursor<'_>,
    link: &mut impl FnMut(Range<usize>, LocatedPosition),
) {
    link(reference.settings_span.clone(), top_of_file());

    let reachable = resolver::resolve(&settings.tree, &chain_of(&reference.keys))
        .deepest_reachable_chain
        .len();
    for key in reference.keys.iter().take(reachable) {
        if let Some(position) = cursor.advance(&key.key) {
            link(key.span.clone(), position);
        }
    }
}

/// Link each destructured variable that exists under the prefix.
///
/// Prefix keys are linked by the direct pass; here they only move the cursor.
/// A bare `settings` prefix has no direct reference, so its token is linked here.
fn link_destructured(
    settings: &Settings,
    reference: &DestructuredReference,
    cursor: &mut LocatorCursor<'_>,
    link: &mut impl FnMut(Range<usize>, LocatedPosition),
) {
    if reference.base.is_empty() {
        link(reference.settings_span.clone(), top_of_file());
    }

    let base = chain_of(&reference.base);
    let Some(parent) = resolver::resolve(&settings.tree, &base).value.and_then(|v| return v.as_object()) else {
        return;
    };
    for key in &reference.base {
        cursor.advance(&key.key);
    }

    for binding in reference.bindings.iter().filter(|b| return parent.contains_key(&b.key)) {
        if let Some(position) = cursor.advance(&binding.key) {
            link(binding.span.clone(), position);
        }
    }
}

/// Where the zero-length chain points.
const fn top_of_file() -> LocatedPosition {
    return LocatedPosition { column: 0, line: 0 };
}

/// `file:///abs/settings.json#L3,5` (one-based).
pub fn target_uri(settings_path: &Path, target: LocatedPosition) -> String {
    let absolute = std::path::absolute(settings_path).unwrap_or_else(|_err| return settings_path.to_path_buf());
    let path = absolute.to_string_lossy().replace('\\', "/");
    let slash = if path.starts_with('/') { "" } else { "/" };
    return format!(
        "file://{slash}{path}#L{},{}",
        target.line.saturating_add(1),
        target.column.saturating_add(1)
    );
}
