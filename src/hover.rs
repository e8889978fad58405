//! Hover previews for the key under the cursor.

use std::fmt::Write as _;
use std::ops::Range;

use serde::Serialize;
use serde_json::Value;

use crate::policy;
use crate::resolver;
use crate::scanner::ReferenceScanner;
use crate::types::{KeyChain, ResolvedType, SourceReference, chain_of};

/// Shown above the preview when client code hovers a non-public key.
pub const CLIENT_WARNING: &str = "Warning: Accessing non-public key in client code.";

/// Everything a hover renderer needs for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hover {
    /// Chain up to and including the hovered key.
    pub chain: KeyChain,
    /// Whether the chain is under `public`.
    pub is_public: bool,
    /// `Namespace.settings.a.b` for display.
    pub key_path: String,
    /// Type of the node, `missing` if it does not exist.
    pub resolved_type: ResolvedType,
    /// Span of the hovered token.
    pub span: Range<usize>,
    /// The node, if it exists.
    pub value: Option<Value>,
    /// Visibility warning for client documents.
    pub warning: Option<String>,
}

/// Hover for the settings key at byte `offset`, if the cursor is on one.
///
/// Hovering a key in the middle of a dotted path previews that prefix;
/// hovering `settings` previews the whole document; hovering a destructured
/// variable previews the key it binds.
pub fn hover(
    scanner: &ReferenceScanner,
    tree: &Value,
    text: &str,
    offset: usize,
    client_scoped: bool,
    namespace: &str,
) -> Option<Hover> {
    let (chain, span) = scanner.scan(text).find_map(|reference| return key_at(&reference, offset))?;

    let resolution = resolver::resolve(tree, &chain);
    let verdict = policy::evaluate(&chain, client_scoped);

    return Some(Hover {
        is_public: verdict.is_public,
        key_path: chain.qualified(namespace),
        resolved_type: resolution.resolved_type,
        span,
        value: resolution.value.cloned(),
        warning: verdict.violates_policy.then(|| return CLIENT_WARNING.to_string()),
        chain,
    });
}

/// The chain and token span under `offset` within one reference.
fn key_at(reference: &SourceReference, offset: usize) -> Option<(KeyChain, Range<usize>)> {
    if !covers(&reference.span(), offset) {
        return None;
    }
    if covers(&reference.settings_span(), offset) {
        return Some((KeyChain::root(), reference.settings_span()));
    }
    return match reference {
        SourceReference::Direct(d) => {
            let index = d.keys.iter().position(|k| return covers(&k.span, offset))?;
            let token = d.keys.get(index)?;
            let chain = chain_of(d.keys.get(..=index)?);
            Some((chain, token.span.clone()))
        },
        SourceReference::Destructured(d) => {
            let binding = d.bindings.iter().find(|b| return covers(&b.span, offset))?;
            Some((chain_of(&d.base).child(&binding.key), binding.span.clone()))
        },
    };
}

/// A cursor just after a token still counts as on it.
const fn covers(span: &Range<usize>, offset: usize) -> bool {
    return span.start <= offset && offset <= span.end;
}

/// Render as markdown: optional warning, `**path** (type):`, then a JSON block.
pub fn render_markdown(hover: &Hover) -> String {
    let mut out = String::new();
    if let Some(warning) = &hover.warning {
        let _ = write!(out, "**{warning}**\n\n");
    }
    let _ = writeln!(out, "**{}** ({}):", hover.key_path, hover.resolved_type);
    match &hover.value {
        Some(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
            let _ = write!(out, "\n```json\n{pretty}\n```\n");
        },
        None => out.push_str("\nThis key does not exist in the settings.\n"),
    }
    return out;
}
