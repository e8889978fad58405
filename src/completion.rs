//! Key completion for a settings path being typed.

use std::ops::Range;

use serde::Serialize;
use serde_json::Value;

use crate::policy;
use crate::resolver;
use crate::scanner::ReferenceScanner;
use crate::types::ResolvedType;

/// Sort key that pushes non-public keys below everything else in client code.
const DEMOTED_SORT_TEXT: &str = "99999";

/// Editor icon for a completion entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    /// Arrays.
    Enum,
    /// Objects, which can be completed further.
    Module,
    /// Numbers.
    Number,
    /// Strings.
    Text,
    /// Booleans and null.
    Value,
}

/// One offered key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    /// Short type name, e.g. `Object`.
    pub detail: String,
    /// Markdown: optional warning, then a description of the value.
    pub documentation: String,
    /// Byte span of the segment being typed; the label replaces it.
    pub insert_range: Range<usize>,
    /// Icon.
    pub kind: CompletionKind,
    /// The key.
    pub label: String,
    /// Ranking; document order, with policy violations last.
    pub sort_text: String,
}

/// Completion items for the cursor at byte `offset`.
///
/// Only the text between the start of the line and the cursor is considered.
/// Offers the children of the typed path whose key starts with the segment
/// under the cursor, in settings-file order, non-public keys last in client
/// code. Returns nothing when the cursor is not after `Namespace.settings.`.
pub fn complete(
    scanner: &ReferenceScanner,
    tree: &Value,
    text: &str,
    offset: usize,
    client_scoped: bool,
) -> Vec<CompletionItem> {
    let Some(before) = text.get(..offset) else {
        return Vec::new();
    };
    let line_start = before.rfind('\n').map_or(0, |i| return i.saturating_add(1));
    let Some(context) = before.get(line_start..).and_then(|p| return scanner.completion_context(p)) else {
        return Vec::new();
    };

    let insert_range = line_start.saturating_add(context.in_progress_span.start)
        ..line_start.saturating_add(context.in_progress_span.end);
    let partial = resolver::resolve_partial(tree, &context.chain, &context.in_progress);
    if !partial.parent.found {
        tracing::debug!(chain = %context.chain, "nothing to complete under a missing key");
        return Vec::new();
    }

    let mut items: Vec<CompletionItem> = partial
        .candidates
        .iter()
        .enumerate()
        .map(|(index, (key, node))| {
            let violates = policy::evaluate(&context.chain.child(key), client_scoped).violates_policy;
            return completion_item(index, key, node, violates, insert_range.clone());
        })
        .collect();

    // Stable: violations keep their relative order at the end.
    items.sort_by(|a, b| return a.sort_text.cmp(&b.sort_text));
    tracing::debug!(chain = %context.chain, typed = %context.in_progress, count = items.len(), "completion");
    return items;
}

/// Describe one child node.
fn completion_item(
    index: usize,
    key: &str,
    node: &Value,
    violates_policy: bool,
    insert_range: Range<usize>,
) -> CompletionItem {
    let (kind, detail, description) = describe(node);

    let mut documentation = String::new();
    let sort_text = if violates_policy {
        documentation.push_str("**⚠️ Warning: Accessing non-public key in client code.**\n\n");
        DEMOTED_SORT_TEXT.to_string()
    } else {
        format!("{index:05}")
    };
    documentation.push_str(&description);

    return CompletionItem {
        detail: detail.to_string(),
        documentation,
        insert_range,
        kind,
        label: key.to_string(),
        sort_text,
    };
}

/// Icon, detail and markdown description for a node.
fn describe(node: &Value) -> (CompletionKind, &'static str, String) {
    let pretty = || return serde_json::to_string_pretty(node).unwrap_or_default();
    return match (ResolvedType::of(node), node) {
        (ResolvedType::Object, _) => (
            CompletionKind::Module,
            "Object",
            format!("An object with properties:\n\n```json\n{}\n```", pretty()),
        ),
        (ResolvedType::Array, _) => (
            CompletionKind::Enum,
            "Array",
            format!("An array with elements:\n\n```json\n{}\n```", pretty()),
        ),
        (_, Value::String(s)) => (CompletionKind::Text, "String", format!("A string value: \"{s}\"")),
        (_, Value::Number(n)) => (CompletionKind::Number, "Number", format!("A number value: {n}")),
        (_, Value::Bool(b)) => (CompletionKind::Value, "Boolean", format!("A boolean value: {b}")),
        _ => (CompletionKind::Value, "Null", "A null value.".to_string()),
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
mod tests {
    use serde_json::json;

    use super::*;

    fn complete_at_end(tree: &Value, text: &str, client_scoped: bool) -> Vec<CompletionItem> {
        let scanner = ReferenceScanner::new("Meteor").unwrap();
        return complete(&scanner, tree, text, text.len(), client_scoped);
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        return items.iter().map(|i| return i.label.as_str()).collect();
    }

    #[test]
    fn client_ranks_public_first_and_warns_on_the_rest() {
        let tree = json!({ "x": 1, "public": {} });
        let items = complete_at_end(&tree, "Meteor.settings.", true);
        assert_eq!(labels(&items), vec!["public", "x"]);
        assert!(!items[0].documentation.contains("Warning"));
        assert!(items[1].documentation.contains("Warning"));
        assert_eq!(items[1].sort_text, "99999");
    }

    #[test]
    fn server_keeps_document_order_without_warnings() {
        let tree = json!({ "x": 1, "public": {} });
        let items = complete_at_end(&tree, "Meteor.settings.", false);
        assert_eq!(labels(&items), vec!["x", "public"]);
        assert!(items.iter().all(|i| return !i.documentation.contains("Warning")));
    }

    #[test]
    fn filters_by_segment_being_typed() {
        let tree = json!({ "public": { "apiUrl": "u", "apiKey": "k", "theme": "dark" } });
        let text = "fetch(Meteor.settings.public.api";
        let items = complete_at_end(&tree, text, true);
        assert_eq!(labels(&items), vec!["apiUrl", "apiKey"]);
        assert_eq!(items[0].insert_range, text.len() - 3..text.len());
        assert_eq!(items[0].kind, CompletionKind::Text);
        assert_eq!(items[0].documentation, "A string value: \"u\"");
    }

    #[test]
    fn kinds_and_details_follow_value_types() {
        let tree = json!({ "o": {}, "a": [1], "n": 2, "b": true, "z": null });
        let items = complete_at_end(&tree, "Meteor.settings.", false);
        let kinds: Vec<(&str, CompletionKind, &str)> = items
            .iter()
            .map(|i| return (i.label.as_str(), i.kind, i.detail.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("o", CompletionKind::Module, "Object"),
                ("a", CompletionKind::Enum, "Array"),
                ("n", CompletionKind::Number, "Number"),
                ("b", CompletionKind::Value, "Boolean"),
                ("z", CompletionKind::Value, "Null"),
            ]
        );
    }

    #[test]
    fn unknown_parent_offers_nothing() {
        let tree = json!({ "public": {} });
        assert!(complete_at_end(&tree, "Meteor.settings.nope.", false).is_empty());
        assert!(complete_at_end(&tree, "Meteor.settings", false).is_empty());
    }

    #[test]
    fn only_the_current_line_counts() {
        let tree = json!({ "public": { "a": 1 } });
        let text = "Meteor.settings.public.\nconst y = ";
        assert!(complete_at_end(&tree, text, false).is_empty());
        let text = "const y = 1;\nMeteor.settings.public.";
        let items = complete_at_end(&tree, text, false);
        assert_eq!(labels(&items), vec!["a"]);
        assert_eq!(items[0].insert_range, text.len()..text.len());
    }
}
