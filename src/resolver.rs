//! Chain resolution against a settings tree.
//!
//! Every consumer goes through here; nothing else walks the tree.

use serde_json::Value;

use crate::types::{KeyChain, ResolvedType, Resolution};

/// Children of the node a partial chain landed on, filtered by the key being typed.
#[derive(Debug)]
pub struct PartialResolution<'t> {
    /// Matching `(key, node)` pairs in document order.
    pub candidates: Vec<(&'t str, &'t Value)>,
    /// Resolution of the fully typed part of the chain.
    pub parent: Resolution<'t>,
}

/// Walk `chain` left to right from the root of `tree`.
///
/// Descends only through objects. Arrays are whole values: a key after an
/// array is never found, even a numeric one.
pub fn resolve<'t>(tree: &'t Value, chain: &KeyChain) -> Resolution<'t> {
    let mut node = tree;
    let mut depth = 0_usize;

    for key in chain.keys() {
        let Some(next) = node.as_object().and_then(|map| return map.get(key)) else {
            return Resolution {
                deepest_reachable_chain: chain.prefix(depth),
                found: false,
                resolved_type: ResolvedType::Missing,
                value: None,
            };
        };
        node = next;
        depth = depth.saturating_add(1);
    }

    return Resolution {
        deepest_reachable_chain: chain.clone(),
        found: true,
        resolved_type: ResolvedType::of(node),
        value: Some(node),
    };
}

/// Resolve `chain`, then offer the children of the node it names whose key
/// starts with `in_progress`.
///
/// `chain` holds the segments already terminated by a dot; `in_progress` is
/// the segment under the cursor (possibly empty). No candidates are offered
/// when `chain` does not resolve to an object.
pub fn resolve_partial<'t>(tree: &'t Value, chain: &KeyChain, in_progress: &str) -> PartialResolution<'t> {
    let parent = resolve(tree, chain);
    let candidates = parent
        .value
        .and_then(Value::as_object)
        .map(|map| {
            return map
                .iter()
                .filter(|(key, _)| return key.starts_with(in_progress))
                .map(|(key, node)| return (key.as_str(), node))
                .collect();
        })
        .unwrap_or_default();

    return PartialResolution { candidates, parent };
}
