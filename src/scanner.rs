use std::ops::Range;

use regex::{Captures, Regex};

use crate::error::Error;
use crate::types::{DestructuredReference, DirectReference, KeyChain, KeyToken, SourceReference};

/// A settings path being typed at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    /// Segments already closed by a dot.
    pub chain: KeyChain,
    /// The segment under the cursor, possibly empty.
    pub in_progress: String,
    /// Span of `in_progress` within the scanned prefix.
    pub in_progress_span: Range<usize>,
}

/// Finds settings-path expressions in JavaScript/TypeScript text.
///
/// Pattern scanning, not parsing: comments and strings are scanned like code.
/// Both patterns run as independent passes, so a destructuring line also
/// yields a direct reference for its right-hand side when that has a key.
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    /// `NS.settings.a.b.pa` anchored at the end of the text before the cursor.
    completion: Regex,
    /// `(const|let|var) { a, b } = NS.settings(.seg)*`
    destructuring: Regex,
    /// `NS.settings(.seg)+`
    direct: Regex,
}

impl ReferenceScanner {
    /// Compile the patterns for a root namespace token such as `Meteor`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if the namespace produces an invalid regex.
    pub fn new(namespace: &str) -> Result<Self, Error> {
        let starts_with_word = namespace.starts_with(|c: char| return c.is_ascii_alphanumeric() || c == '_');
        let boundary = if starts_with_word { r"\b" } else { "" };
        let root = format!(r"{boundary}{}\.(settings)", regex::escape(namespace));

        let direct = Regex::new(&format!(r"{root}((?:\.[A-Za-z0-9_]+)+)"))?;
        let destructuring = Regex::new(&format!(
            r"\b(?:const|let|var)\s*\{{([^}}]+)\}}\s*=\s*({root}((?:\.[A-Za-z0-9_]+)*))\b"
        ))?;

        let completion = Regex::new(&format!(r"{root}((?:\.[A-Za-z0-9_]*)+)$"))?;

        return Ok(Self { completion, destructuring, direct });
    }

    /// Lazily yield every reference in `text`: direct references first, then
    /// destructured ones, each pass in text order.
    ///
    /// Stateless; scanning the same text twice yields equal references.
    pub fn scan<'s>(&'s self, text: &'s str) -> impl Iterator<Item = SourceReference> + 's {
        let direct = self
            .direct
            .captures_iter(text)
            .filter_map(move |cap| return parse_direct_capture(text, &cap));
        let destructured = self
            .destructuring
            .captures_iter(text)
            .filter_map(move |cap| return parse_destructuring_capture(text, &cap));
        return direct.chain(destructured);
    }

    /// Parse the text before the cursor on its line into the chain typed so
    /// far and the segment being typed. Requires at least one dot after
    /// `settings`; `NS.settings.` offers the top-level keys.
    pub fn completion_context(&self, line_prefix: &str) -> Option<CompletionContext> {
        let tail = self.completion.captures(line_prefix)?.get(2)?;
        let mut segments: Vec<&str> = tail.as_str().split('.').skip(1).collect();
        let in_progress = segments.pop()?;
        let start = tail.end().saturating_sub(in_progress.len());

        return Some(CompletionContext {
            chain: KeyChain::new(segments),
            in_progress: in_progress.to_string(),
            in_progress_span: start..tail.end(),
        });
    }
}

/// Build a direct reference from `NS.(settings)(.a.b)`.
/// Returns `None` when the last key runs on into a `$`.
fn parse_direct_capture(text: &str, cap: &Captures<'_>) -> Option<SourceReference> {
    let whole = cap.get(0)?;
    let settings = cap.get(1)?;
    let segments = cap.get(2)?;
    if !ends_at_word_boundary(text, whole.end()) {
        return None;
    }

    return Some(SourceReference::Direct(DirectReference {
        keys: split_segments(segments.as_str(), segments.start()),
        settings_span: settings.range(),
        span: whole.range(),
    }));
}

/// Build a destructured reference from `const {(body)} = (NS.(settings)(.x))`.
/// Returns `None` when the right-hand side is a longer identifier such as
/// `settingsCache` or `a$b`, or when the pattern binds no usable key.
fn parse_destructuring_capture(text: &str, cap: &Captures<'_>) -> Option<SourceReference> {
    let whole = cap.get(0)?;
    let body = cap.get(1)?;
    let prefix = cap.get(2)?;
    let settings = cap.get(3)?;
    let segments = cap.get(4)?;
    if !ends_at_word_boundary(text, prefix.end()) {
        return None;
    }

    let bindings = locate_bindings(text, body.as_str(), body.start());
    if bindings.is_empty() {
        return None;
    }

    return Some(SourceReference::Destructured(DestructuredReference {
        base: split_segments(segments.as_str(), segments.start()),
        bindings,
        prefix_text: prefix.as_str().to_string(),
        settings_span: settings.range(),
        span: whole.range(),
    }));
}

/// Split `.a.b.c` (starting at byte `start`) into one token per key.
fn split_segments(segments: &str, start: usize) -> Vec<KeyToken> {
    let mut tokens = Vec::new();
    let mut offset = start;
    for key in segments.split('.') {
        let key_start = offset;
        let key_end = key_start.saturating_add(key.len());
        // Skip past the key and the following dot.
        offset = key_end.saturating_add(1);
        if key.is_empty() {
            continue;
        }
        tokens.push(KeyToken {
            key: key.to_string(),
            span: key_start..key_end,
        });
    }
    return tokens;
}

/// Locate each destructured key in the binding pattern.
///
/// `key`, `key: alias` and `key = default` all bind `key`; rest elements and
/// empty entries bind nothing. The key's span is found by a whole-word search
/// starting at its own entry, so a name repeated as another entry's alias is
/// not mistaken for it.
fn locate_bindings(text: &str, body: &str, body_start: usize) -> Vec<KeyToken> {
    let mut bindings = Vec::new();
    let mut entry_start = body_start;

    for entry in body.split(',') {
        let search_from = entry_start;
        entry_start = entry_start.saturating_add(entry.len()).saturating_add(1);

        let Some(key) = binding_key(entry) else {
            continue;
        };
        let Some(start) = find_whole_word(text, key, search_from) else {
            continue;
        };
        bindings.push(KeyToken {
            key: key.to_string(),
            span: start..start.saturating_add(key.len()),
        });
    }

    return bindings;
}

/// The settings key bound by one destructuring entry, if any.
fn binding_key(entry: &str) -> Option<&str> {
    let trimmed = entry.trim_start();
    if trimmed.starts_with("...") {
        return None;
    }
    let end = trimmed.find(|c: char| return !is_ident_char(c)).unwrap_or(trimmed.len());
    let key = trimmed.get(..end)?;
    if key.is_empty() {
        return None;
    }
    return Some(key);
}

/// Byte offset of the first whole-word occurrence of `word` at or after `from`.
pub(crate) fn find_whole_word(text: &str, word: &str, from: usize) -> Option<usize> {
    let haystack = text.get(from..)?;
    for (relative, _) in haystack.match_indices(word) {
        let start = from.saturating_add(relative);
        let end = start.saturating_add(word.len());
        let before_ok = text
            .get(..start)
            .and_then(|s| return s.chars().next_back())
            .is_none_or(|c| return !is_ident_char(c));
        let after_ok = ends_at_word_boundary(text, end);
        if before_ok && after_ok {
            return Some(start);
        }
    }
    return None;
}

/// Whether no identifier character follows byte offset `end`.
fn ends_at_word_boundary(text: &str, end: usize) -> bool {
    return text
        .get(end..)
        .and_then(|s| return s.chars().next())
        .is_none_or(|c| return !is_ident_char(c));
}

/// Characters that can appear in a JavaScript identifier (ASCII subset).
pub(crate) const fn is_ident_char(c: char) -> bool {
    return c.is_ascii_alphanumeric() || c == '_' || c == '$';
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
#[allow(clippy::string_slice, reason = "tests")]
mod tests {
    use super::*;
    use crate::types::{KeyChain, chain_of};

    fn scanner() -> ReferenceScanner {
        return ReferenceScanner::new("Meteor").unwrap();
    }

    fn direct(reference: &SourceReference) -> &DirectReference {
        let SourceReference::Direct(d) = reference else {
            panic!("expected direct reference, got {reference:?}");
        };
        return d;
    }

    fn destructured(reference: &SourceReference) -> &DestructuredReference {
        let SourceReference::Destructured(d) = reference else {
            panic!("expected destructured reference, got {reference:?}");
        };
        return d;
    }

    #[test]
    fn direct_reference_tracks_every_key() {
        let text = "if (Meteor.settings.public.feature.enabled) {}";
        let refs: Vec<_> = scanner().scan(text).collect();
        assert_eq!(refs.len(), 1);

        let d = direct(&refs[0]);
        assert_eq!(&text[d.span.clone()], "Meteor.settings.public.feature.enabled");
        assert_eq!(&text[d.settings_span.clone()], "settings");
        let keys: Vec<&str> = d.keys.iter().map(|k| return &text[k.span.clone()]).collect();
        assert_eq!(keys, vec!["public", "feature", "enabled"]);
        assert_eq!(chain_of(&d.keys), KeyChain::new(["public", "feature", "enabled"]));
    }

    #[test]
    fn bare_settings_is_not_a_direct_reference() {
        let refs: Vec<_> = scanner().scan("const all = Meteor.settings;").collect();
        assert!(refs.is_empty());
    }

    #[test]
    fn other_namespaces_are_ignored() {
        let refs: Vec<_> = scanner().scan("NotMeteor.settings.a; Meteorx.settings.b").collect();
        assert!(refs.is_empty());
    }

    #[test]
    fn custom_namespace_is_escaped() {
        let scanner = ReferenceScanner::new("$app").unwrap();
        let refs: Vec<_> = scanner.scan("x = $app.settings.a; y = Xapp.settings.b").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(chain_of(&direct(&refs[0]).keys), KeyChain::new(["a"]));
    }

    #[test]
    fn reserved_words_are_keys() {
        let text = "Meteor.settings.public.default.class";
        let refs: Vec<_> = scanner().scan(text).collect();
        assert_eq!(chain_of(&direct(&refs[0]).keys), KeyChain::new(["public", "default", "class"]));
    }

    #[test]
    fn trailing_dot_is_not_part_of_the_chain() {
        let text = "Meteor.settings.public.";
        let refs: Vec<_> = scanner().scan(text).collect();
        assert_eq!(chain_of(&direct(&refs[0]).keys), KeyChain::new(["public"]));
    }

    #[test]
    fn longer_identifiers_are_not_settings_paths() {
        let text = "const { a } = Meteor.settingsCache;\nconst { b } = Meteor.settings.ab$c;\nMeteor.settings.x$y;";
        let refs: Vec<_> = scanner().scan(text).collect();
        assert!(refs.is_empty(), "{refs:?}");
    }

    #[test]
    fn destructuring_appends_bindings_to_prefix() {
        let text = "const { apiKey, region } = Meteor.settings.private.aws;";
        let refs: Vec<_> = scanner().scan(text).collect();
        // One direct (right-hand side) and one destructured.
        assert_eq!(refs.len(), 2);

        let d = destructured(&refs[1]);
        assert_eq!(d.prefix_text, "Meteor.settings.private.aws");
        assert_eq!(chain_of(&d.base), KeyChain::new(["private", "aws"]));
        let names: Vec<&str> = d.bindings.iter().map(|b| return &text[b.span.clone()]).collect();
        assert_eq!(names, vec!["apiKey", "region"]);

        let chains: Vec<KeyChain> = refs[1].targets().into_iter().map(|t| return t.chain).collect();
        assert_eq!(
            chains,
            vec![
                KeyChain::new(["private", "aws", "apiKey"]),
                KeyChain::new(["private", "aws", "region"]),
            ]
        );
    }

    #[test]
    fn destructuring_from_bare_settings_has_empty_base() {
        let text = "let {public} = Meteor.settings";
        let refs: Vec<_> = scanner().scan(text).collect();
        assert_eq!(refs.len(), 1);
        let d = destructured(&refs[0]);
        assert!(d.base.is_empty());
        assert_eq!(refs[0].targets()[0].chain, KeyChain::new(["public"]));
    }

    #[test]
    fn aliases_defaults_and_rest_entries() {
        let text = "var { a: b, b = 3, ...rest, } = Meteor.settings.x";
        let refs: Vec<_> = scanner().scan(text).collect();
        let d = destructured(&refs[1]);
        let keys: Vec<&str> = d.bindings.iter().map(|b| return b.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        // `b` is located at its own entry, not at the alias of `a`.
        assert_eq!(d.bindings[1].span.start, text.find("b =").unwrap());
    }

    #[test]
    fn identifiers_are_matched_as_whole_words() {
        let text = "const { id, idx } = Meteor.settings.ids";
        let refs: Vec<_> = scanner().scan(text).collect();
        let d = destructured(&refs[1]);
        assert_eq!(d.bindings[0].span.start, text.find("id,").unwrap());
        assert_eq!(d.bindings[1].span.start, text.find("idx").unwrap());
    }

    #[test]
    fn multiline_destructuring() {
        let text = "const {\n  host,\n  port\n} = Meteor.settings.db;\n";
        let refs: Vec<_> = scanner().scan(text).collect();
        let d = destructured(&refs[1]);
        assert_eq!(&text[d.bindings[1].span.clone()], "port");
    }

    #[test]
    fn offsets_account_for_multibyte_text() {
        let text = "// héllo ✓\nconst x = Meteor.settings.public.x;";
        let refs: Vec<_> = scanner().scan(text).collect();
        let d = direct(&refs[0]);
        assert_eq!(&text[d.keys[1].span.clone()], "x");
    }

    #[test]
    fn scan_is_idempotent() {
        let text = "\
import { Meteor } from 'meteor/meteor';
const { a, b } = Meteor.settings.public;
const c = Meteor.settings.public.c + Meteor.settings.secret;
";
        let s = scanner();
        let first: Vec<_> = s.scan(text).collect();
        let second: Vec<_> = s.scan(text).collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn completion_context_after_dot() {
        let context = scanner().completion_context("  const x = Meteor.settings.").unwrap();
        assert!(context.chain.is_empty());
        assert_eq!(context.in_progress, "");
        assert_eq!(context.in_progress_span, 28..28);
    }

    #[test]
    fn completion_context_mid_segment() {
        let prefix = "if (Meteor.settings.public.fe";
        let context = scanner().completion_context(prefix).unwrap();
        assert_eq!(context.chain, KeyChain::new(["public"]));
        assert_eq!(context.in_progress, "fe");
        assert_eq!(&prefix[context.in_progress_span], "fe");
    }

    #[test]
    fn completion_context_requires_a_dot_after_settings() {
        assert!(scanner().completion_context("Meteor.settings").is_none());
        assert!(scanner().completion_context("Meteor.settings.a + 1").is_none());
        assert!(scanner().completion_context("Session.settings.").is_none());
    }

    #[test]
    fn find_whole_word_skips_partial_matches() {
        let text = "ab a_b b";
        assert_eq!(find_whole_word(text, "b", 0), Some(7));
        assert_eq!(find_whole_word(text, "ab", 0), Some(0));
        assert_eq!(find_whole_word(text, "ab", 1), None);
    }
}
