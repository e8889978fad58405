/// Core domain types for settings references, chains, and resolutions.
use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// The only top-level key that client code may read.
pub const PUBLIC_KEY: &str = "public";

/// Ordered path of keys below the settings root, e.g. `public.feature.enabled`.
/// Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct KeyChain(
    /// The keys, outermost first.
    Vec<String>,
);

impl KeyChain {
    /// The zero-length chain naming the settings root.
    pub const fn root() -> Self {
        return Self(Vec::new());
    }

    /// Build a chain from anything yielding keys.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        return Self(keys.into_iter().map(Into::into).collect());
    }

    /// Parse a dotted path (`a.b.c`). The empty string is the root chain.
    pub fn parse_dotted(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        return Self::new(path.split('.'));
    }

    /// A new chain with `key` appended.
    pub fn child(&self, key: &str) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.to_string());
        return Self(keys);
    }

    /// The first `len` keys of this chain.
    pub fn prefix(&self, len: usize) -> Self {
        return Self(self.0.iter().take(len).cloned().collect());
    }

    /// The first key, if any.
    pub fn first(&self) -> Option<&str> {
        return self.0.first().map(String::as_str);
    }

    /// The last key, if any.
    pub fn last(&self) -> Option<&str> {
        return self.0.last().map(String::as_str);
    }

    /// Borrow the keys as a slice.
    pub fn keys(&self) -> &[String] {
        return &self.0;
    }

    /// Number of keys in the chain.
    pub fn len(&self) -> usize {
        return self.0.len();
    }

    /// Whether this is the root chain.
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    /// Render as the expression a developer would write, e.g. `Meteor.settings.a.b`.
    pub fn qualified(&self, namespace: &str) -> String {
        if self.is_empty() {
            return format!("{namespace}.settings");
        }
        return format!("{namespace}.settings.{self}");
    }
}

impl fmt::Display for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0.join("."));
    }
}

/// One key occurrence in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToken {
    /// The key as written.
    pub key: String,
    /// Byte offsets of the key in the scanned text.
    pub span: Range<usize>,
}

/// `Root.settings.a.b`: a chain named explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectReference {
    /// One token per key after `settings`.
    pub keys: Vec<KeyToken>,
    /// Span of the `settings` token, the zero-length prefix of the chain.
    pub settings_span: Range<usize>,
    /// Span of the whole expression.
    pub span: Range<usize>,
}

/// `const { a, b } = Root.settings.x`: chains named implicitly by bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestructuredReference {
    /// Tokens of the shared prefix after `settings` (may be empty).
    pub base: Vec<KeyToken>,
    /// One token per destructured variable, located in the binding pattern.
    pub bindings: Vec<KeyToken>,
    /// Text of the right-hand side, e.g. `Meteor.settings.x`.
    pub prefix_text: String,
    /// Span of the `settings` token on the right-hand side.
    pub settings_span: Range<usize>,
    /// Span of the whole declaration.
    pub span: Range<usize>,
}

/// One settings-path expression found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// Destructuring from a settings path.
    Destructured(DestructuredReference),
    /// Explicit dotted access.
    Direct(DirectReference),
}

impl SourceReference {
    /// Span of the whole expression or declaration.
    pub fn span(&self) -> Range<usize> {
        return match self {
            SourceReference::Destructured(d) => d.span.clone(),
            SourceReference::Direct(d) => d.span.clone(),
        };
    }

    /// Span of the `settings` token.
    pub fn settings_span(&self) -> Range<usize> {
        return match self {
            SourceReference::Destructured(d) => d.settings_span.clone(),
            SourceReference::Direct(d) => d.settings_span.clone(),
        };
    }

    /// Flatten into one effective chain per reported location.
    pub fn targets(&self) -> Vec<ReferenceTarget> {
        return match self {
            SourceReference::Direct(d) => vec![ReferenceTarget {
                chain: chain_of(&d.keys),
                origin: Origin::Direct,
                span: d.span.clone(),
            }],
            SourceReference::Destructured(d) => {
                let base = chain_of(&d.base);
                d.bindings
                    .iter()
                    .map(|b| {
                        return ReferenceTarget {
                            chain: base.child(&b.key),
                            origin: Origin::Destructured { prefix: d.prefix_text.clone() },
                            span: b.span.clone(),
                        };
                    })
                    .collect()
            },
        };
    }
}

/// Collect the keys of a token list into a chain.
pub fn chain_of(tokens: &[KeyToken]) -> KeyChain {
    return KeyChain::new(tokens.iter().map(|t| return t.key.as_str()));
}

/// Where a target came from. Only affects message wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A destructured variable bound from `prefix`.
    Destructured {
        /// Right-hand side text, e.g. `Meteor.settings.x`.
        prefix: String,
    },
    /// A direct dotted expression.
    Direct,
}

/// A single effective chain at a single location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    /// The full chain this location names.
    pub chain: KeyChain,
    /// Direct or destructured.
    pub origin: Origin,
    /// Where diagnostics for this chain are reported.
    pub span: Range<usize>,
}

/// Closed set of node types, decided once at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedType {
    /// JSON array; never traversed further.
    Array,
    /// JSON `true` / `false`.
    Boolean,
    /// No node at the chain.
    Missing,
    /// JSON `null`.
    Null,
    /// JSON number.
    Number,
    /// JSON object.
    Object,
    /// JSON string.
    String,
}

impl ResolvedType {
    /// Classify a JSON node.
    pub fn of(value: &serde_json::Value) -> Self {
        return match *value {
            serde_json::Value::Array(_) => Self::Array,
            serde_json::Value::Bool(_) => Self::Boolean,
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Number(_) => Self::Number,
            serde_json::Value::Object(_) => Self::Object,
            serde_json::Value::String(_) => Self::String,
        };
    }

    /// Lowercase name used in hover text.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Missing => "missing",
            Self::Null => "null",
            Self::Number => "number",
            Self::Object => "object",
            Self::String => "string",
        };
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.name());
    }
}

/// Outcome of walking a chain against a settings tree.
/// `value` borrows from the tree snapshot it was resolved against.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'t> {
    /// Longest prefix of the chain that exists in the tree.
    pub deepest_reachable_chain: KeyChain,
    /// Whether the whole chain exists.
    pub found: bool,
    /// Type of the node, `Missing` when not found.
    pub resolved_type: ResolvedType,
    /// The node at the chain, when found.
    pub value: Option<&'t serde_json::Value>,
}

/// Derived visibility of one chain in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityVerdict {
    /// `chain[0] == "public"`.
    pub is_public: bool,
    /// Client-scoped document reading a non-public chain.
    pub violates_policy: bool,
}

/// Zero-based line and column inside a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocatedPosition {
    /// Column in characters.
    pub column: usize,
    /// Line index.
    pub line: usize,
}
