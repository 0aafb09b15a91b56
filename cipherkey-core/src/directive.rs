//! Configuration directives and their classification.
//!
//! A directive is a named engine setting (a pragma in SQLite terms)
//! together with its value. Names are case-insensitive; each name is
//! classified once at construction into a [`DirectiveKind`] that
//! drives both ordering and acknowledgment rules.

use std::fmt;

/// The closed set of directive names that set or change the key.
const KEY_NAMES: [&str; 4] = ["key", "hexkey", "rekey", "hexrekey"];

/// A directive value as supplied by the caller.
///
/// The `Display` impl defines the canonical stringification, which is
/// the form the engine is expected to echo back on acknowledgment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveValue {
    /// Textual value (key material, cipher names).
    Text(String),
    /// Integer value (iteration counts, page sizes, flags).
    Int(i64),
}

impl fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for DirectiveValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DirectiveValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DirectiveValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Classification of a directive, computed from its lowercased name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Selects the cipher algorithm (`cipher`); must run first.
    CipherSelect,
    /// The literal `legacy` directive, which resets prior
    /// configuration to the chosen defaults; runs second.
    LegacyReset,
    /// Any other directive with `legacy` in its name.
    LegacyTuning,
    /// One of `key`, `hexkey`, `rekey`, `hexrekey`; runs last.
    KeySetting,
    /// Remaining tuning directives (KDF iterations and the like).
    Other,
}

impl DirectiveKind {
    /// Classifies a directive name. Matching is case-insensitive.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "cipher" {
            Self::CipherSelect
        } else if name == "legacy" {
            Self::LegacyReset
        } else if KEY_NAMES.contains(&name.as_str()) {
            Self::KeySetting
        } else if name.contains("legacy") {
            Self::LegacyTuning
        } else {
            Self::Other
        }
    }

    /// Precedence rank; lower ranks execute first. Key-setting
    /// directives are deliberately far last.
    #[must_use]
    pub const fn rank(self) -> u32 {
        match self {
            Self::CipherSelect => 1,
            Self::LegacyReset => 2,
            Self::LegacyTuning | Self::Other => 3,
            Self::KeySetting => 100,
        }
    }

    /// Whether this directive sets or changes key material.
    #[must_use]
    pub const fn is_key(self) -> bool {
        matches!(self, Self::KeySetting)
    }
}

/// A single named configuration directive.
#[derive(Clone, PartialEq, Eq)]
pub struct Directive {
    name: String,
    value: DirectiveValue,
    kind: DirectiveKind,
}

impl Directive {
    /// Creates a directive, classifying it from its name.
    pub fn new(name: impl Into<String>, value: impl Into<DirectiveValue>) -> Self {
        let name = name.into();
        let kind = DirectiveKind::classify(&name);
        Self {
            name,
            value: value.into(),
            kind,
        }
    }

    /// The directive name as supplied by the caller.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directive value.
    #[must_use]
    pub fn value(&self) -> &DirectiveValue {
        &self.value
    }

    /// The computed classification.
    #[must_use]
    pub const fn kind(&self) -> DirectiveKind {
        self.kind
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Directive");
        d.field("name", &self.name);
        if self.kind.is_key() {
            d.field("value", &"[REDACTED]");
        } else {
            d.field("value", &self.value);
        }
        d.field("kind", &self.kind).finish()
    }
}

/// An insertion-ordered set of directives for one keying invocation.
///
/// Ordering matters only between categories; within a category the
/// plan preserves the order directives were inserted here.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    entries: Vec<Directive>,
}

impl Directives {
    /// Creates an empty directive set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directive.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DirectiveValue>) {
        self.entries.push(Directive::new(name, value));
    }

    /// Builder-style insertion.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DirectiveValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Number of directives in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.entries.iter()
    }

    pub(crate) fn into_entries(self) -> Vec<Directive> {
        self.entries
    }
}

impl<N, V> FromIterator<(N, V)> for Directives
where
    N: Into<String>,
    V: Into<DirectiveValue>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}
