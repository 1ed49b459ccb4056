//! Registry data model: language descriptors and support tiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where a language's Zed support comes from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Built into Zed itself.
    Native,
    /// Provided by an installable Zed extension.
    Extension,
    /// No Zed support exists yet; added manually.
    #[default]
    Extra,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Native, Source::Extension, Source::Extra];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Native => "native",
            Source::Extension => "extension",
            Source::Extra => "extra",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in `languages.toml`.
///
/// Detection fields are `Option` because presence matters: when `suffixes`
/// or `filenames` is present (even empty) those take precedence over
/// `extensions` as detection tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDescriptor {
    /// Human-readable label, e.g. "Shell Script".
    pub name: String,
    /// Zed language id used to look up the upstream grammar; may differ
    /// from the registry id.
    pub zed_language: String,
    /// File-extension tokens without the leading dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// Suffix tokens for languages matched by path suffix rather than a
    /// plain extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,
    /// Whole-filename tokens, e.g. `Makefile`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub source: Source,
}

impl LanguageDescriptor {
    /// Tokens used to route a file to this language. Suffixes and
    /// filenames, when present, shadow extensions entirely.
    pub fn detection_tokens(&self) -> Vec<String> {
        if self.suffixes.is_some() || self.filenames.is_some() {
            let mut tokens = Vec::new();
            let mut seen = BTreeSet::new();
            for list in [&self.suffixes, &self.filenames].into_iter().flatten() {
                for token in list {
                    if seen.insert(token.clone()) {
                        tokens.push(token.clone());
                    }
                }
            }
            tokens
        } else {
            self.extensions.clone().unwrap_or_default()
        }
    }

    /// A language with no detection tokens can never be routed to, so the
    /// generator excludes it.
    pub fn has_detection_tokens(&self) -> bool {
        !self.detection_tokens().is_empty()
    }
}

/// Structural problems with a single entry, all of them.
pub fn entry_violations(id: &str, descriptor: &LanguageDescriptor) -> Vec<String> {
    let mut problems = Vec::new();

    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        problems.push(format!(
            "[{id}] id must be lowercase (ascii letters, digits, '_', '-')"
        ));
    }
    if descriptor.name.is_empty() {
        problems.push(format!("[{id}] missing required field: name"));
    }
    if descriptor.zed_language.is_empty() {
        problems.push(format!("[{id}] missing required field: zed_language"));
    }
    if descriptor.extensions.is_none()
        && descriptor.suffixes.is_none()
        && descriptor.filenames.is_none()
    {
        problems.push(format!(
            "[{id}] missing detection fields: one of extensions, suffixes, filenames is required"
        ));
    }

    problems
}

/// The registry: `id -> descriptor`, ordered by insertion (document order
/// when loaded from disk).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: Vec<(String, LanguageDescriptor)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LanguageDescriptor> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut LanguageDescriptor> {
        self.entries
            .iter_mut()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert or replace, keeping the existing position on replace.
    pub fn insert(&mut self, id: String, descriptor: LanguageDescriptor) {
        match self.entries.iter_mut().find(|(entry_id, _)| *entry_id == id) {
            Some((_, existing)) => *existing = descriptor,
            None => self.entries.push((id, descriptor)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LanguageDescriptor)> {
        self.entries
            .iter()
            .map(|(id, descriptor)| (id.as_str(), descriptor))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut LanguageDescriptor)> {
        self.entries
            .iter_mut()
            .map(|(id, descriptor)| (id.as_str(), descriptor))
    }

    /// A copy with entries sorted by id (the canonical save order).
    pub fn sorted(&self) -> Registry {
        let mut entries = self.entries.clone();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Registry { entries }
    }

    /// Zed language ids claimed by current entries.
    pub fn zed_languages(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|(_, descriptor)| descriptor.zed_language.clone())
            .collect()
    }

    /// Entry count per support tier, in `Source::ALL` order.
    pub fn count_by_source(&self) -> [(Source, usize); 3] {
        Source::ALL.map(|source| {
            let count = self
                .entries
                .iter()
                .filter(|(_, descriptor)| descriptor.source == source)
                .count();
            (source, count)
        })
    }
}

impl FromIterator<(String, LanguageDescriptor)> for Registry {
    fn from_iter<T: IntoIterator<Item = (String, LanguageDescriptor)>>(iter: T) -> Self {
        let mut registry = Registry::new();
        for (id, descriptor) in iter {
            registry.insert(id, descriptor);
        }
        registry
    }
}
