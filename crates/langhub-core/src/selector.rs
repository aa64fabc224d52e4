//! Document selectors and applicability scoring.
//!
//! Scoring is pure and total: malformed identities never fail, they simply
//! do not match.

use glob::Pattern;
use tower_lsp_server::ls_types::Uri;

use crate::error::{LanghubError, Result};

const EXACT_MATCH: u32 = 10;
const WILDCARD_MATCH: u32 = 5;

/// What a selector is matched against: a document URI plus its language id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentIdentity {
    pub uri: Uri,
    pub language_id: String,
}

impl DocumentIdentity {
    pub fn new(uri: Uri, language_id: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
        }
    }

    /// URI scheme, if the URI carries one.
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.uri.as_str().split_once(':')?;
        (!scheme.is_empty()).then_some(scheme)
    }

    pub fn path(&self) -> &str {
        self.uri.path().as_str()
    }
}

/// A single filter: every field that is present must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    language: Option<String>,
    scheme: Option<String>,
    pattern: Option<Pattern>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Restricts the filter to paths matching a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`LanghubError::InvalidPattern`] if the glob does not compile.
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|source| LanghubError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.pattern = Some(compiled);
        Ok(self)
    }

    fn score(&self, identity: &DocumentIdentity) -> u32 {
        let mut score = 0;

        if let Some(language) = &self.language {
            match score_field(language, Some(identity.language_id.as_str())) {
                0 => return 0,
                field => score = score.max(field),
            }
        }

        if let Some(scheme) = &self.scheme {
            match score_field(scheme, identity.scheme()) {
                0 => return 0,
                field => score = score.max(field),
            }
        }

        if let Some(pattern) = &self.pattern {
            let path = identity.path();
            if pattern.as_str() == path {
                score = score.max(EXACT_MATCH);
            } else if !path.is_empty() && pattern.matches(path) {
                score = score.max(WILDCARD_MATCH);
            } else {
                return 0;
            }
        }

        if self.language.is_none() && self.scheme.is_none() && self.pattern.is_none() {
            return WILDCARD_MATCH;
        }

        score
    }
}

fn score_field(expected: &str, actual: Option<&str>) -> u32 {
    match actual {
        Some(actual) if !actual.is_empty() && expected == actual => EXACT_MATCH,
        _ if expected == "*" => WILDCARD_MATCH,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorEntry {
    /// Bare language id, `*` for any language.
    Language(String),
    Filter(DocumentFilter),
}

impl SelectorEntry {
    fn score(&self, identity: &DocumentIdentity) -> u32 {
        match self {
            Self::Language(language) => score_field(language, Some(identity.language_id.as_str())),
            Self::Filter(filter) => filter.score(identity),
        }
    }
}

/// Ordered set of filters describing which documents a provider serves.
///
/// # Examples
///
/// ```
/// use langhub_core::selector::{DocumentIdentity, DocumentSelector};
/// use std::str::FromStr;
/// use tower_lsp_server::ls_types::Uri;
///
/// let selector = DocumentSelector::language("rust");
/// let doc = DocumentIdentity::new(Uri::from_str("file:///src/main.rs").unwrap(), "rust");
///
/// assert_eq!(selector.score(&doc), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSelector {
    entries: Vec<SelectorEntry>,
}

impl DocumentSelector {
    pub fn new(entries: Vec<SelectorEntry>) -> Self {
        Self { entries }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Self::new(vec![SelectorEntry::Language(language.into())])
    }

    pub fn languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            languages
                .into_iter()
                .map(|language| SelectorEntry::Language(language.into()))
                .collect(),
        )
    }

    /// Matches every document.
    pub fn all() -> Self {
        Self::language("*")
    }

    pub fn filter(filter: DocumentFilter) -> Self {
        Self::new(vec![SelectorEntry::Filter(filter)])
    }

    #[must_use]
    pub fn with(mut self, entry: SelectorEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[SelectorEntry] {
        &self.entries
    }

    /// Best score of any entry, `None` when nothing matches.
    pub fn score(&self, identity: &DocumentIdentity) -> Option<u32> {
        self.entries
            .iter()
            .map(|entry| entry.score(identity))
            .max()
            .filter(|score| *score > 0)
    }

    pub fn matches(&self, identity: &DocumentIdentity) -> bool {
        self.score(identity).is_some()
    }
}
