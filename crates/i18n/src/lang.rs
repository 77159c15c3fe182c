//! Language tags and negotiation

use fluent_langneg::{negotiate_languages, NegotiationStrategy};
use std::fmt;
use std::str::FromStr;
use unic_langid::LanguageIdentifier;

use crate::translator::I18nError;

/// Language used when nothing else matches
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Languages with bundled translations
pub const SUPPORTED_LANGUAGES: &[&str] = &["en-US", "de"];

/// A validated BCP 47 language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageTag(LanguageIdentifier);

impl LanguageTag {
    /// The default language tag
    pub fn default_language() -> Self {
        Self(DEFAULT_LANGUAGE.parse().unwrap_or_default())
    }

    /// Underlying identifier
    pub fn as_langid(&self) -> &LanguageIdentifier {
        &self.0
    }

    /// Primary language subtag (e.g. "en")
    pub fn language(&self) -> &str {
        self.0.language.as_str()
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self::default_language()
    }
}

impl FromStr for LanguageTag {
    type Err = I18nError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<LanguageIdentifier>()
            .map(Self)
            .map_err(|_| I18nError::InvalidLanguage(s.to_string()))
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pick the best supported language for a list of requested tags
///
/// Unparseable requests are skipped. Falls back to [`DEFAULT_LANGUAGE`].
pub fn negotiate(requested: &[&str]) -> LanguageTag {
    let requested: Vec<LanguageIdentifier> =
        requested.iter().filter_map(|s| s.parse().ok()).collect();
    let available: Vec<LanguageIdentifier> =
        SUPPORTED_LANGUAGES.iter().filter_map(|s| s.parse().ok()).collect();
    let default = LanguageTag::default_language().0;

    let negotiated = negotiate_languages(
        &requested,
        &available,
        Some(&default),
        NegotiationStrategy::Lookup,
    );

    negotiated
        .first()
        .map(|id| LanguageTag((*id).clone()))
        .unwrap_or_default()
}
