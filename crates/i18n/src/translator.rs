//! Message lookup and formatting
//!
//! [`Translator`] wraps a Fluent bundle built from the translations bundled
//! with this crate. Callers that only need strings should depend on the
//! [`Localizer`] trait so tests and hosts can substitute their own source.

use fluent::{FluentArgs, FluentBundle, FluentResource};
use thiserror::Error;

use crate::lang::{negotiate, LanguageTag};

/// Localization error types
#[derive(Debug, Error)]
pub enum I18nError {
    /// Language tag could not be parsed
    #[error("Invalid language tag: {0}")]
    InvalidLanguage(String),

    /// No bundled translations for the language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Fluent source failed to parse or register
    #[error("Invalid translation resource: {0}")]
    InvalidResource(String),
}

/// Result type for localization operations
pub type Result<T> = std::result::Result<T, I18nError>;

/// Message keys used by the palette engine
pub mod keys {
    /// Title of the black contrast entry
    pub const LIGHT_THEME_TEXT_CONTRAST_TITLE: &str = "LightThemeTextContrastTitle";

    /// Title of the white contrast entry
    pub const DARK_THEME_TEXT_CONTRAST_TITLE: &str = "DarkThemeTextContrastTitle";

    /// Auto-generated entry description; takes a `targets` argument
    pub const COLOR_FLYOUT_MAPPING_DESCRIPTION: &str = "ColorFlyoutMappingDescription";
}

/// Source of human-readable strings
pub trait Localizer {
    /// Look up `key` and format it with named arguments
    ///
    /// Unknown keys resolve to the key itself.
    fn localize(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// Fluent-backed localizer
pub struct Translator {
    language: LanguageTag,
    bundle: FluentBundle<FluentResource>,
}

impl Translator {
    /// Create a translator for one of the bundled languages
    pub fn new(language: LanguageTag) -> Result<Self> {
        let source = bundled_source(&language)
            .ok_or_else(|| I18nError::UnsupportedLanguage(language.to_string()))?;
        Self::from_source(language, source)
    }

    /// Create a translator for the best match among requested languages
    pub fn for_locales(requested: &[&str]) -> Result<Self> {
        Self::new(negotiate(requested))
    }

    /// Create a translator for the default language
    pub fn english() -> Result<Self> {
        Self::new(LanguageTag::default())
    }

    /// Create a translator from raw Fluent source
    pub fn from_source(language: LanguageTag, source: &str) -> Result<Self> {
        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| I18nError::InvalidResource(format!("{:?}", errors)))?;

        let mut bundle = FluentBundle::new(vec![language.as_langid().clone()]);
        // Keep output free of Unicode isolation marks; strings end up in exports
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| I18nError::InvalidResource(format!("{:?}", errors)))?;

        Ok(Self { language, bundle })
    }

    /// Language of this translator
    pub fn language(&self) -> &LanguageTag {
        &self.language
    }

    /// Whether a message exists for `key`
    pub fn has_message(&self, key: &str) -> bool {
        self.bundle.has_message(key)
    }
}

impl Localizer for Translator {
    fn localize(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(pattern) = self.bundle.get_message(key).and_then(|m| m.value()) else {
            tracing::warn!("Missing translation for {} ({})", key, self.language);
            return key.to_string();
        };

        let fluent_args = if args.is_empty() {
            None
        } else {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, *value);
            }
            Some(fluent_args)
        };

        let mut errors = Vec::new();
        let value = self.bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            tracing::warn!("Formatting {} produced errors: {:?}", key, errors);
        }

        value.into_owned()
    }
}

fn bundled_source(language: &LanguageTag) -> Option<&'static str> {
    match language.language() {
        "en" => Some(include_str!("../locales/en-US/palette.ftl")),
        "de" => Some(include_str!("../locales/de/palette.ftl")),
        _ => None,
    }
}
