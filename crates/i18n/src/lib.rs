//! Internationalization for Palette Forge
//!
//! This crate provides the localization collaborator used by the palette
//! engine: translation loading, language negotiation, and message formatting.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lang;
pub mod translator;

pub use lang::{negotiate, LanguageTag, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};
pub use translator::{keys, I18nError, Localizer, Result, Translator};
