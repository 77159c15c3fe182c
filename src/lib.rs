//! Palette Forge
//!
//! Facade over the workspace crates: the palette engine, document storage
//! and localization.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use i18n;
pub use palette_core;
pub use storage;
