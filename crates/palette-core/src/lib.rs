//! Palette, mapping and preset engine for Palette Forge
//!
//! This crate derives editable color ramps from a few base colors, resolves
//! design-token mappings for the light and dark themes, tracks accessible
//! contrast colors, and captures and restores presets.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod config;
pub mod debounce;
pub mod entry;
pub mod export;
pub mod mapping;
pub mod model;
pub mod palette;
pub mod preset;
pub mod shared;

pub use color::{contrast_ratio, relative_luminance, Color, ColorParseError, MIN_CONTRAST_RATIO};
pub use config::{ConfigDocument, ConfigError, PaletteConfig};
pub use entry::{ContrastCandidate, ContrastReport, EntryArena, EntryId, EntryKind, PaletteEntry};
pub use export::{ExportProvider, KeyValueExporter, ThemeResourceExporter};
pub use mapping::{ColorMapping, ColorSource, ColorTarget, MappingTable, ThemeVariant};
pub use model::{LoadOutcome, ModelError, ModelOptions, PaletteEvent, PaletteModel};
pub use palette::{ColorPalette, LightnessRamp, PaletteError, PaletteSlot, RampGenerator};
pub use preset::{LiveState, Preset, PresetDocument, PresetError, PresetStore};
pub use shared::SharedPaletteModel;
