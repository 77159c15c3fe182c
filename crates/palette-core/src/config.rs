//! Configuration document
//!
//! The configuration is read once at start-up. [`ConfigDocument`] mirrors the
//! JSON shape with every field optional; [`ConfigDocument::validate`] turns
//! it into a [`PaletteConfig`] whose colors, names and indices have all been
//! checked. Every error names the key path it came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::StorageError;
use thiserror::Error;

use crate::color::Color;
use crate::mapping::{ColorSource, ColorTarget};
use crate::palette::{PaletteError, PaletteSlot};
use crate::preset::{Preset, PresetDocument, PresetError};

/// Configuration errors; all are fatal to initialization
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document could not be read
    #[error("Failed to read configuration: {0}")]
    Read(#[from] StorageError),

    /// Document is not valid JSON or has the wrong shape
    #[error("Malformed configuration document: {0}")]
    Json(String),

    /// Required field absent
    #[error("Missing required field {path}")]
    Missing {
        /// Key path of the field
        path: String,
    },

    /// Color string could not be parsed
    #[error("Invalid color {value:?} at {path}")]
    InvalidColor {
        /// Key path of the value
        path: String,
        /// Offending text
        value: String,
    },

    /// Target name is not a known token
    #[error("Unknown color target {name:?} at {path}")]
    UnknownTarget {
        /// Key path of the value
        path: String,
        /// Offending name
        name: String,
    },

    /// Source name is not a known source kind
    #[error("Unknown color source {name:?} at {path}")]
    UnknownSource {
        /// Key path of the value
        path: String,
        /// Offending name
        name: String,
    },

    /// Index is not a non-negative integer
    #[error("Invalid index {value} at {path}")]
    InvalidIndex {
        /// Key path of the value
        path: String,
        /// Offending value as written
        value: String,
    },

    /// Index past the end of the ramp
    #[error("Index {index} at {path} is outside the ramp (length {len})")]
    IndexOutOfRange {
        /// Key path of the value
        path: String,
        /// Parsed index
        index: usize,
        /// Ramp length
        len: usize,
    },

    /// Target mapped twice in one variant
    #[error("Duplicate target {target} at {path}")]
    DuplicateTarget {
        /// Key path of the second mapping
        path: String,
        /// Repeated token
        target: ColorTarget,
    },

    /// Palettes disagree on ramp length
    #[error("Palette at {path} has {actual} steps, expected {expected}")]
    RampLengthMismatch {
        /// Key path of the palette list
        path: String,
        /// Length of the first palette
        expected: usize,
        /// Length found here
        actual: usize,
    },

    /// Palette has no steps
    #[error("Palette at {path} has no steps")]
    EmptyPalette {
        /// Key path of the palette list
        path: String,
    },

    /// Named default preset does not exist
    #[error("Default preset {id:?} not found at {path}")]
    UnknownDefaultPreset {
        /// Key path of the reference
        path: String,
        /// Missing preset id
        id: String,
    },

    /// Embedded preset is invalid; the inner error carries the key path
    #[error("Invalid preset: {0}")]
    Preset(#[from] PresetError),

    /// Ramp generator failed while building a palette
    #[error("Failed to build palette {path}: {source}")]
    Ramp {
        /// Key path of the palette
        path: String,
        /// Generator failure
        #[source]
        source: PaletteError,
    },

    /// Background parse task panicked or was cancelled
    #[error("Configuration task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Single color entry: `{Color, Title?, Description?}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct EntryDocument {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ramp step metadata: `{Title?, Description?}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct StepDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Palette: `{BaseColor, Palette: [step]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct PaletteDocument {
    #[serde(default)]
    pub base_color: Option<EntryDocument>,
    #[serde(default)]
    pub palette: Option<Vec<StepDocument>>,
}

/// Mapping: `{Target, Source, SourceIndex?}`
///
/// `SourceIndex` may be written as a number or as a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct MappingDocument {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<Value>,
}

/// Whole configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct ConfigDocument {
    #[serde(default)]
    pub light_region: Option<EntryDocument>,
    #[serde(default)]
    pub dark_region: Option<EntryDocument>,
    #[serde(default)]
    pub light_base: Option<PaletteDocument>,
    #[serde(default)]
    pub dark_base: Option<PaletteDocument>,
    #[serde(default)]
    pub light_primary: Option<PaletteDocument>,
    #[serde(default)]
    pub dark_primary: Option<PaletteDocument>,
    #[serde(default)]
    pub light_palette_mapping: Option<Vec<MappingDocument>>,
    #[serde(default)]
    pub dark_palette_mapping: Option<Vec<MappingDocument>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<PresetDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preset: Option<String>,
}

/// A checked color entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySpec {
    /// Initial color
    pub color: Color,
    /// Title, if authored
    pub title: Option<String>,
    /// Description, if authored
    pub description: Option<String>,
}

/// A checked palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteSpec {
    /// Base color entry
    pub base: EntrySpec,
    /// Ramp step metadata; its length is the ramp length
    pub steps: Vec<StepDocument>,
}

/// Fully validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteConfig {
    /// Light region entry
    pub light_region: EntrySpec,
    /// Dark region entry
    pub dark_region: EntrySpec,
    /// Palettes indexed by [`PaletteSlot::index`]
    pub palettes: [PaletteSpec; 4],
    /// Shared ramp length of all palettes
    pub ramp_len: usize,
    /// Light mappings in document order
    pub light_mappings: Vec<(ColorTarget, ColorSource)>,
    /// Dark mappings in document order
    pub dark_mappings: Vec<(ColorTarget, ColorSource)>,
    /// Embedded presets in document order
    pub presets: Vec<Preset>,
    /// Preset applied at start-up: the named default, else the first preset
    pub initial_preset: Option<String>,
}

impl PaletteConfig {
    /// Parse and validate raw JSON
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        ConfigDocument::from_slice(bytes)?.validate()
    }
}

impl ConfigDocument {
    /// Parse raw JSON without validating
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check every field and resolve names and indices
    pub fn validate(self) -> Result<PaletteConfig> {
        let light_region = entry_spec(self.light_region.as_ref(), "LightRegion")?;
        let dark_region = entry_spec(self.dark_region.as_ref(), "DarkRegion")?;

        let palettes = [
            palette_spec(self.light_base, PaletteSlot::LightBase)?,
            palette_spec(self.dark_base, PaletteSlot::DarkBase)?,
            palette_spec(self.light_primary, PaletteSlot::LightPrimary)?,
            palette_spec(self.dark_primary, PaletteSlot::DarkPrimary)?,
        ];

        let ramp_len = palettes[0].steps.len();
        for slot in PaletteSlot::ALL {
            let actual = palettes[slot.index()].steps.len();
            if actual != ramp_len {
                return Err(ConfigError::RampLengthMismatch {
                    path: format!("{}.Palette", slot),
                    expected: ramp_len,
                    actual,
                });
            }
        }

        let light_mappings =
            mapping_pairs(self.light_palette_mapping.as_deref(), "LightPaletteMapping", ramp_len)?;
        let dark_mappings =
            mapping_pairs(self.dark_palette_mapping.as_deref(), "DarkPaletteMapping", ramp_len)?;

        let presets = self
            .presets
            .into_iter()
            .enumerate()
            .map(|(i, doc)| Preset::from_document(doc, ramp_len, &format!("Presets[{}]", i)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let initial_preset = match self.default_preset {
            Some(id) => {
                if !presets.iter().any(|p| p.id() == id) {
                    return Err(ConfigError::UnknownDefaultPreset { path: "DefaultPreset".to_string(), id });
                }
                Some(id)
            }
            None => presets.first().map(|p| p.id().to_string()),
        };

        Ok(PaletteConfig {
            light_region,
            dark_region,
            palettes,
            ramp_len,
            light_mappings,
            dark_mappings,
            presets,
            initial_preset,
        })
    }
}

fn entry_spec(doc: Option<&EntryDocument>, path: &str) -> Result<EntrySpec> {
    let doc = doc.ok_or_else(|| ConfigError::Missing { path: path.to_string() })?;
    let color_path = format!("{}.Color", path);
    let text = doc
        .color
        .as_deref()
        .ok_or_else(|| ConfigError::Missing { path: color_path.clone() })?;
    let color = text
        .parse()
        .map_err(|_| ConfigError::InvalidColor { path: color_path, value: text.to_string() })?;

    Ok(EntrySpec {
        color,
        title: doc.title.clone(),
        description: doc.description.clone(),
    })
}

fn palette_spec(doc: Option<PaletteDocument>, slot: PaletteSlot) -> Result<PaletteSpec> {
    let key = slot.as_str();
    let doc = doc.ok_or_else(|| ConfigError::Missing { path: key.to_string() })?;
    let base = entry_spec(doc.base_color.as_ref(), &format!("{}.BaseColor", key))?;
    let steps = doc
        .palette
        .ok_or_else(|| ConfigError::Missing { path: format!("{}.Palette", key) })?;
    if steps.is_empty() {
        return Err(ConfigError::EmptyPalette { path: format!("{}.Palette", key) });
    }
    Ok(PaletteSpec { base, steps })
}

fn mapping_pairs(
    docs: Option<&[MappingDocument]>,
    key: &str,
    ramp_len: usize,
) -> Result<Vec<(ColorTarget, ColorSource)>> {
    let docs = docs.ok_or_else(|| ConfigError::Missing { path: key.to_string() })?;
    docs.iter()
        .enumerate()
        .map(|(i, doc)| mapping_pair(doc, &format!("{}[{}]", key, i), ramp_len))
        .collect()
}

fn mapping_pair(doc: &MappingDocument, path: &str, ramp_len: usize) -> Result<(ColorTarget, ColorSource)> {
    let target_path = format!("{}.Target", path);
    let name = doc
        .target
        .as_deref()
        .ok_or_else(|| ConfigError::Missing { path: target_path.clone() })?;
    let target: ColorTarget = name
        .parse()
        .map_err(|_| ConfigError::UnknownTarget { path: target_path, name: name.to_string() })?;

    let index_path = format!("{}.SourceIndex", path);
    let index = doc
        .source_index
        .as_ref()
        .map(|value| parse_index(value, &index_path))
        .transpose()?;

    let source_path = format!("{}.Source", path);
    let name = doc
        .source
        .as_deref()
        .ok_or_else(|| ConfigError::Missing { path: source_path.clone() })?;
    let source = ColorSource::from_parts(name, index)
        .map_err(|_| ConfigError::UnknownSource { path: source_path, name: name.to_string() })?;

    if let Some((_, index)) = source.ramp_position() {
        if index >= ramp_len {
            return Err(ConfigError::IndexOutOfRange { path: index_path, index, len: ramp_len });
        }
    }

    Ok((target, source))
}

fn parse_index(value: &Value, path: &str) -> Result<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ConfigError::InvalidIndex { path: path.to_string(), value: value.to_string() })
}
