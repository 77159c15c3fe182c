//! Presets: named snapshots of all editable palette state
//!
//! A [`Preset`] holds the six source colors of a model and, for each of the
//! four palettes, one override slot per ramp index. Documents are parsed into
//! a complete `Preset` before anything reaches the [`PresetStore`], so a bad
//! file never leaves partial state behind.
//!
//! # Document format
//!
//! ```json
//! {
//!   "Id": "P1",
//!   "Name": "P1",
//!   "LightRegionColor": "#FFFFFF",
//!   "DarkRegionColor": "#000000",
//!   "LightBaseColor": "#FFFFFF",
//!   "DarkBaseColor": "#1F1F1F",
//!   "LightPrimaryColor": "#0078D4",
//!   "DarkPrimaryColor": "#0078D4",
//!   "LightBaseOverrides": { "2": "#112233" }
//! }
//! ```

use std::collections::BTreeMap;

use serde::de::value::MapAccessDeserializer;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::color::Color;
use crate::palette::PaletteSlot;

/// Preset parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    /// Document is not valid JSON or has the wrong shape
    #[error("Malformed preset document: {0}")]
    Json(String),

    /// Required field absent
    #[error("Missing required field {path}")]
    MissingField {
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

    /// Override key is not a non-negative integer
    #[error("Invalid override index {key:?} at {path}")]
    InvalidIndex {
        /// Key path of the override map
        path: String,
        /// Offending key
        key: String,
    },

    /// Override index past the end of the ramp
    #[error("Override index {index} at {path} is outside the ramp (length {len})")]
    IndexOutOfRange {
        /// Key path of the override
        path: String,
        /// Parsed index
        index: usize,
        /// Ramp length
        len: usize,
    },
}

impl From<serde_json::Error> for PresetError {
    fn from(err: serde_json::Error) -> Self {
        PresetError::Json(err.to_string())
    }
}

/// Result type for preset operations
pub type Result<T> = std::result::Result<T, PresetError>;

/// Source colors and ramp overrides of a model, or of a preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveState {
    /// Light region color
    pub light_region: Color,
    /// Dark region color
    pub dark_region: Color,
    /// Palette base colors indexed by [`PaletteSlot::index`]
    pub base_colors: [Color; 4],
    /// Per-index ramp overrides indexed by [`PaletteSlot::index`]
    pub overrides: [Vec<Option<Color>>; 4],
}

impl LiveState {
    /// Base color of a palette
    pub fn base_color(&self, slot: PaletteSlot) -> Color {
        self.base_colors[slot.index()]
    }

    /// Overrides of a palette, by ramp index
    pub fn overrides(&self, slot: PaletteSlot) -> &[Option<Color>] {
        &self.overrides[slot.index()]
    }

    /// Whether every override array has length `ramp_len`
    pub fn fits(&self, ramp_len: usize) -> bool {
        self.overrides.iter().all(|o| o.len() == ramp_len)
    }
}

/// A named snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    id: String,
    name: String,
    state: LiveState,
}

impl Preset {
    /// Create a preset from captured state
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: LiveState) -> Self {
        Self { id: id.into(), name: name.into(), state }
    }

    /// Stable identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Captured colors and overrides
    pub fn state(&self) -> &LiveState {
        &self.state
    }

    /// Replace id and name
    pub fn renamed(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.id = id.into();
        self.name = name.into();
        self
    }

    /// Parse a standalone preset file
    pub fn parse(bytes: &[u8], ramp_len: usize) -> Result<Self> {
        let doc: PresetDocument = serde_json::from_slice(bytes)?;
        Self::from_document(doc, ramp_len, "")
    }

    /// Validate a document into a preset
    ///
    /// `prefix` is prepended to key paths in errors, e.g. `Presets[2]`.
    /// Missing `Id` and `Name` fall back to each other.
    pub fn from_document(doc: PresetDocument, ramp_len: usize, prefix: &str) -> Result<Self> {
        let color = |value: &Option<String>, key: &str| -> Result<Color> {
            let path = key_path(prefix, key);
            let text = value.as_deref().ok_or_else(|| PresetError::MissingField { path: path.clone() })?;
            text.parse()
                .map_err(|_| PresetError::InvalidColor { path, value: text.to_string() })
        };

        let light_region = color(&doc.light_region_color, "LightRegionColor")?;
        let dark_region = color(&doc.dark_region_color, "DarkRegionColor")?;
        let mut base_colors = [Color::default(); 4];
        let mut overrides: [Vec<Option<Color>>; 4] = Default::default();

        for slot in PaletteSlot::ALL {
            base_colors[slot.index()] = color(doc.base_color(slot), &format!("{}Color", slot))?;

            let mut ramp = vec![None; ramp_len];
            if let Some(map) = doc.overrides(slot) {
                let path = key_path(prefix, &format!("{}Overrides", slot));
                for (key, value) in map {
                    let index: usize = key
                        .trim()
                        .parse()
                        .map_err(|_| PresetError::InvalidIndex { path: path.clone(), key: key.clone() })?;
                    let entry_path = format!("{}.{}", path, key);
                    if index >= ramp_len {
                        return Err(PresetError::IndexOutOfRange { path: entry_path, index, len: ramp_len });
                    }
                    ramp[index] = Some(value.parse().map_err(|_| PresetError::InvalidColor {
                        path: entry_path,
                        value: value.clone(),
                    })?);
                }
            }
            overrides[slot.index()] = ramp;
        }

        let id = doc.id.or_else(|| doc.name.clone()).unwrap_or_default();
        let name = doc.name.unwrap_or_else(|| id.clone());

        Ok(Self {
            id,
            name,
            state: LiveState { light_region, dark_region, base_colors, overrides },
        })
    }

    /// Document form of this preset
    pub fn to_document(&self) -> PresetDocument {
        let overrides = |slot: PaletteSlot| -> Option<BTreeMap<String, String>> {
            let map: BTreeMap<String, String> = self
                .state
                .overrides(slot)
                .iter()
                .enumerate()
                .filter_map(|(i, c)| c.map(|c| (i.to_string(), c.to_string())))
                .collect();
            (!map.is_empty()).then_some(map)
        };
        let base = |slot: PaletteSlot| Some(self.state.base_color(slot).to_string());

        PresetDocument {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            light_region_color: Some(self.state.light_region.to_string()),
            dark_region_color: Some(self.state.dark_region.to_string()),
            light_base_color: base(PaletteSlot::LightBase),
            dark_base_color: base(PaletteSlot::DarkBase),
            light_primary_color: base(PaletteSlot::LightPrimary),
            dark_primary_color: base(PaletteSlot::DarkPrimary),
            light_base_overrides: overrides(PaletteSlot::LightBase),
            dark_base_overrides: overrides(PaletteSlot::DarkBase),
            light_primary_overrides: overrides(PaletteSlot::LightPrimary),
            dark_primary_overrides: overrides(PaletteSlot::DarkPrimary),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.to_document())?)
    }
}

fn key_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Wire form of a preset
///
/// Only the keyed object form deserializes; the positional array form serde
/// would otherwise accept is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct PresetDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_region_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_region_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_base_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_base_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_base_overrides: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_base_overrides: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_primary_overrides: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_primary_overrides: Option<BTreeMap<String, String>>,
}

impl PresetDocument {
    fn base_color(&self, slot: PaletteSlot) -> &Option<String> {
        match slot {
            PaletteSlot::LightBase => &self.light_base_color,
            PaletteSlot::DarkBase => &self.dark_base_color,
            PaletteSlot::LightPrimary => &self.light_primary_color,
            PaletteSlot::DarkPrimary => &self.dark_primary_color,
        }
    }

    fn overrides(&self, slot: PaletteSlot) -> Option<&BTreeMap<String, String>> {
        match slot {
            PaletteSlot::LightBase => self.light_base_overrides.as_ref(),
            PaletteSlot::DarkBase => self.dark_base_overrides.as_ref(),
            PaletteSlot::LightPrimary => self.light_primary_overrides.as_ref(),
            PaletteSlot::DarkPrimary => self.dark_primary_overrides.as_ref(),
        }
    }
}

impl Serialize for PresetDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        PresetDocument::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for PresetDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = PresetDocument;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a preset object")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<PresetDocument, A::Error> {
                PresetDocument::deserialize(MapAccessDeserializer::new(map))
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

/// Whether the live state matches `preset` exactly
///
/// Compares all six source colors and every override slot. Presets captured
/// for a different ramp length are never active.
pub fn is_active(preset: &Preset, live: &LiveState) -> bool {
    preset.state == *live
}

/// Ordered collection of presets
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    presets: Vec<Preset>,
}

impl PresetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `preset`, first dropping any preset with the same id
    ///
    /// Presets without a display name never replace anything.
    pub fn add_or_replace(&mut self, preset: Preset) {
        if !preset.name.is_empty() {
            self.presets.retain(|p| p.id != preset.id);
        }
        self.presets.push(preset);
    }

    /// Remove and return the first preset with `id`
    pub fn remove(&mut self, id: &str) -> Option<Preset> {
        let pos = self.presets.iter().position(|p| p.id == id)?;
        Some(self.presets.remove(pos))
    }

    /// First preset with `id`
    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Presets in store order
    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    /// Number of presets
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// First preset in store order that matches `live`
    pub fn recompute_active(&self, live: &LiveState) -> Option<&Preset> {
        self.presets.iter().find(|p| is_active(p, live))
    }
}
