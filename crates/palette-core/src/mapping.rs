//! Design-token mapping tables
//!
//! A [`MappingTable`] binds each populated [`ColorTarget`] of one theme
//! variant to the live entry that supplies its color. Sources are parsed into
//! the tagged [`ColorSource`] once, so resolution is a plain match.

use std::fmt;
use std::str::FromStr;

use i18n::{keys, Localizer};

use crate::config::ConfigError;
use crate::entry::{EntryArena, EntryId};
use crate::palette::{ColorPalette, PaletteSlot};

/// Light or dark theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeVariant {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
}

impl ThemeVariant {
    /// Both variants, light first
    pub const ALL: [ThemeVariant; 2] = [ThemeVariant::Light, ThemeVariant::Dark];

    /// Name used in document keys and exports
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeVariant::Light => "Light",
            ThemeVariant::Dark => "Dark",
        }
    }

    /// Configuration key of this variant's mapping list
    pub fn mapping_key(self) -> &'static str {
        match self {
            ThemeVariant::Light => "LightPaletteMapping",
            ThemeVariant::Dark => "DarkPaletteMapping",
        }
    }
}

impl fmt::Display for ThemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! color_targets {
    ($($name:ident),+ $(,)?) => {
        /// Semantic design token of a theme
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ColorTarget {
            $(
                #[allow(missing_docs)]
                $name,
            )+
        }

        impl ColorTarget {
            /// Every token, in declaration order
            pub const ALL: &'static [ColorTarget] = &[$(ColorTarget::$name),+];

            /// Canonical name of the token
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ColorTarget::$name => stringify!($name),)+
                }
            }
        }

        impl FromStr for ColorTarget {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($name) => Ok(ColorTarget::$name),)+
                    _ => Err(UnknownName(s.to_string())),
                }
            }
        }
    };
}

color_targets!(
    Accent,
    ErrorText,
    AltHigh,
    AltLow,
    AltMedium,
    AltMediumHigh,
    AltMediumLow,
    BaseHigh,
    BaseLow,
    BaseMedium,
    BaseMediumHigh,
    BaseMediumLow,
    ChromeAltLow,
    ChromeBlackHigh,
    ChromeBlackLow,
    ChromeBlackMedium,
    ChromeBlackMediumLow,
    ChromeDisabledHigh,
    ChromeDisabledLow,
    ChromeGray,
    ChromeHigh,
    ChromeLow,
    ChromeMedium,
    ChromeMediumLow,
    ChromeWhite,
    ListLow,
    ListMedium,
);

impl fmt::Display for ColorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token or source name that is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown name: {0:?}")]
pub struct UnknownName(pub String);

/// Where a mapped color comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSource {
    /// Light region entry
    LightRegion,
    /// Dark region entry
    DarkRegion,
    /// Light base ramp step
    LightBase(usize),
    /// Dark base ramp step
    DarkBase(usize),
    /// Light primary ramp step
    LightPrimary(usize),
    /// Dark primary ramp step
    DarkPrimary(usize),
    /// Fixed white
    White,
    /// Fixed black
    Black,
}

impl ColorSource {
    /// Build a source from its document name and optional ramp index
    ///
    /// The index is ignored for sources that are not ramps and defaults to 0
    /// for ramp sources.
    pub fn from_parts(name: &str, index: Option<usize>) -> Result<Self, UnknownName> {
        let index = index.unwrap_or(0);
        let source = match name {
            "LightRegion" => ColorSource::LightRegion,
            "DarkRegion" => ColorSource::DarkRegion,
            "LightBase" => ColorSource::LightBase(index),
            "DarkBase" => ColorSource::DarkBase(index),
            "LightPrimary" => ColorSource::LightPrimary(index),
            "DarkPrimary" => ColorSource::DarkPrimary(index),
            "White" => ColorSource::White,
            "Black" => ColorSource::Black,
            _ => return Err(UnknownName(name.to_string())),
        };
        Ok(source)
    }

    /// Palette slot and ramp index, for ramp sources
    pub fn ramp_position(self) -> Option<(PaletteSlot, usize)> {
        match self {
            ColorSource::LightBase(i) => Some((PaletteSlot::LightBase, i)),
            ColorSource::DarkBase(i) => Some((PaletteSlot::DarkBase, i)),
            ColorSource::LightPrimary(i) => Some((PaletteSlot::LightPrimary, i)),
            ColorSource::DarkPrimary(i) => Some((PaletteSlot::DarkPrimary, i)),
            _ => None,
        }
    }
}

/// Entries a mapping can resolve against
#[derive(Debug, Clone, Copy)]
pub struct SourceSet<'a> {
    /// Light region entry
    pub light_region: EntryId,
    /// Dark region entry
    pub dark_region: EntryId,
    /// Fixed white entry
    pub white: EntryId,
    /// Fixed black entry
    pub black: EntryId,
    /// Palettes indexed by [`PaletteSlot::index`]
    pub palettes: &'a [ColorPalette; 4],
}

impl SourceSet<'_> {
    /// Live entry for `source`, if its index is in range
    pub fn entry(&self, source: ColorSource) -> Option<EntryId> {
        match source {
            ColorSource::LightRegion => Some(self.light_region),
            ColorSource::DarkRegion => Some(self.dark_region),
            ColorSource::White => Some(self.white),
            ColorSource::Black => Some(self.black),
            ramp => {
                let (slot, index) = ramp.ramp_position()?;
                self.palettes[slot.index()].entry(index)
            }
        }
    }
}

/// A resolved token binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMapping {
    target: ColorTarget,
    source: EntryId,
}

impl ColorMapping {
    /// Token being colored
    pub fn target(&self) -> ColorTarget {
        self.target
    }

    /// Entry supplying the color
    pub fn source(&self) -> EntryId {
        self.source
    }
}

/// Resolved mappings of one theme variant, sorted by token name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    variant: ThemeVariant,
    mappings: Vec<ColorMapping>,
}

impl MappingTable {
    /// Bind parsed `(target, source)` pairs to live entries
    ///
    /// Fails on a ramp index outside the palette or on a target listed twice.
    /// Key paths point into the variant's mapping list.
    pub fn resolve(
        variant: ThemeVariant,
        pairs: &[(ColorTarget, ColorSource)],
        sources: &SourceSet<'_>,
    ) -> Result<Self, ConfigError> {
        let key = variant.mapping_key();
        let mut mappings: Vec<ColorMapping> = Vec::with_capacity(pairs.len());

        for (i, (target, source)) in pairs.iter().enumerate() {
            if mappings.iter().any(|m| m.target == *target) {
                return Err(ConfigError::DuplicateTarget {
                    path: format!("{}[{}].Target", key, i),
                    target: *target,
                });
            }

            let entry = sources.entry(*source).ok_or_else(|| {
                let (slot, index) = source.ramp_position().unwrap_or((PaletteSlot::LightBase, 0));
                ConfigError::IndexOutOfRange {
                    path: format!("{}[{}].SourceIndex", key, i),
                    index,
                    len: sources.palettes[slot.index()].len(),
                }
            })?;

            mappings.push(ColorMapping { target: *target, source: entry });
        }

        mappings.sort_by(|a, b| a.target.as_str().cmp(b.target.as_str()));

        Ok(Self { variant, mappings })
    }

    /// Theme variant of the table
    pub fn variant(&self) -> ThemeVariant {
        self.variant
    }

    /// Mappings in export order
    pub fn iter(&self) -> impl Iterator<Item = &ColorMapping> {
        self.mappings.iter()
    }

    /// Number of populated tokens
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether no token is populated
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Entry bound to `target`
    pub fn source_of(&self, target: ColorTarget) -> Option<EntryId> {
        self.mappings.iter().find(|m| m.target == target).map(|m| m.source)
    }

    /// Tokens colored by `entry`, in table order
    pub fn targets_of(&self, entry: EntryId) -> impl Iterator<Item = ColorTarget> + '_ {
        self.mappings.iter().filter(move |m| m.source == entry).map(|m| m.target)
    }
}

/// Fill in descriptions for entries that have none
///
/// Each description lists the tokens an entry colors across `tables`, each
/// name once, in table order. Entries no token uses keep no description.
pub fn describe_entries(arena: &mut EntryArena, tables: &[&MappingTable], localizer: &dyn Localizer) {
    let undescribed: Vec<EntryId> = arena
        .iter()
        .filter(|(_, entry)| entry.description().is_none())
        .map(|(id, _)| id)
        .collect();

    for id in undescribed {
        let mut names: Vec<&'static str> = Vec::new();
        for table in tables {
            for target in table.targets_of(id) {
                if !names.contains(&target.as_str()) {
                    names.push(target.as_str());
                }
            }
        }

        if names.is_empty() {
            continue;
        }

        let targets = names.join(", ");
        let description =
            localizer.localize(keys::COLOR_FLYOUT_MAPPING_DESCRIPTION, &[("targets", &targets)]);
        arena.set_description(id, Some(description));
    }
}
