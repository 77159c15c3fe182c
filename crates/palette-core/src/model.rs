//! Palette model
//!
//! [`PaletteModel`] owns every entry, palette, mapping table and preset of a
//! theme and is the only place they are mutated. Each public mutation ends in
//! one commit step that:
//!
//! 1. drains the arena's change records,
//! 2. re-evaluates the active preset,
//! 3. broadcasts entry and preset events,
//! 4. restarts the "palette updated" debounce timer.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = FileStore::new("theme.json");
//! let translator = Translator::english()?;
//! let mut model =
//!     PaletteModel::initialize(&store, &translator, Arc::new(LightnessRamp::default()), ModelOptions::new())
//!         .await?;
//!
//! let mut events = model.subscribe();
//! let accent = model.palette(PaletteSlot::LightPrimary).base();
//! model.set_entry_color(accent, "#C239B3".parse()?)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use i18n::{keys, Localizer};
use storage::{DocumentStore, StorageError};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::color::Color;
use crate::config::{ConfigDocument, ConfigError, EntrySpec, PaletteConfig, PaletteSpec};
use crate::debounce::Debouncer;
use crate::entry::{
    ContrastCandidate, ContrastReport, EntryArena, EntryChange, EntryId, EntryKind, PaletteEntry,
};
use crate::mapping::{describe_entries, MappingTable, SourceSet, ThemeVariant};
use crate::palette::{ramp_step, ColorPalette, PaletteError, PaletteSlot, RampGenerator};
use crate::preset::{LiveState, Preset, PresetError, PresetStore};

/// Default quiet period before [`PaletteEvent::PaletteUpdated`]
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Export key of the region color, listed after all tokens
pub const REGION_COLOR_KEY: &str = "RegionColor";

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// No entry with this id
    #[error("Unknown entry {0}")]
    UnknownEntry(EntryId),

    /// Entry cannot be edited
    #[error("Entry {0} is read-only")]
    ReadOnlyEntry(EntryId),

    /// No preset with this id
    #[error("Unknown preset {0:?}")]
    UnknownPreset(String),

    /// Ramp generator failed
    #[error(transparent)]
    Palette(#[from] PaletteError),

    /// Preset could not be serialized
    #[error(transparent)]
    Preset(#[from] PresetError),

    /// Document store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Notifications broadcast by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteEvent {
    /// An entry's active color changed
    ActiveColorChanged(EntryId),
    /// An entry's contrast candidates or best contrast color changed
    ContrastColorChanged(EntryId),
    /// The active preset changed; carries the new preset id
    ActivePresetChanged(Option<String>),
    /// Edits have settled; fired once per quiet period
    PaletteUpdated,
}

/// Result of loading a preset file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Preset stored and applied; carries its id
    Applied(String),
    /// Nothing changed; carries the reason
    Abandoned(String),
}

/// Model tuning
#[derive(Debug, Clone)]
pub struct ModelOptions {
    /// Quiet period before [`PaletteEvent::PaletteUpdated`]
    pub debounce: Duration,
    /// Broadcast buffer size; slow subscribers lag past this
    pub event_capacity: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, event_capacity: 64 }
    }
}

impl ModelOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debounce delay
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Set the broadcast buffer size (at least 1)
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Planned ramps for all four palettes
type RampPlan = [Vec<Color>; 4];

/// Owner of all palette state of one theme
pub struct PaletteModel {
    arena: EntryArena,
    light_region: EntryId,
    dark_region: EntryId,
    white: EntryId,
    black: EntryId,
    palettes: [ColorPalette; 4],
    light_mappings: MappingTable,
    dark_mappings: MappingTable,
    presets: PresetStore,
    active_preset: Option<String>,
    ramp_len: usize,
    generator: Arc<dyn RampGenerator>,
    events: broadcast::Sender<PaletteEvent>,
    debouncer: Debouncer,
}

impl std::fmt::Debug for PaletteModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaletteModel")
            .field("entries", &self.arena.len())
            .field("ramp_len", &self.ramp_len)
            .field("presets", &self.presets.len())
            .field("active_preset", &self.active_preset)
            .finish()
    }
}

impl PaletteModel {
    /// Read, parse and build a model from a configuration store
    ///
    /// Parsing runs on a blocking task; the model is built once the whole
    /// document has validated.
    pub async fn initialize(
        store: &dyn DocumentStore,
        localizer: &dyn Localizer,
        generator: Arc<dyn RampGenerator>,
        options: ModelOptions,
    ) -> std::result::Result<Self, ConfigError> {
        let bytes = store.read().await?;
        tracing::debug!("Read {} bytes of configuration from {}", bytes.len(), store.name());

        let config = tokio::task::spawn_blocking(move || PaletteConfig::from_slice(&bytes))
            .await
            .map_err(|e| ConfigError::Task(e.to_string()))??;

        Self::from_config(config, localizer, generator, options)
    }

    /// Validate a parsed document and build a model
    pub fn from_document(
        doc: ConfigDocument,
        localizer: &dyn Localizer,
        generator: Arc<dyn RampGenerator>,
        options: ModelOptions,
    ) -> std::result::Result<Self, ConfigError> {
        Self::from_config(doc.validate()?, localizer, generator, options)
    }

    /// Build a model from a validated configuration
    pub fn from_config(
        config: PaletteConfig,
        localizer: &dyn Localizer,
        generator: Arc<dyn RampGenerator>,
        options: ModelOptions,
    ) -> std::result::Result<Self, ConfigError> {
        let mut arena = EntryArena::new();

        let white = arena.insert(
            PaletteEntry::new(EntryKind::Fixed, Color::WHITE)
                .with_title(localizer.localize(keys::DARK_THEME_TEXT_CONTRAST_TITLE, &[])),
        );
        let black = arena.insert(
            PaletteEntry::new(EntryKind::Fixed, Color::BLACK)
                .with_title(localizer.localize(keys::LIGHT_THEME_TEXT_CONTRAST_TITLE, &[])),
        );
        let light_region = arena.insert(source_entry(config.light_region));
        let dark_region = arena.insert(source_entry(config.dark_region));

        let [light_base, dark_base, light_primary, dark_primary] = config.palettes;
        let mut build = |spec: PaletteSpec, slot: PaletteSlot| {
            let steps = spec
                .steps
                .into_iter()
                .map(|step| ramp_step(step.title, step.description))
                .collect();
            ColorPalette::build(&mut arena, source_entry(spec.base), steps, generator.as_ref())
                .map_err(|source| ConfigError::Ramp { path: slot.as_str().to_string(), source })
        };
        let palettes = [
            build(light_base, PaletteSlot::LightBase)?,
            build(dark_base, PaletteSlot::DarkBase)?,
            build(light_primary, PaletteSlot::LightPrimary)?,
            build(dark_primary, PaletteSlot::DarkPrimary)?,
        ];

        wire_contrast(&mut arena, light_region, dark_region, white, black, &palettes);

        let sources = SourceSet { light_region, dark_region, white, black, palettes: &palettes };
        let light_mappings = MappingTable::resolve(ThemeVariant::Light, &config.light_mappings, &sources)?;
        let dark_mappings = MappingTable::resolve(ThemeVariant::Dark, &config.dark_mappings, &sources)?;
        describe_entries(&mut arena, &[&light_mappings, &dark_mappings], localizer);

        let mut presets = PresetStore::new();
        for preset in config.presets {
            presets.add_or_replace(preset);
        }

        let (events, _) = broadcast::channel(options.event_capacity);
        let mut model = Self {
            arena,
            light_region,
            dark_region,
            white,
            black,
            palettes,
            light_mappings,
            dark_mappings,
            presets,
            active_preset: None,
            ramp_len: config.ramp_len,
            generator,
            events,
            debouncer: Debouncer::new(options.debounce),
        };

        if let Some(id) = config.initial_preset {
            let state = model.presets.get(&id).map(|p| p.state().clone());
            if let Some(state) = state {
                tracing::debug!("Applying initial preset {}", id);
                let plan = model
                    .plan_state(&state)
                    .map_err(|source| ConfigError::Ramp { path: "Presets".to_string(), source })?;
                model.assign_state(&state, plan);
            }
        }

        // Nobody can be subscribed yet
        model.arena.take_changes();
        model.active_preset = model
            .presets
            .recompute_active(&model.live_state())
            .map(|p| p.id().to_string());

        tracing::debug!(
            "Palette model ready: {} entries, ramp length {}, {} presets",
            model.arena.len(),
            model.ramp_len,
            model.presets.len()
        );
        Ok(model)
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    /// Subscribe to model events
    pub fn subscribe(&self) -> broadcast::Receiver<PaletteEvent> {
        self.events.subscribe()
    }

    /// All entries
    pub fn entries(&self) -> &EntryArena {
        &self.arena
    }

    /// Look up an entry
    pub fn entry(&self, id: EntryId) -> Option<&PaletteEntry> {
        self.arena.get(id)
    }

    /// Light region entry
    pub fn light_region(&self) -> EntryId {
        self.light_region
    }

    /// Dark region entry
    pub fn dark_region(&self) -> EntryId {
        self.dark_region
    }

    /// Region entry of a variant
    pub fn region(&self, variant: ThemeVariant) -> EntryId {
        match variant {
            ThemeVariant::Light => self.light_region,
            ThemeVariant::Dark => self.dark_region,
        }
    }

    /// Fixed white entry
    pub fn white(&self) -> EntryId {
        self.white
    }

    /// Fixed black entry
    pub fn black(&self) -> EntryId {
        self.black
    }

    /// One of the four palettes
    pub fn palette(&self, slot: PaletteSlot) -> &ColorPalette {
        &self.palettes[slot.index()]
    }

    /// Shared ramp length
    pub fn ramp_len(&self) -> usize {
        self.ramp_len
    }

    /// Mapping table of a variant
    pub fn mappings(&self, variant: ThemeVariant) -> &MappingTable {
        match variant {
            ThemeVariant::Light => &self.light_mappings,
            ThemeVariant::Dark => &self.dark_mappings,
        }
    }

    /// Stored presets
    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    /// Preset matching the live state, if any
    pub fn active_preset(&self) -> Option<&Preset> {
        self.active_preset.as_deref().and_then(|id| self.presets.get(id))
    }

    /// Snapshot of source colors and ramp overrides
    pub fn live_state(&self) -> LiveState {
        LiveState {
            light_region: self.arena[self.light_region].active_color(),
            dark_region: self.arena[self.dark_region].active_color(),
            base_colors: PaletteSlot::ALL.map(|slot| self.palettes[slot.index()].base_color(&self.arena)),
            overrides: PaletteSlot::ALL.map(|slot| self.palettes[slot.index()].overrides(&self.arena)),
        }
    }

    /// Listed contrast candidates of an entry with their ratios
    pub fn contrast_report(&self, id: EntryId) -> Vec<ContrastReport> {
        self.arena.contrast_report(id)
    }

    /// Ordered `(token, color)` pairs of a variant, region color last
    pub fn export_colors(&self, variant: ThemeVariant) -> Vec<(&'static str, Color)> {
        let mut colors: Vec<(&'static str, Color)> = self
            .mappings(variant)
            .iter()
            .map(|m| (m.target().as_str(), self.arena[m.source()].active_color()))
            .collect();
        colors.push((REGION_COLOR_KEY, self.arena[self.region(variant)].active_color()));
        colors
    }

    // ==========================================================================
    // Entry Edits
    // ==========================================================================

    /// Set an entry's color according to its kind
    ///
    /// Region and base entries take the color as their own; a base entry also
    /// regenerates its ramp. Ramp entries get an override. Fixed entries are
    /// rejected.
    pub fn set_entry_color(&mut self, id: EntryId, color: Color) -> Result<()> {
        let kind = self.arena.get(id).ok_or(ModelError::UnknownEntry(id))?.kind();

        match kind {
            EntryKind::Fixed => return Err(ModelError::ReadOnlyEntry(id)),
            EntryKind::Ramp => self.arena.set_custom_color(id, color),
            EntryKind::Source => match self.palettes.iter().find(|p| p.base() == id) {
                Some(palette) => palette.regenerate(&mut self.arena, self.generator.as_ref(), color)?,
                None => self.arena.set_generated_color(id, color),
            },
        }

        self.commit();
        Ok(())
    }

    /// Drop an entry's override
    pub fn revert_entry(&mut self, id: EntryId) -> Result<()> {
        if self.arena.get(id).is_none() {
            return Err(ModelError::UnknownEntry(id));
        }
        self.arena.clear_override(id);
        self.commit();
        Ok(())
    }

    /// Replace an entry's contrast candidates
    pub fn set_contrast_candidates(&mut self, id: EntryId, candidates: Vec<ContrastCandidate>) -> Result<()> {
        if self.arena.get(id).is_none() {
            return Err(ModelError::UnknownEntry(id));
        }
        if let Some(bad) = candidates.iter().find(|c| self.arena.get(c.entry).is_none()) {
            return Err(ModelError::UnknownEntry(bad.entry));
        }
        self.arena.set_contrast_candidates(id, candidates);
        self.commit();
        Ok(())
    }

    /// Stop a pending "palette updated" notification (host suspending)
    pub fn handle_suspend(&mut self) {
        if self.debouncer.is_pending() {
            tracing::debug!("Suspending with a pending palette update, cancelling");
        }
        self.debouncer.cancel();
    }

    // ==========================================================================
    // Presets
    // ==========================================================================

    /// Apply a stored preset
    pub fn apply_preset(&mut self, id: &str) -> Result<()> {
        let state = self
            .presets
            .get(id)
            .map(|p| p.state().clone())
            .ok_or_else(|| ModelError::UnknownPreset(id.to_string()))?;

        let plan = self.plan_state(&state)?;
        tracing::debug!("Applying preset {}", id);
        self.assign_state(&state, plan);
        self.commit();
        Ok(())
    }

    /// Insert or replace a preset by id
    pub fn add_or_replace_preset(&mut self, preset: Preset) {
        self.presets.add_or_replace(preset);
        self.update_active_preset();
    }

    /// Remove a preset by id
    pub fn remove_preset(&mut self, id: &str) -> Option<Preset> {
        let removed = self.presets.remove(id);
        if removed.is_some() {
            self.update_active_preset();
        }
        removed
    }

    /// Snapshot the live state as a preset (not stored)
    pub fn capture_preset(&self, id: impl Into<String>, name: impl Into<String>) -> Preset {
        Preset::new(id, name, self.live_state())
    }

    /// Read a preset file, store it and apply it
    ///
    /// Any failure leaves the model untouched and is reported as
    /// [`LoadOutcome::Abandoned`].
    pub async fn load_preset(&mut self, store: &dyn DocumentStore) -> LoadOutcome {
        let name = store.name();
        match store.read().await {
            Ok(bytes) => self.load_preset_bytes(&name, &bytes),
            Err(e) => abandon(&name, e.to_string()),
        }
    }

    /// Parse a preset document, store it under `name` and apply it
    pub fn load_preset_bytes(&mut self, name: &str, bytes: &[u8]) -> LoadOutcome {
        let preset = match Preset::parse(bytes, self.ramp_len) {
            Ok(preset) => preset.renamed(name, name),
            Err(e) => return abandon(name, e.to_string()),
        };

        let plan = match self.plan_state(preset.state()) {
            Ok(plan) => plan,
            Err(e) => return abandon(name, e.to_string()),
        };

        let state = preset.state().clone();
        self.presets.add_or_replace(preset);
        self.assign_state(&state, plan);
        self.commit();

        tracing::debug!("Loaded preset {}", name);
        LoadOutcome::Applied(name.to_string())
    }

    /// Capture the live state under the store's name and write it
    ///
    /// The captured preset is also stored, so it becomes the active preset.
    pub async fn save_preset(&mut self, store: &dyn DocumentStore) -> Result<Preset> {
        let name = store.name();
        let preset = self.capture_preset(name.clone(), name);
        write_preset(store, &preset).await?;
        self.add_or_replace_preset(preset.clone());
        Ok(preset)
    }

    /// Generate every ramp a state needs before touching anything
    fn plan_state(&self, state: &LiveState) -> std::result::Result<RampPlan, PaletteError> {
        let mut plan: RampPlan = Default::default();
        for slot in PaletteSlot::ALL {
            plan[slot.index()] =
                self.palettes[slot.index()].generate(self.generator.as_ref(), state.base_color(slot))?;
        }
        Ok(plan)
    }

    /// Source colors first, then overrides on the regenerated ramps
    fn assign_state(&mut self, state: &LiveState, plan: RampPlan) {
        self.arena.set_generated_color(self.light_region, state.light_region);
        self.arena.set_generated_color(self.dark_region, state.dark_region);

        for (slot, colors) in PaletteSlot::ALL.into_iter().zip(plan) {
            self.palettes[slot.index()].assign(&mut self.arena, state.base_color(slot), colors);
        }

        for slot in PaletteSlot::ALL {
            let overrides = state.overrides(slot);
            for (i, id) in self.palettes[slot.index()].ramp().iter().enumerate() {
                match overrides.get(i).copied().flatten() {
                    Some(color) => self.arena.set_custom_color(*id, color),
                    None => self.arena.clear_override(*id),
                }
            }
        }
    }

    // ==========================================================================
    // Change Propagation
    // ==========================================================================

    /// Broadcast queued entry changes, then re-derive the active preset
    ///
    /// Runs after every mutation, including ones that only touched the
    /// preset store.
    fn commit(&mut self) {
        let changes = self.arena.take_changes();
        let colors_changed = changes.iter().any(|c| matches!(c, EntryChange::ActiveColor(_)));

        for change in changes {
            let event = match change {
                EntryChange::ActiveColor(id) => PaletteEvent::ActiveColorChanged(id),
                EntryChange::ContrastColor(id) => PaletteEvent::ContrastColorChanged(id),
            };
            let _ = self.events.send(event);
        }

        self.update_active_preset();

        if colors_changed {
            let events = self.events.clone();
            self.debouncer.schedule(move || {
                let _ = events.send(PaletteEvent::PaletteUpdated);
            });
        }
    }

    fn update_active_preset(&mut self) {
        let current = self
            .presets
            .recompute_active(&self.live_state())
            .map(|p| p.id().to_string());
        if current != self.active_preset {
            self.active_preset = current.clone();
            let _ = self.events.send(PaletteEvent::ActivePresetChanged(current));
        }
    }
}

fn abandon(name: &str, reason: String) -> LoadOutcome {
    tracing::warn!("Abandoned loading preset {}: {}", name, reason);
    LoadOutcome::Abandoned(reason)
}

/// Serialize a preset and write it to `store`
pub(crate) async fn write_preset(store: &dyn DocumentStore, preset: &Preset) -> Result<()> {
    let bytes = preset.to_json()?;
    store.write(&bytes).await?;
    tracing::debug!("Saved preset {} ({} bytes)", preset.id(), bytes.len());
    Ok(())
}

fn source_entry(spec: EntrySpec) -> PaletteEntry {
    let entry = PaletteEntry::new(EntryKind::Source, spec.color).with_description(spec.description);
    match spec.title {
        Some(title) => entry.with_title(title),
        None => entry,
    }
}

/// Contrast candidates for every editable group
fn wire_contrast(
    arena: &mut EntryArena,
    light_region: EntryId,
    dark_region: EntryId,
    white: EntryId,
    black: EntryId,
    palettes: &[ColorPalette; 4],
) {
    let base = |slot: PaletteSlot| palettes[slot.index()].base();
    let on_light = |others: [EntryId; 2]| {
        vec![
            ContrastCandidate::new(white, false, false),
            ContrastCandidate::new(black, true, true),
            ContrastCandidate::new(others[0], true, false),
            ContrastCandidate::new(others[1], true, false),
        ]
    };
    let on_dark = |others: [EntryId; 2]| {
        vec![
            ContrastCandidate::new(white, true, true),
            ContrastCandidate::new(black, false, false),
            ContrastCandidate::new(others[0], true, false),
            ContrastCandidate::new(others[1], true, false),
        ]
    };

    arena.set_contrast_candidates(
        light_region,
        on_light([base(PaletteSlot::LightBase), base(PaletteSlot::LightPrimary)]),
    );
    arena.set_contrast_candidates(
        dark_region,
        on_dark([base(PaletteSlot::DarkBase), base(PaletteSlot::DarkPrimary)]),
    );

    // Primary palettes measure against white in both themes
    let groups = [
        (PaletteSlot::LightBase, on_light([light_region, base(PaletteSlot::LightPrimary)])),
        (PaletteSlot::DarkBase, on_dark([dark_region, base(PaletteSlot::DarkPrimary)])),
        (PaletteSlot::LightPrimary, on_dark([light_region, base(PaletteSlot::LightBase)])),
        (PaletteSlot::DarkPrimary, on_dark([dark_region, base(PaletteSlot::DarkBase)])),
    ];

    for (slot, candidates) in groups {
        let palette = &palettes[slot.index()];
        for id in std::iter::once(palette.base()).chain(palette.ramp().iter().copied()) {
            arena.set_contrast_candidates(id, candidates.clone());
        }
    }
}
