//! Palette entries and the entry arena
//!
//! A [`PaletteEntry`] is one editable color node. Entries never point at each
//! other directly: they live in an [`EntryArena`] and refer to one another by
//! [`EntryId`], which keeps contrast candidates and color mappings as plain
//! indices with no shared ownership.
//!
//! Every mutation goes through the arena so it can keep derived state
//! (active color, best contrast color) in sync and queue one typed
//! [`EntryChange`] record per observable change.

use std::fmt;
use std::ops::Index;

use crate::color::{contrast_ratio, Color, MIN_CONTRAST_RATIO};

/// Stable handle to an entry inside an [`EntryArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    /// Position in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// How an entry may be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Region or palette base color; edits replace its own color
    Source,
    /// Ramp step; edits set a user override on top of the generated color
    Ramp,
    /// Fixed reference color (white, black); read-only
    Fixed,
}

/// Reference to another entry this one is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContrastCandidate {
    /// Candidate entry
    pub entry: EntryId,
    /// Whether the candidate appears in contrast lists
    pub show_in_list: bool,
    /// Whether the candidate is eligible for best-contrast selection and failure flagging
    pub show_errors: bool,
}

impl ContrastCandidate {
    /// Create a candidate
    pub fn new(entry: EntryId, show_in_list: bool, show_errors: bool) -> Self {
        Self { entry, show_in_list, show_errors }
    }
}

/// One row of a contrast list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastReport {
    /// Candidate being measured
    pub candidate: ContrastCandidate,
    /// Candidate's active color
    pub color: Color,
    /// Contrast ratio against the owning entry
    pub ratio: f64,
    /// Below [`MIN_CONTRAST_RATIO`] on a candidate that reports errors
    pub failing: bool,
}

/// Change record queued by the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    /// The entry's active color changed
    ActiveColor(EntryId),
    /// The entry's candidate list or best contrast color changed
    ContrastColor(EntryId),
}

/// A single editable color node
#[derive(Debug, Clone)]
pub struct PaletteEntry {
    kind: EntryKind,
    title: Option<String>,
    description: Option<String>,
    generated_color: Color,
    custom_color: Color,
    use_custom_color: bool,
    active_color: Color,
    contrast_candidates: Vec<ContrastCandidate>,
    best_contrast: Option<ContrastCandidate>,
}

impl PaletteEntry {
    /// Create an entry showing `color`
    pub fn new(kind: EntryKind, color: Color) -> Self {
        Self {
            kind,
            title: None,
            description: None,
            generated_color: color,
            custom_color: color,
            use_custom_color: false,
            active_color: color,
            contrast_candidates: Vec::new(),
            best_contrast: None,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set an authored description
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Editing kind
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Title, if any
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Description, authored or generated
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Color actually shown and exported
    pub fn active_color(&self) -> Color {
        self.active_color
    }

    /// Color assigned by the ramp (or the entry's own color for sources)
    pub fn generated_color(&self) -> Color {
        self.generated_color
    }

    /// Last custom color set by the user
    pub fn custom_color(&self) -> Color {
        self.custom_color
    }

    /// Whether the custom color overrides the generated one
    pub fn use_custom_color(&self) -> bool {
        self.use_custom_color
    }

    /// Override color if one is in effect
    pub fn override_color(&self) -> Option<Color> {
        self.use_custom_color.then_some(self.custom_color)
    }

    /// Entries this one is measured against
    pub fn contrast_candidates(&self) -> &[ContrastCandidate] {
        &self.contrast_candidates
    }

    /// Highest-contrast error-reporting candidate
    pub fn best_contrast(&self) -> Option<ContrastCandidate> {
        self.best_contrast
    }

    /// Set the override; returns whether the active color changed
    pub fn set_custom_color(&mut self, color: Color) -> bool {
        self.custom_color = color;
        self.use_custom_color = true;
        self.refresh_active()
    }

    /// Drop the override; returns whether the active color changed
    pub fn clear_override(&mut self) -> bool {
        self.use_custom_color = false;
        self.refresh_active()
    }

    /// Replace the generated color; returns whether the active color changed
    pub fn set_generated_color(&mut self, color: Color) -> bool {
        self.generated_color = color;
        self.refresh_active()
    }

    fn refresh_active(&mut self) -> bool {
        let next = if self.use_custom_color { self.custom_color } else { self.generated_color };
        let changed = next != self.active_color;
        self.active_color = next;
        changed
    }
}

/// Pick the best contrast candidate for `color`
///
/// Only candidates with `show_errors` are eligible. Ties keep the earliest
/// candidate.
pub fn select_best_contrast(
    color: Color,
    candidates: &[ContrastCandidate],
    color_of: impl Fn(EntryId) -> Color,
) -> Option<ContrastCandidate> {
    let mut best: Option<(ContrastCandidate, f64)> = None;
    for candidate in candidates.iter().filter(|c| c.show_errors) {
        let ratio = contrast_ratio(color, color_of(candidate.entry));
        match best {
            Some((_, best_ratio)) if ratio <= best_ratio => {}
            _ => best = Some((*candidate, ratio)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Owner of all palette entries of a model
#[derive(Debug, Default)]
pub struct EntryArena {
    entries: Vec<PaletteEntry>,
    changes: Vec<EntryChange>,
}

impl EntryArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry and return its handle
    pub fn insert(&mut self, entry: PaletteEntry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    /// Look up an entry
    pub fn get(&self, id: EntryId) -> Option<&PaletteEntry> {
        self.entries.get(id.0)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the arena holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries with their handles
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &PaletteEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (EntryId(i), e))
    }

    /// Set an override on an entry
    pub fn set_custom_color(&mut self, id: EntryId, color: Color) {
        if self.entries[id.0].set_custom_color(color) {
            self.after_active_change(id);
        }
    }

    /// Clear an entry's override
    pub fn clear_override(&mut self, id: EntryId) {
        if self.entries[id.0].clear_override() {
            self.after_active_change(id);
        }
    }

    /// Replace an entry's generated color
    pub fn set_generated_color(&mut self, id: EntryId, color: Color) {
        if self.entries[id.0].set_generated_color(color) {
            self.after_active_change(id);
        }
    }

    /// Set or replace an entry's description
    pub fn set_description(&mut self, id: EntryId, description: Option<String>) {
        self.entries[id.0].description = description;
    }

    /// Replace an entry's contrast candidates and recompute its best color
    pub fn set_contrast_candidates(&mut self, id: EntryId, candidates: Vec<ContrastCandidate>) {
        self.entries[id.0].contrast_candidates = candidates;
        self.refresh_best_contrast(id);
        self.push_change(EntryChange::ContrastColor(id));
    }

    /// Listed candidates of an entry with their ratios
    pub fn contrast_report(&self, id: EntryId) -> Vec<ContrastReport> {
        let Some(entry) = self.get(id) else {
            return Vec::new();
        };

        entry
            .contrast_candidates
            .iter()
            .filter(|c| c.show_in_list)
            .map(|candidate| {
                let color = self.entries[candidate.entry.0].active_color;
                let ratio = contrast_ratio(entry.active_color, color);
                ContrastReport {
                    candidate: *candidate,
                    color,
                    ratio,
                    failing: candidate.show_errors && ratio < MIN_CONTRAST_RATIO,
                }
            })
            .collect()
    }

    /// Drain queued change records in the order they happened
    pub fn take_changes(&mut self) -> Vec<EntryChange> {
        std::mem::take(&mut self.changes)
    }

    fn after_active_change(&mut self, id: EntryId) {
        self.push_change(EntryChange::ActiveColor(id));
        self.refresh_best_contrast(id);

        // Entries measuring against this one see a new candidate color
        let dependents: Vec<EntryId> = self
            .iter()
            .filter(|(other, e)| {
                *other != id && e.contrast_candidates.iter().any(|c| c.entry == id)
            })
            .map(|(other, _)| other)
            .collect();
        for dependent in dependents {
            self.refresh_best_contrast(dependent);
        }
    }

    fn refresh_best_contrast(&mut self, id: EntryId) {
        let entry = &self.entries[id.0];
        let best = select_best_contrast(entry.active_color, &entry.contrast_candidates, |c| {
            self.entries[c.0].active_color
        });

        if best != self.entries[id.0].best_contrast {
            self.entries[id.0].best_contrast = best;
            self.push_change(EntryChange::ContrastColor(id));
        }
    }

    fn push_change(&mut self, change: EntryChange) {
        // Collapse repeats within one drain window
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }
}

impl Index<EntryId> for EntryArena {
    type Output = PaletteEntry;

    fn index(&self, id: EntryId) -> &PaletteEntry {
        &self.entries[id.0]
    }
}
