//! Color palettes: a base color plus a generated ramp
//!
//! The ramp algorithm is a collaborator behind [`RampGenerator`]. The only
//! contract is determinism: the same base color and step count must always
//! produce the same sequence of exactly that many colors.

use thiserror::Error;

use crate::color::Color;
use crate::entry::{EntryArena, EntryId, EntryKind, PaletteEntry};

/// Palette errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    /// Generator broke its length contract
    #[error("Ramp generator returned {actual} colors, expected {expected}")]
    RampLength {
        /// Ramp length of the palette
        expected: usize,
        /// Length the generator produced
        actual: usize,
    },

    /// A palette needs at least one ramp step
    #[error("Palette has no ramp steps")]
    EmptyRamp,
}

/// Result type for palette operations
pub type Result<T> = std::result::Result<T, PaletteError>;

/// The four editable palettes of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaletteSlot {
    /// Light theme base (neutral) palette
    LightBase,
    /// Dark theme base (neutral) palette
    DarkBase,
    /// Light theme primary (accent) palette
    LightPrimary,
    /// Dark theme primary (accent) palette
    DarkPrimary,
}

impl PaletteSlot {
    /// All slots in storage order
    pub const ALL: [PaletteSlot; 4] = [
        PaletteSlot::LightBase,
        PaletteSlot::DarkBase,
        PaletteSlot::LightPrimary,
        PaletteSlot::DarkPrimary,
    ];

    /// Position in [`PaletteSlot::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Document key of the slot
    pub fn as_str(self) -> &'static str {
        match self {
            PaletteSlot::LightBase => "LightBase",
            PaletteSlot::DarkBase => "DarkBase",
            PaletteSlot::LightPrimary => "LightPrimary",
            PaletteSlot::DarkPrimary => "DarkPrimary",
        }
    }
}

impl std::fmt::Display for PaletteSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base-color-to-ramp generator
pub trait RampGenerator: Send + Sync {
    /// Produce exactly `steps` colors for `base`
    fn generate(&self, base: Color, steps: usize) -> Vec<Color>;
}

impl<F> RampGenerator for F
where
    F: Fn(Color, usize) -> Vec<Color> + Send + Sync,
{
    fn generate(&self, base: Color, steps: usize) -> Vec<Color> {
        self(base, steps)
    }
}

/// Default generator: tints toward white, then shades toward black
///
/// Step 0 is the lightest, the last step the darkest; the midpoint of an odd
/// ramp is the base color itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightnessRamp {
    /// Blend amount at either end of the ramp, in [0, 1]
    pub strength: f64,
}

impl Default for LightnessRamp {
    fn default() -> Self {
        Self { strength: 0.85 }
    }
}

impl LightnessRamp {
    /// Create a generator with a custom end-point strength
    pub fn new(strength: f64) -> Self {
        Self { strength: strength.clamp(0.0, 1.0) }
    }
}

impl RampGenerator for LightnessRamp {
    fn generate(&self, base: Color, steps: usize) -> Vec<Color> {
        if steps <= 1 {
            return vec![base; steps];
        }

        (0..steps)
            .map(|i| {
                let position = (i as f64 / (steps - 1) as f64) * 2.0 - 1.0;
                if position < 0.0 {
                    base.blend(Color::WHITE, -position * self.strength)
                } else {
                    base.blend(Color::BLACK, position * self.strength)
                }
            })
            .collect()
    }
}

/// Base entry plus a fixed-length ramp of entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    base: EntryId,
    ramp: Vec<EntryId>,
}

impl ColorPalette {
    /// Insert a palette into `arena`
    ///
    /// `steps` supply titles and descriptions; their colors are replaced by the
    /// generator's output for `base`.
    pub fn build(
        arena: &mut EntryArena,
        base: PaletteEntry,
        steps: Vec<PaletteEntry>,
        generator: &dyn RampGenerator,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(PaletteError::EmptyRamp);
        }

        let colors = generate_checked(generator, base.active_color(), steps.len())?;
        let base = arena.insert(base);
        let ramp = steps
            .into_iter()
            .zip(colors)
            .map(|(mut step, color)| {
                step.set_generated_color(color);
                arena.insert(step)
            })
            .collect();

        Ok(Self { base, ramp })
    }

    /// Base entry (rank 0)
    pub fn base(&self) -> EntryId {
        self.base
    }

    /// Ramp entries in order
    pub fn ramp(&self) -> &[EntryId] {
        &self.ramp
    }

    /// Ramp length
    pub fn len(&self) -> usize {
        self.ramp.len()
    }

    /// Whether the ramp is empty (never true for a built palette)
    pub fn is_empty(&self) -> bool {
        self.ramp.is_empty()
    }

    /// Ramp entry at `index`
    pub fn entry(&self, index: usize) -> Option<EntryId> {
        self.ramp.get(index).copied()
    }

    /// Whether `id` is the base or one of the ramp entries
    pub fn contains(&self, id: EntryId) -> bool {
        self.base == id || self.ramp.contains(&id)
    }

    /// Active color of the base entry
    pub fn base_color(&self, arena: &EntryArena) -> Color {
        arena[self.base].active_color()
    }

    /// Override state of every ramp step, by index
    pub fn overrides(&self, arena: &EntryArena) -> Vec<Option<Color>> {
        self.ramp.iter().map(|id| arena[*id].override_color()).collect()
    }

    /// Set a new base color and regenerate the ramp
    ///
    /// Overridden steps keep their custom color; the rest show the new ramp
    /// immediately. Nothing changes if the generator output is the wrong length.
    pub fn regenerate(
        &self,
        arena: &mut EntryArena,
        generator: &dyn RampGenerator,
        new_base: Color,
    ) -> Result<()> {
        let colors = self.generate(generator, new_base)?;
        self.assign(arena, new_base, colors);
        Ok(())
    }

    /// Ramp colors for `base`, checked against the ramp length
    pub fn generate(&self, generator: &dyn RampGenerator, base: Color) -> Result<Vec<Color>> {
        generate_checked(generator, base, self.ramp.len())
    }

    /// Write a base color and a ramp produced by [`ColorPalette::generate`]
    pub fn assign(&self, arena: &mut EntryArena, base: Color, colors: Vec<Color>) {
        arena.set_generated_color(self.base, base);
        for (id, color) in self.ramp.iter().zip(colors) {
            arena.set_generated_color(*id, color);
        }
    }
}

fn generate_checked(generator: &dyn RampGenerator, base: Color, steps: usize) -> Result<Vec<Color>> {
    let colors = generator.generate(base, steps);
    if colors.len() != steps {
        return Err(PaletteError::RampLength { expected: steps, actual: colors.len() });
    }
    Ok(colors)
}

/// Placeholder ramp step with optional metadata
pub fn ramp_step(title: Option<String>, description: Option<String>) -> PaletteEntry {
    let entry = PaletteEntry::new(EntryKind::Ramp, Color::default()).with_description(description);
    match title {
        Some(title) => entry.with_title(title),
        None => entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_palette(arena: &mut EntryArena, base: Color, len: usize) -> ColorPalette {
        let steps = (0..len).map(|_| ramp_step(None, None)).collect();
        ColorPalette::build(
            arena,
            PaletteEntry::new(EntryKind::Source, base),
            steps,
            &LightnessRamp::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_lightness_ramp_shape() {
        let ramp = LightnessRamp::default().generate(Color::rgb(0, 120, 215), 5);
        assert_eq!(ramp.len(), 5);
        assert_eq!(ramp[2], Color::rgb(0, 120, 215));
        assert!(ramp[0].relative_luminance() > ramp[1].relative_luminance());
        assert!(ramp[3].relative_luminance() > ramp[4].relative_luminance());
    }

    #[test]
    fn test_lightness_ramp_is_deterministic() {
        let generator = LightnessRamp::new(0.6);
        let base = Color::rgb(80, 40, 200);
        assert_eq!(generator.generate(base, 11), generator.generate(base, 11));
    }

    #[test]
    fn test_lightness_ramp_degenerate_lengths() {
        let generator = LightnessRamp::default();
        assert!(generator.generate(Color::WHITE, 0).is_empty());
        assert_eq!(generator.generate(Color::WHITE, 1), vec![Color::WHITE]);
    }

    #[test]
    fn test_build_assigns_generated_colors() {
        let mut arena = EntryArena::new();
        let base = Color::rgb(0, 120, 215);
        let palette = build_palette(&mut arena, base, 5);

        let expected = LightnessRamp::default().generate(base, 5);
        let actual: Vec<Color> = palette.ramp().iter().map(|id| arena[*id].active_color()).collect();

        assert_eq!(actual, expected);
        assert_eq!(palette.base_color(&arena), base);
        assert_eq!(palette.len(), 5);
        assert!(palette.contains(palette.base()));
    }

    #[test]
    fn test_build_rejects_empty_ramp() {
        let mut arena = EntryArena::new();
        let result = ColorPalette::build(
            &mut arena,
            PaletteEntry::new(EntryKind::Source, Color::WHITE),
            Vec::new(),
            &LightnessRamp::default(),
        );
        assert_eq!(result, Err(PaletteError::EmptyRamp));
    }

    #[test]
    fn test_regenerate_preserves_overrides() {
        let mut arena = EntryArena::new();
        let palette = build_palette(&mut arena, Color::rgb(0, 120, 215), 5);
        let custom = Color::rgb(0x11, 0x22, 0x33);
        arena.set_custom_color(palette.ramp()[2], custom);
        let before: Vec<Color> = palette.ramp().iter().map(|id| arena[*id].active_color()).collect();

        let new_base = Color::rgb(200, 30, 30);
        palette.regenerate(&mut arena, &LightnessRamp::default(), new_base).unwrap();

        let expected = LightnessRamp::default().generate(new_base, 5);
        for (i, id) in palette.ramp().iter().enumerate() {
            if i == 2 {
                assert_eq!(arena[*id].active_color(), custom);
                assert_eq!(arena[*id].generated_color(), expected[2]);
            } else {
                assert_eq!(arena[*id].active_color(), expected[i]);
                assert_ne!(arena[*id].active_color(), before[i]);
            }
        }
        assert_eq!(palette.base_color(&arena), new_base);
        assert_eq!(palette.overrides(&arena), vec![None, None, Some(custom), None, None]);
    }

    #[test]
    fn test_regenerate_rejects_bad_generator() {
        let mut arena = EntryArena::new();
        let base = Color::rgb(0, 120, 215);
        let palette = build_palette(&mut arena, base, 3);
        arena.take_changes();

        let short = |_: Color, _: usize| vec![Color::BLACK];
        let result = palette.regenerate(&mut arena, &short, Color::WHITE);

        assert_eq!(result, Err(PaletteError::RampLength { expected: 3, actual: 1 }));
        assert_eq!(palette.base_color(&arena), base);
        assert!(arena.take_changes().is_empty());
    }

    #[test]
    fn test_slot_order_and_names() {
        for (i, slot) in PaletteSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
        assert_eq!(PaletteSlot::DarkPrimary.to_string(), "DarkPrimary");
    }

    #[test]
    fn test_closure_generator() {
        let flat = |base: Color, steps: usize| vec![base; steps];
        let mut arena = EntryArena::new();
        let steps = (0..3).map(|_| ramp_step(Some("Step".to_string()), None)).collect();
        let palette = ColorPalette::build(
            &mut arena,
            PaletteEntry::new(EntryKind::Source, Color::BLACK),
            steps,
            &flat,
        )
        .unwrap();

        assert!(palette.ramp().iter().all(|id| arena[*id].active_color() == Color::BLACK));
        assert_eq!(arena[palette.ramp()[0]].title(), Some("Step"));
    }
}
