//! Shared model handle for multithreaded hosts
//!
//! Invariants span entries, palettes, mappings and presets, so the whole
//! model sits behind one mutex. Storage I/O happens outside the lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use storage::DocumentStore;
use tokio::sync::broadcast;

use crate::model::{write_preset, LoadOutcome, PaletteEvent, PaletteModel, Result};
use crate::preset::Preset;

/// Cloneable, lock-guarded [`PaletteModel`]
#[derive(Debug, Clone)]
pub struct SharedPaletteModel {
    inner: Arc<Mutex<PaletteModel>>,
}

impl SharedPaletteModel {
    /// Wrap a model
    pub fn new(model: PaletteModel) -> Self {
        Self { inner: Arc::new(Mutex::new(model)) }
    }

    /// Lock the model for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, PaletteModel> {
        self.inner.lock()
    }

    /// Run `f` with the model locked
    pub fn with<R>(&self, f: impl FnOnce(&mut PaletteModel) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Subscribe to model events
    pub fn subscribe(&self) -> broadcast::Receiver<PaletteEvent> {
        self.inner.lock().subscribe()
    }

    /// Read a preset file, then store and apply it under the lock
    pub async fn load_preset(&self, store: &dyn DocumentStore) -> LoadOutcome {
        let name = store.name();
        match store.read().await {
            Ok(bytes) => self.inner.lock().load_preset_bytes(&name, &bytes),
            Err(e) => {
                tracing::warn!("Abandoned loading preset {}: {}", name, e);
                LoadOutcome::Abandoned(e.to_string())
            }
        }
    }

    /// Capture under the lock, write, then store the preset
    pub async fn save_preset(&self, store: &dyn DocumentStore) -> Result<Preset> {
        let name = store.name();
        let preset = self.inner.lock().capture_preset(name.clone(), name);
        write_preset(store, &preset).await?;
        self.inner.lock().add_or_replace_preset(preset.clone());
        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::config::tests::sample_config;
    use crate::config::ConfigDocument;
    use crate::model::ModelOptions;
    use crate::palette::{LightnessRamp, PaletteSlot};
    use i18n::Translator;
    use storage::MemoryStore;

    fn shared() -> SharedPaletteModel {
        let doc: ConfigDocument = serde_json::from_value(sample_config(5)).unwrap();
        let model = PaletteModel::from_document(
            doc,
            &Translator::english().unwrap(),
            Arc::new(LightnessRamp::default()),
            ModelOptions::new(),
        )
        .unwrap();
        SharedPaletteModel::new(model)
    }

    #[tokio::test]
    async fn test_save_and_load_through_handle() {
        let shared = shared();
        let step = shared.with(|m| m.palette(PaletteSlot::DarkBase).ramp()[1]);
        shared.with(|m| m.set_entry_color(step, Color::rgb(7, 7, 7))).unwrap();

        let store = MemoryStore::new("Night");
        let saved = shared.save_preset(&store).await.unwrap();
        assert_eq!(saved.id(), "Night");

        shared.with(|m| m.revert_entry(step)).unwrap();
        assert!(shared.lock().active_preset().is_none());

        let outcome = shared.load_preset(&store).await;
        assert_eq!(outcome, LoadOutcome::Applied("Night".to_string()));
        assert_eq!(shared.lock().entries()[step].active_color(), Color::rgb(7, 7, 7));
        assert_eq!(shared.lock().presets().len(), 1);
    }

    #[tokio::test]
    async fn test_edits_from_other_threads() {
        let shared = shared();
        let region = shared.lock().light_region();

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.with(|m| m.set_entry_color(region, Color::rgb(200 + i, 200, 200))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let color = shared.lock().entries()[region].active_color();
        assert!((200..204).contains(&color.r));
    }

    #[tokio::test]
    async fn test_load_missing_document_is_abandoned() {
        let shared = shared();
        let outcome = shared.load_preset(&MemoryStore::new("empty")).await;
        assert!(matches!(outcome, LoadOutcome::Abandoned(_)));
    }
}
