//! Model initialization integration tests
//!
//! Builds models from the theme fixture and checks the failure paths a
//! malformed configuration takes, localized descriptions, the settle
//! notification and both exporters.

use std::sync::Arc;
use std::time::Duration;

use palette_core::{
    ConfigDocument, ConfigError, ExportProvider, KeyValueExporter, LightnessRamp, ModelOptions,
    PaletteEvent, PaletteModel, PaletteSlot, Preset, ThemeResourceExporter, ThemeVariant,
};
use i18n::Translator;
use storage::{FileStore, MemoryStore};
use tokio::sync::broadcast;

const THEME: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/theme.json");

fn theme_value() -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(THEME).unwrap()).unwrap()
}

async fn initialize(store: MemoryStore) -> Result<PaletteModel, ConfigError> {
    PaletteModel::initialize(
        &store,
        &Translator::english().unwrap(),
        Arc::new(LightnessRamp::default()),
        ModelOptions::new(),
    )
    .await
}

fn store_for(value: &serde_json::Value) -> MemoryStore {
    MemoryStore::with_contents("theme", serde_json::to_vec(value).unwrap())
}

fn count_updates(rx: &mut broadcast::Receiver<PaletteEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = rx.try_recv() {
        if event == PaletteEvent::PaletteUpdated {
            count += 1;
        }
    }
    count
}

/// The fixture builds every entry, mapping and preset
#[tokio::test]
async fn test_initialize_from_file() {
    let model = PaletteModel::initialize(
        &FileStore::new(THEME),
        &Translator::english().unwrap(),
        Arc::new(LightnessRamp::default()),
        ModelOptions::new(),
    )
    .await
    .unwrap();

    assert_eq!(model.ramp_len(), 5);
    assert_eq!(model.entries().len(), 4 + 4 * 6);
    assert_eq!(model.mappings(ThemeVariant::Light).len(), 27);
    assert_eq!(model.mappings(ThemeVariant::Dark).len(), 27);
    assert_eq!(model.presets().len(), 2);
    assert_eq!(model.active_preset().map(Preset::id), Some("Default"));

    let base = model.palette(PaletteSlot::LightBase).base();
    assert_eq!(model.entries()[base].title(), Some("Light base"));
    assert_eq!(model.entries()[model.white()].title(), Some("Dark theme text contrast"));
}

/// Descriptions list light targets before dark ones
#[tokio::test]
async fn test_descriptions_follow_mappings() {
    let model = initialize(store_for(&theme_value())).await.unwrap();

    let black = model.entries()[model.black()].description().unwrap();
    assert!(black.starts_with("Used for BaseHigh, ChromeBlackHigh, AltHigh"));
    assert!(black.ends_with("ChromeWhite"));

    let unused = model.palette(PaletteSlot::DarkBase).base();
    assert_eq!(model.entries()[unused].description(), None);
}

/// Titles and descriptions come from the negotiated language
#[tokio::test]
async fn test_german_descriptions() {
    let model = PaletteModel::initialize(
        &store_for(&theme_value()),
        &Translator::for_locales(&["de-DE"]).unwrap(),
        Arc::new(LightnessRamp::default()),
        ModelOptions::new(),
    )
    .await
    .unwrap();

    let region = model.entries()[model.light_region()].description().unwrap();
    assert_eq!(region, "Verwendet für ChromeLow");
}

/// A ramp index past the ramp length names the offending mapping
#[tokio::test]
async fn test_index_out_of_range() {
    let mut value = theme_value();
    value["LightPaletteMapping"][0]["SourceIndex"] = serde_json::json!(99);

    let err = initialize(store_for(&value)).await.unwrap_err();

    match err {
        ConfigError::IndexOutOfRange { path, index, len } => {
            assert_eq!(path, "LightPaletteMapping[0].SourceIndex");
            assert_eq!(index, 99);
            assert_eq!(len, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// A missing configuration document is a read error
#[tokio::test]
async fn test_missing_document() {
    let err = initialize(MemoryStore::new("nothing")).await.unwrap_err();
    assert!(matches!(err, ConfigError::Read(_)));
}

/// A default preset id that matches nothing is rejected
#[tokio::test]
async fn test_unknown_default_preset() {
    let mut value = theme_value();
    value["DefaultPreset"] = serde_json::json!("Sepia");

    let err = initialize(store_for(&value)).await.unwrap_err();

    assert!(matches!(err, ConfigError::UnknownDefaultPreset { ref id, .. } if id == "Sepia"));
}

/// Two mappings for one target are rejected
#[tokio::test]
async fn test_duplicate_target() {
    let mut value = theme_value();
    value["DarkPaletteMapping"][4]["Target"] = serde_json::json!("Accent");

    let err = initialize(store_for(&value)).await.unwrap_err();

    assert!(matches!(err, ConfigError::DuplicateTarget { ref path, .. } if path == "DarkPaletteMapping[4].Target"));
}

/// A burst of edits settles into one update after the quiet period
#[tokio::test(start_paused = true)]
async fn test_edit_burst_settles_once() {
    let doc: ConfigDocument = serde_json::from_value(theme_value()).unwrap();
    let mut model = PaletteModel::from_document(
        doc,
        &Translator::english().unwrap(),
        Arc::new(LightnessRamp::default()),
        ModelOptions::new().event_capacity(256),
    )
    .unwrap();
    let mut rx = model.subscribe();
    let region = model.dark_region();

    for shade in [0x10, 0x20, 0x30] {
        model
            .set_entry_color(region, palette_core::Color::rgb(shade, shade, shade))
            .unwrap();
        tokio::time::advance(Duration::from_millis(40)).await;
    }
    assert_eq!(count_updates(&mut rx), 0);

    // 40ms already elapsed since the last edit
    tokio::time::advance(Duration::from_millis(440)).await;
    tokio::task::yield_now().await;
    assert_eq!(count_updates(&mut rx), 0);

    tokio::time::advance(Duration::from_millis(30)).await;
    tokio::task::yield_now().await;
    assert_eq!(count_updates(&mut rx), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert_eq!(count_updates(&mut rx), 0);
}

/// The resource block carries every target plus the region color
#[tokio::test]
async fn test_theme_resource_export() {
    let model = initialize(store_for(&theme_value())).await.unwrap();

    let text = ThemeResourceExporter.export(&model);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[2].matches("=\"#").count(), 28);
    assert!(lines[2].contains(" ChromeLow=\"#FFFFFFFF\""));
    assert!(lines[3].contains(" ChromeLow=\"#FF000000\""));
}

/// Key/value lines list light tokens, then dark tokens
#[tokio::test]
async fn test_key_value_export() {
    let model = initialize(store_for(&theme_value())).await.unwrap();
    let accent = model.palette(PaletteSlot::LightPrimary).ramp()[2];
    let accent = model.entries()[accent].active_color().to_css_string();

    let text = KeyValueExporter.export(&model);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 56);
    assert_eq!(lines[0], format!("\"Light_Accent\" : \"{}\",", accent));
    assert_eq!(lines[27], "\"Light_RegionColor\" : \"#FFFFFF\",");
    assert!(lines[28].starts_with("\"Dark_Accent\""));
    assert_eq!(lines[55], "\"Dark_RegionColor\" : \"#000000\",");
}
