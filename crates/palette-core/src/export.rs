//! Theme exporters
//!
//! Exporters only see [`PaletteModel::export_colors`], the ordered token list
//! of each variant with the region color appended under `RegionColor`.

use std::fmt::Write;

use crate::color::Color;
use crate::mapping::ThemeVariant;
use crate::model::PaletteModel;

/// Produces a text payload from a model's resolved colors
pub trait ExportProvider {
    /// Render both variants
    fn export(&self, model: &PaletteModel) -> String;
}

/// Markup resource block with one `ColorPaletteResources` element per variant
///
/// ```text
/// <FluentTheme>
///   <FluentTheme.Palettes>
///     <ColorPaletteResources x:Key="Light" Accent="#FF0078D4" RegionColor="#FFFFFFFF" />
///     <ColorPaletteResources x:Key="Dark" ... />
///   </FluentTheme.Palettes>
/// </FluentTheme>
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeResourceExporter;

impl ExportProvider for ThemeResourceExporter {
    fn export(&self, model: &PaletteModel) -> String {
        let mut out = String::new();
        out.push_str("<FluentTheme>\n");
        out.push_str("  <FluentTheme.Palettes>\n");
        for variant in ThemeVariant::ALL {
            let _ = write!(out, "    <ColorPaletteResources x:Key=\"{}\"", variant);
            for (name, color) in model.export_colors(variant) {
                let _ = write!(out, " {}=\"{}\"", name, color.to_argb_string());
            }
            out.push_str(" />\n");
        }
        out.push_str("  </FluentTheme.Palettes>\n");
        out.push_str("</FluentTheme>\n");
        out
    }
}

/// `"Light_Accent" : "#0078D4",` lines, light variant first
///
/// A variant with no mappings is skipped, region color included.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueExporter;

impl KeyValueExporter {
    fn line(out: &mut String, variant: ThemeVariant, name: &str, color: Color) {
        let _ = writeln!(out, "\"{}_{}\" : \"{}\",", variant, name, color.to_css_string());
    }
}

impl ExportProvider for KeyValueExporter {
    fn export(&self, model: &PaletteModel) -> String {
        let mut out = String::new();
        for variant in ThemeVariant::ALL {
            if model.mappings(variant).is_empty() {
                continue;
            }
            for (name, color) in model.export_colors(variant) {
                Self::line(&mut out, variant, name, color);
            }
        }
        out
    }
}
