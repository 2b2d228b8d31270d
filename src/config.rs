//! Synthesis configuration.
//!
//! Every section has defaults, so a JSON file only needs to name the keys
//! it changes.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub layout: LayoutConfig,
    pub beams: BeamConfig,
    pub page: PageSetup,
    /// Writer ids the glyph library is built for; one is picked per sample.
    pub writers: Vec<String>,
    /// Resolution the render plan targets.
    pub render_dpi: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            beams: BeamConfig::default(),
            page: PageSetup::musescore_a4(),
            writers: (1..=5).map(|i| format!("writer-{i:02}")).collect(),
            render_dpi: 300.0,
        }
    }
}

impl SynthConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Column packing and system breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between neighbouring columns (mm).
    pub minimal_column_spacing: f64,
    /// Stretch columns over the full staff width.
    pub stretch_out_columns: bool,
    /// Start systems and pages where the score says so.
    pub respect_line_and_page_breaks: bool,
    /// Never drop overflowing measures to the next system.
    pub disable_wrapping: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            minimal_column_spacing: 1.2,
            stretch_out_columns: true,
            respect_line_and_page_breaks: true,
            disable_wrapping: true,
        }
    }
}

/// Stem and beam geometry (mm where applicable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub max_beam_slope: f64,
    /// Half-width of the uniform slope jitter for flat beams.
    pub beam_slope_jitter: f64,
    /// Fitted slopes below this are considered flat.
    pub flat_slope_threshold: f64,
    pub beam_spacing: f64,
    pub hook_length: f64,
    pub stem_length: f64,
    /// Horizontal offset of the stem base from the notehead origin.
    pub stem_base_offset: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            max_beam_slope: 0.35,
            beam_slope_jitter: 0.1,
            flat_slope_threshold: 0.01,
            beam_spacing: 1.5,
            hook_length: 3.0,
            stem_length: 5.0,
            stem_base_offset: 1.0,
        }
    }
}

/// Paper size, paddings and staff count (mm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub width: f64,
    pub height: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
    pub padding_left: f64,
    pub padding_right: f64,
    pub staff_count: usize,
}

impl PageSetup {
    /// A4 with MuseScore-like padding.
    pub fn musescore_a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            padding_top: 10.0,
            padding_bottom: 10.0,
            padding_left: 10.0,
            padding_right: 10.0,
            staff_count: 12,
        }
    }

    /// Proportions of a scanned handwritten manuscript page.
    pub fn handwritten() -> Self {
        Self {
            width: 250.0,
            height: 350.0,
            padding_top: 20.0,
            padding_bottom: 40.0,
            padding_left: 10.0,
            padding_right: 10.0,
            staff_count: 13,
        }
    }

    pub fn content_width(&self) -> f64 {
        self.width - (self.padding_left + self.padding_right)
    }

    pub fn content_height(&self) -> f64 {
        self.height - (self.padding_top + self.padding_bottom)
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::musescore_a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SynthConfig::from_json(
            r#"{ "layout": { "disable_wrapping": false }, "page": { "staff_count": 4 } }"#,
        )
        .unwrap();
        assert!(!config.layout.disable_wrapping);
        assert_eq!(config.layout.minimal_column_spacing, 1.2);
        assert_eq!(config.page.staff_count, 4);
        assert_eq!(config.page.width, 210.0);
        assert_eq!(config.beams, BeamConfig::default());
    }

    #[test]
    fn presets() {
        assert_eq!(PageSetup::musescore_a4().content_width(), 190.0);
        assert_eq!(PageSetup::handwritten().content_height(), 290.0);
    }
}
