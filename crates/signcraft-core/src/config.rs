//! Editor configuration.
//!
//! Every field has a default, so a host can pass `{}` or only the keys it
//! wants to override.

use crate::error::CatalogError;
use crate::geometry::Size;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Upper bound on the template fit scale.
    pub max_fit_scale: f32,
    /// Make every instantiated object selectable and evented, regardless of
    /// the template's own interactivity flags.
    pub force_all_interactive: bool,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Multiplier for one zoom-in step.
    pub zoom_step: f32,
    /// Fraction of the canvas the content fills after fit-to-canvas.
    pub fit_padding: f32,
    /// Degrees.
    pub rotation_snap_step: f32,
    /// Degrees; snapping happens strictly inside this distance.
    pub rotation_snap_tolerance: f32,
    /// Canvas units.
    pub guide_tolerance: f32,
    pub wheel_debounce_ms: u64,
    pub mutation_debounce_ms: u64,
    pub max_upload_bytes: u64,
    pub history_depth: usize,
    /// Where `add_*` places new objects.
    pub insert_at: (f32, f32),
    pub default_shape_size: f32,
    pub default_image_size: Size,
    pub default_font_size: f32,
    pub canvas_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_fit_scale: 0.8,
            force_all_interactive: true,
            zoom_min: 0.1,
            zoom_max: 5.0,
            zoom_step: 1.2,
            fit_padding: 0.9,
            rotation_snap_step: 45.0,
            rotation_snap_tolerance: 10.0,
            guide_tolerance: 10.0,
            wheel_debounce_ms: 50,
            mutation_debounce_ms: 16,
            max_upload_bytes: 10 * 1024 * 1024,
            history_depth: 100,
            insert_at: (100.0, 100.0),
            default_shape_size: 100.0,
            default_image_size: Size::new(200.0, 150.0),
            default_font_size: 24.0,
            canvas_size: Size::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Clamp a zoom level into `[zoom_min, zoom_max]`.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_override() {
        let cfg = EditorConfig::from_json(r#"{ "force_all_interactive": false, "zoom_max": 3 }"#)
            .unwrap();
        assert!(!cfg.force_all_interactive);
        assert_eq!(cfg.zoom_max, 3.0);
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.clamp_zoom(9.0), 3.0);
    }
}
