//! Editor configuration.

use crate::geometry::LatLng;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor configuration. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Vertex handle hit radius in pixels.
    pub vertex_hit_radius: f64,
    /// Width of the invisible hit band along each edge, in pixels.
    pub edge_hit_width: f64,
    /// A rectangle press must travel further than this to complete by dragging.
    pub rectangle_drag_threshold: f64,
    /// Clicks closer than this to the previous polygon point are ignored.
    pub click_dedupe_distance: f64,
    /// Parts at or above this many vertices are not densified.
    pub max_densify_vertices: usize,
    /// Densify a freshly created record when every part is smaller than ten vertices.
    pub densify_on_edit: bool,
    /// Enter edit mode on a record right after drawing it.
    pub edit_after_create: bool,
    /// Append new drawings to the latest record instead of creating new ones.
    pub merge_new_drawings: bool,
    pub default_annotation: String,
    pub initial_center: LatLng,
    pub initial_zoom: f64,
    pub viewport: Size,
    /// Zoom used when navigating to a record.
    pub navigate_zoom: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            vertex_hit_radius: 8.0,
            edge_hit_width: 12.0,
            rectangle_drag_threshold: 5.0,
            click_dedupe_distance: 5.0,
            max_densify_vertices: 100,
            densify_on_edit: false,
            edit_after_create: true,
            merge_new_drawings: false,
            default_annotation: "SUSPICIOUS".to_string(),
            initial_center: LatLng::new(20.0, 0.0),
            initial_zoom: 2.0,
            viewport: Size::new(800.0, 600.0),
            navigate_zoom: 6.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::debug!("Loaded editor config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EditorConfig::from_json_str(r#"{"edge_hit_width": 20, "initial_center": [1, 2]}"#)
                .unwrap();
        assert_eq!(config.edge_hit_width, 20.0);
        assert_eq!(config.initial_center, LatLng::new(1.0, 2.0));
        assert_eq!(config.vertex_hit_radius, 8.0);
        assert_eq!(config.default_annotation, "SUSPICIOUS");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"merge_new_drawings": true, "viewport": {{"width": 1024, "height": 768}}}}"#)
            .unwrap();
        let config = EditorConfig::load(file.path()).unwrap();
        assert!(config.merge_new_drawings);
        assert_eq!(config.viewport, Size::new(1024.0, 768.0));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            EditorConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EditorConfig::load("/nonexistent/geoscribe.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
