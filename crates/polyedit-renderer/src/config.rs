use serde::{Deserialize, Serialize};

/// Render batching and progressive drawing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchConfig {
    /// Entries kept in the batch cache.
    pub cache_capacity: usize,
    /// Largest zoom change that still reuses the last batches.
    pub zoom_tolerance: f64,
    /// Largest viewport corner movement (image units) that still reuses the last batches.
    pub viewport_tolerance: f64,
    /// Time available for one animation frame.
    pub frame_budget_ms: f64,
    /// Fraction of the frame budget spent drawing before yielding.
    pub budget_fraction: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 50,
            zoom_tolerance: 0.1,
            viewport_tolerance: 50.0,
            frame_budget_ms: 1000.0 / 60.0,
            budget_fraction: 0.8,
        }
    }
}

impl BatchConfig {
    pub fn frame_allowance_ms(&self) -> f64 {
        self.frame_budget_ms * self.budget_fraction.clamp(0.0, 1.0)
    }
}

/// Multipliers applied to a vertex marker in one interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateStyle {
    pub radius_scale: f32,
    pub brightness: f32,
    pub opacity: f32,
}

impl Default for StateStyle {
    fn default() -> Self {
        Self {
            radius_scale: 1.0,
            brightness: 1.0,
            opacity: 1.0,
        }
    }
}

/// Vertex marker appearance and hit-testing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    /// Marker radius in screen pixels at zoom 1.
    pub base_radius: f32,
    /// Clamp range for the zoom-scaled radius, in image units.
    pub min_radius: f32,
    pub max_radius: f32,
    pub base_opacity: f32,
    pub hovered: StateStyle,
    pub selected: StateStyle,
    pub dragging: StateStyle,
    /// Used when a polygon's color string does not parse.
    pub default_color: String,
    /// Pick distance in screen pixels.
    pub hit_radius: f64,
    /// Below this many vertices hit-testing scans linearly.
    pub indexed_hit_threshold: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_radius: 5.0,
            min_radius: 0.5,
            max_radius: 25.0,
            base_opacity: 0.85,
            hovered: StateStyle {
                radius_scale: 1.4,
                brightness: 1.3,
                opacity: 1.0,
            },
            selected: StateStyle {
                radius_scale: 1.2,
                brightness: 1.15,
                opacity: 1.0,
            },
            dragging: StateStyle {
                radius_scale: 1.6,
                brightness: 1.5,
                opacity: 1.0,
            },
            default_color: "#ff0000".to_string(),
            hit_radius: 8.0,
            indexed_hit_threshold: 2000,
        }
    }
}
