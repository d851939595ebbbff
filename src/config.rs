use serde::Deserialize;

use crate::paint::Color;

/// Pan-drag tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanConfig {
    /// Motion samples closer together than this are ignored.
    pub debounce_ms: u64,
    /// Drag speed (px/s) below which no acceleration is applied.
    pub accel_threshold: f32,
    /// Acceleration added per px/s above the threshold.
    pub accel_per_speed: f32,
    pub max_accel: f32,
    /// Samples at or above this speed (px/s) are dropped as input glitches.
    pub runaway_speed: f32,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            accel_threshold: 200.0,
            accel_per_speed: 0.01,
            max_accel: 8.0,
            runaway_speed: 2000.0,
        }
    }
}

impl PanConfig {
    /// Multiplier applied to a drag delta moving at `speed` px/s.
    pub fn acceleration(&self, speed: f32) -> f32 {
        if speed <= self.accel_threshold {
            return 1.0;
        }
        (1.0 + (speed - self.accel_threshold) * self.accel_per_speed).min(self.max_accel)
    }
}

/// View tunables, loaded from `data/view.ron`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub base_tile_width: f32,
    pub base_tile_height: f32,
    /// Extra tiles drawn around the visible region so tall buildings rooted
    /// off-screen are not clipped.
    pub render_margin: i32,
    pub background: Color,
    pub pan: PanConfig,
    /// Keyboard scroll step multiplier while Shift is held.
    pub scroll_fast_multiplier: f32,
    pub asset_dir: String,
    pub manifest: String,
    /// Demo world.
    pub world_side: i32,
    pub world_seed: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            base_tile_width: 128.0,
            base_tile_height: 64.0,
            render_margin: 7,
            background: [0.0, 0.5, 0.0, 1.0],
            pan: PanConfig::default(),
            scroll_fast_multiplier: 5.0,
            asset_dir: "images/tiles".to_string(),
            manifest: "images.kdl".to_string(),
            world_side: 100,
            world_seed: 42,
            window_width: 1280,
            window_height: 800,
        }
    }
}

/// Load a [`ViewConfig`] from a RON file. Missing or malformed files fall
/// back to the defaults with a warning.
pub fn load_view_config(path: &str) -> ViewConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("failed to read {}: {}, using default view config", path, e);
            return ViewConfig::default();
        }
    };
    parse_view_config(&content).unwrap_or_else(|e| {
        log::warn!("failed to parse RON {}: {}, using default view config", path, e);
        ViewConfig::default()
    })
}

pub fn parse_view_config(content: &str) -> Result<ViewConfig, ron::error::SpannedError> {
    ron::from_str::<ViewConfig>(content)
}
