use serde::{Deserialize, Serialize};
use crate::api::error::ConfigError;

/// Viewport height below which the smaller ball cap applies.
const TALL_VIEWPORT: f32 = 800.0;
/// Upper bound for a configured ball cap; buffers are sized from it up front.
const MAX_BALLS_LIMIT: usize = 10_000;
/// Upper bound for particles spawned by one explosion.
const MAX_EXPLOSION_PARTICLES: usize = 256;

/// Engine configuration. Every field has a default, so a host can send a
/// partial JSON object (or none at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Viewport width in px.
    pub width: f32,
    /// Viewport height in px.
    pub height: f32,
    pub ball_radius: f32,
    /// Fixed column count. Default: as many ball diameters as fit the width.
    pub column_count: Option<usize>,
    /// Downward acceleration in px/ms².
    pub gravity: f32,
    /// Largest simulation step in ms.
    pub max_delta_ms: f32,
    /// Fraction of the remaining horizontal gap closed per tick while falling.
    pub homing: f32,
    /// Border line position as a fraction of height from the top.
    pub border_ratio: f32,
    /// Minimum horizontal distance (px) between drops close in time.
    pub drop_spacing: f32,
    /// Maximum entries popped from the drop queue per batch.
    pub max_simultaneous_drop: usize,
    /// How long recent drops are remembered (ms).
    pub recent_drop_window_ms: f64,
    /// Recent drops older than this (ms) no longer conflict.
    pub conflict_window_ms: f64,
    /// Cap on the proportional anti-collision delay (ms).
    pub max_extra_delay_ms: f64,
    /// Length of the initial-load fast-stacking window (ms).
    pub initial_load_ms: f64,
    pub flip_duration_ms: f32,
    pub explosion_particles: usize,
    /// Override for the viewport-derived ball cap.
    pub max_balls: Option<usize>,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            ball_radius: 12.0,
            column_count: None,
            gravity: 0.0003,
            max_delta_ms: 33.0,
            homing: 0.02,
            border_ratio: 0.15,
            drop_spacing: 35.0,
            max_simultaneous_drop: 8,
            recent_drop_window_ms: 2000.0,
            conflict_window_ms: 800.0,
            max_extra_delay_ms: 1000.0,
            initial_load_ms: 1000.0,
            flip_duration_ms: 600.0,
            explosion_particles: 15,
            max_balls: None,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Reject values that would make the geometry degenerate or the buffers
    /// unallocatable. `from_json` and `SessionEngine::resize` call this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(ConfigError::Viewport {
                width: self.width,
                height: self.height,
            });
        }

        let positive = [
            ("ball_radius", self.ball_radius as f64),
            ("max_delta_ms", self.max_delta_ms as f64),
            ("flip_duration_ms", self.flip_duration_ms as f64),
            ("drop_spacing", self.drop_spacing as f64),
            ("recent_drop_window_ms", self.recent_drop_window_ms),
            ("conflict_window_ms", self.conflict_window_ms),
        ];
        let non_negative = [
            ("gravity", self.gravity as f64),
            ("max_extra_delay_ms", self.max_extra_delay_ms),
            ("initial_load_ms", self.initial_load_ms),
        ];
        let unit = [
            ("homing", self.homing as f64),
            ("border_ratio", self.border_ratio as f64),
        ];
        let bad = positive
            .iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
            .or_else(|| non_negative.iter().find(|(_, v)| !(v.is_finite() && *v >= 0.0)))
            .or_else(|| unit.iter().find(|(_, v)| !(v.is_finite() && (0.0..=1.0).contains(v))));
        if let Some(&(field, value)) = bad {
            return Err(ConfigError::Field { field, value });
        }

        let columns = self.column_count();
        if self.column_count == Some(0) || columns > self.width.max(1.0) as usize {
            return Err(ConfigError::Columns {
                columns: self.column_count.unwrap_or(columns),
                width: self.width,
            });
        }
        if let Some(cap) = self.max_balls {
            if cap == 0 || cap > MAX_BALLS_LIMIT {
                return Err(ConfigError::Field { field: "max_balls", value: cap as f64 });
            }
        }
        if self.explosion_particles > MAX_EXPLOSION_PARTICLES {
            return Err(ConfigError::Field {
                field: "explosion_particles",
                value: self.explosion_particles as f64,
            });
        }
        Ok(())
    }

    pub fn column_count(&self) -> usize {
        self.column_count
            .unwrap_or_else(|| (self.width / (self.ball_radius * 2.0)).floor() as usize)
            .max(1)
    }

    pub fn column_width(&self) -> f32 {
        self.width / self.column_count() as f32
    }

    /// X of a column's centre line.
    pub fn column_center(&self, column: usize) -> f32 {
        (column as f32 + 0.5) * self.column_width()
    }

    /// Y of the floor balls rest on.
    pub fn floor(&self) -> f32 {
        self.height
    }

    /// Y of the border line; stacked balls whose top edge reaches it are evicted.
    pub fn border_y(&self) -> f32 {
        self.height * self.border_ratio
    }

    /// Rendering ceiling: 300 balls below 800px tall, else 400.
    pub fn max_balls(&self) -> usize {
        self.max_balls.unwrap_or(if self.height < TALL_VIEWPORT { 300 } else { 400 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"width": 480, "seed": 7}"#).unwrap();
        assert_eq!(config.width, 480.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.drop_spacing, 35.0);
        assert_eq!(config.max_simultaneous_drop, 8);
    }

    #[test]
    fn rejects_empty_viewport() {
        assert!(EngineConfig::from_json(r#"{"height": 0}"#).is_err());
    }

    #[test]
    fn rejects_degenerate_geometry() {
        for json in [
            r#"{"ball_radius": 0}"#,
            r#"{"ball_radius": -3}"#,
            r#"{"ball_radius": 1e-30}"#,
            r#"{"column_count": 0}"#,
            r#"{"column_count": 1000000000}"#,
            r#"{"max_balls": 0}"#,
            r#"{"max_balls": 1000000000000}"#,
        ] {
            assert!(EngineConfig::from_json(json).is_err(), "accepted {}", json);
        }
        assert!(matches!(
            EngineConfig::from_json(r#"{"ball_radius": 0}"#),
            Err(ConfigError::Field { field: "ball_radius", .. })
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"column_count": 0}"#),
            Err(ConfigError::Columns { columns: 0, .. })
        ));
    }

    #[test]
    fn rejects_bad_timing() {
        for json in [
            r#"{"max_delta_ms": 0}"#,
            r#"{"flip_duration_ms": -1}"#,
            r#"{"conflict_window_ms": 0}"#,
            r#"{"initial_load_ms": -5}"#,
            r#"{"homing": 1.5}"#,
            r#"{"border_ratio": -0.1}"#,
        ] {
            assert!(EngineConfig::from_json(json).is_err(), "accepted {}", json);
        }
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn derived_geometry() {
        let config = EngineConfig::default().with_viewport(240.0, 1000.0);
        assert_eq!(config.column_count(), 10);
        assert_eq!(config.column_width(), 24.0);
        assert_eq!(config.column_center(0), 12.0);
        assert_eq!(config.border_y(), 150.0);
        assert_eq!(config.max_balls(), 400);
        assert_eq!(config.with_viewport(240.0, 799.0).max_balls(), 300);
    }

    #[test]
    fn tiny_viewport_still_has_a_column() {
        let config = EngineConfig::default().with_viewport(5.0, 100.0);
        assert_eq!(config.column_count(), 1);
    }
}
