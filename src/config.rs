//! Game configuration: block catalogue, tray spacing and timings.
//!
//! The binary overrides the defaults from CLI flags.

use crate::block::Sprite;
use crate::geometry::Vec2;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("block catalogue is empty")]
    NoSprites,
    #[error("sprite {index} has bad extents {extents:?}")]
    BadExtents { index: usize, extents: Vec2 },
    #[error("tray spacing must be a positive number, got {0}")]
    BadSpacing(f32),
    #[error("frame rate must be between 1 and 1000, got {0}")]
    BadFrameRate(f64),
    #[error("world {width}x{height} is too small (need at least {min_width}x{min_height})")]
    WorldTooSmall {
        width: f32,
        height: f32,
        min_width: f32,
        min_height: f32,
    },
}

/// Tween durations and shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub entry: Duration,
    pub placement: Duration,
    pub cascade: Duration,
    pub discard: Duration,
    pub dispose: Duration,
    /// Height of the arc above the start of a flight.
    pub peak_offset: f32,
    /// Horizontal landing jitter as a fraction of block width.
    pub jitter: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            entry: Duration::from_millis(200),
            placement: Duration::from_millis(600),
            cascade: Duration::from_millis(300),
            discard: Duration::from_millis(500),
            dispose: Duration::from_millis(500),
            peak_offset: 0.5,
            jitter: 0.45,
        }
    }
}

/// Notification pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    /// Gate between two message starts.
    pub next_delay: Duration,
    /// Full opacity time before fading.
    pub hold: Duration,
    pub fade: Duration,
    /// Distance a toast rises over `rise_time`, in world units.
    pub rise: f32,
    pub rise_time: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            next_delay: Duration::from_millis(500),
            hold: Duration::from_millis(500),
            fade: Duration::from_millis(1000),
            rise: 1.0,
            rise_time: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// One tray slot per sprite, left to right.
    pub sprites: Vec<Sprite>,
    /// Distance between tray slots.
    pub tray_spacing: f32,
    /// Pause between tray spawns at start.
    pub spawn_delay: Duration,
    /// How far inside the view the first/last tray block must be to count as visible.
    pub scroll_margin: f32,
    pub frame_rate: f64,
    pub animation: AnimationConfig,
    pub notifications: NotificationConfig,
}

/// Smallest world the default layout works in.
pub const MIN_WORLD_WIDTH: f32 = 16.0;
pub const MIN_WORLD_HEIGHT: f32 = 10.0;

/// Host loop limits; outside them the frame period is meaningless or unrepresentable.
pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 1000.0;

const DEFAULT_BLOCKS: usize = 10;

/// False for NaN, infinities, zero and negatives.
fn positive(x: f32) -> bool {
    x.is_finite() && x > 0.0
}

/// Half heights cycle through these so towers mix block sizes.
const EXTENT_CYCLE: [f32; 4] = [0.5, 0.5, 1.0, 0.75];

/// Catalogue of `count` blocks cycling through the six palette colours.
pub fn default_sprites(count: usize) -> Vec<Sprite> {
    (0..count)
        .map(|i| {
            let ey = EXTENT_CYCLE[i % EXTENT_CYCLE.len()];
            Sprite::new((i % 6) as u8, Vec2::new(0.75, ey))
        })
        .collect()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sprites: default_sprites(DEFAULT_BLOCKS),
            tray_spacing: 2.25,
            spawn_delay: Duration::from_millis(50),
            scroll_margin: 1.0,
            frame_rate: 60.0,
            animation: AnimationConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sprites.is_empty() {
            return Err(ConfigError::NoSprites);
        }
        if let Some((index, s)) = self
            .sprites
            .iter()
            .enumerate()
            .find(|(_, s)| !(positive(s.half_extents.x) && positive(s.half_extents.y)))
        {
            return Err(ConfigError::BadExtents {
                index,
                extents: s.half_extents,
            });
        }
        if !positive(self.tray_spacing) {
            return Err(ConfigError::BadSpacing(self.tray_spacing));
        }
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return Err(ConfigError::BadFrameRate(self.frame_rate));
        }
        Ok(())
    }

    /// Frame period of the host loop.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }
}

/// Rejects worlds the default layout cannot fit in.
pub fn check_world(width: f32, height: f32) -> Result<(), ConfigError> {
    if width < MIN_WORLD_WIDTH || height < MIN_WORLD_HEIGHT {
        return Err(ConfigError::WorldTooSmall {
            width,
            height,
            min_width: MIN_WORLD_WIDTH,
            min_height: MIN_WORLD_HEIGHT,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = GameConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sprites.len(), DEFAULT_BLOCKS);
        assert_eq!(config.frame_duration(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = GameConfig {
            sprites: Vec::new(),
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoSprites));

        config.sprites = vec![Sprite::new(0, Vec2::new(0.5, 0.0))];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadExtents { index: 0, .. })
        ));

        config.sprites = default_sprites(2);
        config.tray_spacing = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::BadSpacing(0.0)));

        config.tray_spacing = 1.0;
        config.frame_rate = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::BadFrameRate(-1.0)));
    }

    #[test]
    fn rejects_nan_and_unrepresentable_numbers() {
        let base = GameConfig::default();
        for rate in [f64::NAN, f64::INFINITY, 1e-300, 0.5, 1e6] {
            let config = GameConfig {
                frame_rate: rate,
                ..base.clone()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::BadFrameRate(_))),
                "frame rate {rate} accepted"
            );
        }
        let config = GameConfig {
            frame_rate: MIN_FRAME_RATE,
            ..base.clone()
        };
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.frame_duration(), Duration::from_secs(1));

        for spacing in [f32::NAN, f32::INFINITY] {
            let config = GameConfig {
                tray_spacing: spacing,
                ..base.clone()
            };
            assert!(matches!(config.validate(), Err(ConfigError::BadSpacing(_))));
        }

        let config = GameConfig {
            sprites: vec![Sprite::new(0, Vec2::new(f32::NAN, 0.5))],
            ..base
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadExtents { index: 0, .. })
        ));
    }

    #[test]
    fn sprites_cycle_colours_and_sizes() {
        let sprites = default_sprites(8);
        assert_eq!(sprites[0].color, 0);
        assert_eq!(sprites[6].color, 0);
        assert_eq!(sprites[2].half_extents.y, 1.0);
        assert_eq!(sprites[3].half_extents.y, 0.75);
    }

    #[test]
    fn world_minimum() {
        assert!(check_world(40.0, 20.0).is_ok());
        assert!(matches!(
            check_world(10.0, 20.0),
            Err(ConfigError::WorldTooSmall { .. })
        ));
    }
}
