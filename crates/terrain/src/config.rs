use serde::{Deserialize, Serialize};
use std::path::Path;

/// One sine term of the heightfield: `sin(x * frequency) * amplitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub frequency: f64,
    pub amplitude: f64,
}

impl Wave {
    pub const fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

/// Named sets of waves giving the terrain its look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveProfile {
    /// Long, tall hills with a small ripple on top.
    #[default]
    Hills,
    /// Short, low rolling bumps.
    Rolling,
}

impl WaveProfile {
    pub fn waves(self) -> Vec<Wave> {
        match self {
            Self::Hills => vec![Wave::new(0.0025, 20.0), Wave::new(0.01, 3.0)],
            Self::Rolling => vec![
                Wave::new(0.04, 1.0),
                Wave::new(0.03732, 1.0),
                Wave::new(0.083, 0.4),
            ],
        }
    }
}

/// Largest accepted `chunk_size`, in columns.
pub const MAX_CHUNK_SIZE: u32 = 1 << 16;

/// Largest accepted `window_length`, in chunks.
pub const MAX_WINDOW_LENGTH: u32 = 1024;

/// Errors from loading or validating a [`TerrainConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("chunk_size must be at least 1")]
    ZeroChunkSize,
    #[error("window_length must be at least 1")]
    ZeroWindow,
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        max: u32,
        value: u32,
    },
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

/// Terrain generation and streaming parameters.
///
/// Missing fields fall back to [`TerrainConfig::default`] when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Columns per chunk.
    pub chunk_size: u32,
    /// World units per column.
    pub resolution: f32,
    /// How far the ground mesh extends below the surface.
    pub chunk_depth: f32,
    /// Number of chunks kept resident around the viewer.
    pub window_length: u32,
    /// Friction of the ground fixtures.
    pub friction: f32,
    /// Sine terms summed by the heightfield.
    pub waves: Vec<Wave>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            resolution: 0.1,
            chunk_depth: 100.0,
            window_length: 8,
            friction: 0.5,
            waves: WaveProfile::Hills.waves(),
        }
    }
}

impl TerrainConfig {
    /// Default config with the waves of another profile.
    pub fn with_profile(profile: WaveProfile) -> Self {
        Self {
            waves: profile.waves(),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&data)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configs the streamer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.window_length == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::TooLarge {
                field: "chunk_size",
                max: MAX_CHUNK_SIZE,
                value: self.chunk_size,
            });
        }
        if self.window_length > MAX_WINDOW_LENGTH {
            return Err(ConfigError::TooLarge {
                field: "window_length",
                max: MAX_WINDOW_LENGTH,
                value: self.window_length,
            });
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "resolution",
                expected: "finite and positive",
                value: self.resolution as f64,
            });
        }
        if !self.chunk_depth.is_finite() || self.chunk_depth < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "chunk_depth",
                expected: "finite and non-negative",
                value: self.chunk_depth as f64,
            });
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "friction",
                expected: "finite and non-negative",
                value: self.friction as f64,
            });
        }
        for wave in &self.waves {
            for (field, value) in [
                ("waves.frequency", wave.frequency),
                ("waves.amplitude", wave.amplitude),
            ] {
                if !value.is_finite() {
                    return Err(ConfigError::OutOfRange {
                        field,
                        expected: "finite",
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Width of one chunk in world units.
    pub fn chunk_width(&self) -> f32 {
        self.chunk_size as f32 * self.resolution
    }

    /// World x of the first column of chunk `index`.
    pub fn chunk_origin_x(&self, index: i32) -> f32 {
        (index as f64 * self.chunk_size as f64 * self.resolution as f64) as f32
    }

    /// World-space x of a column.
    pub fn column_x(&self, column: i64) -> f32 {
        (column as f64 * self.resolution as f64) as f32
    }

    /// First column of chunk `index`.
    pub fn first_column(&self, index: i32) -> i64 {
        index as i64 * self.chunk_size as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TerrainConfig::default();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.resolution, 0.1);
        assert_eq!(config.chunk_depth, 100.0);
        assert_eq!(config.window_length, 8);
        assert_eq!(config.friction, 0.5);
        assert_eq!(config.waves.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn chunk_geometry_helpers() {
        let config = TerrainConfig {
            chunk_size: 4,
            resolution: 0.5,
            ..TerrainConfig::default()
        };
        assert_eq!(config.chunk_width(), 2.0);
        assert_eq!(config.chunk_origin_x(-3), -6.0);
        assert_eq!(config.first_column(-3), -12);
        assert_eq!(config.column_x(5), 2.5);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config = TerrainConfig::from_yaml_str("chunk_size: 32\nwindow_length: 4\n").unwrap();
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.window_length, 4);
        assert_eq!(config.resolution, 0.1);
        assert_eq!(config.waves, WaveProfile::Hills.waves());
    }

    #[test]
    fn yaml_roundtrip() {
        let config = TerrainConfig::with_profile(WaveProfile::Rolling);
        let yaml = config.to_yaml().unwrap();
        let back = TerrainConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn rejects_zero_sizes() {
        let err = TerrainConfig::from_yaml_str("chunk_size: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroChunkSize));

        let config = TerrainConfig {
            window_length: 0,
            ..TerrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn rejects_oversized_chunks_and_windows() {
        for window_length in [MAX_WINDOW_LENGTH + 1, 1 << 31, u32::MAX] {
            let config = TerrainConfig {
                window_length,
                ..TerrainConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::TooLarge {
                    field: "window_length",
                    ..
                })
            ));
        }

        let err = TerrainConfig::from_yaml_str("chunk_size: 4294967295\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooLarge {
                field: "chunk_size",
                ..
            }
        ));

        let config = TerrainConfig {
            chunk_size: MAX_CHUNK_SIZE,
            window_length: MAX_WINDOW_LENGTH,
            ..TerrainConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_resolution_and_friction() {
        let config = TerrainConfig {
            resolution: 0.0,
            ..TerrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "resolution",
                ..
            })
        ));

        let config = TerrainConfig {
            friction: f32::NAN,
            ..TerrainConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "friction",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_finite_waves() {
        let config = TerrainConfig {
            waves: vec![Wave::new(f64::INFINITY, 1.0)],
            ..TerrainConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "resolution: 0.25\nfriction: 0.8\n").unwrap();
        let config = TerrainConfig::from_yaml_file(tmp.path()).unwrap();
        assert_eq!(config.resolution, 0.25);
        assert_eq!(config.friction, 0.8);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TerrainConfig::from_yaml_file("/nonexistent/terrain.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
