//! YAML configuration
//!
//! One file describes an instrument: the optical train, the phase-engine
//! tunables, display defaults, and logging. Objective profiles let one
//! config carry the optics of several turret positions.
//!
//! ## Configuration Search Path
//!
//! The first file found wins:
//! 1. Path in the `QPI_CONFIG` environment variable
//! 2. `./qpi.yaml` (current directory)
//! 3. `~/.config/qpi/config.yaml` (user config)
//! 4. `/etc/qpi/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! optics:
//!   pixel_size_um: 0.1
//!   numerical_aperture: 0.75
//!   wavelength_um: 0.532
//!
//! engine:
//!   search_min_frac: 0.05
//!   search_max_frac: 0.45
//!
//! display:
//!   mode: phase
//!   autoscale: true
//!
//! profiles:
//!   water_60x:
//!     pixel_size_um: 0.108
//!     numerical_aperture: 1.2
//!     wavelength_um: 0.532
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::convert::PlotSettings;
use crate::observe::LogConfig;
use crate::params::OpticsParams;
use crate::phase::PhaseConfig;

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file or profile not found
    NotFound(String),
    /// Failed to read the configuration file
    ReadError(String),
    /// Failed to parse or serialise configuration
    ParseError(String),
    /// A value fails validation
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Phase-engine tunables; the optics live in their own section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound of the sideband search band, fraction of frame height
    pub search_min_frac: f64,
    /// Upper bound of the sideband search band, fraction of frame height
    pub search_max_frac: f64,
    /// Floor applied to the background magnitude squared during division
    pub background_floor: f64,
    /// Unwrapper tie-break seed
    pub unwrap_seed: u64,
    /// Decimation factor before unwrapping
    pub unwrap_decimation: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = PhaseConfig::default();
        Self {
            search_min_frac: defaults.search_min_frac,
            search_max_frac: defaults.search_max_frac,
            background_floor: defaults.background_floor,
            unwrap_seed: defaults.unwrap_seed,
            unwrap_decimation: defaults.unwrap_decimation,
        }
    }
}

/// Complete instrument configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QpiConfig {
    /// Optical parameters of the active objective
    pub optics: OpticsParams,
    /// Phase-engine tunables
    pub engine: EngineConfig,
    /// Display defaults handed to the frame converter
    pub display: PlotSettings,
    /// Logging configuration
    pub logging: LogConfig,
    /// Named objective profiles (name -> optics)
    pub profiles: HashMap<String, OpticsParams>,
}

impl QpiConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the defaults if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("QPI_CONFIG") {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Swap in the optics of a named objective profile.
    pub fn with_profile(&self, name: &str) -> Result<Self, ConfigError> {
        let optics = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(format!("profile '{}' not found", name)))?;

        let mut config = self.clone();
        config.optics = *optics;
        Ok(config)
    }

    /// Phase-engine configuration assembled from the optics and engine
    /// sections.
    pub fn phase_config(&self) -> PhaseConfig {
        PhaseConfig {
            optics: self.optics,
            search_min_frac: self.engine.search_min_frac,
            search_max_frac: self.engine.search_max_frac,
            background_floor: self.engine.background_floor,
            unwrap_seed: self.engine.unwrap_seed,
            unwrap_decimation: self.engine.unwrap_decimation,
        }
    }

    /// Configuration search paths, environment variable excluded.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./qpi.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "qpi") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/qpi/config.yaml"));
        paths
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.optics
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        for (name, optics) in &self.profiles {
            optics.validate().map_err(|e| {
                ConfigError::ValidationError(format!("profile '{}': {}", name, e))
            })?;
        }

        let engine = &self.engine;
        if !(0.0..=1.0).contains(&engine.search_min_frac)
            || !(0.0..=1.0).contains(&engine.search_max_frac)
            || engine.search_min_frac >= engine.search_max_frac
        {
            return Err(ConfigError::ValidationError(format!(
                "search band [{}, {}] must satisfy 0 <= min < max <= 1",
                engine.search_min_frac, engine.search_max_frac
            )));
        }
        if !(engine.background_floor > 0.0) {
            return Err(ConfigError::ValidationError(
                "background_floor must be positive".to_string(),
            ));
        }
        if engine.unwrap_decimation == 0 {
            return Err(ConfigError::ValidationError(
                "unwrap_decimation must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Generate example configuration YAML with a profile filled in.
    pub fn example_yaml() -> String {
        let config = Self {
            profiles: {
                let mut profiles = HashMap::new();
                profiles.insert(
                    "air_40x".to_string(),
                    OpticsParams {
                        pixel_size_um: 0.1625,
                        numerical_aperture: 0.6,
                        wavelength_um: 0.532,
                    },
                );
                profiles.insert(
                    "water_60x".to_string(),
                    OpticsParams {
                        pixel_size_um: 0.108,
                        numerical_aperture: 1.2,
                        wavelength_um: 0.532,
                    },
                );
                profiles
            },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::DisplayMode;

    #[test]
    fn test_default_config() {
        let config = QpiConfig::default();
        assert_eq!(config.optics.pixel_size_um, 0.1);
        assert_eq!(config.engine.search_min_frac, 0.05);
        assert_eq!(config.display.mode, DisplayMode::Intensity);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
optics:
  pixel_size_um: 0.108
  numerical_aperture: 1.2
  wavelength_um: 0.633

engine:
  search_max_frac: 0.4
  unwrap_seed: 7

display:
  mode: phase
  autoscale: false
"#;
        let config = QpiConfig::parse(yaml).unwrap();
        assert_eq!(config.optics.numerical_aperture, 1.2);
        assert_eq!(config.optics.wavelength_um, 0.633);
        assert_eq!(config.engine.search_max_frac, 0.4);
        assert_eq!(config.engine.unwrap_seed, 7);
        assert_eq!(config.display.mode, DisplayMode::Phase);
        assert!(!config.display.autoscale);
        // Untouched sections keep their defaults
        assert_eq!(config.engine.search_min_frac, 0.05);
    }

    #[test]
    fn test_profiles() {
        let yaml = r#"
profiles:
  oil_100x:
    pixel_size_um: 0.065
    numerical_aperture: 1.4
    wavelength_um: 0.532
"#;
        let config = QpiConfig::parse(yaml).unwrap();
        let oil = config.with_profile("oil_100x").unwrap();
        assert_eq!(oil.optics.numerical_aperture, 1.4);

        assert!(matches!(
            config.with_profile("missing"),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_phase_config_assembly() {
        let mut config = QpiConfig::default();
        config.engine.background_floor = 1e-9;
        config.optics.numerical_aperture = 1.1;

        let phase = config.phase_config();
        assert_eq!(phase.background_floor, 1e-9);
        assert_eq!(phase.optics.numerical_aperture, 1.1);
    }

    #[test]
    fn test_validation_rejects_bad_band() {
        let mut config = QpiConfig::default();
        config.engine.search_min_frac = 0.5;
        config.engine.search_max_frac = 0.3;
        assert!(config.validate().is_err());

        config.engine.search_min_frac = 0.05;
        config.engine.search_max_frac = 0.45;
        config.engine.unwrap_decimation = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_covers_profiles() {
        let mut config = QpiConfig::default();
        config.profiles.insert(
            "broken".to_string(),
            OpticsParams {
                numerical_aperture: -1.0,
                ..OpticsParams::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_yaml_parses() {
        let yaml = QpiConfig::example_yaml();
        assert!(yaml.contains("optics:"));
        assert!(yaml.contains("water_60x"));
        let parsed = QpiConfig::parse(&yaml).unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_round_trip() {
        let config = QpiConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = QpiConfig::parse(&yaml).unwrap();
        assert_eq!(config.optics, parsed.optics);
        assert_eq!(config.engine.unwrap_seed, parsed.engine.unwrap_seed);
    }

    #[test]
    fn test_config_search_paths() {
        let paths = QpiConfig::config_search_paths();
        assert!(!paths.is_empty());
        assert!(paths[0].ends_with("qpi.yaml"));
    }
}
