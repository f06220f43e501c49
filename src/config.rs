use crate::error::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Preset configuration names for typical game sizes.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetName {
    Default,
    Small,
    Large,
}

impl PresetName {
    pub fn all() -> Vec<PresetName> {
        vec![PresetName::Default, PresetName::Small, PresetName::Large]
    }

    pub fn as_str(&self) -> &str {
        match self {
            PresetName::Default => "default",
            PresetName::Small => "small",
            PresetName::Large => "large",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PresetName::Default => "Standard grid with 6 buses, suited for 2-4 players",
            PresetName::Small => "Tiny 3-bus grid for quick manual testing",
            PresetName::Large => "12-bus grid for longer games with more players",
        }
    }
}

impl FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(PresetName::Default),
            "small" => Ok(PresetName::Small),
            "large" => Ok(PresetName::Large),
            _ => Err(format!("unknown preset: '{}'", s)),
        }
    }
}

/// Settings a game is initialized with. Loadable from YAML or TOML, with CLI
/// overrides applied afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Total number of buses on the grid, including NPC-only buses.
    pub n_buses: usize,

    /// Starting money for every human player.
    pub initial_funds: f64,

    /// Number of freezer "ice creams" each human's starting freezer holds.
    pub n_init_ice_cream: u32,

    /// Number of NPC-owned for-sale assets generated at init, in addition to
    /// each human's starting freezer.
    pub n_init_assets: usize,

    pub min_bid_price: f64,
    pub max_bid_price: f64,

    /// Side length (in arbitrary map units) of the square area buses are
    /// scattered across during initialization.
    pub map_area: f64,

    /// Seed for every deterministic RNG draw in this game (layout, NPC
    /// parameters, power sampling).
    pub seed: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            n_buses: 6,
            initial_funds: 1_000.0,
            n_init_ice_cream: 3,
            n_init_assets: 8,
            min_bid_price: 0.0,
            max_bid_price: 500.0,
            map_area: 100.0,
            seed: 42,
        }
    }
}

impl GameSettings {
    /// Validates the settings.
    ///
    /// # Examples
    /// ```
    /// use powerflow_game::GameSettings;
    ///
    /// let mut settings = GameSettings::default();
    /// assert!(settings.validate().is_ok());
    ///
    /// settings.n_buses = 0;
    /// assert!(settings.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.n_buses == 0 {
            return Err(GameError::ConfigError("n_buses must be greater than 0".to_string()));
        }

        if self.initial_funds.is_sign_negative() {
            return Err(GameError::ConfigError(format!(
                "initial_funds must be non-negative, got: {}",
                self.initial_funds
            )));
        }

        if self.n_init_ice_cream == 0 {
            return Err(GameError::ConfigError(
                "n_init_ice_cream must be greater than 0".to_string(),
            ));
        }

        if self.min_bid_price > self.max_bid_price {
            return Err(GameError::ConfigError(format!(
                "min_bid_price ({}) must not exceed max_bid_price ({})",
                self.min_bid_price, self.max_bid_price
            )));
        }

        if self.map_area <= 0.0 {
            return Err(GameError::ConfigError(format!(
                "map_area must be greater than 0, got: {}",
                self.map_area
            )));
        }

        if self.n_buses > 1_000 {
            return Err(GameError::ConfigError(format!(
                "n_buses is too large ({}), maximum recommended value is 1,000",
                self.n_buses
            )));
        }

        Ok(())
    }

    pub fn from_preset(preset: PresetName) -> Self {
        match preset {
            PresetName::Default => Self::default(),
            PresetName::Small => Self {
                n_buses: 3,
                initial_funds: 500.0,
                n_init_ice_cream: 2,
                n_init_assets: 3,
                min_bid_price: 0.0,
                max_bid_price: 200.0,
                map_area: 40.0,
                seed: 42,
            },
            PresetName::Large => Self {
                n_buses: 12,
                initial_funds: 2_000.0,
                n_init_ice_cream: 5,
                n_init_assets: 20,
                min_bid_price: 0.0,
                max_bid_price: 1_000.0,
                map_area: 200.0,
                seed: 42,
            },
        }
    }

    /// Load settings from a YAML or TOML file. Format is auto-detected from
    /// the file extension.
    ///
    /// # Examples
    /// ```no_run
    /// use powerflow_game::GameSettings;
    ///
    /// let settings = GameSettings::from_file("settings.yaml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| GameError::ConfigError(format!("failed to read {}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GameError::ConfigError("config file has no extension".to_string()))?;

        let settings: GameSettings = match extension.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| GameError::ConfigError(format!("invalid YAML: {}", e)))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| GameError::ConfigError(format!("invalid TOML: {}", e)))?,
            other => {
                return Err(GameError::ConfigError(format!(
                    "unsupported config format '{}', use .yaml, .yml, or .toml",
                    other
                )))
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Merge settings from a file with CLI overrides; CLI values win.
    pub fn from_file_with_overrides<P: AsRef<Path>, F>(path: P, cli_overrides: F) -> Result<Self>
    where
        F: FnOnce(&mut GameSettings),
    {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| GameError::ConfigError(format!("failed to read {}: {}", path.as_ref().display(), e)))?;
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GameError::ConfigError("config file has no extension".to_string()))?;
        let mut settings: GameSettings = match extension.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| GameError::ConfigError(format!("invalid YAML: {}", e)))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| GameError::ConfigError(format!("invalid TOML: {}", e)))?,
            other => {
                return Err(GameError::ConfigError(format!(
                    "unsupported config format '{}', use .yaml, .yml, or .toml",
                    other
                )))
            }
        };
        cli_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn loads_yaml_settings() {
        let yaml = r#"
n_buses: 5
initial_funds: 750.0
n_init_ice_cream: 4
n_init_assets: 6
min_bid_price: 0.0
max_bid_price: 300.0
map_area: 80.0
seed: 7
"#;
        let mut f = Builder::new().suffix(".yaml").tempfile().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f.flush().unwrap();

        let settings = GameSettings::from_file(f.path()).unwrap();
        assert_eq!(settings.n_buses, 5);
        assert_eq!(settings.seed, 7);
    }

    #[test]
    fn loads_toml_settings() {
        let toml_content = r#"
n_buses = 4
initial_funds = 600.0
n_init_ice_cream = 3
n_init_assets = 5
min_bid_price = 0.0
max_bid_price = 250.0
map_area = 60.0
seed = 9
"#;
        let mut f = Builder::new().suffix(".toml").tempfile().unwrap();
        f.write_all(toml_content.as_bytes()).unwrap();
        f.flush().unwrap();

        let settings = GameSettings::from_file(f.path()).unwrap();
        assert_eq!(settings.n_buses, 4);
        assert_eq!(settings.seed, 9);
    }

    #[test]
    fn rejects_unsupported_extension() {
        let mut f = Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"n_buses = 4").unwrap();
        f.flush().unwrap();
        let err = GameSettings::from_file(f.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = GameSettings::from_file("/nonexistent/settings.yaml").unwrap_err();
        assert!(matches!(err, GameError::ConfigError(_)));
    }

    #[test]
    fn cli_overrides_win_over_file_values() {
        let yaml = r#"
n_buses: 5
initial_funds: 750.0
n_init_ice_cream: 4
n_init_assets: 6
min_bid_price: 0.0
max_bid_price: 300.0
map_area: 80.0
seed: 7
"#;
        let mut f = Builder::new().suffix(".yaml").tempfile().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f.flush().unwrap();

        let settings = GameSettings::from_file_with_overrides(f.path(), |s| {
            s.seed = 999;
        })
        .unwrap();
        assert_eq!(settings.seed, 999);
        assert_eq!(settings.n_buses, 5);
    }

    #[test]
    fn validate_rejects_zero_buses() {
        let settings = GameSettings { n_buses: 0, ..Default::default() };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("n_buses"));
    }

    #[test]
    fn validate_rejects_inverted_bid_range() {
        let settings = GameSettings { min_bid_price: 10.0, max_bid_price: 5.0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_accepts_equal_bid_bounds() {
        let settings = GameSettings { min_bid_price: 10.0, max_bid_price: 10.0, ..Default::default() };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn all_presets_validate() {
        for preset in PresetName::all() {
            let settings = GameSettings::from_preset(preset.clone());
            assert!(settings.validate().is_ok(), "preset {:?} should validate", preset);
        }
    }

    #[test]
    fn preset_name_round_trips_through_str() {
        assert_eq!(PresetName::from_str("small").unwrap(), PresetName::Small);
        assert_eq!(PresetName::from_str("LARGE").unwrap(), PresetName::Large);
        assert!(PresetName::from_str("huge").is_err());
    }
}
