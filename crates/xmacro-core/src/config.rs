//! Runtime configuration shared by the recorders and the player.
//!
//! A [`MacroConfig`] is built once at startup and passed by reference to
//! every component that needs it.  Values are layered:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file,
//! 3. command-line flags ([`ConfigOverrides`]).
//!
//! ```toml
//! delay_ms = 10
//! scale = 1.0
//! quit_key = 9
//! display = "remote:0"
//! ```
//!
//! Fields missing from the file keep their defaults via
//! `#[serde(default = "...")]`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::event::Keycode;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "XMACRO_CONFIG";

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The scale factor is zero, negative, or not finite.
    #[error("scale factor must be a finite number greater than 0, got {0}")]
    InvalidScale(f64),
}

/// Settings for one recording or replay session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MacroConfig {
    /// Delay in milliseconds passed with every synthetic key/button event.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Factor applied to pointer coordinates at replay time.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Keycode that ends a recording.  Picked interactively when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quit_key: Option<Keycode>,
    /// Name of the remote display, e.g. `"host:0"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

fn default_delay_ms() -> u64 {
    10
}
fn default_scale() -> f64 {
    1.0
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            scale: default_scale(),
            quit_key: None,
            display: None,
        }
    }
}

/// Values given on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub delay_ms: Option<u64>,
    pub scale: Option<f64>,
    pub quit_key: Option<Keycode>,
    pub display: Option<String>,
}

impl MacroConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::InvalidScale`] for an unusable scale.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: MacroConfig = toml::from_str(content)?;
        cfg.validate()
    }

    /// Reads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`MacroConfig::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Builds the effective configuration from an optional file and the
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Propagates file errors and rejects an invalid final scale.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(overrides).validate()
    }

    /// Applies `overrides` on top of `self`.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(delay_ms) = overrides.delay_ms {
            self.delay_ms = delay_ms;
        }
        if let Some(scale) = overrides.scale {
            self.scale = scale;
        }
        if overrides.quit_key.is_some() {
            self.quit_key = overrides.quit_key;
        }
        if overrides.display.is_some() {
            self.display = overrides.display;
        }
        self
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidScale`] unless `scale` is finite and > 0.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::InvalidScale(self.scale));
        }
        Ok(self)
    }

    /// Scales one pointer coordinate: `floor(c * scale)`, saturating.
    pub fn scale_coordinate(&self, c: i32) -> i32 {
        // `as` saturates float-to-int conversions
        (f64::from(c) * self.scale).floor() as i32
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delay_is_ten_ms_and_scale_is_one() {
        let cfg = MacroConfig::default();
        assert_eq!(cfg.delay_ms, 10);
        assert_eq!(cfg.scale, 1.0);
        assert!(cfg.quit_key.is_none());
        assert!(cfg.display.is_none());
    }

    #[test]
    fn test_unit_scale_is_identity() {
        let cfg = MacroConfig::default();
        for c in [i32::MIN, -1, 0, 1, 1919, i32::MAX] {
            assert_eq!(cfg.scale_coordinate(c), c);
        }
    }

    #[test]
    fn test_scale_floors_result() {
        let cfg = MacroConfig { scale: 0.5, ..MacroConfig::default() };
        assert_eq!(cfg.scale_coordinate(3), 1);
        assert_eq!(cfg.scale_coordinate(-3), -2);
    }

    #[test]
    fn test_scale_saturates() {
        let cfg = MacroConfig { scale: 4.0, ..MacroConfig::default() };
        assert_eq!(cfg.scale_coordinate(i32::MAX), i32::MAX);
        assert_eq!(cfg.scale_coordinate(i32::MIN), i32::MIN);
    }

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        let cfg = MacroConfig::from_toml("").unwrap();
        assert_eq!(cfg, MacroConfig::default());
    }

    #[test]
    fn test_deserialize_full_toml() {
        // Arrange
        let toml = r#"
            delay_ms = 25
            scale = 1.5
            quit_key = 9
            display = "remote:0"
        "#;

        // Act
        let cfg = MacroConfig::from_toml(toml).unwrap();

        // Assert
        assert_eq!(cfg.delay_ms, 25);
        assert_eq!(cfg.scale, 1.5);
        assert_eq!(cfg.quit_key, Some(9));
        assert_eq!(cfg.display.as_deref(), Some("remote:0"));
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result = MacroConfig::from_toml("delay_ms = \"soon\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_non_positive_scale_is_rejected() {
        for toml in ["scale = 0.0", "scale = -2.0", "scale = nan", "scale = inf"] {
            assert!(
                matches!(MacroConfig::from_toml(toml), Err(ConfigError::InvalidScale(_))),
                "{toml} should be rejected"
            );
        }
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        // Arrange
        let base = MacroConfig {
            delay_ms: 50,
            quit_key: Some(9),
            ..MacroConfig::default()
        };
        let overrides = ConfigOverrides {
            scale: Some(2.0),
            display: Some("other:1".into()),
            ..ConfigOverrides::default()
        };

        // Act
        let cfg = base.with_overrides(overrides);

        // Assert
        assert_eq!(cfg.delay_ms, 50);
        assert_eq!(cfg.scale, 2.0);
        assert_eq!(cfg.quit_key, Some(9));
        assert_eq!(cfg.display.as_deref(), Some("other:1"));
    }

    #[test]
    fn test_load_without_file_validates_overrides() {
        let overrides = ConfigOverrides { scale: Some(0.0), ..ConfigOverrides::default() };
        assert!(matches!(
            MacroConfig::load(None, overrides),
            Err(ConfigError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/xmacro.toml");
        let result = MacroConfig::load(Some(&path), ConfigOverrides::default());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_layers_file_under_overrides() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("xmacro_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("xmacro.toml");
        std::fs::write(&path, "delay_ms = 40\nquit_key = 66\n").unwrap();
        let overrides = ConfigOverrides { delay_ms: Some(5), ..ConfigOverrides::default() };

        // Act
        let cfg = MacroConfig::load(Some(&path), overrides).unwrap();

        // Assert
        assert_eq!(cfg.delay_ms, 5);
        assert_eq!(cfg.quit_key, Some(66));

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }
}
