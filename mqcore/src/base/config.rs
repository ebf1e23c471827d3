use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    magic::{
        CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BOND_TOLERANCE, DEFAULT_LOOKUP_CELL_SIZE,
        DEFAULT_MASK_DENSITY_THRESHOLD, DEFAULT_MAX_RING_SIZE, ENV_CONFIG_PATH,
    },
    utils::error::{MqError, MqResult},
};

/// Tunables of the structural runtime.
///
/// Every field has a default, so a configuration file only needs to list what
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Estimated fill ratio at or above which masks use a dense bit set.
    pub mask_density_threshold: f64,
    /// Edge length (Å) of the spatial lookup grid cells.
    pub lookup_cell_size: f64,
    /// Slack (Å) added to covalent radii sums when inferring bonds.
    pub bond_tolerance: f64,
    /// Largest ring size reported by the ring finder.
    pub max_ring_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mask_density_threshold: DEFAULT_MASK_DENSITY_THRESHOLD,
            lookup_cell_size: DEFAULT_LOOKUP_CELL_SIZE,
            bond_tolerance: DEFAULT_BOND_TOLERANCE,
            max_ring_size: DEFAULT_MAX_RING_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Get the default path to the MolQL configuration file.
    pub fn default_path() -> PathBuf {
        Self::path_from(|key| std::env::var(key).ok())
    }

    /// Default configuration path given a lookup of environment variables.
    pub(crate) fn path_from(var: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(config_path) = var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Some(appdata) = var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(xdg_config_home) = var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Some(home) = var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push(CONFIG_DIR_NAME);
        path.push(CONFIG_FILE_NAME);
        path
    }

    /// Load the configuration at [`RuntimeConfig::default_path`], falling back
    /// to defaults when the file does not exist.
    pub fn load_or_default() -> MqResult<Self> {
        Self::load_or_default_at(&Self::default_path())
    }

    /// Load the configuration at `path`, or the defaults when there is no file.
    pub fn load_or_default_at(path: &Path) -> MqResult<Self> {
        if path.exists() {
            Self::load_from_toml(path)
        } else {
            debug!("No runtime configuration at `{}`, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> MqResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;
        let config = Self::parse(&toml_str, &path.display().to_string())?;
        info!("Loaded runtime configuration from `{}`", path.display());
        Ok(config)
    }

    pub fn from_toml_str(toml_str: &str) -> MqResult<Self> {
        Self::parse(toml_str, "<inline>")
    }

    fn parse(toml_str: &str, file: &str) -> MqResult<Self> {
        toml::from_str(toml_str).map_err(|e| MqError::ConfigParseError {
            source: e,
            file: file.to_string(),
        })
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save_to_toml(&self, path: &Path) -> MqResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            MqError::Unknown(format!(
                "Failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let config = RuntimeConfig::from_toml_str("max_ring_size = 6\n").unwrap();
        assert_eq!(config.max_ring_size, 6);
        assert_eq!(config.lookup_cell_size, DEFAULT_LOOKUP_CELL_SIZE);
        assert_eq!(config.mask_density_threshold, 1.0 / 12.0);
    }

    #[test]
    fn malformed_files_report_parse_errors() {
        let err = RuntimeConfig::from_toml_str("max_ring_size = \"six\"").unwrap_err();
        assert!(matches!(err, MqError::ConfigParseError { .. }));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = std::env::temp_dir().join(format!("mqcore-bad-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "lookup_cell_size = [1, 2]\nmax_ring_size = 6\n").unwrap();

        match RuntimeConfig::load_from_toml(&path).unwrap_err() {
            MqError::ConfigParseError { file, .. } => assert_eq!(file, path.display().to_string()),
            other => panic!("unexpected error {other}"),
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn explicit_path_wins_over_xdg() {
        let explicit = RuntimeConfig::path_from(env(&[
            (ENV_CONFIG_PATH, "/etc/molql.toml"),
            ("XDG_CONFIG_HOME", "/xdg"),
        ]));
        assert_eq!(explicit, PathBuf::from("/etc/molql.toml"));

        #[cfg(not(target_os = "windows"))]
        {
            let xdg = RuntimeConfig::path_from(env(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]));
            assert_eq!(xdg, PathBuf::from("/xdg/molql/config.toml"));
            let home = RuntimeConfig::path_from(env(&[("HOME", "/home/u")]));
            assert_eq!(home, PathBuf::from("/home/u/.config/molql/config.toml"));
        }
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let path = std::env::temp_dir()
            .join(format!("mqcore-missing-{}", std::process::id()))
            .join(CONFIG_FILE_NAME);
        assert_eq!(RuntimeConfig::load_or_default_at(&path).unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("mqcore-config-{}", std::process::id()));
        let path = dir.join("nested").join(CONFIG_FILE_NAME);
        let config = RuntimeConfig {
            bond_tolerance: 0.25,
            ..RuntimeConfig::default()
        };
        config.save_to_toml(&path).unwrap();
        assert_eq!(RuntimeConfig::load_from_toml(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
