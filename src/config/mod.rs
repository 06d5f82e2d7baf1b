//! Configuration management for SizeCap

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::error::{Result, SizeCapError};

pub mod profiles;
pub use profiles::*;

/// Environment variable holding the batch size
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
/// Environment variable holding the per-level compression step
pub const ENV_STEP_OF_COMPRESSION: &str = "STEP_OF_COMPRESSION";
/// Environment variable holding the output folder name
pub const ENV_DESTINATION_FOLDER_NAME: &str = "DESTINATION_FOLDER_NAME";
/// Environment variable holding the worker count
pub const ENV_MAX_DEGREE_OF_PARALLELISM: &str = "MAX_DEGREE_OF_PARALLELISM";

/// Parallelism value meaning one worker per logical CPU
pub const UNBOUNDED_PARALLELISM: &str = "-1";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named processing presets
    pub profiles: HashMap<String, ProcessingConfig>,

    /// Settings used for this run
    pub processing: ProcessingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let profiles = Profiles::describe()
            .iter()
            .filter_map(|(name, _)| Profiles::by_name(name).map(|p| (name.to_string(), p)))
            .collect();

        Self {
            profiles,
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Batch and search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files per batch; batches run one after another
    pub batch_size: usize,

    /// Added to the downscale factor on every search level
    pub step_of_compression: f32,

    /// Name of the folder created inside the input folder
    pub destination_folder_name: String,

    /// Worker threads used within a batch
    pub max_degree_of_parallelism: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Profiles::standard()
    }
}

impl ProcessingConfig {
    /// Validate processing settings
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SizeCapError::config("Batch size must be greater than 0"));
        }

        if self.max_degree_of_parallelism == 0 {
            return Err(SizeCapError::config(
                "Degree of parallelism must be greater than 0"
            ));
        }

        // A non-positive step never shrinks the image and the search would spin forever
        if !self.step_of_compression.is_finite() || self.step_of_compression <= 0.0 {
            return Err(SizeCapError::config(format!(
                "Step of compression must be a positive number, got {}",
                self.step_of_compression
            )));
        }

        let name = &self.destination_folder_name;
        if name.trim().is_empty() {
            return Err(SizeCapError::config("Destination folder name must not be empty"));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SizeCapError::config(format!(
                "Destination folder name must be a plain folder name, got {:?}",
                name
            )));
        }

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored and the current setting is kept,
    /// as is a blank destination folder name. A parallelism of `-1` expands
    /// to the logical CPU count.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, ENV_BATCH_SIZE, &mut self.batch_size);
        override_parsed(&lookup, ENV_STEP_OF_COMPRESSION, &mut self.step_of_compression);

        let unbounded = lookup(ENV_MAX_DEGREE_OF_PARALLELISM)
            .is_some_and(|raw| raw.trim() == UNBOUNDED_PARALLELISM);
        if unbounded {
            self.max_degree_of_parallelism = num_cpus::get();
            debug!(
                "{} is {}, using {} workers",
                ENV_MAX_DEGREE_OF_PARALLELISM, UNBOUNDED_PARALLELISM, self.max_degree_of_parallelism
            );
        } else {
            override_parsed(
                &lookup,
                ENV_MAX_DEGREE_OF_PARALLELISM,
                &mut self.max_degree_of_parallelism,
            );
        }

        if let Some(name) = lookup(ENV_DESTINATION_FOLDER_NAME) {
            if name.trim().is_empty() {
                warn!("Ignoring blank {}", ENV_DESTINATION_FOLDER_NAME);
            } else {
                debug!("{} overridden from environment", ENV_DESTINATION_FOLDER_NAME);
                self.destination_folder_name = name;
            }
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };

    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!("{} overridden from environment", key);
            *target = value;
        }
        Err(_) => warn!("Ignoring invalid {} value {:?}", key, raw),
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SizeCapError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let mut config: Config = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => return Err(SizeCapError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        // Built-in presets stay available unless the file redefines them
        for (name, profile) in Config::default().profiles {
            config.profiles.entry(name).or_insert(profile);
        }

        Ok(config)
    }

    /// Load defaults, then an optional file, then an optional profile.
    ///
    /// Environment overrides are applied separately with
    /// [`ProcessingConfig::apply_env_overrides`].
    pub fn load(path: Option<&Path>, profile: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(name) = profile {
            config.processing = config.get_profile(name)?.clone();
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| SizeCapError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| SizeCapError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(SizeCapError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| SizeCapError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Get a processing profile by name
    pub fn get_profile(&self, name: &str) -> Result<&ProcessingConfig> {
        self.profiles.get(name)
            .ok_or_else(|| {
                let mut available: Vec<_> = self.profiles.keys().collect();
                available.sort();
                SizeCapError::config(format!(
                    "Profile '{}' not found. Available profiles: {:?}",
                    name, available
                ))
            })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in &self.profiles {
            profile.validate()
                .map_err(|e| SizeCapError::config(
                    format!("Invalid profile '{}': {}", name, e)
                ))?;
        }

        self.processing.validate()?;

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(SizeCapError::config(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Default location for a generated example configuration
pub fn default_config_path(yaml: bool) -> PathBuf {
    if yaml {
        PathBuf::from("sizecap.yaml")
    } else {
        PathBuf::from("sizecap.toml")
    }
}
