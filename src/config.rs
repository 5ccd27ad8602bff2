use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{QualityRank, RegionCode};
use crate::error::BirdcallError;

pub const DEFAULT_CONFIG_FILE: &str = "birdcall.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub verbosity: Verbosity,
    #[serde(default)]
    pub xeno: XenoConfig,
    #[serde(default)]
    pub ebird: EbirdConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XenoConfig {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_max_per_species")]
    pub max_per_species: usize,
    #[serde(default)]
    pub better_than_rating: Option<String>,
    #[serde(default)]
    pub min_length_seconds: Option<i64>,
    #[serde(default)]
    pub max_length_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EbirdConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub backup_region_codes: Vec<String>,
    #[serde(default = "default_max_per_species")]
    pub max_per_species: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Debug,
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl Verbosity {
    /// `tracing` filter directive for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warning => "warn",
            Verbosity::Error | Verbosity::Critical => "error",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            overwrite: false,
            verbosity: Verbosity::default(),
            xeno: XenoConfig::default(),
            ebird: EbirdConfig::default(),
        }
    }
}

impl Default for XenoConfig {
    fn default() -> Self {
        Self {
            location: None,
            country: None,
            group: None,
            max_per_species: default_max_per_species(),
            better_than_rating: Some("C".to_string()),
            min_length_seconds: None,
            max_length_seconds: Some(300),
        }
    }
}

impl Default for EbirdConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            region_code: None,
            backup_region_codes: Vec::new(),
            max_per_species: default_max_per_species(),
        }
    }
}

/// Source A search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XenoCantoCriteria {
    pub location: Option<String>,
    pub country: Option<String>,
    pub group: String,
    pub better_than: Option<QualityRank>,
    pub min_length_seconds: Option<u32>,
    pub max_length_seconds: Option<u32>,
    pub max_per_species: usize,
}

impl XenoCantoCriteria {
    pub fn is_runnable(&self) -> bool {
        self.location.is_some() || self.country.is_some()
    }
}

/// Source B search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacaulayCriteria {
    pub api_key: Option<String>,
    pub region_code: Option<RegionCode>,
    pub backup_region_codes: Vec<RegionCode>,
    pub max_per_species: usize,
}

impl MacaulayCriteria {
    pub fn is_runnable(&self) -> bool {
        self.api_key.is_some() && self.region_code.is_some()
    }
}

/// Immutable input of one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub download_root: Utf8PathBuf,
    pub overwrite: bool,
    pub xeno: XenoCantoCriteria,
    pub macaulay: MacaulayCriteria,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub verbosity: Verbosity,
    pub criteria: SearchCriteria,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `birdcall.json` when no path is given. A missing
    /// default file yields the built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Config, BirdcallError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BirdcallError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| BirdcallError::ConfigParse(err.to_string()))
    }

    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BirdcallError> {
        Self::resolve_config(Self::load(path)?)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BirdcallError> {
        let better_than = non_empty(config.xeno.better_than_rating)
            .map(|value| value.parse::<QualityRank>())
            .transpose()?;

        let region_code = non_empty(config.ebird.region_code)
            .map(|value| value.parse::<RegionCode>())
            .transpose()?;
        let backup_region_codes = config
            .ebird
            .backup_region_codes
            .iter()
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<RegionCode>())
            .collect::<Result<Vec<_>, BirdcallError>>()?;

        let xeno = XenoCantoCriteria {
            location: non_empty(config.xeno.location),
            country: non_empty(config.xeno.country),
            group: non_empty(config.xeno.group).unwrap_or_else(|| "birds".to_string()),
            better_than,
            min_length_seconds: positive_seconds(config.xeno.min_length_seconds),
            max_length_seconds: positive_seconds(config.xeno.max_length_seconds),
            max_per_species: config.xeno.max_per_species,
        };
        let macaulay = MacaulayCriteria {
            api_key: non_empty(config.ebird.api_key),
            region_code,
            backup_region_codes,
            max_per_species: config.ebird.max_per_species,
        };

        Ok(ResolvedConfig {
            verbosity: config.verbosity,
            criteria: SearchCriteria {
                download_root: Utf8PathBuf::from(config.download_dir),
                overwrite: config.overwrite,
                xeno,
                macaulay,
            },
        })
    }

    pub fn save(path: &str, config: &Config) -> Result<(), BirdcallError> {
        let target = PathBuf::from(path);
        let content = serde_json::to_vec_pretty(config)
            .map_err(|err| BirdcallError::ConfigParse(err.to_string()))?;
        let tmp_path = target.with_extension("json.tmp");
        fs::write(&tmp_path, &content).map_err(|_| BirdcallError::ConfigWrite(target.clone()))?;
        fs::rename(&tmp_path, &target).map_err(|_| BirdcallError::ConfigWrite(target.clone()))?;
        Ok(())
    }
}

pub fn default_download_dir() -> String {
    UserDirs::new()
        .map(|dirs| dirs.home_dir().join("Downloads").join("BirdCalls"))
        .unwrap_or_else(|| PathBuf::from("BirdCalls"))
        .to_string_lossy()
        .into_owned()
}

fn default_max_per_species() -> usize {
    3
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_seconds(value: Option<i64>) -> Option<u32> {
    value
        .filter(|seconds| *seconds > 0)
        .and_then(|seconds| u32::try_from(seconds).ok())
}
