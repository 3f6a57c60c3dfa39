//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.hytale-sources/config.toml`.
//! Every field has a default, so a missing or partial file is fine.
//!
//! # Examples
//!
//! ```no_run
//! use hytale_sources::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load()?;
//! println!("Patchline: {}", config.install.patchline);
//!
//! config.dependency.version = "latest.integration".to_string();
//! config.save()?;
//! # Ok(())
//! # }
//! ```

use crate::decompiler::{DEFAULT_ONLY, VINEFLOWER_URL};
use crate::maven::DEFAULT_MAVEN_URL;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Overrides the config directory (useful for testing)
pub const CONFIG_DIR_ENV: &str = "HYTALE_SOURCES_CONFIG_DIR";

/// Overrides `install.patchline`
pub const PATCHLINE_ENV: &str = "HYTALE_PATCHLINE";

/// User configuration file (`~/.hytale-sources/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local installation settings
    #[serde(default)]
    pub install: InstallConfig,

    /// Where the server artifact comes from
    #[serde(default)]
    pub dependency: DependencyConfig,

    /// Decompiler settings
    #[serde(default)]
    pub decompiler: DecompilerConfig,

    /// Cache and repository locations
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Hytale patchline (`release`, `pre-release`)
    #[serde(default = "default_patchline")]
    pub patchline: String,

    /// Hytale home directory; auto-detected when unset
    #[serde(default)]
    pub hytale_home: Option<PathBuf>,

    /// Explicit path to HytaleServer.jar
    #[serde(default)]
    pub server_jar: Option<PathBuf>,

    /// Explicit path to Assets.zip
    #[serde(default)]
    pub assets_zip: Option<PathBuf>,
}

fn default_patchline() -> String {
    "release".to_string()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            patchline: default_patchline(),
            hytale_home: None,
            server_jar: None,
            assets_zip: None,
        }
    }
}

/// Where the server jar is taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Download `com.hypixel.hytale:Server` from the patchline's Maven repository
    #[default]
    Maven,
    /// Copy HytaleServer.jar out of the local launcher install
    Local,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Maven => write!(f, "maven"),
            SourceMode::Local => write!(f, "local"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "maven" => Ok(SourceMode::Maven),
            "local" => Ok(SourceMode::Local),
            other => Err(Error::Other(format!(
                "Unknown mode '{}'. Use 'maven' or 'local'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// Version selector, e.g. `latest.release` or `2026.01.13`
    #[serde(default = "default_version")]
    pub version: String,

    /// Base URL; the patchline is appended as a path segment
    #[serde(default = "default_maven_url")]
    pub maven_url: String,
}

fn default_version() -> String {
    "latest.release".to_string()
}

fn default_maven_url() -> String {
    DEFAULT_MAVEN_URL.to_string()
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            version: default_version(),
            maven_url: default_maven_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompilerConfig {
    /// Download URL for the decompiler jar
    #[serde(default = "default_decompiler_url")]
    pub url: String,

    /// Java executable; JAVA_HOME or PATH when unset
    #[serde(default)]
    pub java_path: Option<PathBuf>,

    /// Package prefix to decompile
    #[serde(default = "default_only")]
    pub only: String,
}

fn default_decompiler_url() -> String {
    VINEFLOWER_URL.to_string()
}

fn default_only() -> String {
    DEFAULT_ONLY.to_string()
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            url: default_decompiler_url(),
            java_path: None,
            only: default_only(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Defaults to `<cache_dir>/repository`
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses HYTALE_SOURCES_CONFIG_DIR if set, otherwise ~/.hytale-sources/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".hytale-sources").join("config.toml"))
    }

    /// Load config from file, or use defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `HYTALE_PATCHLINE`: Overrides `install.patchline`
    /// - `HYTALE_SOURCES_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::default_path()?)?;

        if let Ok(patchline) = std::env::var(PATCHLINE_ENV) {
            if !patchline.is_empty() {
                config.install.patchline = patchline;
            }
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Cache directory, `<platform cache dir>/hytale-sources` by default
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.paths.cache_dir {
            return Ok(expand_path(dir));
        }
        dirs::cache_dir()
            .map(|d| d.join("hytale-sources"))
            .ok_or_else(|| Error::Other("Could not determine a cache directory".to_string()))
    }

    pub fn repo_dir(&self) -> Result<PathBuf> {
        match &self.paths.repo_dir {
            Some(dir) => Ok(expand_path(dir)),
            None => Ok(self.cache_dir()?.join("repository")),
        }
    }

    pub fn hytale_home(&self) -> Option<PathBuf> {
        self.install.hytale_home.as_deref().map(expand_path)
    }

    pub fn server_jar(&self) -> Option<PathBuf> {
        self.install.server_jar.as_deref().map(expand_path)
    }

    pub fn assets_zip(&self) -> Option<PathBuf> {
        self.install.assets_zip.as_deref().map(expand_path)
    }

    pub fn java_path(&self) -> Option<PathBuf> {
        self.decompiler.java_path.as_deref().map(expand_path)
    }

    /// Keys accepted by [`set`](Self::set)
    pub const KEYS: &'static [&'static str] = &[
        "install.patchline",
        "install.hytale_home",
        "install.server_jar",
        "install.assets_zip",
        "dependency.mode",
        "dependency.version",
        "dependency.maven_url",
        "decompiler.url",
        "decompiler.java_path",
        "decompiler.only",
        "paths.cache_dir",
        "paths.repo_dir",
    ];

    /// Set a value by dotted key. An empty value clears optional paths.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional_path = |value: &str| {
            if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        };

        match key {
            "install.patchline" => self.install.patchline = value.to_string(),
            "install.hytale_home" => self.install.hytale_home = optional_path(value),
            "install.server_jar" => self.install.server_jar = optional_path(value),
            "install.assets_zip" => self.install.assets_zip = optional_path(value),
            "dependency.mode" => self.dependency.mode = value.parse()?,
            "dependency.version" => self.dependency.version = value.to_string(),
            "dependency.maven_url" => self.dependency.maven_url = value.to_string(),
            "decompiler.url" => self.decompiler.url = value.to_string(),
            "decompiler.java_path" => self.decompiler.java_path = optional_path(value),
            "decompiler.only" => self.decompiler.only = value.to_string(),
            "paths.cache_dir" => self.paths.cache_dir = optional_path(value),
            "paths.repo_dir" => self.paths.repo_dir = optional_path(value),
            _ => return Err(Error::Other(format!("Unknown configuration key: {}", key))),
        }
        Ok(())
    }
}

/// Expand `~` and environment variables in a configured path
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
