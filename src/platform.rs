//! Platform detection and Hytale installation path resolution
//!
//! Every read of ambient host state (OS family, home directory, environment
//! variables, the Windows registry) goes through the [`PlatformQuery`] trait so
//! discovery can be exercised against fixed values in tests.
//!
//! # Examples
//!
//! ```no_run
//! use hytale_sources::platform::{resolve_installation, SystemPlatform};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let install = resolve_installation(&SystemPlatform, "release")?;
//! println!("Server jar: {}", install.server_jar().display());
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Registry key written by the Windows launcher
pub const WINDOWS_REGISTRY_KEY: &str = "SOFTWARE\\Hypixel Studios\\Hytale";

/// Registry value holding the install root
pub const WINDOWS_REGISTRY_VALUE: &str = "GameInstallPath";

/// Host operating system family, as far as installation discovery cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    MacOs,
    Unix,
    Other(String),
}

impl HostOs {
    /// Map an OS label (as found in `std::env::consts::OS`) to a family
    pub fn from_label(label: &str) -> Self {
        match label {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "solaris"
            | "illumos" => HostOs::Unix,
            other => HostOs::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Self::from_label(env::consts::OS)
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Windows => write!(f, "Windows"),
            HostOs::MacOs => write!(f, "macOS"),
            HostOs::Unix => write!(f, "Unix"),
            HostOs::Other(label) => write!(f, "{}", label),
        }
    }
}

/// Capability interface over ambient OS state
pub trait PlatformQuery {
    fn host_os(&self) -> HostOs;

    fn home_dir(&self) -> Option<PathBuf>;

    fn env_var(&self, key: &str) -> Option<String>;

    /// Read a string value below `HKEY_LOCAL_MACHINE`. Always `None` off Windows.
    fn registry_string(&self, key: &str, value: &str) -> Option<String>;
}

/// The real host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

impl PlatformQuery for SystemPlatform {
    fn host_os(&self) -> HostOs {
        HostOs::current()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn env_var(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn registry_string(&self, key: &str, value: &str) -> Option<String> {
        read_hklm_string(key, value)
    }
}

#[cfg(windows)]
fn read_hklm_string(key: &str, value: &str) -> Option<String> {
    use winreg::enums::*;
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let subkey = hklm.open_subkey(key).ok()?;
    subkey.get_value::<String, _>(value).ok()
}

#[cfg(not(windows))]
fn read_hklm_string(_key: &str, _value: &str) -> Option<String> {
    None
}

/// A local Hytale install for one patchline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub base_directory: PathBuf,
    pub patchline: String,
}

impl Installation {
    pub fn new(base_directory: impl Into<PathBuf>, patchline: impl Into<String>) -> Self {
        Self {
            base_directory: base_directory.into(),
            patchline: patchline.into(),
        }
    }

    /// `<base>/install/<patchline>/package/game/latest`
    pub fn install_directory(&self) -> PathBuf {
        self.base_directory
            .join("install")
            .join(&self.patchline)
            .join("package")
            .join("game")
            .join("latest")
    }

    pub fn server_jar(&self) -> PathBuf {
        self.install_directory()
            .join("Server")
            .join("HytaleServer.jar")
    }

    pub fn assets_zip(&self) -> PathBuf {
        self.install_directory().join("Assets.zip")
    }
}

/// Candidate Hytale home directory for the host, without checking it exists
pub fn hytale_home_candidate(query: &dyn PlatformQuery) -> Result<PathBuf> {
    let os = query.host_os();
    match os {
        HostOs::Windows => query
            .registry_string(WINDOWS_REGISTRY_KEY, WINDOWS_REGISTRY_VALUE)
            .map(PathBuf::from)
            .ok_or_else(|| Error::InstallationNotFound {
                path: PathBuf::from(format!(
                    "HKEY_LOCAL_MACHINE\\{}\\{}",
                    WINDOWS_REGISTRY_KEY, WINDOWS_REGISTRY_VALUE
                )),
            }),
        HostOs::MacOs => Ok(home(query)?
            .join("Library")
            .join("Application Support")
            .join("Hytale")),
        HostOs::Unix => Ok(home(query)?
            .join(".var/app/com.hypixel.HytaleLauncher/data/Hytale")),
        HostOs::Other(label) => Err(Error::UnsupportedPlatform(label)),
    }
}

fn home(query: &dyn PlatformQuery) -> Result<PathBuf> {
    query
        .home_dir()
        .or_else(|| query.env_var("HOME").map(PathBuf::from))
        .ok_or_else(|| Error::Other("Could not find home directory".to_string()))
}

/// Locate the Hytale home directory, failing if it is not on disk
pub fn detect_hytale_home(query: &dyn PlatformQuery) -> Result<PathBuf> {
    let base = hytale_home_candidate(query)?;
    if !base.is_dir() {
        return Err(Error::InstallationNotFound { path: base });
    }
    log::debug!("Detected Hytale home at {}", base.display());
    Ok(base)
}

/// Resolve the install for `patchline` using host discovery
pub fn resolve_installation(query: &dyn PlatformQuery, patchline: &str) -> Result<Installation> {
    let base = detect_hytale_home(query)?;
    Ok(Installation::new(base, patchline))
}

/// Resolve the install from an explicit home directory
pub fn installation_at(home: &Path, patchline: &str) -> Result<Installation> {
    if !home.is_dir() {
        return Err(Error::InstallationNotFound {
            path: home.to_path_buf(),
        });
    }
    Ok(Installation::new(home, patchline))
}

/// Fail with every missing path listed at once
pub fn verify_install_files(files: &[&Path]) -> Result<()> {
    let missing: Vec<PathBuf> = files
        .iter()
        .filter(|f| !f.exists())
        .map(|f| f.to_path_buf())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingInstallFiles(missing))
    }
}
