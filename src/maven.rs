//! Remote Maven repository access for the published server artifact
//!
//! Hytale publishes `com.hypixel.hytale:Server` to one repository per patchline
//! (`https://maven.hytale.com/<patchline>`). Dynamic selectors such as
//! `latest.release` are resolved through `maven-metadata.xml`; concrete versions
//! are fetched once into a local mirror directory and reused afterwards.

use crate::repository::ArtifactCoordinates;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAVEN_URL: &str = "https://maven.hytale.com";

/// Which version of the artifact to depend on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// `latest.release`
    LatestRelease,
    /// `latest.integration` or `latest`
    LatestIntegration,
    Exact(String),
}

impl VersionSelector {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, VersionSelector::Exact(_))
    }
}

impl FromStr for VersionSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(Error::Other("Empty version selector".to_string())),
            "latest.release" => Ok(VersionSelector::LatestRelease),
            "latest.integration" | "latest" => Ok(VersionSelector::LatestIntegration),
            exact => Ok(VersionSelector::Exact(exact.to_string())),
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSelector::LatestRelease => write!(f, "latest.release"),
            VersionSelector::LatestIntegration => write!(f, "latest.integration"),
            VersionSelector::Exact(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: Versioning,
}

#[derive(Debug, Default, Deserialize)]
struct Versioning {
    #[serde(default)]
    latest: Option<String>,
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    versions: Option<VersionList>,
}

#[derive(Debug, Default, Deserialize)]
struct VersionList {
    #[serde(default)]
    version: Vec<String>,
}

impl Versioning {
    fn newest_listed(&self) -> Option<String> {
        self.versions
            .as_ref()
            .and_then(|list| list.version.last().cloned())
    }

    fn select(&self, selector: &VersionSelector) -> Option<String> {
        match selector {
            VersionSelector::LatestRelease => self
                .release
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| self.newest_listed()),
            VersionSelector::LatestIntegration => self
                .latest
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| self.newest_listed()),
            VersionSelector::Exact(v) => Some(v.clone()),
        }
    }
}

/// A remote Maven repository
pub struct MavenRepository {
    base: Url,
    client: reqwest::blocking::Client,
}

impl MavenRepository {
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| Error::Other(format!("Invalid Maven URL '{}': {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("hytale-sources/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self { base, client })
    }

    /// `<base_url>/<patchline>`
    pub fn for_patchline(base_url: &str, patchline: &str) -> Result<Self> {
        Self::new(&format!("{}/{}", base_url.trim_end_matches('/'), patchline))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url_for(&self, relative: &Path) -> Result<Url> {
        let relative = relative
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        self.base
            .join(&relative)
            .map_err(|e| Error::Other(format!("Invalid artifact path '{}': {}", relative, e)))
    }

    fn get(&self, url: &Url) -> Result<reqwest::blocking::Response> {
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ArtifactNotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Other(format!(
                "Request to {} failed: HTTP {}",
                url,
                status.as_u16()
            )));
        }
        Ok(response)
    }

    /// Turn `selector` into a concrete version for `group:name`
    pub fn resolve_version(
        &self,
        group: &str,
        name: &str,
        selector: &VersionSelector,
    ) -> Result<String> {
        if let VersionSelector::Exact(v) = selector {
            return checked_version(group, name, v.clone());
        }

        let module = ArtifactCoordinates::new(group, name, "").module_path();
        let url = self.url_for(&module.join("maven-metadata.xml"))?;
        log::debug!("Resolving {} from {}", selector, url);

        let body = self.get(&url)?.text()?;
        let metadata: MavenMetadata = serde_xml_rs::from_str(&body)?;

        let version = metadata.versioning.select(selector).ok_or_else(|| {
            Error::Other(format!(
                "No version of {}:{} matches {} (metadata at {})",
                group, name, selector, url
            ))
        })?;

        let version = checked_version(group, name, version)?;
        log::info!("Resolved {}:{}:{} to {}", group, name, selector, version);
        Ok(version)
    }

    /// Download `<name>-<version><suffix>` into `mirror_dir`, reusing an existing copy
    pub fn fetch(
        &self,
        coords: &ArtifactCoordinates,
        suffix: &str,
        mirror_dir: &Path,
    ) -> Result<PathBuf> {
        let relative = coords.version_path().join(coords.file_name(suffix));
        let dest = mirror_dir.join(&relative);
        if dest.exists() {
            log::debug!("Using mirrored {}", dest.display());
            return Ok(dest);
        }

        let url = self.url_for(&relative)?;
        log::info!("Downloading {}", url);

        let mut response = self.get(&url)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = dest.with_file_name(format!("{}.part", coords.file_name(suffix)));
        let written = File::create(&partial)
            .map_err(Error::from)
            .and_then(|mut file| response.copy_to(&mut file).map_err(Error::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, &dest)?;

        Ok(dest)
    }
}

/// Versions become path segments of both URLs and the local repository
pub fn checked_version(group: &str, name: &str, version: String) -> Result<String> {
    let trimmed = version.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains(['/', '\\'])
        || trimmed.contains("..")
    {
        return Err(Error::InvalidCoordinates(format!(
            "{}:{}:{}",
            group, name, version
        )));
    }
    Ok(trimmed.to_string())
}
