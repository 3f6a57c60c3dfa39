//! Maven-layout publishing of the server jar and its sources
//!
//! Each publish writes the full triple (`.jar`, `-sources.jar`, `.pom`) under
//! `<root>/<group path>/<name>/<version>/`, overwriting whatever was there.
//! There is no rollback: if a copy fails midway the directory may hold a mix of
//! old and new files until the next successful publish.
//!
//! # Examples
//!
//! ```
//! use hytale_sources::repository::ArtifactCoordinates;
//!
//! let coords: ArtifactCoordinates = "com.example:Server:1.0.0".parse().unwrap();
//! assert_eq!(coords.jar_file_name(), "Server-1.0.0.jar");
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_GROUP: &str = "com.hypixel.hytale";
pub const DEFAULT_NAME: &str = "Server";

/// `group:name:version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCoordinates {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ArtifactCoordinates {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// The Hytale server artifact at `version`
    pub fn server(version: impl Into<String>) -> Self {
        Self::new(DEFAULT_GROUP, DEFAULT_NAME, version)
    }

    /// `<group with dots as separators>/<name>`
    pub fn module_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.name);
        path
    }

    /// `<module path>/<version>`
    pub fn version_path(&self) -> PathBuf {
        self.module_path().join(&self.version)
    }

    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}-{}{}", self.name, self.version, suffix)
    }

    pub fn jar_file_name(&self) -> String {
        self.file_name(".jar")
    }

    pub fn sources_file_name(&self) -> String {
        self.file_name("-sources.jar")
    }

    pub fn pom_file_name(&self) -> String {
        self.file_name(".pom")
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl FromStr for ArtifactCoordinates {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, name, version]
                if !group.is_empty() && !name.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *name, *version))
            }
            _ => Err(Error::InvalidCoordinates(s.to_string())),
        }
    }
}

/// Where the `.pom` for a publish comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// A descriptor fetched alongside the jar
    Retrieved(PathBuf),
    /// Write a minimal POM naming the coordinates
    Generated,
}

/// Minimal POM for artifacts that come without one
pub fn minimal_pom(coords: &ArtifactCoordinates) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  <packaging>jar</packaging>
</project>
"#,
        coords.group, coords.name, coords.version
    )
}

/// The three files of one published version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    pub coordinates: ArtifactCoordinates,
    pub directory: PathBuf,
    pub jar: PathBuf,
    pub sources: PathBuf,
    pub pom: PathBuf,
}

/// A directory laid out like a Maven repository
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, coords: &ArtifactCoordinates) -> PathBuf {
        self.root.join(coords.version_path())
    }

    /// Copy `binary`, `sources` and the descriptor into the layout for `coords`
    pub fn publish(
        &self,
        coords: &ArtifactCoordinates,
        binary: &Path,
        sources: &Path,
        descriptor: &Descriptor,
    ) -> Result<PublishedArtifact> {
        let directory = self.version_dir(coords);
        fs::create_dir_all(&directory).map_err(|source| Error::PublishIo {
            path: directory.clone(),
            source,
        })?;

        let jar = directory.join(coords.jar_file_name());
        let sources_jar = directory.join(coords.sources_file_name());
        let pom = directory.join(coords.pom_file_name());

        copy_over(binary, &jar)?;
        copy_over(sources, &sources_jar)?;

        match descriptor {
            Descriptor::Retrieved(path) => copy_over(path, &pom)?,
            Descriptor::Generated => {
                fs::write(&pom, minimal_pom(coords)).map_err(|source| Error::PublishIo {
                    path: pom.clone(),
                    source,
                })?
            }
        }

        log::info!("Published {} to {}", coords, directory.display());

        Ok(PublishedArtifact {
            coordinates: coords.clone(),
            directory,
            jar,
            sources: sources_jar,
            pom,
        })
    }
}

/// Publish into `repo_root` without holding on to a [`LocalRepository`]
pub fn publish(
    repo_root: &Path,
    coords: &ArtifactCoordinates,
    binary: &Path,
    sources: &Path,
    descriptor: &Descriptor,
) -> Result<PublishedArtifact> {
    LocalRepository::new(repo_root).publish(coords, binary, sources, descriptor)
}

/// Copy `from` to `to`, blaming whichever side actually failed
fn copy_over(from: &Path, to: &Path) -> Result<()> {
    let publish_io = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| Error::PublishIo { path, source }
    };

    let mut reader = fs::File::open(from).map_err(publish_io(from))?;
    let mut writer = fs::File::create(to).map_err(publish_io(to))?;
    io::copy(&mut reader, &mut writer).map_err(publish_io(to))?;
    Ok(())
}
