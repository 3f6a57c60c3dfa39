//! End-to-end sync: locate the server jar, refresh the cache, decompile if
//! needed, publish the result.
//!
//! One run walks `Unresolved → InstallationResolved → CacheChecked → [ToolEnsured
//! → Decompiled] → Published`. Any error aborts the run and the next one starts
//! again from the beginning. Runs sharing a cache directory are serialized with
//! an advisory lock on `<cache_dir>/.lock`.

use crate::cache::{ArtifactCache, SERVER_JAR, SOURCES_JAR};
use crate::config::{Config, SourceMode};
use crate::decompiler::{find_java, Decompiler, DecompilerTool, LineSink, ToolFetcher};
use crate::maven::{checked_version, MavenRepository, VersionSelector};
use crate::platform::{self, Installation, PlatformQuery};
use crate::repository::{
    ArtifactCoordinates, Descriptor, LocalRepository, PublishedArtifact, DEFAULT_GROUP,
    DEFAULT_NAME,
};
use crate::Result;
use fs4::FileExt;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".lock";

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Unresolved,
    InstallationResolved,
    CacheChecked { fresh: bool },
    ToolEnsured,
    Decompiled,
    Published,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Unresolved => write!(f, "unresolved"),
            PipelineState::InstallationResolved => write!(f, "installation resolved"),
            PipelineState::CacheChecked { fresh: true } => write!(f, "cache checked (fresh)"),
            PipelineState::CacheChecked { fresh: false } => write!(f, "cache checked (stale)"),
            PipelineState::ToolEnsured => write!(f, "decompiler ready"),
            PipelineState::Decompiled => write!(f, "decompiled"),
            PipelineState::Published => write!(f, "published"),
        }
    }
}

/// Everything a run needs, resolved from [`Config`] plus CLI overrides
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: SourceMode,
    pub patchline: String,
    pub version: VersionSelector,
    pub maven_url: String,
    pub hytale_home: Option<PathBuf>,
    pub server_jar: Option<PathBuf>,
    pub assets_zip: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub tool: DecompilerTool,
    pub java_path: Option<PathBuf>,
    pub only: String,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            mode: config.dependency.mode,
            patchline: config.install.patchline.clone(),
            version: config.dependency.version.parse()?,
            maven_url: config.dependency.maven_url.clone(),
            hytale_home: config.hytale_home(),
            server_jar: config.server_jar(),
            assets_zip: config.assets_zip(),
            cache_dir: config.cache_dir()?,
            repo_dir: config.repo_dir()?,
            tool: DecompilerTool::with_url(config.decompiler.url.clone()),
            java_path: config.java_path(),
            only: config.decompiler.only.clone(),
        })
    }
}

/// Where the binary for this run came from
#[derive(Debug, Clone)]
pub struct ResolvedBinary {
    pub coordinates: ArtifactCoordinates,
    pub jar: PathBuf,
    pub descriptor: Descriptor,
    pub installation: Option<Installation>,
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub coordinates: ArtifactCoordinates,
    pub install_directory: Option<PathBuf>,
    pub cached_jar: PathBuf,
    pub sources_jar: PathBuf,
    pub refreshed: bool,
    pub decompiled: bool,
    pub published: PublishedArtifact,
}

/// Server jar paths for a local install, honoring explicit overrides
pub fn local_files(
    opts: &PipelineOptions,
    query: &dyn PlatformQuery,
) -> Result<(Option<Installation>, PathBuf, PathBuf)> {
    let installation = match (&opts.server_jar, &opts.assets_zip, &opts.hytale_home) {
        (Some(_), Some(_), _) => None,
        (_, _, Some(home)) => Some(platform::installation_at(home, &opts.patchline)?),
        _ => Some(platform::resolve_installation(query, &opts.patchline)?),
    };

    let server_jar = opts
        .server_jar
        .clone()
        .or_else(|| installation.as_ref().map(Installation::server_jar))
        .unwrap_or_default();
    let assets_zip = opts
        .assets_zip
        .clone()
        .or_else(|| installation.as_ref().map(Installation::assets_zip))
        .unwrap_or_default();

    Ok((installation, server_jar, assets_zip))
}

/// Version recorded for a jar copied out of a local install.
///
/// Dynamic selectors cannot be resolved without the remote repository, so
/// they map to `local-<patchline>`.
pub fn local_version(selector: &VersionSelector, patchline: &str) -> String {
    match selector {
        VersionSelector::Exact(v) => v.clone(),
        _ => format!("local-{}", patchline),
    }
}

pub struct Pipeline<'a> {
    opts: PipelineOptions,
    query: &'a dyn PlatformQuery,
    fetcher: &'a dyn ToolFetcher,
    sink: LineSink,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        opts: PipelineOptions,
        query: &'a dyn PlatformQuery,
        fetcher: &'a dyn ToolFetcher,
        sink: LineSink,
    ) -> Self {
        Self {
            opts,
            query,
            fetcher,
            sink,
            state: PipelineState::Unresolved,
            history: vec![PipelineState::Unresolved],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state this run has passed through, in order
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn advance(&mut self, next: PipelineState) {
        log::info!("Pipeline: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn lock(&self) -> Result<File> {
        fs::create_dir_all(&self.opts.cache_dir)?;
        let path = self.opts.cache_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        log::debug!("Waiting for lock on {}", path.display());
        file.lock_exclusive()?;
        Ok(file)
    }

    /// Locate the server jar for the configured mode
    pub fn resolve_binary(&self) -> Result<ResolvedBinary> {
        match self.opts.mode {
            SourceMode::Local => {
                let (installation, server_jar, assets_zip) =
                    local_files(&self.opts, self.query)?;
                platform::verify_install_files(&[server_jar.as_path(), assets_zip.as_path()])?;
                let version = checked_version(
                    DEFAULT_GROUP,
                    DEFAULT_NAME,
                    local_version(&self.opts.version, &self.opts.patchline),
                )?;

                Ok(ResolvedBinary {
                    coordinates: ArtifactCoordinates::new(DEFAULT_GROUP, DEFAULT_NAME, version),
                    jar: server_jar,
                    descriptor: Descriptor::Generated,
                    installation,
                })
            }
            SourceMode::Maven => {
                let remote =
                    MavenRepository::for_patchline(&self.opts.maven_url, &self.opts.patchline)?;
                let version =
                    remote.resolve_version(DEFAULT_GROUP, DEFAULT_NAME, &self.opts.version)?;
                let coordinates = ArtifactCoordinates::server(version);

                let mirror = self.opts.cache_dir.join("maven");
                let jar = remote.fetch(&coordinates, ".jar", &mirror)?;
                let pom = remote.fetch(&coordinates, ".pom", &mirror)?;

                Ok(ResolvedBinary {
                    coordinates,
                    jar,
                    descriptor: Descriptor::Retrieved(pom),
                    installation: None,
                })
            }
        }
    }

    /// Run to completion, holding the cache lock throughout
    pub fn run(&mut self) -> Result<PipelineReport> {
        let _lock = self.lock()?;

        let resolved = self.resolve_binary()?;
        self.advance(PipelineState::InstallationResolved);

        let cache = ArtifactCache::new(&self.opts.cache_dir);
        let refresh = cache.refresh_if_stale(&resolved.jar)?;
        self.advance(PipelineState::CacheChecked {
            fresh: !refresh.changed,
        });

        let decompiled = refresh.changed || cache.needs_sources();
        if decompiled {
            self.generate_sources(cache.dir())?;
        } else {
            log::info!("Using cached sources");
        }

        let repository = LocalRepository::new(&self.opts.repo_dir);
        let published = repository.publish(
            &resolved.coordinates,
            &refresh.cached_path,
            &cache.sources_jar(),
            &resolved.descriptor,
        )?;
        self.advance(PipelineState::Published);

        Ok(PipelineReport {
            coordinates: resolved.coordinates,
            install_directory: resolved
                .installation
                .as_ref()
                .map(Installation::install_directory),
            cached_jar: refresh.cached_path,
            sources_jar: cache.sources_jar(),
            refreshed: refresh.changed,
            decompiled,
            published,
        })
    }

    fn generate_sources(&mut self, cache_dir: &Path) -> Result<()> {
        let tool = self.opts.tool.ensure(cache_dir, self.fetcher)?;
        self.advance(PipelineState::ToolEnsured);

        let java = find_java(self.opts.java_path.as_deref(), self.query)?;
        Decompiler::java(java, &tool)?
            .only(self.opts.only.clone())
            .decompile(cache_dir, SERVER_JAR, SOURCES_JAR, &self.sink)?;
        self.advance(PipelineState::Decompiled);
        Ok(())
    }
}
