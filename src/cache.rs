//! Cached copy of the server jar and the artifacts derived from it
//!
//! The cache directory holds one copy of `HytaleServer.jar`. Freshness is decided
//! by comparing it byte-for-byte against the installed jar; whenever the copy is
//! replaced, the generated `HytaleServer-sources.jar` is deleted with it, so a
//! sources jar never describes a binary that is no longer cached.

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SERVER_JAR: &str = "HytaleServer.jar";
pub const SOURCES_JAR: &str = "HytaleServer-sources.jar";

const COMPARE_CHUNK: usize = 64 * 1024;

/// Outcome of [`ArtifactCache::refresh_if_stale`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRefresh {
    pub cached_path: PathBuf,
    /// True when the cached copy was (re)written and derived artifacts dropped
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub file_count: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cached_jar(&self) -> PathBuf {
        self.dir.join(SERVER_JAR)
    }

    pub fn sources_jar(&self) -> PathBuf {
        self.dir.join(SOURCES_JAR)
    }

    /// Whether the derived sources jar has to be (re)generated
    pub fn needs_sources(&self) -> bool {
        !self.sources_jar().exists()
    }

    /// Bring the cached jar in line with `source`.
    ///
    /// Copies `source` over the cached jar and deletes the generated sources jar
    /// when the cached copy is missing or differs in any byte (or in length).
    pub fn refresh_if_stale(&self, source: &Path) -> Result<CacheRefresh> {
        let cached_path = self.cached_jar();

        if cached_path.exists() && files_match(source, &cached_path)? {
            log::debug!("Cached {} is up to date", cached_path.display());
            return Ok(CacheRefresh {
                cached_path,
                changed: false,
            });
        }

        log::info!(
            "New server version detected, refreshing {}",
            cached_path.display()
        );

        fs::create_dir_all(&self.dir).map_err(cache_io(&self.dir))?;
        let mut reader = File::open(source).map_err(cache_io(source))?;
        let mut writer = File::create(&cached_path).map_err(cache_io(&cached_path))?;
        io::copy(&mut reader, &mut writer).map_err(cache_io(&cached_path))?;

        let sources = self.sources_jar();
        if sources.exists() {
            fs::remove_file(&sources).map_err(cache_io(&sources))?;
            log::debug!("Removed stale {}", sources.display());
        }

        Ok(CacheRefresh {
            cached_path,
            changed: true,
        })
    }

    /// Count files and bytes below the cache directory
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.dir.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.dir) {
            let entry = entry.map_err(|e| Error::Other(e.to_string()))?;
            if entry.file_type().is_file() {
                stats.file_count += 1;
                stats.total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(stats)
    }

    /// Paths [`clean`](Self::clean) would delete
    pub fn clean_targets(&self, all: bool) -> Vec<PathBuf> {
        if all {
            return if self.dir.exists() {
                vec![self.dir.clone()]
            } else {
                Vec::new()
            };
        }

        [self.cached_jar(), self.sources_jar()]
            .into_iter()
            .filter(|p| p.exists())
            .collect()
    }

    /// Delete the cached jar and sources jar, or the whole directory with `all`.
    ///
    /// The decompiler jar, downloaded Maven artifacts and the published
    /// repository survive unless `all` is set.
    pub fn clean(&self, all: bool) -> Result<Vec<PathBuf>> {
        let targets = self.clean_targets(all);
        for target in &targets {
            if target.is_dir() {
                fs::remove_dir_all(target)?;
            } else {
                fs::remove_file(target)?;
            }
        }
        Ok(targets)
    }
}

/// Byte-for-byte comparison of two files, streaming both in chunks
pub fn files_match(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::metadata(a).map_err(cache_io(a))?;
    let meta_b = fs::metadata(b).map_err(cache_io(b))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).map_err(cache_io(a))?);
    let mut reader_b = BufReader::new(File::open(b).map_err(cache_io(b))?);
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let read = read_full(&mut reader_a, &mut buf_a).map_err(cache_io(a))?;
        if read == 0 {
            // Length already matched; b must be exhausted too
            return Ok(read_full(&mut reader_b, &mut buf_b[..1]).map_err(cache_io(b))? == 0);
        }
        if read_full(&mut reader_b, &mut buf_b[..read]).map_err(cache_io(b))? != read {
            return Ok(false);
        }
        if buf_a[..read] != buf_b[..read] {
            return Ok(false);
        }
    }
}

fn cache_io(path: &Path) -> impl FnOnce(io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::CacheIo { path, source }
}

// Fill as much of `buf` as the reader allows
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
