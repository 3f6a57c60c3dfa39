//! Cache management commands
//!
//! - `cache path` - Show the cache location
//! - `cache info` - Show what is cached and how big it is
//! - `cache clean` - Remove the cached server jar and sources

use anyhow::Result;
use hytale_sources::decompiler::TOOL_FILE_NAME;
use hytale_sources::{ArtifactCache, Config};
use std::path::Path;
use walkdir::WalkDir;

/// Format bytes as human-readable size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Size of a file, or of everything below a directory
fn path_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn open_cache() -> Result<ArtifactCache> {
    let config = Config::load()?;
    Ok(ArtifactCache::new(config.cache_dir()?))
}

/// Show cache location
pub fn run_path() -> Result<()> {
    let cache = open_cache()?;
    println!("{}", cache.dir().display());
    Ok(())
}

/// Show cache contents and statistics
pub fn run_info() -> Result<()> {
    let config = Config::load()?;
    let cache = ArtifactCache::new(config.cache_dir()?);
    let stats = cache.stats()?;

    println!("Cache Information");
    println!("=================");
    println!();
    println!("Location:    {}", cache.dir().display());
    println!("Files:       {}", stats.file_count);
    println!("Total size:  {}", format_size(stats.total_size));
    println!();

    let entries = [
        ("Server jar", cache.cached_jar()),
        ("Sources jar", cache.sources_jar()),
        ("Decompiler", cache.dir().join(TOOL_FILE_NAME)),
        ("Maven mirror", cache.dir().join("maven")),
        ("Repository", config.repo_dir()?),
    ];

    for (label, path) in &entries {
        if path.exists() {
            println!("  ✓ {:<13} {:>10}  {}", label, format_size(path_size(path)), path.display());
        } else {
            println!("  - {:<13} {:>10}  {}", label, "-", path.display());
        }
    }

    if cache.cached_jar().exists() && cache.needs_sources() {
        println!();
        println!("Sources are missing; run `hytale-sources sync` to regenerate them.");
    }

    Ok(())
}

/// Remove cached artifacts
pub fn run_clean(all: bool, dry_run: bool) -> Result<()> {
    let cache = open_cache()?;
    let targets = cache.clean_targets(all);

    if targets.is_empty() {
        println!("Nothing to clean in {}", cache.dir().display());
        return Ok(());
    }

    let freed: u64 = targets.iter().map(|p| path_size(p)).sum();

    if dry_run {
        for target in &targets {
            println!("[DRY RUN] Would remove {}", target.display());
        }
        println!();
        println!("Would free {}", format_size(freed));
        return Ok(());
    }

    let removed = cache.clean(all)?;
    for path in &removed {
        println!("  ✓ Removed {}", path.display());
    }
    println!();
    println!("Removed {} entries, freed {}", removed.len(), format_size(freed));

    Ok(())
}
