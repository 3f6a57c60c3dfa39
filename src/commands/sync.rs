use anyhow::{Context, Result};
use hytale_sources::{
    Config, HttpFetcher, LineSink, Pipeline, PipelineOptions, PipelineReport, SourceMode,
    SystemPlatform,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct SyncArgs {
    pub patchline: Option<String>,
    pub version: Option<String>,
    pub local: bool,
    pub cache_dir: Option<PathBuf>,
    pub repo_dir: Option<PathBuf>,
    pub json: bool,
}

/// Apply command-line overrides on top of the loaded configuration
fn options(config: &Config, args: &SyncArgs) -> Result<PipelineOptions> {
    let mut opts = PipelineOptions::from_config(config)?;

    if let Some(patchline) = &args.patchline {
        opts.patchline = patchline.clone();
    }
    if let Some(version) = &args.version {
        opts.version = version
            .parse()
            .with_context(|| format!("Invalid version selector '{}'", version))?;
    }
    if args.local {
        opts.mode = SourceMode::Local;
    }
    if let Some(dir) = &args.cache_dir {
        opts.cache_dir = dir.clone();
        // Follow the cache unless a repository was configured explicitly
        if config.paths.repo_dir.is_none() {
            opts.repo_dir = dir.join("repository");
        }
    }
    if let Some(dir) = &args.repo_dir {
        opts.repo_dir = dir.clone();
    }

    Ok(opts)
}

fn spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn run(args: SyncArgs) -> Result<()> {
    let config = Config::load()?;
    let opts = options(&config, &args)?;

    let progress = spinner(args.json);
    progress.set_message(format!(
        "Syncing {} server ({}, {})",
        opts.patchline, opts.mode, opts.version
    ));

    // Show the decompiler's latest line on the spinner; keep the full stream at debug
    let line_progress = progress.clone();
    let sink: LineSink = Arc::new(move |line: &str| {
        line_progress.set_message(line.to_string());
        log::debug!(target: "vineflower", "{}", line);
    });

    let fetcher = HttpFetcher::new()?;
    let mut pipeline = Pipeline::new(opts, &SystemPlatform, &fetcher, sink);
    let report = match pipeline.run() {
        Ok(report) => report,
        Err(e) => {
            progress.finish_and_clear();
            log::debug!("Sync stopped in state: {}", pipeline.state());
            return Err(e.into());
        }
    };
    progress.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("✓ Resolved {}", report.coordinates);
    if let Some(install) = &report.install_directory {
        println!("  Install:  {}", install.display());
    }

    if report.refreshed {
        println!("✓ Cached new server jar");
    } else {
        println!("✓ Cached server jar is up to date");
    }

    if report.decompiled {
        println!("✓ Decompiled sources");
    } else {
        println!("✓ Reused cached sources");
    }

    println!("✓ Published to {}", report.published.directory.display());
    println!();
    println!("  Jar:      {}", report.published.jar.display());
    println!("  Sources:  {}", report.published.sources.display());
    println!("  POM:      {}", report.published.pom.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use hytale_sources::VersionSelector;

    fn args() -> SyncArgs {
        SyncArgs {
            patchline: None,
            version: None,
            local: false,
            cache_dir: None,
            repo_dir: None,
            json: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.set("paths.cache_dir", "/tmp/configured").unwrap();

        let opts = options(
            &config,
            &SyncArgs {
                patchline: Some("pre-release".to_string()),
                version: Some("2026.01.13".to_string()),
                local: true,
                cache_dir: Some(PathBuf::from("/tmp/override")),
                ..args()
            },
        )
        .unwrap();

        assert_eq!(opts.patchline, "pre-release");
        assert_eq!(opts.version, VersionSelector::Exact("2026.01.13".to_string()));
        assert_eq!(opts.mode, SourceMode::Local);
        assert_eq!(opts.cache_dir, PathBuf::from("/tmp/override"));
        assert_eq!(opts.repo_dir, PathBuf::from("/tmp/override/repository"));
    }

    #[test]
    fn test_configured_repo_dir_survives_cache_override() {
        let mut config = Config::default();
        config.set("paths.repo_dir", "/srv/maven").unwrap();

        let opts = options(
            &config,
            &SyncArgs {
                cache_dir: Some(PathBuf::from("/tmp/override")),
                ..args()
            },
        )
        .unwrap();

        assert_eq!(opts.repo_dir, PathBuf::from("/srv/maven"));
    }

    #[test]
    fn test_rejects_empty_version() {
        let config = Config::default();
        let result = options(
            &config,
            &SyncArgs {
                version: Some(" ".to_string()),
                ..args()
            },
        );
        assert!(result.is_err());
    }
}
