//! Doctor command - diagnose setup issues
//!
//! Checks:
//! - Configuration validity
//! - Hytale installation and server files
//! - Java runtime
//! - Decompiler download
//! - Cache health

use anyhow::Result;
use hytale_sources::decompiler::find_java;
use hytale_sources::pipeline::local_files;
use hytale_sources::{
    ArtifactCache, Config, DecompilerTool, HttpFetcher, PipelineOptions, SourceMode,
    SystemPlatform,
};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// Status of a check
#[derive(Debug)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "\x1b[32m",      // Green
            CheckStatus::Warning => "\x1b[33m", // Yellow
            CheckStatus::Error => "\x1b[31m",   // Red
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    details: Option<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            details: None,
        }
    }

    fn with_details(mut self, details: &str) -> Self {
        self.details = Some(details.to_string());
        self
    }

    fn print(&self, verbose: bool) {
        let reset = "\x1b[0m";
        println!(
            "  {}{}{} {} - {}",
            self.status.color_code(),
            self.status.symbol(),
            reset,
            self.name,
            self.message
        );
        if verbose {
            if let Some(ref details) = self.details {
                for line in details.lines() {
                    println!("      {}", line);
                }
            }
        }
    }
}

type Fix = Box<dyn FnOnce() -> Result<String>>;

pub fn run(verbose: bool, fix: bool) -> Result<()> {
    println!("hytale-sources Doctor");
    println!("=====================");
    println!();
    println!("Checking your setup...");
    println!();

    let mut results = Vec::new();
    let mut fixable_issues: Vec<(&str, Fix)> = Vec::new();

    let options = Config::load()
        .map_err(anyhow::Error::from)
        .and_then(|c| Ok(PipelineOptions::from_config(&c)?));

    results.push(check_config(&options));

    if let Ok(opts) = &options {
        results.push(check_installation(opts));
        results.push(check_java(opts));

        let (tool_result, tool_fix) = check_decompiler(opts);
        results.push(tool_result);
        if let Some(fix_fn) = tool_fix {
            fixable_issues.push(("Download decompiler", fix_fn));
        }

        let (cache_result, cache_fix) = check_cache(opts);
        results.push(cache_result);
        if let Some(fix_fn) = cache_fix {
            fixable_issues.push(("Remove partial downloads", fix_fn));
        }
    }

    println!("Results:");
    println!();
    for result in &results {
        result.print(verbose);
    }

    let ok_count = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Ok))
        .count();
    let warn_count = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Warning))
        .count();
    let error_count = results
        .iter()
        .filter(|r| matches!(r.status, CheckStatus::Error))
        .count();

    println!();
    println!(
        "Summary: {} passed, {} warnings, {} errors",
        ok_count, warn_count, error_count
    );

    if !fixable_issues.is_empty() {
        println!();
        if fix {
            println!("Applying fixes...");
            println!();
            for (name, fix_fn) in fixable_issues {
                print!("  Fixing: {}... ", name);
                match fix_fn() {
                    Ok(msg) => println!("{}", msg),
                    Err(e) => println!("Failed: {}", e),
                }
            }
        } else {
            println!("Some issues can be fixed automatically. Run with --fix to apply:");
            for (name, _) in &fixable_issues {
                println!("  - {}", name);
            }
        }
    }

    println!();

    if error_count > 0 {
        println!("Some checks failed. See above for details.");
        if !verbose {
            println!("Run with --verbose for more information.");
        }
    } else if warn_count > 0 {
        println!("All critical checks passed, but there are some warnings.");
    } else {
        println!("All checks passed! Your setup looks good.");
    }

    Ok(())
}

fn check_config(options: &Result<PipelineOptions>) -> CheckResult {
    match options {
        Ok(opts) => {
            let details = format!(
                "Config file: {}\nMode: {}\nPatchline: {}\nVersion: {}\nMaven URL: {}",
                Config::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "unknown".to_string()),
                opts.mode,
                opts.patchline,
                opts.version,
                opts.maven_url
            );
            CheckResult::new(
                "Configuration",
                CheckStatus::Ok,
                "Valid configuration loaded",
            )
            .with_details(&details)
        }
        Err(e) => CheckResult::new(
            "Configuration",
            CheckStatus::Error,
            &format!("Failed to load: {}", e),
        ),
    }
}

fn check_installation(opts: &PipelineOptions) -> CheckResult {
    // Maven mode only needs the install for `locate`, so a missing one is a warning
    let missing_status = || match opts.mode {
        SourceMode::Local => CheckStatus::Error,
        SourceMode::Maven => CheckStatus::Warning,
    };

    let (installation, server_jar, assets_zip) = match local_files(opts, &SystemPlatform) {
        Ok(found) => found,
        Err(e) => {
            let first_line = e.to_string().lines().next().unwrap_or_default().to_string();
            return CheckResult::new("Installation", missing_status(), &first_line)
                .with_details(&e.to_string());
        }
    };

    let mut details = String::new();
    if let Some(install) = &installation {
        details.push_str(&format!("Install: {}\n", install.install_directory().display()));
    }
    details.push_str(&format!("Server jar: {}\nAssets: {}", server_jar.display(), assets_zip.display()));

    let missing: Vec<&PathBuf> = [&server_jar, &assets_zip]
        .into_iter()
        .filter(|p| !p.is_file())
        .collect();

    if missing.is_empty() {
        CheckResult::new(
            "Installation",
            CheckStatus::Ok,
            &format!("Found {} install", opts.patchline),
        )
        .with_details(&details)
    } else {
        CheckResult::new(
            "Installation",
            missing_status(),
            &format!("{} file(s) missing from the {} install", missing.len(), opts.patchline),
        )
        .with_details(&details)
    }
}

fn check_java(opts: &PipelineOptions) -> CheckResult {
    let java = match find_java(opts.java_path.as_deref(), &SystemPlatform) {
        Ok(java) => java,
        Err(e) => {
            return CheckResult::new("Java", CheckStatus::Error, "No Java runtime found")
                .with_details(&e.to_string())
        }
    };

    // `java -version` prints to stderr
    match Command::new(&java).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let banner = String::from_utf8_lossy(&output.stderr);
            let first = banner.lines().next().unwrap_or("unknown version").to_string();
            CheckResult::new("Java", CheckStatus::Ok, &first)
                .with_details(&format!("Executable: {}", java.display()))
        }
        Ok(output) => CheckResult::new(
            "Java",
            CheckStatus::Error,
            &format!("{} -version exited with {}", java.display(), output.status),
        ),
        Err(e) => CheckResult::new(
            "Java",
            CheckStatus::Error,
            &format!("Failed to run {}: {}", java.display(), e),
        ),
    }
}

fn check_decompiler(opts: &PipelineOptions) -> (CheckResult, Option<Fix>) {
    let tool_path = opts.tool.path_in(&opts.cache_dir);
    if tool_path.is_file() {
        return (
            CheckResult::new("Decompiler", CheckStatus::Ok, "Downloaded")
                .with_details(&format!("Path: {}\nURL: {}", tool_path.display(), opts.tool.url)),
            None,
        );
    }

    let tool: DecompilerTool = opts.tool.clone();
    let cache_dir = opts.cache_dir.clone();
    let fix: Fix = Box::new(move || {
        let fetcher = HttpFetcher::new()?;
        let path = tool.ensure(&cache_dir, &fetcher)?;
        Ok(format!("Saved to {}", path.display()))
    });

    (
        CheckResult::new(
            "Decompiler",
            CheckStatus::Warning,
            "Not downloaded yet (fetched on the next sync)",
        )
        .with_details(&format!("URL: {}", opts.tool.url)),
        Some(fix),
    )
}

fn check_cache(opts: &PipelineOptions) -> (CheckResult, Option<Fix>) {
    let cache = ArtifactCache::new(&opts.cache_dir);
    let stats = match cache.stats() {
        Ok(stats) => stats,
        Err(e) => {
            return (
                CheckResult::new("Cache", CheckStatus::Error, &format!("Failed to read: {}", e)),
                None,
            )
        }
    };

    let partials: Vec<PathBuf> = walkdir::WalkDir::new(cache.dir())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "part"))
        .collect();

    let details = format!(
        "Location: {}\nFiles: {}\nTotal size: {:.2} MB\nRepository: {}",
        cache.dir().display(),
        stats.file_count,
        stats.total_size as f64 / 1024.0 / 1024.0,
        opts.repo_dir.display()
    );

    if !partials.is_empty() {
        let count = partials.len();
        let fix: Fix = Box::new(move || {
            let removed = partials
                .iter()
                .filter(|p| fs::remove_file(p).is_ok())
                .count();
            Ok(format!("Removed {} partial downloads", removed))
        });
        return (
            CheckResult::new(
                "Cache",
                CheckStatus::Warning,
                &format!("{} interrupted download(s) left behind", count),
            )
            .with_details(&details),
            Some(fix),
        );
    }

    let status_message = if !cache.cached_jar().exists() {
        "Empty - run `hytale-sources sync`".to_string()
    } else if cache.needs_sources() {
        "Server jar cached, sources missing".to_string()
    } else {
        "Server jar and sources cached".to_string()
    };

    (
        CheckResult::new("Cache", CheckStatus::Ok, &status_message).with_details(&details),
        None,
    )
}
