use anyhow::Result;
use hytale_sources::Config;
use std::path::Path;

const BOX_WIDTH: usize = 78;

pub fn run(action: &crate::ConfigAction) -> Result<()> {
    use crate::ConfigAction;

    match action {
        ConfigAction::Show => show_config(),
        ConfigAction::Set { key, value } => set_config(key, value),
    }
}

fn section(title: &str, rows: &[(&str, String)]) {
    let header = format!("┌─ {} ", title);
    println!(
        "{}{}┐",
        header,
        "─".repeat((BOX_WIDTH + 1).saturating_sub(header.chars().count()))
    );
    println!("│{}│", " ".repeat(BOX_WIDTH));
    for (label, value) in rows {
        let line = format!("  {:<16}{}", label, value);
        println!(
            "│{}{}│",
            line,
            " ".repeat(BOX_WIDTH.saturating_sub(line.chars().count()))
        );
    }
    println!("│{}│", " ".repeat(BOX_WIDTH));
    println!("└{}┘", "─".repeat(BOX_WIDTH));
    println!();
}

fn format_path(path: Option<&Path>, unset: &str) -> String {
    match path {
        Some(p) => truncate(&p.display().to_string(), 58),
        None => unset.to_string(),
    }
}

/// Keep the tail of `value`, which is the informative end of a path or URL
fn truncate(value: &str, max_len: usize) -> String {
    let len = value.chars().count();
    if len <= max_len {
        value.to_string()
    } else {
        let tail: String = value.chars().skip(len - (max_len - 3)).collect();
        format!("...{}", tail)
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::default_path()?;

    println!();
    println!("╔{}╗", "═".repeat(BOX_WIDTH));
    println!("║{:^78}║", "hytale-sources Configuration");
    println!("╚{}╝", "═".repeat(BOX_WIDTH));
    println!();
    println!("  📁 Config file: {}", config_path.display());
    println!();

    section(
        "Installation",
        &[
            ("Patchline:", config.install.patchline.clone()),
            (
                "Hytale home:",
                format_path(config.install.hytale_home.as_deref(), "(auto-detect)"),
            ),
            (
                "Server jar:",
                format_path(config.install.server_jar.as_deref(), "(from install)"),
            ),
            (
                "Assets:",
                format_path(config.install.assets_zip.as_deref(), "(from install)"),
            ),
        ],
    );

    section(
        "Dependency",
        &[
            ("Mode:", config.dependency.mode.to_string()),
            ("Version:", config.dependency.version.clone()),
            ("Maven URL:", config.dependency.maven_url.clone()),
        ],
    );

    section(
        "Decompiler",
        &[
            ("Download URL:", truncate(&config.decompiler.url, 58)),
            (
                "Java:",
                format_path(config.decompiler.java_path.as_deref(), "(JAVA_HOME or PATH)"),
            ),
            ("Only:", config.decompiler.only.clone()),
        ],
    );

    let cache_dir = config.cache_dir().ok();
    let repo_dir = config.repo_dir().ok();
    section(
        "Paths",
        &[
            ("Cache:", format_path(cache_dir.as_deref(), "(unavailable)")),
            ("Repository:", format_path(repo_dir.as_deref(), "(unavailable)")),
        ],
    );

    println!("💡 Modify settings:");
    println!("   hytale-sources config set <key> <value>");
    println!();
    println!("   Available keys:");
    for key in Config::KEYS {
        println!("     • {}", key);
    }
    println!();

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    println!();
    println!("⚙️  Updating configuration...");
    println!();

    if let Err(e) = config.set(key, value) {
        if !Config::KEYS.contains(&key) {
            println!("  ❌ Unknown key: {}", key);
            println!();
            println!("  Available keys:");
            for key in Config::KEYS {
                println!("    • {}", key);
            }
            println!();
            anyhow::bail!("Invalid configuration key");
        }
        return Err(e.into());
    }

    if value.is_empty() {
        println!("  ✓ {} = <cleared>", key);
    } else {
        println!("  ✓ {} = \"{}\"", key, value);
    }

    config.save()?;

    println!();
    println!("✅ Configuration saved");
    println!();

    Ok(())
}
