use anyhow::Result;
use hytale_sources::platform::{self, SystemPlatform};
use hytale_sources::Config;
use std::path::Path;

pub fn run(patchline: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let patchline = patchline.unwrap_or_else(|| config.install.patchline.clone());

    let installation = match config.hytale_home() {
        Some(home) => platform::installation_at(&home, &patchline)?,
        None => platform::resolve_installation(&SystemPlatform, &patchline)?,
    };

    let server_jar = config
        .server_jar()
        .unwrap_or_else(|| installation.server_jar());
    let assets_zip = config
        .assets_zip()
        .unwrap_or_else(|| installation.assets_zip());

    println!("Hytale installation ({})", patchline);
    println!();
    println!("  Home:      {}", installation.base_directory.display());
    println!("  Install:   {}", installation.install_directory().display());
    println!("  Server:    {}", file_status(&server_jar));
    println!("  Assets:    {}", file_status(&assets_zip));

    Ok(())
}

fn file_status(path: &Path) -> String {
    if path.is_file() {
        format!("✓ {}", path.display())
    } else {
        format!("✗ {} (missing)", path.display())
    }
}
