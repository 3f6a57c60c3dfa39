use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Maven metadata error: {0}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("Could not find Hytale installation at {}\n\n\
             Hint: Make sure Hytale is installed through the official launcher.\n\n\
             Expected locations:\n\
             - Windows: registry HKLM\\SOFTWARE\\Hypixel Studios\\Hytale (GameInstallPath)\n\
             - macOS:   ~/Library/Application Support/Hytale\n\
             - Linux:   ~/.var/app/com.hypixel.HytaleLauncher/data/Hytale\n\n\
             Or configure it manually:\n\
                hytale-sources config set install.hytale_home \"/path/to/Hytale\"",
             .path.display())]
    InstallationNotFound { path: PathBuf },

    #[error("Unsupported operating system: {0}\n\n\
             Hint: Set install.hytale_home to point at your Hytale directory.")]
    UnsupportedPlatform(String),

    #[error("Missing local Hytale installation files:\n{}\
             Make sure you have Hytale installed, or configure install.server_jar \
             and install.assets_zip to the correct files",
             .0.iter().map(|p| format!(" - {}\n", p.display())).collect::<String>())]
    MissingInstallFiles(Vec<PathBuf>),

    #[error("Failed to fetch decompiler from {url}: {reason}\n\n\
             Hint: Check your network connection, or download the jar manually \
             into the cache directory as vineflower.jar")]
    ToolFetch { url: String, reason: String },

    #[error("Decompilation failed: {reason}")]
    DecompileFailure { reason: String },

    #[error("Failed to publish {}: {source}", .path.display())]
    PublishIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache operation failed on {}: {source}", .path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Java runtime not found\n\n\
             Hint: Install a JDK (21 or newer), set JAVA_HOME, or configure:\n\
                hytale-sources config set decompiler.java_path \"/path/to/java\"")]
    JavaNotFound,

    #[error("Artifact not found: {url}")]
    ArtifactNotFound { url: String },

    #[error("Invalid artifact coordinates: {0} (expected group:name:version)")]
    InvalidCoordinates(String),

    #[error("{0}")]
    Other(String),
}
