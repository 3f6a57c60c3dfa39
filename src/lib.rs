//! hytale-sources - Decompiled sources for the Hytale server jar
//!
//! Locates `HytaleServer.jar` (from the local launcher install or the Hytale
//! Maven repository), decompiles it with Vineflower, and publishes the jar, the
//! generated sources jar and a POM into a local Maven-layout repository that
//! IDEs and build tools can resolve with source attachment.
//!
//! # Examples
//!
//! ```no_run
//! use hytale_sources::{decompiler, Config, HttpFetcher, Pipeline, PipelineOptions, SystemPlatform};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let fetcher = HttpFetcher::new()?;
//! let mut pipeline = Pipeline::new(
//!     PipelineOptions::from_config(&config)?,
//!     &SystemPlatform,
//!     &fetcher,
//!     decompiler::log_sink(),
//! );
//!
//! let report = pipeline.run()?;
//! println!("Published {}", report.coordinates);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`platform`] - Host detection and Hytale installation discovery
//! - [`cache`] - Cached server jar with byte-level freshness checks
//! - [`decompiler`] - Vineflower download and subprocess management
//! - [`repository`] - Maven-layout publishing of jar, sources and POM
//! - [`maven`] - Remote Maven repository access and version selectors
//! - [`pipeline`] - The end-to-end sync
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod cache;
pub mod config;
pub mod decompiler;
pub mod error;
pub mod maven;
pub mod pipeline;
pub mod platform;
pub mod repository;

pub use cache::{ArtifactCache, CacheRefresh, CacheStats};
pub use config::{Config, SourceMode};
pub use decompiler::{ensure_tool, Decompiler, DecompilerTool, HttpFetcher, LineSink, ToolFetcher};
pub use error::{Error, Result};
pub use maven::{MavenRepository, VersionSelector};
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport, PipelineState};
pub use platform::{resolve_installation, HostOs, Installation, PlatformQuery, SystemPlatform};
pub use repository::{publish, ArtifactCoordinates, Descriptor, LocalRepository, PublishedArtifact};
