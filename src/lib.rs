//! # lingohub
//!
//! Client-side model of a LingoHub localization project.
//!
//! ## Design Philosophy
//!
//! - **Lazy** - project metadata and the resource listing are fetched on first use, once
//! - **First write wins** - a field, once set, is never overwritten
//! - **Explicit workflow** - exports are requested, polled and downloaded in three calls
//! - **Injectable collaborators** - transport, archive extraction and file moves are traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use lingohub::{Config, HttpClient, RemoteProject};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = Arc::new(HttpClient::new(&config.http)?);
//!     let mut project = RemoteProject::new(
//!         client,
//!         "https://api.lingohub.com/v1/demo/projects/app",
//!         config,
//!     )?;
//!
//!     println!("Project: {:?}", project.title().await?);
//!
//!     let mut events = project.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     project.initiate_export().await?;
//!     project.await_export_readiness().await?;
//!     let report = project.download_and_extract_export().await?;
//!     println!("{} files routed", report.moved.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP transport seam
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export workflow and archive distribution
pub mod export;
/// One-shot lazy field hydration
pub mod lazy;
/// Remote project entity
pub mod project;
/// Resources and the resource cache
pub mod resource;
/// Core types and events
pub mod types;


// Re-export commonly used types
pub use client::{Client, HttpClient, RequestBody, RequestOptions};
pub use config::{Config, ExportConfig, HttpConfig};
pub use error::{Error, Result};
pub use export::{
    ArchiveExtractor, DistributionReport, ExportInfo, ExportState, FileMover, FsMover,
    ZipExtractor, locale_from_file_name,
};
pub use lazy::{FieldTable, LazyRecord};
pub use project::RemoteProject;
pub use resource::{Resource, ResourceCache};
pub use types::{Event, ExportStatus, FieldValue, ProjectField};
