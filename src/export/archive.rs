//! Export archive download, extraction and locale routing
//!
//! Each run gets its own temporary workspace holding the downloaded archive and the
//! extracted files. Files whose name carries a locale with an existing directory under
//! the locales root are moved there; everything else is dropped with the workspace.

use crate::error::{Error, Result};
use crate::project::RemoteProject;
use crate::types::{Event, ProjectField};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Name of the downloaded archive inside the workspace
pub const ARCHIVE_FILE_NAME: &str = "export.zip";

/// Name of the extraction directory inside the workspace
pub const EXTRACT_DIR_NAME: &str = "extracted";

/// Prefix of per-export workspace directories
const WORKSPACE_PREFIX: &str = "lingohub-export-";

/// Unpacks an export archive
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `dest_dir`, returning the extracted file paths
    async fn extract_archive(&self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Moves one file into a directory
#[async_trait]
pub trait FileMover: Send + Sync {
    /// Move `source` into `dest_dir`, keeping its file name; returns the new path
    async fn move_file(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// ZIP implementation of [`ArchiveExtractor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a ZIP archive synchronously
    pub fn try_extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");
        std::fs::create_dir_all(dest_path)?;

        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| Error::Extraction {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry: {}", e),
            })?;

            let file_path = match entry.enclosed_name() {
                Some(path) => dest_path.join(path),
                None => {
                    warn!(name = entry.name(), "skipping entry with unsafe path");
                    continue;
                }
            };

            if entry.is_dir() {
                std::fs::create_dir_all(&file_path)?;
                continue;
            }
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&file_path)?;
            std::io::copy(&mut entry, &mut outfile)?;
            extracted_files.push(file_path);
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );
        Ok(extracted_files)
    }
}

#[async_trait]
impl ArchiveExtractor for ZipExtractor {
    async fn extract_archive(&self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest_dir.to_path_buf();
        spawn_blocking(move || Self::try_extract(&archive_owned, &dest_owned))
            .await
            .map_err(|e| Error::Extraction {
                archive: archive.to_path_buf(),
                reason: format!("extraction task panicked: {}", e),
            })?
    }
}

/// Filesystem implementation of [`FileMover`]
///
/// Renames when possible and falls back to copy + remove across filesystems. An
/// existing file of the same name in the destination is replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

#[async_trait]
impl FileMover for FsMover {
    async fn move_file(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            Error::Io(std::io::Error::other(format!(
                "cannot move {}: no file name",
                source.display()
            )))
        })?;
        let destination = dest_dir.join(file_name);

        if let Err(e) = fs::rename(source, &destination).await {
            debug!(?source, ?destination, error = %e, "rename failed, copying instead");
            fs::copy(source, &destination).await?;
            fs::remove_file(source).await?;
        }
        Ok(destination)
    }
}

/// Locale encoded in an exported file name: the third dot-separated segment
///
/// `app.resource.en.yml` belongs to `en`. Names with fewer segments, or an empty third
/// segment, carry no locale.
pub fn locale_from_file_name(file_name: &str) -> Option<&str> {
    file_name.split('.').nth(2).filter(|s| !s.is_empty())
}

/// Outcome of routing extracted files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionReport {
    /// Final paths of files moved into a locale directory
    pub moved: Vec<PathBuf>,
    /// Extracted files left behind (no locale, or no matching directory)
    pub skipped: Vec<PathBuf>,
}

/// Move every file whose locale directory exists under `locales_root`
async fn distribute(
    mover: &dyn FileMover,
    files: &[PathBuf],
    locales_root: &Path,
) -> Result<DistributionReport> {
    let mut report = DistributionReport::default();

    for file in files {
        let locale = file
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(locale_from_file_name);
        let destination = match locale {
            Some(locale) => locales_root.join(locale),
            None => {
                debug!(?file, "no locale in file name");
                report.skipped.push(file.clone());
                continue;
            }
        };

        let is_dir = fs::metadata(&destination)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            debug!(?file, ?destination, "no locale directory, leaving file");
            report.skipped.push(file.clone());
            continue;
        }

        let moved = mover.move_file(file, &destination).await?;
        debug!(?moved, "routed exported file");
        report.moved.push(moved);
    }

    Ok(report)
}

impl RemoteProject {
    /// Download the completed export and distribute its files into locale directories
    ///
    /// Uses a fresh workspace under `export.workspace_root`, which is removed afterwards
    /// whether or not the run succeeds. Nothing outside the workspace and the locale
    /// directories is touched.
    ///
    /// # Errors
    ///
    /// [`Error::ExportNotReady`] if no download URL is known yet.
    pub async fn download_and_extract_export(&mut self) -> Result<DistributionReport> {
        info!("downloading and exporting the locales");
        let download_url = self
            .read_text(ProjectField::ExportDownloadUrl)
            .await?
            .ok_or(Error::ExportNotReady)?;

        let workspace = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.config.export.workspace_root)?;
        debug!(workspace = ?workspace.path(), "created export workspace");

        info!(url = %download_url, "downloading the export file");
        let bytes = self.client.get_export_file(&download_url).await?;
        let archive_path = workspace.path().join(ARCHIVE_FILE_NAME);
        fs::write(&archive_path, &bytes).await?;
        self.emit(Event::ExportDownloaded {
            bytes: bytes.len() as u64,
        });

        info!(?archive_path, "unzipping the export file");
        let extract_dir = workspace.path().join(EXTRACT_DIR_NAME);
        let files = self
            .extractor
            .extract_archive(&archive_path, &extract_dir)
            .await?;
        self.emit(Event::ExportExtracted { files: files.len() });

        info!(
            locales_root = ?self.config.export.locales_root,
            "moving all new locales to their respective folders"
        );
        let report = distribute(
            self.mover.as_ref(),
            &files,
            &self.config.export.locales_root,
        )
        .await?;
        info!(
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            "export distributed"
        );
        self.emit(Event::ExportDistributed {
            moved: report.moved.len(),
            skipped: report.skipped.len(),
        });

        info!("cleaning temporary export files");
        if let Err(e) = workspace.close() {
            warn!(error = %e, "failed to remove export workspace");
        } else {
            self.emit(Event::WorkspaceCleaned);
        }

        Ok(report)
    }
}
