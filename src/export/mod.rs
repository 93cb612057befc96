//! Export workflow: request, poll, download
//!
//! An export is a server-side job that packages the project's translations. The workflow
//! runs in three calls, each relying on the state left by the previous one:
//!
//! 1. [`RemoteProject::initiate_export`] - `Unstarted -> Requested`, stores the export id
//! 2. [`RemoteProject::await_export_readiness`] - polls until `Succeeded` or `Failed`,
//!    stores the download URL
//! 3. [`RemoteProject::download_and_extract_export`] - fetches the archive and routes its
//!    files into locale directories (see [`archive`])

mod archive;

pub use archive::{
    ARCHIVE_FILE_NAME, ArchiveExtractor, DistributionReport, EXTRACT_DIR_NAME, FileMover,
    FsMover, ZipExtractor, locale_from_file_name,
};

use crate::client::{RequestBody, RequestOptions};
use crate::error::{Error, Result};
use crate::project::RemoteProject;
use crate::types::{Event, ExportStatus, FieldValue, ProjectField};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Where a project's export job stands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportState {
    /// No export requested yet
    #[default]
    Unstarted,
    /// Export job created, not yet polled
    Requested,
    /// Last poll reported the job as running
    Processing,
    /// Job finished; download URL is known
    Succeeded,
    /// Server reported a failure
    Failed,
}

impl ExportState {
    /// `Succeeded` and `Failed` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Succeeded | ExportState::Failed)
    }
}

/// Status snapshot of an export job
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExportInfo {
    /// Export id, if echoed by the server
    #[serde(default)]
    pub id: Option<Value>,
    /// Raw status string
    #[serde(default)]
    pub status: Option<String>,
    /// Archive location, present on success
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<String>,
    /// Failure description, present on failure
    #[serde(default, rename = "errorDetails")]
    pub error_details: Option<Value>,
}

impl ExportInfo {
    /// Failure description as text, `"unknown error"` when the server gave none
    pub fn error_details_text(&self) -> String {
        self.error_details
            .as_ref()
            .and_then(value_to_string)
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Deserialize)]
struct ExportCreated {
    #[serde(default)]
    id: Option<Value>,
}

/// Render a JSON scalar the way the server means it (ids may be numbers or strings)
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl RemoteProject {
    /// Current export state
    pub fn export_state(&self) -> ExportState {
        self.export_state
    }

    /// Ask the server to start a new export job
    ///
    /// Returns the export id the project keeps. Each call creates a new job on the
    /// server, but only the first id is kept; later ids are logged and dropped.
    pub async fn initiate_export(&mut self) -> Result<String> {
        info!("initiating a new export");
        let exports_url = self.require_text(ProjectField::ExportsUrl).await?;
        let body = self
            .client
            .post(&exports_url, RequestBody::Empty, &RequestOptions::json())
            .await?;

        let created: ExportCreated = serde_json::from_str(&body)?;
        let export_id = created
            .id
            .as_ref()
            .and_then(value_to_string)
            .ok_or_else(|| Error::malformed(&exports_url, "export response has no id"))?;
        info!(%export_id, "export requested");

        if self
            .record
            .set_if_absent(ProjectField::ExportId, FieldValue::Text(export_id.clone()))
        {
            self.export_state = ExportState::Requested;
            self.emit(Event::ExportInitiated {
                export_id: export_id.clone(),
            });
            return Ok(export_id);
        }

        let kept = self
            .record
            .peek(&ProjectField::ExportId)
            .and_then(FieldValue::as_text)
            .map(str::to_string)
            .unwrap_or_default();
        warn!(
            discarded = %export_id,
            kept = %kept,
            "an export was already initiated, the new export id is not tracked"
        );
        Ok(kept)
    }

    /// Read the status of the initiated export
    ///
    /// # Errors
    ///
    /// [`Error::ExportNotStarted`] if no export id is known.
    pub async fn export_info(&mut self) -> Result<ExportInfo> {
        let exports_url = self.require_text(ProjectField::ExportsUrl).await?;
        let export_id = self
            .read_text(ProjectField::ExportId)
            .await?
            .ok_or(Error::ExportNotStarted)?;
        let body = self
            .client
            .get(&format!("{exports_url}/{export_id}"), &RequestOptions::json())
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Poll the export until the server reports success or failure
    ///
    /// Polls every `export.poll_interval`, at most `export.max_poll_attempts` times.
    /// Returns the download URL the project keeps.
    ///
    /// # Errors
    ///
    /// - [`Error::ExportFailed`] with the server's error details on any status other than
    ///   `PROCESSING` or `SUCCESS`, including a missing one
    /// - [`Error::MalformedResponse`] if `SUCCESS` comes without a download URL; the export
    ///   is then `Failed` as well
    /// - [`Error::ExportTimeout`] if the job is still processing after the last check
    pub async fn await_export_readiness(&mut self) -> Result<String> {
        info!("waiting for the export to be complete");
        let interval = self.config.export.poll_interval;
        let max_attempts = self.config.export.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let export_info = self.export_info().await?;
            // a missing status is a failure like any other unknown one
            let status = ExportStatus::parse(export_info.status.as_deref().unwrap_or_default());
            info!(attempt, %status, "export status");
            self.emit(Event::ExportProgress {
                attempt,
                status: status.clone(),
            });

            match status {
                ExportStatus::Processing => {
                    self.export_state = ExportState::Processing;
                    if attempt < max_attempts {
                        tokio::time::sleep(interval).await;
                    }
                }
                ExportStatus::Success => {
                    let Some(download_url) = export_info.download_url.filter(|url| !url.is_empty())
                    else {
                        self.export_state = ExportState::Failed;
                        return Err(Error::malformed(
                            self.known_exports_url(),
                            "successful export has no download URL",
                        ));
                    };
                    self.record
                        .set_if_absent(ProjectField::ExportDownloadUrl, download_url.into());
                    self.export_state = ExportState::Succeeded;
                    return self
                        .read_text(ProjectField::ExportDownloadUrl)
                        .await?
                        .ok_or(Error::ExportNotReady);
                }
                ExportStatus::Other(_) => {
                    self.export_state = ExportState::Failed;
                    let details = export_info.error_details_text();
                    warn!(%status, %details, "export failed");
                    return Err(Error::ExportFailed { details });
                }
            }
        }

        let export_id = self
            .record
            .peek(&ProjectField::ExportId)
            .and_then(FieldValue::as_text)
            .map(str::to_string)
            .unwrap_or_default();
        warn!(%export_id, attempts = max_attempts, "gave up waiting for export");
        Err(Error::ExportTimeout {
            export_id,
            attempts: max_attempts,
        })
    }

    fn known_exports_url(&self) -> String {
        self.record
            .peek(&ProjectField::ExportsUrl)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
            .to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
