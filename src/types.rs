//! Core types and events for lingohub

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hydrated attributes of a [`RemoteProject`](crate::RemoteProject)
///
/// Each variant names one slot of the project's field table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectField {
    /// Project title
    Title,
    /// Canonical API link of the project
    Link,
    /// Web UI URL
    WebUrl,
    /// Resources endpoint
    ResourcesUrl,
    /// Translations endpoint
    TranslationsUrl,
    /// Exports endpoint (derived, not advertised by the server)
    ExportsUrl,
    /// Search endpoint
    SearchUrl,
    /// Owner e-mail address
    Owner,
    /// Free-form description
    Description,
    /// Locales configured on the project
    ProjectLocales,
    /// Id of the export job started by `initiate_export`
    ExportId,
    /// Download URL of a completed export
    ExportDownloadUrl,
}

impl ProjectField {
    /// Field name as used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectField::Title => "title",
            ProjectField::Link => "link",
            ProjectField::WebUrl => "weburl",
            ProjectField::ResourcesUrl => "resources_url",
            ProjectField::TranslationsUrl => "translations_url",
            ProjectField::ExportsUrl => "exports_url",
            ProjectField::SearchUrl => "search_url",
            ProjectField::Owner => "owner",
            ProjectField::Description => "description",
            ProjectField::ProjectLocales => "project_locales",
            ProjectField::ExportId => "export_id",
            ProjectField::ExportDownloadUrl => "export_download_url",
        }
    }
}

impl fmt::Display for ProjectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value stored in a project field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Scalar text value (URLs, title, ids)
    Text(String),
    /// List value (project locales)
    List(Vec<String>),
}

impl FieldValue {
    /// Borrow the text, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::List(_) => None,
        }
    }

    /// Borrow the list, if this is a list value
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Status reported by the server for an export job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportStatus {
    /// Job is still running
    Processing,
    /// Job finished and its archive can be downloaded
    Success,
    /// Any other status; treated as a failure
    Other(String),
}

impl ExportStatus {
    /// Interpret the raw status string of a status response
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PROCESSING" => ExportStatus::Processing,
            "SUCCESS" => ExportStatus::Success,
            other => ExportStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Processing => f.write_str("PROCESSING"),
            ExportStatus::Success => f.write_str("SUCCESS"),
            ExportStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// Progress observations emitted by a [`RemoteProject`](crate::RemoteProject)
///
/// Consumers receive these through [`RemoteProject::subscribe`](crate::RemoteProject::subscribe).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Project metadata was fetched
    Hydrated {
        /// Project link that was read
        link: String,
    },

    /// The resource listing was fetched and cached
    ResourcesListed {
        /// Number of resources in the listing
        count: usize,
    },

    /// A new export job was requested
    ExportInitiated {
        /// Id returned by the server
        export_id: String,
    },

    /// One export status check completed
    ExportProgress {
        /// 1-based sequence number of the check
        attempt: u32,
        /// Status reported by the server
        status: ExportStatus,
    },

    /// The export archive was downloaded
    ExportDownloaded {
        /// Archive size in bytes
        bytes: u64,
    },

    /// The export archive was unpacked into the workspace
    ExportExtracted {
        /// Number of extracted files
        files: usize,
    },

    /// Extracted files were routed into locale directories
    ExportDistributed {
        /// Files moved into a locale directory
        moved: usize,
        /// Files without a matching locale directory
        skipped: usize,
    },

    /// The export workspace was removed
    WorkspaceCleaned,
}
