//! The remote project entity
//!
//! A [`RemoteProject`] starts out knowing only its link. The first metadata read fetches
//! the project record once and fills every field it carries; the resource listing is a
//! second, independent one-shot fetch. Export fields are written later by the export
//! workflow (see [`crate::export`]), always first-write-wins.
//!
//! Submodules:
//! - [`io`] - resource download, upload and search result pulls

mod io;

use crate::client::{Client, RequestOptions};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{ArchiveExtractor, ExportState, FileMover, FsMover, ZipExtractor};
use crate::lazy::LazyRecord;
use crate::resource::{Resource, ResourceCache};
use crate::types::{Event, FieldValue, ProjectField};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Deserialize)]
struct ProjectRecord {
    #[serde(default)]
    links: Vec<RecordLink>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    owner_email: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project_locales: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RecordLink {
    href: Option<String>,
}

/// Position of each advertised link in the project record
const SELF_LINK: usize = 0;
const WEB_LINK: usize = 1;
const TRANSLATIONS_LINK: usize = 2;
const RESOURCES_LINK: usize = 3;
const SEARCH_LINK: usize = 4;

/// Read the project record at `link` and list every field it provides
async fn fetch_project(
    client: &dyn Client,
    link: &str,
    event_tx: &broadcast::Sender<Event>,
) -> Result<Vec<(ProjectField, FieldValue)>> {
    debug!(link, "hydrating project");
    let body = client.get(link, &RequestOptions::new()).await?;
    let fields = parse_project_record(link, &body)?;
    info!(link, fields = fields.len(), "project metadata fetched");
    event_tx
        .send(Event::Hydrated {
            link: link.to_string(),
        })
        .ok();
    Ok(fields)
}

/// Map a project record onto project fields
///
/// The exports endpoint is not advertised by the server; it is the self link plus
/// `/exports`.
fn parse_project_record(link: &str, body: &str) -> Result<Vec<(ProjectField, FieldValue)>> {
    let record: ProjectRecord = serde_json::from_str(body)?;
    let href = |index: usize| -> Result<String> {
        record
            .links
            .get(index)
            .and_then(|l| l.href.clone())
            .ok_or_else(|| {
                Error::malformed(
                    link,
                    format!(
                        "expected a link at position {index}, record has {}",
                        record.links.len()
                    ),
                )
            })
    };

    let self_link = href(SELF_LINK)?;
    let mut fields: Vec<(ProjectField, FieldValue)> = vec![
        (ProjectField::ExportsUrl, format!("{self_link}/exports").into()),
        (ProjectField::WebUrl, href(WEB_LINK)?.into()),
        (ProjectField::TranslationsUrl, href(TRANSLATIONS_LINK)?.into()),
        (ProjectField::ResourcesUrl, href(RESOURCES_LINK)?.into()),
        (ProjectField::SearchUrl, href(SEARCH_LINK)?.into()),
        (ProjectField::Link, self_link.into()),
    ];

    let optional = [
        (ProjectField::Title, record.title.clone()),
        (ProjectField::Owner, record.owner_email.clone()),
        (ProjectField::Description, record.description.clone()),
    ];
    fields.extend(
        optional
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, FieldValue::Text(v)))),
    );
    if let Some(locales) = record.project_locales {
        fields.push((ProjectField::ProjectLocales, FieldValue::List(locales)));
    }
    Ok(fields)
}

/// Client-side model of a LingoHub project
pub struct RemoteProject {
    pub(crate) client: Arc<dyn Client>,
    link: String,
    pub(crate) config: Config,
    pub(crate) record: LazyRecord<ProjectField, FieldValue>,
    resources: ResourceCache,
    pub(crate) export_state: ExportState,
    pub(crate) extractor: Arc<dyn ArchiveExtractor>,
    pub(crate) mover: Arc<dyn FileMover>,
    event_tx: broadcast::Sender<Event>,
}

macro_rules! text_accessors {
    ($($(#[$doc:meta])* $name:ident => $field:ident;)*) => {
        $(
            $(#[$doc])*
            pub async fn $name(&mut self) -> Result<Option<String>> {
                self.read_text(ProjectField::$field).await
            }
        )*
    };
}

impl RemoteProject {
    /// Create an unhydrated project for `link`
    ///
    /// Nothing is fetched until the first attribute is read.
    pub fn new(client: Arc<dyn Client>, link: &str, config: Config) -> Result<Self> {
        url::Url::parse(link).map_err(|source| Error::InvalidUrl {
            url: link.to_string(),
            source,
        })?;
        config.validate()?;

        let mut record = LazyRecord::new();
        record.set(ProjectField::Link, FieldValue::from(link));
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            link: link.to_string(),
            config,
            record,
            resources: ResourceCache::new(),
            export_state: ExportState::Unstarted,
            extractor: Arc::new(ZipExtractor),
            mover: Arc::new(FsMover),
            event_tx,
        })
    }

    /// Replace the archive extractor used by the export workflow
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the file mover used to route exported files
    pub fn with_mover(mut self, mover: Arc<dyn FileMover>) -> Self {
        self.mover = mover;
        self
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration this project was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the project record has been requested, successfully or not
    pub fn is_hydrated(&self) -> bool {
        self.record.is_hydrated()
    }

    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Hydrate if needed and read `field`
    pub(crate) async fn read(&mut self, field: ProjectField) -> Result<Option<&FieldValue>> {
        let client = self.client.as_ref();
        let link = self.link.as_str();
        let event_tx = &self.event_tx;
        self.record
            .read(field, || fetch_project(client, link, event_tx))
            .await
    }

    pub(crate) async fn read_text(&mut self, field: ProjectField) -> Result<Option<String>> {
        Ok(self
            .read(field)
            .await?
            .and_then(FieldValue::as_text)
            .map(str::to_string))
    }

    /// Read a field the hydrated record always provides
    pub(crate) async fn require_text(&mut self, field: ProjectField) -> Result<String> {
        let link = self.link.clone();
        self.read_text(field)
            .await?
            .ok_or_else(|| Error::malformed(link, format!("project has no {field}")))
    }

    text_accessors! {
        /// Project title
        title => Title;
        /// Canonical API link
        link => Link;
        /// Web UI URL
        weburl => WebUrl;
        /// Resources endpoint
        resources_url => ResourcesUrl;
        /// Translations endpoint
        translations_url => TranslationsUrl;
        /// Exports endpoint
        exports_url => ExportsUrl;
        /// Search endpoint
        search_url => SearchUrl;
        /// Owner e-mail address
        owner => Owner;
        /// Project description
        description => Description;
        /// Id of the initiated export job
        export_id => ExportId;
        /// Download URL of the completed export
        export_download_url => ExportDownloadUrl;
    }

    /// Locales configured on the project
    pub async fn project_locales(&mut self) -> Result<Option<Vec<String>>> {
        Ok(self
            .read(ProjectField::ProjectLocales)
            .await?
            .and_then(FieldValue::as_list)
            .map(<[String]>::to_vec))
    }

    /// Raw write of a field; does not hydrate and does not check an existing value
    pub fn set_field(&mut self, field: ProjectField, value: impl Into<FieldValue>) {
        self.record.set(field, value.into());
    }

    /// All resources of the project, keyed by file name
    ///
    /// The listing is fetched on first call and cached for the lifetime of the project.
    pub async fn resources(&mut self) -> Result<&BTreeMap<String, Resource>> {
        if !self.resources.is_loaded() {
            let resources_url = self.require_text(ProjectField::ResourcesUrl).await?;
            let entries = ResourceCache::fetch(self.client.as_ref(), &resources_url).await?;
            let count = entries.len();
            info!(count, "resource listing cached");
            self.resources.store(entries);
            self.emit(Event::ResourcesListed { count });
        }
        Ok(self.resources.entries())
    }

    /// Look up one resource by exact file name
    pub async fn resource(&mut self, name: &str) -> Result<&Resource> {
        self.resources()
            .await?
            .get(name)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for RemoteProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProject")
            .field("link", &self.link)
            .field("hydrated", &self.record.is_hydrated())
            .field("resources_loaded", &self.resources.is_loaded())
            .field("export_state", &self.export_state)
            .finish()
    }
}
