//! Translatable resources and the per-project resource cache

use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A named translatable file tracked by a remote project
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// File name, unique within the project
    pub name: String,
    /// Locale of the file, if the server reported one
    pub locale: Option<String>,
    /// Link to the file content
    pub link: String,
}

impl Resource {
    /// Whether this resource belongs to `locale`
    pub fn has_locale(&self, locale: &str) -> bool {
        self.locale.as_deref() == Some(locale)
    }

    /// Fetch the file content
    pub async fn content(&self, client: &dyn Client) -> Result<String> {
        debug!(name = %self.name, link = %self.link, "fetching resource content");
        client.get(&self.link, &RequestOptions::new()).await
    }
}

#[derive(Deserialize)]
struct Listing {
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Deserialize)]
struct Member {
    name: String,
    #[serde(default)]
    project_locale: Option<String>,
    #[serde(default)]
    links: Vec<MemberLink>,
}

#[derive(Deserialize)]
struct MemberLink {
    href: Option<String>,
}

/// Memoized `name -> Resource` map of one project
///
/// Filled from a single listing call and never refreshed.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: BTreeMap<String, Resource>,
    loaded: bool,
}

impl ResourceCache {
    /// Create an empty, unloaded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the listing has been stored
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Cached entries (empty until loaded)
    pub fn entries(&self) -> &BTreeMap<String, Resource> {
        &self.entries
    }

    /// Store a listing; ignored if one was stored before
    pub fn store(&mut self, entries: BTreeMap<String, Resource>) {
        if self.loaded {
            return;
        }
        self.entries = entries;
        self.loaded = true;
    }

    /// Read and parse the listing at `resources_url`
    pub async fn fetch(
        client: &dyn Client,
        resources_url: &str,
    ) -> Result<BTreeMap<String, Resource>> {
        let body = client.get(resources_url, &RequestOptions::new()).await?;
        Self::parse_listing(resources_url, &body)
    }

    /// Turn a listing body into resources keyed by name
    ///
    /// Each member contributes its locale and the href of its first link.
    pub fn parse_listing(resources_url: &str, body: &str) -> Result<BTreeMap<String, Resource>> {
        let listing: Listing = serde_json::from_str(body)?;
        let mut entries = BTreeMap::new();
        for member in listing.members {
            let link = member
                .links
                .into_iter()
                .next()
                .and_then(|l| l.href)
                .ok_or_else(|| {
                    Error::malformed(
                        resources_url,
                        format!("resource {} has no link", member.name),
                    )
                })?;
            entries.insert(
                member.name.clone(),
                Resource {
                    name: member.name,
                    locale: member.project_locale,
                    link,
                },
            );
        }
        Ok(entries)
    }
}
