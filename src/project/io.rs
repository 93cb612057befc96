//! Resource transfer between a project and the local filesystem

use super::RemoteProject;
use crate::client::{RequestBody, RequestOptions};
use crate::error::{Error, Result};
use crate::types::ProjectField;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Query parameter carrying a locale filter
const LOCALE_PARAM: &str = "iso2_slug";

impl RemoteProject {
    /// Write the content of resource `filename` to `directory/filename`
    ///
    /// With `locale_filter`, only a resource of that locale is written; for any other
    /// locale nothing happens and `false` is returned.
    ///
    /// # Errors
    ///
    /// [`Error::ResourceNotFound`] if the project has no resource named `filename`.
    pub async fn download_resource(
        &mut self,
        directory: &Path,
        filename: &str,
        locale_filter: Option<&str>,
    ) -> Result<bool> {
        let resource = self.resource(filename).await?.clone();

        if let Some(locale) = locale_filter
            && !resource.has_locale(locale)
        {
            debug!(
                filename,
                locale,
                resource_locale = ?resource.locale,
                "resource skipped by locale filter"
            );
            return Ok(false);
        }

        let content = resource.content(self.client.as_ref()).await?;
        let path = directory.join(filename);
        fs::write(&path, content.as_bytes()).await?;
        info!(?path, "resource downloaded");
        Ok(true)
    }

    /// Upload the file at `path` to the project's resources
    ///
    /// `locale` is sent as `iso2_slug`; `parameters` (e.g. merge strategy flags) are
    /// passed through unchanged. Returns the server response body.
    ///
    /// # Errors
    ///
    /// [`Error::PathNotFound`] if `path` does not exist.
    pub async fn upload_resource(
        &mut self,
        path: &Path,
        locale: Option<&str>,
        parameters: &[(String, String)],
    ) -> Result<String> {
        if fs::metadata(path).await.is_err() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        let content = fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut fields = Vec::with_capacity(parameters.len() + 1);
        if let Some(locale) = locale {
            fields.push((LOCALE_PARAM.to_string(), locale.to_string()));
        }
        fields.extend(parameters.iter().cloned());

        let resources_url = self.require_text(ProjectField::ResourcesUrl).await?;
        info!(?path, url = %resources_url, bytes = content.len(), "uploading resource");
        self.client
            .post(
                &resources_url,
                RequestBody::Multipart {
                    file_name,
                    content,
                    fields,
                },
                &RequestOptions::new(),
            )
            .await
    }

    /// Run a search and write the raw response body to `directory/filename`
    ///
    /// A blank `locale` is treated as no locale.
    pub async fn pull_search_results(
        &mut self,
        directory: &Path,
        filename: &str,
        query: &str,
        locale: Option<&str>,
    ) -> Result<PathBuf> {
        let mut options = RequestOptions::new()
            .query("filename", filename)
            .query("query", query);
        if let Some(locale) = locale.map(str::trim).filter(|l| !l.is_empty()) {
            options = options.query(LOCALE_PARAM, locale);
        }

        let search_url = self.require_text(ProjectField::SearchUrl).await?;
        let content = self.client.get(&search_url, &options).await?;
        let path = directory.join(filename);
        fs::write(&path, content.as_bytes()).await?;
        info!(?path, query, "search results saved");
        Ok(path)
    }
}
