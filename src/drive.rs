//! Google Drive client: folders, name search and moves.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::google::GoogleApi;
use crate::model::DriveFile;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_folder(&self, name: &str) -> Result<String>;

    /// All non-trashed files whose name contains `needle`.
    async fn search_by_name(&self, needle: &str) -> Result<Vec<DriveFile>>;

    /// Move `file` into `folder_id`, detaching it from its current parents.
    async fn move_file(&self, file: &DriveFile, folder_id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct DriveClient {
    api: GoogleApi,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry {
    id: String,
    name: String,
    created_time: DateTime<Utc>,
    #[serde(default)]
    parents: Vec<String>,
}

impl From<FileEntry> for DriveFile {
    fn from(f: FileEntry) -> Self {
        DriveFile {
            id: f.id,
            name: f.name,
            created_time: f.created_time,
            parents: f.parents,
        }
    }
}

/// Quote a literal for use inside a Drive `q` expression.
pub fn escape_query_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn name_contains_query(needle: &str) -> String {
    format!(
        "name contains '{}' and trashed = false",
        escape_query_literal(needle)
    )
}

impl DriveClient {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(GoogleApi::new(
            &cfg.google.endpoints.drive,
            cfg.google.access_token.clone(),
            cfg.http_timeout(),
        )?))
    }

    fn file_url(&self, id: &str) -> Result<Url> {
        let mut url = self.api.endpoint("drive/v3/files")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("drive base URL cannot have a path"))?
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl FileStore for DriveClient {
    #[instrument(skip_all, fields(name = %name))]
    async fn create_folder(&self, name: &str) -> Result<String> {
        let created: CreatedFile = self
            .api
            .execute(
                Method::POST,
                self.api.endpoint("drive/v3/files")?,
                Some(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE })),
            )
            .await
            .with_context(|| format!("failed to create folder {name}"))?;
        Ok(created.id)
    }

    #[instrument(skip_all, fields(needle = %needle))]
    async fn search_by_name(&self, needle: &str) -> Result<Vec<DriveFile>> {
        let query = name_contains_query(needle);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.api.endpoint("drive/v3/files")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("q", &query)
                    .append_pair("fields", "nextPageToken,files(id,name,createdTime,parents)")
                    .append_pair("pageSize", "100");
                if let Some(token) = &page_token {
                    pairs.append_pair("pageToken", token);
                }
            }
            let page: FileList = self
                .api
                .execute(Method::GET, url, None)
                .await
                .context("failed to search drive files")?;
            debug!(count = page.files.len(), "drive search page");
            files.extend(page.files.into_iter().map(DriveFile::from));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(files)
    }

    #[instrument(skip_all, fields(file = %file.id, folder = %folder_id))]
    async fn move_file(&self, file: &DriveFile, folder_id: &str) -> Result<()> {
        let mut url = self.file_url(&file.id)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("addParents", folder_id);
            if !file.parents.is_empty() {
                pairs.append_pair("removeParents", &file.parents.join(","));
            }
        }
        let _: serde_json::Value = self
            .api
            .execute(Method::PATCH, url, Some(&json!({})))
            .await
            .with_context(|| format!("failed to move {} into {}", file.id, folder_id))?;
        Ok(())
    }
}
