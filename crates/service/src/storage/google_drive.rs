//! `FileStore` over the Google Drive v3 REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{token::TokenSource, Entry, EntryKind, FileStore, FOLDER_MIME};
use crate::errors::ServiceError;

const USER_AGENT: &str = concat!("roster-store/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: &str = "1000";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

pub struct DriveStore {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    api_base: String,
    upload_base: String,
    shared_drive_id: Option<String>,
}

impl DriveStore {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        api_base: &str,
        upload_base: &str,
        shared_drive_id: Option<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            shared_drive_id,
        }
    }

    /// HTTP client shared by the store and the token exchange.
    pub fn build_client(timeout: std::time::Duration) -> Result<reqwest::Client, ServiceError> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::ConfigurationMissing(format!("cannot build http client: {e}")))
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    async fn bearer(&self) -> Result<String, ServiceError> {
        Ok(format!("Bearer {}", self.tokens.access_token().await?))
    }

    async fn search(&self, q: String) -> Result<Vec<Entry>, ServiceError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("q", q.clone()),
                ("fields", LIST_FIELDS.into()),
                ("pageSize", PAGE_SIZE.into()),
                ("supportsAllDrives", "true".into()),
                ("includeItemsFromAllDrives", "true".into()),
            ];
            if let Some(drive) = &self.shared_drive_id {
                params.push(("corpora", "drive".into()));
                params.push(("driveId", drive.clone()));
            }
            if let Some(t) = page_token.take() {
                params.push(("pageToken", t));
            }
            let resp = self
                .client
                .get(self.files_url())
                .header(header::AUTHORIZATION, self.bearer().await?)
                .query(&params)
                .send()
                .await
                .map_err(|e| ServiceError::store("list", e))?;
            let list: FileList = ensure_success("list", resp)
                .await?
                .json()
                .await
                .map_err(|e| ServiceError::store("list", e))?;
            out.extend(list.files.into_iter().map(|f| Entry {
                kind: EntryKind::from_mime(&f.mime_type),
                id: f.id,
                name: f.name,
            }));
            match list.next_page_token {
                Some(t) if !t.is_empty() => page_token = Some(t),
                _ => break,
            }
        }
        Ok(out)
    }
}

/// Drive query literals are single-quoted; backslash and quote need escaping.
pub(crate) fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub(crate) fn search_query(parent: Option<&str>, name: Option<&str>, kind: EntryKind) -> String {
    let mut clauses = Vec::with_capacity(4);
    if let Some(name) = name {
        clauses.push(format!("name = '{}'", escape_literal(name)));
    }
    clauses.push(match kind {
        EntryKind::Folder => format!("mimeType = '{FOLDER_MIME}'"),
        EntryKind::File => format!("mimeType != '{FOLDER_MIME}'"),
    });
    if let Some(parent) = parent {
        clauses.push(format!("'{}' in parents", escape_literal(parent)));
    }
    clauses.push("trashed = false".into());
    clauses.join(" and ")
}

/// Body of a `multipart/related` upload: JSON metadata, then the content.
pub(crate) fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    mime: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

async fn ensure_success(op: &str, resp: Response) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::store(op, format!("drive returned {status}: {body}")))
}

#[async_trait]
impl FileStore for DriveStore {
    #[instrument(skip(self))]
    async fn find(
        &self,
        parent: Option<&str>,
        name: &str,
        kind: EntryKind,
    ) -> Result<Vec<Entry>, ServiceError> {
        let found = self.search(search_query(parent, Some(name), kind)).await?;
        debug!(matches = found.len(), "drive search done");
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn list_folders(&self, parent: &str) -> Result<Vec<Entry>, ServiceError> {
        self.search(search_query(Some(parent), None, EntryKind::Folder)).await
    }

    #[instrument(skip(self))]
    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, ServiceError> {
        let resp = self
            .client
            .post(self.files_url())
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME, "parents": [parent] }))
            .send()
            .await
            .map_err(|e| ServiceError::store("create folder", e))?;
        let created: Created = ensure_success("create folder", resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::store("create folder", e))?;
        Ok(created.id)
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn create_file(
        &self,
        parent: &str,
        name: &str,
        mime: &str,
        content: Vec<u8>,
    ) -> Result<String, ServiceError> {
        let boundary = format!("roster-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({ "name": name, "mimeType": mime, "parents": [parent] });
        let body = multipart_related(&boundary, &metadata, mime, &content);
        let resp = self
            .client
            .post(format!("{}/upload/drive/v3/files", self.upload_base))
            .header(header::AUTHORIZATION, self.bearer().await?)
            .header(header::CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .query(&[("uploadType", "multipart"), ("supportsAllDrives", "true"), ("fields", "id")])
            .body(body)
            .send()
            .await
            .map_err(|e| ServiceError::store("create file", e))?;
        let created: Created = ensure_success("create file", resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::store("create file", e))?;
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let resp = self
            .client
            .delete(format!("{}/{}", self.files_url(), id))
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| ServiceError::store("delete", e))?;
        ensure_success("delete", resp).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, id: &str) -> Result<Vec<u8>, ServiceError> {
        let resp = self
            .client
            .get(format!("{}/{}", self.files_url(), id))
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| ServiceError::store("read", e))?;
        let bytes = ensure_success("read", resp)
            .await?
            .bytes()
            .await
            .map_err(|e| ServiceError::store("read", e))?;
        Ok(bytes.to_vec())
    }
}
