//! Storage abstractions for service layer
//!
//! `FileStore` is the seam between the roster adapter and a remote
//! hierarchical object store: folders and files addressed by opaque ids,
//! with list/create/delete/read and nothing else (no rename, no
//! conditional writes). Two implementations live here: the Google Drive
//! client and an in-process store used for local runs and tests.

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod google_drive;
pub mod memory;
pub mod token;

/// MIME type Drive uses to mark folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    File,
}

impl EntryKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime == FOLDER_MIME { EntryKind::Folder } else { EntryKind::File }
    }
}

/// A folder or file as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Entries of `kind` named exactly `name`. With `parent = None` the
    /// search is not restricted to a folder.
    async fn find(
        &self,
        parent: Option<&str>,
        name: &str,
        kind: EntryKind,
    ) -> Result<Vec<Entry>, ServiceError>;

    /// Immediate child folders of `parent`.
    async fn list_folders(&self, parent: &str) -> Result<Vec<Entry>, ServiceError>;

    /// Creates a folder and returns its id. Never checks for an existing one.
    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, ServiceError>;

    /// Creates a file with the given content and returns its id.
    async fn create_file(
        &self,
        parent: &str,
        name: &str,
        mime: &str,
        content: Vec<u8>,
    ) -> Result<String, ServiceError>;

    async fn delete(&self, id: &str) -> Result<(), ServiceError>;

    /// Raw content of a file.
    async fn read(&self, id: &str) -> Result<Vec<u8>, ServiceError>;
}
