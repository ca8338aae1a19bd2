//! Roster adapter: maps schools and their student lists onto folders and
//! JSON files of a `FileStore`.
//!
//! Layout: `<root>/<schoolName>/students.json` and `<root>/<schoolName>/meta.json`.
//! Nothing here locks or coordinates; concurrent writers race and the
//! store's last write wins.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::observability;
use crate::storage::{EntryKind, FileStore, JSON_MIME};

pub mod domain;
pub mod root;

pub use domain::{Metadata, Roster, RosterRead, SchoolRoster, METADATA_FILE, ROSTER_FILE};
pub use root::RootLocator;

#[derive(Clone)]
pub struct RosterStore {
    store: Arc<dyn FileStore>,
    root: RootLocator,
}

impl RosterStore {
    pub fn new(store: Arc<dyn FileStore>, root: RootLocator) -> Self {
        Self { store, root }
    }

    /// Id of the container every school folder lives in.
    #[instrument(skip(self), fields(root = %self.root))]
    pub async fn resolve_root(&self) -> Result<String, ServiceError> {
        let res = self.root.resolve(self.store.as_ref()).await;
        observability::record("resolve_root", &res);
        res
    }

    /// Returns the first folder named `name` under `parent_id`, creating one
    /// if none exists. Two concurrent callers can both miss and both create,
    /// leaving duplicate folders; later lookups then use the first listed.
    #[instrument(skip(self))]
    pub async fn get_or_create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, ServiceError> {
        let res = self.get_or_create_folder_inner(name, parent_id).await;
        observability::record("get_or_create_folder", &res);
        res
    }

    async fn get_or_create_folder_inner(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<String, ServiceError> {
        let existing = self.store.find(Some(parent_id), name, EntryKind::Folder).await?;
        if existing.len() > 1 {
            warn!(folder = name, count = existing.len(), "duplicate folders share this name; using the first");
        }
        if let Some(first) = existing.into_iter().next() {
            return Ok(first.id);
        }
        let id = self.store.create_folder(parent_id, name).await?;
        info!(folder = name, %id, "created folder");
        Ok(id)
    }

    /// Replaces `file_name` under `parent_id` with `data` serialised as JSON.
    ///
    /// Not atomic: existing files are deleted before the new one is created,
    /// so a failure in between leaves no file and readers may briefly see
    /// none. No retry is attempted.
    #[instrument(skip(self, data))]
    pub async fn write_json<T>(
        &self,
        parent_id: &str,
        file_name: &str,
        data: &T,
    ) -> Result<(), ServiceError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let res = self.write_json_inner(parent_id, file_name, data).await;
        observability::record("write_json", &res);
        res
    }

    async fn write_json_inner<T>(
        &self,
        parent_id: &str,
        file_name: &str,
        data: &T,
    ) -> Result<(), ServiceError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let content = serde_json::to_vec(data).map_err(|e| ServiceError::store("serialize", e))?;
        for old in self.store.find(Some(parent_id), file_name, EntryKind::File).await? {
            self.store.delete(&old.id).await?;
        }
        self.store.create_file(parent_id, file_name, JSON_MIME, content).await?;
        Ok(())
    }

    /// Parsed content of `file_name` under `parent_id`, `None` if there is no such file.
    #[instrument(skip(self))]
    pub async fn read_json<T>(&self, parent_id: &str, file_name: &str) -> Result<Option<T>, ServiceError>
    where
        T: DeserializeOwned,
    {
        let res = self.read_json_inner(parent_id, file_name).await;
        observability::record("read_json", &res);
        res
    }

    async fn read_json_inner<T>(
        &self,
        parent_id: &str,
        file_name: &str,
    ) -> Result<Option<T>, ServiceError>
    where
        T: DeserializeOwned,
    {
        let found = self.store.find(Some(parent_id), file_name, EntryKind::File).await?;
        let Some(file) = found.into_iter().next() else {
            return Ok(None);
        };
        let bytes = self.store.read(&file.id).await?;
        let parsed = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::store(&format!("parse {file_name}"), e))?;
        Ok(Some(parsed))
    }

    /// Writes the roster, then the metadata. A metadata failure is reported
    /// but the new roster stays in place.
    #[instrument(skip(self, roster), fields(school = %roster.school_name, students = roster.students.len()))]
    pub async fn save_school(&self, roster: &SchoolRoster) -> Result<(), ServiceError> {
        let root = self.resolve_root().await?;
        let folder = self.get_or_create_folder(&roster.school_name, &root).await?;
        self.write_json(&folder, ROSTER_FILE, &roster.students).await?;
        let meta = Metadata { school_name: roster.school_name.clone(), uploaded_at: chrono::Utc::now() };
        self.write_json(&folder, METADATA_FILE, &meta).await?;
        info!("roster saved");
        Ok(())
    }

    /// Names of the folders directly under the root, in store order.
    #[instrument(skip(self))]
    pub async fn list_schools(&self) -> Result<Vec<String>, ServiceError> {
        let root = self.resolve_root().await?;
        let res = self.store.list_folders(&root).await;
        observability::record("list_folders", &res);
        Ok(res?.into_iter().map(|e| e.name).collect())
    }

    /// The school's roster. Resolving the school folder creates it when
    /// missing, so reading an unknown school leaves an empty folder behind.
    #[instrument(skip(self))]
    pub async fn fetch_roster(&self, school_name: &str) -> Result<RosterRead, ServiceError> {
        let root = self.resolve_root().await?;
        let folder = self.get_or_create_folder(school_name, &root).await?;
        Ok(match self.read_json::<Roster>(&folder, ROSTER_FILE).await? {
            Some(students) => RosterRead::Saved(students),
            None => RosterRead::NeverSaved,
        })
    }

    /// Last saved metadata of a school, if the school folder and `meta.json` exist.
    /// Unlike `fetch_roster` this never creates anything.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self, school_name: &str) -> Result<Option<Metadata>, ServiceError> {
        let root = self.resolve_root().await?;
        let folders = self.store.find(Some(root.as_str()), school_name, EntryKind::Folder).await?;
        let Some(folder) = folders.into_iter().next() else {
            return Ok(None);
        };
        self.read_json::<Metadata>(&folder.id, METADATA_FILE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    fn roster_store(root: RootLocator) -> (RosterStore, MemoryStore) {
        let mem = MemoryStore::new();
        (RosterStore::new(Arc::new(mem.clone()), root), mem)
    }

    fn lincoln(students: serde_json::Value) -> SchoolRoster {
        SchoolRoster::from_value(&json!({"schoolName": "Lincoln High", "students": students}))
            .expect("valid roster")
    }

    #[tokio::test]
    async fn configured_root_needs_no_lookup() -> Result<(), anyhow::Error> {
        let (rs, mem) = roster_store(RootLocator::Configured("drive-1".into()));
        assert_eq!(rs.resolve_root().await?, "drive-1");
        assert_eq!(mem.mutation_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn named_root_is_found_or_reported_missing() -> Result<(), anyhow::Error> {
        let (rs, mem) = roster_store(RootLocator::Named("Schools".into()));
        let err = rs.resolve_root().await.unwrap_err();
        assert!(matches!(err, ServiceError::RootNotFound(ref n) if n == "Schools"));

        let id = mem.seed_folder("Schools").await;
        assert_eq!(rs.resolve_root().await?, id);
        Ok(())
    }

    #[tokio::test]
    async fn get_or_create_folder_is_idempotent_when_sequential() -> Result<(), anyhow::Error> {
        let (rs, mem) = roster_store(RootLocator::Configured("root".into()));
        let a = rs.get_or_create_folder("Lincoln High", "root").await?;
        let b = rs.get_or_create_folder("Lincoln High", "root").await?;
        assert_eq!(a, b);
        assert_eq!(mem.list_folders("root").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn get_or_create_folder_prefers_first_duplicate() -> Result<(), anyhow::Error> {
        let (rs, mem) = roster_store(RootLocator::Configured("root".into()));
        let first = mem.create_folder("root", "Dup").await?;
        mem.create_folder("root", "Dup").await?;
        assert_eq!(rs.get_or_create_folder("Dup", "root").await?, first);
        Ok(())
    }

    #[tokio::test]
    async fn read_json_of_missing_file_is_none() -> Result<(), anyhow::Error> {
        let (rs, _mem) = roster_store(RootLocator::Configured("root".into()));
        let v: Option<Roster> = rs.read_json("root", ROSTER_FILE).await?;
        assert!(v.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn write_json_replaces_every_existing_copy() -> Result<(), anyhow::Error> {
        let (rs, mem) = roster_store(RootLocator::Configured("root".into()));
        mem.create_file("root", "x.json", JSON_MIME, b"[1]".to_vec()).await?;
        mem.create_file("root", "x.json", JSON_MIME, b"[2]".to_vec()).await?;
        rs.write_json("root", "x.json", &json!([3])).await?;

        assert_eq!(mem.find(Some("root"), "x.json", EntryKind::File).await?.len(), 1);
        let v: Option<serde_json::Value> = rs.read_json("root", "x.json").await?;
        assert_eq!(v, Some(json!([3])));
        Ok(())
    }

    #[tokio::test]
    async fn save_then_fetch_round_trips() -> Result<(), anyhow::Error> {
        let (rs, _mem) = roster_store(RootLocator::Configured("root".into()));
        rs.save_school(&lincoln(json!([{"id": 1, "name": "Ann"}]))).await?;
        let got = rs.fetch_roster("Lincoln High").await?;
        assert_eq!(got, RosterRead::Saved(vec![json!({"id": 1, "name": "Ann"})]));

        let meta = rs.fetch_metadata("Lincoln High").await?.expect("metadata written");
        assert_eq!(meta.school_name, "Lincoln High");
        Ok(())
    }

    #[tokio::test]
    async fn second_save_replaces_first() -> Result<(), anyhow::Error> {
        let (rs, _mem) = roster_store(RootLocator::Configured("root".into()));
        rs.save_school(&lincoln(json!([{"id": 1}, {"id": 2}]))).await?;
        rs.save_school(&lincoln(json!([{"id": 3}]))).await?;
        assert_eq!(rs.fetch_roster("Lincoln High").await?.into_students(), vec![json!({"id": 3})]);
        assert_eq!(rs.list_schools().await?, vec!["Lincoln High".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn fetching_unknown_school_creates_empty_folder() -> Result<(), anyhow::Error> {
        let (rs, _mem) = roster_store(RootLocator::Configured("root".into()));
        assert_eq!(rs.fetch_roster("Nowhere").await?, RosterRead::NeverSaved);
        assert_eq!(rs.list_schools().await?, vec!["Nowhere".to_string()]);
        assert!(rs.fetch_metadata("Nowhere").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let (rs, mem) = roster_store(RootLocator::Configured("root".into()));
        mem.set_failing(true);
        assert!(matches!(rs.list_schools().await, Err(ServiceError::StoreOperationFailed(_))));
        assert!(matches!(rs.fetch_roster("A").await, Err(ServiceError::StoreOperationFailed(_))));
    }
}
