use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Entry, EntryKind, FileStore};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
struct MemEntry {
    id: String,
    parent: Option<String>,
    name: String,
    kind: EntryKind,
    content: Vec<u8>,
}

impl MemEntry {
    fn to_entry(&self) -> Entry {
        Entry { id: self.id.clone(), name: self.name.clone(), kind: self.kind }
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    // creation order is kept so listings are stable
    entries: Vec<MemEntry>,
}

/// In-process object store with the same semantics as the remote one:
/// duplicate names are allowed, nothing is atomic across calls, and a
/// parent id does not have to exist before children are created under it
/// (shared-drive ids are not folders either).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    mutations: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a folder outside any parent, e.g. a root to be discovered by name.
    pub async fn seed_folder(&self, name: &str) -> String {
        let mut inner = self.inner.write().await;
        Self::insert(&mut inner, None, name, EntryKind::Folder, Vec::new())
    }

    /// Number of create/delete calls that reached the store.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail until switched off again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::store(op, "memory store unavailable"));
        }
        Ok(())
    }

    fn insert(
        inner: &mut Inner,
        parent: Option<&str>,
        name: &str,
        kind: EntryKind,
        content: Vec<u8>,
    ) -> String {
        inner.next_id += 1;
        let id = format!("mem-{:06}", inner.next_id);
        inner.entries.push(MemEntry {
            id: id.clone(),
            parent: parent.map(str::to_string),
            name: name.to_string(),
            kind,
            content,
        });
        id
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn find(
        &self,
        parent: Option<&str>,
        name: &str,
        kind: EntryKind,
    ) -> Result<Vec<Entry>, ServiceError> {
        self.check("find")?;
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.kind == kind && e.name == name)
            .filter(|e| parent.map_or(true, |p| e.parent.as_deref() == Some(p)))
            .map(MemEntry::to_entry)
            .collect())
    }

    async fn list_folders(&self, parent: &str) -> Result<Vec<Entry>, ServiceError> {
        self.check("list")?;
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Folder && e.parent.as_deref() == Some(parent))
            .map(MemEntry::to_entry)
            .collect())
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, ServiceError> {
        self.check("create folder")?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().await;
        Ok(Self::insert(&mut inner, Some(parent), name, EntryKind::Folder, Vec::new()))
    }

    async fn create_file(
        &self,
        parent: &str,
        name: &str,
        _mime: &str,
        content: Vec<u8>,
    ) -> Result<String, ServiceError> {
        self.check("create file")?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().await;
        Ok(Self::insert(&mut inner, Some(parent), name, EntryKind::File, content))
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.check("delete")?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        if inner.entries.len() == before {
            return Err(ServiceError::store("delete", format!("file not found: {id}")));
        }
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Vec<u8>, ServiceError> {
        self.check("read")?;
        let inner = self.inner.read().await;
        inner
            .entries
            .iter()
            .find(|e| e.id == id && e.kind == EntryKind::File)
            .map(|e| e.content.clone())
            .ok_or_else(|| ServiceError::store("read", format!("file not found: {id}")))
    }
}
