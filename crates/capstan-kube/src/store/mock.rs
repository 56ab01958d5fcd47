//! Mock object store for testing
//!
//! This store keeps objects in memory, useful for unit tests
//! without requiring a Kubernetes cluster.

use async_trait::async_trait;
use kube::api::DynamicObject;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{ObjectKey, ObjectStore};
use crate::error::{KubeError, Result};

/// Ordered record of writes, shareable between test doubles
#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    events: Arc<RwLock<Vec<String>>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.write().unwrap().push(event.into());
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<String> {
        self.events.read().unwrap().clone()
    }

    /// Position of the first event starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.events
            .read()
            .unwrap()
            .iter()
            .position(|e| e.starts_with(prefix))
    }
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub reads: usize,
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
}

/// In-memory object store for testing
#[derive(Clone)]
pub struct MockObjectStore {
    objects: Arc<RwLock<BTreeMap<ObjectKey, DynamicObject>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    journal: EventJournal,
    revision: Arc<RwLock<u64>>,
}

impl MockObjectStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            operations: Arc::new(RwLock::new(OperationCounts::default())),
            journal: EventJournal::new(),
            revision: Arc::new(RwLock::new(0)),
        }
    }

    /// Create with pre-populated objects
    ///
    /// Seeding does not count as an operation and is not journaled.
    pub fn with_objects(objects: Vec<DynamicObject>) -> Result<Self> {
        let store = Self::new();
        store.insert_all(objects)?;
        Ok(store)
    }

    /// Record writes into a shared journal
    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = journal;
        self
    }

    /// Seed objects, overwriting existing ones
    pub fn insert_all(&self, objects: Vec<DynamicObject>) -> Result<()> {
        let mut store = self.objects.write().unwrap();
        for obj in objects {
            store.insert(ObjectKey::from_object(&obj)?, obj);
        }
        Ok(())
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Stored object, bypassing counters
    pub fn object(&self, key: &ObjectKey) -> Option<DynamicObject> {
        self.objects.read().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    fn next_revision(&self) -> String {
        let mut rev = self.revision.write().unwrap();
        *rev += 1;
        rev.to_string()
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn read(&self, key: &ObjectKey) -> Result<Option<DynamicObject>> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.reads += 1;
        }

        Ok(self.objects.read().unwrap().get(key).cloned())
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.lists += 1;
        }

        let store = self.objects.read().unwrap();
        Ok(store
            .iter()
            .filter(|(key, _)| key.api_version == api_version && key.kind == kind)
            .filter(|(key, _)| namespace.is_none() || key.namespace.as_deref() == namespace)
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.creates += 1;
        }

        let key = ObjectKey::from_object(obj)?;
        if self.objects.read().unwrap().contains_key(&key) {
            return Err(KubeError::AlreadyExists {
                key: key.to_string(),
            });
        }

        let mut stored = obj.clone();
        stored.metadata.resource_version = Some(self.next_revision());
        self.journal.record(format!("create {key}"));
        self.objects.write().unwrap().insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, obj: &DynamicObject) -> Result<DynamicObject> {
        {
            let mut ops = self.operations.write().unwrap();
            ops.updates += 1;
        }

        let key = ObjectKey::from_object(obj)?;
        if !self.objects.read().unwrap().contains_key(&key) {
            return Err(KubeError::ObjectNotFound {
                key: key.to_string(),
            });
        }

        let mut stored = obj.clone();
        stored.metadata.resource_version = Some(self.next_revision());
        self.journal.record(format!("update {key}"));
        self.objects.write().unwrap().insert(key, stored.clone());
        Ok(stored)
    }
}
