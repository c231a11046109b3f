//! In-memory content store.
//!
//! The store holds typed collections of nodes ("content types"), plugin-shared
//! metadata, and resolves references between nodes.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ load_source  │──►│ create_schema│──►│ compile     │──►│ create_pages │
//! │ (mutate)     │   │ (mutate)     │   │ seal()      │   │ (read only)  │
//! └──────────────┘   └──────────────┘   └─────────────┘   └──────────────┘
//!                                              │
//!                                              └── queries read concurrently
//! ```
//!
//! Once sealed, every mutation fails with [`StoreError::Sealed`]; this is what
//! keeps GraphQL resolvers read-only.
//!
//! Every entry remembers the [`Origin`] (plugin and phase) that produced it, so
//! a single plugin's contributions can be retracted and replayed by an
//! incremental rebuild.

mod content_type;
mod node;

pub use content_type::{ContentType, ContentTypeOptions, DuplicatePolicy};
pub use node::{Node, Reference};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::actions::{ActionError, Lease, Origin};
use crate::utils::slug::{create_type_name, slugify};
use content_type::{Collection, NodeTable};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content type `{type_name}` is already registered with a different configuration")]
    DuplicateType { type_name: String },

    #[error("node `{id}` already exists in `{type_name}`")]
    DuplicateNode { type_name: String, id: String },

    #[error("node `{id}` not found in `{type_name}`")]
    NodeNotFound { type_name: String, id: String },

    #[error("invalid node for `{type_name}`: {reason}")]
    InvalidNode { type_name: String, reason: String },

    #[error("the store is sealed: content can only be read after the schema is compiled")]
    Sealed,

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Ordering key of a content type or metadata entry.
type EntryKey = (Origin, u64);

#[derive(Debug, Clone, Default)]
struct TypeTable {
    entries: BTreeMap<EntryKey, Arc<Collection>>,
    by_name: FxHashMap<String, EntryKey>,
    next_seq: u64,
}

#[derive(Debug, Default)]
struct StoreInner {
    types: RwLock<TypeTable>,
    metadata: RwLock<BTreeMap<EntryKey, (String, Value)>>,
    metadata_seq: AtomicU64,
    sealed: AtomicBool,
    duplicates: DuplicatePolicy,
}

/// Saved store contents, put back when an incremental rebuild fails.
#[derive(Debug)]
pub(crate) struct StoreSnapshot {
    types: TypeTable,
    nodes: Vec<(Arc<Collection>, NodeTable)>,
    metadata: BTreeMap<EntryKey, (String, Value)>,
}

/// Shared content store. Cloning is cheap and yields a handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create an empty store that rejects duplicate node ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a default duplicate id policy.
    pub fn with_policy(duplicates: DuplicatePolicy) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                duplicates,
                ..StoreInner::default()
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Content types
    // ------------------------------------------------------------------------

    /// Register a content type, or return the existing one if it was
    /// registered with the same configuration.
    pub fn add_content_type(&self, options: impl Into<ContentTypeOptions>) -> Result<ContentType, StoreError> {
        self.add_content_type_as(options.into(), Origin::HOST, None)
    }

    pub(crate) fn add_content_type_as(
        &self,
        options: ContentTypeOptions,
        origin: Origin,
        lease: Option<Lease>,
    ) -> Result<ContentType, StoreError> {
        if let Some(lease) = &lease {
            lease.check("add_content_type")?;
        }
        self.ensure_writable()?;

        let type_name = create_type_name(&options.type_name);
        let default = self.inner.duplicates;
        let mut table = self.inner.types.write();

        if let Some(key) = table.by_name.get(&type_name) {
            let collection = Arc::clone(&table.entries[key]);
            if !collection.same_config(&options, default) {
                return Err(StoreError::DuplicateType { type_name });
            }
            return Ok(ContentType::new(collection, self.clone(), origin, lease));
        }

        table.next_seq += 1;
        let key = (origin, table.next_seq);
        let collection = Arc::new(Collection::new(type_name.clone(), &options, default, origin));
        table.entries.insert(key, Arc::clone(&collection));
        table.by_name.insert(type_name, key);
        Ok(ContentType::new(collection, self.clone(), origin, lease))
    }

    /// Look up a content type by its sanitized name.
    pub fn get_content_type(&self, type_name: &str) -> Option<ContentType> {
        self.get_content_type_as(type_name, Origin::HOST, None)
    }

    pub(crate) fn get_content_type_as(&self, type_name: &str, origin: Origin, lease: Option<Lease>) -> Option<ContentType> {
        let collection = self.collection(type_name)?;
        Some(ContentType::new(collection, self.clone(), origin, lease))
    }

    pub(crate) fn collection(&self, type_name: &str) -> Option<Arc<Collection>> {
        let table = self.inner.types.read();
        table.by_name.get(type_name).map(|key| Arc::clone(&table.entries[key]))
    }

    /// All content types in stable registration order.
    pub fn content_types(&self) -> Vec<ContentType> {
        self.collections()
            .into_iter()
            .map(|collection| ContentType::new(collection, self.clone(), Origin::HOST, None))
            .collect()
    }

    pub(crate) fn collections(&self) -> Vec<Arc<Collection>> {
        self.inner.types.read().entries.values().cloned().collect()
    }

    /// Remove a content type with all its nodes.
    ///
    /// References into it are not touched; they resolve to null afterwards.
    pub fn remove_content_type(&self, type_name: &str) -> Result<bool, StoreError> {
        self.ensure_writable()?;
        let mut table = self.inner.types.write();
        let Some(key) = table.by_name.remove(type_name) else {
            return Ok(false);
        };
        table.entries.remove(&key);
        Ok(true)
    }

    /// Total number of nodes across all content types.
    pub fn node_count(&self) -> usize {
        self.collections().iter().map(|c| c.len()).sum()
    }

    // ------------------------------------------------------------------------
    // References and naming
    // ------------------------------------------------------------------------

    /// Build a reference value. Existence is checked only at resolve time.
    pub fn create_reference(type_name: impl Into<String>, id: impl Into<String>) -> Reference {
        Reference::new(type_name, id)
    }

    /// Resolve a reference. Dangling references yield `None`.
    pub fn resolve(&self, reference: &Reference) -> Option<Arc<Node>> {
        self.collection(&reference.type_name)?.get(&reference.id)
    }

    /// Sanitize an arbitrary string into a content type name.
    pub fn create_type_name(raw: &str) -> String {
        create_type_name(raw)
    }

    pub fn slugify(text: &str) -> String {
        slugify(text)
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Contribute plugin-shared metadata under `key`.
    ///
    /// Contributions to the same key merge: objects merge their keys
    /// shallowly, arrays append, anything else replaces.
    pub fn add_metadata(&self, key: impl Into<String>, data: Value) -> Result<(), StoreError> {
        self.add_metadata_as(key.into(), data, Origin::HOST, None)
    }

    pub(crate) fn add_metadata_as(&self, key: String, data: Value, origin: Origin, lease: Option<&Lease>) -> Result<(), StoreError> {
        if let Some(lease) = lease {
            lease.check("add_metadata")?;
        }
        self.ensure_writable()?;
        let seq = self.inner.metadata_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.metadata.write().insert((origin, seq), (key, data));
        Ok(())
    }

    /// Merged metadata for `key`.
    pub fn metadata(&self, key: &str) -> Option<Value> {
        let entries = self.inner.metadata.read();
        entries
            .values()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .reduce(merge_metadata)
    }

    /// All merged metadata as one JSON object, keys sorted.
    pub fn all_metadata(&self) -> Value {
        let entries = self.inner.metadata.read();
        let mut merged: BTreeMap<String, Value> = BTreeMap::new();
        for (key, value) in entries.values() {
            let next = match merged.remove(key) {
                Some(current) => merge_metadata(current, value.clone()),
                None => value.clone(),
            };
            merged.insert(key.clone(), next);
        }
        Value::Object(merged.into_iter().collect())
    }

    // ------------------------------------------------------------------------
    // Sealing and retraction
    // ------------------------------------------------------------------------

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.load(Ordering::SeqCst)
    }

    pub(crate) fn seal(&self) {
        self.inner.sealed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn unseal(&self) {
        self.inner.sealed.store(false, Ordering::SeqCst);
    }

    pub(crate) fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.is_sealed() {
            return Err(StoreError::Sealed);
        }
        Ok(())
    }

    /// Capture every content type, node and metadata entry.
    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        let types = self.inner.types.read().clone();
        let nodes = types
            .entries
            .values()
            .map(|collection| (Arc::clone(collection), collection.snapshot()))
            .collect();
        StoreSnapshot {
            types,
            nodes,
            metadata: self.inner.metadata.read().clone(),
        }
    }

    /// Put back a snapshot, dropping everything written since.
    pub(crate) fn restore(&self, snapshot: StoreSnapshot) {
        let StoreSnapshot { types, nodes, metadata } = snapshot;
        for (collection, table) in nodes {
            collection.restore(table);
        }
        *self.inner.types.write() = types;
        *self.inner.metadata.write() = metadata;
    }

    /// Drop everything `origin` contributed: its nodes, its metadata, and the
    /// content types it created that are left empty.
    pub(crate) fn retract(&self, origin: Origin) -> usize {
        let mut removed = 0;
        let mut table = self.inner.types.write();
        let mut emptied = Vec::new();
        for (key, collection) in &table.entries {
            removed += collection.retract(origin);
            if collection.created_by == origin && collection.len() == 0 {
                emptied.push((*key, collection.type_name.clone()));
            }
        }
        for (key, name) in emptied {
            table.entries.remove(&key);
            table.by_name.remove(&name);
        }
        drop(table);

        self.inner.metadata.write().retain(|(o, _), _| *o != origin);
        removed
    }
}

/// Shallow merge of two metadata contributions.
fn merge_metadata(current: Value, next: Value) -> Value {
    match (current, next) {
        (Value::Object(mut current), Value::Object(next)) => {
            current.extend(next);
            Value::Object(current)
        }
        (Value::Array(mut current), Value::Array(next)) => {
            current.extend(next);
            Value::Array(current)
        }
        (_, next) => next,
    }
}
