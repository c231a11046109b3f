//! Content types: named collections of nodes.
//!
//! A [`ContentType`] is a cheap handle to a shared collection. Nodes are kept
//! ordered by `(origin, insertion sequence)`, so a collection that is partly
//! retracted and replayed during an incremental rebuild iterates in the same
//! order as one built from scratch.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::node::{ID_KEY, Node, Reference};
use super::{Store, StoreError};
use crate::actions::{Lease, Origin};
use crate::utils::digest::value_id;
use crate::utils::slug::slugify;

// ============================================================================
// Options
// ============================================================================

/// What happens when a node is added with an id that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`StoreError::DuplicateNode`] (default).
    #[default]
    Reject,
    /// Replace the existing node.
    Overwrite,
}

/// Options for registering a content type.
///
/// # Example
/// ```ignore
/// store.add_content_type(ContentTypeOptions::new("Post").route("/blog/:slug"))?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypeOptions {
    /// Raw type name, sanitized to a GraphQL identifier on registration.
    pub type_name: String,
    /// Path pattern such as `/blog/:year/:slug`; generates each node's `path`.
    pub route: Option<String>,
    /// Per-type duplicate id policy. Falls back to the store default.
    pub duplicates: Option<DuplicatePolicy>,
}

impl ContentTypeOptions {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = Some(policy);
        self
    }
}

impl From<&str> for ContentTypeOptions {
    fn from(type_name: &str) -> Self {
        Self::new(type_name)
    }
}

impl From<String> for ContentTypeOptions {
    fn from(type_name: String) -> Self {
        Self::new(type_name)
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Ordering key of a node inside its collection.
type NodeKey = (Origin, u64);

/// Shared state behind every [`ContentType`] handle of one type.
#[derive(Debug)]
pub(crate) struct Collection {
    pub(crate) type_name: String,
    pub(crate) route: Option<String>,
    pub(crate) duplicates: DuplicatePolicy,
    pub(crate) created_by: Origin,
    nodes: RwLock<NodeTable>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NodeTable {
    entries: BTreeMap<NodeKey, Arc<Node>>,
    by_id: FxHashMap<String, NodeKey>,
    by_path: FxHashMap<String, NodeKey>,
    next_seq: u64,
    /// Lazily built field indexes: field → encoded value → keys.
    /// Dropped on every mutation.
    indexes: FxHashMap<String, FxHashMap<String, Vec<NodeKey>>>,
}

impl NodeTable {
    fn insert(&mut self, key: NodeKey, node: Arc<Node>) {
        self.by_id.insert(node.id().to_owned(), key);
        if let Some(path) = node.path() {
            self.by_path.insert(path.to_owned(), key);
        }
        self.entries.insert(key, node);
        self.indexes.clear();
    }

    fn remove(&mut self, key: NodeKey) -> Option<Arc<Node>> {
        let node = self.entries.remove(&key)?;
        self.by_id.remove(node.id());
        if let Some(path) = node.path()
            && self.by_path.get(path) == Some(&key)
        {
            self.by_path.remove(path);
        }
        self.indexes.clear();
        Some(node)
    }

    fn next_key(&mut self, origin: Origin) -> NodeKey {
        self.next_seq += 1;
        (origin, self.next_seq)
    }

    fn build_index(&self, field: &str) -> FxHashMap<String, Vec<NodeKey>> {
        let mut index: FxHashMap<String, Vec<NodeKey>> = FxHashMap::default();
        for (key, node) in &self.entries {
            let Some(value) = node.get(field) else {
                continue;
            };
            index.entry(index_key(value)).or_default().push(*key);
            // Arrays are also indexed per element, giving "contains" lookups.
            if let Value::Array(items) = value {
                for item in items {
                    index.entry(index_key(item)).or_default().push(*key);
                }
            }
        }
        index
    }
}

/// Encoded form of a value inside a field index.
///
/// References are indexed by their id, so `find_nodes("author", "1")` matches
/// a stored `{ typeName: "Author", id: "1" }`.
fn index_key(value: &Value) -> String {
    match Reference::from_value(value) {
        Some(reference) => Value::String(reference.id).to_string(),
        None => value.to_string(),
    }
}

impl Collection {
    pub(crate) fn new(type_name: String, options: &ContentTypeOptions, default: DuplicatePolicy, created_by: Origin) -> Self {
        Self {
            type_name,
            route: options.route.clone(),
            duplicates: options.duplicates.unwrap_or(default),
            created_by,
            nodes: RwLock::new(NodeTable::default()),
        }
    }

    /// Whether `options` describe this collection's configuration.
    pub(crate) fn same_config(&self, options: &ContentTypeOptions, default: DuplicatePolicy) -> bool {
        self.route == options.route && self.duplicates == options.duplicates.unwrap_or(default)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<Node>> {
        let table = self.nodes.read();
        table.by_id.get(id).and_then(|key| table.entries.get(key)).cloned()
    }

    pub(crate) fn all(&self) -> Vec<Arc<Node>> {
        self.nodes.read().entries.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.read().entries.len()
    }

    pub(crate) fn snapshot(&self) -> NodeTable {
        self.nodes.read().clone()
    }

    pub(crate) fn restore(&self, table: NodeTable) {
        *self.nodes.write() = table;
    }

    /// Drop every node contributed by `origin`. Returns the number removed.
    pub(crate) fn retract(&self, origin: Origin) -> usize {
        let mut table = self.nodes.write();
        let keys: Vec<NodeKey> = table
            .entries
            .range((origin, 0)..=(origin, u64::MAX))
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            table.remove(*key);
        }
        keys.len()
    }

    fn route_path(&self, id: &str, fields: &Map<String, Value>) -> Option<String> {
        let route = self.route.as_deref()?;
        let path = route
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(ID_KEY) => id.to_owned(),
                Some(param) => fields.get(param).map(route_param).unwrap_or_default(),
                None => segment.to_owned(),
            })
            .collect::<Vec<_>>()
            .join("/");
        Some(path)
    }
}

/// Render a node field as a route segment.
fn route_param(value: &Value) -> String {
    match value {
        Value::String(s) => slugify(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Handle to a content type.
///
/// Handles obtained through plugin actions carry the plugin's origin and
/// phase lease: nodes they add are attributed to that plugin, and mutations
/// fail once the phase is over or the store is sealed.
#[derive(Debug, Clone)]
pub struct ContentType {
    collection: Arc<Collection>,
    store: Store,
    origin: Origin,
    lease: Option<Lease>,
}

impl ContentType {
    pub(crate) fn new(collection: Arc<Collection>, store: Store, origin: Origin, lease: Option<Lease>) -> Self {
        Self {
            collection,
            store,
            origin,
            lease,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.collection.type_name
    }

    pub fn route(&self) -> Option<&str> {
        self.collection.route.as_deref()
    }

    pub fn options(&self) -> ContentTypeOptions {
        ContentTypeOptions {
            type_name: self.collection.type_name.clone(),
            route: self.collection.route.clone(),
            duplicates: Some(self.collection.duplicates),
        }
    }

    fn ensure_writable(&self, action: &'static str) -> Result<(), StoreError> {
        if let Some(lease) = &self.lease {
            lease.check(action)?;
        }
        self.store.ensure_writable()
    }

    /// Insert a node.
    ///
    /// `id` may be a string or a number; when absent, an id is derived from
    /// the node's content. With a route, the node's `path` is generated.
    pub fn add_node(&self, fields: Value) -> Result<Arc<Node>, StoreError> {
        self.ensure_writable("add_node")?;
        let (id, fields) = self.prepare(fields)?;

        let mut table = self.collection.nodes.write();
        let existing = table.by_id.get(&id).copied();
        if existing.is_some() && self.collection.duplicates == DuplicatePolicy::Reject {
            return Err(StoreError::DuplicateNode {
                type_name: self.type_name().to_owned(),
                id,
            });
        }
        if let Some(key) = existing {
            table.remove(key);
        }

        let node = Arc::new(Node::new(self.type_name(), id, fields, self.origin));
        let key = table.next_key(self.origin);
        table.insert(key, Arc::clone(&node));
        Ok(node)
    }

    /// Replace an existing node. Fails with [`StoreError::NodeNotFound`].
    ///
    /// The node keeps its position and its owner: it still belongs to the
    /// plugin that added it, whose rebuild retracts and replays it.
    pub fn update_node(&self, fields: Value) -> Result<Arc<Node>, StoreError> {
        self.ensure_writable("update_node")?;
        let (id, fields) = self.prepare(fields)?;

        let mut table = self.collection.nodes.write();
        let Some(key) = table.by_id.get(&id).copied() else {
            return Err(StoreError::NodeNotFound {
                type_name: self.type_name().to_owned(),
                id,
            });
        };
        table.remove(key);

        let node = Arc::new(Node::new(self.type_name(), id, fields, key.0));
        table.insert(key, Arc::clone(&node));
        Ok(node)
    }

    /// Remove a node by id. Removing an absent node is a no-op.
    pub fn remove_node(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_writable("remove_node")?;
        let mut table = self.collection.nodes.write();
        let Some(key) = table.by_id.get(id).copied() else {
            return Ok(false);
        };
        Ok(table.remove(key).is_some())
    }

    pub fn get_node(&self, id: &str) -> Option<Arc<Node>> {
        self.collection.get(id)
    }

    pub fn get_node_by_path(&self, path: &str) -> Option<Arc<Node>> {
        let table = self.collection.nodes.read();
        table.by_path.get(path).and_then(|key| table.entries.get(key)).cloned()
    }

    /// All nodes in stable order.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.collection.all()
    }

    /// Nodes whose `field` equals `value` (or contains it, for arrays).
    pub fn find_nodes(&self, field: &str, value: &Value) -> Vec<Arc<Node>> {
        let wanted = index_key(value);
        {
            let table = self.collection.nodes.read();
            if let Some(index) = table.indexes.get(field) {
                return collect_keys(&table.entries, index.get(&wanted));
            }
        }

        let mut table = self.collection.nodes.write();
        if !table.indexes.contains_key(field) {
            let index = table.build_index(field);
            table.indexes.insert(field.to_owned(), index);
        }
        let index = &table.indexes[field];
        collect_keys(&table.entries, index.get(&wanted))
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reference to a node of this type. Does not check existence.
    pub fn create_reference(&self, id: impl Into<String>) -> Reference {
        Reference::new(self.type_name(), id)
    }

    /// Validate fields and extract the normalized id.
    fn prepare(&self, fields: Value) -> Result<(String, Map<String, Value>), StoreError> {
        let Value::Object(mut fields) = fields else {
            return Err(StoreError::InvalidNode {
                type_name: self.type_name().to_owned(),
                reason: "node must be a JSON object".into(),
            });
        };

        let id = match fields.get(ID_KEY) {
            None | Some(Value::Null) => value_id(&Value::Object(fields.clone())),
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => {
                return Err(StoreError::InvalidNode {
                    type_name: self.type_name().to_owned(),
                    reason: format!("`id` must be a non-empty string or a number, got {other}"),
                });
            }
        };

        if let Some(path) = self.collection.route_path(&id, &fields) {
            fields.insert("path".to_owned(), Value::String(path));
        }
        Ok((id, fields))
    }
}

fn collect_keys(entries: &BTreeMap<NodeKey, Arc<Node>>, keys: Option<&Vec<NodeKey>>) -> Vec<Arc<Node>> {
    let mut keys: Vec<NodeKey> = keys.cloned().unwrap_or_default();
    keys.sort_unstable();
    keys.dedup();
    keys.iter().filter_map(|key| entries.get(key)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts(store: &Store) -> ContentType {
        store.add_content_type("Post").unwrap()
    }

    #[test]
    fn test_add_and_get_node() {
        let store = Store::new();
        let posts = posts(&store);
        posts.add_node(json!({ "id": "1", "title": "Hello" })).unwrap();

        let node = posts.get_node("1").unwrap();
        assert_eq!(node.type_name(), "Post");
        assert_eq!(node.get("title"), Some(&json!("Hello")));
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let store = Store::new();
        let posts = posts(&store);
        let node = posts.add_node(json!({ "id": 42 })).unwrap();
        assert_eq!(node.id(), "42");
        assert!(posts.get_node("42").is_some());
    }

    #[test]
    fn test_missing_id_is_assigned_from_content() {
        let store = Store::new();
        let posts = posts(&store);
        let a = posts.add_node(json!({ "title": "A" })).unwrap();
        let b = posts.add_node(json!({ "title": "B" })).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 32);
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let store = Store::new();
        let err = posts(&store).add_node(json!({ "id": { "x": 1 } })).unwrap_err();
        assert!(matches!(err, StoreError::InvalidNode { .. }));
        let err = posts(&store).add_node(json!([1, 2])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidNode { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected_by_default() {
        let store = Store::new();
        let posts = posts(&store);
        posts.add_node(json!({ "id": "1" })).unwrap();
        let err = posts.add_node(json!({ "id": "1" })).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateNode { .. }));
    }

    #[test]
    fn test_duplicate_id_overwrites_with_policy() {
        let store = Store::new();
        let posts = store
            .add_content_type(ContentTypeOptions::new("Post").duplicates(DuplicatePolicy::Overwrite))
            .unwrap();
        posts.add_node(json!({ "id": "1", "title": "Old" })).unwrap();
        posts.add_node(json!({ "id": "1", "title": "New" })).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts.get_node("1").unwrap().get("title"), Some(&json!("New")));
    }

    #[test]
    fn test_update_requires_existing_node() {
        let store = Store::new();
        let posts = posts(&store);
        let err = posts.update_node(json!({ "id": "9" })).unwrap_err();
        assert!(matches!(err, StoreError::NodeNotFound { .. }));

        posts.add_node(json!({ "id": "1", "title": "A" })).unwrap();
        posts.add_node(json!({ "id": "2", "title": "B" })).unwrap();
        posts.update_node(json!({ "id": "1", "title": "A2" })).unwrap();
        let titles: Vec<_> = posts.nodes().iter().map(|n| n.get("title").cloned()).collect();
        assert_eq!(titles, vec![Some(json!("A2")), Some(json!("B"))]);
    }

    #[test]
    fn test_remove_node_is_idempotent() {
        let store = Store::new();
        let posts = posts(&store);
        posts.add_node(json!({ "id": "1" })).unwrap();
        assert!(posts.remove_node("1").unwrap());
        assert!(!posts.remove_node("1").unwrap());
        assert!(posts.is_empty());
    }

    #[test]
    fn test_route_generates_path() {
        let store = Store::new();
        let posts = store
            .add_content_type(ContentTypeOptions::new("Post").route("/blog/:slug/:id"))
            .unwrap();
        let node = posts.add_node(json!({ "id": "7", "slug": "Hello World" })).unwrap();
        assert_eq!(node.path(), Some("/blog/hello-world/7"));
        assert_eq!(posts.get_node_by_path("/blog/hello-world/7").unwrap().id(), "7");
    }

    #[test]
    fn test_find_nodes_by_field() {
        let store = Store::new();
        let posts = posts(&store);
        posts.add_node(json!({ "id": "1", "tags": ["rust", "web"], "author": { "typeName": "Author", "id": "a" } })).unwrap();
        posts.add_node(json!({ "id": "2", "tags": ["go"], "author": { "typeName": "Author", "id": "b" } })).unwrap();

        let rust = posts.find_nodes("tags", &json!("rust"));
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].id(), "1");

        let by_author = posts.find_nodes("author", &json!("b"));
        assert_eq!(by_author[0].id(), "2");

        // Index is invalidated by mutation
        posts.add_node(json!({ "id": "3", "tags": ["rust"] })).unwrap();
        assert_eq!(posts.find_nodes("tags", &json!("rust")).len(), 2);
    }

    #[test]
    fn test_retract_removes_only_origin_nodes() {
        use crate::actions::Phase;
        let store = Store::new();
        let posts = posts(&store);
        let a = Origin::new(0, Phase::LoadSource);
        let b = Origin::new(1, Phase::LoadSource);
        let as_a = ContentType::new(Arc::clone(&posts.collection), store.clone(), a, None);
        let as_b = ContentType::new(Arc::clone(&posts.collection), store.clone(), b, None);
        as_a.add_node(json!({ "id": "1" })).unwrap();
        as_b.add_node(json!({ "id": "2" })).unwrap();

        assert_eq!(posts.collection.retract(a), 1);
        assert!(posts.get_node("1").is_none());
        assert!(posts.get_node("2").is_some());
    }

    #[test]
    fn test_update_keeps_owner() {
        use crate::actions::Phase;
        let store = Store::new();
        let posts = posts(&store);
        let a = Origin::new(0, Phase::LoadSource);
        let b = Origin::new(1, Phase::LoadSource);
        let as_a = ContentType::new(Arc::clone(&posts.collection), store.clone(), a, None);
        let as_b = ContentType::new(Arc::clone(&posts.collection), store.clone(), b, None);
        as_a.add_node(json!({ "id": "1", "title": "A" })).unwrap();

        let updated = as_b.update_node(json!({ "id": "1", "title": "B" })).unwrap();
        assert_eq!(updated.origin, a);
        assert_eq!(posts.collection.retract(b), 0);
        assert_eq!(posts.collection.retract(a), 1);
        assert!(posts.is_empty());
    }

    #[test]
    fn test_snapshot_restores_nodes() {
        let store = Store::new();
        let posts = posts(&store);
        posts.add_node(json!({ "id": "1" })).unwrap();
        let snapshot = posts.collection.snapshot();

        posts.remove_node("1").unwrap();
        posts.add_node(json!({ "id": "2" })).unwrap();
        posts.collection.restore(snapshot);
        assert!(posts.get_node("1").is_some());
        assert!(posts.get_node("2").is_none());
        assert_eq!(posts.find_nodes("id", &json!("1")).len(), 1);
    }
}
