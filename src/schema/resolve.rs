//! Field resolvers.
//!
//! A resolver receives the parent value, the field arguments (defaults
//! applied) and a read-only context exposing the store. Resolvers are shared
//! `Arc<dyn Fn>` values with no mutable state, so concurrent queries can call
//! them freely.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::ArgDef;
use crate::store::{Node, Reference, Store, StoreError};

/// Custom field resolution logic.
pub type Resolver = Arc<dyn Fn(&Source, &Args, &ResolveContext<'_>) -> Result<Resolved, ResolveError> + Send + Sync>;

/// Wrap a closure as a [`Resolver`].
pub fn resolver<F>(f: F) -> Resolver
where
    F: Fn(&Source, &Args, &ResolveContext<'_>) -> Result<Resolved, ResolveError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Failure inside a resolver; reported as a GraphQL error entry.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    Message(String),

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        ResolveError::Message(message.into())
    }

    pub(crate) fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        ResolveError::InvalidArgument {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// Parent value of a field.
#[derive(Debug, Clone)]
pub enum Source {
    /// Root query or mutation.
    Root,
    Node(Arc<Node>),
    /// Plain JSON object, e.g. a nested object field or a resolver result.
    Object(Arc<Map<String, Value>>),
}

impl Source {
    /// Raw value stored under a data key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Source::Root => None,
            Source::Node(node) => node.get(key),
            Source::Object(map) => map.get(key),
        }
    }

    pub fn node(&self) -> Option<&Arc<Node>> {
        match self {
            Source::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// Value returned by a resolver.
///
/// The compiled schema converts it according to the field's declared type:
/// reference objects and bare ids become nodes for object fields, and a
/// dangling reference becomes null.
#[derive(Debug, Clone, Default)]
pub enum Resolved {
    #[default]
    Null,
    Value(Value),
    Node(Arc<Node>),
    List(Vec<Resolved>),
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

impl From<Arc<Node>> for Resolved {
    fn from(node: Arc<Node>) -> Self {
        Resolved::Node(node)
    }
}

impl From<Reference> for Resolved {
    fn from(reference: Reference) -> Self {
        Resolved::Value(reference.to_value())
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map_or(Resolved::Null, Into::into)
    }
}

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(items: Vec<T>) -> Self {
        Resolved::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_from_json {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Resolved {
                fn from(value: $ty) -> Self {
                    Resolved::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_json!(&str, String, bool, i32, i64, f64);

/// Field arguments, with declared defaults applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Argument value; explicit `null` reads as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Read-only context handed to resolvers.
pub struct ResolveContext<'a> {
    pub(crate) store: &'a Store,
    pub(crate) type_name: &'a str,
    pub(crate) field_name: &'a str,
    pub(crate) data_key: &'a str,
}

impl<'a> ResolveContext<'a> {
    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// Type owning the field being resolved.
    pub fn parent_type(&self) -> &str {
        self.type_name
    }

    pub fn field_name(&self) -> &str {
        self.field_name
    }

    /// Raw node key behind the field; differs from the field name when the
    /// key is not a valid GraphQL identifier.
    pub fn data_key(&self) -> &str {
        self.data_key
    }
}

// ============================================================================
// Resolver maps
// ============================================================================

/// Resolver plus optional type override for one field.
#[derive(Clone, Default)]
pub struct FieldResolver {
    pub ty: Option<String>,
    pub args: Vec<ArgDef>,
    pub description: Option<String>,
    pub resolve: Option<Resolver>,
}

impl FieldResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ty(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn arg(mut self, arg: ArgDef) -> Self {
        self.args.push(arg);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn resolve<F>(mut self, f: F) -> Self
    where
        F: Fn(&Source, &Args, &ResolveContext<'_>) -> Result<Resolved, ResolveError> + Send + Sync + 'static,
    {
        self.resolve = Some(resolver(f));
        self
    }
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldResolver")
            .field("ty", &self.ty)
            .field("args", &self.args)
            .field("resolve", &self.resolve.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// `TypeName.fieldName` → resolver.
///
/// Fields may be addressed by their GraphQL name or by the raw node key
/// (`"456-test"` and `"_456_test"` address the same field).
#[derive(Debug, Clone, Default)]
pub struct ResolverMap {
    types: BTreeMap<String, BTreeMap<String, FieldResolver>>,
}

impl ResolverMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, type_name: impl Into<String>, field: impl Into<String>, resolver: FieldResolver) -> Self {
        self.types
            .entry(type_name.into())
            .or_default()
            .insert(field.into(), resolver);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str, &FieldResolver)> {
        self.types.iter().flat_map(|(type_name, fields)| {
            fields
                .iter()
                .map(move |(field, resolver)| (type_name.as_str(), field.as_str(), resolver))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_conversions() {
        assert!(matches!(Resolved::from("x"), Resolved::Value(Value::String(_))));
        assert!(matches!(Resolved::from(None::<Value>), Resolved::Null));
        let list = Resolved::from(vec![json!(1), json!(2)]);
        assert!(matches!(list, Resolved::List(items) if items.len() == 2));
        let reference = Resolved::from(Reference::new("Author", "1"));
        assert!(matches!(reference, Resolved::Value(v) if v["typeName"] == "Author"));
    }

    #[test]
    fn test_args_treat_null_as_absent() {
        let args = Args::new(json!({ "a": null, "b": "x", "c": 3 }).as_object().cloned().unwrap());
        assert!(args.get("a").is_none());
        assert_eq!(args.str("b"), Some("x"));
        assert_eq!(args.i64("c"), Some(3));
    }

    #[test]
    fn test_resolver_map_iterates_sorted() {
        let map = ResolverMap::new()
            .field("Post", "b", FieldResolver::new())
            .field("Author", "a", FieldResolver::new())
            .field("Post", "a", FieldResolver::new().ty("String"));
        let keys: Vec<_> = map.iter().map(|(t, f, _)| format!("{t}.{f}")).collect();
        assert_eq!(keys, ["Author.a", "Post.a", "Post.b"]);
    }

    #[test]
    fn test_source_reads_raw_keys() {
        let source = Source::Object(Arc::new(json!({ "456-test": 4 }).as_object().cloned().unwrap()));
        assert_eq!(source.get("456-test"), Some(&json!(4)));
        assert!(Source::Root.get("x").is_none());
    }
}
