//! Type inference from store contents.
//!
//! Every content type yields an object type implementing `Node`, with one
//! field per node key seen in any of its nodes. Field shapes are widened
//! across nodes:
//!
//! | Seen | Inferred |
//! |------|----------|
//! | `Int` + `Float` | `Float` |
//! | `null` + `T` | `T` |
//! | references to one content type | that type |
//! | references to several or unknown types | `Node` |
//! | nested objects | `<Owner><Field>` object type |
//! | anything else mixed | `JSON` |
//!
//! Keys that are not valid GraphQL names are exposed under a sanitized alias
//! and keep their raw key as the field's data key.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use super::error::Conflict;
use super::types::{FieldDef, ObjectType, TypeDeclaration};
use crate::store::{Reference, Store};
use crate::utils::slug::{pascal_case, sanitize_identifier};

pub(crate) const NODE_INTERFACE: &str = "Node";
pub(crate) const JSON_SCALAR: &str = "JSON";

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Null,
    Boolean,
    Int,
    Float,
    String,
    Json,
    Reference(BTreeSet<String>),
    Object(BTreeMap<String, Shape>),
    List(Box<Shape>),
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::Null,
        Value::Bool(_) => Shape::Boolean,
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => Shape::Int,
            _ => Shape::Float,
        },
        Value::String(_) => Shape::String,
        Value::Array(items) => {
            let inner = items.iter().map(shape_of).fold(Shape::Null, widen);
            Shape::List(Box::new(inner))
        }
        Value::Object(map) => match Reference::from_value(value) {
            Some(reference) => Shape::Reference(BTreeSet::from([reference.type_name])),
            None if map.is_empty() => Shape::Json,
            None => Shape::Object(map.iter().map(|(k, v)| (k.clone(), shape_of(v))).collect()),
        },
    }
}

/// Smallest shape covering both.
fn widen(a: Shape, b: Shape) -> Shape {
    match (a, b) {
        (Shape::Null, other) | (other, Shape::Null) => other,
        (a, b) if a == b => a,
        (Shape::Int, Shape::Float) | (Shape::Float, Shape::Int) => Shape::Float,
        (Shape::Reference(mut a), Shape::Reference(b)) => {
            a.extend(b);
            Shape::Reference(a)
        }
        (Shape::Object(mut a), Shape::Object(b)) => {
            for (key, shape) in b {
                let merged = match a.remove(&key) {
                    Some(existing) => widen(existing, shape),
                    None => shape,
                };
                a.insert(key, merged);
            }
            Shape::Object(a)
        }
        (Shape::List(a), Shape::List(b)) => Shape::List(Box::new(widen(*a, *b))),
        _ => Shape::Json,
    }
}

struct Inference<'a> {
    content_types: &'a FxHashSet<String>,
    nested: Vec<TypeDeclaration>,
    conflicts: &'a mut Vec<Conflict>,
}

impl Inference<'_> {
    /// Build fields for `owner` from key shapes.
    fn fields(&mut self, owner: &str, shapes: BTreeMap<String, Shape>) -> Vec<FieldDef> {
        let mut aliases: FxHashMap<String, String> = FxHashMap::default();
        let mut fields = Vec::with_capacity(shapes.len());

        for (key, shape) in shapes {
            let alias = sanitize_identifier(&key).into_owned();
            if let Some(first) = aliases.get(&alias) {
                self.conflicts.push(Conflict::AliasCollision {
                    type_name: owner.to_owned(),
                    alias,
                    first: first.clone(),
                    second: key,
                });
                continue;
            }
            aliases.insert(alias.clone(), key.clone());

            let ty = self.type_of(owner, &alias, shape);
            let field = FieldDef::new(alias.as_str(), ty);
            fields.push(if alias == key { field } else { field.with_data_key(key) });
        }
        fields
    }

    fn type_of(&mut self, owner: &str, alias: &str, shape: Shape) -> String {
        match shape {
            Shape::Null | Shape::Json => JSON_SCALAR.to_owned(),
            Shape::Boolean => "Boolean".to_owned(),
            Shape::Int => "Int".to_owned(),
            Shape::Float => "Float".to_owned(),
            Shape::String => "String".to_owned(),
            Shape::Reference(types) => match types.first() {
                Some(only) if types.len() == 1 && self.content_types.contains(only) => only.clone(),
                _ => NODE_INTERFACE.to_owned(),
            },
            Shape::List(inner) => format!("[{}]", self.type_of(owner, alias, *inner)),
            Shape::Object(shapes) => {
                let name = format!("{owner}{}", pascal_case(alias));
                let fields = self.fields(&name, shapes);
                let mut object = ObjectType::new(name.as_str());
                object.fields = fields;
                self.nested.push(object.into());
                name
            }
        }
    }
}

/// Infer one object type per content type, plus nested object types.
pub(crate) fn infer_types(store: &Store, conflicts: &mut Vec<Conflict>) -> Vec<TypeDeclaration> {
    let collections = store.collections();
    let content_types: FxHashSet<String> = collections.iter().map(|c| c.type_name.clone()).collect();
    let mut inference = Inference {
        content_types: &content_types,
        nested: Vec::new(),
        conflicts,
    };

    let mut declarations = Vec::with_capacity(collections.len());
    for collection in &collections {
        let mut shapes: BTreeMap<String, Shape> = BTreeMap::new();
        for node in collection.all() {
            for (key, value) in node.fields() {
                let shape = shape_of(value);
                let merged = match shapes.remove(key) {
                    Some(existing) => widen(existing, shape),
                    None => shape,
                };
                shapes.insert(key.clone(), merged);
            }
        }
        shapes.remove("id");

        let mut object = ObjectType::new(collection.type_name.as_str())
            .interface(NODE_INTERFACE)
            .field("id", "ID!");
        object.fields.extend(inference.fields(&collection.type_name, shapes));
        declarations.push(object.into());
    }

    declarations.append(&mut inference.nested);
    declarations
}
