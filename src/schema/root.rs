//! Built-in types and root query fields.
//!
//! Every content type `T` gets:
//!
//! ```text
//! type Query {
//!   t(id: ID, path: String): T
//!   allT(sortBy: String, order: SortOrder = ASC, skip: Int = 0, limit: Int,
//!        page: Int, perPage: Int, filter: JSON): TConnection!
//! }
//! type TConnection { totalCount: Int!  pageInfo: PageInfo!  edges: [TEdge!]! }
//! type TEdge { node: T!  next: T  previous: T }
//! ```
//!
//! plus the shared `node(typeName, id)` and `metadata(key)` root fields.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};

use super::filter::{Filter, Paging, sort_nodes};
use super::infer::{JSON_SCALAR, NODE_INTERFACE};
use super::resolve::{Args, ResolveError, Resolved};
use super::types::{ArgDef, EnumType, FieldDef, InterfaceType, ObjectType, ScalarType, TypeDeclaration};
use crate::store::Reference;
use crate::utils::slug::camel_case;

pub(crate) const SORT_ORDER: &str = "SortOrder";
pub(crate) const PAGE_INFO: &str = "PageInfo";

/// Types every schema carries.
pub(crate) fn builtin_types() -> Vec<TypeDeclaration> {
    vec![
        ScalarType::new(JSON_SCALAR)
            .description("Arbitrary JSON value")
            .into(),
        InterfaceType::new(NODE_INTERFACE).field("id", "ID!").into(),
        EnumType::new(SORT_ORDER).value("ASC").value("DESC").into(),
        ObjectType::new(PAGE_INFO)
            .field("totalCount", "Int!")
            .field("perPage", "Int!")
            .field("currentPage", "Int!")
            .field("totalPages", "Int!")
            .field("hasNextPage", "Boolean!")
            .field("hasPreviousPage", "Boolean!")
            .field("isFirst", "Boolean!")
            .field("isLast", "Boolean!")
            .into(),
    ]
}

/// Make a content type's object declaration implement `Node`.
pub(crate) fn ensure_node_shape(object: &mut ObjectType) {
    if !object.interfaces.iter().any(|i| i == NODE_INTERFACE) {
        object.interfaces.insert(0, NODE_INTERFACE.to_owned());
    }
    if object.get_field("id").is_none() {
        object.fields.insert(0, FieldDef::new("id", "ID!"));
    }
}

pub(crate) fn connection_name(type_name: &str) -> String {
    format!("{type_name}Connection")
}

pub(crate) fn edge_name(type_name: &str) -> String {
    format!("{type_name}Edge")
}

/// Connection and edge types for a content type.
pub(crate) fn connection_types(type_name: &str) -> [TypeDeclaration; 2] {
    let edge = edge_name(type_name);
    [
        ObjectType::new(connection_name(type_name))
            .field("totalCount", "Int!")
            .field("pageInfo", format!("{PAGE_INFO}!"))
            .field("edges", format!("[{edge}!]!"))
            .into(),
        ObjectType::new(edge)
            .field("node", format!("{type_name}!"))
            .field("next", type_name)
            .field("previous", type_name)
            .into(),
    ]
}

/// `id` arguments may arrive as strings or integers.
fn id_arg(args: &Args, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Root fields for one content type.
///
/// `aliases` maps GraphQL field names to data keys, for `sortBy` and
/// `filter`.
pub(crate) fn content_type_fields(type_name: &str, aliases: FxHashMap<String, String>) -> [FieldDef; 2] {
    let single = {
        let type_name = type_name.to_owned();
        FieldDef::new(camel_case(&type_name), type_name.as_str())
            .arg(ArgDef::new("id", "ID"))
            .arg(ArgDef::new("path", "String"))
            .resolve(move |_, args, ctx| {
                let Some(content_type) = ctx.store().get_content_type(&type_name) else {
                    return Ok(Resolved::Null);
                };
                if let Some(id) = id_arg(args, "id") {
                    return Ok(content_type.get_node(&id).into());
                }
                Ok(args
                    .str("path")
                    .and_then(|path| content_type.get_node_by_path(path))
                    .into())
            })
    };

    let aliases = Arc::new(aliases);
    let all = {
        let type_name = type_name.to_owned();
        FieldDef::new(format!("all{type_name}"), format!("{}!", connection_name(&type_name)))
            .arg(ArgDef::new("sortBy", "String"))
            .arg(ArgDef::new("order", SORT_ORDER).default_value(json!("ASC")))
            .arg(ArgDef::new("skip", "Int").default_value(json!(0)))
            .arg(ArgDef::new("limit", "Int"))
            .arg(ArgDef::new("page", "Int"))
            .arg(ArgDef::new("perPage", "Int"))
            .arg(ArgDef::new("filter", JSON_SCALAR))
            .resolve(move |_, args, ctx| {
                let mut nodes = ctx
                    .store()
                    .get_content_type(&type_name)
                    .map(|content_type| content_type.nodes())
                    .unwrap_or_default();

                if let Some(filter) = args.get("filter") {
                    let filter = Filter::parse(filter, &aliases)?;
                    nodes.retain(|node| filter.matches(node));
                }
                if let Some(sort_by) = args.str("sortBy") {
                    let key = aliases.get(sort_by).map_or(sort_by, String::as_str);
                    sort_nodes(&mut nodes, key, args.str("order") == Some("DESC"));
                }

                let paging = Paging::new(args.i64("skip"), args.i64("limit"), args.i64("page"), args.i64("perPage"))?;
                let total = nodes.len();
                let reference = |i: Option<usize>| {
                    i.and_then(|i| nodes.get(i))
                        .map_or(Value::Null, |node| node.reference().to_value())
                };
                let edges: Vec<Value> = paging
                    .range(total)
                    .map(|i| {
                        json!({
                            "node": reference(Some(i)),
                            "next": reference(i.checked_add(1)),
                            "previous": reference(i.checked_sub(1)),
                        })
                    })
                    .collect();

                let mut connection = Map::new();
                connection.insert("totalCount".into(), Value::from(total));
                connection.insert("pageInfo".into(), Value::Object(paging.page_info(total)));
                connection.insert("edges".into(), Value::Array(edges));
                Ok(Resolved::Value(Value::Object(connection)))
            })
    };

    [single, all]
}

/// Root fields that do not depend on content types.
pub(crate) fn shared_fields() -> [FieldDef; 2] {
    [
        FieldDef::new("node", NODE_INTERFACE)
            .arg(ArgDef::new("typeName", "String!"))
            .arg(ArgDef::new("id", "ID!"))
            .resolve(|_, args, ctx| {
                let type_name = args
                    .str("typeName")
                    .ok_or_else(|| ResolveError::invalid_argument("typeName", "required"))?;
                let id = id_arg(args, "id").ok_or_else(|| ResolveError::invalid_argument("id", "required"))?;
                Ok(ctx.store().resolve(&Reference::new(type_name, id)).into())
            }),
        FieldDef::new("metadata", JSON_SCALAR)
            .arg(ArgDef::new("key", "String"))
            .resolve(|_, args, ctx| {
                Ok(match args.str("key") {
                    Some(key) => ctx.store().metadata(key).into(),
                    None => ctx.store().all_metadata().into(),
                })
            }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_node_shape() {
        let mut object = ObjectType::new("Post").field("title", "String");
        ensure_node_shape(&mut object);
        ensure_node_shape(&mut object);
        assert_eq!(object.interfaces, [NODE_INTERFACE]);
        assert_eq!(object.fields[0].name, "id");
        assert_eq!(object.fields.len(), 2);
    }

    #[test]
    fn test_connection_type_names() {
        let [connection, edge] = connection_types("Post");
        assert_eq!(connection.name(), "PostConnection");
        assert_eq!(edge.name(), "PostEdge");
        assert_eq!(edge.fields().unwrap()[0].ty, "Post!");
    }

    #[test]
    fn test_content_type_field_names() {
        let [single, all] = content_type_fields("BlogPost", FxHashMap::default());
        assert_eq!(single.name, "blogPost");
        assert_eq!(all.name, "allBlogPost");
        assert_eq!(all.ty, "BlogPostConnection!");
        assert!(single.resolve.is_some() && all.resolve.is_some());
    }
}
