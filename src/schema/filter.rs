//! Filtering, sorting and paging for `all<Type>` listings.
//!
//! Filters are JSON objects keyed by field name:
//!
//! ```text
//! { "title": { "regex": "^Hello" }, "views": { "gte": 10 }, "draft": false }
//! ```
//!
//! A bare value is shorthand for `eq`. Operators: `eq`, `ne`, `in`, `nin`,
//! `gt`, `gte`, `lt`, `lte`, `exists`, `regex`. References compare by id and
//! `eq` on an array field means "contains".

use std::cmp::Ordering;
use std::sync::Arc;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::resolve::ResolveError;
use crate::store::{Node, Reference};

#[derive(Debug)]
enum Op {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Exists(bool),
    Regex(Regex),
}

#[derive(Debug)]
struct Clause {
    key: String,
    op: Op,
}

/// Parsed `filter` argument.
#[derive(Debug, Default)]
pub(crate) struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Parse a filter, translating field names to data keys through `aliases`.
    pub(crate) fn parse(filter: &Value, aliases: &FxHashMap<String, String>) -> Result<Self, ResolveError> {
        let Value::Object(fields) = filter else {
            return Err(ResolveError::invalid_argument("filter", "expected an object"));
        };

        let mut clauses = Vec::new();
        for (field, condition) in fields {
            let key = aliases.get(field).cloned().unwrap_or_else(|| field.clone());
            match condition {
                Value::Object(ops) if !ops.is_empty() && Reference::from_value(condition).is_none() => {
                    for (name, operand) in ops {
                        let op = parse_op(field, name, operand)?;
                        clauses.push(Clause { key: key.clone(), op });
                    }
                }
                value => clauses.push(Clause {
                    key,
                    op: Op::Eq(normalize(value)),
                }),
            }
        }
        Ok(Self { clauses })
    }

    pub(crate) fn matches(&self, node: &Node) -> bool {
        self.clauses.iter().all(|clause| clause.matches(node.get(&clause.key)))
    }
}

fn parse_op(field: &str, name: &str, operand: &Value) -> Result<Op, ResolveError> {
    let list = || -> Result<Vec<Value>, ResolveError> {
        match operand {
            Value::Array(items) => Ok(items.iter().map(normalize).collect()),
            _ => Err(ResolveError::invalid_argument("filter", format!("`{field}.{name}` expects a list"))),
        }
    };
    let op = match name {
        "eq" => Op::Eq(normalize(operand)),
        "ne" => Op::Ne(normalize(operand)),
        "in" => Op::In(list()?),
        "nin" => Op::Nin(list()?),
        "gt" => Op::Gt(operand.clone()),
        "gte" => Op::Gte(operand.clone()),
        "lt" => Op::Lt(operand.clone()),
        "lte" => Op::Lte(operand.clone()),
        "exists" => Op::Exists(operand.as_bool().unwrap_or(true)),
        "regex" => {
            let pattern = operand
                .as_str()
                .ok_or_else(|| ResolveError::invalid_argument("filter", format!("`{field}.regex` expects a string")))?;
            let regex = Regex::new(pattern)
                .map_err(|e| ResolveError::invalid_argument("filter", format!("`{field}.regex`: {e}")))?;
            Op::Regex(regex)
        }
        other => {
            return Err(ResolveError::invalid_argument(
                "filter",
                format!("unknown operator `{other}` on `{field}`"),
            ));
        }
    };
    Ok(op)
}

impl Clause {
    fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.filter(|v| !v.is_null());
        match &self.op {
            Op::Exists(wanted) => value.is_some() == *wanted,
            Op::Eq(expected) => value.is_some_and(|v| contains(v, expected)),
            Op::Ne(expected) => !value.is_some_and(|v| contains(v, expected)),
            Op::In(set) => value.is_some_and(|v| set.iter().any(|e| contains(v, e))),
            Op::Nin(set) => !value.is_some_and(|v| set.iter().any(|e| contains(v, e))),
            Op::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
            Op::Gte(bound) => matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal)),
            Op::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
            Op::Lte(bound) => matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal)),
            Op::Regex(regex) => value.and_then(Value::as_str).is_some_and(|s| regex.is_match(s)),
        }
    }
}

/// References compare by id.
fn normalize(value: &Value) -> Value {
    match Reference::from_value(value) {
        Some(reference) => Value::String(reference.id),
        None => value.clone(),
    }
}

/// Equality, where an array field matches when any element does.
fn contains(value: &Value, expected: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| normalize(item) == *expected) || normalize(value) == *expected,
        _ => normalize(value) == *expected,
    }
}

fn compare(value: Option<&Value>, bound: &Value) -> Option<Ordering> {
    compare_values(value?, bound)
}

/// Order two scalar values of the same JSON type.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Stable sort by a data key. Missing and incomparable values sort last.
pub(crate) fn sort_nodes(nodes: &mut [Arc<Node>], key: &str, descending: bool) {
    nodes.sort_by(|a, b| {
        let (a, b) = (a.get(key).filter(|v| !v.is_null()), b.get(key).filter(|v| !v.is_null()));
        match (a, b) {
            (Some(a), Some(b)) => {
                let ordering = compare_values(a, b).unwrap_or(Ordering::Equal);
                if descending { ordering.reverse() } else { ordering }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

// ============================================================================
// Paging
// ============================================================================

/// Window of a listing selected by `skip`/`limit` or `page`/`perPage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Paging {
    pub skip: usize,
    pub limit: Option<usize>,
    pub per_page: Option<usize>,
    pub page: usize,
}

impl Paging {
    pub(crate) fn new(
        skip: Option<i64>,
        limit: Option<i64>,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Self, ResolveError> {
        let non_negative = |name: &str, value: Option<i64>| match value {
            Some(v) if v < 0 => Err(ResolveError::invalid_argument(name, "must not be negative")),
            other => Ok(other.map(|v| v as usize)),
        };
        let skip = non_negative("skip", skip)?.unwrap_or(0);
        let limit = non_negative("limit", limit)?;
        let per_page = non_negative("perPage", per_page)?.filter(|&p| p > 0);
        let page = match non_negative("page", page)? {
            Some(0) | None => 1,
            Some(page) => page,
        };

        Ok(match per_page {
            Some(per_page) => Self {
                skip: skip + (page - 1) * per_page,
                limit: Some(per_page),
                per_page: Some(per_page),
                page,
            },
            None => Self {
                skip,
                limit,
                per_page: None,
                page: 1,
            },
        })
    }

    pub(crate) fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.skip.min(total);
        let end = match self.limit {
            Some(limit) => (start + limit).min(total),
            None => total,
        };
        start..end
    }

    /// `pageInfo` object for a listing of `total` items.
    pub(crate) fn page_info(&self, total: usize) -> Map<String, Value> {
        let per_page = self.per_page.or(self.limit).unwrap_or(total);
        let total_pages = if per_page == 0 { 1 } else { total.div_ceil(per_page).max(1) };
        let current = self.page;

        let mut info = Map::new();
        info.insert("totalCount".into(), Value::from(total));
        info.insert("perPage".into(), Value::from(per_page));
        info.insert("currentPage".into(), Value::from(current));
        info.insert("totalPages".into(), Value::from(total_pages));
        info.insert("hasNextPage".into(), Value::from(current < total_pages));
        info.insert("hasPreviousPage".into(), Value::from(current > 1));
        info.insert("isFirst".into(), Value::from(current == 1));
        info.insert("isLast".into(), Value::from(current >= total_pages));
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Origin;
    use serde_json::json;

    fn node(fields: Value) -> Node {
        let id = fields["id"].as_str().unwrap_or("x").to_owned();
        Node::new("Post", id, fields.as_object().cloned().unwrap(), Origin::HOST)
    }

    fn filter(value: Value) -> Filter {
        Filter::parse(&value, &FxHashMap::default()).unwrap()
    }

    #[test]
    fn test_filter_operators() {
        let post = node(json!({
            "id": "1", "title": "Hello World", "views": 10, "tags": ["rust", "web"],
            "author": { "typeName": "Author", "id": "a" }
        }));

        assert!(filter(json!({ "title": "Hello World" })).matches(&post));
        assert!(filter(json!({ "views": { "gte": 10, "lt": 11 } })).matches(&post));
        assert!(!filter(json!({ "views": { "gt": 10 } })).matches(&post));
        assert!(filter(json!({ "tags": { "eq": "rust" } })).matches(&post));
        assert!(filter(json!({ "tags": { "nin": ["go"] } })).matches(&post));
        assert!(filter(json!({ "author": { "eq": "a" } })).matches(&post));
        assert!(filter(json!({ "author": { "in": [{ "typeName": "Author", "id": "a" }] } })).matches(&post));
        assert!(filter(json!({ "title": { "regex": "^Hello" } })).matches(&post));
        assert!(filter(json!({ "draft": { "exists": false } })).matches(&post));
        assert!(!filter(json!({ "title": { "ne": "Hello World" } })).matches(&post));
    }

    #[test]
    fn test_filter_translates_aliases() {
        let post = node(json!({ "id": "1", "456-test": 4 }));
        let aliases = FxHashMap::from_iter([("_456_test".to_owned(), "456-test".to_owned())]);
        let filter = Filter::parse(&json!({ "_456_test": 4 }), &aliases).unwrap();
        assert!(filter.matches(&post));
    }

    #[test]
    fn test_filter_rejects_unknown_operator() {
        let err = Filter::parse(&json!({ "a": { "like": "x" } }), &FxHashMap::default()).unwrap_err();
        assert!(err.to_string().contains("unknown operator `like`"));
        assert!(Filter::parse(&json!({ "a": { "regex": "(" } }), &FxHashMap::default()).is_err());
    }

    #[test]
    fn test_sort_nodes_missing_last() {
        let mut nodes: Vec<_> = [json!({ "id": "a", "n": 2 }), json!({ "id": "b" }), json!({ "id": "c", "n": 1 })]
            .into_iter()
            .map(|v| Arc::new(node(v)))
            .collect();
        sort_nodes(&mut nodes, "n", false);
        let ids: Vec<_> = nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        sort_nodes(&mut nodes, "n", true);
        let ids: Vec<_> = nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }

    #[test]
    fn test_paging_by_page() {
        let paging = Paging::new(None, None, Some(2), Some(3)).unwrap();
        assert_eq!(paging.range(7), 3..6);
        let info = paging.page_info(7);
        assert_eq!(info["totalPages"], json!(3));
        assert_eq!(info["hasNextPage"], json!(true));
        assert_eq!(info["hasPreviousPage"], json!(true));
    }

    #[test]
    fn test_paging_by_skip_limit() {
        let paging = Paging::new(Some(5), Some(10), None, None).unwrap();
        assert_eq!(paging.range(8), 5..8);
        assert_eq!(Paging::new(None, None, None, None).unwrap().page_info(4)["isLast"], json!(true));
        assert!(Paging::new(Some(-1), None, None, None).is_err());
    }
}
