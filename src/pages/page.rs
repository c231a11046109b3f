//! Page records and lookup filters.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::utils::digest::digest_parts;

/// Page data query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Ownership and change tracking for a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInternals {
    /// Content digest; for pages, covers the owning plugin and page content.
    pub digest: String,
    pub is_managed: bool,
}

/// A route entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
    /// Parameterized route pattern such as `/blog/:slug`, emitted instead of
    /// `path` in the route table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_name: Option<String>,
    pub page_query: PageQuery,
    pub context: Value,
    pub internals: PageInternals,
    /// Digest of the plugin that created the page.
    #[serde(skip)]
    pub(crate) owner: String,
}

impl Page {
    /// Build a page owned by the plugin described by `owner`.
    pub(crate) fn new(options: CreatePageOptions, owner: &PageInternals) -> Self {
        let context = options.context.to_string();
        let digest = digest_parts([
            owner.digest.as_str(),
            options.component.as_str(),
            options.route.as_deref().unwrap_or_default(),
            options.name.as_deref().unwrap_or_default(),
            options.chunk_name.as_deref().unwrap_or_default(),
            options.query.as_deref().unwrap_or_default(),
            context.as_str(),
        ]);

        Self {
            name: options.name,
            path: options.path,
            route: options.route,
            component: options.component,
            chunk_name: options.chunk_name,
            page_query: PageQuery { query: options.query },
            context: options.context,
            internals: PageInternals {
                digest,
                is_managed: owner.is_managed,
            },
            owner: owner.digest.clone(),
        }
    }

    pub fn has_query(&self) -> bool {
        self.page_query.query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }
}

/// Options for `create_page` and `update_page`.
///
/// # Example
/// ```ignore
/// actions.create_page(
///     CreatePageOptions::new("/blog", "./src/templates/Blog.vue")
///         .name("blog")
///         .query("{ allPost { totalCount } }"),
/// )?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePageOptions {
    pub path: String,
    pub route: Option<String>,
    pub name: Option<String>,
    pub component: String,
    pub chunk_name: Option<String>,
    pub query: Option<String>,
    pub context: Value,
    /// Replace an existing page at the same path instead of failing.
    pub replace: bool,
}

impl CreatePageOptions {
    pub fn new(path: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            route: None,
            name: None,
            component: component.into(),
            chunk_name: None,
            query: None,
            context: Value::Object(Map::new()),
            replace: false,
        }
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn chunk_name(mut self, chunk_name: impl Into<String>) -> Self {
        self.chunk_name = Some(chunk_name.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

/// Page lookup predicate. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFilter {
    pub path: Option<String>,
    pub component: Option<String>,
    pub name: Option<String>,
    pub managed: Option<bool>,
}

impl PageFilter {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn managed(mut self, managed: bool) -> Self {
        self.managed = Some(managed);
        self
    }

    pub fn matches(&self, page: &Page) -> bool {
        self.path.as_ref().is_none_or(|p| *p == page.path)
            && self.component.as_ref().is_none_or(|c| *c == page.component)
            && self.name.as_ref().is_none_or(|n| page.name.as_ref() == Some(n))
            && self.managed.is_none_or(|m| m == page.internals.is_managed)
    }
}
