//! Route manifest generation.
//!
//! The manifest is a JavaScript module exporting one record per live page in
//! creation order, followed by a single `*` fallback cloned from the page
//! named `404`:
//!
//! ```text
//! export default [
//!   {
//!     name: "home",
//!     path: "/",
//!     component: () => import(/* webpackChunkName: "component--home" */ "./src/pages/Index.vue"),
//!     meta: { data: true }
//!   },
//!   {
//!     name: "*",
//!     path: "*",
//!     component: () => import(/* webpackChunkName: "component--404" */ "./src/pages/404.vue")
//!   }
//! ]
//! ```

use serde_json::Value;

use crate::error::ConfigurationError;
use crate::pages::{FALLBACK_PATH, Page};
use crate::utils::slug::slugify;

/// Name of the page the fallback route is cloned from.
pub const NOT_FOUND_NAME: &str = "404";

/// One entry of the route manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub name: Option<String>,
    /// Route pattern if the page has one, its path otherwise.
    pub path: String,
    pub component: String,
    pub chunk_name: String,
    /// Whether the page carries a data query.
    pub has_query: bool,
}

impl RouteRecord {
    fn from_page(page: &Page) -> Self {
        Self {
            name: page.name.clone(),
            path: page.route.clone().unwrap_or_else(|| page.path.clone()),
            component: page.component.clone(),
            chunk_name: chunk_id(page.chunk_name.as_deref().or(page.name.as_deref()), &page.component),
            has_query: page.has_query(),
        }
    }
}

/// Stable bundle name for a route component.
fn chunk_id(chunk_name: Option<&str>, component: &str) -> String {
    format!("component--{}", slugify(chunk_name.unwrap_or(component)))
}

/// Build the route records for `pages`, fallback last.
///
/// Exactly one page must be named `404`.
pub fn route_records<'a>(pages: impl IntoIterator<Item = &'a Page>) -> Result<Vec<RouteRecord>, ConfigurationError> {
    let pages: Vec<&Page> = pages.into_iter().collect();
    let not_found: Vec<&Page> = pages
        .iter()
        .copied()
        .filter(|page| page.name.as_deref() == Some(NOT_FOUND_NAME))
        .collect();
    let not_found = match not_found[..] {
        [page] => page,
        [] => return Err(ConfigurationError::MissingNotFoundPage),
        _ => {
            return Err(ConfigurationError::AmbiguousNotFoundPage {
                count: not_found.len(),
            });
        }
    };

    // `*` never reaches the registry, so the fallback is always the last record.
    let mut records: Vec<RouteRecord> = pages.iter().map(|page| RouteRecord::from_page(page)).collect();
    records.push(RouteRecord {
        name: Some(FALLBACK_PATH.to_owned()),
        path: FALLBACK_PATH.to_owned(),
        component: not_found.component.clone(),
        chunk_name: chunk_id(Some(NOT_FOUND_NAME), &not_found.component),
        has_query: not_found.has_query(),
    });
    Ok(records)
}

fn js_string(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// Render records as the manifest module text.
pub fn render_routes(records: &[RouteRecord]) -> String {
    let items: Vec<String> = records
        .iter()
        .map(|record| {
            let mut props = Vec::with_capacity(4);
            if let Some(name) = &record.name {
                props.push(format!("    name: {}", js_string(name)));
            }
            props.push(format!("    path: {}", js_string(&record.path)));
            props.push(format!(
                "    component: () => import(/* webpackChunkName: {} */ {})",
                js_string(&record.chunk_name),
                js_string(&record.component)
            ));
            if record.has_query {
                props.push("    meta: { data: true }".to_owned());
            }
            format!("\n  {{\n{}\n  }}", props.join(",\n"))
        })
        .collect();

    format!("export default [{}\n]\n\n", items.join(","))
}
