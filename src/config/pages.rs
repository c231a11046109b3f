//! `[[pages]]` entries.

use crate::pages::CreatePageOptions;
use serde::{Deserialize, Serialize};

/// One static page declared in sitegraph.toml.
///
/// # Example
/// ```toml
/// [[pages]]
/// path = "/404"
/// component = "./src/pages/404.vue"
/// name = "404"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    pub path: String,
    pub component: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub chunk_name: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

impl PageConfig {
    pub fn to_options(&self) -> CreatePageOptions {
        let mut options = CreatePageOptions::new(&self.path, &self.component);
        options.name = self.name.clone();
        options.route = self.route.clone();
        options.chunk_name = self.chunk_name.clone();
        options.query = self.query.clone();
        options
    }
}
