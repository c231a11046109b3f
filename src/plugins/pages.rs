//! Pages declared in `sitegraph.toml`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::actions::PagesActions;
use crate::app::Plugin;
use crate::config::PageConfig;

/// Registers every `[[pages]]` entry during `create_pages`.
#[derive(Debug, Clone, Default)]
pub struct ConfigPagesPlugin {
    pages: Vec<PageConfig>,
}

impl ConfigPagesPlugin {
    pub fn new(pages: Vec<PageConfig>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Plugin for ConfigPagesPlugin {
    fn name(&self) -> &str {
        "config-pages"
    }

    fn options(&self) -> Value {
        serde_json::to_value(&self.pages).unwrap_or(Value::Null)
    }

    async fn create_pages(&self, actions: &PagesActions) -> Result<()> {
        for page in &self.pages {
            actions
                .create_page(page.to_options())
                .with_context(|| format!("[[pages]] `{}`", page.path))?;
        }
        Ok(())
    }
}
