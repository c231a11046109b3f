//! JSON data directory source.
//!
//! Every `*.json` file becomes one content type named after its file stem
//! (`blog-post.json` → `Blog_post`). A file holds either an array of nodes
//! or an object with a route pattern:
//!
//! ```json
//! { "route": "/blog/:slug", "nodes": [{ "id": "1", "slug": "hello" }] }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::actions::StoreActions;
use crate::app::Plugin;
use crate::log;
use crate::store::{ContentTypeOptions, Store};
use crate::utils::slug::pascal_case;

/// Object form of a data file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DataFile {
    #[serde(default)]
    route: Option<String>,
    nodes: Vec<Value>,
}

/// Loads content types from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonSourcePlugin {
    dir: PathBuf,
}

impl JsonSourcePlugin {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data files in file name order. Unreadable entries fail the walk.
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", self.dir.display()))?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "json") {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn type_name_for(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    pascal_case(&Store::create_type_name(stem))
}

fn parse_data_file(path: &Path) -> Result<DataFile> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    match value {
        Value::Array(nodes) => Ok(DataFile { route: None, nodes }),
        Value::Object(_) => serde_json::from_value(value)
            .with_context(|| format!("{}: expected `route` and `nodes`", path.display())),
        _ => bail!("{}: expected an array of nodes or an object", path.display()),
    }
}

#[async_trait]
impl Plugin for JsonSourcePlugin {
    fn name(&self) -> &str {
        "json-source"
    }

    fn options(&self) -> Value {
        Value::String(self.dir.display().to_string())
    }

    async fn load_source(&self, actions: &StoreActions) -> Result<()> {
        if !self.dir.is_dir() {
            log!("source"; "no data directory at {}", self.dir.display());
            return Ok(());
        }

        let mut nodes = 0;
        for path in self.collect_files()? {
            let file = parse_data_file(&path)?;
            let mut options = ContentTypeOptions::new(type_name_for(&path));
            if let Some(route) = file.route {
                options = options.route(route);
            }
            let content_type = actions.add_content_type(options)?;
            for node in file.nodes {
                content_type
                    .add_node(node)
                    .with_context(|| format!("Invalid node in {}", path.display()))?;
                nodes += 1;
            }
        }

        log!("source"; "{} nodes from {}", nodes, self.dir.display());
        Ok(())
    }
}
