//! Project configuration management for `sitegraph.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                       |
//! |--------------|-----------------------------------------------|
//! | `[build]`    | Output directory, manifest name, quiet mode   |
//! | `[store]`    | Duplicate node id policy                      |
//! | `[schema]`   | Type inference toggle                         |
//! | `[source]`   | JSON data directory                           |
//! | `[[pages]]`  | Static pages for the built-in pages plugin    |
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "dist"
//!
//! [store]
//! duplicates = "overwrite"
//!
//! [source]
//! dir = "data"
//!
//! [[pages]]
//! path = "/404"
//! component = "./src/pages/404.vue"
//! name = "404"
//! ```

mod build;
pub mod defaults;
mod error;
mod pages;
mod schema;
mod source;
mod store;

pub use build::BuildConfig;
pub use error::ConfigError;
pub use pages::PageConfig;
pub use schema::SchemaConfig;
pub use source::SourceConfig;
pub use store::StoreConfig;

use crate::cli::Cli;
use crate::pages::FALLBACK_PATH;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing sitegraph.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Output settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Content store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Schema compilation settings
    #[serde(default)]
    pub schema: SchemaConfig,

    /// JSON source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Static pages
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

impl AppConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        if cli.quiet {
            self.build.quiet = true;
        }

        let root = Self::normalize_path(&root);
        self.set_root(&root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.update_path_with_root(&root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve directory paths against the root directory
    fn update_path_with_root(&mut self, root: &Path) {
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.source.dir = Self::normalize_path(&root.join(&self.source.dir));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.build.routes.trim().is_empty() {
            bail!(ConfigError::Validation(
                "[build.routes] must not be empty".into()
            ));
        }

        for page in &self.pages {
            if page.path == FALLBACK_PATH {
                bail!(ConfigError::Validation(
                    "[[pages]] path `*` is reserved for the fallback route".into()
                ));
            }
            if !page.path.starts_with('/') {
                bail!(ConfigError::Validation(format!(
                    "[[pages]] path `{}` must start with `/`",
                    page.path
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
