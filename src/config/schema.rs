//! `[schema]` section configuration.

use super::defaults;
use crate::schema::CompileOptions;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[schema]` section in sitegraph.toml.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Infer fallback types from store contents.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub infer: bool,
}

impl SchemaConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions { infer: self.infer }
    }
}
