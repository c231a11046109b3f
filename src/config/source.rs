//! `[source]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[source]` section in sitegraph.toml - the JSON data directory.
///
/// Every `*.json` file below `dir` becomes one content type.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default = "defaults::source::dir")]
    #[educe(Default = defaults::source::dir())]
    pub dir: PathBuf,
}
