//! `[store]` section configuration.

use crate::store::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// `[store]` section in sitegraph.toml.
///
/// # Example
/// ```toml
/// [store]
/// duplicates = "overwrite"   # or "reject" (default)
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// What `add_node` does when a node id is already taken.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}
