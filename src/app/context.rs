//! Shared state of one build.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::actions::ActionError;
use crate::pages::Pages;
use crate::schema::{CompileOptions, CompiledSchema, QueryResponse, SchemaBuilder, SchemaError};
use crate::store::Store;

/// Everything the action façades read and write.
///
/// Phases run one after another, so the locks only guard against a plugin
/// querying the schema from a spawned task while the next phase runs.
#[derive(Debug)]
pub struct BuildContext {
    pub store: Store,
    pub(crate) schema_builder: Mutex<SchemaBuilder>,
    pub(crate) schema: ArcSwapOption<CompiledSchema>,
    pub(crate) pages: RwLock<Pages>,
}

impl BuildContext {
    pub fn new(store: Store) -> Self {
        Self::with_options(store, CompileOptions::default())
    }

    pub fn with_options(store: Store, options: CompileOptions) -> Self {
        Self {
            store,
            schema_builder: Mutex::new(SchemaBuilder::with_options(options)),
            schema: ArcSwapOption::empty(),
            pages: RwLock::new(Pages::new()),
        }
    }

    /// Current compiled schema, if one has been published.
    pub fn schema(&self) -> Option<Arc<CompiledSchema>> {
        self.schema.load_full()
    }

    /// Compile cached contributions against the store and publish the
    /// result. The previous schema stays live if compilation fails.
    pub(crate) fn compile(&self) -> Result<Arc<CompiledSchema>, SchemaError> {
        let compiled = Arc::new(self.schema_builder.lock().compile(&self.store)?);
        self.schema.store(Some(Arc::clone(&compiled)));
        Ok(compiled)
    }

    /// Execute a query against the published schema snapshot.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError> {
        let schema = self.schema().ok_or(ActionError::SchemaNotReady)?;
        Ok(schema.execute(query, variables).await)
    }
}
