//! Plugin trait and closure-based plugins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::actions::{ManagedPagesActions, PagesActions, SchemaActions, StoreActions};

/// A build plugin. Every hook is optional.
///
/// Hooks run in phase order, and within a phase in registration order. The
/// action record passed to a hook is only valid until the hook returns.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name, used to address the plugin in incremental rebuilds.
    fn name(&self) -> &str;

    /// Plugin options, folded into the digest of every page it creates.
    fn options(&self) -> Value {
        Value::Null
    }

    async fn load_source(&self, _actions: &StoreActions) -> Result<()> {
        Ok(())
    }

    async fn create_schema(&self, _actions: &SchemaActions) -> Result<()> {
        Ok(())
    }

    async fn create_pages(&self, _actions: &PagesActions) -> Result<()> {
        Ok(())
    }

    async fn create_managed_pages(&self, _actions: &ManagedPagesActions) -> Result<()> {
        Ok(())
    }
}

type HookFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type Hook<A> = Arc<dyn Fn(A) -> HookFuture + Send + Sync>;

fn hook<A, F, Fut>(f: F) -> Hook<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |actions: A| -> HookFuture { Box::pin(f(actions)) })
}

/// Plugin assembled from closures.
///
/// # Example
/// ```ignore
/// let plugin = FnPlugin::new("authors").on_load_source(|actions| async move {
///     let authors = actions.add_content_type("Author")?;
///     authors.add_node(json!({ "id": "1", "name": "Ada" }))?;
///     Ok(())
/// });
/// ```
#[derive(Clone)]
pub struct FnPlugin {
    name: String,
    options: Value,
    load_source: Option<Hook<StoreActions>>,
    create_schema: Option<Hook<SchemaActions>>,
    create_pages: Option<Hook<PagesActions>>,
    create_managed_pages: Option<Hook<ManagedPagesActions>>,
}

impl FnPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Value::Null,
            load_source: None,
            create_schema: None,
            create_pages: None,
            create_managed_pages: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn on_load_source<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(StoreActions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.load_source = Some(hook(f));
        self
    }

    pub fn on_create_schema<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(SchemaActions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.create_schema = Some(hook(f));
        self
    }

    pub fn on_create_pages<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PagesActions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.create_pages = Some(hook(f));
        self
    }

    pub fn on_create_managed_pages<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ManagedPagesActions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.create_managed_pages = Some(hook(f));
        self
    }
}

#[async_trait]
impl Plugin for FnPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> Value {
        self.options.clone()
    }

    async fn load_source(&self, actions: &StoreActions) -> Result<()> {
        match &self.load_source {
            Some(f) => f(actions.clone()).await,
            None => Ok(()),
        }
    }

    async fn create_schema(&self, actions: &SchemaActions) -> Result<()> {
        match &self.create_schema {
            Some(f) => f(actions.clone()).await,
            None => Ok(()),
        }
    }

    async fn create_pages(&self, actions: &PagesActions) -> Result<()> {
        match &self.create_pages {
            Some(f) => f(actions.clone()).await,
            None => Ok(()),
        }
    }

    async fn create_managed_pages(&self, actions: &ManagedPagesActions) -> Result<()> {
        match &self.create_managed_pages {
            Some(f) => f(actions.clone()).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FnPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPlugin")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
