//! Build orchestration.
//!
//! Runs plugin hooks phase by phase and compiles the schema in between.
//!
//! # Architecture
//!
//! ```text
//! bootstrap()
//!     │
//!     ├── load_source ─────────► every plugin, registration order
//!     ├── create_schema ───────► every plugin, registration order
//!     │
//!     ├── compile() ───────────► CompiledSchema, published via arc-swap
//!     │                          store sealed
//!     │
//!     ├── create_pages ────────► every plugin
//!     └── create_managed_pages ► every plugin
//!
//! rebuild(plugin, phase)          one at a time
//!     │
//!     ├── snapshot store, contributions and pages
//!     ├── retract the plugin's contributions for that phase
//!     ├── re-run that one hook
//!     ├── recompile from cached contributions of every plugin
//!     └── on failure, restore the snapshot
//! ```
//!
//! Each hook receives a fresh [`Lease`]; it is revoked as soon as the hook
//! returns, so action handles kept around afterwards fail with
//! [`ActionError::Revoked`](crate::actions::ActionError::Revoked).

mod context;
mod plugin;

pub use context::BuildContext;
pub use plugin::{FnPlugin, Plugin};

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::actions::{Lease, ManagedPagesActions, Origin, PagesActions, Phase, SchemaActions, StoreActions};
use crate::codegen::{RouteRecord, render_routes, route_records};
use crate::config::AppConfig;
use crate::error::ConfigurationError;
use crate::log;
use crate::pages::Page;
use crate::schema::{CompiledSchema, QueryResponse};
use crate::store::Store;
use crate::utils::digest::digest_parts;

/// A registered plugin and the digest its pages are stamped with.
struct Registered {
    plugin: Arc<dyn Plugin>,
    digest: String,
}

/// One build: configuration, plugins and the shared context.
pub struct App {
    config: AppConfig,
    ctx: Arc<BuildContext>,
    plugins: Vec<Registered>,
    bootstrapped: bool,
    /// Held for the whole of a rebuild.
    rebuilds: Mutex<()>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let store = Store::with_policy(config.store.duplicates);
        let ctx = BuildContext::with_options(store, config.schema.compile_options());
        Self {
            config,
            ctx: Arc::new(ctx),
            plugins: Vec::new(),
            bootstrapped: false,
            rebuilds: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Register a plugin. Names must be unique.
    pub fn use_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<&mut Self> {
        let name = plugin.name().to_owned();
        if self.plugins.iter().any(|r| r.plugin.name() == name) {
            bail!(ConfigurationError::DuplicatePlugin { name });
        }
        let digest = digest_parts([name.as_str(), plugin.options().to_string().as_str()]);
        self.plugins.push(Registered {
            plugin: Arc::new(plugin),
            digest,
        });
        Ok(self)
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Run every phase of every plugin once.
    pub async fn bootstrap(&mut self) -> Result<()> {
        if self.bootstrapped {
            bail!("bootstrap() called twice");
        }

        for phase in [Phase::LoadSource, Phase::CreateSchema] {
            self.run_phase(phase).await?;
        }
        log!(
            "store";
            "loaded {} content types, {} nodes",
            self.ctx.store.content_types().len(),
            self.ctx.store.node_count()
        );

        self.compile()?;

        for phase in [Phase::CreatePages, Phase::CreateManagedPages] {
            self.run_phase(phase).await?;
        }
        log!("pages"; "{} pages registered", self.ctx.pages.read().len());

        self.bootstrapped = true;
        Ok(())
    }

    /// Re-run one plugin's hook for `phase`.
    ///
    /// Source and schema rebuilds retract that plugin's earlier
    /// contributions first and recompile afterwards. Managed page rebuilds
    /// re-run the hook against the live registry.
    ///
    /// Rebuilds run one at a time. When the hook or the recompile fails, the
    /// store, the cached contributions and the pages are put back as they
    /// were, so the previous schema keeps serving consistent data.
    pub async fn rebuild(&self, name: &str, phase: Phase) -> Result<()> {
        if !self.bootstrapped {
            bail!("rebuild() called before bootstrap()");
        }
        let Some(index) = self.plugins.iter().position(|r| r.plugin.name() == name) else {
            bail!(ConfigurationError::UnknownPlugin { name: name.to_owned() });
        };
        if phase == Phase::CreatePages {
            bail!(ConfigurationError::PhaseNotRebuildable { phase });
        }

        let _guard = self.rebuilds.lock().await;
        if phase == Phase::CreateManagedPages {
            let pages = self.ctx.pages.read().clone();
            if let Err(err) = self.run_hook(index, phase).await {
                *self.ctx.pages.write() = pages;
                return Err(err);
            }
            log!("rebuild"; "`{name}` {phase}");
            return Ok(());
        }

        let origin = Origin::new(index, phase);
        let store = self.ctx.store.snapshot();
        let contributions = self.ctx.schema_builder.lock().snapshot();

        self.ctx.store.unseal();
        let removed = self.ctx.store.retract(origin);
        self.ctx.schema_builder.lock().retract(origin);

        let result = self.run_hook(index, phase).await.and_then(|()| self.compile());
        if result.is_err() {
            self.ctx.store.restore(store);
            self.ctx.schema_builder.lock().restore(contributions);
        }
        self.ctx.store.seal();
        result?;

        log!("rebuild"; "`{name}` {phase}: replaced {removed} nodes");
        Ok(())
    }

    async fn run_phase(&self, phase: Phase) -> Result<()> {
        for index in 0..self.plugins.len() {
            self.run_hook(index, phase).await?;
        }
        Ok(())
    }

    /// Run one hook with a fresh lease, revoking it afterwards.
    async fn run_hook(&self, index: usize, phase: Phase) -> Result<()> {
        let Registered { plugin, digest } = &self.plugins[index];
        let origin = Origin::new(index, phase);
        let lease = Lease::new(phase);
        let ctx = Arc::clone(&self.ctx);

        let result = match phase {
            Phase::LoadSource => {
                plugin
                    .load_source(&StoreActions::new(ctx, lease.clone(), origin))
                    .await
            }
            Phase::CreateSchema => {
                plugin
                    .create_schema(&SchemaActions::new(ctx, lease.clone(), origin))
                    .await
            }
            Phase::CreatePages => {
                plugin
                    .create_pages(&PagesActions::new(ctx, lease.clone(), origin, digest.clone()))
                    .await
            }
            Phase::CreateManagedPages => {
                plugin
                    .create_managed_pages(&ManagedPagesActions::new(ctx, lease.clone(), origin, digest.clone()))
                    .await
            }
        };
        lease.revoke();

        result.with_context(|| format!("plugin `{}` failed during {phase}", plugin.name()))
    }

    /// Compile, publish and seal the store.
    fn compile(&self) -> Result<()> {
        let schema = self.ctx.compile()?;
        self.ctx.store.seal();
        log!(
            "schema";
            "compiled {} content types into the query root",
            schema.content_types().len()
        );
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    pub fn schema(&self) -> Option<Arc<CompiledSchema>> {
        self.ctx.schema()
    }

    pub async fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse> {
        Ok(self.ctx.graphql(query, variables).await?)
    }

    /// Snapshot of the live pages in creation order.
    pub fn pages(&self) -> Vec<Page> {
        self.ctx.pages.read().iter().cloned().collect()
    }

    pub fn routes(&self) -> Result<Vec<RouteRecord>> {
        Ok(route_records(self.ctx.pages.read().iter())?)
    }

    pub fn render_routes(&self) -> Result<String> {
        Ok(render_routes(&self.routes()?))
    }

    /// Write the route manifest to `[build] output/routes`.
    pub fn write_routes(&self) -> Result<PathBuf> {
        let path = self.config.build.routes_path();
        let content = self.render_routes()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        log!("routes"; "wrote {}", path.display());
        Ok(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionError;
    use crate::pages::{CreatePageOptions, PageFilter};
    use crate::schema::{FieldResolver, ResolverMap, TypeDeclaration};
    use crate::store::{Reference, StoreError};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn app() -> App {
        crate::logger::set_quiet(true);
        App::new(AppConfig::default())
    }

    fn not_found_page() -> FnPlugin {
        FnPlugin::new("not-found").on_create_pages(|actions| async move {
            actions.create_page(CreatePageOptions::new("/404", "./src/pages/404.vue").name("404"))?;
            Ok(())
        })
    }

    async fn query(app: &App, query: &str) -> Value {
        let response = app.graphql(query, json!({})).await.unwrap();
        assert!(response.is_ok(), "unexpected errors: {:?}", response.messages());
        response.data
    }

    #[tokio::test]
    async fn test_custom_object_with_resolver() {
        let mut app = app();
        app.use_plugin(
            FnPlugin::new("blog")
                .on_load_source(|actions| async move {
                    let authors = actions.add_content_type("Author")?;
                    authors.add_node(json!({ "id": "1", "name": "Ada" }))?;
                    let posts = actions.add_content_type("Post")?;
                    posts.add_node(json!({ "id": "1", "title": "Hello", "author_id": "1" }))?;
                    Ok(())
                })
                .on_create_schema(|actions| async move {
                    actions.add_schema_types("type Post implements Node { author: Author }")?;
                    actions.add_schema_resolvers(ResolverMap::new().field(
                        "Post",
                        "author",
                        FieldResolver::new().resolve(|source, _, ctx| {
                            let id = source.get("author_id").and_then(Value::as_str).unwrap_or_default();
                            Ok(ctx.store().resolve(&Reference::new("Author", id)).into())
                        }),
                    ))?;
                    Ok(())
                }),
        )
        .unwrap();
        app.bootstrap().await.unwrap();

        let data = query(&app, r#"{ post(id: "1") { title author { name } } }"#).await;
        assert_eq!(data, json!({ "post": { "title": "Hello", "author": { "name": "Ada" } } }));
        assert!(app.store().is_sealed());
    }

    #[tokio::test]
    async fn test_union_of_content_types() {
        let mut app = app();
        app.use_plugin(
            FnPlugin::new("union")
                .on_load_source(|actions| async move {
                    actions.add_content_type("Book")?.add_node(json!({ "id": "1", "title": "Dune" }))?;
                    actions.add_content_type("Film")?.add_node(json!({ "id": "2", "year": 1984 }))?;
                    Ok(())
                })
                .on_create_schema(|actions| async move {
                    let schema = actions.schema();
                    actions.add_schema_types(vec![
                        TypeDeclaration::from(schema.create_union_type("Media").member("Book").member("Film")),
                        TypeDeclaration::from(schema.create_object_type("Shelf").field("items", "[Media]")),
                    ])?;
                    actions.add_schema_types("type Query { shelf: Shelf }")?;
                    actions.add_schema_resolvers(
                        ResolverMap::new()
                            .field(
                                "Query",
                                "shelf",
                                FieldResolver::new().resolve(|_, _, _| {
                                    Ok(json!({
                                        "items": [
                                            { "typeName": "Book", "id": "1" },
                                            { "typeName": "Film", "id": "2" },
                                        ]
                                    })
                                    .into())
                                }),
                            ),
                    )?;
                    Ok(())
                }),
        )
        .unwrap();
        app.bootstrap().await.unwrap();

        let data = query(
            &app,
            "{ shelf { items { __typename ... on Book { title } ... on Film { year } } } }",
        )
        .await;
        assert_eq!(
            data["shelf"]["items"],
            json!([{ "__typename": "Book", "title": "Dune" }, { "__typename": "Film", "year": 1984 }])
        );
    }

    #[tokio::test]
    async fn test_sanitized_fields_with_resolvers() {
        let mut app = app();
        app.use_plugin(
            FnPlugin::new("numbers")
                .on_load_source(|actions| async move {
                    actions.add_content_type("Post")?.add_node(json!({
                        "id": "1",
                        "123": 10,
                        "456-test": 5,
                        "789-test": 5,
                    }))?;
                    Ok(())
                })
                .on_create_schema(|actions| async move {
                    let double = || {
                        FieldResolver::new().resolve(|source, _, ctx| {
                            let value = source.get(ctx.data_key()).and_then(Value::as_i64).unwrap_or_default();
                            Ok((value * 2).into())
                        })
                    };
                    actions.add_schema_resolvers(
                        ResolverMap::new()
                            .field("Post", "456-test", double())
                            .field("Post", "_789_test", double()),
                    )?;
                    Ok(())
                }),
        )
        .unwrap();
        app.bootstrap().await.unwrap();

        let data = query(&app, r#"{ post(id: "1") { _123 _456_test _789_test } }"#).await;
        assert_eq!(data["post"], json!({ "_123": 10, "_456_test": 10, "_789_test": 10 }));
    }

    #[tokio::test]
    async fn test_custom_root_field_default_argument() {
        let mut app = app();
        app.use_plugin(FnPlugin::new("hello").on_create_schema(|actions| async move {
            actions.add_schema_types(r#"type Query { hello(name: String = "foo"): String }"#)?;
            actions.add_schema_resolvers(ResolverMap::new().field(
                "Query",
                "hello",
                FieldResolver::new().resolve(|_, args, _| Ok(args.str("name").map(str::to_owned).into())),
            ))?;
            Ok(())
        }))
        .unwrap();
        app.bootstrap().await.unwrap();

        let data = query(&app, r#"{ a: hello b: hello(name: "bar") }"#).await;
        assert_eq!(data, json!({ "a": "foo", "b": "bar" }));
    }

    #[tokio::test]
    async fn test_routes_end_with_single_fallback() {
        let mut app = app();
        app.use_plugin(not_found_page()).unwrap();
        app.use_plugin(FnPlugin::new("home").on_create_pages(|actions| async move {
            actions.create_page(
                CreatePageOptions::new("/", "./src/pages/Index.vue")
                    .name("home")
                    .query("{ metadata }"),
            )?;
            Ok(())
        }))
        .unwrap();
        app.bootstrap().await.unwrap();

        let routes = app.routes().unwrap();
        assert_eq!(routes.len(), 3);
        assert_eq!(routes.iter().filter(|r| r.path == "*").count(), 1);
        assert_eq!(routes.last().unwrap().path, "*");
        assert_eq!(routes[1].path, "/");

        let manifest = app.render_routes().unwrap();
        assert!(manifest.starts_with("export default ["));
        assert!(manifest.contains("meta: { data: true }"));
    }

    #[tokio::test]
    async fn test_missing_not_found_page() {
        let mut app = app();
        app.bootstrap().await.unwrap();
        let err = app.routes().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::MissingNotFoundPage)
        );
    }

    #[tokio::test]
    async fn test_write_routes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.build.output = dir.path().join("dist");
        crate::logger::set_quiet(true);

        let mut app = App::new(config);
        app.use_plugin(not_found_page()).unwrap();
        app.bootstrap().await.unwrap();

        let path = app.write_routes().unwrap();
        assert_eq!(path, dir.path().join("dist/routes.js"));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("name: \"*\""));
    }

    #[tokio::test]
    async fn test_duplicate_plugin_rejected() {
        let mut app = app();
        app.use_plugin(FnPlugin::new("a")).unwrap();
        let err = app.use_plugin(FnPlugin::new("a")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::DuplicatePlugin { .. })
        ));
    }

    #[tokio::test]
    async fn test_plugin_error_carries_context() {
        let mut app = app();
        app.use_plugin(FnPlugin::new("broken").on_load_source(|_| async move { Err::<(), _>(anyhow::anyhow!("no data")) }))
            .unwrap();
        let err = app.bootstrap().await.unwrap_err();
        assert_eq!(err.to_string(), "plugin `broken` failed during load_source");
        assert_eq!(err.root_cause().to_string(), "no data");
    }

    #[tokio::test]
    async fn test_lease_revoked_after_phase() {
        let kept: Arc<Mutex<Option<StoreActions>>> = Arc::default();
        let slot = Arc::clone(&kept);

        let mut app = app();
        app.use_plugin(FnPlugin::new("leaky").on_load_source(move |actions| {
            let slot = Arc::clone(&slot);
            async move {
                *slot.lock() = Some(actions);
                Ok(())
            }
        }))
        .unwrap();
        app.bootstrap().await.unwrap();

        let actions = kept.lock().take().unwrap();
        assert!(matches!(
            actions.add_content_type("Late"),
            Err(StoreError::Action(ActionError::Revoked { phase: Phase::LoadSource, .. }))
        ));
    }

    #[tokio::test]
    async fn test_incremental_rebuild_replays_one_plugin() {
        let source_runs = Arc::new(AtomicUsize::new(0));
        let other_runs = Arc::new(AtomicUsize::new(0));
        let titles = Arc::new(Mutex::new(vec!["First"]));

        let mut app = app();
        {
            let runs = Arc::clone(&source_runs);
            let titles = Arc::clone(&titles);
            app.use_plugin(FnPlugin::new("posts").on_load_source(move |actions| {
                runs.fetch_add(1, Ordering::SeqCst);
                let titles = titles.lock().clone();
                async move {
                    let posts = actions.add_content_type("Post")?;
                    for (i, title) in titles.into_iter().enumerate() {
                        posts.add_node(json!({ "id": i.to_string(), "title": title }))?;
                    }
                    Ok(())
                }
            }))
            .unwrap();
        }
        {
            let runs = Arc::clone(&other_runs);
            app.use_plugin(
                FnPlugin::new("authors")
                    .on_load_source(move |actions| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        async move {
                            actions.add_content_type("Author")?.add_node(json!({ "id": "a", "name": "Ada" }))?;
                            Ok(())
                        }
                    })
                    .on_create_schema(|actions| async move {
                        actions.add_schema_types("type Author implements Node { bio: String }")?;
                        Ok(())
                    }),
            )
            .unwrap();
        }
        app.bootstrap().await.unwrap();
        let before = app.schema().unwrap();

        titles.lock().push("Second");
        app.rebuild("posts", Phase::LoadSource).await.unwrap();

        assert_eq!(source_runs.load(Ordering::SeqCst), 2);
        assert_eq!(other_runs.load(Ordering::SeqCst), 1);
        assert!(!Arc::ptr_eq(&before, &app.schema().unwrap()));

        let data = query(&app, "{ allPost { totalCount } allAuthor { totalCount } }").await;
        assert_eq!(data, json!({ "allPost": { "totalCount": 2 }, "allAuthor": { "totalCount": 1 } }));
        // Cached schema contributions of other plugins are replayed
        assert!(app.schema().unwrap().sdl().contains("bio: String"));
        assert!(app.store().is_sealed());
    }

    #[tokio::test]
    async fn test_rebuild_managed_pages() {
        let component = Arc::new(Mutex::new("./About.vue"));
        let mut app = app();
        {
            let component = Arc::clone(&component);
            app.use_plugin(FnPlugin::new("about").on_create_managed_pages(move |actions| {
                let component = *component.lock();
                async move {
                    if let Some(page) = actions.find_page(&PageFilter::default().path("/about"))? {
                        actions.remove_page(&page)?;
                    }
                    actions.create_page(CreatePageOptions::new("/about", component))?;
                    Ok(())
                }
            }))
            .unwrap();
        }
        app.bootstrap().await.unwrap();

        *component.lock() = "./AboutV2.vue";
        app.rebuild("about", Phase::CreateManagedPages).await.unwrap();

        let pages = app.pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].component, "./AboutV2.vue");
    }

    fn two_step_source(name: &'static str, type_name: &'static str) -> FnPlugin {
        FnPlugin::new(name).on_load_source(move |actions| async move {
            let content_type = actions.add_content_type(type_name)?;
            content_type.add_node(json!({ "id": "1" }))?;
            tokio::task::yield_now().await;
            content_type.add_node(json!({ "id": "2" }))?;
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_concurrent_rebuilds_run_one_at_a_time() {
        let mut app = app();
        app.use_plugin(two_step_source("a", "Alpha")).unwrap();
        app.use_plugin(two_step_source("b", "Beta")).unwrap();
        app.bootstrap().await.unwrap();

        let (a, b) = tokio::join!(
            app.rebuild("a", Phase::LoadSource),
            app.rebuild("b", Phase::LoadSource)
        );
        a.unwrap();
        b.unwrap();

        let data = query(&app, "{ allAlpha { totalCount } allBeta { totalCount } }").await;
        assert_eq!(data, json!({ "allAlpha": { "totalCount": 2 }, "allBeta": { "totalCount": 2 } }));
        assert!(app.store().is_sealed());
    }

    #[tokio::test]
    async fn test_failed_source_rebuild_keeps_previous_data() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut app = app();
        {
            let runs = Arc::clone(&runs);
            app.use_plugin(FnPlugin::new("posts").on_load_source(move |actions| {
                let run = runs.fetch_add(1, Ordering::SeqCst);
                async move {
                    let posts = actions.add_content_type("Post")?;
                    posts.add_node(json!({ "id": "1" }))?;
                    if run > 0 {
                        return Err(anyhow::anyhow!("network down"));
                    }
                    posts.add_node(json!({ "id": "2" }))?;
                    actions.add_metadata("site", json!({ "title": "Docs" }))?;
                    Ok(())
                }
            }))
            .unwrap();
        }
        app.bootstrap().await.unwrap();
        let before = app.schema().unwrap();

        let err = app.rebuild("posts", Phase::LoadSource).await.unwrap_err();
        assert_eq!(err.root_cause().to_string(), "network down");

        assert!(Arc::ptr_eq(&before, &app.schema().unwrap()));
        assert!(app.store().is_sealed());
        let data = query(&app, r#"{ allPost { totalCount } metadata(key: "site") }"#).await;
        assert_eq!(data, json!({ "allPost": { "totalCount": 2 }, "metadata": { "title": "Docs" } }));
    }

    #[tokio::test]
    async fn test_failed_schema_rebuild_restores_contributions() {
        let broken = Arc::new(AtomicUsize::new(0));
        let mut app = app();
        app.use_plugin(FnPlugin::new("posts").on_load_source(|actions| async move {
            actions.add_content_type("Post")?.add_node(json!({ "id": "1" }))?;
            Ok(())
        }))
        .unwrap();
        {
            let broken = Arc::clone(&broken);
            app.use_plugin(FnPlugin::new("types").on_create_schema(move |actions| {
                let sdl = match broken.load(Ordering::SeqCst) {
                    0 => "type Post implements Node { summary: String }",
                    _ => "type Post implements Node { author: Missing }",
                };
                async move {
                    actions.add_schema_types(sdl)?;
                    Ok(())
                }
            }))
            .unwrap();
        }
        app.bootstrap().await.unwrap();
        let sdl = app.schema().unwrap().sdl().to_owned();
        let contributions = app.context().schema_builder.lock().contribution_count();

        broken.store(1, Ordering::SeqCst);
        let err = app.rebuild("types", Phase::CreateSchema).await.unwrap_err();
        assert!(format!("{err:#}").contains("unknown type `Missing`"));
        assert_eq!(app.schema().unwrap().sdl(), sdl);
        assert_eq!(app.context().schema_builder.lock().contribution_count(), contributions);

        // Later rebuilds compile against the restored contributions
        app.rebuild("posts", Phase::LoadSource).await.unwrap();
        assert!(app.schema().unwrap().sdl().contains("summary: String"));
    }

    #[tokio::test]
    async fn test_failed_managed_pages_rebuild_restores_pages() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut app = app();
        {
            let runs = Arc::clone(&runs);
            app.use_plugin(FnPlugin::new("about").on_create_managed_pages(move |actions| {
                let run = runs.fetch_add(1, Ordering::SeqCst);
                async move {
                    if run == 0 {
                        actions.create_page(CreatePageOptions::new("/about", "./About.vue"))?;
                        return Ok(());
                    }
                    actions.remove_page_by_path("/about")?;
                    Err(anyhow::anyhow!("template missing"))
                }
            }))
            .unwrap();
        }
        app.bootstrap().await.unwrap();

        assert!(app.rebuild("about", Phase::CreateManagedPages).await.is_err());
        let pages = app.pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].path, "/about");
    }

    #[tokio::test]
    async fn test_rebuild_rejections() {
        let mut app = app();
        app.use_plugin(FnPlugin::new("a")).unwrap();
        assert!(app.rebuild("a", Phase::LoadSource).await.is_err());
        app.bootstrap().await.unwrap();

        let err = app.rebuild("missing", Phase::LoadSource).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::UnknownPlugin { name: "missing".into() })
        );
        let err = app.rebuild("a", Phase::CreatePages).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::PhaseNotRebuildable { phase: Phase::CreatePages })
        );
    }

    #[tokio::test]
    async fn test_pages_can_query_the_schema() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let mut app = app();
        app.use_plugin(
            FnPlugin::new("site")
                .on_load_source(|actions| async move {
                    actions.add_metadata("site", json!({ "title": "Docs" }))?;
                    Ok(())
                })
                .on_create_pages({
                    let seen = Arc::clone(&seen);
                    move |actions| {
                        let seen = Arc::clone(&seen);
                        async move {
                            let response = actions.graphql(r#"{ metadata(key: "site") }"#, json!({})).await?;
                            *seen.lock() = response.data;
                            Ok(())
                        }
                    }
                }),
        )
        .unwrap();
        app.bootstrap().await.unwrap();
        assert_eq!(*seen.lock(), json!({ "metadata": { "title": "Docs" } }));
    }
}
