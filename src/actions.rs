//! Plugin action façades.
//!
//! Each build phase hands plugins a capability record holding exactly the
//! actions allowed in that phase. Records are composed, never inherited:
//!
//! ```text
//! BaseActions            graphql, resolve
//!   ├─ StoreActions      + add_metadata, add_content_type, get_content_type, slugify, store()
//!   │    └─ SchemaActions + add_schema, add_schema_types, add_schema_resolvers, schema()
//!   └─ PagesActions      + get_content_type, create_page
//!        └─ ManagedPagesActions + update_page, remove_*, find_*
//! ```
//!
//! An action missing from a record does not exist on its type, so misuse is
//! a compile error. Every record also carries a [`Lease`] that is revoked
//! when its phase ends: a handle kept past its phase fails loudly with
//! [`ActionError::Revoked`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use thiserror::Error;

use crate::app::BuildContext;
use crate::pages::{CreatePageOptions, Page, PageError, PageFilter, PageInternals};
use crate::schema::{
    EnumType, InputObjectType, InterfaceType, ObjectType, QueryResponse, ResolverMap, ScalarType, SchemaFragment,
    SchemaTypes, UnionType,
};
use crate::store::{ContentType, ContentTypeOptions, Node, Reference, StoreError};
use crate::utils::digest::make_uid;
use crate::utils::slug::{create_type_name, slugify};

// ============================================================================
// Phases and ownership
// ============================================================================

/// Plugin lifecycle phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    LoadSource,
    CreateSchema,
    CreatePages,
    CreateManagedPages,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::LoadSource,
        Phase::CreateSchema,
        Phase::CreatePages,
        Phase::CreateManagedPages,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::LoadSource => "load_source",
            Phase::CreateSchema => "create_schema",
            Phase::CreatePages => "create_pages",
            Phase::CreateManagedPages => "create_managed_pages",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who contributed a store entry or schema declaration.
///
/// Ordered by plugin registration index first, so replaying one plugin's
/// contributions lands them in the same position as a full build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Origin {
    pub plugin: usize,
    pub phase: Phase,
}

impl Origin {
    /// Contributions made directly through the library API, outside plugins.
    pub const HOST: Origin = Origin {
        plugin: usize::MAX,
        phase: Phase::LoadSource,
    };

    pub const fn new(plugin: usize, phase: Phase) -> Self {
        Self { plugin, phase }
    }
}

/// Action façade errors.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("`{action}` called after the {phase} phase ended")]
    Revoked { action: &'static str, phase: Phase },

    #[error("graphql() called before the schema is generated")]
    SchemaNotReady,
}

/// Liveness token shared by every handle created during one plugin hook.
#[derive(Debug, Clone)]
pub struct Lease {
    live: Arc<AtomicBool>,
    phase: Phase,
}

impl Lease {
    pub(crate) fn new(phase: Phase) -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
            phase,
        }
    }

    pub(crate) fn revoke(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn check(&self, action: &'static str) -> Result<(), ActionError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ActionError::Revoked {
                action,
                phase: self.phase,
            })
        }
    }
}

// ============================================================================
// Delegation
// ============================================================================

/// Re-expose a smaller record's actions on a larger one.
macro_rules! delegate {
    ($field:ident => $( $(#[$attr:meta])* fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty; )*) => {
        $(
            $(#[$attr])*
            #[allow(deprecated)]
            pub fn $name(&self $(, $arg: $ty)*) -> $ret {
                self.$field.$name($($arg),*)
            }
        )*
    };
}

macro_rules! delegate_async {
    ($field:ident => $( fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty; )*) => {
        $(
            pub async fn $name(&self $(, $arg: $ty)*) -> $ret {
                self.$field.$name($($arg),*).await
            }
        )*
    };
}

// ============================================================================
// Base
// ============================================================================

/// Read-only actions available in every phase.
#[derive(Clone)]
pub struct BaseActions {
    ctx: Arc<BuildContext>,
    lease: Lease,
}

impl BaseActions {
    pub(crate) fn new(ctx: Arc<BuildContext>, lease: Lease) -> Self {
        Self { ctx, lease }
    }

    /// Execute a query against the compiled schema.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError> {
        self.lease.check("graphql")?;
        self.ctx.graphql(query, variables).await
    }

    /// Resolve a reference to its node. Dangling references yield `None`.
    pub fn resolve(&self, reference: &Reference) -> Result<Option<Arc<Node>>, ActionError> {
        self.lease.check("resolve")?;
        Ok(self.ctx.store.resolve(reference))
    }
}

// ============================================================================
// Store
// ============================================================================

/// Pure helpers grouped under `actions.store()`.
pub struct StoreHelpers<'a> {
    lease: &'a Lease,
}

impl StoreHelpers<'_> {
    pub fn create_reference(&self, type_name: &str, id: &str) -> Result<Reference, ActionError> {
        self.lease.check("store.create_reference")?;
        Ok(Reference::new(type_name, id))
    }
}

/// Actions for the `load_source` phase.
#[derive(Clone)]
pub struct StoreActions {
    base: BaseActions,
    origin: Origin,
}

impl StoreActions {
    pub(crate) fn new(ctx: Arc<BuildContext>, lease: Lease, origin: Origin) -> Self {
        Self {
            base: BaseActions::new(ctx, lease),
            origin,
        }
    }

    delegate_async! { base =>
        fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError>;
    }

    delegate! { base =>
        fn resolve(&self, reference: &Reference) -> Result<Option<Arc<Node>>, ActionError>;
    }

    fn lease(&self) -> &Lease {
        &self.base.lease
    }

    fn ctx(&self) -> &BuildContext {
        &self.base.ctx
    }

    pub fn add_metadata(&self, key: &str, data: Value) -> Result<(), StoreError> {
        self.ctx()
            .store
            .add_metadata_as(key.to_owned(), data, self.origin, Some(self.lease()))
    }

    pub fn add_content_type(&self, options: impl Into<ContentTypeOptions>) -> Result<ContentType, StoreError> {
        self.ctx()
            .store
            .add_content_type_as(options.into(), self.origin, Some(self.lease().clone()))
    }

    pub fn get_content_type(&self, type_name: &str) -> Result<Option<ContentType>, ActionError> {
        self.lease().check("get_content_type")?;
        Ok(self
            .ctx()
            .store
            .get_content_type_as(type_name, self.origin, Some(self.lease().clone())))
    }

    pub fn slugify(&self, text: &str) -> Result<String, ActionError> {
        self.lease().check("slugify")?;
        Ok(slugify(text))
    }

    pub fn store(&self) -> StoreHelpers<'_> {
        StoreHelpers { lease: self.lease() }
    }

    #[deprecated(note = "use `Store::create_type_name`")]
    pub fn create_type_name(&self, raw: &str) -> Result<String, ActionError> {
        self.lease().check("create_type_name")?;
        Ok(create_type_name(raw))
    }

    #[deprecated(note = "use `store().create_reference`")]
    pub fn create_reference(&self, type_name: &str, id: &str) -> Result<Reference, ActionError> {
        self.store().create_reference(type_name, id)
    }

    /// Deterministic id derived from an organization identifier.
    #[deprecated(note = "derive ids from your source data")]
    pub fn make_uid(&self, org_id: &str) -> Result<String, ActionError> {
        self.lease().check("make_uid")?;
        Ok(make_uid(org_id))
    }

    #[deprecated(note = "use `Store::create_type_name`")]
    pub fn make_type_name(&self, raw: &str) -> Result<String, ActionError> {
        self.lease().check("make_type_name")?;
        Ok(create_type_name(raw))
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Declaration constructors grouped under `actions.schema()`.
pub struct SchemaHelpers;

impl SchemaHelpers {
    pub fn create_object_type(&self, name: &str) -> ObjectType {
        ObjectType::new(name)
    }

    pub fn create_union_type(&self, name: &str) -> UnionType {
        UnionType::new(name)
    }

    pub fn create_interface_type(&self, name: &str) -> InterfaceType {
        InterfaceType::new(name)
    }

    pub fn create_input_object_type(&self, name: &str) -> InputObjectType {
        InputObjectType::new(name)
    }

    pub fn create_enum_type(&self, name: &str) -> EnumType {
        EnumType::new(name)
    }

    pub fn create_scalar_type(&self, name: &str) -> ScalarType {
        ScalarType::new(name)
    }
}

/// Actions for the `create_schema` phase: store actions plus schema
/// registration.
#[derive(Clone)]
pub struct SchemaActions {
    store: StoreActions,
}

impl SchemaActions {
    pub(crate) fn new(ctx: Arc<BuildContext>, lease: Lease, origin: Origin) -> Self {
        Self {
            store: StoreActions::new(ctx, lease, origin),
        }
    }

    delegate_async! { store =>
        fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError>;
    }

    delegate! { store =>
        fn resolve(&self, reference: &Reference) -> Result<Option<Arc<Node>>, ActionError>;
        fn add_metadata(&self, key: &str, data: Value) -> Result<(), StoreError>;
        fn add_content_type(&self, options: impl Into<ContentTypeOptions>) -> Result<ContentType, StoreError>;
        fn get_content_type(&self, type_name: &str) -> Result<Option<ContentType>, ActionError>;
        fn slugify(&self, text: &str) -> Result<String, ActionError>;
        fn store(&self) -> StoreHelpers<'_>;
        #[deprecated(note = "use `Store::create_type_name`")]
        fn create_type_name(&self, raw: &str) -> Result<String, ActionError>;
        #[deprecated(note = "use `store().create_reference`")]
        fn create_reference(&self, type_name: &str, id: &str) -> Result<Reference, ActionError>;
        #[deprecated(note = "derive ids from your source data")]
        fn make_uid(&self, org_id: &str) -> Result<String, ActionError>;
        #[deprecated(note = "use `Store::create_type_name`")]
        fn make_type_name(&self, raw: &str) -> Result<String, ActionError>;
    }

    /// Register a standalone schema fragment whose root fields are merged
    /// into the root query and mutation types.
    pub fn add_schema(&self, fragment: SchemaFragment) -> Result<(), ActionError> {
        self.store.lease().check("add_schema")?;
        self.store
            .ctx()
            .schema_builder
            .lock()
            .add_schema_as(self.store.origin, fragment);
        Ok(())
    }

    /// Register structured declarations or SDL text.
    pub fn add_schema_types(&self, types: impl Into<SchemaTypes>) -> Result<(), ActionError> {
        self.store.lease().check("add_schema_types")?;
        self.store
            .ctx()
            .schema_builder
            .lock()
            .add_schema_types_as(self.store.origin, types.into());
        Ok(())
    }

    pub fn add_schema_resolvers(&self, resolvers: ResolverMap) -> Result<(), ActionError> {
        self.store.lease().check("add_schema_resolvers")?;
        self.store
            .ctx()
            .schema_builder
            .lock()
            .add_schema_resolvers_as(self.store.origin, resolvers);
        Ok(())
    }

    pub fn schema(&self) -> SchemaHelpers {
        SchemaHelpers
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Actions for the `create_pages` phase.
#[derive(Clone)]
pub struct PagesActions {
    base: BaseActions,
    origin: Origin,
    internals: PageInternals,
}

impl PagesActions {
    pub(crate) fn new(ctx: Arc<BuildContext>, lease: Lease, origin: Origin, digest: String) -> Self {
        Self {
            base: BaseActions::new(ctx, lease),
            origin,
            internals: PageInternals {
                digest,
                is_managed: false,
            },
        }
    }

    delegate_async! { base =>
        fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError>;
    }

    delegate! { base =>
        fn resolve(&self, reference: &Reference) -> Result<Option<Arc<Node>>, ActionError>;
    }

    fn check(&self, action: &'static str) -> Result<&BuildContext, ActionError> {
        self.base.lease.check(action)?;
        Ok(&self.base.ctx)
    }

    /// Read-only content type handle; the store is sealed in this phase.
    pub fn get_content_type(&self, type_name: &str) -> Result<Option<ContentType>, ActionError> {
        let ctx = self.check("get_content_type")?;
        Ok(ctx
            .store
            .get_content_type_as(type_name, self.origin, Some(self.base.lease.clone())))
    }

    pub fn create_page(&self, options: CreatePageOptions) -> Result<Page, PageError> {
        let ctx = self.check("create_page")?;
        ctx.pages.write().create_page(options, &self.internals)
    }
}

/// Actions for the `create_managed_pages` phase: page actions plus lookup,
/// update and removal of pages.
#[derive(Clone)]
pub struct ManagedPagesActions {
    pages: PagesActions,
}

impl ManagedPagesActions {
    pub(crate) fn new(ctx: Arc<BuildContext>, lease: Lease, origin: Origin, digest: String) -> Self {
        let mut pages = PagesActions::new(ctx, lease, origin, digest);
        pages.internals.is_managed = true;
        Self { pages }
    }

    delegate_async! { pages =>
        fn graphql(&self, query: &str, variables: Value) -> Result<QueryResponse, ActionError>;
    }

    delegate! { pages =>
        fn resolve(&self, reference: &Reference) -> Result<Option<Arc<Node>>, ActionError>;
        fn get_content_type(&self, type_name: &str) -> Result<Option<ContentType>, ActionError>;
        fn create_page(&self, options: CreatePageOptions) -> Result<Page, PageError>;
    }

    /// Replace an existing page's component, query and context.
    pub fn update_page(&self, options: CreatePageOptions) -> Result<Page, PageError> {
        let ctx = self.pages.check("update_page")?;
        ctx.pages.write().update_page(options, &self.pages.internals)
    }

    pub fn remove_page(&self, page: &Page) -> Result<bool, ActionError> {
        let ctx = self.pages.check("remove_page")?;
        Ok(ctx.pages.write().remove_page(page))
    }

    pub fn remove_page_by_path(&self, path: &str) -> Result<usize, ActionError> {
        let ctx = self.pages.check("remove_page_by_path")?;
        Ok(ctx.pages.write().remove_page_by_path(path))
    }

    pub fn remove_pages_by_component(&self, component: &str) -> Result<usize, ActionError> {
        let ctx = self.pages.check("remove_pages_by_component")?;
        Ok(ctx.pages.write().remove_pages_by_component(component))
    }

    pub fn find_and_remove_pages(&self, filter: &PageFilter) -> Result<usize, ActionError> {
        let ctx = self.pages.check("find_and_remove_pages")?;
        Ok(ctx.pages.write().find_and_remove_pages(filter))
    }

    pub fn find_page(&self, filter: &PageFilter) -> Result<Option<Page>, ActionError> {
        let ctx = self.pages.check("find_page")?;
        Ok(ctx.pages.read().find_page(filter))
    }

    pub fn find_pages(&self, filter: &PageFilter) -> Result<Vec<Page>, ActionError> {
        let ctx = self.pages.check("find_pages")?;
        Ok(ctx.pages.read().find_pages(filter))
    }
}
