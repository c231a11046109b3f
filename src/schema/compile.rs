//! Schema compilation.
//!
//! ```text
//!   built-ins ──┐
//!   store ──────┴─ infer ──▶ base registry ◀── overlay ── explicit registry
//!                                 │                            ▲
//!                                 │              merge (origin order)
//!                                 ▼                            │
//!               node shape, connections, root fields     contributions
//!                                 │
//!                             resolvers
//!                                 │
//!                  validate ─▶ print SDL ─▶ dynamic engine
//! ```
//!
//! Merge conflicts are collected across all contributions and reported
//! together; nothing is compiled while any remain.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic as gql;
use async_graphql::{Name, Value as GqlValue};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{Conflict, Diagnostics, SchemaConflicts, SchemaError};
use super::infer::infer_types;
use super::resolve::{Args, ResolveContext, Resolved, Resolver, ResolverMap, Source};
use super::root;
use super::sdl::{MUTATION, QUERY, default_literal, parse_sdl, print_sdl};
use super::types::{ArgDef, FieldDef, ObjectType, SchemaFragment, SchemaTypes, TypeDeclaration, TypeExpr, TypeKind};
use crate::store::{Reference, Store};
use crate::utils::slug::sanitize_identifier;

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Compilation switches.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Infer object types from store contents.
    pub infer: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { infer: true }
    }
}

/// One registration call, kept in call order per origin.
#[derive(Debug, Clone)]
pub(crate) enum Contribution {
    Fragment(SchemaFragment),
    Types(SchemaTypes),
    Resolvers(ResolverMap),
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default)]
struct Registry {
    types: BTreeMap<String, TypeDeclaration>,
}

impl Registry {
    fn merge(&mut self, decl: TypeDeclaration, conflicts: &mut Vec<Conflict>) {
        match self.types.get_mut(decl.name()) {
            Some(existing) => existing.merge(decl, conflicts),
            None => {
                self.types.insert(decl.name().to_owned(), decl);
            }
        }
    }

    fn overlay(&mut self, decl: TypeDeclaration) {
        match self.types.get_mut(decl.name()) {
            Some(existing) => existing.overlay(decl),
            None => {
                self.types.insert(decl.name().to_owned(), decl);
            }
        }
    }

    fn insert_missing(&mut self, decl: TypeDeclaration) {
        self.types.entry(decl.name().to_owned()).or_insert(decl);
    }

    fn kind(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKind::Scalar);
        }
        self.types.get(name).map(TypeDeclaration::kind)
    }

    fn object_mut(&mut self, name: &str) -> Option<&mut ObjectType> {
        match self.types.get_mut(name) {
            Some(TypeDeclaration::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Add root fields not declared already. Explicit root fields win.
    fn add_root_fields(&mut self, fields: impl IntoIterator<Item = FieldDef>) {
        self.insert_missing(ObjectType::new(QUERY).into());
        let Some(query) = self.object_mut(QUERY) else {
            return;
        };
        for field in fields {
            if query.get_field(&field.name).is_none() {
                query.fields.push(field);
            }
        }
    }
}

/// Merge every contribution into one registry, in the order given.
fn collect_explicit<'a>(
    contributions: impl IntoIterator<Item = &'a Contribution>,
    conflicts: &mut Vec<Conflict>,
) -> Result<(Registry, Vec<&'a ResolverMap>), SchemaError> {
    let mut explicit = Registry::default();
    let mut resolvers = Vec::new();

    for contribution in contributions {
        match contribution {
            Contribution::Types(SchemaTypes::Declarations(decls)) => {
                for decl in decls {
                    explicit.merge(decl.clone(), conflicts);
                }
            }
            Contribution::Types(SchemaTypes::Sdl(sdl)) => {
                for decl in parse_sdl(sdl)? {
                    explicit.merge(decl, conflicts);
                }
            }
            Contribution::Fragment(fragment) => {
                for (root, object) in [(QUERY, &fragment.query), (MUTATION, &fragment.mutation)] {
                    if let Some(object) = object {
                        let mut object = object.clone();
                        object.name = root.to_owned();
                        explicit.merge(object.into(), conflicts);
                    }
                }
                for decl in &fragment.types {
                    explicit.merge(decl.clone(), conflicts);
                }
            }
            Contribution::Resolvers(map) => resolvers.push(map),
        }
    }
    Ok((explicit, resolvers))
}

/// Apply a resolver map onto declared fields.
///
/// Fields are found by GraphQL name or raw data key. A missing field is
/// added when the resolver carries a type.
fn apply_resolvers(registry: &mut Registry, map: &ResolverMap, diagnostics: &mut Vec<String>) {
    for (type_name, field_name, entry) in map.iter() {
        let Some(decl) = registry.types.get_mut(type_name) else {
            diagnostics.push(format!("resolvers given for unknown type `{type_name}`"));
            continue;
        };
        let kind = decl.kind();
        let Some(fields) = decl.fields_mut() else {
            diagnostics.push(format!("resolvers given for `{type_name}`, which is of kind {kind}"));
            continue;
        };

        let position = fields
            .iter()
            .position(|f| f.name == field_name)
            .or_else(|| fields.iter().position(|f| f.data_key() == field_name));
        let field = match (position, &entry.ty) {
            (Some(i), _) => &mut fields[i],
            (None, Some(ty)) => {
                let name = sanitize_identifier(field_name).into_owned();
                let field = FieldDef::new(name.as_str(), ty.as_str());
                fields.push(if name == field_name { field } else { field.with_data_key(field_name) });
                let last = fields.len() - 1;
                &mut fields[last]
            }
            (None, None) => {
                diagnostics.push(format!(
                    "resolver for `{type_name}.{field_name}` names no declared field and gives no type"
                ));
                continue;
            }
        };

        if let Some(ty) = &entry.ty {
            field.ty = ty.clone();
        }
        for arg in &entry.args {
            match field.args.iter_mut().find(|a| a.name == arg.name) {
                Some(existing) => *existing = arg.clone(),
                None => field.args.push(arg.clone()),
            }
        }
        if entry.description.is_some() {
            field.description = entry.description.clone();
        }
        if entry.resolve.is_some() {
            field.resolve = entry.resolve.clone();
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn check_type(registry: &Registry, location: &str, ty: &str, input: bool, out: &mut Vec<String>) {
    let expr = match TypeExpr::parse(ty) {
        Ok(expr) => expr,
        Err(_) => {
            out.push(format!("`{location}` has invalid type `{ty}`"));
            return;
        }
    };
    let name = expr.name();
    match registry.kind(name) {
        None => out.push(format!("`{location}` references unknown type `{name}`")),
        Some(kind) if input && !kind.is_input() => {
            out.push(format!("`{location}` takes input but `{name}` is of kind {kind}"));
        }
        Some(kind) if !input && !kind.is_output() => {
            out.push(format!("`{location}` returns `{name}`, which is of kind {kind}"));
        }
        Some(_) => {}
    }
}

fn check_fields(registry: &Registry, owner: &str, fields: &[FieldDef], out: &mut Vec<String>) {
    if fields.is_empty() {
        out.push(format!("`{owner}` declares no fields"));
    }
    for field in fields {
        let location = format!("{owner}.{}", field.name);
        check_type(registry, &location, &field.ty, false, out);
        for arg in &field.args {
            check_type(registry, &format!("{location}({})", arg.name), &arg.ty, true, out);
        }
    }
}

fn validate(registry: &Registry) -> Vec<String> {
    let mut out = Vec::new();
    for root in [QUERY, MUTATION] {
        match registry.types.get(root).map(TypeDeclaration::kind) {
            Some(TypeKind::Object) | None => {}
            Some(kind) => out.push(format!("root type `{root}` must be an object, found kind {kind}")),
        }
    }

    for decl in registry.types.values() {
        let owner = decl.name();
        match decl {
            TypeDeclaration::Object(object) => {
                for interface in &object.interfaces {
                    match registry.types.get(interface) {
                        Some(TypeDeclaration::Interface(declared)) => {
                            for required in &declared.fields {
                                if object.get_field(&required.name).is_none() {
                                    out.push(format!(
                                        "`{owner}` implements `{interface}` but lacks field `{}`",
                                        required.name
                                    ));
                                }
                            }
                        }
                        Some(other) => out.push(format!("`{owner}` implements `{interface}`, which is of kind {}", other.kind())),
                        None => out.push(format!("`{owner}` implements unknown interface `{interface}`")),
                    }
                }
                check_fields(registry, owner, &object.fields, &mut out);
            }
            TypeDeclaration::Interface(interface) => check_fields(registry, owner, &interface.fields, &mut out),
            TypeDeclaration::Union(union) => {
                if union.types.is_empty() {
                    out.push(format!("union `{owner}` has no member types"));
                }
                for member in &union.types {
                    match registry.kind(member) {
                        Some(TypeKind::Object) => {}
                        Some(kind) => out.push(format!("union `{owner}` member `{member}` is of kind {kind}, not object")),
                        None => out.push(format!("union `{owner}` references unknown type `{member}`")),
                    }
                }
            }
            TypeDeclaration::InputObject(input) => {
                if input.fields.is_empty() {
                    out.push(format!("`{owner}` declares no fields"));
                }
                for field in &input.fields {
                    check_type(registry, &format!("{owner}.{}", field.name), &field.ty, true, &mut out);
                }
            }
            TypeDeclaration::Enum(enumeration) => {
                if enumeration.values.is_empty() {
                    out.push(format!("enum `{owner}` declares no values"));
                }
            }
            TypeDeclaration::Scalar(_) => {}
        }
    }
    out
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile the store and contributions into an executable schema.
pub(crate) fn compile<'a>(
    store: &Store,
    contributions: impl IntoIterator<Item = &'a Contribution>,
    options: &CompileOptions,
) -> Result<CompiledSchema, SchemaError> {
    let mut conflicts = Vec::new();
    let mut base = Registry::default();
    for decl in root::builtin_types() {
        base.merge(decl, &mut conflicts);
    }
    if options.infer {
        for decl in infer_types(store, &mut conflicts) {
            base.merge(decl, &mut conflicts);
        }
    }
    let (explicit, resolvers) = collect_explicit(contributions, &mut conflicts)?;
    if !conflicts.is_empty() {
        return Err(SchemaError::Conflicts(SchemaConflicts(conflicts)));
    }
    for decl in explicit.types.into_values() {
        base.overlay(decl);
    }

    let mut content_types = Vec::new();
    for collection in store.collections() {
        let name = collection.type_name.as_str();
        base.insert_missing(ObjectType::new(name).into());
        if let Some(object) = base.object_mut(name) {
            root::ensure_node_shape(object);
            content_types.push(name.to_owned());
        }
    }

    for name in &content_types {
        for decl in root::connection_types(name) {
            base.insert_missing(decl);
        }
        let aliases: FxHashMap<String, String> = base
            .object_mut(name)
            .map(|object| {
                object
                    .fields
                    .iter()
                    .filter_map(|f| f.data_key.clone().map(|key| (f.name.clone(), key)))
                    .collect()
            })
            .unwrap_or_default();
        base.add_root_fields(root::content_type_fields(name, aliases));
    }
    base.add_root_fields(root::shared_fields());

    let mut diagnostics = Vec::new();
    for map in resolvers {
        apply_resolvers(&mut base, map, &mut diagnostics);
    }
    diagnostics.extend(validate(&base));
    if !diagnostics.is_empty() {
        return Err(SchemaError::Validation(Diagnostics(diagnostics)));
    }

    let kind_of = |name: &str| base.kind(name);
    let sdl = print_sdl(base.types.values(), &kind_of);
    let engine = build_engine(&base, store, &content_types)?;
    Ok(CompiledSchema {
        engine,
        sdl,
        content_types,
    })
}

// ============================================================================
// Engine
// ============================================================================

/// State shared by every field resolver of one compiled schema.
struct Env {
    store: Store,
    kinds: FxHashMap<String, TypeKind>,
    content_types: FxHashSet<String>,
}

/// Everything one field needs at query time.
struct FieldPlan {
    label: String,
    type_name: String,
    field_name: String,
    data_key: String,
    ty: TypeExpr,
    defaults: Vec<(String, Value)>,
    resolve: Option<Resolver>,
}

fn type_ref(expr: &TypeExpr) -> gql::TypeRef {
    match expr {
        TypeExpr::Named(name) => gql::TypeRef::Named(name.clone().into()),
        TypeExpr::List(inner) => gql::TypeRef::List(Box::new(type_ref(inner))),
        TypeExpr::NonNull(inner) => gql::TypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

fn input_value(arg: &ArgDef, kind_of: &dyn Fn(&str) -> Option<TypeKind>) -> Result<gql::InputValue, SchemaError> {
    let mut input = gql::InputValue::new(arg.name.as_str(), type_ref(&TypeExpr::parse(&arg.ty)?));
    if let Some(default) = &arg.default_value {
        input = input.default_value(default_literal(default, &arg.ty, kind_of));
    }
    if let Some(description) = &arg.description {
        input = input.description(description.as_str());
    }
    Ok(input)
}

fn output_field(
    owner: &str,
    field: &FieldDef,
    env: &Arc<Env>,
    kind_of: &dyn Fn(&str) -> Option<TypeKind>,
) -> Result<gql::Field, SchemaError> {
    let ty = TypeExpr::parse(&field.ty)?;
    let plan = Arc::new(FieldPlan {
        label: format!("{owner}.{}", field.name),
        type_name: owner.to_owned(),
        field_name: field.name.clone(),
        data_key: field.data_key().to_owned(),
        ty: ty.clone(),
        defaults: field
            .args
            .iter()
            .filter_map(|arg| arg.default_value.clone().map(|value| (arg.name.clone(), value)))
            .collect(),
        resolve: field.resolve.clone(),
    });

    let env = Arc::clone(env);
    let mut out = gql::Field::new(field.name.as_str(), type_ref(&ty), move |ctx| {
        let result = plan.run(&env, &ctx);
        gql::FieldFuture::new(async move { result })
    });
    for arg in &field.args {
        out = out.argument(input_value(arg, kind_of)?);
    }
    if let Some(description) = &field.description {
        out = out.description(description.as_str());
    }
    Ok(out)
}

fn build_engine(registry: &Registry, store: &Store, content_types: &[String]) -> Result<gql::Schema, SchemaError> {
    let mut kinds: FxHashMap<String, TypeKind> = registry
        .types
        .iter()
        .map(|(name, decl)| (name.clone(), decl.kind()))
        .collect();
    for scalar in BUILTIN_SCALARS {
        kinds.insert(scalar.to_owned(), TypeKind::Scalar);
    }
    let env = Arc::new(Env {
        store: store.clone(),
        kinds,
        content_types: content_types.iter().cloned().collect(),
    });
    let kind_of = |name: &str| env.kinds.get(name).copied();

    let mutation = matches!(registry.types.get(MUTATION), Some(TypeDeclaration::Object(_))).then_some(MUTATION);
    let mut builder = gql::Schema::build(QUERY, mutation, None);
    for decl in registry.types.values() {
        builder = match decl {
            TypeDeclaration::Object(object) => {
                let mut ty = gql::Object::new(object.name.as_str());
                for interface in &object.interfaces {
                    ty = ty.implement(interface.as_str());
                }
                for field in &object.fields {
                    ty = ty.field(output_field(&object.name, field, &env, &kind_of)?);
                }
                if let Some(description) = &object.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
            TypeDeclaration::Interface(interface) => {
                let mut ty = gql::Interface::new(interface.name.as_str());
                for field in &interface.fields {
                    let mut out = gql::InterfaceField::new(field.name.as_str(), type_ref(&TypeExpr::parse(&field.ty)?));
                    for arg in &field.args {
                        out = out.argument(input_value(arg, &kind_of)?);
                    }
                    if let Some(description) = &field.description {
                        out = out.description(description.as_str());
                    }
                    ty = ty.field(out);
                }
                if let Some(description) = &interface.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
            TypeDeclaration::Union(union) => {
                let mut ty = gql::Union::new(union.name.as_str());
                for member in &union.types {
                    ty = ty.possible_type(member.as_str());
                }
                if let Some(description) = &union.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
            TypeDeclaration::InputObject(input) => {
                let mut ty = gql::InputObject::new(input.name.as_str());
                for field in &input.fields {
                    ty = ty.field(input_value(field, &kind_of)?);
                }
                if let Some(description) = &input.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
            TypeDeclaration::Enum(enumeration) => {
                let mut ty = gql::Enum::new(enumeration.name.as_str());
                for value in &enumeration.values {
                    ty = ty.item(gql::EnumItem::new(value.as_str()));
                }
                if let Some(description) = &enumeration.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
            TypeDeclaration::Scalar(scalar) => {
                let mut ty = gql::Scalar::new(scalar.name.as_str());
                if let Some(description) = &scalar.description {
                    ty = ty.description(description.as_str());
                }
                builder.register(ty)
            }
        };
    }
    builder.finish().map_err(|e| SchemaError::Engine(e.to_string()))
}

impl FieldPlan {
    fn args(&self, ctx: &gql::ResolverContext<'_>) -> async_graphql::Result<Args> {
        let mut map: Map<String, Value> = self.defaults.iter().cloned().collect();
        for (name, value) in ctx.args.iter() {
            map.insert(name.to_string(), value.as_value().clone().into_json()?);
        }
        Ok(Args::new(map))
    }

    fn run<'a>(&self, env: &Env, ctx: &gql::ResolverContext<'a>) -> async_graphql::Result<Option<gql::FieldValue<'a>>> {
        let source = ctx
            .parent_value
            .try_downcast_ref::<Source>()
            .ok()
            .cloned()
            .unwrap_or(Source::Root);

        let resolved = match &self.resolve {
            Some(resolve) => {
                let args = self.args(ctx)?;
                let context = ResolveContext {
                    store: &env.store,
                    type_name: &self.type_name,
                    field_name: &self.field_name,
                    data_key: &self.data_key,
                };
                resolve(&source, &args, &context).map_err(|e| async_graphql::Error::new(e.to_string()))?
            }
            None => source.get(&self.data_key).cloned().map_or(Resolved::Null, Resolved::Value),
        };
        env.convert(resolved, &self.ty, &self.label)
    }
}

fn resolved_to_json(resolved: Resolved) -> Value {
    match resolved {
        Resolved::Null => Value::Null,
        Resolved::Value(value) => value,
        Resolved::Node(node) => node.to_value(),
        Resolved::List(items) => Value::Array(items.into_iter().map(resolved_to_json).collect()),
    }
}

impl Env {
    /// Shape a resolver result to the field's declared type.
    fn convert<'a>(
        &self,
        resolved: Resolved,
        ty: &TypeExpr,
        label: &str,
    ) -> async_graphql::Result<Option<gql::FieldValue<'a>>> {
        match ty {
            TypeExpr::NonNull(inner) => match self.convert(resolved, inner, label)? {
                Some(value) => Ok(Some(value)),
                None => Err(async_graphql::Error::new(format!(
                    "cannot return null for non-nullable field {label}"
                ))),
            },
            TypeExpr::List(inner) => {
                let items = match resolved {
                    Resolved::Null | Resolved::Value(Value::Null) => return Ok(None),
                    Resolved::List(items) => items,
                    Resolved::Value(Value::Array(items)) => items.into_iter().map(Resolved::Value).collect(),
                    single => vec![single],
                };
                let values = items
                    .into_iter()
                    .map(|item| Ok(self.convert(item, inner, label)?.unwrap_or(gql::FieldValue::NULL)))
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(gql::FieldValue::list(values)))
            }
            TypeExpr::Named(name) => self.convert_named(resolved, name),
        }
    }

    fn convert_named<'a>(&self, resolved: Resolved, name: &str) -> async_graphql::Result<Option<gql::FieldValue<'a>>> {
        let kind = self.kinds.get(name).copied().unwrap_or(TypeKind::Scalar);
        if !matches!(kind, TypeKind::Object | TypeKind::Interface | TypeKind::Union) {
            let value = match resolved_to_json(resolved) {
                Value::Null => return Ok(None),
                Value::String(item) if kind == TypeKind::Enum => GqlValue::Enum(Name::new(item)),
                json => GqlValue::from_json(json)?,
            };
            return Ok(Some(gql::FieldValue::value(value)));
        }

        let source = match resolved {
            Resolved::Null | Resolved::Value(Value::Null) => return Ok(None),
            Resolved::Node(node) => Source::Node(node),
            Resolved::Value(value @ Value::Object(_)) => match Reference::from_value(&value) {
                Some(reference) => match self.store.resolve(&reference) {
                    Some(node) => Source::Node(node),
                    None => return Ok(None),
                },
                None => match value {
                    Value::Object(map) => Source::Object(Arc::new(map)),
                    _ => return Ok(None),
                },
            },
            Resolved::Value(Value::String(id)) if self.content_types.contains(name) => {
                match self.store.resolve(&Reference::new(name, id)) {
                    Some(node) => Source::Node(node),
                    None => return Ok(None),
                }
            }
            Resolved::Value(Value::Number(id)) if self.content_types.contains(name) => {
                match self.store.resolve(&Reference::new(name, id.to_string())) {
                    Some(node) => Source::Node(node),
                    None => return Ok(None),
                }
            }
            Resolved::Value(other) => {
                return Err(async_graphql::Error::new(format!("expected an object for `{name}`, got {other}")));
            }
            Resolved::List(_) => {
                return Err(async_graphql::Error::new(format!("expected a single `{name}`, got a list")));
            }
        };

        if !kind.is_abstract() {
            return Ok(Some(gql::FieldValue::owned_any(source)));
        }
        let concrete = match &source {
            Source::Node(node) => node.type_name().to_owned(),
            Source::Object(map) => map
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| async_graphql::Error::new(format!("cannot tell which `{name}` member an object is")))?,
            Source::Root => return Ok(None),
        };
        Ok(Some(gql::FieldValue::owned_any(source).with_type(concrete)))
    }
}

// ============================================================================
// Compiled schema
// ============================================================================

/// Source position of a query error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

/// Result of a query: `data` plus any error entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<QueryError>>,
}

impl QueryResponse {
    pub fn is_ok(&self) -> bool {
        self.errors.is_none()
    }

    /// Error messages, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .flatten()
            .map(|error| error.message.as_str())
            .collect()
    }
}

impl From<async_graphql::Response> for QueryResponse {
    fn from(response: async_graphql::Response) -> Self {
        let errors: Vec<QueryError> = response
            .errors
            .into_iter()
            .map(|error| QueryError {
                message: error.message,
                locations: error
                    .locations
                    .into_iter()
                    .map(|pos| Location {
                        line: pos.line,
                        column: pos.column,
                    })
                    .collect(),
                path: error
                    .path
                    .into_iter()
                    .map(|segment| match segment {
                        async_graphql::PathSegment::Field(name) => Value::String(name),
                        async_graphql::PathSegment::Index(index) => Value::from(index),
                    })
                    .collect(),
            })
            .collect();
        Self {
            data: response.data.into_json().unwrap_or(Value::Null),
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

/// An executable schema plus its printed SDL.
///
/// Immutable once built; a rebuild produces a new value.
pub struct CompiledSchema {
    engine: gql::Schema,
    sdl: String,
    content_types: Vec<String>,
}

impl CompiledSchema {
    /// Printed schema, byte-stable for a given store and contribution set.
    pub fn sdl(&self) -> &str {
        &self.sdl
    }

    /// Content types exposed through root fields.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    pub async fn execute(&self, query: &str, variables: Value) -> QueryResponse {
        let request = async_graphql::Request::new(query).variables(async_graphql::Variables::from_json(variables));
        self.engine.execute(request).await.into()
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("content_types", &self.content_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldResolver, InterfaceType, UnionType};
    use serde_json::json;

    fn compile_with(store: &Store, contributions: &[Contribution]) -> Result<CompiledSchema, SchemaError> {
        compile(store, contributions, &CompileOptions::default())
    }

    #[test]
    fn test_empty_store_compiles() {
        let schema = compile_with(&Store::new(), &[]).unwrap();
        assert!(schema.sdl().contains("interface Node {\n  id: ID!\n}"));
        assert!(schema.sdl().contains("  metadata(key: String): JSON\n"));
        assert!(schema.content_types().is_empty());
    }

    #[test]
    fn test_content_type_root_fields() {
        let store = Store::new();
        store.add_content_type("Post").unwrap().add_node(json!({ "id": "1", "title": "A" })).unwrap();
        let sdl = compile_with(&store, &[]).unwrap().sdl().to_owned();

        assert!(sdl.contains("type Post implements Node {\n  id: ID!\n  title: String\n}"));
        assert!(sdl.contains("  post(id: ID, path: String): Post\n"));
        assert!(sdl.contains(
            "  allPost(sortBy: String, order: SortOrder = ASC, skip: Int = 0, limit: Int, page: Int, perPage: Int, filter: JSON): PostConnection!\n"
        ));
        assert!(sdl.contains("type PostEdge {\n  node: Post!\n  next: Post\n  previous: Post\n}"));
    }

    #[test]
    fn test_conflicts_are_aggregated() {
        let contributions = [
            Contribution::Types("type A { x: Int } type B { y: Int }".into()),
            Contribution::Types("type A { x: String } union B = A".into()),
        ];
        let err = compile_with(&Store::new(), &contributions).unwrap_err();
        assert_eq!(err.conflicts().len(), 2);
    }

    #[test]
    fn test_invalid_sdl_is_reported() {
        let contributions = [Contribution::Types("type {".into())];
        assert!(matches!(
            compile_with(&Store::new(), &contributions),
            Err(SchemaError::InvalidSdl(_))
        ));
    }

    #[test]
    fn test_validation_collects_diagnostics() {
        let decls: Vec<TypeDeclaration> = vec![
            ObjectType::new("A").interface("Missing").field("x", "Nope").into(),
            UnionType::new("Empty").into(),
            InterfaceType::new("Named").field("name", "String").into(),
            ObjectType::new("B").interface("Named").field("other", "Int").into(),
        ];
        let contributions = [Contribution::Types(decls.into())];
        let err = compile_with(&Store::new(), &contributions).unwrap_err();
        let SchemaError::Validation(Diagnostics(messages)) = err else {
            panic!("expected validation error, got {err}");
        };
        assert!(messages.iter().any(|m| m.contains("unknown interface `Missing`")));
        assert!(messages.iter().any(|m| m.contains("`A.x` references unknown type `Nope`")));
        assert!(messages.iter().any(|m| m.contains("union `Empty` has no member types")));
        assert!(messages.iter().any(|m| m.contains("lacks field `name`")));
    }

    #[test]
    fn test_resolver_without_field_or_type_is_rejected() {
        let contributions = [Contribution::Resolvers(
            ResolverMap::new().field("Query", "ghost", FieldResolver::new().resolve(|_, _, _| Ok(Resolved::Null))),
        )];
        let err = compile_with(&Store::new(), &contributions).unwrap_err();
        assert!(err.to_string().contains("`Query.ghost`"));
    }

    #[test]
    fn test_explicit_root_field_wins() {
        let store = Store::new();
        store.add_content_type("Post").unwrap();
        let contributions = [Contribution::Types("type Query { post: String }".into())];
        let sdl = compile_with(&store, &contributions).unwrap().sdl().to_owned();
        assert!(sdl.contains("  post: String\n"));
        assert!(!sdl.contains("post(id: ID"));
    }

    #[test]
    fn test_query_response_serializes_without_errors() {
        let response = QueryResponse {
            data: json!({ "a": 1 }),
            errors: None,
        };
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "data": { "a": 1 } }));
        assert!(response.is_ok());
    }
}
