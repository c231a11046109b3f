//! Type declarations contributed by plugins.
//!
//! Declarations are a tagged union with one builder per kind. Field and
//! argument types are written the way they appear in SDL (`"[Post!]!"`) and
//! parsed into [`TypeExpr`] when the schema is compiled.

use std::fmt;

use async_graphql::parser::types::{BaseType, Type};
use serde_json::Value;

use super::error::{Conflict, SchemaError};
use super::resolve::{Args, ResolveContext, ResolveError, Resolved, Resolver, Source, resolver};

// ============================================================================
// Type expressions
// ============================================================================

/// Parsed field type: a named type wrapped in list and non-null modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Named(String),
    List(Box<TypeExpr>),
    NonNull(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        Type::new(text.trim())
            .map(|ty| Self::from_parsed(&ty))
            .ok_or_else(|| SchemaError::InvalidTypeExpr(text.to_owned()))
    }

    pub(crate) fn from_parsed(ty: &Type) -> Self {
        let base = match &ty.base {
            BaseType::Named(name) => TypeExpr::Named(name.to_string()),
            BaseType::List(inner) => TypeExpr::List(Box::new(Self::from_parsed(inner))),
        };
        if ty.nullable {
            base
        } else {
            TypeExpr::NonNull(Box::new(base))
        }
    }

    /// Innermost named type.
    pub fn name(&self) -> &str {
        match self {
            TypeExpr::Named(name) => name,
            TypeExpr::List(inner) | TypeExpr::NonNull(inner) => inner.name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeExpr::NonNull(_))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::List(inner) => write!(f, "[{inner}]"),
            TypeExpr::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Compare two type strings structurally, falling back to text.
pub(crate) fn same_type(a: &str, b: &str) -> bool {
    match (TypeExpr::parse(a), TypeExpr::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

// ============================================================================
// Fields and arguments
// ============================================================================

/// Field argument, or input object field.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDef {
    pub name: String,
    pub ty: String,
    pub default_value: Option<Value>,
    pub description: Option<String>,
}

impl ArgDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default_value: None,
            description: None,
        }
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Output field of an object or interface type.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: String,
    pub args: Vec<ArgDef>,
    pub description: Option<String>,
    pub resolve: Option<Resolver>,
    /// Raw node key behind a sanitized field name.
    pub(crate) data_key: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            args: Vec::new(),
            description: None,
            resolve: None,
            data_key: None,
        }
    }

    pub fn arg(mut self, arg: ArgDef) -> Self {
        self.args.push(arg);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn resolve<F>(mut self, f: F) -> Self
    where
        F: Fn(&Source, &Args, &ResolveContext<'_>) -> Result<Resolved, ResolveError> + Send + Sync + 'static,
    {
        self.resolve = Some(resolver(f));
        self
    }

    pub(crate) fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    /// Node key this field reads by default.
    pub fn data_key(&self) -> &str {
        self.data_key.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args)
            .field("data_key", &self.data_key)
            .field("resolve", &self.resolve.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    InputObject,
    Enum,
    Scalar,
}

impl TypeKind {
    pub fn is_output(self) -> bool {
        !matches!(self, TypeKind::InputObject)
    }

    pub fn is_input(self) -> bool {
        matches!(self, TypeKind::InputObject | TypeKind::Enum | TypeKind::Scalar)
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Union)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeKind::Object => "object",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::InputObject => "input object",
            TypeKind::Enum => "enum",
            TypeKind::Scalar => "scalar",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Add a plain field: `.field("title", "String")`.
    pub fn field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.field_with(FieldDef::new(name, ty))
    }

    pub fn field_with(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.field_with(FieldDef::new(name, ty))
    }

    pub fn field_with(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub types: Vec<String>,
}

impl UnionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn member(mut self, type_name: impl Into<String>) -> Self {
        self.types.push(type_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<ArgDef>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn field(self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.field_with(ArgDef::new(name, ty))
    }

    pub fn field_with(mut self, field: ArgDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A plugin-authored GraphQL type description.
#[derive(Debug, Clone)]
pub enum TypeDeclaration {
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    InputObject(InputObjectType),
    Enum(EnumType),
    Scalar(ScalarType),
}

macro_rules! impl_from_declaration {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for TypeDeclaration {
                fn from(decl: $ty) -> Self {
                    TypeDeclaration::$variant(decl)
                }
            }
        )*
    };
}

impl_from_declaration!(
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    InputObject(InputObjectType),
    Enum(EnumType),
    Scalar(ScalarType),
);

impl TypeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclaration::Object(t) => &t.name,
            TypeDeclaration::Interface(t) => &t.name,
            TypeDeclaration::Union(t) => &t.name,
            TypeDeclaration::InputObject(t) => &t.name,
            TypeDeclaration::Enum(t) => &t.name,
            TypeDeclaration::Scalar(t) => &t.name,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            TypeDeclaration::Object(t) => t.name = name,
            TypeDeclaration::Interface(t) => t.name = name,
            TypeDeclaration::Union(t) => t.name = name,
            TypeDeclaration::InputObject(t) => t.name = name,
            TypeDeclaration::Enum(t) => t.name = name,
            TypeDeclaration::Scalar(t) => t.name = name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDeclaration::Object(_) => TypeKind::Object,
            TypeDeclaration::Interface(_) => TypeKind::Interface,
            TypeDeclaration::Union(_) => TypeKind::Union,
            TypeDeclaration::InputObject(_) => TypeKind::InputObject,
            TypeDeclaration::Enum(_) => TypeKind::Enum,
            TypeDeclaration::Scalar(_) => TypeKind::Scalar,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeDeclaration::Object(t) => t.description.as_deref(),
            TypeDeclaration::Interface(t) => t.description.as_deref(),
            TypeDeclaration::Union(t) => t.description.as_deref(),
            TypeDeclaration::InputObject(t) => t.description.as_deref(),
            TypeDeclaration::Enum(t) => t.description.as_deref(),
            TypeDeclaration::Scalar(t) => t.description.as_deref(),
        }
    }

    /// Output fields, for objects and interfaces.
    pub(crate) fn fields_mut(&mut self) -> Option<&mut Vec<FieldDef>> {
        match self {
            TypeDeclaration::Object(t) => Some(&mut t.fields),
            TypeDeclaration::Interface(t) => Some(&mut t.fields),
            _ => None,
        }
    }

    pub(crate) fn fields(&self) -> Option<&[FieldDef]> {
        match self {
            TypeDeclaration::Object(t) => Some(&t.fields),
            TypeDeclaration::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }

    /// Merge another declaration of the same type name into this one.
    ///
    /// Fields combine; a field declared twice must have the same type.
    /// Declarations of different kinds never merge.
    pub fn merge(&mut self, other: TypeDeclaration, conflicts: &mut Vec<Conflict>) {
        let type_name = self.name().to_owned();
        if self.kind() != other.kind() {
            conflicts.push(Conflict::KindMismatch {
                type_name,
                existing: self.kind(),
                incoming: other.kind(),
            });
            return;
        }

        match (self, other) {
            (TypeDeclaration::Object(a), TypeDeclaration::Object(b)) => {
                merge_description(&mut a.description, b.description);
                merge_names(&mut a.interfaces, b.interfaces);
                merge_fields(&type_name, &mut a.fields, b.fields, conflicts);
            }
            (TypeDeclaration::Interface(a), TypeDeclaration::Interface(b)) => {
                merge_description(&mut a.description, b.description);
                merge_fields(&type_name, &mut a.fields, b.fields, conflicts);
            }
            (TypeDeclaration::Union(a), TypeDeclaration::Union(b)) => {
                merge_description(&mut a.description, b.description);
                merge_names(&mut a.types, b.types);
            }
            (TypeDeclaration::InputObject(a), TypeDeclaration::InputObject(b)) => {
                merge_description(&mut a.description, b.description);
                merge_args(&type_name, None, &mut a.fields, b.fields, conflicts);
            }
            (TypeDeclaration::Enum(a), TypeDeclaration::Enum(b)) => {
                merge_description(&mut a.description, b.description);
                merge_names(&mut a.values, b.values);
            }
            (TypeDeclaration::Scalar(a), TypeDeclaration::Scalar(b)) => {
                merge_description(&mut a.description, b.description);
            }
            _ => {}
        }
    }

    /// Lay an explicit declaration over an inferred or built-in one.
    ///
    /// Explicit field definitions replace inferred ones in place and inherit
    /// their data key; a different kind replaces the whole declaration.
    pub(crate) fn overlay(&mut self, explicit: TypeDeclaration) {
        match (self, explicit) {
            (TypeDeclaration::Object(a), TypeDeclaration::Object(b)) => {
                if b.description.is_some() {
                    a.description = b.description;
                }
                merge_names(&mut a.interfaces, b.interfaces);
                overlay_fields(&mut a.fields, b.fields);
            }
            (TypeDeclaration::Interface(a), TypeDeclaration::Interface(b)) => {
                if b.description.is_some() {
                    a.description = b.description;
                }
                overlay_fields(&mut a.fields, b.fields);
            }
            (this, explicit) => *this = explicit,
        }
    }
}

fn merge_description(current: &mut Option<String>, incoming: Option<String>) {
    if current.is_none() {
        *current = incoming;
    }
}

/// Append names not already present, keeping first-seen order.
fn merge_names(current: &mut Vec<String>, incoming: Vec<String>) {
    for name in incoming {
        if !current.contains(&name) {
            current.push(name);
        }
    }
}

fn merge_fields(type_name: &str, current: &mut Vec<FieldDef>, incoming: Vec<FieldDef>, conflicts: &mut Vec<Conflict>) {
    for field in incoming {
        let Some(existing) = current.iter_mut().find(|f| f.name == field.name) else {
            current.push(field);
            continue;
        };
        if !same_type(&existing.ty, &field.ty) {
            conflicts.push(Conflict::FieldType {
                type_name: type_name.to_owned(),
                field: field.name,
                existing: existing.ty.clone(),
                incoming: field.ty,
            });
            continue;
        }
        merge_args(type_name, Some(&existing.name), &mut existing.args, field.args, conflicts);
        merge_description(&mut existing.description, field.description);
        if field.resolve.is_some() {
            existing.resolve = field.resolve;
        }
        if existing.data_key.is_none() {
            existing.data_key = field.data_key;
        }
    }
}

fn merge_args(
    type_name: &str,
    field: Option<&str>,
    current: &mut Vec<ArgDef>,
    incoming: Vec<ArgDef>,
    conflicts: &mut Vec<Conflict>,
) {
    for arg in incoming {
        let Some(existing) = current.iter_mut().find(|a| a.name == arg.name) else {
            current.push(arg);
            continue;
        };
        if !same_type(&existing.ty, &arg.ty) {
            conflicts.push(Conflict::ArgType {
                type_name: type_name.to_owned(),
                field: field.map(str::to_owned),
                arg: arg.name,
                existing: existing.ty.clone(),
                incoming: arg.ty,
            });
            continue;
        }
        if existing.default_value.is_none() {
            existing.default_value = arg.default_value;
        }
        merge_description(&mut existing.description, arg.description);
    }
}

fn overlay_fields(current: &mut Vec<FieldDef>, explicit: Vec<FieldDef>) {
    for mut field in explicit {
        match current.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => {
                if field.data_key.is_none() {
                    field.data_key = existing.data_key.take();
                }
                if field.resolve.is_none() {
                    field.resolve = existing.resolve.take();
                }
                *existing = field;
            }
            None => current.push(field),
        }
    }
}

/// Custom root fields contributed through `add_schema`.
///
/// The root type names of a fragment are irrelevant: its query fields are
/// merged into `Query` and its mutation fields into `Mutation`.
#[derive(Debug, Clone, Default)]
pub struct SchemaFragment {
    pub query: Option<ObjectType>,
    pub mutation: Option<ObjectType>,
    pub types: Vec<TypeDeclaration>,
}

impl SchemaFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: ObjectType) -> Self {
        self.query = Some(query);
        self
    }

    pub fn mutation(mut self, mutation: ObjectType) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = TypeDeclaration>) -> Self {
        self.types.extend(types);
        self
    }
}

/// Argument of `add_schema_types`: structured declarations or SDL text.
#[derive(Debug, Clone)]
pub enum SchemaTypes {
    Declarations(Vec<TypeDeclaration>),
    Sdl(String),
}

impl From<Vec<TypeDeclaration>> for SchemaTypes {
    fn from(decls: Vec<TypeDeclaration>) -> Self {
        SchemaTypes::Declarations(decls)
    }
}

impl From<TypeDeclaration> for SchemaTypes {
    fn from(decl: TypeDeclaration) -> Self {
        SchemaTypes::Declarations(vec![decl])
    }
}

impl From<&str> for SchemaTypes {
    fn from(sdl: &str) -> Self {
        SchemaTypes::Sdl(sdl.to_owned())
    }
}

impl From<String> for SchemaTypes {
    fn from(sdl: String) -> Self {
        SchemaTypes::Sdl(sdl)
    }
}
