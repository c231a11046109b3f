//! SDL parsing and printing.
//!
//! Parsing turns plugin-supplied SDL text into structured declarations, so
//! SDL and builder contributions merge through the same path. Printing
//! renders the compiled registry with types sorted by name and fields in
//! declaration order, which makes the output byte-stable for a given input.

use std::fmt::Write;

use async_graphql::Name;
use async_graphql::Value as GqlValue;
use async_graphql::parser::parse_schema;
use async_graphql::parser::types::{InputValueDefinition, TypeDefinition, TypeKind as SdlKind, TypeSystemDefinition};
use serde_json::Value;

use super::error::SchemaError;
use super::types::{
    ArgDef, EnumType, FieldDef, InputObjectType, InterfaceType, ObjectType, ScalarType, TypeDeclaration, TypeExpr,
    TypeKind, UnionType,
};

pub(crate) const QUERY: &str = "Query";
pub(crate) const MUTATION: &str = "Mutation";

// ============================================================================
// Parsing
// ============================================================================

/// Parse SDL into declarations.
///
/// Custom root names from a `schema { query: X }` block are folded into
/// `Query` and `Mutation`; `extend type` merges like a second declaration.
pub fn parse_sdl(sdl: &str) -> Result<Vec<TypeDeclaration>, SchemaError> {
    let document = parse_schema(sdl).map_err(|e| SchemaError::InvalidSdl(e.to_string()))?;

    let mut query_root = None;
    let mut mutation_root = None;
    let mut declarations = Vec::new();
    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Schema(schema) => {
                query_root = schema.node.query.map(|name| name.node.to_string());
                mutation_root = schema.node.mutation.map(|name| name.node.to_string());
            }
            TypeSystemDefinition::Type(ty) => declarations.push(convert_type(ty.node)?),
            TypeSystemDefinition::Directive(_) => {}
        }
    }

    for decl in &mut declarations {
        if query_root.as_deref() == Some(decl.name()) {
            decl.set_name(QUERY.to_owned());
        } else if mutation_root.as_deref() == Some(decl.name()) {
            decl.set_name(MUTATION.to_owned());
        }
    }
    Ok(declarations)
}

fn convert_type(definition: TypeDefinition) -> Result<TypeDeclaration, SchemaError> {
    let name = definition.name.node.to_string();
    let description = definition.description.map(|d| d.node);

    let decl = match definition.kind {
        SdlKind::Scalar => ScalarType { name, description }.into(),
        SdlKind::Object(object) => ObjectType {
            name,
            description,
            interfaces: object.implements.into_iter().map(|i| i.node.to_string()).collect(),
            fields: object
                .fields
                .into_iter()
                .map(|f| convert_field(f.node))
                .collect::<Result<_, _>>()?,
        }
        .into(),
        SdlKind::Interface(interface) => InterfaceType {
            name,
            description,
            fields: interface
                .fields
                .into_iter()
                .map(|f| convert_field(f.node))
                .collect::<Result<_, _>>()?,
        }
        .into(),
        SdlKind::Union(union) => UnionType {
            name,
            description,
            types: union.members.into_iter().map(|m| m.node.to_string()).collect(),
        }
        .into(),
        SdlKind::Enum(enumeration) => EnumType {
            name,
            description,
            values: enumeration
                .values
                .into_iter()
                .map(|v| v.node.value.node.to_string())
                .collect(),
        }
        .into(),
        SdlKind::InputObject(input) => InputObjectType {
            name,
            description,
            fields: input
                .fields
                .into_iter()
                .map(|f| convert_input_value(f.node))
                .collect::<Result<_, _>>()?,
        }
        .into(),
    };
    Ok(decl)
}

fn convert_field(field: async_graphql::parser::types::FieldDefinition) -> Result<FieldDef, SchemaError> {
    let mut def = FieldDef::new(field.name.node.to_string(), field.ty.node.to_string());
    def.description = field.description.map(|d| d.node);
    def.args = field
        .arguments
        .into_iter()
        .map(|a| convert_input_value(a.node))
        .collect::<Result<_, _>>()?;
    Ok(def)
}

fn convert_input_value(value: InputValueDefinition) -> Result<ArgDef, SchemaError> {
    let mut arg = ArgDef::new(value.name.node.to_string(), value.ty.node.to_string());
    arg.description = value.description.map(|d| d.node);
    if let Some(default) = value.default_value {
        let json = default
            .node
            .into_json()
            .map_err(|e| SchemaError::InvalidSdl(format!("default of `{}`: {e}", arg.name)))?;
        arg.default_value = Some(json);
    }
    Ok(arg)
}

// ============================================================================
// Printing
// ============================================================================

/// Convert a JSON default into a GraphQL value, using enum literals where
/// the argument type is an enum.
pub(crate) fn default_literal(value: &Value, ty: &str, kind_of: &dyn Fn(&str) -> Option<TypeKind>) -> GqlValue {
    let is_enum = TypeExpr::parse(ty)
        .ok()
        .and_then(|expr| kind_of(expr.name()))
        .is_some_and(|kind| kind == TypeKind::Enum);
    match value {
        Value::String(s) if is_enum => GqlValue::Enum(Name::new(s)),
        Value::Array(items) if is_enum => GqlValue::List(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => GqlValue::Enum(Name::new(s)),
                    other => GqlValue::from_json(other.clone()).unwrap_or(GqlValue::Null),
                })
                .collect(),
        ),
        other => GqlValue::from_json(other.clone()).unwrap_or(GqlValue::Null),
    }
}

fn print_description(out: &mut String, description: Option<&str>, indent: &str) {
    if let Some(description) = description {
        let _ = writeln!(out, "{indent}\"\"\"{}\"\"\"", description.replace("\"\"\"", "\\\"\"\""));
    }
}

fn print_args(out: &mut String, args: &[ArgDef], kind_of: &dyn Fn(&str) -> Option<TypeKind>) {
    if args.is_empty() {
        return;
    }
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| match &arg.default_value {
            Some(default) => format!("{}: {} = {}", arg.name, arg.ty, default_literal(default, &arg.ty, kind_of)),
            None => format!("{}: {}", arg.name, arg.ty),
        })
        .collect();
    let _ = write!(out, "({})", rendered.join(", "));
}

fn print_fields(out: &mut String, fields: &[FieldDef], kind_of: &dyn Fn(&str) -> Option<TypeKind>) {
    for field in fields {
        print_description(out, field.description.as_deref(), "  ");
        out.push_str("  ");
        out.push_str(&field.name);
        print_args(out, &field.args, kind_of);
        let _ = writeln!(out, ": {}", field.ty);
    }
}

/// Render declarations as SDL, sorted by type name.
pub(crate) fn print_sdl<'a>(
    declarations: impl IntoIterator<Item = &'a TypeDeclaration>,
    kind_of: &dyn Fn(&str) -> Option<TypeKind>,
) -> String {
    let mut sorted: Vec<&TypeDeclaration> = declarations.into_iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut out = String::new();
    for (i, decl) in sorted.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_description(&mut out, decl.description(), "");
        match decl {
            TypeDeclaration::Scalar(scalar) => {
                let _ = writeln!(out, "scalar {}", scalar.name);
            }
            TypeDeclaration::Object(object) => {
                out.push_str("type ");
                out.push_str(&object.name);
                if !object.interfaces.is_empty() {
                    let _ = write!(out, " implements {}", object.interfaces.join(" & "));
                }
                out.push_str(" {\n");
                print_fields(&mut out, &object.fields, kind_of);
                out.push_str("}\n");
            }
            TypeDeclaration::Interface(interface) => {
                let _ = writeln!(out, "interface {} {{", interface.name);
                print_fields(&mut out, &interface.fields, kind_of);
                out.push_str("}\n");
            }
            TypeDeclaration::Union(union) => {
                let _ = writeln!(out, "union {} = {}", union.name, union.types.join(" | "));
            }
            TypeDeclaration::Enum(enumeration) => {
                let _ = writeln!(out, "enum {} {{", enumeration.name);
                for value in &enumeration.values {
                    let _ = writeln!(out, "  {value}");
                }
                out.push_str("}\n");
            }
            TypeDeclaration::InputObject(input) => {
                let _ = writeln!(out, "input {} {{", input.name);
                for field in &input.fields {
                    print_description(&mut out, field.description.as_deref(), "  ");
                    match &field.default_value {
                        Some(default) => {
                            let literal = default_literal(default, &field.ty, kind_of);
                            let _ = writeln!(out, "  {}: {} = {literal}", field.name, field.ty);
                        }
                        None => {
                            let _ = writeln!(out, "  {}: {}", field.name, field.ty);
                        }
                    }
                }
                out.push_str("}\n");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SDL: &str = r#"
        "An author"
        type Author {
          name: String
        }
        type Post implements Node {
          id: ID!
          author(format: String = "short"): Author
        }
        union Result = Author | Post
        enum Color { RED GREEN }
        input PostFilter { title: String, limit: Int = 10 }
        scalar Date
    "#;

    #[test]
    fn test_parse_sdl_kinds() {
        let decls = parse_sdl(SDL).unwrap();
        let kinds: Vec<_> = decls.iter().map(|d| (d.name().to_owned(), d.kind())).collect();
        assert_eq!(
            kinds,
            [
                ("Author".to_owned(), TypeKind::Object),
                ("Post".to_owned(), TypeKind::Object),
                ("Result".to_owned(), TypeKind::Union),
                ("Color".to_owned(), TypeKind::Enum),
                ("PostFilter".to_owned(), TypeKind::InputObject),
                ("Date".to_owned(), TypeKind::Scalar),
            ]
        );
        assert_eq!(decls[0].description(), Some("An author"));

        let TypeDeclaration::Object(post) = &decls[1] else { panic!("expected object") };
        assert_eq!(post.interfaces, ["Node"]);
        assert_eq!(post.fields[1].args[0].default_value, Some(json!("short")));
    }

    #[test]
    fn test_parse_sdl_custom_roots() {
        let decls = parse_sdl("schema { query: Root } type Root { hello: String }").unwrap();
        assert_eq!(decls[0].name(), QUERY);
    }

    #[test]
    fn test_parse_sdl_rejects_garbage() {
        assert!(matches!(parse_sdl("type {"), Err(SchemaError::InvalidSdl(_))));
    }

    #[test]
    fn test_print_is_sorted_and_stable() {
        let decls = parse_sdl(SDL).unwrap();
        let kind_of = |name: &str| decls.iter().find(|d| d.name() == name).map(TypeDeclaration::kind);
        let printed = print_sdl(&decls, &kind_of);
        assert_eq!(printed, print_sdl(decls.iter().rev(), &kind_of));
        assert!(printed.starts_with("\"\"\"An author\"\"\"\ntype Author {\n  name: String\n}\n"));
        assert!(printed.contains("  author(format: String = \"short\"): Author\n"));
        assert!(printed.contains("union Result = Author | Post\n"));
        assert!(printed.contains("  limit: Int = 10\n"));
    }

    #[test]
    fn test_enum_defaults_print_as_literals() {
        let decls = vec![TypeDeclaration::from(EnumType::new("SortOrder").value("ASC").value("DESC"))];
        let kind_of = |name: &str| (name == "SortOrder").then_some(TypeKind::Enum);
        let literal = default_literal(&json!("DESC"), "SortOrder", &kind_of);
        assert_eq!(literal.to_string(), "DESC");
        assert!(print_sdl(&decls, &kind_of).contains("enum SortOrder {\n  ASC\n  DESC\n}\n"));
    }
}
