//! Schema compilation errors.
//!
//! Merge conflicts and validation failures are aggregated: compilation keeps
//! going after the first problem so every one of them is reported at once.

use std::fmt;

use thiserror::Error;

use super::types::TypeKind;

/// One incompatibility found while merging declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    KindMismatch {
        type_name: String,
        existing: TypeKind,
        incoming: TypeKind,
    },
    FieldType {
        type_name: String,
        field: String,
        existing: String,
        incoming: String,
    },
    ArgType {
        type_name: String,
        field: Option<String>,
        arg: String,
        existing: String,
        incoming: String,
    },
    /// Two raw node keys sanitize to the same field name.
    AliasCollision {
        type_name: String,
        alias: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::KindMismatch {
                type_name,
                existing,
                incoming,
            } => write!(f, "`{type_name}` is declared as {existing} and as {incoming}"),
            Conflict::FieldType {
                type_name,
                field,
                existing,
                incoming,
            } => write!(f, "`{type_name}.{field}` is declared as `{existing}` and as `{incoming}`"),
            Conflict::ArgType {
                type_name,
                field: Some(field),
                arg,
                existing,
                incoming,
            } => write!(
                f,
                "argument `{arg}` of `{type_name}.{field}` is declared as `{existing}` and as `{incoming}`"
            ),
            Conflict::ArgType {
                type_name,
                field: None,
                arg,
                existing,
                incoming,
            } => write!(f, "`{type_name}.{arg}` is declared as `{existing}` and as `{incoming}`"),
            Conflict::AliasCollision {
                type_name,
                alias,
                first,
                second,
            } => write!(f, "keys `{first}` and `{second}` of `{type_name}` both map to field `{alias}`"),
        }
    }
}

/// Every conflict found in one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConflicts(pub Vec<Conflict>);

impl fmt::Display for SchemaConflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema conflict(s):", self.0.len())?;
        for conflict in &self.0 {
            write!(f, "\n  - {conflict}")?;
        }
        Ok(())
    }
}

/// Every validation problem found in the assembled schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics(pub Vec<String>);

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema, {} problem(s):", self.0.len())?;
        for message in &self.0 {
            write!(f, "\n  - {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{0}")]
    Conflicts(SchemaConflicts),

    #[error("invalid SDL: {0}")]
    InvalidSdl(String),

    #[error("invalid type expression `{0}`")]
    InvalidTypeExpr(String),

    #[error("{0}")]
    Validation(Diagnostics),

    #[error("GraphQL engine rejected the schema: {0}")]
    Engine(String),
}

impl SchemaError {
    /// Conflicts carried by this error, if it is a merge failure.
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            SchemaError::Conflicts(conflicts) => &conflicts.0,
            _ => &[],
        }
    }
}
