//! GraphQL schema composition.
//!
//! Plugins contribute declarations, SDL text, standalone fragments and
//! resolver maps during `create_schema`. Contributions are stored per
//! [`Origin`] so one plugin's share can be retracted and replayed without
//! disturbing the others. [`SchemaBuilder::compile`] merges everything with
//! the types inferred from the store and produces a [`CompiledSchema`].
//!
//! # Merge Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | same type twice, same kind | fields combined |
//! | same field, same type | kept once |
//! | same field, different type | conflict |
//! | same name, different kind | conflict |
//! | explicit vs inferred | explicit wins, inferred data key kept |

mod compile;
mod error;
mod filter;
mod infer;
mod resolve;
mod root;
mod sdl;
mod types;

use std::collections::BTreeMap;

pub use compile::{CompileOptions, CompiledSchema, Location, QueryError, QueryResponse};
pub use error::{Conflict, Diagnostics, SchemaConflicts, SchemaError};
pub use resolve::{Args, FieldResolver, ResolveContext, ResolveError, Resolved, Resolver, ResolverMap, Source, resolver};
pub use sdl::parse_sdl;
pub use types::{
    ArgDef, EnumType, FieldDef, InputObjectType, InterfaceType, ObjectType, ScalarType, SchemaFragment, SchemaTypes,
    TypeDeclaration, TypeExpr, TypeKind, UnionType,
};

use crate::actions::Origin;
use crate::store::Store;
use compile::Contribution;

/// Collects schema contributions until compile time.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    contributions: BTreeMap<Origin, Vec<Contribution>>,
    options: CompileOptions,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn add_schema(&mut self, fragment: SchemaFragment) {
        self.add_schema_as(Origin::HOST, fragment);
    }

    pub fn add_schema_types(&mut self, types: impl Into<SchemaTypes>) {
        self.add_schema_types_as(Origin::HOST, types.into());
    }

    pub fn add_schema_resolvers(&mut self, resolvers: ResolverMap) {
        self.add_schema_resolvers_as(Origin::HOST, resolvers);
    }

    pub(crate) fn add_schema_as(&mut self, origin: Origin, fragment: SchemaFragment) {
        self.push(origin, Contribution::Fragment(fragment));
    }

    pub(crate) fn add_schema_types_as(&mut self, origin: Origin, types: SchemaTypes) {
        self.push(origin, Contribution::Types(types));
    }

    pub(crate) fn add_schema_resolvers_as(&mut self, origin: Origin, resolvers: ResolverMap) {
        if !resolvers.is_empty() {
            self.push(origin, Contribution::Resolvers(resolvers));
        }
    }

    fn push(&mut self, origin: Origin, contribution: Contribution) {
        self.contributions.entry(origin).or_default().push(contribution);
    }

    /// Drop everything `origin` contributed. Returns whether it had any.
    pub(crate) fn retract(&mut self, origin: Origin) -> bool {
        self.contributions.remove(&origin).is_some()
    }

    /// Copy of every cached contribution.
    pub(crate) fn snapshot(&self) -> BTreeMap<Origin, Vec<Contribution>> {
        self.contributions.clone()
    }

    pub(crate) fn restore(&mut self, contributions: BTreeMap<Origin, Vec<Contribution>>) {
        self.contributions = contributions;
    }

    /// Number of registration calls held.
    pub fn contribution_count(&self) -> usize {
        self.contributions.values().map(Vec::len).sum()
    }

    /// Merge contributions in origin order and compile against `store`.
    pub fn compile(&self, store: &Store) -> Result<CompiledSchema, SchemaError> {
        compile::compile(store, self.contributions.values().flatten(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Phase;
    use crate::store::Reference;
    use serde_json::{Value, json};

    fn blog() -> Store {
        let store = Store::new();
        let authors = store.add_content_type("Author").unwrap();
        authors.add_node(json!({ "id": "a1", "name": "Ada" })).unwrap();
        let posts = store.add_content_type("Post").unwrap();
        for (id, title, views) in [("1", "First", 30), ("2", "Second", 10), ("3", "Third", 20)] {
            posts
                .add_node(json!({
                    "id": id,
                    "title": title,
                    "views": views,
                    "author": Reference::new("Author", "a1"),
                }))
                .unwrap();
        }
        store
    }

    async fn query(schema: &CompiledSchema, query: &str) -> Value {
        let response = schema.execute(query, Value::Null).await;
        assert!(response.is_ok(), "unexpected errors: {:?}", response.messages());
        response.data
    }

    #[test]
    fn test_sdl_is_deterministic() {
        let build = || {
            let mut builder = SchemaBuilder::new();
            builder.add_schema_types("type Extra { b: Int a: String }");
            builder.add_schema_types(TypeDeclaration::from(ObjectType::new("Another").field("x", "Int")));
            builder.compile(&blog()).unwrap().sdl().to_owned()
        };
        let first = build();
        assert_eq!(first, build());
        assert!(first.find("type Another").unwrap() < first.find("type Extra").unwrap());
        assert!(first.contains("type Extra {\n  b: Int\n  a: String\n}"));
    }

    #[test]
    fn test_conflicts_across_origins_are_aggregated() {
        let mut builder = SchemaBuilder::new();
        builder.add_schema_types_as(Origin::new(0, Phase::CreateSchema), "type Post { title: Int }".into());
        builder.add_schema_types_as(Origin::new(1, Phase::CreateSchema), "type Post { title: String }".into());
        builder.add_schema_types_as(Origin::new(1, Phase::CreateSchema), "enum Tag { A }".into());
        builder.add_schema_types_as(Origin::new(2, Phase::CreateSchema), "type Tag { a: Int }".into());

        let err = builder.compile(&Store::new()).unwrap_err();
        assert_eq!(err.conflicts().len(), 2);
    }

    #[test]
    fn test_retract_drops_one_origin() {
        let mut builder = SchemaBuilder::new();
        let origin = Origin::new(0, Phase::CreateSchema);
        builder.add_schema_types_as(origin, "type A { a: Int }".into());
        builder.add_schema_resolvers_as(origin, ResolverMap::new());
        builder.add_schema_types("type B { b: Int }");
        assert_eq!(builder.contribution_count(), 2);

        assert!(builder.retract(origin));
        assert!(!builder.retract(origin));
        assert_eq!(builder.contribution_count(), 1);
    }

    #[tokio::test]
    async fn test_references_and_listing() {
        let schema = SchemaBuilder::new().compile(&blog()).unwrap();
        let data = query(
            &schema,
            r#"{
                post(id: "2") { title author { name } }
                allPost(sortBy: "views", order: DESC, limit: 2) {
                    totalCount
                    pageInfo { totalPages hasNextPage }
                    edges { node { id } next { id } previous { id } }
                }
            }"#,
        )
        .await;

        assert_eq!(data["post"], json!({ "title": "Second", "author": { "name": "Ada" } }));
        let all = &data["allPost"];
        assert_eq!(all["totalCount"], 3);
        assert_eq!(all["pageInfo"], json!({ "totalPages": 2, "hasNextPage": true }));
        assert_eq!(
            all["edges"],
            json!([
                { "node": { "id": "1" }, "next": { "id": "3" }, "previous": null },
                { "node": { "id": "3" }, "next": { "id": "2" }, "previous": { "id": "1" } },
            ])
        );
    }

    #[tokio::test]
    async fn test_filter_by_alias() {
        let store = Store::new();
        let posts = store.add_content_type("Post").unwrap();
        posts.add_node(json!({ "id": "1", "read-time": 3 })).unwrap();
        posts.add_node(json!({ "id": "2", "read-time": 8 })).unwrap();
        let schema = SchemaBuilder::new().compile(&store).unwrap();

        let data = query(
            &schema,
            r#"{ allPost(filter: { read_time: { gt: 5 } }) { edges { node { id read_time } } } }"#,
        )
        .await;
        assert_eq!(data["allPost"]["edges"], json!([{ "node": { "id": "2", "read_time": 8 } }]));
    }

    #[tokio::test]
    async fn test_dangling_reference_is_null() {
        let store = Store::new();
        store.add_content_type("Author").unwrap();
        store
            .add_content_type("Post")
            .unwrap()
            .add_node(json!({ "id": "1", "author": { "typeName": "Author", "id": "gone" } }))
            .unwrap();
        let schema = SchemaBuilder::new().compile(&store).unwrap();

        let data = query(&schema, r#"{ post(id: "1") { author { id } } }"#).await;
        assert_eq!(data["post"]["author"], Value::Null);
    }

    #[tokio::test]
    async fn test_dangling_reference_on_non_null_field_errors() {
        let store = Store::new();
        store.add_content_type("Author").unwrap();
        store
            .add_content_type("Post")
            .unwrap()
            .add_node(json!({ "id": "1", "author": { "typeName": "Author", "id": "gone" } }))
            .unwrap();
        let mut builder = SchemaBuilder::new();
        builder.add_schema_types("type Post { author: Author! }");
        let schema = builder.compile(&store).unwrap();

        let response = schema.execute(r#"{ post(id: "1") { id author { id } } }"#, Value::Null).await;
        let messages = response.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Post.author"));
        assert_eq!(response.data["post"], Value::Null);
    }

    #[tokio::test]
    async fn test_resolver_addressed_by_raw_key() {
        let store = Store::new();
        store
            .add_content_type("Post")
            .unwrap()
            .add_node(json!({ "id": "1", "456-test": 5 }))
            .unwrap();
        let mut builder = SchemaBuilder::new();
        builder.add_schema_resolvers(ResolverMap::new().field(
            "Post",
            "456-test",
            FieldResolver::new().resolve(|source, _, ctx| {
                let value = source.get(ctx.data_key()).and_then(Value::as_i64).unwrap_or_default();
                Ok((value * 2).into())
            }),
        ));
        let schema = builder.compile(&store).unwrap();
        assert!(schema.sdl().contains("  _456_test: Int\n"));

        let data = query(&schema, r#"{ post(id: "1") { _456_test } }"#).await;
        assert_eq!(data["post"]["_456_test"], 10);
    }

    #[tokio::test]
    async fn test_union_resolution_and_metadata() {
        let store = blog();
        store.add_metadata("site", json!({ "title": "Blog" })).unwrap();
        let mut builder = SchemaBuilder::new();
        builder.add_schema(
            SchemaFragment::new()
                .query(ObjectType::new("Query").field_with(
                    FieldDef::new("everything", "[Anything]").resolve(|_, _, ctx| {
                        let store = ctx.store();
                        Ok(vec![
                            store.resolve(&Reference::new("Author", "a1")),
                            store.resolve(&Reference::new("Post", "1")),
                        ]
                        .into())
                    }),
                ))
                .types([TypeDeclaration::from(UnionType::new("Anything").member("Author").member("Post"))]),
        );
        let schema = builder.compile(&store).unwrap();

        let data = query(
            &schema,
            r#"{
                everything { __typename ... on Author { name } ... on Post { title } }
                metadata(key: "site")
                node(typeName: "Author", id: "a1") { id }
            }"#,
        )
        .await;
        assert_eq!(
            data["everything"],
            json!([{ "__typename": "Author", "name": "Ada" }, { "__typename": "Post", "title": "First" }])
        );
        assert_eq!(data["metadata"], json!({ "title": "Blog" }));
        assert_eq!(data["node"], json!({ "id": "a1" }));
    }

    #[tokio::test]
    async fn test_custom_root_field_with_default() {
        let mut builder = SchemaBuilder::new();
        builder.add_schema(
            SchemaFragment::new().query(
                ObjectType::new("Query").field_with(
                    FieldDef::new("echo", "String")
                        .arg(ArgDef::new("text", "String").default_value(json!("foo")))
                        .resolve(|_, args, _| Ok(args.str("text").map(str::to_owned).into())),
                ),
            ),
        );
        let schema = builder.compile(&Store::new()).unwrap();

        let data = query(&schema, r#"{ a: echo b: echo(text: "bar") }"#).await;
        assert_eq!(data, json!({ "a": "foo", "b": "bar" }));
    }

    #[tokio::test]
    async fn test_variables_reach_resolvers() {
        let schema = SchemaBuilder::new().compile(&blog()).unwrap();
        let response = schema
            .execute(
                "query ($id: ID!) { post(id: $id) { title } }",
                json!({ "id": "3" }),
            )
            .await;
        assert_eq!(response.data["post"]["title"], "Third");
    }
}
