//! sitegraph - content graph, GraphQL schema and route registry for
//! plugin-driven static sites.
//!
//! # Overview
//!
//! ```text
//! plugins ──load_source──► Store ──infer──┐
//!         ──create_schema─► SchemaBuilder ┴──► CompiledSchema ◄── graphql()
//!         ──create_pages──► Pages ──────────► route manifest
//! ```
//!
//! [`app::App`] drives the phases; each hook only sees the actions of its
//! phase (see [`actions`]).

pub mod actions;
pub mod app;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod logger;
pub mod pages;
pub mod plugins;
pub mod schema;
pub mod store;
pub mod utils;

pub use app::{App, FnPlugin, Plugin};
pub use error::ConfigurationError;
