//! Code generation for the front-end router.
//!
//! Generated artifacts are derived views over the page registry, rebuilt
//! from scratch on every pass.

mod routes;

pub use routes::{NOT_FOUND_NAME, RouteRecord, render_routes, route_records};
