//! Utility modules shared by the store, schema and page registry.

pub mod digest;
pub mod slug;
