//! Built-in plugins used by the command line.
//!
//! | Plugin               | Hook           | Source                       |
//! |----------------------|----------------|------------------------------|
//! | [`JsonSourcePlugin`] | `load_source`  | `*.json` files in `[source]` |
//! | [`ConfigPagesPlugin`]| `create_pages` | `[[pages]]` entries          |

mod json_source;
mod pages;

pub use json_source::JsonSourcePlugin;
pub use pages::ConfigPagesPlugin;
