//! Manifest rendering and debug patching
//!
//! Rendered manifests are handled as untyped trees (`serde_json::Value`):
//! mappings, sequences and scalars. YAML input is decoded into the same tree
//! type so every traversal works on one representation.

pub mod render;
pub mod patch;
pub mod schema;

pub use render::*;
pub use patch::*;
pub use schema::*;
