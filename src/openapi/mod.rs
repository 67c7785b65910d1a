//! OpenAPI import
//!
//! Turns an OpenAPI 3.x description into a registry of callable tools.
//!
//! Information Hiding:
//! - Document format and non-schema reference inlining hidden in `document`
//! - Component schema references resolved lazily through `SchemaScope`
//! - Schema-to-argument translation hidden in `schema`
//! - Per-operation compilation hidden in `compiler`

pub mod compiler;
pub mod document;
pub mod example;
pub mod importer;
pub mod schema;

pub use compiler::OperationCompiler;
pub use document::{ApiDocument, SpecLocation};
pub use importer::{build_registry, import_spec, ApiSource, ImportOptions};
pub use schema::{translate, SchemaScope, MAX_REFERENCE_DEPTH};
