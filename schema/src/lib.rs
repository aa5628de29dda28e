//! Portable ADL AST shapes.
//!
//! These are the JSON-compatible records that the `adlc` compiler writes for
//! every declaration and that target-language runtimes read back for generic
//! serialization and reflection.
//!
//! ```
//! use adlc_schema::*;
//!
//! let texpr = TypeExpr::reference(
//!     ScopedName::new("sys.types", "Maybe"),
//!     vec![TypeExpr::primitive("String", vec![])],
//! );
//! let json = serde_json::to_string(&texpr).unwrap();
//! assert!(json.starts_with(r#"{"typeRef":{"kind":"reference""#));
//! ```

pub mod ast;

pub use ast::*;

/// Annotation key carrying `///` doc comments.
pub const DOC_ANNOTATION_MODULE: &str = "sys.annotations";
pub const DOC_ANNOTATION_NAME: &str = "Doc";
