//! adl-runtime
//!
//! Support code for Rust modules generated by `adlc`.
//!
//! - `ByteVector`, serialized as a base64 string
//! - `TypeRef<T>` and `ATypeExpr<T>`, typed handles on declarations and type expressions
//! - `decode_ast` / `AstMap` for reading the serialized declarations that
//!   generated modules embed
//! - `ast`, the portable AST records (re-exported from `adlc-schema`)

pub mod bytes;
pub mod error;
pub mod reflect;

pub use adlc_schema as ast;

pub use bytes::ByteVector;
pub use error::RuntimeError;
pub use reflect::{decode_ast, ATypeExpr, AstMap, TypeRef};
