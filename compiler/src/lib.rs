//! adlc-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.adl` schema files,
//!  2) Module loading along a search path, with `sys.types` built in,
//!  3) Name resolution, arity and alias checks over the whole module set,
//!  4) Default value normalization (`Value`) and the serialized AST (`ScopedDecl`),
//!  5) Code generation through the `Emitter` trait (Rust and TypeScript),
//!  6) Error types (`AdlError`) and the `adlc.json` configuration.

pub mod error;
pub mod types;
pub mod utils;
pub mod tokenizer;
pub mod parser;
pub mod stdlib;
pub mod loader;
pub mod resolver;
pub mod typegraph;
pub mod defaults;
pub mod serializer;
pub mod traits;
pub mod emit;
pub mod config;
pub mod compiler;

pub use compiler::{compile_modules, compile_sources, write_units, Compilation};
pub use config::CompilerConfig;
pub use error::AdlError;
pub use loader::Loader;
pub use traits::Emitter;
