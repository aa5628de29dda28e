//! Code emitters and the pieces they share.

pub mod rust;
pub mod typescript;

use std::path::PathBuf;

use adlc_schema::{Literal, ScopedDecl, DOC_ANNOTATION_MODULE, DOC_ANNOTATION_NAME};
use serde::{Deserialize, Serialize};

use crate::{
    defaults::DeclDefaults,
    error::AdlError,
    resolver::{DeclId, ResolvedDecl, ResolvedModule, ResolvedModuleSet},
    traits::Emitter,
};

pub use self::rust::{RustEmitter, RUST_EMITTER};
pub use self::typescript::{TypeScriptEmitter, TYPESCRIPT_EMITTER};

/// Built-in emitters, looked up by [`Emitter::name`].
pub static EMITTERS: [&dyn Emitter; 2] = [&RUST_EMITTER, &TYPESCRIPT_EMITTER];

pub fn emitter(name: &str) -> Result<&'static dyn Emitter, AdlError> {
    EMITTERS
        .iter()
        .find(|e| e.name() == name)
        .copied()
        .ok_or_else(|| AdlError::UnknownTarget(name.to_string()))
}

pub fn emitter_names() -> Vec<&'static str> {
    EMITTERS.iter().map(|e| e.name()).collect()
}

/// Per-target options. Every field has a default so that a target can be
/// enabled with `{}` in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmitOptions {
    /// Embed the serialized AST of every declaration, plus a per-module map.
    pub include_ast: bool,
    /// Path of the runtime support library as referenced from generated code.
    /// Each emitter has its own default.
    pub runtime: Option<String>,
    /// Rust only: path under which generated modules are mounted.
    pub module_root: Option<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions { include_ast: true, runtime: None, module_root: None }
    }
}

/// One generated file, with a path relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path:     PathBuf,
    pub contents: String,
}

/// Everything an emitter may look at: the resolved declarations, their
/// normalized defaults and their serialized form, all indexed by [`DeclId`].
pub struct EmitContext<'a> {
    pub set:      &'a ResolvedModuleSet,
    pub defaults: &'a [DeclDefaults],
    pub asts:     &'a [ScopedDecl],
}

impl<'a> EmitContext<'a> {
    pub fn module(&self, name: &str) -> Result<&'a ResolvedModule, AdlError> {
        self.set
            .module(name)
            .ok_or_else(|| AdlError::ModuleNotFound(name.to_string()))
    }

    pub fn decl(&self, id: DeclId) -> &'a ResolvedDecl {
        self.set.decl(id)
    }

    pub fn defaults(&self, id: DeclId) -> Option<&'a DeclDefaults> {
        self.defaults.get(id.index())
    }

    pub fn ast_json(&self, id: DeclId) -> Result<String, AdlError> {
        let ast = self
            .asts
            .get(id.index())
            .ok_or_else(|| AdlError::ModuleNotFound(self.set.scoped_name(id).to_string()))?;
        Ok(ast.to_json()?)
    }
}

/// `sys.types` + `rs` → `sys/types.rs`.
pub fn module_path(module: &str, extension: &str) -> PathBuf {
    let mut path: PathBuf = module.split('.').collect();
    path.set_extension(extension);
    path
}

/// Doc comment text attached to a declaration or field, if any.
pub fn doc_text(annotations: &[(adlc_schema::ScopedName, Literal)]) -> Option<&str> {
    annotations.iter().find_map(|(k, v)| match v {
        Literal::String(s) if k.module_name == DOC_ANNOTATION_MODULE && k.name == DOC_ANNOTATION_NAME => {
            Some(s.as_str())
        }
        _ => None,
    })
}
