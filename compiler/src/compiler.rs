use std::{collections::BTreeMap, path::Path};

use adlc_schema::{Literal, ScopedDecl, ScopedName};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    defaults::{check_all_defaults, DeclDefaults, Normalizer, Value},
    emit::{self, EmitContext, EmitOptions, SourceUnit},
    error::{AdlError, Location},
    loader::{parse_source, with_builtins},
    resolver::{resolve, ResolvedModuleSet, TypeExpr, TypeRef},
    serializer::serialize_decl,
    typegraph::TypeGraph,
    types::Module,
};

/// A checked module set: resolved declarations, their normalized defaults
/// and their serialized form, all indexed by declaration id.
pub struct Compilation {
    set:      ResolvedModuleSet,
    defaults: Vec<DeclDefaults>,
    asts:     Vec<ScopedDecl>,
}

/// Compile parsed modules. Every module that is imported or referenced must
/// be present in `modules`.
/// Returns `Err(AdlError)` if resolution, type checking or default
/// normalization fails; failures of several modules come back together as
/// [`AdlError::Compilation`].
pub fn compile_modules(modules: Vec<Module>) -> Result<Compilation, AdlError> {
    let set = resolve(&modules).map_err(AdlError::from_errors)?;
    debug!(modules = set.modules().len(), decls = set.decls().len(), "resolved");

    let graph = TypeGraph::new(&set);
    graph.check_all().map_err(AdlError::from_errors)?;
    let defaults = check_all_defaults(&graph).map_err(AdlError::from_errors)?;
    debug!(instantiations = graph.cached_instantiations(), "checked types");
    drop(graph);

    let asts = set
        .decls()
        .par_iter()
        .map(|decl| serialize_decl(&set, decl.id, &defaults[decl.id.index()]))
        .collect();

    info!(modules = set.modules().len(), decls = set.decls().len(), "compiled");
    Ok(Compilation { set, defaults, asts })
}

/// Compile source texts. Built-in modules such as `sys.types` are added
/// when referenced and not supplied.
pub fn compile_sources(sources: &[&str]) -> Result<Compilation, AdlError> {
    let modules = sources
        .par_iter()
        .enumerate()
        .map(|(i, text)| parse_source(&format!("<source {}>", i), text))
        .collect::<Result<Vec<_>, _>>()?;
    compile_modules(with_builtins(modules)?)
}

impl Compilation {
    pub fn set(&self) -> &ResolvedModuleSet {
        &self.set
    }

    pub fn defaults(&self) -> &[DeclDefaults] {
        &self.defaults
    }

    pub fn asts(&self) -> &[ScopedDecl] {
        &self.asts
    }

    pub fn ast(&self, name: &ScopedName) -> Option<&ScopedDecl> {
        self.set.lookup(name).map(|id| &self.asts[id.index()])
    }

    /// Serialized declarations of one module, in declaration order.
    pub fn module_asts(&self, module: &str) -> Result<Vec<&ScopedDecl>, AdlError> {
        let module = self
            .set
            .module(module)
            .ok_or_else(|| AdlError::ModuleNotFound(module.to_string()))?;
        Ok(module.decls.iter().map(|id| &self.asts[id.index()]).collect())
    }

    pub fn context(&self) -> EmitContext<'_> {
        EmitContext { set: &self.set, defaults: &self.defaults, asts: &self.asts }
    }

    /// Checks `literal` as a value of `texpr`, filling in declared defaults.
    pub fn value(&self, texpr: &TypeExpr, literal: &Literal) -> Result<Value, AdlError> {
        let location = match &texpr.head {
            TypeRef::Decl(id) => self.set.decl(*id).location(),
            _ => Location::module(""),
        };
        let graph = TypeGraph::new(&self.set);
        Normalizer::new(&graph).normalize(literal, texpr, &location)
    }

    /// The canonical literal for `literal` as a value of `texpr`.
    pub fn canonical_literal(&self, texpr: &TypeExpr, literal: &Literal) -> Result<Literal, AdlError> {
        Ok(self.value(texpr, literal)?.to_literal(&self.set))
    }

    pub fn emit(&self, target: &str, module: &str, options: &EmitOptions) -> Result<SourceUnit, AdlError> {
        emit::emitter(target)?.emit(&self.context(), module, options)
    }

    /// Runs every target over every module. Unit paths are prefixed with the
    /// target name, so `rust` output for `sys.types` lands in `rust/sys/types.rs`.
    pub fn emit_targets(&self, targets: &BTreeMap<String, EmitOptions>) -> Result<Vec<SourceUnit>, AdlError> {
        let jobs: Vec<(&String, &EmitOptions, &str)> = targets
            .iter()
            .flat_map(|(target, options)| {
                self.set.modules().iter().map(move |m| (target, options, m.name.as_str()))
            })
            .collect();

        let units = jobs
            .par_iter()
            .map(|(target, options, module)| {
                let unit = self.emit(target, module, options)?;
                Ok(SourceUnit { path: Path::new(target.as_str()).join(unit.path), contents: unit.contents })
            })
            .collect::<Result<Vec<_>, AdlError>>()?;
        info!(units = units.len(), targets = targets.len(), "generated sources");
        Ok(units)
    }
}

/// Writes `units` below `dir`, creating directories as needed.
pub fn write_units(dir: &Path, units: &[SourceUnit]) -> Result<(), AdlError> {
    for unit in units {
        let path = dir.join(&unit.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &unit.contents)?;
        debug!(path = %path.display(), "wrote");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const GEOMETRY: &str = r#"
        module geometry {
        import sys.types.*;
        struct Point { Double x = 0; Double y = 0; };
        struct Labelled<T> { T value; Maybe<String> label = "nothing"; };
        type Points = Vector<Point>;
        };
    "#;

    #[test]
    fn test_compile_sources_adds_builtins() {
        let compiled = compile_sources(&[GEOMETRY]).unwrap();
        assert!(compiled.set().module("sys.types").is_some());
        assert_eq!(compiled.asts().len(), compiled.set().decls().len());
        assert_eq!(compiled.defaults().len(), compiled.set().decls().len());

        let point = compiled.ast(&ScopedName::new("geometry", "Point")).unwrap();
        assert_eq!(point.decl.name, "Point");
        assert_eq!(compiled.module_asts("geometry").unwrap().len(), 3);
        assert!(matches!(compiled.module_asts("nowhere"), Err(AdlError::ModuleNotFound(_))));
    }

    #[test]
    fn test_canonical_literal() {
        let compiled = compile_sources(&[GEOMETRY]).unwrap();
        let point = compiled.set().lookup(&ScopedName::new("geometry", "Point")).unwrap();
        let labelled = compiled.set().lookup(&ScopedName::new("geometry", "Labelled")).unwrap();
        let texpr = TypeExpr::decl(labelled, vec![TypeExpr::decl(point, vec![])]);

        let literal = Literal::Object(vec![adlc_schema::Pair::new(
            "value".to_string(),
            Literal::Object(vec![adlc_schema::Pair::new("y".to_string(), Literal::Integer(2))]),
        )]);
        let canonical = compiled.canonical_literal(&texpr, &literal).unwrap();
        assert_eq!(
            canonical.to_json(),
            serde_json::json!({"value": {"x": 0.0, "y": 2.0}, "label": "nothing"})
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let bad = r#"
            module a { struct A { Missing m; }; };
        "#;
        let worse = r#"
            module b { struct B { Int8 small = 300; }; };
        "#;
        match compile_sources(&[bad, worse]) {
            Err(AdlError::UnknownReference { name, .. }) => assert_eq!(name, "Missing"),
            other => panic!("expected UnknownReference, got {:?}", other.err()),
        }

        let also_bad = r#"
            module c { struct C { Gone g; }; };
        "#;
        let errors = compile_sources(&[bad, also_bad]).err().unwrap().into_errors();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_emit_targets_and_write() {
        let compiled = compile_sources(&[GEOMETRY]).unwrap();
        let targets = BTreeMap::from([
            ("rust".to_string(), EmitOptions::default()),
            ("typescript".to_string(), EmitOptions { include_ast: false, ..Default::default() }),
        ]);
        let units = compiled.emit_targets(&targets).unwrap();
        let paths: Vec<PathBuf> = units.iter().map(|u| u.path.clone()).collect();
        assert!(paths.contains(&PathBuf::from("rust/geometry.rs")));
        assert!(paths.contains(&PathBuf::from("rust/sys/types.rs")));
        assert!(paths.contains(&PathBuf::from("typescript/geometry.ts")));
        assert_eq!(units.len(), 4);

        let dir = tempfile::TempDir::new().unwrap();
        write_units(dir.path(), &units).unwrap();
        let written = std::fs::read_to_string(dir.path().join("rust/geometry.rs")).unwrap();
        assert!(written.contains("pub struct Point"));
    }
}
