//! Finds module sources on the search path and parses them, following
//! imports until every referenced module is loaded.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::AdlError, parser::parse_schema, stdlib::builtin_source, tokenizer::tokenize_schema,
    types::Module,
};

/// Tokenizes and parses one source text.
pub fn parse_source(label: &str, text: &str) -> Result<Module, AdlError> {
    let tokens = tokenize_schema(label, text)?;
    parse_schema(label, &tokens)
}

/// `a.b` → `a/b.adl`
pub fn module_file(module: &str) -> PathBuf {
    let mut path: PathBuf = module.split('.').collect();
    path.set_extension("adl");
    path
}

/// Modules each parsed module depends on: imports first, then qualified references.
fn dependencies(module: &Module) -> Vec<String> {
    let mut deps: Vec<String> = module.imported_modules().into_iter().map(String::from).collect();
    for name in module.referenced_modules() {
        if !deps.contains(&name) {
            deps.push(name);
        }
    }
    deps
}

#[derive(Debug, Clone)]
pub struct Loader {
    search_path: Vec<PathBuf>,
}

impl Loader {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Loader { search_path }
    }

    /// Loads module `name`. A file on the search path shadows a built-in module.
    pub fn load_module(&self, name: &str) -> Result<Module, AdlError> {
        let relative = module_file(name);
        for dir in &self.search_path {
            let path = dir.join(&relative);
            if path.is_file() {
                debug!(module = name, path = %path.display(), "loading module");
                return self.load_file(&path);
            }
        }
        match builtin_source(name) {
            Some(text) => {
                debug!(module = name, "using built-in module");
                parse_source(name, text)
            }
            None => Err(AdlError::ModuleNotFound(name.to_string())),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<Module, AdlError> {
        let text = std::fs::read_to_string(path)?;
        parse_source(&path.display().to_string(), &text)
    }

    /// Loads the named modules and everything they depend on.
    pub fn load(&self, names: &[String]) -> Result<Vec<Module>, AdlError> {
        let roots = names
            .par_iter()
            .map(|name| self.load_module(name))
            .collect::<Result<Vec<_>, _>>()?;
        self.load_dependencies(roots)
    }

    /// Completes `modules` with the modules they depend on, loading one
    /// level of the import graph at a time. Results are in discovery order.
    pub fn load_dependencies(&self, modules: Vec<Module>) -> Result<Vec<Module>, AdlError> {
        let mut seen: HashSet<String> = HashSet::new();
        for module in &modules {
            if !seen.insert(module.name.clone()) {
                return Err(AdlError::DuplicateModule(module.name.clone()));
            }
        }

        let mut loaded = modules;
        let mut frontier = 0;
        while frontier < loaded.len() {
            let mut wanted = Vec::new();
            for module in &loaded[frontier..] {
                for dep in dependencies(module) {
                    if seen.insert(dep.clone()) {
                        wanted.push(dep);
                    }
                }
            }
            frontier = loaded.len();

            let level = wanted
                .par_iter()
                .map(|name| self.load_module(name))
                .collect::<Result<Vec<_>, _>>()?;
            for (name, module) in wanted.iter().zip(&level) {
                if &module.name != name {
                    return Err(AdlError::ModuleNotFound(name.clone()));
                }
            }
            loaded.extend(level);
        }
        Ok(loaded)
    }
}

/// Adds the built-in modules that `modules` need but do not supply. Other
/// missing modules are left for the resolver to report.
pub fn with_builtins(modules: Vec<Module>) -> Result<Vec<Module>, AdlError> {
    let mut seen: HashSet<String> = HashSet::new();
    for module in &modules {
        if !seen.insert(module.name.clone()) {
            return Err(AdlError::DuplicateModule(module.name.clone()));
        }
    }

    let mut loaded = modules;
    let mut next = 0;
    while next < loaded.len() {
        for dep in dependencies(&loaded[next]) {
            if seen.contains(&dep) {
                continue;
            }
            if let Some(text) = builtin_source(&dep) {
                debug!(module = %dep, "using built-in module");
                seen.insert(dep.clone());
                loaded.push(parse_source(&dep, text)?);
            }
        }
        next += 1;
    }
    Ok(loaded)
}
