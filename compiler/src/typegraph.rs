//! Instantiation of generic declarations and validation of type expressions.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{AdlError, Location},
    resolver::{DeclId, ResolvedKind, ResolvedModuleSet, TypeExpr, TypeRef},
};

/// Upper bound on nested alias expansions before a chain is declared infinite.
pub const MAX_ALIAS_DEPTH: usize = 64;

/// Substitution of type parameter names by type expressions.
pub type Bindings = HashMap<String, TypeExpr>;

/// The body of a declaration with its type arguments substituted.
#[derive(Debug, Clone, PartialEq)]
pub enum Members {
    /// Field / alternative / label types, in declaration order.
    Fields(Vec<TypeExpr>),
    /// Target of an alias or newtype.
    Target(TypeExpr),
}

impl Members {
    pub fn fields(&self) -> &[TypeExpr] {
        match self {
            Members::Fields(types) => types,
            Members::Target(_) => &[],
        }
    }

    pub fn target(&self) -> Option<&TypeExpr> {
        match self {
            Members::Target(t) => Some(t),
            Members::Fields(_) => None,
        }
    }
}

type CacheKey = (DeclId, Vec<TypeExpr>);

/// Read-only view over a [`ResolvedModuleSet`] plus the shared instantiation
/// cache. Safe to use from many worker threads at once.
pub struct TypeGraph<'a> {
    set:   &'a ResolvedModuleSet,
    cache: RwLock<HashMap<CacheKey, Arc<Members>>>,
}

impl<'a> TypeGraph<'a> {
    pub fn new(set: &'a ResolvedModuleSet) -> Self {
        TypeGraph { set, cache: RwLock::new(HashMap::new()) }
    }

    pub fn set(&self) -> &'a ResolvedModuleSet {
        self.set
    }

    /// Number of distinct instantiations computed so far.
    pub fn cached_instantiations(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_alias(&self, id: DeclId) -> bool {
        matches!(self.set.decl(id).kind, ResolvedKind::Alias(_))
    }

    fn head_name(&self, head: &TypeRef) -> String {
        match head {
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::TypeParam(name) => name.clone(),
            TypeRef::Decl(id) => self.set.scoped_name(*id).to_string(),
        }
    }

    fn arity(&self, head: &TypeRef) -> usize {
        match head {
            TypeRef::Primitive(p) => p.arity(),
            TypeRef::TypeParam(_) => 0,
            TypeRef::Decl(id) => self.set.decl(*id).type_params.len(),
        }
    }

    fn check_arity(&self, texpr: &TypeExpr, location: &Location) -> Result<(), AdlError> {
        let expected = self.arity(&texpr.head);
        if expected != texpr.args.len() {
            return Err(AdlError::ArityError {
                location: location.clone(),
                name:     self.head_name(&texpr.head),
                expected,
                found:    texpr.args.len(),
            });
        }
        Ok(())
    }

    /// Pairs a declaration's type parameters with `args`.
    pub fn bind(&self, id: DeclId, args: &[TypeExpr], location: &Location) -> Result<Bindings, AdlError> {
        self.check_arity(&TypeExpr::decl(id, args.to_vec()), location)?;
        let decl = self.set.decl(id);
        Ok(decl.type_params.iter().cloned().zip(args.iter().cloned()).collect())
    }

    /// Substitutes bound type parameters and checks the arity of every
    /// sub-expression.
    pub fn instantiate(&self, texpr: &TypeExpr, bindings: &Bindings, location: &Location) -> Result<TypeExpr, AdlError> {
        self.check_arity(texpr, location)?;
        if let TypeRef::TypeParam(name) = &texpr.head {
            return bindings.get(name).cloned().ok_or_else(|| AdlError::UnknownReference {
                location: location.clone(),
                name:     name.clone(),
            });
        }
        let args = texpr
            .args
            .iter()
            .map(|arg| self.instantiate(arg, bindings, location))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeExpr { head: texpr.head.clone(), args })
    }

    /// Body of declaration `id` instantiated at `args`. Memoised per
    /// `(id, args)`; when two threads race on the same key the first stored
    /// result is kept.
    pub fn members(&self, id: DeclId, args: &[TypeExpr], location: &Location) -> Result<Arc<Members>, AdlError> {
        let key: CacheKey = (id, args.to_vec());
        if let Ok(cache) = self.cache.read() {
            if let Some(found) = cache.get(&key) {
                return Ok(found.clone());
            }
        }

        let bindings = self.bind(id, args, location)?;
        let decl = self.set.decl(id);
        let members = match &decl.kind {
            ResolvedKind::Struct(fields)
            | ResolvedKind::Union(fields)
            | ResolvedKind::Enum(fields) => Members::Fields(
                fields
                    .iter()
                    .map(|f| self.instantiate(&f.type_expr, &bindings, location))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ResolvedKind::Alias(target) | ResolvedKind::Newtype { target, .. } => {
                Members::Target(self.instantiate(target, &bindings, location)?)
            }
        };

        match self.cache.write() {
            Ok(mut cache) => Ok(cache.entry(key).or_insert_with(|| Arc::new(members)).clone()),
            Err(_) => Ok(Arc::new(members)),
        }
    }

    /// Follows type aliases at the head of `texpr` until the head is a
    /// primitive, type parameter, or non-alias declaration.
    pub fn expand(&self, texpr: &TypeExpr, location: &Location) -> Result<TypeExpr, AdlError> {
        let mut current = texpr.clone();
        let mut seen: HashSet<CacheKey> = HashSet::new();
        loop {
            let TypeRef::Decl(id) = current.head else {
                return Ok(current);
            };
            if !self.is_alias(id) {
                return Ok(current);
            }
            if seen.len() >= MAX_ALIAS_DEPTH || !seen.insert((id, current.args.clone())) {
                return Err(AdlError::InfiniteAliasExpansion {
                    location: location.clone(),
                    name:     self.set.scoped_name(id).to_string(),
                });
            }
            let members = self.members(id, &current.args, location)?;
            match members.target() {
                Some(target) => current = target.clone(),
                None => return Ok(current),
            }
        }
    }

    /// Checks arity everywhere in `texpr` and walks through the body of every
    /// alias it mentions, rejecting aliases that reach themselves.
    ///
    /// An alias is rejected even when it only reaches itself through a
    /// container (`type Tree = Vector<Tree>`). Aliases are expanded in place
    /// and a Rust `type` alias may not refer to itself; a `newtype` or struct
    /// breaks the cycle.
    fn check_expr(&self, texpr: &TypeExpr, aliases: &mut Vec<DeclId>, location: &Location) -> Result<(), AdlError> {
        self.check_arity(texpr, location)?;
        for arg in &texpr.args {
            self.check_expr(arg, aliases, location)?;
        }
        if let TypeRef::Decl(id) = texpr.head {
            if let ResolvedKind::Alias(body) = &self.set.decl(id).kind {
                if aliases.contains(&id) || aliases.len() >= MAX_ALIAS_DEPTH {
                    return Err(AdlError::InfiniteAliasExpansion {
                        location: location.clone(),
                        name:     self.set.scoped_name(id).to_string(),
                    });
                }
                aliases.push(id);
                self.check_expr(body, aliases, location)?;
                aliases.pop();
            }
        }
        Ok(())
    }

    /// Validates every type expression in the body of a declaration, with
    /// the declaration's own parameters bound to themselves.
    pub fn check_declaration(&self, id: DeclId) -> Result<(), AdlError> {
        let decl = self.set.decl(id);
        let location = decl.location();
        let mut aliases = Vec::new();
        match &decl.kind {
            ResolvedKind::Struct(fields)
            | ResolvedKind::Union(fields)
            | ResolvedKind::Enum(fields) => {
                for field in fields {
                    self.check_expr(&field.type_expr, &mut aliases, &location.with_member(&field.name))?;
                }
            }
            ResolvedKind::Alias(_) => {
                let self_ref = TypeExpr::decl(
                    id,
                    decl.type_params.iter().map(|p| TypeExpr::param(p)).collect(),
                );
                self.check_expr(&self_ref, &mut aliases, &location)?;
            }
            ResolvedKind::Newtype { target, .. } => {
                self.check_expr(target, &mut aliases, &location)?;
            }
        }
        Ok(())
    }

    /// Checks every declaration in parallel. Reports the first error of each
    /// failing module, in module order.
    pub fn check_all(&self) -> Result<(), Vec<AdlError>> {
        let results: Vec<(DeclId, Result<(), AdlError>)> = self
            .set
            .decls()
            .par_iter()
            .map(|decl| (decl.id, self.check_declaration(decl.id)))
            .collect();

        let mut failed_modules = HashSet::new();
        let mut errors = Vec::new();
        for (id, result) in results {
            if let Err(e) = result {
                if failed_modules.insert(self.set.decl(id).module.clone()) {
                    errors.push(e);
                }
            }
        }
        debug!(
            decls = self.set.decls().len(),
            instantiations = self.cached_instantiations(),
            errors = errors.len(),
            "checked type graph"
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
