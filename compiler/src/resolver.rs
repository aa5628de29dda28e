//! Symbol tables and module resolution.
//!
//! Every declaration of every module is first registered in one global table,
//! then each module's type references are resolved against it. Because lookup
//! happens against a fully populated table, declarations may refer to each
//! other (and to themselves) in any order, within or across modules. Only the
//! module *import* graph has to be acyclic.

use std::collections::{HashMap, HashSet};

use adlc_schema::{Literal, ScopedName};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AdlError, Location},
    types::{Annotation, Decl, DeclKind, Field, ImportKind, Module, TypeExpr0},
};

/// Stable handle of a declaration inside a [`ResolvedModuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Word8,
    Word16,
    Word32,
    Word64,
    Float,
    Double,
    Json,
    ByteVector,
    String,
    Vector,
    StringMap,
    Nullable,
    TypeToken,
}

impl Primitive {
    pub const ALL: [Primitive; 19] = [
        Primitive::Void,
        Primitive::Bool,
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::Word8,
        Primitive::Word16,
        Primitive::Word32,
        Primitive::Word64,
        Primitive::Float,
        Primitive::Double,
        Primitive::Json,
        Primitive::ByteVector,
        Primitive::String,
        Primitive::Vector,
        Primitive::StringMap,
        Primitive::Nullable,
        Primitive::TypeToken,
    ];

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Void       => "Void",
            Primitive::Bool       => "Bool",
            Primitive::Int8       => "Int8",
            Primitive::Int16      => "Int16",
            Primitive::Int32      => "Int32",
            Primitive::Int64      => "Int64",
            Primitive::Word8      => "Word8",
            Primitive::Word16     => "Word16",
            Primitive::Word32     => "Word32",
            Primitive::Word64     => "Word64",
            Primitive::Float      => "Float",
            Primitive::Double     => "Double",
            Primitive::Json       => "Json",
            Primitive::ByteVector => "ByteVector",
            Primitive::String     => "String",
            Primitive::Vector     => "Vector",
            Primitive::StringMap  => "StringMap",
            Primitive::Nullable   => "Nullable",
            Primitive::TypeToken  => "TypeToken",
        }
    }

    /// Number of type arguments the primitive takes.
    pub fn arity(self) -> usize {
        match self {
            Primitive::Vector
            | Primitive::StringMap
            | Primitive::Nullable
            | Primitive::TypeToken => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeRef {
    Primitive(Primitive),
    TypeParam(String),
    Decl(DeclId),
}

/// A resolved type expression: a head plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeExpr {
    pub head: TypeRef,
    pub args: Vec<TypeExpr>,
}

impl TypeExpr {
    pub fn primitive(p: Primitive, args: Vec<TypeExpr>) -> Self {
        TypeExpr { head: TypeRef::Primitive(p), args }
    }

    pub fn param(name: &str) -> Self {
        TypeExpr { head: TypeRef::TypeParam(name.to_string()), args: Vec::new() }
    }

    pub fn decl(id: DeclId, args: Vec<TypeExpr>) -> Self {
        TypeExpr { head: TypeRef::Decl(id), args }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedField {
    pub name:            String,
    pub serialized_name: String,
    pub type_expr:       TypeExpr,
    pub default:         Option<Literal>,
    pub annotations:     Vec<(ScopedName, Literal)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResolvedKind {
    Struct(Vec<ResolvedField>),
    Union(Vec<ResolvedField>),
    Enum(Vec<ResolvedField>),
    Alias(TypeExpr),
    Newtype {
        target:  TypeExpr,
        default: Option<Literal>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDecl {
    pub id:          DeclId,
    pub module:      String,
    pub name:        String,
    pub type_params: Vec<String>,
    pub annotations: Vec<(ScopedName, Literal)>,
    pub kind:        ResolvedKind,
}

impl ResolvedDecl {
    pub fn scoped_name(&self) -> ScopedName {
        ScopedName::new(self.module.clone(), self.name.clone())
    }

    pub fn location(&self) -> Location {
        Location::decl(&self.module, &self.name)
    }

    pub fn members(&self) -> &[ResolvedField] {
        match &self.kind {
            ResolvedKind::Struct(fields)
            | ResolvedKind::Union(fields)
            | ResolvedKind::Enum(fields) => fields,
            ResolvedKind::Alias(_) | ResolvedKind::Newtype { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModule {
    pub name:        String,
    pub imports:     Vec<String>,
    pub decls:       Vec<DeclId>,
    pub annotations: Vec<(ScopedName, Literal)>,
}

/// The closed set of modules of one compilation, with every declaration stored
/// in a single arena addressed by [`DeclId`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedModuleSet {
    modules:      Vec<ResolvedModule>,
    decls:        Vec<ResolvedDecl>,
    by_name:      HashMap<ScopedName, DeclId>,
    module_index: HashMap<String, usize>,
}

impl ResolvedModuleSet {
    pub fn modules(&self) -> &[ResolvedModule] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ResolvedModule> {
        self.module_index.get(name).map(|&i| &self.modules[i])
    }

    pub fn decls(&self) -> &[ResolvedDecl] {
        &self.decls
    }

    pub fn decl(&self, id: DeclId) -> &ResolvedDecl {
        &self.decls[id.index()]
    }

    pub fn lookup(&self, name: &ScopedName) -> Option<DeclId> {
        self.by_name.get(name).copied()
    }

    pub fn scoped_name(&self, id: DeclId) -> ScopedName {
        self.decl(id).scoped_name()
    }
}

/// Module name given to annotations that are neither qualified nor declared.
const ANNOTATIONS_MODULE: &str = "sys.annotations";

/// Global name table shared read-only by the per-module resolution workers.
struct SymbolTable<'a> {
    modules: HashMap<&'a str, &'a Module>,
    decls:   HashMap<ScopedName, DeclId>,
}

struct Scope<'s, 'a> {
    table:       &'s SymbolTable<'a>,
    module:      &'a Module,
    type_params: &'a [String],
    location:    Location,
}

impl<'s, 'a> Scope<'s, 'a> {
    fn lookup_decl(&self, module: &str, name: &str) -> Option<DeclId> {
        self.table.decls.get(&ScopedName::new(module, name)).copied()
    }

    /// Candidates for an unqualified name supplied by the module's imports,
    /// in import order, without duplicates.
    fn imported(&self, name: &str) -> Vec<(DeclId, ScopedName)> {
        let mut found: Vec<(DeclId, ScopedName)> = Vec::new();
        for import in &self.module.imports {
            let supplies = match &import.kind {
                ImportKind::All => true,
                ImportKind::Name(n) => n == name,
            };
            if !supplies {
                continue;
            }
            if let Some(id) = self.lookup_decl(&import.module, name) {
                if !found.iter().any(|(existing, _)| *existing == id) {
                    found.push((id, ScopedName::new(import.module.clone(), name)));
                }
            }
        }
        found
    }

    fn resolve_name(&self, texpr: &TypeExpr0) -> Result<TypeRef, AdlError> {
        let unknown = || AdlError::UnknownReference {
            location: self.location.clone(),
            name:     texpr.name.clone(),
        };

        match texpr.split_name() {
            (Some(module), name) => {
                if !self.table.modules.contains_key(module) {
                    return Err(unknown());
                }
                self.lookup_decl(module, name).map(TypeRef::Decl).ok_or_else(unknown)
            }
            (None, name) => {
                if self.type_params.iter().any(|p| p == name) {
                    return Ok(TypeRef::TypeParam(name.to_string()));
                }
                if let Some(p) = Primitive::from_name(name) {
                    return Ok(TypeRef::Primitive(p));
                }
                if let Some(id) = self.lookup_decl(&self.module.name, name) {
                    return Ok(TypeRef::Decl(id));
                }
                let mut candidates = self.imported(name);
                match candidates.len() {
                    0 => Err(unknown()),
                    1 => Ok(TypeRef::Decl(candidates.remove(0).0)),
                    _ => Err(AdlError::AmbiguousReference {
                        location:   self.location.clone(),
                        name:       name.to_string(),
                        candidates: candidates.into_iter().map(|(_, n)| n.to_string()).collect(),
                    }),
                }
            }
        }
    }

    fn resolve_type(&self, texpr: &TypeExpr0) -> Result<TypeExpr, AdlError> {
        let head = self.resolve_name(texpr)?;
        let args = texpr
            .args
            .iter()
            .map(|arg| self.resolve_type(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeExpr { head, args })
    }

    fn resolve_annotations(&self, annotations: &[Annotation]) -> Vec<(ScopedName, Literal)> {
        let mut resolved: Vec<(ScopedName, Literal)> = annotations
            .iter()
            .map(|a| {
                let key = match a.name.rfind('.') {
                    Some(idx) => ScopedName::new(&a.name[..idx], &a.name[idx + 1..]),
                    None => {
                        let local = self.lookup_decl(&self.module.name, &a.name);
                        let mut imported = self.imported(&a.name);
                        match (local, imported.len()) {
                            (Some(_), _) => ScopedName::new(self.module.name.clone(), a.name.clone()),
                            (None, 1) => imported.remove(0).1,
                            _ => ScopedName::new(ANNOTATIONS_MODULE, a.name.clone()),
                        }
                    }
                };
                (key, a.value.clone())
            })
            .collect();
        // Order is irrelevant for annotations; keep the last value for a repeated key.
        resolved.reverse();
        let mut seen = HashSet::new();
        resolved.retain(|(k, _)| seen.insert(k.clone()));
        resolved.sort_by(|a, b| a.0.cmp(&b.0));
        resolved
    }

    fn resolve_fields(&self, decl: &Decl, fields: &[Field]) -> Result<Vec<ResolvedField>, AdlError> {
        check_member_names(&self.module.name, decl, fields)?;
        fields
            .iter()
            .map(|f| {
                let scope = Scope { location: self.location.with_member(&f.name), ..*self };
                Ok(ResolvedField {
                    name:            f.name.clone(),
                    serialized_name: f.serialized_name.clone(),
                    type_expr:       scope.resolve_type(&f.type_expr)?,
                    default:         f.default.clone(),
                    annotations:     scope.resolve_annotations(&f.annotations),
                })
            })
            .collect()
    }
}

fn check_member_names(module: &str, decl: &Decl, fields: &[Field]) -> Result<(), AdlError> {
    let mut names = HashSet::new();
    let mut serialized = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(AdlError::DuplicateFieldOrAlternativeName {
                location: Location::member(module, &decl.name, &field.name),
                name:     field.name.clone(),
            });
        }
        if !serialized.insert(field.serialized_name.as_str()) {
            return Err(AdlError::DuplicateFieldOrAlternativeName {
                location: Location::member(module, &decl.name, &field.name),
                name:     field.serialized_name.clone(),
            });
        }
    }
    let mut params = HashSet::new();
    for param in &decl.type_params {
        if !params.insert(param.as_str()) {
            return Err(AdlError::DuplicateFieldOrAlternativeName {
                location: Location::member(module, &decl.name, param),
                name:     param.clone(),
            });
        }
    }
    Ok(())
}

/// Rejects import edges that point outside the module set or form a cycle.
fn check_imports<'a>(modules: &HashMap<&'a str, &'a Module>, order: &[&'a Module]) -> Vec<AdlError> {
    let mut errors = Vec::new();

    for &module in order {
        for import in &module.imports {
            let Some(target) = modules.get(import.module.as_str()) else {
                errors.push(AdlError::UnknownReference {
                    location: Location::module(&module.name),
                    name:     import.module.clone(),
                });
                continue;
            };
            if let ImportKind::Name(name) = &import.kind {
                if !target.decls.iter().any(|d| &d.name == name) {
                    errors.push(AdlError::UnknownReference {
                        location: Location::module(&module.name),
                        name:     format!("{}.{}", import.module, name),
                    });
                }
            }
        }
    }

    // 1 = on the current DFS path, 2 = finished.
    let mut state: HashMap<&'a str, u8> = HashMap::new();
    fn visit<'m>(
        name: &'m str,
        modules: &HashMap<&'m str, &'m Module>,
        state: &mut HashMap<&'m str, u8>,
        path: &mut Vec<&'m str>,
    ) -> Result<(), AdlError> {
        match state.get(name) {
            Some(1) => {
                let start = path.iter().position(|m| *m == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|m| m.to_string()).collect();
                cycle.push(name.to_string());
                return Err(AdlError::CyclicModuleImport { cycle });
            }
            Some(_) => return Ok(()),
            None => {}
        }
        let Some(&module) = modules.get(name) else {
            return Ok(());
        };
        state.insert(name, 1);
        path.push(name);
        for import in &module.imports {
            visit(import.module.as_str(), modules, state, path)?;
        }
        path.pop();
        state.insert(name, 2);
        Ok(())
    }

    for &module in order {
        let mut path = Vec::new();
        if let Err(e) = visit(module.name.as_str(), modules, &mut state, &mut path) {
            errors.push(e);
            break;
        }
    }
    errors
}

fn resolve_module(table: &SymbolTable, module: &Module, ids: &[DeclId]) -> Result<Vec<ResolvedDecl>, AdlError> {
    let mut resolved = Vec::with_capacity(module.decls.len());
    for (decl, &id) in module.decls.iter().zip(ids) {
        let scope = Scope {
            table,
            module,
            type_params: &decl.type_params,
            location: Location::decl(&module.name, &decl.name),
        };
        let kind = match &decl.kind {
            DeclKind::Struct(fields) => ResolvedKind::Struct(scope.resolve_fields(decl, fields)?),
            DeclKind::Union(fields)  => ResolvedKind::Union(scope.resolve_fields(decl, fields)?),
            DeclKind::Enum(fields)   => ResolvedKind::Enum(scope.resolve_fields(decl, fields)?),
            DeclKind::Alias(target)  => {
                check_member_names(&module.name, decl, &[])?;
                ResolvedKind::Alias(scope.resolve_type(target)?)
            }
            DeclKind::Newtype { target, default } => {
                check_member_names(&module.name, decl, &[])?;
                ResolvedKind::Newtype {
                    target:  scope.resolve_type(target)?,
                    default: default.clone(),
                }
            }
        };
        resolved.push(ResolvedDecl {
            id,
            module:      module.name.clone(),
            name:        decl.name.clone(),
            type_params: decl.type_params.clone(),
            annotations: scope.resolve_annotations(&decl.annotations),
            kind,
        });
    }
    debug!(module = %module.name, decls = resolved.len(), "resolved module");
    Ok(resolved)
}

/// Resolves a set of parsed modules into a closed [`ResolvedModuleSet`].
///
/// Errors are collected per module: each failing module reports its first
/// error, and the other modules are still resolved so that one pass surfaces
/// as many problems as possible.
pub fn resolve(modules: &[Module]) -> Result<ResolvedModuleSet, Vec<AdlError>> {
    let mut by_module: HashMap<&str, &Module> = HashMap::new();
    for module in modules {
        if by_module.insert(module.name.as_str(), module).is_some() {
            return Err(vec![AdlError::DuplicateModule(module.name.clone())]);
        }
    }

    let import_errors = check_imports(&by_module, &modules.iter().collect::<Vec<_>>());
    if !import_errors.is_empty() {
        return Err(import_errors);
    }

    let mut errors = Vec::new();
    let mut decl_table: HashMap<ScopedName, DeclId> = HashMap::new();
    let mut module_ids: Vec<Vec<DeclId>> = Vec::with_capacity(modules.len());
    let mut next = 0u32;
    for module in modules {
        let mut ids = Vec::with_capacity(module.decls.len());
        for decl in &module.decls {
            let key = ScopedName::new(module.name.clone(), decl.name.clone());
            // Primitive names are looked up first, so such a declaration could never be referenced.
            if decl_table.contains_key(&key) || Primitive::from_name(&decl.name).is_some() {
                errors.push(AdlError::DuplicateDeclarationName {
                    location: Location::decl(&module.name, &decl.name),
                    name:     decl.name.clone(),
                });
                break;
            }
            let id = DeclId(next);
            next += 1;
            decl_table.insert(key, id);
            ids.push(id);
        }
        module_ids.push(ids);
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let table = SymbolTable { modules: by_module, decls: decl_table };
    let results: Vec<Result<Vec<ResolvedDecl>, AdlError>> = modules
        .par_iter()
        .zip(module_ids.par_iter())
        .map(|(module, ids)| resolve_module(&table, module, ids))
        .collect();

    let mut decls = Vec::new();
    for result in results {
        match result {
            Ok(mut resolved) => decls.append(&mut resolved),
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let resolved_modules = modules
        .iter()
        .zip(module_ids)
        .map(|(module, ids)| {
            let scope = Scope {
                table:       &table,
                module,
                type_params: &[],
                location:    Location::module(&module.name),
            };
            ResolvedModule {
                name:        module.name.clone(),
                imports:     module.imported_modules().into_iter().map(String::from).collect(),
                decls:       ids,
                annotations: scope.resolve_annotations(&module.annotations),
            }
        })
        .collect::<Vec<_>>();

    let module_index = resolved_modules
        .iter()
        .enumerate()
        .map(|(i, m)| (m.name.clone(), i))
        .collect();

    Ok(ResolvedModuleSet {
        modules: resolved_modules,
        decls,
        by_name: table.decls,
        module_index,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{parser::parse_schema, stdlib, tokenizer::tokenize_schema};

    pub(crate) fn parse_all(sources: &[&str]) -> Vec<Module> {
        sources
            .iter()
            .map(|src| {
                let tokens = tokenize_schema("test", src).expect("tokenize failed");
                parse_schema("test", &tokens).expect("parse failed")
            })
            .collect()
    }

    pub(crate) fn resolve_sources(sources: &[&str]) -> Result<ResolvedModuleSet, Vec<AdlError>> {
        resolve(&parse_all(sources))
    }

    #[test]
    fn test_resolve_local_and_imported_names() {
        let set = resolve_sources(&[
            stdlib::SYS_TYPES_ADL,
            "module a { import sys.types.*; struct S { Maybe<String> m; T2 t; }; struct T2 { S s; }; };",
        ])
        .expect("resolve failed");

        let s = set.decl(set.lookup(&ScopedName::new("a", "S")).unwrap());
        let maybe = set.lookup(&ScopedName::new("sys.types", "Maybe")).unwrap();
        let t2 = set.lookup(&ScopedName::new("a", "T2")).unwrap();
        assert_eq!(
            s.members()[0].type_expr,
            TypeExpr::decl(maybe, vec![TypeExpr::primitive(Primitive::String, vec![])])
        );
        assert_eq!(s.members()[1].type_expr, TypeExpr::decl(t2, vec![]));
        assert_eq!(set.module("a").unwrap().imports, vec!["sys.types".to_string()]);
    }

    #[test]
    fn test_type_params_shadow_declarations() {
        let set = resolve_sources(&["module a { struct T {}; struct Box<T> { T value; }; };"]).unwrap();
        let b = set.decl(set.lookup(&ScopedName::new("a", "Box")).unwrap());
        assert_eq!(b.members()[0].type_expr, TypeExpr::param("T"));
    }

    #[test]
    fn test_unknown_reference() {
        let errors = resolve_sources(&["module a { struct S { Missing m; }; };"]).unwrap_err();
        match &errors[0] {
            AdlError::UnknownReference { location, name } => {
                assert_eq!(name, "Missing");
                assert_eq!(location, &Location::member("a", "S", "m"));
            }
            other => panic!("expected UnknownReference, got {:?}", other),
        }
    }

    #[test]
    fn test_qualified_reference_needs_no_import() {
        let set = resolve_sources(&[
            "module b { struct B { Int32 x; }; };",
            "module a { struct A { b.B value; }; };",
        ])
        .unwrap();
        assert_eq!(set.decls().len(), 2);

        let errors = resolve_sources(&["module a { struct A { nowhere.B value; }; };"]).unwrap_err();
        assert!(matches!(errors[0], AdlError::UnknownReference { .. }));
    }

    #[test]
    fn test_ambiguous_reference() {
        let errors = resolve_sources(&[
            "module b { struct Shape {}; };",
            "module c { struct Shape {}; };",
            "module a { import b.*; import c.*; struct A { Shape s; }; };",
        ])
        .unwrap_err();
        match &errors[0] {
            AdlError::AmbiguousReference { name, candidates, .. } => {
                assert_eq!(name, "Shape");
                assert_eq!(candidates, &vec!["b.Shape".to_string(), "c.Shape".to_string()]);
            }
            other => panic!("expected AmbiguousReference, got {:?}", other),
        }
    }

    #[test]
    fn test_local_declaration_overrides_imports() {
        let set = resolve_sources(&[
            "module b { struct Shape {}; };",
            "module c { struct Shape {}; };",
            "module a { import b.*; import c.*; struct Shape {}; struct A { Shape s; }; };",
        ])
        .unwrap();
        let a = set.decl(set.lookup(&ScopedName::new("a", "A")).unwrap());
        let local = set.lookup(&ScopedName::new("a", "Shape")).unwrap();
        assert_eq!(a.members()[0].type_expr, TypeExpr::decl(local, vec![]));
    }

    #[test]
    fn test_cyclic_module_import() {
        let errors = resolve_sources(&[
            "module a { import b.*; struct A {}; };",
            "module b { import a.*; struct B {}; };",
        ])
        .unwrap_err();
        match &errors[0] {
            AdlError::CyclicModuleImport { cycle } => {
                assert_eq!(cycle, &vec!["a".to_string(), "b".to_string(), "a".to_string()]);
            }
            other => panic!("expected CyclicModuleImport, got {:?}", other),
        }
    }

    #[test]
    fn test_acyclic_imports_with_back_references() {
        // a imports b and c; b and c refer back to a by qualified name only.
        let set = resolve_sources(&[
            "module a { import b.*; import c.*; struct A { B b; C c; }; };",
            "module b { struct B { Vector<a.A> parents; }; };",
            "module c { struct C { Nullable<a.A> parent; }; };",
        ]);
        assert!(set.is_ok(), "{:?}", set.err());
    }

    #[test]
    fn test_duplicate_names() {
        let errors = resolve_sources(&["module a { struct S {}; union S { Int32 x; }; };"]).unwrap_err();
        assert!(matches!(errors[0], AdlError::DuplicateDeclarationName { .. }));

        let errors = resolve_sources(&["module a { struct S { Int32 x; String x; }; };"]).unwrap_err();
        assert!(matches!(errors[0], AdlError::DuplicateFieldOrAlternativeName { .. }));

        let errors = resolve_sources(&[
            "module a { struct S { Int32 x; @SerializedName \"x\" String y; }; };",
        ])
        .unwrap_err();
        assert!(matches!(errors[0], AdlError::DuplicateFieldOrAlternativeName { .. }));

        let errors = resolve_sources(&["module a { enum E { a; b; a; }; };"]).unwrap_err();
        assert!(matches!(errors[0], AdlError::DuplicateFieldOrAlternativeName { .. }));

        let errors = resolve_sources(&["module a { struct S {}; };", "module a { struct T {}; };"]).unwrap_err();
        assert!(matches!(errors[0], AdlError::DuplicateModule(_)));
    }

    #[test]
    fn test_named_import_must_exist() {
        let errors = resolve_sources(&[
            "module a { struct P { Int32 x; }; };",
            "module b { import a.Nope; struct Q { Int32 y; }; };",
        ])
        .unwrap_err();
        match &errors[0] {
            AdlError::UnknownReference { location, name } => {
                assert_eq!(name, "a.Nope");
                assert_eq!(location, &Location::module("b"));
            }
            other => panic!("expected UnknownReference, got {:?}", other),
        }

        let ok = resolve_sources(&[
            "module a { struct P { Int32 x; }; };",
            "module b { import a.P; struct Q { P p; }; };",
        ]);
        assert!(ok.is_ok(), "{:?}", ok.err());
    }

    #[test]
    fn test_declaration_named_after_primitive() {
        let errors = resolve_sources(&["module a { struct String { Int32 x; }; };"]).unwrap_err();
        match &errors[0] {
            AdlError::DuplicateDeclarationName { name, .. } => assert_eq!(name, "String"),
            other => panic!("expected DuplicateDeclarationName, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_collected_per_module() {
        let errors = resolve_sources(&[
            "module a { struct A { Nope x; Nada y; }; };",
            "module b { struct B { Zilch z; }; };",
            "module c { struct C { Int32 ok; }; };",
        ])
        .unwrap_err();
        // First error of each failing module.
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, AdlError::UnknownReference { .. })));
    }

    #[test]
    fn test_annotations_are_qualified_and_sorted() {
        let set = resolve_sources(&[
            "module a { struct Marker {}; @Zed 1 @Marker true /// doc\n struct S {}; };",
        ])
        .unwrap();
        let s = set.decl(set.lookup(&ScopedName::new("a", "S")).unwrap());
        let keys: Vec<String> = s.annotations.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a.Marker", "sys.annotations.Doc", "sys.annotations.Zed"]);
    }
}
