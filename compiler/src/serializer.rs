//! Conversion of resolved declarations into the portable `ScopedDecl` form.

use adlc_schema::{
    self as ast, Annotations, DeclType, Literal, Maybe, NewType, Pair, ScopedDecl, ScopedName,
    Struct, TypeDef, Union,
};

use crate::{
    defaults::DeclDefaults,
    resolver::{DeclId, ResolvedField, ResolvedKind, ResolvedModuleSet, TypeExpr, TypeRef},
};

pub fn type_expr(set: &ResolvedModuleSet, texpr: &TypeExpr) -> ast::TypeExpr {
    let parameters = texpr.args.iter().map(|a| type_expr(set, a)).collect();
    match &texpr.head {
        TypeRef::Primitive(p)    => ast::TypeExpr::primitive(p.name(), parameters),
        TypeRef::TypeParam(name) => ast::TypeExpr::type_param(name.clone()),
        TypeRef::Decl(id)        => ast::TypeExpr::reference(set.scoped_name(*id), parameters),
    }
}

/// Annotations arrive sorted by key from the resolver.
pub fn annotations(annotations: &[(ScopedName, Literal)]) -> Annotations {
    annotations
        .iter()
        .map(|(k, v)| Pair::new(k.clone(), v.to_json()))
        .collect()
}

fn fields(set: &ResolvedModuleSet, fields: &[ResolvedField], defaults: &DeclDefaults) -> Vec<ast::Field> {
    fields
        .iter()
        .enumerate()
        .map(|(i, f)| ast::Field {
            annotations:     annotations(&f.annotations),
            serialized_name: f.serialized_name.clone(),
            default:         defaults
                .fields
                .get(i)
                .and_then(|d| d.as_ref())
                .map(|v| v.to_literal(set))
                .into(),
            name:            f.name.clone(),
            type_expr:       type_expr(set, &f.type_expr),
        })
        .collect()
}

/// Serializes declaration `id`, embedding its normalized defaults in
/// canonical form. The same inputs always produce an identical value.
pub fn serialize_decl(set: &ResolvedModuleSet, id: DeclId, defaults: &DeclDefaults) -> ScopedDecl {
    let decl = set.decl(id);
    let type_params = decl.type_params.clone();
    let type_ = match &decl.kind {
        ResolvedKind::Struct(fs) => DeclType::Struct(Struct {
            type_params,
            fields: fields(set, fs, defaults),
        }),
        ResolvedKind::Union(fs) | ResolvedKind::Enum(fs) => DeclType::Union(Union {
            type_params,
            fields: fields(set, fs, defaults),
        }),
        ResolvedKind::Alias(target) => DeclType::Type(TypeDef {
            type_params,
            type_expr: type_expr(set, target),
        }),
        ResolvedKind::Newtype { target, .. } => DeclType::Newtype(NewType {
            type_params,
            type_expr: type_expr(set, target),
            default:   defaults.newtype.as_ref().map(|v| v.to_literal(set)).into(),
        }),
    };

    ScopedDecl {
        module_name: decl.module.clone(),
        decl: ast::Decl {
            annotations: annotations(&decl.annotations),
            type_,
            name:    decl.name.clone(),
            version: Maybe::Nothing,
        },
    }
}

/// Serializes every declaration of `module`, in declaration order.
/// `defaults` is indexed by [`DeclId`].
pub fn serialize_module(set: &ResolvedModuleSet, module: &str, defaults: &[DeclDefaults]) -> Vec<ScopedDecl> {
    let empty = DeclDefaults::default();
    set.module(module)
        .map(|m| {
            m.decls
                .iter()
                .map(|&id| serialize_decl(set, id, defaults.get(id.index()).unwrap_or(&empty)))
                .collect()
        })
        .unwrap_or_default()
}
