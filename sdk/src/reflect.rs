use std::{collections::HashMap, fmt, marker::PhantomData};

use adlc_schema::{ScopedDecl, ScopedName, TypeExpr};

use crate::error::RuntimeError;

/// Names the declaration of generated type `T`.
pub struct TypeRef<T> {
    pub value: ScopedName,
    phantom:   PhantomData<T>,
}

impl<T> TypeRef<T> {
    pub fn new(module: &str, name: &str) -> Self {
        TypeRef { value: ScopedName::new(module, name), phantom: PhantomData }
    }
}

// Manual impls so that `T` need not implement the traits itself.
impl<T> Clone for TypeRef<T> {
    fn clone(&self) -> Self {
        TypeRef { value: self.value.clone(), phantom: PhantomData }
    }
}

impl<T> PartialEq for TypeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> fmt::Debug for TypeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.value)
    }
}

/// A type expression whose Rust counterpart is `T`.
pub struct ATypeExpr<T> {
    pub value: TypeExpr,
    phantom:   PhantomData<T>,
}

impl<T> ATypeExpr<T> {
    pub fn new(value: TypeExpr) -> Self {
        ATypeExpr { value, phantom: PhantomData }
    }

    pub fn reference(module: &str, name: &str, parameters: Vec<TypeExpr>) -> Self {
        ATypeExpr::new(TypeExpr::reference(ScopedName::new(module, name), parameters))
    }
}

impl<T> Clone for ATypeExpr<T> {
    fn clone(&self) -> Self {
        ATypeExpr::new(self.value.clone())
    }
}

impl<T> PartialEq for ATypeExpr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> fmt::Debug for ATypeExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ATypeExpr").field(&self.value).finish()
    }
}

fn primitive<T>(name: &str, parameters: Vec<TypeExpr>) -> ATypeExpr<T> {
    ATypeExpr::new(TypeExpr::primitive(name, parameters))
}

pub fn texpr_void() -> ATypeExpr<()> {
    primitive("Void", vec![])
}

pub fn texpr_bool() -> ATypeExpr<bool> {
    primitive("Bool", vec![])
}

pub fn texpr_int32() -> ATypeExpr<i32> {
    primitive("Int32", vec![])
}

pub fn texpr_int64() -> ATypeExpr<i64> {
    primitive("Int64", vec![])
}

pub fn texpr_double() -> ATypeExpr<f64> {
    primitive("Double", vec![])
}

pub fn texpr_string() -> ATypeExpr<String> {
    primitive("String", vec![])
}

pub fn texpr_bytes() -> ATypeExpr<crate::ByteVector> {
    primitive("ByteVector", vec![])
}

pub fn texpr_json() -> ATypeExpr<serde_json::Value> {
    primitive("Json", vec![])
}

pub fn texpr_vector<T>(element: ATypeExpr<T>) -> ATypeExpr<Vec<T>> {
    primitive("Vector", vec![element.value])
}

pub fn texpr_string_map<T>(value: ATypeExpr<T>) -> ATypeExpr<HashMap<String, T>> {
    primitive("StringMap", vec![value.value])
}

pub fn texpr_nullable<T>(value: ATypeExpr<T>) -> ATypeExpr<Option<T>> {
    primitive("Nullable", vec![value.value])
}

/// Parses one embedded `AST_*` constant.
pub fn decode_ast(json: &str) -> Result<ScopedDecl, RuntimeError> {
    Ok(ScopedDecl::from_json(json)?)
}

/// Declarations decoded from one or more generated `AST_MAP` tables.
#[derive(Debug, Clone, Default)]
pub struct AstMap {
    decls: HashMap<ScopedName, ScopedDecl>,
}

impl AstMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: &[(&str, &str)]) -> Result<Self, RuntimeError> {
        let mut map = AstMap::new();
        map.extend(table)?;
        Ok(map)
    }

    pub fn extend(&mut self, table: &[(&str, &str)]) -> Result<(), RuntimeError> {
        for (_, json) in table {
            let decl = decode_ast(json)?;
            self.decls.insert(decl.scoped_name(), decl);
        }
        Ok(())
    }

    pub fn get(&self, name: &ScopedName) -> Option<&ScopedDecl> {
        self.decls.get(name)
    }

    pub fn resolve<T>(&self, type_ref: &TypeRef<T>) -> Result<&ScopedDecl, RuntimeError> {
        self.get(&type_ref.value)
            .ok_or_else(|| RuntimeError::MissingDecl(type_ref.value.to_string()))
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adlc_schema::{Decl, DeclType, Maybe, Struct};

    struct Opaque;

    fn point_ast() -> String {
        ScopedDecl {
            module_name: "shapes".to_string(),
            decl:        Decl {
                annotations: vec![],
                type_:       DeclType::Struct(Struct { type_params: vec![], fields: vec![] }),
                name:        "Point".to_string(),
                version:     Maybe::Nothing,
            },
        }
        .to_json()
        .unwrap()
    }

    #[test]
    fn test_type_expr_builders() {
        let texpr: ATypeExpr<Opaque> = ATypeExpr::reference("sys.types", "Maybe", vec![texpr_string().value]);
        let json = serde_json::to_value(&texpr.value).unwrap();
        assert_eq!(json["typeRef"]["value"]["name"], "Maybe");
        assert_eq!(json["parameters"][0]["typeRef"], serde_json::json!({"kind": "primitive", "value": "String"}));

        let nested = texpr_vector(texpr_nullable(texpr_int32()));
        assert_eq!(nested.value.parameters[0].parameters.len(), 1);
        assert_eq!(nested.clone(), nested);
    }

    #[test]
    fn test_ast_map() {
        let json = point_ast();
        let map = AstMap::from_table(&[("shapes.Point", json.as_str())]).unwrap();
        assert_eq!(map.len(), 1);

        let point: TypeRef<Opaque> = TypeRef::new("shapes", "Point");
        assert_eq!(map.resolve(&point).unwrap().decl.name, "Point");

        let circle: TypeRef<Opaque> = TypeRef::new("shapes", "Circle");
        assert!(matches!(map.resolve(&circle), Err(RuntimeError::MissingDecl(_))));
        assert!(matches!(decode_ast("{}"), Err(RuntimeError::Json(_))));
    }
}
