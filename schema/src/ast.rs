use serde::{Deserialize, Serialize};

/// A declaration name qualified by the module that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopedName {
    #[serde(rename = "moduleName")]
    pub module_name: String,
    pub name:        String,
}

impl ScopedName {
    pub fn new(module_name: impl Into<String>, name: impl Into<String>) -> Self {
        ScopedName {
            module_name: module_name.into(),
            name:        name.into(),
        }
    }
}

impl std::fmt::Display for ScopedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module_name, self.name)
    }
}

/// The ADL `sys.types.Maybe` encoding used throughout the AST:
/// `{"kind":"nothing"}` or `{"kind":"just","value":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Maybe<T> {
    Nothing,
    Just(T),
}

impl<T> Maybe<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Maybe::Nothing  => None,
            Maybe::Just(v)  => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Maybe::Just(v),
            None    => Maybe::Nothing,
        }
    }
}

/// Key/value pair, serialized as `{"v1":..,"v2":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair<A, B> {
    pub v1: A,
    pub v2: B,
}

impl<A, B> Pair<A, B> {
    pub fn new(v1: A, v2: B) -> Self {
        Pair { v1, v2 }
    }
}

/// Head of a type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TypeRef {
    Primitive(String),
    TypeParam(String),
    Reference(ScopedName),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeExpr {
    #[serde(rename = "typeRef")]
    pub type_ref:   TypeRef,
    pub parameters: Vec<TypeExpr>,
}

impl TypeExpr {
    pub fn primitive(name: impl Into<String>, parameters: Vec<TypeExpr>) -> Self {
        TypeExpr { type_ref: TypeRef::Primitive(name.into()), parameters }
    }

    pub fn type_param(name: impl Into<String>) -> Self {
        TypeExpr { type_ref: TypeRef::TypeParam(name.into()), parameters: Vec::new() }
    }

    pub fn reference(name: ScopedName, parameters: Vec<TypeExpr>) -> Self {
        TypeExpr { type_ref: TypeRef::Reference(name), parameters }
    }
}

/// Default and annotation literal trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Null,
    /// Any integer from `i64::MIN` to `u64::MAX`.
    Integer(i128),
    Double(f64),
    String(String),
    Boolean(bool),
    Array(Vec<Literal>),
    Object(Vec<Pair<String, Literal>>),
}

impl Literal {
    /// Converts to plain JSON. Later object keys overwrite earlier ones.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Literal::Null        => J::Null,
            Literal::Integer(i)  => match (i64::try_from(*i), u64::try_from(*i)) {
                (Ok(v), _) => J::from(v),
                (_, Ok(v)) => J::from(v),
                _          => J::from(*i as f64),
            },
            Literal::Double(d)   => serde_json::Number::from_f64(*d).map(J::Number).unwrap_or(J::Null),
            Literal::String(s)   => J::String(s.clone()),
            Literal::Boolean(b)  => J::Bool(*b),
            Literal::Array(xs)   => J::Array(xs.iter().map(Literal::to_json).collect()),
            Literal::Object(kvs) => J::Object(
                kvs.iter().map(|p| (p.v1.clone(), p.v2.to_json())).collect(),
            ),
        }
    }
}

pub type Annotations = Vec<Pair<ScopedName, serde_json::Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub annotations: Annotations,
    #[serde(rename = "serializedName")]
    pub serialized_name: String,
    pub default: Maybe<Literal>,
    pub name:    String,
    #[serde(rename = "typeExpr")]
    pub type_expr: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    #[serde(rename = "typeParams")]
    pub type_params: Vec<String>,
    pub fields:      Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    #[serde(rename = "typeParams")]
    pub type_params: Vec<String>,
    pub fields:      Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    #[serde(rename = "typeParams")]
    pub type_params: Vec<String>,
    #[serde(rename = "typeExpr")]
    pub type_expr:   TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewType {
    #[serde(rename = "typeParams")]
    pub type_params: Vec<String>,
    #[serde(rename = "typeExpr")]
    pub type_expr:   TypeExpr,
    pub default:     Maybe<Literal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum DeclType {
    #[serde(rename = "struct_")]
    Struct(Struct),
    #[serde(rename = "union_")]
    Union(Union),
    #[serde(rename = "type_")]
    Type(TypeDef),
    #[serde(rename = "newtype_")]
    Newtype(NewType),
}

impl DeclType {
    pub fn type_params(&self) -> &[String] {
        match self {
            DeclType::Struct(s)  => &s.type_params,
            DeclType::Union(u)   => &u.type_params,
            DeclType::Type(t)    => &t.type_params,
            DeclType::Newtype(n) => &n.type_params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub annotations: Annotations,
    #[serde(rename = "type_")]
    pub type_:       DeclType,
    pub name:        String,
    pub version:     Maybe<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedDecl {
    #[serde(rename = "moduleName")]
    pub module_name: String,
    pub decl:        Decl,
}

impl ScopedDecl {
    pub fn scoped_name(&self) -> ScopedName {
        ScopedName::new(self.module_name.clone(), self.decl.name.clone())
    }

    /// Compact JSON. Identical inputs always produce identical bytes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<ScopedDecl, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_encoding() {
        let nothing: Maybe<Literal> = Maybe::Nothing;
        assert_eq!(serde_json::to_string(&nothing).unwrap(), r#"{"kind":"nothing"}"#);

        let just = Maybe::Just(Literal::String("abc".into()));
        assert_eq!(
            serde_json::to_string(&just).unwrap(),
            r#"{"kind":"just","value":{"kind":"string","value":"abc"}}"#
        );
    }

    #[test]
    fn test_type_expr_encoding() {
        let texpr = TypeExpr::reference(
            ScopedName::new("sys.types", "Pair"),
            vec![
                TypeExpr::primitive("Int32", vec![]),
                TypeExpr::type_param("T"),
            ],
        );
        assert_eq!(
            serde_json::to_string(&texpr).unwrap(),
            concat!(
                r#"{"typeRef":{"kind":"reference","value":{"moduleName":"sys.types","name":"Pair"}},"#,
                r#""parameters":[{"typeRef":{"kind":"primitive","value":"Int32"},"parameters":[]},"#,
                r#"{"typeRef":{"kind":"typeParam","value":"T"},"parameters":[]}]}"#
            )
        );
    }

    #[test]
    fn test_object_literal_encoding() {
        let lit = Literal::Object(vec![Pair::new("just".to_string(), Literal::String("x".into()))]);
        assert_eq!(
            serde_json::to_string(&lit).unwrap(),
            r#"{"kind":"object","value":[{"v1":"just","v2":{"kind":"string","value":"x"}}]}"#
        );
        assert_eq!(serde_json::to_string(&Literal::Null).unwrap(), r#"{"kind":"null"}"#);
    }

    #[test]
    fn test_scoped_decl_round_trip() {
        let decl = ScopedDecl {
            module_name: "test".into(),
            decl: Decl {
                annotations: vec![],
                type_: DeclType::Newtype(NewType {
                    type_params: vec![],
                    type_expr:   TypeExpr::primitive("String", vec![]),
                    default:     Maybe::Just(Literal::String("x".into())),
                }),
                name:    "Factory".into(),
                version: Maybe::Nothing,
            },
        };
        let json = decl.to_json().unwrap();
        assert!(json.starts_with(r#"{"moduleName":"test","decl":{"annotations":[],"type_":{"kind":"newtype_""#));
        assert_eq!(ScopedDecl::from_json(&json).unwrap(), decl);
    }
}
