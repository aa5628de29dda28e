//! Typed default values.
//!
//! A default is written as a JSON-like [`Literal`]. Normalizing it against the
//! type it belongs to yields a [`Value`], which knows which declaration,
//! field and alternative every part of the literal denotes. Struct values are
//! completed with the declared defaults of the fields the literal leaves out.

use adlc_schema::{Literal, Pair};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

use crate::{
    error::{AdlError, Location},
    resolver::{DeclId, Primitive, ResolvedKind, ResolvedModuleSet, TypeExpr, TypeRef},
    stdlib::{self, Uniqueness},
    typegraph::{Bindings, TypeGraph},
};

/// Bound on how deeply declared defaults may pull in further declared defaults.
pub const MAX_DEFAULT_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// `Json` fields hold the literal verbatim.
    Json(Literal),
    Vector(Vec<Value>),
    StringMap(Vec<(String, Value)>),
    Nullable(Option<Box<Value>>),
    Struct {
        decl:   DeclId,
        fields: Vec<Value>,
    },
    Union {
        decl:  DeclId,
        alt:   usize,
        value: Box<Value>,
    },
    Enum {
        decl:  DeclId,
        label: usize,
    },
    Newtype {
        decl:  DeclId,
        value: Box<Value>,
    },
}

impl Value {
    /// Canonical literal for this value: struct fields are all present, in
    /// declaration order, under their serialized names; unit alternatives and
    /// enum labels are bare strings; newtypes are transparent.
    pub fn to_literal(&self, set: &ResolvedModuleSet) -> Literal {
        match self {
            Value::Void        => Literal::Null,
            Value::Bool(b)     => Literal::Boolean(*b),
            Value::Int(i)      => Literal::Integer(i128::from(*i)),
            Value::UInt(u)     => Literal::Integer(i128::from(*u)),
            Value::Float(f)    => Literal::Double(*f),
            Value::String(s)   => Literal::String(s.clone()),
            Value::Bytes(b)    => Literal::String(STANDARD.encode(b)),
            Value::Json(l)     => l.clone(),
            Value::Vector(xs)  => Literal::Array(xs.iter().map(|x| x.to_literal(set)).collect()),
            Value::StringMap(kvs) => Literal::Object(
                kvs.iter().map(|(k, v)| Pair::new(k.clone(), v.to_literal(set))).collect(),
            ),
            Value::Nullable(None)    => Literal::Null,
            Value::Nullable(Some(v)) => v.to_literal(set),
            Value::Struct { decl, fields } => {
                let members = set.decl(*decl).members();
                Literal::Object(
                    members
                        .iter()
                        .zip(fields)
                        .map(|(m, v)| Pair::new(m.serialized_name.clone(), v.to_literal(set)))
                        .collect(),
                )
            }
            Value::Union { decl, alt, value } => {
                let name = set.decl(*decl).members()[*alt].serialized_name.clone();
                match value.as_ref() {
                    Value::Void => Literal::String(name),
                    payload => Literal::Object(vec![Pair::new(name, payload.to_literal(set))]),
                }
            }
            Value::Enum { decl, label } => {
                Literal::String(set.decl(*decl).members()[*label].serialized_name.clone())
            }
            Value::Newtype { value, .. } => value.to_literal(set),
        }
    }
}

/// A normalization failure below the point where it is reported.
#[derive(Debug)]
struct Failure {
    path: Vec<String>,
    msg:  String,
}

impl Failure {
    fn new(msg: impl Into<String>) -> Self {
        Failure { path: Vec::new(), msg: msg.into() }
    }

    fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

fn describe(literal: &Literal) -> &'static str {
    match literal {
        Literal::Null       => "null",
        Literal::Integer(_) => "an integer",
        Literal::Double(_)  => "a number",
        Literal::String(_)  => "a string",
        Literal::Boolean(_) => "a boolean",
        Literal::Array(_)   => "an array",
        Literal::Object(_)  => "an object",
    }
}

fn mismatch(expected: &str, found: &Literal) -> Failure {
    Failure::new(format!("expected {}, found {}", expected, describe(found)))
}

fn int_range(p: Primitive) -> Option<(i128, i128)> {
    match p {
        Primitive::Int8   => Some((i8::MIN.into(), i8::MAX.into())),
        Primitive::Int16  => Some((i16::MIN.into(), i16::MAX.into())),
        Primitive::Int32  => Some((i32::MIN.into(), i32::MAX.into())),
        Primitive::Int64  => Some((i64::MIN.into(), i64::MAX.into())),
        Primitive::Word8  => Some((0, u8::MAX.into())),
        Primitive::Word16 => Some((0, u16::MAX.into())),
        Primitive::Word32 => Some((0, u32::MAX.into())),
        Primitive::Word64 => Some((0, u64::MAX.into())),
        _ => None,
    }
}

/// Normalizes literals against resolved types.
pub struct Normalizer<'g, 'a> {
    graph: &'g TypeGraph<'a>,
}

impl<'g, 'a> Normalizer<'g, 'a> {
    pub fn new(graph: &'g TypeGraph<'a>) -> Self {
        Normalizer { graph }
    }

    fn set(&self) -> &'a ResolvedModuleSet {
        self.graph.set()
    }

    /// Checks `literal` against `texpr` and returns the completed, typed value.
    pub fn normalize(&self, literal: &Literal, texpr: &TypeExpr, location: &Location) -> Result<Value, AdlError> {
        self.value(literal, texpr, location, 0).map_err(|f| AdlError::DefaultTypeError {
            location: location.clone(),
            path:     f.path.join("."),
            msg:      f.msg,
        })
    }

    fn value(&self, literal: &Literal, texpr: &TypeExpr, location: &Location, depth: usize) -> Result<Value, Failure> {
        if depth > MAX_DEFAULT_DEPTH {
            return Err(Failure::new("default values expand without end"));
        }
        let texpr = self
            .graph
            .expand(texpr, location)
            .map_err(|e| Failure::new(e.to_string()))?;

        match &texpr.head {
            TypeRef::TypeParam(name) => Err(Failure::new(format!(
                "type parameter \"{}\" cannot have a default value",
                name
            ))),
            TypeRef::Primitive(p) => self.primitive(*p, &texpr.args, literal, location, depth),
            TypeRef::Decl(id) => {
                let decl = self.set().decl(*id);
                match &decl.kind {
                    ResolvedKind::Struct(_)  => self.struct_value(*id, &texpr.args, literal, location, depth),
                    ResolvedKind::Union(_)   => self.union_value(*id, &texpr.args, literal, location, depth),
                    ResolvedKind::Enum(_)    => self.enum_value(*id, literal),
                    ResolvedKind::Newtype { .. } => self.newtype_value(*id, &texpr.args, literal, location, depth),
                    ResolvedKind::Alias(_)   => Err(Failure::new(format!(
                        "type alias \"{}\" could not be expanded",
                        decl.scoped_name()
                    ))),
                }
            }
        }
    }

    fn primitive(
        &self,
        p: Primitive,
        args: &[TypeExpr],
        literal: &Literal,
        location: &Location,
        depth: usize,
    ) -> Result<Value, Failure> {
        if let Some((min, max)) = int_range(p) {
            return match literal {
                Literal::Integer(i) if (min..=max).contains(i) => {
                    if min < 0 {
                        Ok(Value::Int(*i as i64))
                    } else {
                        Ok(Value::UInt(*i as u64))
                    }
                }
                Literal::Integer(i) => Err(Failure::new(format!(
                    "{} is out of range for {}",
                    i,
                    p.name()
                ))),
                other => Err(mismatch("an integer", other)),
            };
        }

        match (p, literal) {
            (Primitive::Void | Primitive::TypeToken, Literal::Null) => Ok(Value::Void),
            (Primitive::Void | Primitive::TypeToken, other) => Err(mismatch("null", other)),
            (Primitive::Bool, Literal::Boolean(b)) => Ok(Value::Bool(*b)),
            (Primitive::Bool, other) => Err(mismatch("a boolean", other)),
            (Primitive::Float, Literal::Double(d)) if d.is_finite() && (*d as f32).is_infinite() => {
                Err(Failure::new(format!("{} is out of range for Float", d)))
            }
            (Primitive::Float | Primitive::Double, Literal::Double(d)) => Ok(Value::Float(*d)),
            (Primitive::Float | Primitive::Double, Literal::Integer(i)) => Ok(Value::Float(*i as f64)),
            (Primitive::Float | Primitive::Double, other) => Err(mismatch("a number", other)),
            (Primitive::String, Literal::String(s)) => Ok(Value::String(s.clone())),
            (Primitive::String, other) => Err(mismatch("a string", other)),
            (Primitive::ByteVector, Literal::String(s)) => STANDARD
                .decode(s)
                .map(Value::Bytes)
                .map_err(|e| Failure::new(format!("invalid base64 string: {}", e))),
            (Primitive::ByteVector, other) => Err(mismatch("a base64 string", other)),
            (Primitive::Json, any) => Ok(Value::Json(any.clone())),
            (Primitive::Vector, Literal::Array(items)) => {
                let elem = args.first().ok_or_else(|| Failure::new("Vector requires a type argument"))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.value(item, elem, location, depth)
                            .map_err(|f| f.within(i.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Vector)
            }
            (Primitive::Vector, other) => Err(mismatch("an array", other)),
            (Primitive::StringMap, Literal::Object(entries)) => {
                let elem = args.first().ok_or_else(|| Failure::new("StringMap requires a type argument"))?;
                let mut seen = HashSet::new();
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    if !seen.insert(entry.v1.as_str()) {
                        return Err(Failure::new(format!("duplicate key \"{}\"", entry.v1)));
                    }
                    let v = self
                        .value(&entry.v2, elem, location, depth)
                        .map_err(|f| f.within(entry.v1.clone()))?;
                    out.push((entry.v1.clone(), v));
                }
                Ok(Value::StringMap(out))
            }
            (Primitive::StringMap, other) => Err(mismatch("an object", other)),
            (Primitive::Nullable, Literal::Null) => Ok(Value::Nullable(None)),
            (Primitive::Nullable, other) => {
                let elem = args.first().ok_or_else(|| Failure::new("Nullable requires a type argument"))?;
                Ok(Value::Nullable(Some(Box::new(self.value(other, elem, location, depth)?))))
            }
            (p, _) => Err(Failure::new(format!("{} cannot have a default value", p.name()))),
        }
    }

    fn struct_value(
        &self,
        id: DeclId,
        args: &[TypeExpr],
        literal: &Literal,
        location: &Location,
        depth: usize,
    ) -> Result<Value, Failure> {
        let Literal::Object(entries) = literal else {
            return Err(mismatch("an object", literal));
        };
        let decl = self.set().decl(id);
        let fields = decl.members();
        let members = self
            .graph
            .members(id, args, location)
            .map_err(|e| Failure::new(e.to_string()))?;
        let types = members.fields();

        let mut supplied: Vec<Option<&Literal>> = vec![None; fields.len()];
        for entry in entries {
            let Some(index) = fields.iter().position(|f| f.serialized_name == entry.v1) else {
                return Err(Failure::new(format!(
                    "unknown field \"{}\" for struct \"{}\"",
                    entry.v1,
                    decl.scoped_name()
                )));
            };
            if supplied[index].is_some() {
                return Err(Failure::new(format!("duplicate field \"{}\"", entry.v1)));
            }
            supplied[index] = Some(&entry.v2);
        }

        let mut values = Vec::with_capacity(fields.len());
        for ((field, texpr), given) in fields.iter().zip(types).zip(supplied) {
            let value = match (given, &field.default) {
                (Some(lit), _) => self.value(lit, texpr, location, depth),
                (None, Some(declared)) => self.value(declared, texpr, location, depth + 1),
                (None, None) => {
                    return Err(Failure::new(format!(
                        "missing required field \"{}\"",
                        field.serialized_name
                    )))
                }
            };
            values.push(value.map_err(|f| f.within(field.serialized_name.clone()))?);
        }
        Ok(Value::Struct { decl: id, fields: values })
    }

    fn union_value(
        &self,
        id: DeclId,
        args: &[TypeExpr],
        literal: &Literal,
        location: &Location,
        depth: usize,
    ) -> Result<Value, Failure> {
        let decl = self.set().decl(id);
        let (name, payload) = match literal {
            Literal::String(s) => (s.as_str(), None),
            Literal::Object(entries) if entries.len() == 1 => (entries[0].v1.as_str(), Some(&entries[0].v2)),
            Literal::Object(_) => {
                return Err(Failure::new("a union value must have exactly one key"));
            }
            other => return Err(mismatch("a string or single-key object", other)),
        };
        let Some(alt) = decl.members().iter().position(|f| f.serialized_name == name) else {
            return Err(Failure::new(format!(
                "unknown alternative \"{}\" for union \"{}\"",
                name,
                decl.scoped_name()
            )));
        };
        let members = self
            .graph
            .members(id, args, location)
            .map_err(|e| Failure::new(e.to_string()))?;
        let texpr = &members.fields()[alt];
        let value = match payload {
            Some(lit) => self.value(lit, texpr, location, depth),
            None => self.value(&Literal::Null, texpr, location, depth).map_err(|_| {
                Failure::new(format!("alternative \"{}\" requires a value", name))
            }),
        }
        .map_err(|f| f.within(name.to_string()))?;
        Ok(Value::Union { decl: id, alt, value: Box::new(value) })
    }

    fn enum_value(&self, id: DeclId, literal: &Literal) -> Result<Value, Failure> {
        let decl = self.set().decl(id);
        let name = match literal {
            Literal::String(s) => s.as_str(),
            Literal::Object(entries) if entries.len() == 1 && entries[0].v2 == Literal::Null => {
                entries[0].v1.as_str()
            }
            other => return Err(mismatch("an enum label", other)),
        };
        decl.members()
            .iter()
            .position(|f| f.serialized_name == name)
            .map(|label| Value::Enum { decl: id, label })
            .ok_or_else(|| {
                Failure::new(format!("unknown label \"{}\" for enum \"{}\"", name, decl.scoped_name()))
            })
    }

    fn newtype_value(
        &self,
        id: DeclId,
        args: &[TypeExpr],
        literal: &Literal,
        location: &Location,
        depth: usize,
    ) -> Result<Value, Failure> {
        let decl = self.set().decl(id);
        let members = self
            .graph
            .members(id, args, location)
            .map_err(|e| Failure::new(e.to_string()))?;
        let target = members
            .target()
            .ok_or_else(|| Failure::new("newtype without a target"))?;
        let inner = self.value(literal, target, location, depth)?;

        if let (Some(rule), Value::Vector(items)) = (stdlib::uniqueness(&decl.module, &decl.name), &inner) {
            let mut seen: Vec<Literal> = Vec::with_capacity(items.len());
            for item in items {
                let key = match (rule, item) {
                    (Uniqueness::Keys, Value::Struct { fields, .. }) if !fields.is_empty() => {
                        fields[0].to_literal(self.set())
                    }
                    _ => item.to_literal(self.set()),
                };
                if seen.contains(&key) {
                    let what = match rule {
                        Uniqueness::Keys => "key",
                        Uniqueness::Elements => "element",
                    };
                    return Err(Failure::new(format!(
                        "duplicate {} {} in {}",
                        what,
                        key.to_json(),
                        decl.scoped_name()
                    )));
                }
                seen.push(key);
            }
        }
        Ok(Value::Newtype { decl: id, value: Box::new(inner) })
    }
}

/// Declared defaults of one declaration, normalized against the declared
/// (uninstantiated) member types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclDefaults {
    /// One entry per field; `None` when the field is required.
    pub fields:  Vec<Option<Value>>,
    pub newtype: Option<Value>,
}

/// Normalizes every declared default of declaration `id`.
pub fn check_defaults(graph: &TypeGraph, id: DeclId) -> Result<DeclDefaults, AdlError> {
    let set = graph.set();
    let decl = set.decl(id);
    let normalizer = Normalizer::new(graph);
    let bindings: Bindings = decl
        .type_params
        .iter()
        .map(|p| (p.clone(), TypeExpr::param(p)))
        .collect();

    let mut defaults = DeclDefaults::default();
    match &decl.kind {
        ResolvedKind::Struct(fields) => {
            for field in fields {
                let location = decl.location().with_member(&field.name);
                let value = match &field.default {
                    Some(lit) => {
                        let texpr = graph.instantiate(&field.type_expr, &bindings, &location)?;
                        Some(normalizer.normalize(lit, &texpr, &location)?)
                    }
                    None => None,
                };
                defaults.fields.push(value);
            }
        }
        ResolvedKind::Union(fields) | ResolvedKind::Enum(fields) => {
            defaults.fields = vec![None; fields.len()];
        }
        ResolvedKind::Newtype { target, default: Some(lit) } => {
            let location = decl.location();
            let texpr = graph.instantiate(target, &bindings, &location)?;
            let inner = normalizer.normalize(lit, &texpr, &location)?;
            defaults.newtype = Some(Value::Newtype { decl: id, value: Box::new(inner) });
        }
        ResolvedKind::Newtype { default: None, .. } | ResolvedKind::Alias(_) => {}
    }
    Ok(defaults)
}

/// Normalizes the declared defaults of every declaration in parallel. The
/// result is indexed by [`DeclId`]. Reports the first error of each failing
/// module.
pub fn check_all_defaults(graph: &TypeGraph) -> Result<Vec<DeclDefaults>, Vec<AdlError>> {
    let set = graph.set();
    let results: Vec<Result<DeclDefaults, AdlError>> = set
        .decls()
        .par_iter()
        .map(|decl| check_defaults(graph, decl.id))
        .collect();

    let mut failed_modules = HashSet::new();
    let mut errors = Vec::new();
    let mut defaults = Vec::with_capacity(results.len());
    for (decl, result) in set.decls().iter().zip(results) {
        match result {
            Ok(d) => defaults.push(d),
            Err(e) => {
                if failed_modules.insert(decl.module.clone()) {
                    errors.push(e);
                }
                defaults.push(DeclDefaults::default());
            }
        }
    }
    debug!(decls = defaults.len(), errors = errors.len(), "normalized defaults");
    if errors.is_empty() {
        Ok(defaults)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolver::tests::resolve_sources, stdlib::SYS_TYPES_ADL};
    use adlc_schema::ScopedName;

    const SHAPES: &str = r#"
        module shapes {
        struct Point { Double x; Double y; };
        struct Circle { Point center; Double radius; };
        struct Rectangle { Point topLeft; Double width; Double height; };
        union Shape { Circle circle; Rectangle rectangle; Void nothing; };
        enum Colour { red; green; blue; };
        };
    "#;

    fn lit(json: &str) -> Literal {
        fn conv(v: &serde_json::Value) -> Literal {
            match v {
                serde_json::Value::Null => Literal::Null,
                serde_json::Value::Bool(b) => Literal::Boolean(*b),
                serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                    (Some(i), _) => Literal::Integer(i.into()),
                    (_, Some(u)) => Literal::Integer(u.into()),
                    _ => Literal::Double(n.as_f64().unwrap()),
                },
                serde_json::Value::String(s) => Literal::String(s.clone()),
                serde_json::Value::Array(xs) => Literal::Array(xs.iter().map(conv).collect()),
                serde_json::Value::Object(m) => Literal::Object(
                    m.iter().map(|(k, v)| Pair::new(k.clone(), conv(v))).collect(),
                ),
            }
        }
        conv(&serde_json::from_str(json).unwrap())
    }

    fn ty(set: &ResolvedModuleSet, module: &str, name: &str) -> TypeExpr {
        TypeExpr::decl(set.lookup(&ScopedName::new(module, name)).unwrap(), vec![])
    }

    fn prim(p: Primitive) -> TypeExpr {
        TypeExpr::primitive(p, vec![])
    }

    #[test]
    fn test_primitive_ranges() {
        let set = resolve_sources(&["module m { struct S {}; };"]).unwrap();
        let graph = TypeGraph::new(&set);
        let n = Normalizer::new(&graph);
        let loc = Location::module("m");

        assert_eq!(n.normalize(&lit("127"), &prim(Primitive::Int8), &loc).unwrap(), Value::Int(127));
        assert!(n.normalize(&lit("128"), &prim(Primitive::Int8), &loc).is_err());
        assert!(n.normalize(&lit("-1"), &prim(Primitive::Word32), &loc).is_err());
        assert_eq!(n.normalize(&lit("0"), &prim(Primitive::Word64), &loc).unwrap(), Value::UInt(0));
        assert_eq!(
            n.normalize(&lit("18446744073709551615"), &prim(Primitive::Word64), &loc).unwrap(),
            Value::UInt(u64::MAX)
        );
        assert_eq!(
            n.normalize(&Literal::Integer(u64::MAX as i128 + 1), &prim(Primitive::Word64), &loc)
                .unwrap_err()
                .to_string(),
            "m: invalid default value: 18446744073709551616 is out of range for Word64"
        );
        assert!(n.normalize(&lit("9223372036854775808"), &prim(Primitive::Int64), &loc).is_err());
        // Float defaults must fit in 32 bits.
        let err = n.normalize(&lit("3.5e38"), &prim(Primitive::Float), &loc).unwrap_err();
        assert!(err.to_string().ends_with("is out of range for Float"), "{}", err);
        assert_eq!(n.normalize(&lit("1e30"), &prim(Primitive::Float), &loc).unwrap(), Value::Float(1e30));
        assert_eq!(n.normalize(&lit("1e39"), &prim(Primitive::Double), &loc).unwrap(), Value::Float(1e39));
        assert_eq!(n.normalize(&lit("65535"), &prim(Primitive::Word16), &loc).unwrap(), Value::UInt(65535));
        // No truncation of doubles into integers.
        assert!(n.normalize(&lit("1.5"), &prim(Primitive::Int32), &loc).is_err());
        // Integers widen into floating point.
        assert_eq!(n.normalize(&lit("0"), &prim(Primitive::Double), &loc).unwrap(), Value::Float(0.0));
        assert_eq!(
            n.normalize(&lit("\"aGVsbG8=\""), &prim(Primitive::ByteVector), &loc).unwrap(),
            Value::Bytes(b"hello".to_vec())
        );
        assert!(n.normalize(&lit("\"not base64!\""), &prim(Primitive::ByteVector), &loc).is_err());
        assert_eq!(
            n.normalize(&lit("{\"a\": [1]}"), &prim(Primitive::Json), &loc).unwrap(),
            Value::Json(lit("{\"a\": [1]}"))
        );
        let nullable = TypeExpr::primitive(Primitive::Nullable, vec![prim(Primitive::String)]);
        assert_eq!(n.normalize(&Literal::Null, &nullable, &loc).unwrap(), Value::Nullable(None));
    }

    #[test]
    fn test_struct_defaults_and_paths() {
        let set = resolve_sources(&[SHAPES]).unwrap();
        let graph = TypeGraph::new(&set);
        let n = Normalizer::new(&graph);
        let loc = Location::module("shapes");
        let circle = ty(&set, "shapes", "Circle");

        let value = n
            .normalize(&lit(r#"{"center": {"x": 1, "y": 2.5}, "radius": 3}"#), &circle, &loc)
            .unwrap();
        assert_eq!(
            value.to_literal(&set),
            lit(r#"{"center": {"x": 1.0, "y": 2.5}, "radius": 3.0}"#)
        );

        match n.normalize(&lit(r#"{"center": {"x": "one", "y": 2}, "radius": 3}"#), &circle, &loc) {
            Err(AdlError::DefaultTypeError { path, msg, .. }) => {
                assert_eq!(path, "center.x");
                assert!(msg.contains("expected a number"), "{}", msg);
            }
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }

        match n.normalize(&lit(r#"{"center": {"x": 1, "y": 2}}"#), &circle, &loc) {
            Err(AdlError::DefaultTypeError { msg, .. }) => assert!(msg.contains("missing required field \"radius\"")),
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }
        assert!(n.normalize(&lit(r#"{"radius": 1, "center": {"x": 1, "y": 2}, "colour": 1}"#), &circle, &loc).is_err());
    }

    #[test]
    fn test_union_discriminants() {
        let set = resolve_sources(&[SHAPES]).unwrap();
        let graph = TypeGraph::new(&set);
        let n = Normalizer::new(&graph);
        let loc = Location::module("shapes");
        let shape = ty(&set, "shapes", "Shape");

        let rect = r#"{"rectangle": {"topLeft": {"x": 0, "y": 0}, "width": 2, "height": 1}}"#;
        assert!(matches!(
            n.normalize(&lit(rect), &shape, &loc).unwrap(),
            Value::Union { alt: 1, .. }
        ));

        match n.normalize(&lit(r#"{"triangle": {}}"#), &shape, &loc) {
            Err(AdlError::DefaultTypeError { msg, .. }) => assert!(msg.contains("\"triangle\""), "{}", msg),
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }

        let unit = n.normalize(&lit("\"nothing\""), &shape, &loc).unwrap();
        assert_eq!(unit.to_literal(&set), Literal::String("nothing".into()));
        assert!(n.normalize(&lit("\"circle\""), &shape, &loc).is_err());
        assert!(n.normalize(&lit(r#"{"circle": {}, "nothing": null}"#), &shape, &loc).is_err());

        let colour = ty(&set, "shapes", "Colour");
        assert_eq!(
            n.normalize(&lit("\"green\""), &colour, &loc).unwrap(),
            Value::Enum { decl: set.lookup(&ScopedName::new("shapes", "Colour")).unwrap(), label: 1 }
        );
        assert!(n.normalize(&lit("\"purple\""), &colour, &loc).is_err());
    }

    #[test]
    fn test_maybe_string_default() {
        let set = resolve_sources(&[
            SYS_TYPES_ADL,
            r#"module test { import sys.types.*;
               struct S { Maybe<String> f_mstring2 = {"just": "sukpeepolup"}; Maybe<String> f_mstring = "nothing"; };
            };"#,
        ])
        .unwrap();
        let graph = TypeGraph::new(&set);
        let id = set.lookup(&ScopedName::new("test", "S")).unwrap();
        let defaults = check_defaults(&graph, id).unwrap();
        assert_eq!(
            defaults.fields[0].as_ref().unwrap().to_literal(&set),
            lit(r#"{"just": "sukpeepolup"}"#)
        );
        assert_eq!(
            defaults.fields[1].as_ref().unwrap().to_literal(&set),
            Literal::String("nothing".into())
        );
    }

    #[test]
    fn test_generic_defaults() {
        let set = resolve_sources(&[
            SHAPES,
            r#"module picture { import shapes.*;
               struct Translated<T> { Int32 layer = 1; T object; Double xoffset = 0; Double yoffset = 10.5; };
               struct Bad<T> { T value = 3; };
            };"#,
        ])
        .unwrap();
        let graph = TypeGraph::new(&set);
        let translated = set.lookup(&ScopedName::new("picture", "Translated")).unwrap();
        let defaults = check_defaults(&graph, translated).unwrap();
        assert_eq!(defaults.fields[0], Some(Value::Int(1)));
        assert_eq!(defaults.fields[1], None);
        assert_eq!(defaults.fields[2], Some(Value::Float(0.0)));

        let bad = set.lookup(&ScopedName::new("picture", "Bad")).unwrap();
        assert!(matches!(check_defaults(&graph, bad), Err(AdlError::DefaultTypeError { .. })));

        // Instantiated, the caller-supplied object completes the declared defaults.
        let texpr = TypeExpr::decl(translated, vec![ty(&set, "shapes", "Colour")]);
        let value = Normalizer::new(&graph)
            .normalize(&lit(r#"{"object": "red"}"#), &texpr, &Location::module("picture"))
            .unwrap();
        assert_eq!(
            value.to_literal(&set),
            lit(r#"{"layer": 1, "object": "red", "xoffset": 0.0, "yoffset": 10.5}"#)
        );
    }

    #[test]
    fn test_map_and_set_uniqueness() {
        let set = resolve_sources(&[
            SYS_TYPES_ADL,
            r#"module m { import sys.types.*;
               struct S {
                 Map<String, Int32> counts = [{"v1": "a", "v2": 1}, {"v1": "b", "v2": 1}];
                 Set<Int32> ids = [1, 2, 3];
               };
               struct DupKey { Map<String, Int32> counts = [{"v1": "a", "v2": 1}, {"v1": "a", "v2": 2}]; };
               struct DupElem { Set<Int32> ids = [1, 1]; };
            };"#,
        ])
        .unwrap();
        let graph = TypeGraph::new(&set);
        let id = |name: &str| set.lookup(&ScopedName::new("m", name)).unwrap();

        assert!(check_defaults(&graph, id("S")).is_ok());
        match check_defaults(&graph, id("DupKey")) {
            Err(AdlError::DefaultTypeError { msg, .. }) => assert!(msg.contains("duplicate key"), "{}", msg),
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }
        match check_defaults(&graph, id("DupElem")) {
            Err(AdlError::DefaultTypeError { msg, .. }) => assert!(msg.contains("duplicate element"), "{}", msg),
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }
    }

    #[test]
    fn test_self_referential_defaults_are_bounded() {
        let set = resolve_sources(&["module m { struct Loop { Nullable<Loop> next = {}; }; };"]).unwrap();
        let graph = TypeGraph::new(&set);
        let id = set.lookup(&ScopedName::new("m", "Loop")).unwrap();
        match check_defaults(&graph, id) {
            Err(AdlError::DefaultTypeError { msg, .. }) => assert!(msg.contains("without end"), "{}", msg),
            other => panic!("expected DefaultTypeError, got {:?}", other),
        }
    }

    #[test]
    fn test_default_round_trip() {
        let set = resolve_sources(&[
            SYS_TYPES_ADL,
            SHAPES,
            r#"module m { import sys.types.*; import shapes.*;
               newtype Names = Vector<String> = ["a", "b"];
               struct Everything {
                 Maybe<Shape> shape = {"just": {"circle": {"center": {"x": 1, "y": 2}, "radius": 3}}};
                 StringMap<Colour> colours = {"sky": "blue"};
                 ByteVector bytes = "AAEC";
                 Names names = ["c"];
                 Nullable<Int64> n = null;
                 Json j = {"k": [1, 2.5]};
               };
            };"#,
        ])
        .unwrap();
        let graph = TypeGraph::new(&set);
        let normalizer = Normalizer::new(&graph);
        let defaults = check_all_defaults(&graph).unwrap();
        let everything = set.lookup(&ScopedName::new("m", "Everything")).unwrap();
        let decl = set.decl(everything);

        for (field, value) in decl.members().iter().zip(&defaults[everything.index()].fields) {
            let value = value.as_ref().unwrap();
            let again = normalizer
                .normalize(&value.to_literal(&set), &field.type_expr, &Location::module("m"))
                .unwrap();
            assert_eq!(&again, value, "field {}", field.name);
        }
    }
}
