//! Rust target: serde-derived types, constructors that apply defaults,
//! type reference accessors, and optionally the embedded AST.

use crate::{
    defaults::Value,
    emit::{doc_text, module_path, EmitContext, EmitOptions, SourceUnit},
    error::AdlError,
    resolver::{
        DeclId, Primitive, ResolvedDecl, ResolvedField, ResolvedKind, ResolvedModuleSet, TypeExpr, TypeRef,
    },
    traits::Emitter,
    utils::{to_pascal_case, to_snake_case},
};

pub struct RustEmitter;

pub static RUST_EMITTER: RustEmitter = RustEmitter;

const DEFAULT_RUNTIME: &str = "adl_runtime";
const DEFAULT_MODULE_ROOT: &str = "crate";

const RUST_KEYWORDS: [&str; 51] = [
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/// Escapes Rust keywords as raw identifiers. The few keywords that cannot be
/// raw identifiers get a trailing underscore instead.
fn escape_rust_keyword(s: &str) -> String {
    match s {
        "self" | "Self" | "super" | "crate" => format!("{}_", s),
        _ if RUST_KEYWORDS.contains(&s) => format!("r#{}", s),
        _ => s.to_string(),
    }
}

/// A raw string literal that cannot be terminated early by `text`.
fn raw_string(text: &str) -> String {
    let mut longest = 0;
    let mut run: Option<usize> = None;
    for c in text.chars() {
        run = match (c, run) {
            ('"', _) => Some(0),
            ('#', Some(n)) => Some(n + 1),
            _ => None,
        };
        if let Some(n) = run {
            longest = longest.max(n);
        }
    }
    let hashes = "#".repeat(longest + 1);
    format!("r{}\"{}\"{}", hashes, text, hashes)
}

fn field_ident(field: &ResolvedField) -> String {
    escape_rust_keyword(&to_snake_case(&field.name))
}

fn generics(decl: &ResolvedDecl) -> String {
    if decl.type_params.is_empty() {
        String::new()
    } else {
        format!("<{}>", decl.type_params.join(", "))
    }
}

fn doc_lines(out: &mut Vec<String>, indent: &str, doc: Option<&str>) {
    if let Some(doc) = doc {
        for line in doc.trim_end_matches('\n').split('\n') {
            if line.is_empty() {
                out.push(format!("{}///", indent));
            } else {
                out.push(format!("{}/// {}", indent, line));
            }
        }
    }
}

/// Declarations that a value of `texpr` holds inline: the head and its
/// arguments, except below `Vec`, `HashMap` and `PhantomData`, which add
/// indirection.
fn by_value_decls(texpr: &TypeExpr, out: &mut Vec<DeclId>) {
    match &texpr.head {
        TypeRef::Primitive(Primitive::Vector | Primitive::StringMap | Primitive::TypeToken) => {}
        head => {
            if let TypeRef::Decl(id) = head {
                out.push(*id);
            }
            for arg in &texpr.args {
                by_value_decls(arg, out);
            }
        }
    }
}

/// Inline containment between declarations. A member whose type leads back
/// to its own declaration is part of a cycle and must be boxed.
struct ValueGraph {
    edges: Vec<Vec<DeclId>>,
}

impl ValueGraph {
    fn new(set: &ResolvedModuleSet) -> Self {
        let edges = set
            .decls()
            .iter()
            .map(|decl| {
                let mut out = Vec::new();
                match &decl.kind {
                    ResolvedKind::Alias(target) | ResolvedKind::Newtype { target, .. } => {
                        by_value_decls(target, &mut out)
                    }
                    _ => {
                        for member in decl.members() {
                            by_value_decls(&member.type_expr, &mut out);
                        }
                    }
                }
                out
            })
            .collect();
        ValueGraph { edges }
    }

    fn reaches(&self, from: DeclId, to: DeclId) -> bool {
        let mut seen = vec![false; self.edges.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            stack.extend(self.edges[id.index()].iter().copied());
        }
        false
    }

    fn needs_box(&self, texpr: &TypeExpr, owner: DeclId) -> bool {
        let mut held = Vec::new();
        by_value_decls(texpr, &mut held);
        held.into_iter().any(|id| self.reaches(id, owner))
    }
}

fn mentions_param(texpr: &TypeExpr, param: &str) -> bool {
    match &texpr.head {
        TypeRef::TypeParam(name) if name == param => true,
        _ => texpr.args.iter().any(|a| mentions_param(a, param)),
    }
}

/// `PhantomData` type covering the type parameters that no member uses, if any.
fn phantom_type(decl: &ResolvedDecl) -> Option<String> {
    let used: Vec<&TypeExpr> = match &decl.kind {
        ResolvedKind::Alias(target) | ResolvedKind::Newtype { target, .. } => vec![target],
        _ => decl.members().iter().map(|m| &m.type_expr).collect(),
    };
    let unused: Vec<&str> = decl
        .type_params
        .iter()
        .filter(|p| !used.iter().any(|t| mentions_param(t, p)))
        .map(String::as_str)
        .collect();
    if unused.is_empty() {
        None
    } else {
        Some(format!("std::marker::PhantomData<({},)>", unused.join(", ")))
    }
}

struct ModuleWriter<'c, 'a> {
    ctx:     &'c EmitContext<'a>,
    module:  &'a str,
    runtime: String,
    root:    String,
    graph:   ValueGraph,
}

impl<'c, 'a> ModuleWriter<'c, 'a> {
    fn type_name(&self, id: DeclId) -> String {
        let decl = self.ctx.decl(id);
        let name = to_pascal_case(&decl.name);
        if decl.module == self.module {
            name
        } else {
            let path: Vec<String> = decl.module.split('.').map(escape_rust_keyword).collect();
            format!("{}::{}::{}", self.root, path.join("::"), name)
        }
    }

    fn rust_type(&self, texpr: &TypeExpr) -> String {
        let args: Vec<String> = texpr.args.iter().map(|a| self.rust_type(a)).collect();
        let arg = |i: usize| args.get(i).cloned().unwrap_or_else(|| "()".to_string());
        match &texpr.head {
            TypeRef::Primitive(p) => match p {
                Primitive::Void       => "()".to_string(),
                Primitive::Bool       => "bool".to_string(),
                Primitive::Int8       => "i8".to_string(),
                Primitive::Int16      => "i16".to_string(),
                Primitive::Int32      => "i32".to_string(),
                Primitive::Int64      => "i64".to_string(),
                Primitive::Word8      => "u8".to_string(),
                Primitive::Word16     => "u16".to_string(),
                Primitive::Word32     => "u32".to_string(),
                Primitive::Word64     => "u64".to_string(),
                Primitive::Float      => "f32".to_string(),
                Primitive::Double     => "f64".to_string(),
                Primitive::Json       => "serde_json::Value".to_string(),
                Primitive::ByteVector => format!("{}::ByteVector", self.runtime),
                Primitive::String     => "String".to_string(),
                Primitive::Vector     => format!("Vec<{}>", arg(0)),
                Primitive::StringMap  => format!("std::collections::HashMap<String, {}>", arg(0)),
                Primitive::Nullable   => format!("Option<{}>", arg(0)),
                Primitive::TypeToken  => format!("std::marker::PhantomData<{}>", arg(0)),
            },
            TypeRef::TypeParam(name) => name.clone(),
            TypeRef::Decl(id) => {
                if args.is_empty() {
                    self.type_name(*id)
                } else {
                    format!("{}<{}>", self.type_name(*id), args.join(", "))
                }
            }
        }
    }

    fn field_type(&self, owner: DeclId, field: &ResolvedField) -> String {
        let ty = self.rust_type(&field.type_expr);
        if self.graph.needs_box(&field.type_expr, owner) {
            format!("Box<{}>", ty)
        } else {
            ty
        }
    }

    fn boxed_expr(&self, owner: DeclId, field: &ResolvedField, value: &Value) -> String {
        let expr = self.value_expr(value);
        if self.graph.needs_box(&field.type_expr, owner) {
            format!("Box::new({})", expr)
        } else {
            expr
        }
    }

    /// Rust expression constructing `value`.
    fn value_expr(&self, value: &Value) -> String {
        match value {
            Value::Void       => "()".to_string(),
            Value::Bool(b)    => b.to_string(),
            Value::Int(i)     => i.to_string(),
            Value::UInt(u)    => u.to_string(),
            Value::Float(f)   => format!("{:?}", f),
            Value::String(s)  => format!("{:?}.to_string()", s),
            Value::Bytes(bytes) => format!(
                "{}::ByteVector(vec![{}])",
                self.runtime,
                bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(", ")
            ),
            Value::Json(lit) => format!(
                "serde_json::from_str({:?}).unwrap_or(serde_json::Value::Null)",
                lit.to_json().to_string()
            ),
            Value::Vector(items) => format!(
                "vec![{}]",
                items.iter().map(|v| self.value_expr(v)).collect::<Vec<_>>().join(", ")
            ),
            Value::StringMap(entries) if entries.is_empty() => "std::collections::HashMap::new()".to_string(),
            Value::StringMap(entries) => format!(
                "[{}].into_iter().collect()",
                entries
                    .iter()
                    .map(|(k, v)| format!("({:?}.to_string(), {})", k, self.value_expr(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Nullable(None)    => "None".to_string(),
            Value::Nullable(Some(v)) => format!("Some({})", self.value_expr(v)),
            Value::Struct { decl, fields } => {
                let target = self.ctx.decl(*decl);
                let mut inits: Vec<String> = target
                    .members()
                    .iter()
                    .zip(fields)
                    .map(|(m, v)| format!("{}: {}", field_ident(m), self.boxed_expr(*decl, m, v)))
                    .collect();
                if phantom_type(target).is_some() {
                    inits.push("_phantom: std::marker::PhantomData".to_string());
                }
                format!("{} {{ {} }}", self.type_name(*decl), inits.join(", "))
            }
            Value::Union { decl, alt, value } => {
                let member = &self.ctx.decl(*decl).members()[*alt];
                let variant = format!("{}::{}", self.type_name(*decl), to_pascal_case(&member.name));
                match value.as_ref() {
                    Value::Void => variant,
                    payload => format!("{}({})", variant, self.boxed_expr(*decl, member, payload)),
                }
            }
            Value::Enum { decl, label } => {
                let member = &self.ctx.decl(*decl).members()[*label];
                format!("{}::{}", self.type_name(*decl), to_pascal_case(&member.name))
            }
            Value::Newtype { decl, value } => {
                let phantom = if phantom_type(self.ctx.decl(*decl)).is_some() {
                    ", std::marker::PhantomData"
                } else {
                    ""
                };
                format!("{}({}{})", self.type_name(*decl), self.value_expr(value), phantom)
            }
        }
    }

    fn emit_struct(&self, out: &mut Vec<String>, decl: &ResolvedDecl, fields: &[ResolvedField]) {
        let name = to_pascal_case(&decl.name);
        let generics = generics(decl);
        let self_path = if generics.is_empty() { name.clone() } else { format!("{}::{}", name, generics) };
        let defaults = self.ctx.defaults(decl.id);
        let default_of = |i: usize| defaults.and_then(|d| d.fields.get(i)).and_then(|v| v.as_ref());

        doc_lines(out, "", doc_text(&decl.annotations));
        out.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]".to_string());
        out.push(format!("pub struct {}{} {{", name, generics));
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push("".to_string());
            }
            doc_lines(out, "    ", doc_text(&field.annotations));
            let ident = field_ident(field);
            if ident.trim_start_matches("r#") != field.serialized_name {
                out.push(format!("    #[serde(rename = {:?})]", field.serialized_name));
            }
            if default_of(i).is_some() {
                out.push(format!(
                    "    #[serde(default = \"{}::def_{}\")]",
                    self_path,
                    to_snake_case(&field.name)
                ));
            }
            out.push(format!("    pub {}: {},", ident, self.field_type(decl.id, field)));
        }
        let phantom = phantom_type(decl);
        if let Some(phantom) = &phantom {
            if !fields.is_empty() {
                out.push("".to_string());
            }
            out.push("    #[serde(skip)]".to_string());
            out.push(format!("    pub _phantom: {},", phantom));
        }
        out.push("}".to_string());
        out.push("".to_string());

        let required: Vec<String> = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| default_of(*i).is_none())
            .map(|(_, f)| format!("{}: {}", field_ident(f), self.field_type(decl.id, f)))
            .collect();

        out.push(format!("impl{} {}{} {{", generics, name, generics));
        out.push(format!("    pub fn new({}) -> Self {{", required.join(", ")));
        out.push(format!("        {} {{", name));
        for (i, field) in fields.iter().enumerate() {
            let ident = field_ident(field);
            if default_of(i).is_some() {
                out.push(format!("            {}: {}::def_{}(),", ident, self_path, to_snake_case(&field.name)));
            } else {
                out.push(format!("            {},", ident));
            }
        }
        if phantom.is_some() {
            out.push("            _phantom: std::marker::PhantomData,".to_string());
        }
        out.push("        }".to_string());
        out.push("    }".to_string());

        for (i, field) in fields.iter().enumerate() {
            if let Some(value) = default_of(i) {
                out.push("".to_string());
                out.push(format!(
                    "    pub fn def_{}() -> {} {{",
                    to_snake_case(&field.name),
                    self.field_type(decl.id, field)
                ));
                out.push(format!("        {}", self.boxed_expr(decl.id, field, value)));
                out.push("    }".to_string());
            }
        }
        out.push("}".to_string());
    }

    fn emit_union(&self, out: &mut Vec<String>, decl: &ResolvedDecl, alts: &[ResolvedField], is_enum: bool) {
        let name = to_pascal_case(&decl.name);
        doc_lines(out, "", doc_text(&decl.annotations));
        if is_enum {
            out.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]".to_string());
        } else {
            out.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]".to_string());
        }
        out.push(format!("pub enum {}{} {{", name, generics(decl)));
        for alt in alts {
            doc_lines(out, "    ", doc_text(&alt.annotations));
            out.push(format!("    #[serde(rename = {:?})]", alt.serialized_name));
            let variant = to_pascal_case(&alt.name);
            match alt.type_expr.head {
                TypeRef::Primitive(Primitive::Void) => out.push(format!("    {},", variant)),
                _ => out.push(format!("    {}({}),", variant, self.field_type(decl.id, alt))),
            }
        }
        if let Some(phantom) = phantom_type(decl) {
            out.push("    #[serde(skip)]".to_string());
            out.push(format!("    _Phantom({}),", phantom));
        }
        out.push("}".to_string());
    }

    fn emit_alias(&self, out: &mut Vec<String>, decl: &ResolvedDecl, target: &TypeExpr) {
        doc_lines(out, "", doc_text(&decl.annotations));
        out.push(format!(
            "pub type {}{} = {};",
            to_pascal_case(&decl.name),
            generics(decl),
            self.rust_type(target)
        ));
    }

    fn emit_newtype(&self, out: &mut Vec<String>, decl: &ResolvedDecl, target: &TypeExpr) {
        let name = to_pascal_case(&decl.name);
        let generics = generics(decl);
        doc_lines(out, "", doc_text(&decl.annotations));
        out.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]".to_string());
        match phantom_type(decl) {
            Some(phantom) => {
                out.push("#[serde(transparent)]".to_string());
                out.push(format!(
                    "pub struct {}{}(pub {}, #[serde(skip)] pub {});",
                    name,
                    generics,
                    self.rust_type(target),
                    phantom
                ));
            }
            None => out.push(format!("pub struct {}{}(pub {});", name, generics, self.rust_type(target))),
        }

        if let Some(value) = self.ctx.defaults(decl.id).and_then(|d| d.newtype.as_ref()) {
            out.push("".to_string());
            out.push(format!("impl{} Default for {}{} {{", generics, name, generics));
            out.push("    fn default() -> Self {".to_string());
            out.push(format!("        {}", self.value_expr(value)));
            out.push("    }".to_string());
            out.push("}".to_string());
        }
    }

    fn emit_refs(&self, out: &mut Vec<String>, decl: &ResolvedDecl) {
        let name = to_pascal_case(&decl.name);
        let fn_name = to_snake_case(&decl.name);
        let generics = generics(decl);
        let rt = &self.runtime;

        out.push(format!(
            "pub fn ref_{}{}() -> {}::TypeRef<{}{}> {{",
            fn_name, generics, rt, name, generics
        ));
        out.push(format!("    {}::TypeRef::new({:?}, {:?})", rt, decl.module, decl.name));
        out.push("}".to_string());
        out.push("".to_string());

        let params: Vec<String> = decl
            .type_params
            .iter()
            .map(|p| format!("texpr_{}: {}::ATypeExpr<{}>", to_snake_case(p), rt, p))
            .collect();
        let values: Vec<String> = decl
            .type_params
            .iter()
            .map(|p| format!("texpr_{}.value", to_snake_case(p)))
            .collect();
        out.push(format!(
            "pub fn texpr_{}{}({}) -> {}::ATypeExpr<{}{}> {{",
            fn_name,
            generics,
            params.join(", "),
            rt,
            name,
            generics
        ));
        out.push(format!(
            "    {}::ATypeExpr::reference({:?}, {:?}, vec![{}])",
            rt,
            decl.module,
            decl.name,
            values.join(", ")
        ));
        out.push("}".to_string());
    }

    fn emit_ast(&self, out: &mut Vec<String>, ids: &[DeclId]) -> Result<(), AdlError> {
        let mut entries = Vec::new();
        for &id in ids {
            let decl = self.ctx.decl(id);
            let const_name = format!("AST_{}", to_snake_case(&decl.name).to_uppercase());
            out.push(format!("pub const {}: &str = {};", const_name, raw_string(&self.ctx.ast_json(id)?)));
            out.push("".to_string());
            entries.push(format!("    ({:?}, {}),", decl.scoped_name().to_string(), const_name));
        }
        out.push("/// Serialized declarations of this module, keyed by qualified name.".to_string());
        out.push("pub const AST_MAP: &[(&str, &str)] = &[".to_string());
        out.extend(entries);
        out.push("];".to_string());
        Ok(())
    }
}

impl Emitter for RustEmitter {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extension(&self) -> &'static str {
        "rs"
    }

    fn emit(&self, ctx: &EmitContext, module: &str, options: &EmitOptions) -> Result<SourceUnit, AdlError> {
        let resolved = ctx.module(module)?;
        let writer = ModuleWriter {
            ctx,
            module: resolved.name.as_str(),
            runtime: options.runtime.clone().unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
            root: options.module_root.clone().unwrap_or_else(|| DEFAULT_MODULE_ROOT.to_string()),
            graph: ValueGraph::new(ctx.set),
        };

        let mut out: Vec<String> = Vec::new();
        out.push(format!("// @generated by adlc from module `{}`. Do not edit.", module));
        out.push("#![allow(dead_code, non_camel_case_types, clippy::all)]".to_string());
        out.push("".to_string());
        out.push("use serde::{Deserialize, Serialize};".to_string());

        for &id in &resolved.decls {
            let decl = ctx.decl(id);
            out.push("".to_string());
            match &decl.kind {
                ResolvedKind::Struct(fields)        => writer.emit_struct(&mut out, decl, fields),
                ResolvedKind::Union(alts)           => writer.emit_union(&mut out, decl, alts, false),
                ResolvedKind::Enum(labels)          => writer.emit_union(&mut out, decl, labels, true),
                ResolvedKind::Alias(target)         => writer.emit_alias(&mut out, decl, target),
                ResolvedKind::Newtype { target, .. } => writer.emit_newtype(&mut out, decl, target),
            }
            out.push("".to_string());
            writer.emit_refs(&mut out, decl);
        }

        if options.include_ast {
            out.push("".to_string());
            writer.emit_ast(&mut out, &resolved.decls)?;
        }
        out.push("".to_string());

        Ok(SourceUnit {
            path:     module_path(module, self.extension()),
            contents: out.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tests::{compile_fixture, compile_for_emit, CompiledFixture};

    fn emit(fixture: &CompiledFixture, module: &str, include_ast: bool) -> String {
        let options = EmitOptions { include_ast, ..EmitOptions::default() };
        RUST_EMITTER.emit(&fixture.context(), module, &options).unwrap().contents
    }

    #[test]
    fn test_escape_and_raw_string() {
        assert_eq!(escape_rust_keyword("for"), "r#for");
        assert_eq!(escape_rust_keyword("self"), "self_");
        assert_eq!(escape_rust_keyword("objects"), "objects");
        assert_eq!(raw_string("{}"), "r#\"{}\"#");
        assert_eq!(raw_string("a\"#b"), "r##\"a\"#b\"##");
    }

    #[test]
    fn test_struct_with_defaults() {
        let fixture = compile_for_emit();
        let code = emit(&fixture, "picture", false);

        assert!(code.contains("pub struct Translated<T> {"), "{}", code);
        assert!(code.contains("    #[serde(default = \"Translated::<T>::def_layer\")]\n    pub layer: i32,"));
        assert!(code.contains("    pub fn new(object: T) -> Self {"));
        assert!(code.contains("            layer: Translated::<T>::def_layer(),"));
        assert!(code.contains("    pub fn def_yoffset() -> f64 {\n        10.5\n    }"));
        assert!(code.contains("    pub fn def_xoffset() -> f64 {\n        0.0\n    }"));
        assert!(code.contains("/// A picture moved by an offset."));
    }

    #[test]
    fn test_unions_enums_and_boxing() {
        let fixture = compile_for_emit();
        let code = emit(&fixture, "picture", false);

        assert!(code.contains("pub enum Picture {"));
        assert!(code.contains("    #[serde(rename = \"circle\")]\n    Circle(crate::shapes::Circle),"));
        assert!(code.contains("    Translated(Box<Translated<Picture>>),"));
        assert!(code.contains("    Composed(Vec<Picture>),"));
        assert!(code.contains("    Empty,"));
        assert!(code.contains("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]\npub enum Terminal {"));
    }

    #[test]
    fn test_keywords_renames_and_maybe_default() {
        let fixture = compile_for_emit();
        let code = emit(&fixture, "picture", false);

        assert!(code.contains("    pub r#for: bool,"), "{}", code);
        assert!(!code.contains("#[serde(rename = \"for\")]"));
        assert!(code.contains("    #[serde(rename = \"objects\")]\n    pub object_list: String,"));
        assert!(code.contains("    pub fn new(r#for: bool, object_list: String) -> Self {"));
        assert!(code.contains("    pub fn def_f_mstring2() -> crate::sys::types::Maybe<String> {\n        crate::sys::types::Maybe::Just(\"sukpeepolup\".to_string())\n    }"));
        assert!(code.contains("pub struct Name(pub String);"));
        assert!(code.contains("impl Default for Name {\n    fn default() -> Self {\n        Name(\"anon\".to_string())\n    }\n}"));
    }

    #[test]
    fn test_refs_and_ast() {
        let fixture = compile_for_emit();
        let code = emit(&fixture, "picture", true);

        assert!(code.contains("pub fn ref_translated<T>() -> adl_runtime::TypeRef<Translated<T>> {"));
        assert!(code.contains("    adl_runtime::TypeRef::new(\"picture\", \"Translated\")"));
        assert!(code.contains(
            "pub fn texpr_translated<T>(texpr_t: adl_runtime::ATypeExpr<T>) -> adl_runtime::ATypeExpr<Translated<T>> {"
        ));
        assert!(code.contains("pub const AST_TRANSLATED: &str = r#\"{\"moduleName\":\"picture\""));
        assert!(code.contains("    (\"picture.Translated\", AST_TRANSLATED),"));

        let without = emit(&fixture, "picture", false);
        assert!(!without.contains("AST_MAP"));
    }

    #[test]
    fn test_mutual_recursion_is_boxed() {
        let fixture = compile_fixture(&[r#"
            module tree {
            union Tree { Void leaf; Node node; };
            struct Node { Tree left; Tree right; Vector<Node> siblings; Nullable<Node> parent; };
            struct Leaf { Int32 value; };
            union Wrapper { Leaf leaf; Tree tree; };
            };
        "#]);
        let code = emit(&fixture, "tree", false);

        assert!(code.contains("    Node(Box<Node>),"), "{}", code);
        assert!(code.contains("    pub left: Box<Tree>,"));
        assert!(code.contains("    pub right: Box<Tree>,"));
        assert!(code.contains("    pub siblings: Vec<Node>,"));
        assert!(code.contains("    pub parent: Box<Option<Node>>,"));
        // Not part of any cycle.
        assert!(code.contains("    Leaf(Leaf),"));
        assert!(code.contains("    Tree(Tree),"));
        assert!(code.contains("    pub fn new(left: Box<Tree>, right: Box<Tree>, siblings: Vec<Node>, parent: Box<Option<Node>>) -> Self {"));
    }

    #[test]
    fn test_unused_type_parameters() {
        let fixture = compile_fixture(&[r#"
            module tagged {
            struct Id<T> { Int32 value = 0; };
            union Either<L, R> { L left; Void none; };
            newtype Token<T> = String = "t";
            struct Holder { Token<Int32> token = "x"; Id<String> id = {}; };
            };
        "#]);
        let code = emit(&fixture, "tagged", false);

        assert!(code.contains("    #[serde(skip)]\n    pub _phantom: std::marker::PhantomData<(T,)>,\n}"), "{}", code);
        assert!(code.contains("            _phantom: std::marker::PhantomData,"));
        assert!(code.contains("    #[serde(skip)]\n    _Phantom(std::marker::PhantomData<(R,)>),"));
        assert!(code.contains(
            "#[serde(transparent)]\npub struct Token<T>(pub String, #[serde(skip)] pub std::marker::PhantomData<(T,)>);"
        ));
        assert!(code.contains("Token(\"x\".to_string(), std::marker::PhantomData)"));
        assert!(code.contains("Id { value: 0, _phantom: std::marker::PhantomData }"));
    }

    #[test]
    fn test_output_path_and_determinism() {
        let fixture = compile_for_emit();
        let options = EmitOptions::default();
        let unit = RUST_EMITTER.emit(&fixture.context(), "sys.types", &options).unwrap();
        assert_eq!(unit.path, std::path::PathBuf::from("sys/types.rs"));
        assert!(unit.contents.contains("pub struct Map<K, V>(pub Vec<Pair<K, V>>);"));
        let again = RUST_EMITTER.emit(&fixture.context(), "sys.types", &options).unwrap();
        assert_eq!(unit, again);
    }
}
