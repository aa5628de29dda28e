//! TypeScript target: interfaces and discriminated unions, `make*` factories
//! that fill in defaults, type reference helpers, and optionally the
//! embedded AST.

use std::collections::BTreeSet;

use crate::{
    defaults::Value,
    emit::{doc_text, module_path, EmitContext, EmitOptions, SourceUnit},
    error::AdlError,
    resolver::{DeclId, Primitive, ResolvedDecl, ResolvedField, ResolvedKind, TypeExpr, TypeRef},
    traits::Emitter,
    utils::{quote, to_pascal_case},
};

pub struct TypeScriptEmitter;

pub static TYPESCRIPT_EMITTER: TypeScriptEmitter = TypeScriptEmitter;

/// Runtime location, relative to the output directory.
const DEFAULT_RUNTIME: &str = "runtime/adl";

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Property key, quoted when it is not a plain identifier.
fn property(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

/// Relative import path from the unit of module `from` to the unit of `to`.
fn relative_import(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut segments: Vec<&str> = from.split('.').collect();
        segments.pop();
        segments
    };
    let target: Vec<&str> = to.split('.').collect();
    let common = from_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(target.len().saturating_sub(1));
    let ups = from_dir.len() - common;
    let prefix = if ups == 0 { "./".to_string() } else { "../".repeat(ups) };
    format!("{}{}", prefix, target[common..].join("/"))
}

/// Relative path from the unit of `module` to a file under the output root.
fn relative_to_root(module: &str, path: &str) -> String {
    let depth = module.split('.').count() - 1;
    if depth == 0 {
        format!("./{}", path)
    } else {
        format!("{}{}", "../".repeat(depth), path)
    }
}

fn import_alias(module: &str) -> String {
    module.replace('.', "_")
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
        out.push(format!("{}/**", indent));
        for line in doc.trim_end_matches('\n').split('\n') {
            if line.is_empty() {
                out.push(format!("{} *", indent));
            } else {
                out.push(format!("{} * {}", indent, line));
            }
        }
        out.push(format!("{} */", indent));
    }
}

fn is_void(field: &ResolvedField) -> bool {
    matches!(field.type_expr.head, TypeRef::Primitive(Primitive::Void))
}

fn collect_modules(texpr: &TypeExpr, ctx: &EmitContext, out: &mut BTreeSet<String>) {
    if let TypeRef::Decl(id) = texpr.head {
        out.insert(ctx.decl(id).module.clone());
    }
    for arg in &texpr.args {
        collect_modules(arg, ctx, out);
    }
}

fn collect_value_modules(value: &Value, ctx: &EmitContext, out: &mut BTreeSet<String>) {
    match value {
        Value::Vector(items) => items.iter().for_each(|v| collect_value_modules(v, ctx, out)),
        Value::StringMap(entries) => entries.iter().for_each(|(_, v)| collect_value_modules(v, ctx, out)),
        Value::Nullable(Some(v)) | Value::Newtype { value: v, .. } => collect_value_modules(v, ctx, out),
        Value::Struct { fields, .. } => fields.iter().for_each(|v| collect_value_modules(v, ctx, out)),
        Value::Union { value, .. } => collect_value_modules(value, ctx, out),
        Value::Enum { decl, .. } => {
            out.insert(ctx.decl(*decl).module.clone());
        }
        _ => {}
    }
}

struct ModuleWriter<'c, 'a> {
    ctx:    &'c EmitContext<'a>,
    module: &'a str,
}

impl<'c, 'a> ModuleWriter<'c, 'a> {
    fn type_name(&self, id: DeclId) -> String {
        let decl = self.ctx.decl(id);
        if decl.module == self.module {
            decl.name.clone()
        } else {
            format!("{}.{}", import_alias(&decl.module), decl.name)
        }
    }

    fn ts_type(&self, texpr: &TypeExpr) -> String {
        let args: Vec<String> = texpr.args.iter().map(|a| self.ts_type(a)).collect();
        let arg = |i: usize| args.get(i).cloned().unwrap_or_else(|| "unknown".to_string());
        match &texpr.head {
            TypeRef::Primitive(p) => match p {
                Primitive::Void => "null".to_string(),
                Primitive::Bool => "boolean".to_string(),
                Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::Word8
                | Primitive::Word16
                | Primitive::Word32
                | Primitive::Word64
                | Primitive::Float
                | Primitive::Double => "number".to_string(),
                Primitive::Json       => "{}|null".to_string(),
                Primitive::ByteVector => "Uint8Array".to_string(),
                Primitive::String     => "string".to_string(),
                Primitive::Vector     => format!("({})[]", arg(0)),
                Primitive::StringMap  => format!("{{[key: string]: {}}}", arg(0)),
                Primitive::Nullable   => format!("({}|null)", arg(0)),
                Primitive::TypeToken  => format!("ADL.ATypeExpr<{}>", arg(0)),
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

    /// TypeScript expression for `value`, matching the JSON wire form except
    /// for unions, which use the `{kind, value}` representation.
    fn value_expr(&self, value: &Value) -> String {
        match value {
            Value::Void       => "null".to_string(),
            Value::Bool(b)    => b.to_string(),
            Value::Int(i)     => i.to_string(),
            Value::UInt(u)    => u.to_string(),
            Value::Float(f)   => f.to_string(),
            Value::String(s)  => quote(s),
            Value::Bytes(bytes) => format!(
                "new Uint8Array([{}])",
                bytes.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(", ")
            ),
            Value::Json(lit)  => lit.to_json().to_string(),
            Value::Vector(items) => format!(
                "[{}]",
                items.iter().map(|v| self.value_expr(v)).collect::<Vec<_>>().join(", ")
            ),
            Value::StringMap(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", quote(k), self.value_expr(v)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Value::Nullable(None)    => "null".to_string(),
            Value::Nullable(Some(v)) => self.value_expr(v),
            Value::Struct { decl, fields } => {
                let members = self.ctx.decl(*decl).members();
                format!(
                    "{{{}}}",
                    members
                        .iter()
                        .zip(fields)
                        .map(|(m, v)| format!("{}: {}", property(&m.serialized_name), self.value_expr(v)))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Value::Union { decl, alt, value } => {
                let member = &self.ctx.decl(*decl).members()[*alt];
                match value.as_ref() {
                    Value::Void => format!("{{kind: {}}}", quote(&member.serialized_name)),
                    payload => format!(
                        "{{kind: {}, value: {}}}",
                        quote(&member.serialized_name),
                        self.value_expr(payload)
                    ),
                }
            }
            Value::Enum { decl, label } => {
                let member = &self.ctx.decl(*decl).members()[*label];
                format!("{}.{}", self.type_name(*decl), member.name)
            }
            Value::Newtype { value, .. } => self.value_expr(value),
        }
    }

    fn emit_struct(&self, out: &mut Vec<String>, decl: &ResolvedDecl, fields: &[ResolvedField]) {
        let generics = generics(decl);
        let defaults = self.ctx.defaults(decl.id);
        let default_of = |i: usize| defaults.and_then(|d| d.fields.get(i)).and_then(|v| v.as_ref());

        doc_lines(out, "", doc_text(&decl.annotations));
        out.push(format!("export interface {}{} {{", decl.name, generics));
        for field in fields {
            doc_lines(out, "  ", doc_text(&field.annotations));
            out.push(format!("  {}: {};", property(&field.serialized_name), self.ts_type(&field.type_expr)));
        }
        out.push("}".to_string());
        out.push("".to_string());

        out.push(format!("export function make{}{}(", decl.name, generics));
        out.push("  input: {".to_string());
        for (i, field) in fields.iter().enumerate() {
            let optional = if default_of(i).is_some() { "?" } else { "" };
            out.push(format!(
                "    {}{}: {},",
                property(&field.serialized_name),
                optional,
                self.ts_type(&field.type_expr)
            ));
        }
        out.push("  }".to_string());
        out.push(format!("): {}{} {{", decl.name, generics));
        out.push("  return {".to_string());
        for (i, field) in fields.iter().enumerate() {
            let key = property(&field.serialized_name);
            let access = if is_identifier(&field.serialized_name) {
                format!("input.{}", field.serialized_name)
            } else {
                format!("input[{}]", quote(&field.serialized_name))
            };
            match default_of(i) {
                Some(value) => out.push(format!(
                    "    {}: {} === undefined ? {} : {},",
                    key,
                    access,
                    self.value_expr(value),
                    access
                )),
                None => out.push(format!("    {}: {},", key, access)),
            }
        }
        out.push("  };".to_string());
        out.push("}".to_string());
    }

    fn emit_union(&self, out: &mut Vec<String>, decl: &ResolvedDecl, alts: &[ResolvedField]) {
        let generics = generics(decl);
        let mut variants = Vec::new();
        for alt in alts {
            let variant = format!("{}_{}", decl.name, to_pascal_case(&alt.name));
            doc_lines(out, "", doc_text(&alt.annotations));
            if is_void(alt) {
                out.push(format!("export interface {} {{", variant));
                out.push(format!("  kind: {};", quote(&alt.serialized_name)));
                out.push("}".to_string());
                variants.push(variant);
            } else {
                out.push(format!("export interface {}{} {{", variant, generics));
                out.push(format!("  kind: {};", quote(&alt.serialized_name)));
                out.push(format!("  value: {};", self.ts_type(&alt.type_expr)));
                out.push("}".to_string());
                variants.push(format!("{}{}", variant, generics));
            }
        }
        out.push("".to_string());
        doc_lines(out, "", doc_text(&decl.annotations));
        if variants.is_empty() {
            out.push(format!("export type {}{} = never;", decl.name, generics));
        } else {
            out.push(format!("export type {}{} = {};", decl.name, generics, variants.join(" | ")));
        }
        out.push("".to_string());

        out.push(format!("export interface {}Opts{} {{", decl.name, generics));
        for alt in alts {
            out.push(format!("  {}: {};", property(&alt.serialized_name), self.ts_type(&alt.type_expr)));
        }
        out.push("}".to_string());
        out.push("".to_string());

        let mut key = "K".to_string();
        while decl.type_params.contains(&key) {
            key.push('_');
        }
        let type_params: Vec<String> = decl
            .type_params
            .iter()
            .cloned()
            .chain(std::iter::once(format!("{} extends keyof {}Opts{}", key, decl.name, generics)))
            .collect();
        out.push(format!(
            "export function make{}<{}>(kind: {}, value: {}Opts{}[{}]) {{",
            decl.name,
            type_params.join(", "),
            key,
            decl.name,
            generics,
            key
        ));
        out.push("  return {kind, value};".to_string());
        out.push("}".to_string());
    }

    fn emit_enum(&self, out: &mut Vec<String>, decl: &ResolvedDecl, labels: &[ResolvedField]) {
        doc_lines(out, "", doc_text(&decl.annotations));
        out.push(format!("export enum {} {{", decl.name));
        for label in labels {
            doc_lines(out, "  ", doc_text(&label.annotations));
            out.push(format!("  {} = {},", label.name, quote(&label.serialized_name)));
        }
        out.push("}".to_string());
    }

    fn emit_type(&self, out: &mut Vec<String>, decl: &ResolvedDecl, target: &TypeExpr) {
        doc_lines(out, "", doc_text(&decl.annotations));
        out.push(format!("export type {}{} = {};", decl.name, generics(decl), self.ts_type(target)));

        if let Some(value) = self.ctx.defaults(decl.id).and_then(|d| d.newtype.as_ref()) {
            out.push("".to_string());
            out.push(format!("export function make{}{}(): {}{} {{", decl.name, generics(decl), decl.name, generics(decl)));
            out.push(format!("  return {};", self.value_expr(value)));
            out.push("}".to_string());
        }
    }

    fn emit_refs(&self, out: &mut Vec<String>, decl: &ResolvedDecl) {
        let generics = generics(decl);
        out.push(format!(
            "const sn{}: ADL.ScopedName = {{moduleName: {}, name: {}}};",
            decl.name,
            quote(&decl.module),
            quote(&decl.name)
        ));
        out.push("".to_string());

        out.push(format!(
            "export function ref{}{}(): ADL.TypeRef<{}{}> {{",
            decl.name, generics, decl.name, generics
        ));
        out.push(format!("  return {{value: sn{}}};", decl.name));
        out.push("}".to_string());
        out.push("".to_string());

        let params: Vec<String> = decl
            .type_params
            .iter()
            .map(|p| format!("texpr{}: ADL.ATypeExpr<{}>", p, p))
            .collect();
        let values: Vec<String> = decl.type_params.iter().map(|p| format!("texpr{}.value", p)).collect();
        out.push(format!(
            "export function texpr{}{}({}): ADL.ATypeExpr<{}{}> {{",
            decl.name,
            generics,
            params.join(", "),
            decl.name,
            generics
        ));
        out.push(format!(
            "  return {{value: {{typeRef: {{kind: \"reference\", value: sn{}}}, parameters: [{}]}}}};",
            decl.name,
            values.join(", ")
        ));
        out.push("}".to_string());
    }

    fn emit_ast(&self, out: &mut Vec<String>, ids: &[DeclId]) -> Result<(), AdlError> {
        let mut entries = Vec::new();
        for &id in ids {
            let decl = self.ctx.decl(id);
            out.push(format!("export const {}_AST: ADL.ScopedDecl =", decl.name));
            out.push(format!("  {};", self.ctx.ast_json(id)?));
            out.push("".to_string());
            entries.push(format!("  {}: {}_AST,", quote(&decl.scoped_name().to_string()), decl.name));
        }
        out.push("export const _AST_MAP: { [key: string]: ADL.ScopedDecl } = {".to_string());
        out.extend(entries);
        out.push("};".to_string());
        Ok(())
    }

    /// Other modules referenced by the types or default values of this module.
    fn imported_modules(&self, ids: &[DeclId]) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for &id in ids {
            let decl = self.ctx.decl(id);
            match &decl.kind {
                ResolvedKind::Struct(fields) | ResolvedKind::Union(fields) | ResolvedKind::Enum(fields) => {
                    for field in fields {
                        collect_modules(&field.type_expr, self.ctx, &mut found);
                    }
                }
                ResolvedKind::Alias(target) | ResolvedKind::Newtype { target, .. } => {
                    collect_modules(target, self.ctx, &mut found);
                }
            }
            if let Some(defaults) = self.ctx.defaults(id) {
                for value in defaults.fields.iter().flatten().chain(defaults.newtype.iter()) {
                    collect_value_modules(value, self.ctx, &mut found);
                }
            }
        }
        found.remove(self.module);
        found
    }
}

impl Emitter for TypeScriptEmitter {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn emit(&self, ctx: &EmitContext, module: &str, options: &EmitOptions) -> Result<SourceUnit, AdlError> {
        let resolved = ctx.module(module)?;
        let writer = ModuleWriter { ctx, module: resolved.name.as_str() };
        let runtime = options.runtime.as_deref().unwrap_or(DEFAULT_RUNTIME);

        let mut out: Vec<String> = Vec::new();
        out.push(format!("/* @generated by adlc from module {}. Do not edit. */", module));
        out.push("".to_string());
        out.push(format!("import * as ADL from '{}';", relative_to_root(module, runtime)));
        for other in writer.imported_modules(&resolved.decls) {
            out.push(format!(
                "import * as {} from '{}';",
                import_alias(&other),
                relative_import(module, &other)
            ));
        }

        for &id in &resolved.decls {
            let decl = ctx.decl(id);
            out.push("".to_string());
            match &decl.kind {
                ResolvedKind::Struct(fields)        => writer.emit_struct(&mut out, decl, fields),
                ResolvedKind::Union(alts)           => writer.emit_union(&mut out, decl, alts),
                ResolvedKind::Enum(labels)          => writer.emit_enum(&mut out, decl, labels),
                ResolvedKind::Alias(target)         => writer.emit_type(&mut out, decl, target),
                ResolvedKind::Newtype { target, .. } => writer.emit_type(&mut out, decl, target),
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
