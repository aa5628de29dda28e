//! Raw declaration tree produced by the parser, before any name resolution.

use adlc_schema::Literal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub name:        String,
    pub imports:     Vec<Import>,
    pub decls:       Vec<Decl>,
    pub annotations: Vec<Annotation>,
}

impl Module {
    /// Modules named by imports, in declaration order.
    pub fn imported_modules(&self) -> Vec<&str> {
        self.imports.iter().map(|i| i.module.as_str()).collect()
    }

    /// Module prefixes of every qualified type reference in the module.
    pub fn referenced_modules(&self) -> Vec<String> {
        let mut found = Vec::new();
        for decl in &self.decls {
            for texpr in decl.type_exprs() {
                texpr.collect_qualifiers(&mut found);
            }
        }
        found.sort();
        found.dedup();
        found
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportKind {
    /// `import a.b.*;`
    All,
    /// `import a.b.Name;`
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Import {
    pub module: String,
    pub kind:   ImportKind,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Possibly qualified annotation name as written (`Doc`, `sys.annotations.Doc`).
    pub name:  String,
    pub value: Literal,
}

/// A type expression as written: a possibly qualified name plus arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeExpr0 {
    pub name:   String,
    pub args:   Vec<TypeExpr0>,
    pub line:   usize,
    pub column: usize,
}

impl TypeExpr0 {
    /// Splits `a.b.Name` into `(Some("a.b"), "Name")`.
    pub fn split_name(&self) -> (Option<&str>, &str) {
        match self.name.rfind('.') {
            Some(idx) => (Some(&self.name[..idx]), &self.name[idx + 1..]),
            None      => (None, self.name.as_str()),
        }
    }

    fn collect_qualifiers(&self, out: &mut Vec<String>) {
        if let (Some(module), _) = self.split_name() {
            out.push(module.to_string());
        }
        for arg in &self.args {
            arg.collect_qualifiers(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:            String,
    pub serialized_name: String,
    pub type_expr:       TypeExpr0,
    pub default:         Option<Literal>,
    pub annotations:     Vec<Annotation>,
    pub line:            usize,
    pub column:          usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DeclKind {
    Struct(Vec<Field>),
    Union(Vec<Field>),
    /// Labels are carried as `Void` fields.
    Enum(Vec<Field>),
    Alias(TypeExpr0),
    Newtype {
        target:  TypeExpr0,
        default: Option<Literal>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decl {
    pub name:        String,
    pub type_params: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub kind:        DeclKind,
    pub line:        usize,
    pub column:      usize,
}

impl Decl {
    /// Fields, alternatives or enum labels, in declaration order.
    pub fn members(&self) -> &[Field] {
        match &self.kind {
            DeclKind::Struct(fields)
            | DeclKind::Union(fields)
            | DeclKind::Enum(fields) => fields,
            DeclKind::Alias(_) | DeclKind::Newtype { .. } => &[],
        }
    }

    pub fn type_exprs(&self) -> Vec<&TypeExpr0> {
        match &self.kind {
            DeclKind::Struct(fields)
            | DeclKind::Union(fields)
            | DeclKind::Enum(fields) => fields.iter().map(|f| &f.type_expr).collect(),
            DeclKind::Alias(target) => vec![target],
            DeclKind::Newtype { target, .. } => vec![target],
        }
    }
}
