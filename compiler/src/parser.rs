use crate::{
    tokenizer::Token,
    types::{Annotation, Decl, DeclKind, Field, Import, ImportKind, Module, TypeExpr0},
    utils::{error, quote},
    error::AdlError,
};
use adlc_schema::{Literal, Pair};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:       Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref EQUALS:           Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:        Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:            Regex = Regex::new(r"^,$").unwrap();
    static ref COLON:            Regex = Regex::new(r"^:$").unwrap();
    static ref DOT:              Regex = Regex::new(r"^\.$").unwrap();
    static ref STAR:             Regex = Regex::new(r"^\*$").unwrap();
    static ref AT:               Regex = Regex::new(r"^@$").unwrap();
    static ref LEFT_BRACE:       Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:      Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_BRACKET:     Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET:    Regex = Regex::new(r"^\]$").unwrap();
    static ref LEFT_ANGLE:       Regex = Regex::new(r"^<$").unwrap();
    static ref RIGHT_ANGLE:      Regex = Regex::new(r"^>$").unwrap();
    static ref STRING:           Regex = Regex::new(r#"^".*"$"#).unwrap();
    static ref INTEGER:          Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref NUMBER:           Regex = Regex::new(r"^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?$").unwrap();
    static ref MODULE_KEYWORD:   Regex = Regex::new(r"^module$").unwrap();
    static ref IMPORT_KEYWORD:   Regex = Regex::new(r"^import$").unwrap();
    static ref STRUCT_KEYWORD:   Regex = Regex::new(r"^struct$").unwrap();
    static ref UNION_KEYWORD:    Regex = Regex::new(r"^union$").unwrap();
    static ref ENUM_KEYWORD:     Regex = Regex::new(r"^enum$").unwrap();
    static ref TYPE_KEYWORD:     Regex = Regex::new(r"^type$").unwrap();
    static ref NEWTYPE_KEYWORD:  Regex = Regex::new(r"^newtype$").unwrap();
    static ref TRUE_KEYWORD:     Regex = Regex::new(r"^true$").unwrap();
    static ref FALSE_KEYWORD:    Regex = Regex::new(r"^false$").unwrap();
    static ref NULL_KEYWORD:     Regex = Regex::new(r"^null$").unwrap();
    static ref EOF:              Regex = Regex::new(r"^$").unwrap();
}

/// Unqualified name of the annotation that overrides a field's wire name.
pub const SERIALIZED_NAME: &str = "SerializedName";
/// Unqualified name of the annotation carrying doc comments.
pub const DOC: &str = "Doc";

struct Parser<'a> {
    label:  &'a str,
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        let tokens: &'a [Token] = self.tokens;
        &tokens[self.index.min(tokens.len() - 1)]
    }

    fn peek(&self, test: &Regex) -> bool {
        test.is_match(&self.current().text)
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if self.peek(test) && !self.current().is_eof() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, AdlError> {
        let tok = self.current();
        if !self.eat(test) {
            return Err(self.error_at(
                tok,
                &format!("Expected {} but found {}", expected, quote(&tok.text)),
            ));
        }
        Ok(tok)
    }

    fn error_at(&self, tok: &Token, msg: &str) -> AdlError {
        error(self.label, msg, tok.line, tok.column)
    }

    fn unexpected_token(&self) -> AdlError {
        let tok = self.current();
        if tok.is_eof() {
            self.error_at(tok, "Unexpected end of input")
        } else {
            self.error_at(tok, &format!("Unexpected token {}", quote(&tok.text)))
        }
    }

    /// Consumes consecutive `///` comments and joins them into one doc string.
    fn docs(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        while self.current().is_doc() {
            let text = &self.current().text[3..];
            lines.push(text.strip_prefix(' ').unwrap_or(text).to_string());
            self.index += 1;
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n") + "\n")
        }
    }

    fn dotted_name(&mut self) -> Result<String, AdlError> {
        let mut name = self.expect(&IDENTIFIER, "identifier")?.text.clone();
        while self.eat(&DOT) {
            name.push('.');
            name.push_str(&self.expect(&IDENTIFIER, "identifier")?.text);
        }
        Ok(name)
    }

    fn import(&mut self) -> Result<Import, AdlError> {
        let start = self.current();
        let mut segments = vec![self.expect(&IDENTIFIER, "module name")?.text.clone()];
        let mut all = false;
        while self.eat(&DOT) {
            if self.eat(&STAR) {
                all = true;
                break;
            }
            segments.push(self.expect(&IDENTIFIER, "identifier or \"*\"")?.text.clone());
        }
        self.expect(&SEMICOLON, "\";\"")?;

        let kind = if all {
            ImportKind::All
        } else {
            if segments.len() < 2 {
                return Err(self.error_at(start, "Import must name a module and a declaration, or end with \".*\""));
            }
            ImportKind::Name(segments.pop().unwrap_or_default())
        };
        Ok(Import {
            module: segments.join("."),
            kind,
            line:   start.line,
            column: start.column,
        })
    }

    fn annotations(&mut self) -> Result<Vec<Annotation>, AdlError> {
        let mut annotations = Vec::new();
        loop {
            if let Some(doc) = self.docs() {
                annotations.push(Annotation { name: DOC.to_string(), value: Literal::String(doc) });
                continue;
            }
            if !self.eat(&AT) {
                break;
            }
            let name = self.dotted_name()?;
            let value = if self.starts_literal() {
                self.literal()?
            } else {
                Literal::Null
            };
            annotations.push(Annotation { name, value });
        }
        Ok(annotations)
    }

    fn starts_literal(&self) -> bool {
        self.peek(&STRING)
            || self.peek(&NUMBER)
            || self.peek(&TRUE_KEYWORD)
            || self.peek(&FALSE_KEYWORD)
            || self.peek(&NULL_KEYWORD)
            || self.peek(&LEFT_BRACKET)
            || self.peek(&LEFT_BRACE)
    }

    fn literal(&mut self) -> Result<Literal, AdlError> {
        let tok = self.current();
        if self.eat(&STRING) {
            let s: String = serde_json::from_str(&tok.text)
                .map_err(|e| self.error_at(tok, &format!("Invalid string literal: {}", e)))?;
            return Ok(Literal::String(s));
        }
        if self.eat(&INTEGER) {
            let out_of_range = || self.error_at(tok, &format!("Integer literal {} is out of range", quote(&tok.text)));
            let i = tok.text.parse::<i128>().map_err(|_| out_of_range())?;
            if i < i64::MIN as i128 || i > u64::MAX as i128 {
                return Err(out_of_range());
            }
            return Ok(Literal::Integer(i));
        }
        if self.eat(&NUMBER) {
            let d = tok.text.parse::<f64>().map_err(|_| {
                self.error_at(tok, &format!("Invalid number {}", quote(&tok.text)))
            })?;
            return Ok(Literal::Double(d));
        }
        if self.eat(&TRUE_KEYWORD) {
            return Ok(Literal::Boolean(true));
        }
        if self.eat(&FALSE_KEYWORD) {
            return Ok(Literal::Boolean(false));
        }
        if self.eat(&NULL_KEYWORD) {
            return Ok(Literal::Null);
        }
        if self.eat(&LEFT_BRACKET) {
            let mut items = Vec::new();
            if !self.eat(&RIGHT_BRACKET) {
                loop {
                    items.push(self.literal()?);
                    if self.eat(&RIGHT_BRACKET) {
                        break;
                    }
                    self.expect(&COMMA, "\",\" or \"]\"")?;
                }
            }
            return Ok(Literal::Array(items));
        }
        if self.eat(&LEFT_BRACE) {
            let mut entries = Vec::new();
            if !self.eat(&RIGHT_BRACE) {
                loop {
                    let key_tok = self.expect(&STRING, "string key")?;
                    let key: String = serde_json::from_str(&key_tok.text)
                        .map_err(|e| self.error_at(key_tok, &format!("Invalid string literal: {}", e)))?;
                    self.expect(&COLON, "\":\"")?;
                    entries.push(Pair::new(key, self.literal()?));
                    if self.eat(&RIGHT_BRACE) {
                        break;
                    }
                    self.expect(&COMMA, "\",\" or \"}\"")?;
                }
            }
            return Ok(Literal::Object(entries));
        }
        Err(self.unexpected_token())
    }

    fn type_params(&mut self) -> Result<Vec<String>, AdlError> {
        let mut params = Vec::new();
        if self.eat(&LEFT_ANGLE) {
            loop {
                params.push(self.expect(&IDENTIFIER, "type parameter")?.text.clone());
                if self.eat(&RIGHT_ANGLE) {
                    break;
                }
                self.expect(&COMMA, "\",\" or \">\"")?;
            }
        }
        Ok(params)
    }

    fn type_expr(&mut self) -> Result<TypeExpr0, AdlError> {
        let start = self.current();
        let name = self.dotted_name()?;
        let mut args = Vec::new();
        if self.eat(&LEFT_ANGLE) {
            loop {
                args.push(self.type_expr()?);
                if self.eat(&RIGHT_ANGLE) {
                    break;
                }
                self.expect(&COMMA, "\",\" or \">\"")?;
            }
        }
        Ok(TypeExpr0 { name, args, line: start.line, column: start.column })
    }

    fn field(&mut self, allow_default: bool) -> Result<Field, AdlError> {
        let mut annotations = self.annotations()?;
        let type_expr = self.type_expr()?;
        let name_tok = self.expect(&IDENTIFIER, "field name")?;
        let default = if self.peek(&EQUALS) {
            if !allow_default {
                return Err(self.error_at(self.current(), "Union alternatives cannot have defaults"));
            }
            self.index += 1;
            Some(self.literal()?)
        } else {
            None
        };
        self.expect(&SEMICOLON, "\";\"")?;

        let serialized_name = take_serialized_name(&mut annotations)
            .map_err(|msg| self.error_at(name_tok, &msg))?
            .unwrap_or_else(|| name_tok.text.clone());

        Ok(Field {
            name: name_tok.text.clone(),
            serialized_name,
            type_expr,
            default,
            annotations,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    fn label(&mut self) -> Result<Field, AdlError> {
        let mut annotations = self.annotations()?;
        let name_tok = self.expect(&IDENTIFIER, "enum label")?;
        self.expect(&SEMICOLON, "\";\"")?;
        let serialized_name = take_serialized_name(&mut annotations)
            .map_err(|msg| self.error_at(name_tok, &msg))?
            .unwrap_or_else(|| name_tok.text.clone());
        Ok(Field {
            name: name_tok.text.clone(),
            serialized_name,
            type_expr: TypeExpr0 {
                name:   "Void".to_string(),
                args:   Vec::new(),
                line:   name_tok.line,
                column: name_tok.column,
            },
            default: None,
            annotations,
            line:   name_tok.line,
            column: name_tok.column,
        })
    }

    fn members(&mut self, allow_default: bool) -> Result<Vec<Field>, AdlError> {
        self.expect(&LEFT_BRACE, "\"{\"")?;
        let mut fields = Vec::new();
        while !self.eat(&RIGHT_BRACE) {
            if self.current().is_eof() {
                return Err(self.unexpected_token());
            }
            fields.push(self.field(allow_default)?);
        }
        Ok(fields)
    }

    fn decl(&mut self, annotations: Vec<Annotation>) -> Result<Decl, AdlError> {
        let keyword = self.current();
        let is_struct = self.eat(&STRUCT_KEYWORD);
        let is_union = !is_struct && self.eat(&UNION_KEYWORD);
        let is_enum = !is_struct && !is_union && self.eat(&ENUM_KEYWORD);
        let is_type = !is_struct && !is_union && !is_enum && self.eat(&TYPE_KEYWORD);
        let is_newtype = !is_struct && !is_union && !is_enum && !is_type && self.eat(&NEWTYPE_KEYWORD);
        if !(is_struct || is_union || is_enum || is_type || is_newtype) {
            return Err(self.unexpected_token());
        }

        let name_tok = self.expect(&IDENTIFIER, "identifier")?;
        let type_params = if is_enum { Vec::new() } else { self.type_params()? };

        let kind = if is_struct {
            DeclKind::Struct(self.members(true)?)
        } else if is_union {
            DeclKind::Union(self.members(false)?)
        } else if is_enum {
            self.expect(&LEFT_BRACE, "\"{\"")?;
            let mut labels = Vec::new();
            while !self.eat(&RIGHT_BRACE) {
                if self.current().is_eof() {
                    return Err(self.unexpected_token());
                }
                labels.push(self.label()?);
            }
            DeclKind::Enum(labels)
        } else {
            self.expect(&EQUALS, "\"=\"")?;
            let target = self.type_expr()?;
            if is_type {
                DeclKind::Alias(target)
            } else {
                let default = if self.eat(&EQUALS) { Some(self.literal()?) } else { None };
                DeclKind::Newtype { target, default }
            }
        };
        self.expect(&SEMICOLON, "\";\"")?;

        Ok(Decl {
            name: name_tok.text.clone(),
            type_params,
            annotations,
            kind,
            line:   keyword.line,
            column: keyword.column,
        })
    }
}

/// Removes `@SerializedName` from the annotations and returns its string value.
fn take_serialized_name(annotations: &mut Vec<Annotation>) -> Result<Option<String>, String> {
    let Some(pos) = annotations
        .iter()
        .position(|a| a.name == SERIALIZED_NAME || a.name == format!("sys.annotations.{}", SERIALIZED_NAME))
    else {
        return Ok(None);
    };
    match annotations.remove(pos).value {
        Literal::String(s) => Ok(Some(s)),
        _ => Err(format!("@{} requires a string value", SERIALIZED_NAME)),
    }
}

/// Parses a token stream into a raw module. `label` names the source in errors.
pub fn parse_schema(label: &str, tokens: &[Token]) -> Result<Module, AdlError> {
    if tokens.is_empty() {
        return Err(error(label, "Empty token stream", 0, 0));
    }
    let mut parser = Parser { label, tokens, index: 0 };

    let annotations = parser.annotations()?;
    parser.expect(&MODULE_KEYWORD, "\"module\"")?;
    let name = parser.dotted_name()?;
    parser.expect(&LEFT_BRACE, "\"{\"")?;

    let mut imports = Vec::new();
    while parser.eat(&IMPORT_KEYWORD) {
        imports.push(parser.import()?);
    }

    let mut decls = Vec::new();
    while !parser.eat(&RIGHT_BRACE) {
        if parser.current().is_eof() {
            return Err(parser.unexpected_token());
        }
        let decl_annotations = parser.annotations()?;
        decls.push(parser.decl(decl_annotations)?);
    }
    parser.eat(&SEMICOLON);

    if !parser.peek(&EOF) {
        return Err(parser.unexpected_token());
    }

    Ok(Module { name, imports, decls, annotations })
}
