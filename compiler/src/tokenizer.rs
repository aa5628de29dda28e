use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::AdlError;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(concat!(
        r#"(///[^\n]*|//[^\n]*"#,
        r#"|"(?:[^"\\\n]|\\.)*""#,
        r#"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?"#,
        r#"|[{}<>()\[\],;=@.:*]"#,
        r#"|\b[A-Za-z_][A-Za-z0-9_]*\b"#,
        r#"|\s+)"#,
    )).unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^\s+$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_doc(&self) -> bool {
        self.text.starts_with("///")
    }
}

/// Splits ADL source into tokens. Whitespace and `//` comments are dropped,
/// `///` doc comments are kept. The last token is always the empty EOF token.
///
/// `module` is only used to label errors.
pub fn tokenize_schema(module: &str, text: &str) -> Result<Vec<Token>, AdlError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(
                module,
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        let is_comment = part.starts_with("//") && !part.starts_with("///");
        if !WHITESPACE_RX.is_match(part) && !is_comment {
            tokens.push(Token {
                text:   part.to_string(),
                line,
                column,
            });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            module,
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    tokens.push(Token {
        text:   "".to_string(),
        line,
        column,
    });
    Ok(tokens)
}
