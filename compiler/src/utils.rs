use crate::error::AdlError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(module: &str, msg: &str, line: usize, column: usize) -> AdlError {
    AdlError::ParseError {
        module: module.to_string(),
        msg:    msg.to_string(),
        line,
        column,
    }
}

/// Converts a string to PascalCase.
/// - If the string contains underscores, it splits on underscores and upper-cases the first
///   letter of each word, keeping the rest of the word as written.
/// - Otherwise, it only upper-cases the first letter.
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
     .filter(|word| !word.is_empty())
     .map(|word| {
         let mut chars = word.chars();
         match chars.next() {
             None => String::new(),
             Some(first) => first.to_uppercase().to_string() + chars.as_str(),
         }
     })
     .collect::<String>()
}

/// Converts a string to snake_case.
/// This implementation avoids inserting underscores between consecutive uppercase letters,
/// so that acronyms remain intact (e.g. "sessionID" becomes "session_id").
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_' && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase())) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}
