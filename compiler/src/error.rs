use std::fmt;
use thiserror::Error;

/// Where a semantic error was found: module, declaration, and optionally the
/// field / alternative / type parameter inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub module: String,
    pub decl:   Option<String>,
    pub member: Option<String>,
}

impl Location {
    pub fn module(module: &str) -> Self {
        Location { module: module.to_string(), decl: None, member: None }
    }

    pub fn decl(module: &str, decl: &str) -> Self {
        Location { module: module.to_string(), decl: Some(decl.to_string()), member: None }
    }

    pub fn member(module: &str, decl: &str, member: &str) -> Self {
        Location {
            module: module.to_string(),
            decl:   Some(decl.to_string()),
            member: Some(member.to_string()),
        }
    }

    pub fn with_member(&self, member: &str) -> Self {
        Location { member: Some(member.to_string()), ..self.clone() }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module)?;
        if let Some(decl) = &self.decl {
            write!(f, ".{}", decl)?;
        }
        if let Some(member) = &self.member {
            write!(f, "::{}", member)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AdlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error in {module} at line {line}, column {column}: {msg}")]
    ParseError {
        module: String,
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("{location}: unknown reference \"{name}\"")]
    UnknownReference { location: Location, name: String },

    #[error("{location}: ambiguous reference \"{name}\" (candidates: {})", .candidates.join(", "))]
    AmbiguousReference {
        location:   Location,
        name:       String,
        candidates: Vec<String>,
    },

    #[error("Cyclic module import: {}", .cycle.join(" -> "))]
    CyclicModuleImport { cycle: Vec<String> },

    #[error("{location}: \"{name}\" expects {expected} type argument(s) but was given {found}")]
    ArityError {
        location: Location,
        name:     String,
        expected: usize,
        found:    usize,
    },

    #[error("{location}: infinite expansion of type alias \"{name}\"")]
    InfiniteAliasExpansion { location: Location, name: String },

    #[error("{location}: invalid default value{}: {msg}", path_suffix(.path))]
    DefaultTypeError {
        location: Location,
        path:     String,
        msg:      String,
    },

    #[error("{location}: declaration \"{name}\" is defined twice")]
    DuplicateDeclarationName { location: Location, name: String },

    #[error("{location}: \"{name}\" is defined twice")]
    DuplicateFieldOrAlternativeName { location: Location, name: String },

    #[error("Module \"{0}\" is defined twice")]
    DuplicateModule(String),

    #[error("Module \"{0}\" not found on the search path")]
    ModuleNotFound(String),

    #[error("Unknown target language \"{0}\"")]
    UnknownTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{} error(s):\n{}", .0.len(), join_errors(.0))]
    Compilation(Vec<AdlError>),
}

fn path_suffix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at {}", path)
    }
}

fn join_errors(errors: &[AdlError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AdlError {
    /// Flattens `Compilation` wrappers into the individual errors.
    pub fn into_errors(self) -> Vec<AdlError> {
        match self {
            AdlError::Compilation(errors) => {
                errors.into_iter().flat_map(AdlError::into_errors).collect()
            }
            other => vec![other],
        }
    }

    pub fn from_errors(mut errors: Vec<AdlError>) -> AdlError {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            AdlError::Compilation(errors)
        }
    }
}
