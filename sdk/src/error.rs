use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 in byte vector: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("No declaration \"{0}\" in AST map")]
    MissingDecl(String),
}
