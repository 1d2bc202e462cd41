use thiserror::Error;

/// Failure to parse a CSS value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid color `{0}`")]
    InvalidColor(String),
    #[error("invalid gradient `{0}`")]
    InvalidGradient(String),
}

/// Failure to load catalog, config or project data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("duplicate template id `{0}`")]
    DuplicateTemplate(String),
}
