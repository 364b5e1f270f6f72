use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown diagram type: {found}")]
    UnknownDiagram { found: String },

    #[error("no diagram found: input has no diagram keyword and no ```mermaid block")]
    NoDiagram,

    #[error("diagram has nothing to draw")]
    EmptyDiagram,

    #[error("unknown theme `{name}` (available: {available})")]
    UnknownTheme { name: String, available: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
