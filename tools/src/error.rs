use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool '{0}' is not registered")]
    NotFound(String),
    #[error("failed to persist registered tool names to {path}: {source}")]
    Persist { path: String, #[source] source: std::io::Error },
    #[error("failed to read persisted tool names from {path}: {source}")]
    Load { path: String, #[source] source: std::io::Error },
    #[error("failed to (de)serialize tool state: {0}")]
    Serde(#[from] serde_json::Error),
}
