use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("summarization failed: {0}")]
    Summarize(String),
}
