use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model backend transport error: {0}")]
    Transport(String),
    #[error("model backend returned an unparseable response: {0}")]
    Protocol(String),
    #[error("this backend does not support streaming completions")]
    StreamingUnsupported,
    #[error("model completion was cancelled")]
    Aborted,
}
