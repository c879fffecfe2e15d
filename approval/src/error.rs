use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval was denied")]
    Denied,
    #[error("approval wait was cancelled")]
    Aborted,
    #[error("the approval channel closed without a resolution")]
    ChannelClosed,
}
