//! Session token/cost accounting and context-window auto-summary
//! triggering (spec §4.7).

mod cost;
mod error;
mod limits;
mod session;
mod summarizer;

pub use cost::ModelPricing;
pub use error::MetricsError;
pub use limits::ModelLimitsCache;
pub use limits::DEFAULT_CONTEXT_WINDOW;
pub use session::ContextWindowStatus;
pub use session::SessionMetrics;
pub use summarizer::Summarizer;
