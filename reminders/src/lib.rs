//! Prompt enhancement and provider-message assembly (spec §2 "Reminders /
//! Context Builder").

mod context;
mod engine;

pub use context::ContextBuilder;
pub use engine::ReminderContext;
pub use engine::ReminderEngine;
pub use engine::ReminderGenerator;
