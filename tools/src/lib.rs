//! Tool registration, parameter validation, and bounded-concurrency
//! execution for the Kestrel agent runtime (spec §4.3).

mod error;
mod registry;
mod spec;
mod tool;
mod validation;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use registry::TODO_MANAGEMENT_TOOL;
pub use spec::ToolSpec;
pub use tool::Tool;
pub use tool::ToolContext;
pub use validation::validate_arguments;
