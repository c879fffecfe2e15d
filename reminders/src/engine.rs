use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

/// `<system-reminder>` wrapping tag, matching the XML-tagged convention
/// the teacher's system-reminder generator uses to keep injected context
/// visually distinct from user-authored text.
const REMINDER_OPEN_TAG: &str = "<system-reminder>";
const REMINDER_CLOSE_TAG: &str = "</system-reminder>";

const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(1);

/// Context available to a reminder generator for one turn.
pub struct ReminderContext<'a> {
    pub conversation_id: &'a str,
    pub user_text: &'a str,
}

/// One source of system-reminder content (spec §2 "Reminders / Context
/// Builder": "prompt enhancement and system-reminder injection"). Each
/// generator is independent and timeout-bounded so one slow source never
/// blocks the turn (spec §5: reminder enhancement is a suspension point
/// inside `send`, but it must not be an unbounded one).
#[async_trait]
pub trait ReminderGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `Some(text)` when this generator has something to say
    /// about the current turn, `None` otherwise.
    async fn generate(&self, ctx: &ReminderContext<'_>) -> Option<String>;
}

/// Runs every registered generator, wraps the non-empty results in the
/// `<system-reminder>` tag, and returns them in registration order (spec
/// §4.2 step 2: "producing zero or more system-reminder strings").
///
/// Order is registration order, not completion order, even though the
/// generators run concurrently — keeps prompts reproducible across runs
/// regardless of scheduling jitter.
pub struct ReminderEngine {
    generators: Vec<Arc<dyn ReminderGenerator>>,
    timeout: Duration,
}

impl ReminderEngine {
    pub fn new() -> Self {
        Self { generators: Vec::new(), timeout: DEFAULT_GENERATOR_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn register(mut self, generator: Arc<dyn ReminderGenerator>) -> Self {
        self.generators.push(generator);
        self
    }

    pub async fn enhance(&self, ctx: &ReminderContext<'_>) -> Vec<String> {
        if self.generators.is_empty() {
            return Vec::new();
        }

        let futures = self.generators.iter().map(|generator| {
            let name = generator.name().to_string();
            let timeout = self.timeout;
            async move {
                match tokio::time::timeout(timeout, generator.generate(ctx)).await {
                    Ok(Some(text)) => Some(format!("{REMINDER_OPEN_TAG}{text}{REMINDER_CLOSE_TAG}")),
                    Ok(None) => None,
                    Err(_) => {
                        warn!(generator = name, "reminder generator timed out, skipping");
                        None
                    }
                }
            }
        });

        futures::future::join_all(futures).await.into_iter().flatten().collect()
    }
}

impl Default for ReminderEngine {
    fn default() -> Self {
        Self::new()
    }
}
