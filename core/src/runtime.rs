use std::collections::HashMap;
use std::sync::Arc;

use kestrel_metrics::{ModelLimitsCache, ModelPricing, Summarizer};
use kestrel_model::ModelBackend;
use kestrel_protocol::AgentConfig;
use kestrel_reminders::ReminderEngine;
use kestrel_tools::ToolRegistry;

/// The process-wide dependencies every `Orchestrator` instance shares:
/// the tool registry, the model backend, the reminder engine, and the
/// bookkeeping `kestrel-metrics` needs (spec §5: "Multiple orchestrators
/// may run concurrently within the same process; they share Tool
/// Registry and ModelBackend instances but hold distinct Memory,
/// EventPort, and metrics").
///
/// Constructed once at startup by the embedding application and handed
/// to every `Orchestrator::new` call (spec §9 design notes: "an explicit
/// Runtime value constructed at startup, passed to command handlers" —
/// no global singleton).
pub struct Runtime {
    pub tools: Arc<ToolRegistry>,
    pub model: Arc<dyn ModelBackend>,
    pub reminders: Arc<ReminderEngine>,
    pub limits: Arc<ModelLimitsCache>,
    pub pricing: ModelPricing,
    pub summarizer: Option<Arc<dyn Summarizer>>,
    /// Name of the vendor behind `model`, used only as the first half of
    /// `ModelLimitsCache`'s `(provider, model)` lookup key (spec §4.7).
    /// Auth and wire format for that vendor are out of scope (spec §1);
    /// this is just a label.
    pub provider: String,
    /// Named `AgentConfig` profiles a delegation tool can spawn (spec
    /// §4.5); keyed by the agent name a caller passes to the delegation
    /// tool's `agent` parameter.
    pub subagent_profiles: Arc<HashMap<String, AgentConfig>>,
}

impl Runtime {
    pub fn new(provider: impl Into<String>, model: Arc<dyn ModelBackend>) -> Self {
        Self {
            tools: Arc::new(ToolRegistry::new()),
            model,
            reminders: Arc::new(ReminderEngine::new()),
            limits: Arc::new(ModelLimitsCache::new()),
            pricing: ModelPricing::default(),
            summarizer: None,
            provider: provider.into(),
            subagent_profiles: Arc::new(HashMap::new()),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_reminders(mut self, reminders: Arc<ReminderEngine>) -> Self {
        self.reminders = reminders;
        self
    }

    pub fn with_limits(mut self, limits: Arc<ModelLimitsCache>) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_subagent_profiles(mut self, profiles: HashMap<String, AgentConfig>) -> Self {
        self.subagent_profiles = Arc::new(profiles);
        self
    }
}
