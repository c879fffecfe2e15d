use dashmap::DashMap;

/// Default context window used when a provider/model pair has no entry
/// in the cache (spec §4.7).
pub const DEFAULT_CONTEXT_WINDOW: u64 = 128_000;

/// Per-provider cache of model context-window sizes (spec §4.7: "Look up
/// the model's `contextWindow` (from a per-provider limits cache; fall
/// back to a default of 128,000 if absent)").
#[derive(Debug, Default)]
pub struct ModelLimitsCache {
    windows: DashMap<(String, String), u64>,
}

impl ModelLimitsCache {
    pub fn new() -> Self {
        Self { windows: DashMap::new() }
    }

    pub fn register(&self, provider: impl Into<String>, model: impl Into<String>, context_window: u64) {
        self.windows.insert((provider.into(), model.into()), context_window);
    }

    pub fn context_window(&self, provider: &str, model: &str) -> u64 {
        self.windows.get(&(provider.to_string(), model.to_string())).map(|entry| *entry).unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_absent() {
        let cache = ModelLimitsCache::new();
        assert_eq!(cache.context_window("openai", "gpt-5"), DEFAULT_CONTEXT_WINDOW);
    }

    #[test]
    fn returns_registered_window() {
        let cache = ModelLimitsCache::new();
        cache.register("anthropic", "claude", 200_000);
        assert_eq!(cache.context_window("anthropic", "claude"), 200_000);
        assert_eq!(cache.context_window("anthropic", "other-model"), DEFAULT_CONTEXT_WINDOW);
    }
}
