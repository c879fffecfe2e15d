use kestrel_protocol::Usage;

/// Per-million-token pricing for a model, used to produce the estimated
/// (never exact, spec §1 Non-goals) cost of one completion.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub prompt_per_million_usd: f64,
    pub completion_per_million_usd: f64,
}

impl ModelPricing {
    /// A conservative placeholder rate used when the embedding
    /// application hasn't registered pricing for a model; estimated cost
    /// is advisory only (spec §1 Non-goals: "exact-cost pricing (only
    /// estimated)").
    pub const DEFAULT: ModelPricing = ModelPricing { prompt_per_million_usd: 3.0, completion_per_million_usd: 15.0 };

    pub fn estimate(&self, usage: Usage) -> f64 {
        let prompt_cost = usage.prompt_tokens as f64 / 1_000_000.0 * self.prompt_per_million_usd;
        let completion_cost = usage.completion_tokens as f64 / 1_000_000.0 * self.completion_per_million_usd;
        prompt_cost + completion_cost
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_proportional_cost() {
        let pricing = ModelPricing { prompt_per_million_usd: 1.0, completion_per_million_usd: 2.0 };
        let usage = Usage::new(1_000_000, 500_000);
        assert_eq!(pricing.estimate(usage), 2.0);
    }
}
