use serde::Deserialize;

use kestrel_protocol::Usage;

/// Accepts either vocabulary a provider might use for token accounting
/// (spec §4.6) and normalises to the workspace's `Usage` shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

impl RawUsage {
    /// Prefers `prompt_tokens`/`completion_tokens`, falling back to
    /// `input_tokens`/`output_tokens` and computing the total as their
    /// sum when the backend didn't supply one directly.
    pub fn normalize(&self) -> Usage {
        let prompt = self.prompt_tokens.or(self.input_tokens).unwrap_or(0);
        let completion = self.completion_tokens.or(self.output_tokens).unwrap_or(0);
        let total = self.total_tokens.unwrap_or(prompt + completion);
        Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_prompt_completion_naming() {
        let raw = RawUsage { prompt_tokens: Some(10), completion_tokens: Some(5), ..Default::default() };
        let usage = raw.normalize();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn falls_back_to_input_output_naming() {
        let raw = RawUsage { input_tokens: Some(7), output_tokens: Some(3), ..Default::default() };
        let usage = raw.normalize();
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn respects_explicit_total_over_sum() {
        let raw = RawUsage {
            prompt_tokens: Some(10),
            completion_tokens: Some(5),
            total_tokens: Some(999),
            ..Default::default()
        };
        assert_eq!(raw.normalize().total_tokens, 999);
    }
}
