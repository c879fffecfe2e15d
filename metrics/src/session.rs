use std::time::Duration;

use kestrel_protocol::Usage;

/// Width, in fraction-of-context-window terms, of one rate-limit bucket
/// for context-window warnings (spec §4.7: "at most one warning per 5%
/// change").
const WARNING_BUCKET_WIDTH: f64 = 0.05;
const WARNING_THRESHOLD: f64 = 0.85;
const AUTO_SUMMARY_THRESHOLD: f64 = 0.95;

/// Outcome of `SessionMetrics::check_context_window_usage` (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextWindowStatus {
    Ok,
    Warning { usage_fraction: f64 },
    AutoSummaryNeeded { usage_fraction: f64 },
}

/// Per-session counters (spec §4.7): total prompt/completion tokens, the
/// most recent prompt-token count (what context-window checks key off
/// of), estimated cumulative cost, and call counts.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub last_prompt_tokens: u64,
    pub estimated_cost_usd: f64,
    pub tool_call_count: u64,
    pub llm_call_count: u64,
    pub last_request_time: Duration,
    last_warned_bucket: Option<u64>,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            total_prompt_tokens: 0,
            total_completion_tokens: 0,
            last_prompt_tokens: 0,
            estimated_cost_usd: 0.0,
            tool_call_count: 0,
            llm_call_count: 0,
            last_request_time: Duration::ZERO,
            last_warned_bucket: None,
        }
    }

    pub fn record_usage(&mut self, usage: Usage, cost_usd: f64, request_time: Duration) {
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;
        self.last_prompt_tokens = usage.prompt_tokens;
        self.estimated_cost_usd += cost_usd;
        self.llm_call_count += 1;
        self.last_request_time = request_time;
    }

    pub fn record_tool_calls(&mut self, count: u64) {
        self.tool_call_count += count;
    }

    /// Resets every counter, called after auto-summary replaces or
    /// forks the session's history (spec §4.7).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Evaluates `last_prompt_tokens` against `context_window` and
    /// decides whether a warning or an auto-summary should fire (spec
    /// §4.7, §8 boundary behaviors). A `context_window` of zero is
    /// treated as "unknown limit" and never triggers either.
    pub fn check_context_window_usage(&mut self, context_window: u64) -> ContextWindowStatus {
        if context_window == 0 {
            return ContextWindowStatus::Ok;
        }
        let usage_fraction = self.last_prompt_tokens as f64 / context_window as f64;

        if usage_fraction >= AUTO_SUMMARY_THRESHOLD {
            self.last_warned_bucket = None;
            return ContextWindowStatus::AutoSummaryNeeded { usage_fraction };
        }

        if usage_fraction >= WARNING_THRESHOLD {
            let bucket = (usage_fraction / WARNING_BUCKET_WIDTH).floor() as u64;
            if self.last_warned_bucket != Some(bucket) {
                self.last_warned_bucket = Some(bucket);
                return ContextWindowStatus::Warning { usage_fraction };
            }
            return ContextWindowStatus::Ok;
        }

        self.last_warned_bucket = None;
        ContextWindowStatus::Ok
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with_prompt_tokens(tokens: u64) -> SessionMetrics {
        let mut metrics = SessionMetrics::new();
        metrics.record_usage(Usage::new(tokens, 0), 0.0, Duration::ZERO);
        metrics
    }

    #[test]
    fn below_warning_threshold_is_ok() {
        let mut metrics = metrics_with_prompt_tokens(849);
        assert_eq!(metrics.check_context_window_usage(1000), ContextWindowStatus::Ok);
    }

    #[test]
    fn just_above_threshold_warns() {
        let mut metrics = metrics_with_prompt_tokens(851);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::Warning { .. }));
    }

    #[test]
    fn just_below_auto_summary_still_warns() {
        let mut metrics = metrics_with_prompt_tokens(949);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::Warning { .. }));
    }

    #[test]
    fn at_auto_summary_threshold_triggers() {
        let mut metrics = metrics_with_prompt_tokens(951);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::AutoSummaryNeeded { .. }));
    }

    #[test]
    fn repeated_check_in_same_bucket_does_not_rewarn() {
        let mut metrics = metrics_with_prompt_tokens(860);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::Warning { .. }));
        assert_eq!(metrics.check_context_window_usage(1000), ContextWindowStatus::Ok);
    }

    #[test]
    fn crossing_a_bucket_rewarns() {
        let mut metrics = metrics_with_prompt_tokens(860);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::Warning { .. }));
        // A later request reports a higher prompt-token count, crossing
        // into the next 5% bucket.
        metrics.record_usage(Usage::new(900, 0), 0.0, Duration::ZERO);
        assert!(matches!(metrics.check_context_window_usage(1000), ContextWindowStatus::Warning { .. }));
    }

    #[test]
    fn reset_clears_every_counter() {
        let mut metrics = metrics_with_prompt_tokens(951);
        metrics.record_tool_calls(3);
        metrics.reset();
        assert_eq!(metrics.total_prompt_tokens, 0);
        assert_eq!(metrics.tool_call_count, 0);
        assert_eq!(metrics.check_context_window_usage(1000), ContextWindowStatus::Ok);
    }
}
