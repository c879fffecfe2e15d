use std::collections::HashMap;

use kestrel_protocol::ToolCall;

/// One fragment of a tool call as it arrives over a streaming response.
/// Providers disagree on which of `id`/`index` they send per chunk (spec
/// §4.6); all three addressing modes are handled by `ToolCallAccumulator`.
#[derive(Debug, Clone, Default)]
pub struct ToolCallFragment {
    pub id: Option<String>,
    pub index: Option<usize>,
    pub name: Option<String>,
    pub arguments_delta: String,
}

/// Merges streamed tool-call fragments into complete `ToolCall`s.
///
/// A small id/index-keyed state machine (spec §9 design notes), not a
/// mutable accumulator indexed by position alone: fragments key on `id`
/// when present, fall back to positional `index`, and fall back further
/// to "continue the most recently touched call" when a fragment carries
/// neither. `arguments` is concatenated verbatim — never re-parsed until
/// a single JSON decode at execution time (spec §3, §4.6).
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<ToolCall>,
    by_id: HashMap<String, usize>,
    by_index: HashMap<usize, usize>,
    last_touched: Option<usize>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, fragment: ToolCallFragment) {
        let slot = self.resolve_slot(&fragment);
        self.last_touched = Some(slot);

        if let Some(name) = fragment.name {
            if self.calls[slot].name.is_empty() {
                self.calls[slot].name = name;
            }
        }
        self.calls[slot].arguments.push_str(&fragment.arguments_delta);
    }

    fn resolve_slot(&mut self, fragment: &ToolCallFragment) -> usize {
        if let Some(id) = &fragment.id {
            if let Some(&slot) = self.by_id.get(id) {
                return slot;
            }
            return self.push_new(Some(id.clone()), fragment.index);
        }
        if let Some(index) = fragment.index {
            if let Some(&slot) = self.by_index.get(&index) {
                return slot;
            }
            return self.push_new(None, Some(index));
        }
        if let Some(slot) = self.last_touched {
            return slot;
        }
        self.push_new(None, None)
    }

    fn push_new(&mut self, id: Option<String>, index: Option<usize>) -> usize {
        let slot = self.calls.len();
        let call_id = id.clone().unwrap_or_else(kestrel_protocol::new_id);
        self.calls.push(ToolCall { id: call_id, name: String::new(), arguments: String::new() });
        if let Some(id) = id {
            self.by_id.insert(id, slot);
        }
        if let Some(index) = index {
            self.by_index.insert(index, slot);
        }
        slot
    }

    /// Consumes the accumulator, returning the completed tool calls in
    /// first-seen order.
    pub fn finish(self) -> Vec<ToolCall> {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(id: Option<&str>, index: Option<usize>, name: Option<&str>, args: &str) -> ToolCallFragment {
        ToolCallFragment {
            id: id.map(str::to_string),
            index,
            name: name.map(str::to_string),
            arguments_delta: args.to_string(),
        }
    }

    #[test]
    fn merges_by_id() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(frag(Some("call_1"), None, Some("reverse_text"), "{\"te"));
        acc.merge(frag(Some("call_1"), None, None, "xt\":\"abc\"}"));
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "reverse_text");
        assert_eq!(calls[0].arguments, "{\"text\":\"abc\"}");
    }

    #[test]
    fn merges_by_index_when_id_absent() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(frag(None, Some(0), Some("tool_a"), "{\"a\":"));
        acc.merge(frag(None, Some(1), Some("tool_b"), "{\"b\":"));
        acc.merge(frag(None, Some(0), None, "1}"));
        acc.merge(frag(None, Some(1), None, "2}"));
        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "tool_a");
        assert_eq!(calls[0].arguments, "{\"a\":1}");
        assert_eq!(calls[1].name, "tool_b");
        assert_eq!(calls[1].arguments, "{\"b\":2}");
    }

    #[test]
    fn falls_back_to_most_recently_touched_when_untagged() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(frag(Some("call_1"), None, Some("shell"), "{\"cmd\":\""));
        acc.merge(frag(None, None, None, "ls -la\"}"));
        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, "{\"cmd\":\"ls -la\"}");
    }

    #[test]
    fn distinct_ids_produce_distinct_calls_in_first_seen_order() {
        let mut acc = ToolCallAccumulator::new();
        acc.merge(frag(Some("b"), None, Some("second"), "{}"));
        acc.merge(frag(Some("a"), None, Some("first"), "{}"));
        let calls = acc.finish();
        assert_eq!(calls[0].name, "second");
        assert_eq!(calls[1].name, "first");
    }
}
