//! OpenAI-compatible response parser (§4.9.1). Stateful per request: the
//! streaming path retains partial SSE lines across chunk boundaries.

use serde_json::Value;

use super::{drain_lines, is_sse_done, parse_sse_data, ParsedUsage};
use crate::usage::TokenMetrics;

#[derive(Default)]
pub struct OpenAiParser {
    buffer: Vec<u8>,
}

fn extract_usage(value: &Value) -> Option<ParsedUsage> {
    let usage = value.get("usage")?;
    let prompt_tokens = usage.get("prompt_tokens")?.as_u64()? as u32;
    let completion_tokens = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
    let cached = usage
        .get("prompt_tokens_details")
        .and_then(|d| d.get("cached_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    let model = value
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Some(ParsedUsage {
        model,
        tokens: TokenMetrics::new(prompt_tokens, completion_tokens, cached),
        cache_creation_tokens: 0,
    })
}

impl OpenAiParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the whole buffered body as one JSON object.
    pub fn parse_non_streaming(body: &[u8]) -> Option<ParsedUsage> {
        let value: Value = serde_json::from_slice(body).ok()?;
        extract_usage(&value)
    }

    /// Feeds one chunk of a streaming response, returning any usage
    /// events completed lines produced. Partial lines remain buffered.
    pub fn feed_streaming(&mut self, chunk: &[u8]) -> Vec<ParsedUsage> {
        let lines = drain_lines(&mut self.buffer, chunk);
        self.process_lines(lines)
    }

    /// Processes a terminal partial frame at stream close, per §4.9.3.
    pub fn finish(&mut self) -> Vec<ParsedUsage> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let leftover = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        if leftover.starts_with("data:") {
            self.process_lines(vec![leftover])
        } else {
            Vec::new()
        }
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Vec<ParsedUsage> {
        let mut events = Vec::new();
        for line in lines {
            let Some(data) = parse_sse_data(&line) else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() || is_sse_done(data) {
                continue;
            }
            match serde_json::from_str::<Value>(data) {
                Ok(value) => {
                    if let Some(usage) = extract_usage(&value) {
                        events.push(usage);
                    }
                }
                Err(e) => tracing::trace!(error = %e, "skipping malformed SSE frame"),
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_streaming_extracts_usage() {
        let body = br#"{"model":"gpt-4","usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let usage = OpenAiParser::parse_non_streaming(body).unwrap();
        assert_eq!(usage.model, "gpt-4");
        assert_eq!(usage.tokens.input, 10);
        assert_eq!(usage.tokens.output, 5);
        assert_eq!(usage.tokens.total, 15);
    }

    #[test]
    fn non_streaming_missing_usage_returns_none() {
        let body = br#"{"model":"gpt-4"}"#;
        assert!(OpenAiParser::parse_non_streaming(body).is_none());
    }

    #[test]
    fn streaming_done_sentinel_never_triggers_event() {
        let mut parser = OpenAiParser::new();
        let events = parser.feed_streaming(b"data: [DONE]\n");
        assert!(events.is_empty());
    }

    #[test]
    fn spec_scenario_streaming_usage() {
        // §8 scenario 4.
        let mut parser = OpenAiParser::new();
        let chunk = b"data: {\"id\":\"x\",\"model\":\"gpt-4\",\"usage\":{\"prompt_tokens\":15,\"completion_tokens\":87,\"total_tokens\":102}}\n\ndata: [DONE]\n\n";
        let events = parser.feed_streaming(chunk);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tokens.input, 15);
        assert_eq!(events[0].tokens.output, 87);
    }

    #[test]
    fn partial_frame_split_across_writes_yields_one_event() {
        let mut parser = OpenAiParser::new();
        let mut events = parser.feed_streaming(b"data: {\"usage\":{\"prompt_tokens\":3,");
        assert!(events.is_empty());
        events = parser.feed_streaming(b"\"completion_tokens\":5}}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tokens.input, 3);
        assert_eq!(events[0].tokens.output, 5);
    }

    #[test]
    fn terminal_partial_frame_processed_on_close() {
        let mut parser = OpenAiParser::new();
        let events = parser.feed_streaming(b"data: {\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":2}}");
        assert!(events.is_empty());
        let finished = parser.finish();
        assert_eq!(finished.len(), 1);
    }

    #[test]
    fn malformed_json_frame_is_skipped() {
        let mut parser = OpenAiParser::new();
        let events = parser.feed_streaming(b"data: {not json}\ndata: {\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":1}}\n");
        assert_eq!(events.len(), 1);
    }
}
