//! Anthropic response parser (§4.9.2). Streaming events carry a `type`
//! field; usage is split across `message_start` (model + initial usage)
//! and `message_stop` (final usage), so the parser remembers the model
//! announced by the earlier event.

use serde_json::Value;

use super::{drain_lines, is_sse_done, parse_sse_data, ParsedUsage};
use crate::usage::TokenMetrics;

fn extract_usage_tuple(usage: &Value) -> Option<(u32, u32, u32, u32)> {
    let input_tokens = usage.get("input_tokens")?.as_u64()? as u32;
    let output_tokens = usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
    let cache_creation = usage
        .get("cache_creation_input_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let cache_read = usage
        .get("cache_read_input_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    Some((input_tokens, output_tokens, cache_creation, cache_read))
}

fn to_parsed_usage(model: &str, usage: &Value) -> Option<ParsedUsage> {
    let (input_tokens, output_tokens, cache_creation, cache_read) = extract_usage_tuple(usage)?;
    Some(ParsedUsage {
        model: model.to_string(),
        tokens: TokenMetrics::new(input_tokens, output_tokens, cache_read),
        cache_creation_tokens: cache_creation,
    })
}

#[derive(Default)]
pub struct AnthropicParser {
    buffer: Vec<u8>,
    pending_model: Option<String>,
}

impl AnthropicParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_non_streaming(body: &[u8]) -> Option<ParsedUsage> {
        let value: Value = serde_json::from_slice(body).ok()?;
        let model = value.get("model").and_then(Value::as_str).unwrap_or("unknown");
        let usage = value.get("usage")?;
        to_parsed_usage(model, usage)
    }

    pub fn feed_streaming(&mut self, chunk: &[u8]) -> Vec<ParsedUsage> {
        let lines = drain_lines(&mut self.buffer, chunk);
        self.process_lines(lines)
    }

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
            let value: Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => {
                    tracing::trace!(error = %e, "skipping malformed SSE frame");
                    continue;
                }
            };
            let event_type = value.get("type").and_then(Value::as_str).unwrap_or("");
            match event_type {
                "message_start" => {
                    if let Some(message) = value.get("message") {
                        let model = message.get("model").and_then(Value::as_str).unwrap_or("unknown");
                        self.pending_model = Some(model.to_string());
                        if let Some(usage) = message.get("usage") {
                            if let Some(parsed) = to_parsed_usage(model, usage) {
                                events.push(parsed);
                            }
                        }
                    }
                }
                "message_stop" => {
                    let model = self.pending_model.take().unwrap_or_else(|| "unknown".to_string());
                    if let Some(usage) = value.get("usage") {
                        if let Some(parsed) = to_parsed_usage(&model, usage) {
                            events.push(parsed);
                        }
                    }
                }
                _ => {}
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
        // §8 scenario 3.
        let body = br#"{"model":"claude-3-5-sonnet-20241022","usage":{"input_tokens":100,"output_tokens":50}}"#;
        let usage = AnthropicParser::parse_non_streaming(body).unwrap();
        assert_eq!(usage.model, "claude-3-5-sonnet-20241022");
        assert_eq!(usage.tokens.input, 100);
        assert_eq!(usage.tokens.output, 50);
        assert_eq!(usage.tokens.total, 150);
    }

    #[test]
    fn streaming_uses_model_from_message_start_at_stop() {
        let mut parser = AnthropicParser::new();
        let start = b"data: {\"type\":\"message_start\",\"message\":{\"model\":\"claude-3-opus-20240229\",\"usage\":{\"input_tokens\":10,\"output_tokens\":0}}}\n";
        let events = parser.feed_streaming(start);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].model, "claude-3-opus-20240229");

        let stop = b"data: {\"type\":\"message_stop\",\"usage\":{\"input_tokens\":10,\"output_tokens\":42}}\n";
        let events = parser.feed_streaming(stop);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].model, "claude-3-opus-20240229");
        assert_eq!(events[0].tokens.output, 42);
    }

    #[test]
    fn message_stop_without_prior_start_uses_unknown_model() {
        let mut parser = AnthropicParser::new();
        let stop = b"data: {\"type\":\"message_stop\",\"usage\":{\"input_tokens\":1,\"output_tokens\":1}}\n";
        let events = parser.feed_streaming(stop);
        assert_eq!(events[0].model, "unknown");
    }

    #[test]
    fn cache_tokens_surface_on_parsed_usage() {
        let body = br#"{"model":"claude-3-5-sonnet-20241022","usage":{"input_tokens":10,"output_tokens":5,"cache_creation_input_tokens":3,"cache_read_input_tokens":2}}"#;
        let usage = AnthropicParser::parse_non_streaming(body).unwrap();
        assert_eq!(usage.cache_creation_tokens, 3);
        assert_eq!(usage.tokens.cached, 2);
    }

    #[test]
    fn other_event_types_are_ignored() {
        let mut parser = AnthropicParser::new();
        let events = parser.feed_streaming(b"data: {\"type\":\"content_block_delta\"}\n");
        assert!(events.is_empty());
    }
}
