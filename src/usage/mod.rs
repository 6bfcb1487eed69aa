//! Usage events and trackers (§4.11). A tracker decides whether it wants
//! to observe a given request and consumes the `UsageEvent`s the response
//! parsers emit; logging is the default (and, for now, only) sink.

use chrono::{DateTime, Utc};

use crate::pricing::CostBreakdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenMetrics {
    pub input: u32,
    pub output: u32,
    pub cached: u32,
    pub total: u32,
}

impl TokenMetrics {
    pub fn new(input: u32, output: u32, cached: u32) -> Self {
        TokenMetrics { input, output, cached, total: input + output }
    }
}

#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub request_id: String,
    pub provider: String,
    pub model: String,
    pub streaming: bool,
    pub timestamp: DateTime<Utc>,
    pub tokens: TokenMetrics,
    pub cost: Option<CostBreakdown>,
}

/// One per observable provider family. `should_track` is consulted before
/// the observer bothers wiring a parser at all; `consume` is called
/// exactly once per completed response that produced a usage event.
pub trait UsageTracker: Send + Sync {
    fn provider(&self) -> &'static str;

    fn should_track(&self, provider: &str, rest_path: &str) -> bool;

    fn consume(&self, event: UsageEvent) -> impl std::future::Future<Output = ()> + Send;
}

pub struct OpenAiCompatibleTracker;

impl UsageTracker for OpenAiCompatibleTracker {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn should_track(&self, provider: &str, rest_path: &str) -> bool {
        if !provider.eq_ignore_ascii_case("openai") {
            return false;
        }
        matches!(
            rest_path.trim_start_matches('/'),
            "v1/chat/completions" | "v1/completions" | "v1/embeddings"
        )
    }

    async fn consume(&self, event: UsageEvent) {
        tracing::info!(
            provider = %event.provider,
            model = %event.model,
            streaming = event.streaming,
            input_tokens = event.tokens.input,
            output_tokens = event.tokens.output,
            total_tokens = event.tokens.total,
            "usage event"
        );
    }
}

pub struct AnthropicTracker;

impl UsageTracker for AnthropicTracker {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    fn should_track(&self, provider: &str, rest_path: &str) -> bool {
        provider.eq_ignore_ascii_case("anthropic") && rest_path.trim_start_matches('/').contains("v1/messages")
    }

    async fn consume(&self, event: UsageEvent) {
        match &event.cost {
            Some(cost) => tracing::info!(
                provider = %event.provider,
                model = %event.model,
                streaming = event.streaming,
                input_tokens = event.tokens.input,
                output_tokens = event.tokens.output,
                total_tokens = event.tokens.total,
                total_cost = %cost.total_cost,
                "usage event"
            ),
            None => tracing::info!(
                provider = %event.provider,
                model = %event.model,
                streaming = event.streaming,
                input_tokens = event.tokens.input,
                output_tokens = event.tokens.output,
                total_tokens = event.tokens.total,
                "usage event (no cost)"
            ),
        }
    }
}
