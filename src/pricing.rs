//! Anthropic pricing table (§4.10): a static, case-insensitive per-model
//! rate table producing a cost breakdown from raw token counts. Only
//! Anthropic responses carry a cost; OpenAI-compatible usage events never
//! populate `cost`.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Rates are dollars per million tokens.
#[derive(Debug, Clone, Copy)]
pub struct PricingEntry {
    pub model: &'static str,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_write_per_million: f64,
    pub cache_read_per_million: f64,
}

/// Falls back to this model's rates when the observed model is unknown.
pub const FALLBACK_MODEL: &str = "claude-3-5-sonnet-20241022";

const PRICING_ROWS: &[PricingEntry] = &[
    PricingEntry {
        model: "claude-3-5-sonnet-20241022",
        input_per_million: 3.00,
        output_per_million: 15.00,
        cache_write_per_million: 3.75,
        cache_read_per_million: 0.30,
    },
    PricingEntry {
        model: "claude-3-5-sonnet-20240620",
        input_per_million: 3.00,
        output_per_million: 15.00,
        cache_write_per_million: 3.75,
        cache_read_per_million: 0.30,
    },
    PricingEntry {
        model: "claude-3-5-haiku-20241022",
        input_per_million: 1.00,
        output_per_million: 5.00,
        cache_write_per_million: 1.25,
        cache_read_per_million: 0.10,
    },
    PricingEntry {
        model: "claude-3-opus-20240229",
        input_per_million: 15.00,
        output_per_million: 75.00,
        cache_write_per_million: 18.75,
        cache_read_per_million: 1.50,
    },
    PricingEntry {
        model: "claude-3-sonnet-20240229",
        input_per_million: 3.00,
        output_per_million: 15.00,
        cache_write_per_million: 3.75,
        cache_read_per_million: 0.30,
    },
    PricingEntry {
        model: "claude-3-haiku-20240307",
        input_per_million: 0.25,
        output_per_million: 1.25,
        cache_write_per_million: 0.3125,
        cache_read_per_million: 0.025,
    },
];

static PRICING_TABLE: Lazy<HashMap<&'static str, PricingEntry>> = Lazy::new(|| {
    PRICING_ROWS.iter().map(|entry| (entry.model, *entry)).collect()
});

/// Looks up a model case-insensitively, falling back to
/// [`FALLBACK_MODEL`] when the model is unrecognized.
pub fn lookup(model: &str) -> PricingEntry {
    let lower = model.to_ascii_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&lower))
        .map(|(_, entry)| *entry)
        .unwrap_or_else(|| PRICING_TABLE[FALLBACK_MODEL])
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CostBreakdown {
    pub input_cost: Decimal,
    pub output_cost: Decimal,
    pub cache_creation_cost: Decimal,
    pub cache_read_cost: Decimal,
    pub total_cost: Decimal,
}

fn bucket_cost(tokens: u32, rate_per_million: f64) -> Decimal {
    let rate = Decimal::from_str(&format!("{:.6}", rate_per_million)).unwrap_or(Decimal::ZERO);
    let million = Decimal::from(1_000_000u32);
    (Decimal::from(tokens) * rate / million).round_dp(6)
}

/// Computes a cost breakdown for one Anthropic usage tuple in
/// fixed-point (six-decimal) arithmetic. `total_cost` is always the sum
/// of the four buckets.
pub fn cost_breakdown(
    model: &str,
    input_tokens: u32,
    output_tokens: u32,
    cache_creation_tokens: u32,
    cache_read_tokens: u32,
) -> CostBreakdown {
    let entry = lookup(model);
    let input_cost = bucket_cost(input_tokens, entry.input_per_million);
    let output_cost = bucket_cost(output_tokens, entry.output_per_million);
    let cache_creation_cost = bucket_cost(cache_creation_tokens, entry.cache_write_per_million);
    let cache_read_cost = bucket_cost(cache_read_tokens, entry.cache_read_per_million);

    CostBreakdown {
        input_cost,
        output_cost,
        cache_creation_cost,
        cache_read_cost,
        total_cost: (input_cost + output_cost + cache_creation_cost + cache_read_cost).round_dp(6),
    }
}
