//! Provider strategies: pure functions from a `ParsedPath` to a
//! `RouteDecision`. Each strategy is one of three shapes (§4.5):
//!
//! - Transparent: fixed host, `rest` forwarded verbatim.
//! - Prefixed: fixed host, a constant segment prepended to `rest`.
//! - Templated: consumes leading `rest` segments to build host/path.
//!
//! Strategies never touch the body and never inject authorization —
//! end-user credentials flow through untouched.

use std::collections::HashMap;

use super::RouteDecision;
use crate::path::ParsedPath;

/// Default scheme for outbound requests. The source hard-codes `https`;
/// this keeps it overridable per strategy for future non-HTTPS upstreams.
pub const DEFAULT_SCHEME: &str = "https";

#[derive(Debug, Clone)]
pub enum Strategy {
    Transparent { name: &'static str, host: &'static str },
    Prefixed { name: &'static str, host: &'static str, prefix: &'static str },
    AwsBedrock,
    AzureOpenAi,
    GoogleVertexAi,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Transparent { name, .. } => name,
            Strategy::Prefixed { name, .. } => name,
            Strategy::AwsBedrock => "aws-bedrock",
            Strategy::AzureOpenAi => "azure-openai",
            Strategy::GoogleVertexAi => "google-vertex-ai",
        }
    }

    pub fn route(&self, parsed: &ParsedPath) -> RouteDecision {
        match self {
            Strategy::Transparent { name, host } => {
                RouteDecision::success(name, DEFAULT_SCHEME, host, parsed.rest().to_vec(), &parsed.query)
            }
            Strategy::Prefixed { name, host, prefix } => {
                let mut target = Vec::with_capacity(parsed.rest().len() + 1);
                target.push((*prefix).to_string());
                target.extend_from_slice(parsed.rest());
                RouteDecision::success(name, DEFAULT_SCHEME, host, target, &parsed.query)
            }
            Strategy::AwsBedrock => route_aws_bedrock(parsed),
            Strategy::AzureOpenAi => route_azure_openai(parsed),
            Strategy::GoogleVertexAi => route_google_vertex_ai(parsed),
        }
    }
}

fn route_aws_bedrock(parsed: &ParsedPath) -> RouteDecision {
    let rest = parsed.rest();
    if rest.len() < 2 {
        return RouteDecision::Failure {
            error: "aws-bedrock requires at least runtime and region".to_string(),
        };
    }
    let runtime = &rest[0];
    let region = &rest[1];
    let host = format!("{}.{}.amazonaws.com", runtime, region);
    let target_segments = rest[2..].to_vec();

    let mut metadata = HashMap::new();
    metadata.insert("Runtime".to_string(), runtime.clone());
    metadata.insert("Region".to_string(), region.clone());

    RouteDecision::success_with_metadata(
        "aws-bedrock",
        DEFAULT_SCHEME,
        &host,
        target_segments,
        &parsed.query,
        metadata,
    )
}

fn route_azure_openai(parsed: &ParsedPath) -> RouteDecision {
    let rest = parsed.rest();
    if rest.len() < 2 {
        return RouteDecision::Failure {
            error: "azure-openai requires at least resource and deployment".to_string(),
        };
    }
    let resource = &rest[0];
    let deployment = &rest[1];
    let host = format!("{}.openai.azure.com", resource);

    let mut target_segments = vec![
        "openai".to_string(),
        "deployments".to_string(),
        deployment.clone(),
    ];
    target_segments.extend_from_slice(&rest[2..]);

    let mut metadata = HashMap::new();
    metadata.insert("ResourceName".to_string(), resource.clone());
    metadata.insert("DeploymentName".to_string(), deployment.clone());

    RouteDecision::success_with_metadata(
        "azure-openai",
        DEFAULT_SCHEME,
        &host,
        target_segments,
        &parsed.query,
        metadata,
    )
}

fn route_google_vertex_ai(parsed: &ParsedPath) -> RouteDecision {
    let rest = parsed.rest();
    if rest.len() < 4 {
        return RouteDecision::Failure {
            error: "google-vertex-ai requires at least projects/{id}/locations/{location}".to_string(),
        };
    }
    // rest: ["projects", projectId, "locations", location, ...]
    let project_id = &rest[1];
    let location = &rest[3];
    let host = format!("{}-aiplatform.googleapis.com", location);

    let mut target_segments = vec![
        "v1".to_string(),
        "projects".to_string(),
        project_id.clone(),
        "locations".to_string(),
        location.clone(),
    ];
    target_segments.extend_from_slice(&rest[4..]);

    RouteDecision::success(
        "google-vertex-ai",
        DEFAULT_SCHEME,
        &host,
        target_segments,
        &parsed.query,
    )
}

/// Every registered strategy, in the explicit order startup registers
/// them. Reflection-based discovery is replaced with this auditable list
/// (§9 DESIGN NOTES); two strategies sharing a name is an initialization
/// error, caught by `Router::build`.
pub fn all_strategies() -> Vec<Strategy> {
    vec![
        Strategy::Transparent { name: "openai", host: "api.openai.com" },
        Strategy::Transparent { name: "anthropic", host: "api.anthropic.com" },
        Strategy::Transparent { name: "groq", host: "api.groq.com" },
        Strategy::Transparent { name: "mistral", host: "api.mistral.ai" },
        // The source carries two duplicate DeepSeek strategies
        // (`DeepseekStrategy`/`DeepSeekStrategy`); only one is registered here.
        Strategy::Transparent { name: "deepseek", host: "api.deepseek.com" },
        Strategy::Transparent { name: "perplexity", host: "api.perplexity.ai" },
        Strategy::Transparent { name: "cohere", host: "api.cohere.ai" },
        Strategy::Transparent { name: "together", host: "api.together.xyz" },
        Strategy::Transparent { name: "elevenlabs", host: "api.elevenlabs.io" },
        Strategy::Transparent { name: "replicate", host: "api.replicate.com" },
        Strategy::Transparent { name: "xai", host: "api.x.ai" },
        Strategy::Transparent { name: "cerebras", host: "api.cerebras.ai" },
        Strategy::Transparent { name: "ai21", host: "api.ai21.com" },
        Strategy::Transparent { name: "huggingface", host: "api-inference.huggingface.co" },
        Strategy::Transparent { name: "voyage", host: "api.voyageai.com" },
        Strategy::Transparent { name: "fal", host: "queue.fal.run" },
        Strategy::Transparent { name: "stability", host: "api.stability.ai" },
        Strategy::Transparent { name: "assemblyai", host: "api.assemblyai.com" },
        Strategy::Transparent { name: "deepgram", host: "api.deepgram.com" },
        Strategy::Transparent { name: "novita", host: "api.novita.ai" },
        Strategy::Prefixed { name: "openrouter", host: "openrouter.ai", prefix: "api" },
        Strategy::Prefixed { name: "fireworks", host: "api.fireworks.ai", prefix: "inference" },
        Strategy::AwsBedrock,
        Strategy::AzureOpenAi,
        Strategy::GoogleVertexAi,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_preserves_rest() {
        let parsed = ParsedPath::parse("/openai/a/b/c", "");
        let s = Strategy::Transparent { name: "openai", host: "api.openai.com" };
        match s.route(&parsed) {
            RouteDecision::Success { host, target_segments, .. } => {
                assert_eq!(host, "api.openai.com");
                assert_eq!(target_segments, vec!["a", "b", "c"]);
            }
            RouteDecision::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn prefixed_prepends_constant_segment() {
        let parsed = ParsedPath::parse("/openrouter/chat/completions", "");
        let s = Strategy::Prefixed { name: "openrouter", host: "openrouter.ai", prefix: "api" };
        match s.route(&parsed) {
            RouteDecision::Success { target_segments, .. } => {
                assert_eq!(target_segments, vec!["api", "chat", "completions"]);
            }
            RouteDecision::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn bedrock_rewrite_consumes_runtime_and_region() {
        let parsed = ParsedPath::parse(
            "/aws-bedrock/bedrock-runtime/us-east-1/model/claude-3-sonnet/invoke",
            "",
        );
        match Strategy::AwsBedrock.route(&parsed) {
            RouteDecision::Success { host, target_segments, metadata, .. } => {
                assert_eq!(host, "bedrock-runtime.us-east-1.amazonaws.com");
                assert_eq!(target_segments, vec!["model", "claude-3-sonnet", "invoke"]);
                assert_eq!(metadata.get("Runtime").map(String::as_str), Some("bedrock-runtime"));
                assert_eq!(metadata.get("Region").map(String::as_str), Some("us-east-1"));
            }
            RouteDecision::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn bedrock_rejects_short_path() {
        let parsed = ParsedPath::parse("/aws-bedrock/only-runtime", "");
        match Strategy::AwsBedrock.route(&parsed) {
            RouteDecision::Failure { error } => assert!(error.contains("runtime and region")),
            RouteDecision::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn azure_rewrite_inserts_openai_deployments() {
        let parsed = ParsedPath::parse("/azure-openai/myres/mydep/chat/completions", "api-version=2024-02-01");
        match Strategy::AzureOpenAi.route(&parsed) {
            RouteDecision::Success { host, target_segments, query, .. } => {
                assert_eq!(host, "myres.openai.azure.com");
                assert_eq!(target_segments, vec!["openai", "deployments", "mydep", "chat", "completions"]);
                assert_eq!(query, "api-version=2024-02-01");
            }
            RouteDecision::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn vertex_ai_rewrite() {
        let parsed = ParsedPath::parse(
            "/google-vertex-ai/projects/my-proj/locations/us-central1/publishers/google/models/gemini-pro:generateContent",
            "",
        );
        match Strategy::GoogleVertexAi.route(&parsed) {
            RouteDecision::Success { host, target_segments, .. } => {
                assert_eq!(host, "us-central1-aiplatform.googleapis.com");
                assert_eq!(
                    target_segments,
                    vec![
                        "v1", "projects", "my-proj", "locations", "us-central1",
                        "publishers", "google", "models", "gemini-pro:generateContent"
                    ]
                );
            }
            RouteDecision::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[test]
    fn no_duplicate_names_among_registered_strategies() {
        let mut seen = std::collections::HashSet::new();
        for s in all_strategies() {
            assert!(seen.insert(s.name()), "duplicate strategy name: {}", s.name());
        }
    }
}
