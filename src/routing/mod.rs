//! Provider strategy registry and router (§4.4, §4.5).

pub mod strategy;

use std::collections::HashMap;

use crate::path::ParsedPath;
use strategy::{all_strategies, Strategy};

/// Uniform outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Success {
        provider: String,
        scheme: String,
        host: String,
        target_segments: Vec<String>,
        query: String,
        extra_headers: HashMap<String, String>,
        metadata: HashMap<String, String>,
    },
    Failure {
        error: String,
    },
}

impl RouteDecision {
    pub fn success(
        provider: &str,
        scheme: &str,
        host: &str,
        target_segments: Vec<String>,
        query: &str,
    ) -> Self {
        Self::success_with_metadata(provider, scheme, host, target_segments, query, HashMap::new())
    }

    pub fn success_with_metadata(
        provider: &str,
        scheme: &str,
        host: &str,
        target_segments: Vec<String>,
        query: &str,
        mut metadata: HashMap<String, String>,
    ) -> Self {
        // Result Builder (§4.4): metadata always carries Provider, set
        // last so it wins over any caller-supplied value under that key.
        metadata.insert("Provider".to_string(), provider.to_string());

        RouteDecision::Success {
            provider: provider.to_string(),
            scheme: scheme.to_string(),
            host: host.to_string(),
            target_segments,
            query: query.to_string(),
            extra_headers: HashMap::new(),
            metadata,
        }
    }

    /// The derived target URI: `scheme://host/join('/', targetSegments)[?query]`.
    pub fn target_uri(&self) -> Option<String> {
        match self {
            RouteDecision::Success { scheme, host, target_segments, query, .. } => {
                Some(crate::path::build_target_uri(scheme, host, target_segments, query))
            }
            RouteDecision::Failure { .. } => None,
        }
    }
}

/// Case-insensitive registry mapping provider name to strategy.
pub struct Router {
    strategies: HashMap<String, Strategy>,
}

impl Router {
    /// Builds the registry from the given strategies. Fails (fatally, as
    /// spec requires) if two strategies share a lower-cased name.
    pub fn build(strategies: Vec<Strategy>) -> Result<Self, String> {
        let mut map = HashMap::with_capacity(strategies.len());
        for s in strategies {
            let key = s.name().to_ascii_lowercase();
            if map.insert(key.clone(), s).is_some() {
                return Err(format!("duplicate provider strategy registered: {key}"));
            }
        }
        Ok(Router { strategies: map })
    }

    /// Builds the registry from the full set of provider strategies this
    /// gateway knows about. Panics on duplicate registration — this runs
    /// once at process start, before serving traffic.
    pub fn with_default_strategies() -> Self {
        Router::build(all_strategies()).expect("strategy registry must not contain duplicate names")
    }

    pub fn route(&self, parsed: &ParsedPath) -> RouteDecision {
        let Some(provider) = parsed.provider() else {
            return RouteDecision::Failure {
                error: format!("Unknown provider: . Available: {}", self.available_names()),
            };
        };
        let key = provider.to_ascii_lowercase();
        match self.strategies.get(&key) {
            Some(strategy) => strategy.route(parsed),
            None => RouteDecision::Failure {
                error: format!(
                    "Unknown provider: {}. Available: {}",
                    provider,
                    self.available_names()
                ),
            },
        }
    }

    pub fn available_names(&self) -> String {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.join(", ")
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
