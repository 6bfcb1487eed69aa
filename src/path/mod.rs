//! Splits an inbound URL path into the ordered segments the router and
//! strategies operate on.

pub mod builder;
pub mod validator;

pub use builder::{build, build_target_uri};
pub use validator::{matches_pattern, min_segments, not_empty};

/// A parsed inbound request path. Pure and infallible: `/a//b/` and `/a/b`
/// parse identically, and no input produces a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub original: String,
    pub segments: Vec<String>,
    pub query: String,
}

impl ParsedPath {
    /// Splits `raw_path` on `/`, discarding empty segments, and pairs it
    /// with `raw_query` (leading `?` is not expected and not stripped here).
    pub fn parse(raw_path: &str, raw_query: &str) -> Self {
        let segments = raw_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        ParsedPath {
            original: raw_path.to_string(),
            segments,
            query: raw_query.to_string(),
        }
    }

    /// First path segment, the provider selector. Empty for `/` or `""`.
    pub fn provider(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    /// Every segment after the provider selector.
    pub fn rest(&self) -> &[String] {
        if self.segments.is_empty() {
            &[]
        } else {
            &self.segments[1..]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elides_empty_segments() {
        let p = ParsedPath::parse("/a//b/", "");
        assert_eq!(p.segments, vec!["a", "b"]);
    }

    #[test]
    fn double_slash_matches_single_slash() {
        let a = ParsedPath::parse("/a//b/", "");
        let b = ParsedPath::parse("/a/b", "");
        assert_eq!(a.segments, b.segments);
    }

    #[test]
    fn idempotent_on_rebuilt_path() {
        let p = ParsedPath::parse("/openai/v1/chat/completions", "foo=bar");
        let rebuilt = build(&p.segments, &p.query);
        let reparsed = ParsedPath::parse(&rebuilt, &p.query);
        assert_eq!(p.segments, reparsed.segments);
    }

    #[test]
    fn provider_and_rest_split_correctly() {
        let p = ParsedPath::parse("/openai/v1/chat/completions", "");
        assert_eq!(p.provider(), Some("openai"));
        assert_eq!(p.rest(), &["v1", "chat", "completions"]);
    }

    #[test]
    fn empty_path_has_no_provider() {
        let p = ParsedPath::parse("/", "");
        assert_eq!(p.provider(), None);
        assert!(p.rest().is_empty());
    }
}
