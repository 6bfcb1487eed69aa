//! Reassembles target paths and origin URIs from segments. No
//! URL-encoding is applied — upstream hosts receive segments verbatim,
//! matching how the strategies hand them off.

pub fn build(segments: &[String], query: &str) -> String {
    let mut path = format!("/{}", segments.join("/"));
    if !query.is_empty() {
        path.push('?');
        path.push_str(query.strip_prefix('?').unwrap_or(query));
    }
    path
}

pub fn build_target_uri(scheme: &str, host: &str, segments: &[String], query: &str) -> String {
    format!("{}://{}{}", scheme, host, build(segments, query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_joins_with_leading_slash() {
        let segs = vec!["v1".to_string(), "chat".to_string()];
        assert_eq!(build(&segs, ""), "/v1/chat");
    }

    #[test]
    fn build_appends_query_stripping_leading_question_mark() {
        let segs = vec!["v1".to_string()];
        assert_eq!(build(&segs, "?a=b"), "/v1?a=b");
        assert_eq!(build(&segs, "a=b"), "/v1?a=b");
    }

    #[test]
    fn build_target_uri_concatenates() {
        let segs = vec!["v1".to_string(), "chat".to_string()];
        assert_eq!(
            build_target_uri("https", "api.openai.com", &segs, ""),
            "https://api.openai.com/v1/chat"
        );
    }
}
