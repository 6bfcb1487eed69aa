//! Predicate helpers shared by provider strategies when they validate
//! consumed path segments (§4.2). Each returns `(ok, error_message)`.

pub fn min_segments(segs: &[String], n: usize) -> (bool, String) {
    let ok = segs.len() >= n;
    (
        ok,
        format!("requires at least {} segment(s), got {}", n, segs.len()),
    )
}

pub fn not_empty(s: &str, field_name: &str) -> (bool, String) {
    let ok = !s.trim().is_empty();
    (ok, format!("{} must not be empty", field_name))
}

/// Only "non-empty" is enforced today; callers may extend with real
/// patterns later.
pub fn matches_pattern(seg: &str, pattern_description: &str) -> (bool, String) {
    not_empty(seg, pattern_description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_segments_ok() {
        let segs = vec!["a".to_string(), "b".to_string()];
        let (ok, _) = min_segments(&segs, 2);
        assert!(ok);
        let (ok, msg) = min_segments(&segs, 3);
        assert!(!ok);
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn not_empty_trims_whitespace() {
        let (ok, _) = not_empty("   ", "region");
        assert!(!ok);
        let (ok, _) = not_empty("us-east-1", "region");
        assert!(ok);
    }
}
