/*
 * Responsibility
 * - Decide what traffic is observable: path exclusion (segment-boundary
 *   prefix match) and header redaction for log lines
 * - Pure functions over the request/response; no side effects
 */
use axum::http::HeaderMap;

/// True iff `path` equals an exclude entry or sits under it at a segment
/// boundary. `/health` must not match `/healthy`, but does match
/// `/health/live`.
pub fn is_excluded_path(path: &str, exclude_paths: &[String]) -> bool {
    exclude_paths.iter().any(|entry| {
        let entry = entry.trim_end_matches('/');
        if entry.is_empty() {
            return false;
        }
        path == entry
            || path
                .strip_prefix(entry)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Render headers as `"Key: v1, v2; Key2: v3"`, preserving declaration order
/// and joining repeated headers with `, `. Keys case-insensitively present
/// in `exclude_headers` are dropped entirely.
pub fn filter_headers(headers: &HeaderMap, exclude_headers: &[String]) -> String {
    let mut out = String::new();

    // keys() yields each header name once, in declaration order
    for name in headers.keys() {
        let key = name.as_str();
        if exclude_headers
            .iter()
            .any(|ex| ex.eq_ignore_ascii_case(key))
        {
            continue;
        }

        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if !out.is_empty() {
            out.push_str("; ");
        }
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&values.join(", "));
    }

    out
}

#[cfg(test)]
mod tests {
    use axum::http::header::{HeaderName, HeaderValue};

    use super::*;

    fn excludes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exclusion_respects_segment_boundaries() {
        let ex = excludes(&["/health"]);
        assert!(is_excluded_path("/health", &ex));
        assert!(is_excluded_path("/health/live", &ex));
        assert!(!is_excluded_path("/healthy", &ex));
        assert!(!is_excluded_path("/api/health", &ex));
    }

    #[test]
    fn trailing_slash_entries_still_match() {
        let ex = excludes(&["/metrics/"]);
        assert!(is_excluded_path("/metrics", &ex));
        assert!(is_excluded_path("/metrics/scrape", &ex));
    }

    #[test]
    fn empty_exclude_list_excludes_nothing() {
        assert!(!is_excluded_path("/health", &[]));
    }

    #[test]
    fn headers_render_in_order_with_multi_values_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.append("x-custom", HeaderValue::from_static("1"));

        let out = filter_headers(&headers, &[]);
        assert_eq!(out, "accept: text/html, application/json; x-custom: 1");
    }

    #[test]
    fn excluded_headers_never_appear_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("cookie", HeaderValue::from_static("sid=1"));
        headers.insert(
            HeaderName::from_static("x-api"),
            HeaderValue::from_static("ok"),
        );

        let out = filter_headers(&headers, &excludes(&["Authorization", "Cookie"]));
        assert!(!out.to_ascii_lowercase().contains("authorization"));
        assert!(!out.contains("secret"));
        assert!(!out.contains("cookie"));
        assert_eq!(out, "x-api: ok");
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));

        let ex = excludes(&["authorization"]);
        let once = filter_headers(&headers, &ex);
        let twice = filter_headers(&headers, &ex);
        assert_eq!(once, twice);
    }
}
