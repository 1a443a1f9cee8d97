/*
 * Responsibility
 * - Buffer request/response bodies so they can be logged AND replayed
 *   byte-identical to the downstream consumer (handler or client)
 * - Decode + truncate captured bytes for the log line
 *
 * The buffer is an owned `Bytes` private to the request that created it:
 * acquired when the body is collected, released by Drop on every exit path.
 */
use axum::{
    body::{Body, to_bytes},
    extract::Request,
    response::Response,
};

/// Fixed suffix appended to a body cut off at `max_body_size`.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Marker inserted into response extensions by anything that starts
/// streaming bytes to the client before the pipeline unwinds. Once present,
/// the error mapper must not rewrite the response body.
#[derive(Debug, Clone, Copy)]
pub struct ResponseStarted;

/// Truncate `text` to at most `limit` characters (not bytes), appending the
/// truncation marker iff anything was cut. Applied identically to request
/// and response bodies.
pub fn truncate(text: &str, limit: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(limit) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
    }
}

/// Collect the request body into memory, returning the rebuilt request
/// (downstream handler reads the full body, untouched) and the decoded,
/// truncated text for logging.
pub async fn buffer_request(
    req: Request,
    limit: usize,
) -> Result<(Request, String), axum::Error> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, usize::MAX).await?;
    let text = truncate(&String::from_utf8_lossy(&bytes), limit);
    Ok((Request::from_parts(parts, Body::from(bytes)), text))
}

/// Same contract for the response side: the client must receive exactly the
/// bytes the handler wrote, whether or not logging is enabled.
pub async fn buffer_response(
    resp: Response,
    limit: usize,
) -> Result<(Response, String), axum::Error> {
    let (parts, body) = resp.into_parts();
    let bytes = to_bytes(body, usize::MAX).await?;
    let text = truncate(&String::from_utf8_lossy(&bytes), limit);
    Ok((Response::from_parts(parts, Body::from(bytes)), text))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate("short body", 4096), "short body");
    }

    #[test]
    fn exact_limit_is_unchanged() {
        assert_eq!(truncate("abcd", 4), "abcd");
    }

    #[test]
    fn long_text_ends_with_marker() {
        let out = truncate("abcdef", 4);
        assert_eq!(out, format!("abcd{}", TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        // four 3-byte chars; a byte-based cut would split the third one
        let out = truncate("ああああ", 2);
        assert_eq!(out, format!("ああ{}", TRUNCATION_MARKER));
    }

    #[test]
    fn logged_length_is_bounded() {
        let big = "x".repeat(10_000);
        let out = truncate(&big, 4096);
        assert!(out.chars().count() <= 4096 + TRUNCATION_MARKER.chars().count());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn request_round_trips_byte_identical() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .body(Body::from(r#"{"userName":"alice"}"#))
            .unwrap();

        let (req, text) = buffer_request(req, 4096).await.unwrap();
        assert_eq!(text, r#"{"userName":"alice"}"#);

        let bytes = to_bytes(req.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"userName":"alice"}"#);
    }

    #[tokio::test]
    async fn response_round_trips_even_when_truncated_for_logging() {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("0123456789"))
            .unwrap();

        let (resp, text) = buffer_response(resp, 4).await.unwrap();
        assert_eq!(text, format!("0123{}", TRUNCATION_MARKER));

        // the client still gets everything
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");
    }
}
