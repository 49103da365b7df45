use http::header::{HeaderName, HeaderValue};

/// Header-like key/value pairs sent alongside a call (request headers,
/// response headers, trailers). Keys are case-insensitive and may repeat.
pub type Metadata = http::HeaderMap;

pub const GRPC_CONTENT_TYPE: &str = "application/grpc";

/// Parses a `"Key: Value"` header override.
///
/// The line must contain exactly one colon; both sides are trimmed. Anything
/// else (including names or values HTTP cannot carry) yields `None`.
#[must_use]
pub fn parse_header_line(line: &str) -> Option<(HeaderName, HeaderValue)> {
    let mut parts = line.split(':');
    let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };

    let name = HeaderName::from_bytes(key.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

/// Flattens metadata into `(name, value)` pairs, skipping values that are not
/// visible ASCII.
#[must_use]
pub fn metadata_to_pairs(md: &Metadata) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(md.len());
    for (key, value) in md {
        if let Ok(v) = value.to_str() {
            out.push((key.as_str().to_string(), v.to_string()));
        }
    }
    out
}
