/// Key used when no identifier can be found in the payload. Every such
/// message lands on the same partition.
pub const UNKNOWN_ROUTING_KEY: &str = "unknown";

const FIELD: &[u8] = b"\"order_uid\"";

/// Best-effort partition key for a raw order payload.
///
/// Scans for the first `"order_uid": "<value>"` pair without parsing the
/// document. Values containing escapes are not unescaped. When nothing
/// usable is found the sentinel [`UNKNOWN_ROUTING_KEY`] is returned.
///
/// This only picks a partition. It says nothing about whether the payload
/// is valid; the consumer still decodes and validates every message.
pub fn routing_key(payload: &[u8]) -> String {
    extract(payload)
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| UNKNOWN_ROUTING_KEY.to_string())
}

/// Partition key for a publish: the decoded identifier when the caller has
/// one, otherwise the best-effort scan of the raw payload.
///
/// The scan neither unescapes values nor tells a nested `order_uid` from the
/// top-level one, so a decoded identifier always wins.
pub fn partition_key(order_uid: Option<&str>, payload: &[u8]) -> String {
    match order_uid.map(str::trim) {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => routing_key(payload),
    }
}

fn extract(payload: &[u8]) -> Option<String> {
    let start = find(payload, FIELD)? + FIELD.len();
    let rest = skip_whitespace(&payload[start..]);
    let rest = skip_whitespace(rest.strip_prefix(b":")?);
    let rest = rest.strip_prefix(b"\"")?;
    let end = rest.iter().position(|&b| b == b'"')?;

    std::str::from_utf8(&rest[..end]).ok().map(str::to_string)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    &bytes[skip..]
}
