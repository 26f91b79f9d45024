use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::models::{DecodingParams, ResolveError};
use crate::transport::Transport;

pub const BATCH_EXECUTE_URL: &str = "https://news.google.com/_/DotsSplashUi/data/batchexecute";

const RPC_ID: &str = "Fbv4je";
const FORM_FIELD: &str = "f.req";

/// The `garturlreq` tuple. The backend is sensitive to its exact layout, so it
/// is assembled as text rather than through a serializer.
fn garturlreq(params: &DecodingParams) -> String {
    format!(
        r#"["garturlreq",[["X","X",["X","X"],null,null,1,1,"US:en",null,1,null,null,null,null,null,0,1],"X","X",1,[1,1,1],1,1,null,0,0,null,0],"{}",{},"{}"]"#,
        params.token, params.timestamp, params.signature
    )
}

/// The JSON document posted under `f.req`: `[[["Fbv4je", "<garturlreq>"]]]`.
pub fn build_payload(params: &DecodingParams) -> String {
    // serde_json string encoding gives the escaping; the ", " separator is
    // what the backend has always been sent. The envelope is three arrays deep.
    let id = Value::from(RPC_ID).to_string();
    let inner = Value::from(garturlreq(params)).to_string();
    format!("[[[{}, {}]]]", id, inner)
}

/// Form-encoded request body. Slashes stay literal, everything else outside
/// the unreserved set is percent-encoded.
pub fn build_request_body(params: &DecodingParams) -> String {
    let encoded = urlencoding::encode(&build_payload(params)).replace("%2F", "/");
    format!("{}={}", FORM_FIELD, encoded)
}

/// Exchange signing parameters for the destination URL.
pub async fn decode_url<T: Transport + ?Sized>(
    transport: &T,
    params: &DecodingParams,
    timeout: Duration,
) -> Result<String, ResolveError> {
    let body = build_request_body(params);
    let response = transport.post_form(BATCH_EXECUTE_URL, body, timeout).await?;
    debug!("batchexecute returned {} bytes for {}", response.len(), params.token);
    parse_response(&response)
}

/// Decode a batchexecute reply down to the destination URL.
pub fn parse_response(body: &str) -> Result<String, ResolveError> {
    let segment = split_frame(body)?;
    let inner = parse_envelope(segment)?;
    parse_inner(&inner)
}

/// The reply is prefixed with an anti-XSSI line; the payload is the segment
/// after the first blank line.
pub fn split_frame(body: &str) -> Result<&str, ResolveError> {
    body.split("\n\n")
        .nth(1)
        .ok_or_else(|| ResolveError::parse("response has no blank-line separated payload"))
}

/// Parse the outer envelope, drop its two trailing bookkeeping entries and
/// return the string-encoded JSON at `[0][2]`.
pub fn parse_envelope(segment: &str) -> Result<String, ResolveError> {
    let value: Value = serde_json::from_str(segment)
        .map_err(|e| ResolveError::parse(format!("invalid envelope JSON: {}", e)))?;

    let entries = value
        .as_array()
        .ok_or_else(|| ResolveError::parse("envelope is not an array"))?;
    let kept = &entries[..entries.len().saturating_sub(2)];

    kept.first()
        .and_then(|entry| entry.get(2))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ResolveError::parse("envelope has no encoded result at [0][2]"))
}

/// The inner document is a JSON array whose second element is the URL.
pub fn parse_inner(inner: &str) -> Result<String, ResolveError> {
    let value: Value = serde_json::from_str(inner)
        .map_err(|e| ResolveError::parse(format!("invalid inner JSON: {}", e)))?;

    value
        .get(1)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ResolveError::parse("inner result has no URL at [1]"))
}
