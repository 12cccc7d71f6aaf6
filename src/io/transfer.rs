//! Transfer string codec.
//!
//! `PROMPTSHELF1:` + base64(zlib(JSON payload)). The string is plain ASCII
//! so it survives chat clients and clipboards.

use super::validation::validate_relative_path;
use crate::models::{TRANSFER_VERSION, TransferItem, TransferPayload};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Deserialize;
use std::io::{Read, Write};

/// Literal prefix of every transfer string.
pub const TRANSFER_PREFIX: &str = "PROMPTSHELF1:";

/// Upper bound on the decompressed payload, guards against zip bombs.
const MAX_DECODED_BYTES: u64 = 16 * 1024 * 1024;

/// Payload as found on the wire, before required fields are checked.
#[derive(Deserialize)]
struct RawPayload {
    version: Option<u32>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    timestamp: String,
    items: Option<Vec<TransferItem>>,
}

/// Serializes, compresses and encodes a payload.
///
/// # Errors
///
/// Returns an error if serialization or compression fails.
pub fn encode(payload: &TransferPayload) -> Result<String> {
    let json = serde_json::to_vec(payload).map_err(|e| Error::operation("serialize_transfer", e))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| Error::operation("compress_transfer", e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::operation("compress_transfer", e))?;

    Ok(format!("{TRANSFER_PREFIX}{}", STANDARD.encode(compressed)))
}

/// Decodes and validates a transfer string.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidTransfer`] naming the first failed step.
pub fn decode(input: &str) -> Result<TransferPayload> {
    let body = input
        .trim()
        .strip_prefix(TRANSFER_PREFIX)
        .ok_or_else(|| invalid(format!("missing '{TRANSFER_PREFIX}' prefix")))?;

    let compressed = STANDARD
        .decode(body.trim())
        .map_err(|e| invalid(format!("bad base64: {e}")))?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_DECODED_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| invalid(format!("decompression failed: {e}")))?;
    if json.len() as u64 > MAX_DECODED_BYTES {
        return Err(invalid("payload too large".to_string()));
    }

    let raw: RawPayload =
        serde_json::from_slice(&json).map_err(|e| invalid(format!("invalid JSON: {e}")))?;

    let version = raw.version.ok_or_else(|| invalid("missing 'version'".to_string()))?;
    let items = raw.items.ok_or_else(|| invalid("missing 'items'".to_string()))?;

    if version != TRANSFER_VERSION {
        return Err(invalid(format!(
            "unsupported version {version} (expected {TRANSFER_VERSION})"
        )));
    }
    if items.is_empty() {
        return Err(invalid("no items".to_string()));
    }
    for item in &items {
        validate_relative_path(item.relative_path()).map_err(|reason| {
            invalid(format!(
                "unsafe {} path '{}': {reason}",
                item.kind(),
                item.relative_path()
            ))
        })?;
    }

    Ok(TransferPayload {
        version,
        source: raw.source,
        timestamp: raw.timestamp,
        items,
    })
}

fn invalid(reason: String) -> Error {
    Error::InvalidTransfer(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferPayload {
        TransferPayload::new(
            "test",
            vec![
                TransferItem::Prompt {
                    relative_path: "mail/Reply.md".to_string(),
                    content: "{> sig}".to_string(),
                },
                TransferItem::Partial {
                    relative_path: "sig.md".to_string(),
                    content: "Cheers".to_string(),
                },
            ],
        )
    }

    /// Builds a transfer string around arbitrary JSON.
    fn wrap_json(json: &str) -> String {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        format!("{TRANSFER_PREFIX}{}", STANDARD.encode(encoder.finish().unwrap()))
    }

    fn reason(input: &str) -> String {
        match decode(input) {
            Err(Error::InvalidTransfer(reason)) => reason,
            other => panic!("expected InvalidTransfer, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip() {
        let payload = sample();
        let encoded = encode(&payload).unwrap();
        assert!(encoded.starts_with(TRANSFER_PREFIX));
        assert!(encoded.is_ascii());
        assert_eq!(decode(&format!("  {encoded}\n")).unwrap(), payload);
    }

    #[test]
    fn test_rejects_missing_prefix() {
        assert!(reason("abc").contains("prefix"));
    }

    #[test]
    fn test_rejects_bad_base64() {
        assert!(reason("PROMPTSHELF1:***").contains("base64"));
    }

    #[test]
    fn test_rejects_non_zlib() {
        let input = format!("{TRANSFER_PREFIX}{}", STANDARD.encode(b"not zlib at all"));
        assert!(reason(&input).contains("decompression"));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(reason(&wrap_json("{not json")).contains("JSON"));
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(reason(&wrap_json(r#"{"items": []}"#)).contains("version"));
        assert!(reason(&wrap_json(r#"{"version": 1}"#)).contains("items"));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let input = wrap_json(r#"{"version": 2, "items": []}"#);
        assert!(reason(&input).contains("unsupported version 2"));
    }

    #[test]
    fn test_rejects_empty_items() {
        assert!(reason(&wrap_json(r#"{"version": 1, "items": []}"#)).contains("no items"));
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        let traversal = wrap_json(
            r#"{"version": 1, "items": [{"type": "partial", "relativePath": "../x.md", "content": "x"}]}"#,
        );
        assert!(reason(&traversal).contains("unsafe partial path"));

        let absolute = wrap_json(
            r#"{"version": 1, "items": [{"type": "prompt", "relativePath": "/etc/x.md", "content": "x"}]}"#,
        );
        assert!(reason(&absolute).contains("unsafe prompt path"));
    }

    #[test]
    fn test_accepts_missing_optional_fields() {
        let input = wrap_json(
            r#"{"version": 1, "items": [{"type": "prompt", "relativePath": "A.md", "content": "x"}]}"#,
        );
        let payload = decode(&input).unwrap();
        assert_eq!(payload.source, "");
        assert_eq!(payload.items.len(), 1);
    }
}
