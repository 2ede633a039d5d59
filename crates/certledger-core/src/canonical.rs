//! Canonical CBOR encoding of ledger submissions.
//!
//! A submission is encoded as a CBOR map with text keys, following RFC 8949
//! Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! The canonical bytes are what the ledger credential signs and what the
//! transaction reference commits to, so the same submission must produce the
//! same bytes on every platform.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use ciborium::value::Value;

use crate::cid::ContentId;
use crate::error::{CoreError, Result};
use crate::record::Submission;

/// Domain separation prefix for submission signatures.
pub const SIGN_DOMAIN: &[u8] = b"certledger/submission-sig/v1";

/// Domain separation prefix for transaction references.
pub const TX_DOMAIN: &[u8] = b"certledger/tx/v1";

/// Submission encoding version.
pub const SUBMISSION_VERSION: u64 = 1;

/// CBOR map key names.
mod keys {
    pub const VERSION: &str = "v";
    pub const CID: &str = "cid";
    pub const RECIPIENT: &str = "recipient";
    pub const ISSUER: &str = "issuer";
    pub const ISSUED_AT: &str = "issued_at";
}

/// Encode a submission to canonical CBOR bytes.
pub fn canonical_submission(submission: &Submission) -> Vec<u8> {
    let entries = vec![
        (
            Value::Text(keys::VERSION.to_string()),
            Value::Integer(SUBMISSION_VERSION.into()),
        ),
        (
            Value::Text(keys::CID.to_string()),
            Value::Text(submission.cid.to_string()),
        ),
        (
            Value::Text(keys::RECIPIENT.to_string()),
            Value::Text(submission.recipient.clone()),
        ),
        (
            Value::Text(keys::ISSUER.to_string()),
            Value::Text(submission.issuer.clone()),
        ),
        (
            Value::Text(keys::ISSUED_AT.to_string()),
            Value::Text(submission.issued_at.clone()),
        ),
    ];

    let mut buf = Vec::new();
    encode_map_canonical(&mut buf, &entries);
    buf
}

/// The message a credential signs: `SIGN_DOMAIN || canonical`.
pub fn signing_message(canonical: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + canonical.len());
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(canonical);
    msg
}

/// Decode canonical submission bytes.
///
/// Rejects input that decodes but is not in canonical form, so a submission
/// has exactly one byte representation.
pub fn decode_submission(bytes: &[u8]) -> Result<Submission> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::DecodingError("expected map".into())),
    };

    let get_text = |key: &str| -> Result<String> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Text(t) if t == key))
            .and_then(|(_, v)| v.as_text().map(str::to_owned))
            .ok_or_else(|| CoreError::DecodingError(format!("missing text field {key:?}")))
    };

    let version = map
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(t) if t == keys::VERSION))
        .and_then(|(_, v)| v.as_integer())
        .map(i128::from)
        .ok_or_else(|| CoreError::DecodingError("missing version".into()))?;
    if version != SUBMISSION_VERSION as i128 {
        return Err(CoreError::DecodingError(format!(
            "unsupported submission version {version}"
        )));
    }

    let submission = Submission {
        cid: ContentId::parse(&get_text(keys::CID)?)?,
        recipient: get_text(keys::RECIPIENT)?,
        issuer: get_text(keys::ISSUER)?,
        issued_at: get_text(keys::ISSUED_AT)?,
    };

    if canonical_submission(&submission) != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }

    Ok(submission)
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Encode the value shapes a submission uses: unsigned integers and text.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_uint(buf, 0, u64::try_from(*i).unwrap_or(0)),
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        _ => buf.push(0xf6),
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Submission {
        Submission {
            cid: ContentId::of_bytes(b"diploma"),
            recipient: "Ada Lovelace".into(),
            issuer: "Analytical University".into(),
            issued_at: "2024-05-01T12:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(canonical_submission(&sample()), canonical_submission(&sample()));
    }

    #[test]
    fn test_keys_sorted_by_encoded_bytes() {
        let bytes = canonical_submission(&sample());
        // map(5), first key is "v" (shortest encoding: 0x61 'v')
        assert_eq!(bytes[0], 0xa5);
        assert_eq!(&bytes[1..3], &[0x61, b'v']);
        // then "cid" (0x63)
        assert_eq!(&bytes[4..8], &[0x63, b'c', b'i', b'd']);
    }

    #[test]
    fn test_decode_roundtrip() {
        let bytes = canonical_submission(&sample());
        assert_eq!(decode_submission(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        // Same content written by ciborium's serializer with a different key order.
        let value = Value::Map(vec![
            (Value::Text("recipient".into()), Value::Text("Ada Lovelace".into())),
            (Value::Text("v".into()), Value::Integer(1.into())),
            (Value::Text("cid".into()), Value::Text(sample().cid.to_string())),
            (Value::Text("issuer".into()), Value::Text("Analytical University".into())),
            (Value::Text("issued_at".into()), Value::Text("2024-05-01T12:00:00.000Z".into())),
        ]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();
        assert!(decode_submission(&bytes).is_err());
    }

    #[test]
    fn test_any_field_changes_bytes() {
        let base = canonical_submission(&sample());
        let mut other = sample();
        other.recipient.push('!');
        assert_ne!(base, canonical_submission(&other));
    }

    #[test]
    fn test_signing_message_is_domain_separated() {
        let msg = signing_message(b"abc");
        assert!(msg.starts_with(SIGN_DOMAIN));
        assert!(msg.ends_with(b"abc"));
    }
}
