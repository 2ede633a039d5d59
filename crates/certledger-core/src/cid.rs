//! Content identifiers.
//!
//! A CID names a document by its bytes alone. The textual form is frozen:
//!
//! ```text
//! "b" || base32lower_nopad(0x01 || codec || 0x12 || 0x20 || sha256(block))
//! ```
//!
//! i.e. a multibase (base32) CIDv1 with a sha2-256 multihash. Documents that
//! fit in one 256 KiB block are named by the `raw` codec over their bytes
//! (`bafkrei...`). Larger documents are named by the `dag-pb` root of a
//! UnixFS balanced tree ([`crate::unixfs`]), giving `bafybei...`. Both are
//! what an IPFS importer emits with `cidVersion: 1, rawLeaves: true`.
//!
//! **CRITICAL**: Changing this format orphans every record already on the
//! ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::unixfs::DagBuilder;

/// CID version emitted by this crate.
pub const CID_VERSION: u8 = 0x01;

/// Multicodec code for raw bytes.
pub const RAW_CODEC: u8 = 0x55;

/// Multicodec code for dag-pb nodes.
pub const DAG_PB_CODEC: u8 = 0x70;

/// Multihash code for sha2-256.
pub const SHA2_256: u8 = 0x12;

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a binary CID.
pub const CID_LEN: usize = 4 + DIGEST_LEN;

/// Multibase prefix for lowercase base32 without padding.
const MULTIBASE_BASE32: char = 'b';

/// Codec of the block a CID points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    /// The document itself (single block).
    Raw,
    /// A UnixFS file node linking to the document's blocks.
    DagPb,
}

impl Codec {
    pub const fn code(self) -> u8 {
        match self {
            Self::Raw => RAW_CODEC,
            Self::DagPb => DAG_PB_CODEC,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            RAW_CODEC => Some(Self::Raw),
            DAG_PB_CODEC => Some(Self::DagPb),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::DagPb => "dag-pb",
        }
    }
}

/// A content identifier: a codec and the sha2-256 digest of a block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    codec: Codec,
    digest: [u8; DIGEST_LEN],
}

impl ContentId {
    pub const fn new(codec: Codec, digest: [u8; DIGEST_LEN]) -> Self {
        Self { codec, digest }
    }

    /// A raw-codec CID from a finished sha2-256 digest.
    pub const fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self::new(Codec::Raw, digest)
    }

    /// Fingerprint a document held in memory.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut dag = DagBuilder::new();
        dag.update(data);
        dag.finish()
    }

    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// The digest of the named block.
    pub const fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Hex of the block digest. For raw CIDs this is `sha256sum` of the
    /// document.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Binary CID: version, codec, multihash header, digest.
    pub fn to_bytes(&self) -> [u8; CID_LEN] {
        let mut out = [0u8; CID_LEN];
        out[..4].copy_from_slice(&[CID_VERSION, self.codec.code(), SHA2_256, DIGEST_LEN as u8]);
        out[4..].copy_from_slice(&self.digest);
        out
    }

    /// Parse the textual form.
    pub fn parse(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(MULTIBASE_BASE32)
            .ok_or_else(|| CoreError::InvalidCid(format!("missing multibase prefix in {s:?}")))?;
        let bytes = base32_decode(body)
            .ok_or_else(|| CoreError::InvalidCid(format!("not lowercase base32: {s:?}")))?;

        if bytes.len() != CID_LEN {
            return Err(CoreError::InvalidCid(format!(
                "expected {CID_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != CID_VERSION {
            return Err(CoreError::UnsupportedCidVersion(bytes[0]));
        }
        let codec = Codec::from_code(bytes[1])
            .ok_or_else(|| CoreError::InvalidCid(format!("unsupported codec 0x{:02x}", bytes[1])))?;
        if bytes[2] != SHA2_256 || bytes[3] as usize != DIGEST_LEN {
            return Err(CoreError::InvalidCid("unsupported multihash".into()));
        }

        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[4..]);
        Ok(Self::new(codec, digest))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_BASE32, base32_encode(&self.to_bytes()))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self)
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

// RFC 4648 Base32 encoding (lowercase, no padding)
fn base32_encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in s.bytes() {
        let value = ALPHABET.iter().position(|&a| a == c)? as u64;
        buffer = (buffer << 5) | value;
        bits_in_buffer += 5;

        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            out.push(((buffer >> bits_in_buffer) & 0xff) as u8);
        }
    }

    // Leftover bits must be zero padding from the encoder.
    if bits_in_buffer >= 5 || buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_cids() {
        // Matches `ipfs add --cid-version 1 --raw-leaves`.
        assert_eq!(
            ContentId::of_bytes(b"").to_string(),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );
        assert_eq!(
            ContentId::of_bytes(b"hello").to_string(),
            "bafkreibm6jg3ux5qumhcn2b3flc3tyu6dmlb4xa7u5bf44yegnrjhc4yeq"
        );
    }

    #[test]
    fn test_digest_hex_matches_sha256() {
        let cid = ContentId::of_bytes(b"hello");
        assert_eq!(
            cid.digest_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let cid = ContentId::of_bytes(b"certificate");
        let parsed: ContentId = cid.to_string().parse().unwrap();
        assert_eq!(cid, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ContentId::parse("").is_err());
        assert!(ContentId::parse("Qmabc").is_err());
        assert!(ContentId::parse("bafkrei").is_err());
        assert!(ContentId::parse("bAFKREIHDWDCEFGH4DQKJV67UZCMW7OJEE6XEDZDETOJUZJEVTENXQUVYKU").is_err());
    }

    #[test]
    fn test_parse_rejects_other_codec() {
        // dag-cbor (0x71) instead of raw
        let mut bytes = ContentId::of_bytes(b"x").to_bytes();
        bytes[1] = 0x71;
        let text = format!("b{}", base32_encode(&bytes));
        assert!(matches!(ContentId::parse(&text), Err(CoreError::InvalidCid(_))));
    }

    #[test]
    fn test_parse_rejects_other_multihash() {
        // sha2-512 (0x13)
        let mut bytes = ContentId::of_bytes(b"x").to_bytes();
        bytes[2] = 0x13;
        let text = format!("b{}", base32_encode(&bytes));
        assert!(matches!(ContentId::parse(&text), Err(CoreError::InvalidCid(_))));
    }

    #[test]
    fn test_dag_pb_roundtrip() {
        let cid = ContentId::new(Codec::DagPb, [0x5a; DIGEST_LEN]);
        let text = cid.to_string();
        assert!(text.starts_with("bafybei"));
        let parsed = ContentId::parse(&text).unwrap();
        assert_eq!(parsed, cid);
        assert_eq!(parsed.codec(), Codec::DagPb);
        assert_ne!(parsed, ContentId::from_digest([0x5a; DIGEST_LEN]));
    }

    #[test]
    fn test_parse_rejects_other_version() {
        let mut bytes = ContentId::of_bytes(b"x").to_bytes();
        bytes[0] = 0x02;
        let text = format!("b{}", base32_encode(&bytes));
        assert!(matches!(
            ContentId::parse(&text),
            Err(CoreError::UnsupportedCidVersion(2))
        ));
    }

    #[test]
    fn test_base32_encode() {
        // Test vector from RFC 4648
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "my");
        assert_eq!(base32_encode(b"fo"), "mzxq");
        assert_eq!(base32_encode(b"foo"), "mzxw6");
        assert_eq!(base32_encode(b"foob"), "mzxw6yq");
        assert_eq!(base32_encode(b"fooba"), "mzxw6ytb");
        assert_eq!(base32_encode(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_base32_decode() {
        assert_eq!(base32_decode("mzxw6ytboi").unwrap(), b"foobar");
        assert_eq!(base32_decode("my").unwrap(), b"f");
        assert!(base32_decode("mz").is_none());
        assert!(base32_decode("m1").is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let cid = ContentId::of_bytes(b"hello");
        let json = serde_json::to_string(&cid).unwrap();
        assert_eq!(json, format!("\"{}\"", cid));
        let back: ContentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cid);
    }
}
