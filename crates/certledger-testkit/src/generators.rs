//! Proptest generators for property-based testing.

use proptest::prelude::*;

use certledger_core::{ContentId, Keypair};

/// Arbitrary document bytes, up to 8 KiB.
pub fn document() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..8192)
}

/// Two distinct documents.
pub fn distinct_documents() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (document(), document()).prop_filter("documents must differ", |(a, b)| a != b)
}

/// A random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// A random CID.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    any::<[u8; 32]>().prop_map(ContentId::from_digest)
}

/// A name-like field with no surrounding whitespace.
pub fn field() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z .'-]{0,38}[A-Za-z]"
}

/// A field and a whitespace-padded rendering of it.
pub fn padded_field() -> impl Strategy<Value = (String, String)> {
    (field(), "[ \t\n]{0,4}", "[ \t\n]{0,4}")
        .prop_map(|(core, pre, post)| (core.clone(), format!("{pre}{core}{post}")))
}

/// Fingerprint chunk size.
pub fn chunk_size() -> impl Strategy<Value = usize> {
    1usize..=70_000
}
