//! Streaming content fingerprinting.
//!
//! Documents are read in fixed-size chunks and fed to a UnixFS tree builder
//! (see [`crate::unixfs`]), so memory stays bounded regardless of upload
//! size. A fingerprint is only produced once the
//! whole stream has been consumed. Anything that stops that surfaces as
//! [`ReadError`].

use std::io::Read;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cid::ContentId;
use crate::error::ReadError;
use crate::unixfs::DagBuilder;

/// Default read chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Computes content identifiers from byte streams.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    chunk_size: usize,
    max_len: Option<u64>,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_len: None,
        }
    }
}

impl Fingerprinter {
    /// Create a fingerprinter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject streams longer than `limit` bytes.
    pub fn with_max_len(mut self, limit: u64) -> Self {
        self.max_len = Some(limit);
        self
    }

    /// Override the read chunk size (minimum 1).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Fingerprint a synchronous reader.
    ///
    /// `expected_len` is the length the sender declared, if any.
    pub fn fingerprint<R: Read>(
        &self,
        mut reader: R,
        expected_len: Option<u64>,
    ) -> Result<ContentId, ReadError> {
        let mut state = HashState::new(self.max_len, expected_len);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::Io(e)),
            };
            state.update(&buf[..n])?;
        }

        state.finish()
    }

    /// Fingerprint an async reader.
    pub async fn fingerprint_async<R: AsyncRead + Unpin>(
        &self,
        mut reader: R,
        expected_len: Option<u64>,
    ) -> Result<ContentId, ReadError> {
        let mut state = HashState::new(self.max_len, expected_len);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            state.update(&buf[..n])?;
        }

        state.finish()
    }
}

/// Fingerprint an in-memory document.
pub fn fingerprint_bytes(data: &[u8]) -> ContentId {
    ContentId::of_bytes(data)
}

struct HashState {
    dag: DagBuilder,
    consumed: u64,
    max_len: Option<u64>,
    expected_len: Option<u64>,
}

impl HashState {
    fn new(max_len: Option<u64>, expected_len: Option<u64>) -> Self {
        Self {
            dag: DagBuilder::new(),
            consumed: 0,
            max_len,
            expected_len,
        }
    }

    fn update(&mut self, chunk: &[u8]) -> Result<(), ReadError> {
        self.consumed += chunk.len() as u64;

        if let Some(limit) = self.max_len {
            if self.consumed > limit {
                return Err(ReadError::TooLarge { limit });
            }
        }
        if let Some(expected) = self.expected_len {
            if self.consumed > expected {
                return Err(ReadError::Overrun { expected });
            }
        }

        self.dag.update(chunk);
        Ok(())
    }

    fn finish(self) -> Result<ContentId, ReadError> {
        if let Some(expected) = self.expected_len {
            if self.consumed != expected {
                return Err(ReadError::Truncated {
                    expected,
                    actual: self.consumed,
                });
            }
        }
        Ok(self.dag.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that yields some bytes and then fails.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "client went away",
                ));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(0x42);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_stream_matches_in_memory() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let fp = Fingerprinter::new().with_chunk_size(4096);
        let streamed = fp.fingerprint(Cursor::new(&data), None).unwrap();
        assert_eq!(streamed, fingerprint_bytes(&data));
    }

    #[test]
    fn test_chunk_size_does_not_matter() {
        let data = b"the same certificate body".repeat(1000);
        let a = Fingerprinter::new().with_chunk_size(1).fingerprint(Cursor::new(&data), None);
        let b = Fingerprinter::new().with_chunk_size(7919).fingerprint(Cursor::new(&data), None);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn test_io_error_aborts() {
        let result = Fingerprinter::new().fingerprint(FailingReader { remaining: 10_000 }, None);
        assert!(matches!(result, Err(ReadError::Io(_))));
    }

    #[test]
    fn test_truncated_against_declared_length() {
        let result = Fingerprinter::new().fingerprint(Cursor::new(b"abc"), Some(10));
        assert!(matches!(
            result,
            Err(ReadError::Truncated {
                expected: 10,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_overrun_against_declared_length() {
        let result = Fingerprinter::new().fingerprint(Cursor::new(b"abcdef"), Some(2));
        assert!(matches!(result, Err(ReadError::Overrun { expected: 2 })));
    }

    #[test]
    fn test_declared_length_exact() {
        let cid = Fingerprinter::new()
            .fingerprint(Cursor::new(b"hello"), Some(5))
            .unwrap();
        assert_eq!(cid, fingerprint_bytes(b"hello"));
    }

    #[test]
    fn test_size_limit() {
        let fp = Fingerprinter::new().with_max_len(4);
        assert!(fp.fingerprint(Cursor::new(b"abcd"), None).is_ok());
        assert!(matches!(
            fp.fingerprint(Cursor::new(b"abcde"), None),
            Err(ReadError::TooLarge { limit: 4 })
        ));
    }

    #[test]
    fn test_large_stream_gets_tree_root() {
        let data: Vec<u8> = (0..300 * 1024u32).map(|i| (i % 251) as u8).collect();
        let cid = Fingerprinter::new()
            .with_chunk_size(10_000)
            .fingerprint(Cursor::new(&data), Some(data.len() as u64))
            .unwrap();
        assert_eq!(cid.codec(), crate::Codec::DagPb);
        assert_eq!(cid, fingerprint_bytes(&data));
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let data = b"%PDF-1.7 certificate".to_vec();
        let fp = Fingerprinter::new();
        let a = fp.fingerprint_async(&data[..], None).await.unwrap();
        let b = fp.fingerprint(Cursor::new(&data), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.to_string(),
            "bafkreia2zycxuc2dhn7s2n73cr5xsutgzo7ahlfqnitgjqdninfw2w7hc4"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fingerprint_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..4096)) {
                prop_assert_eq!(fingerprint_bytes(&data), fingerprint_bytes(&data.clone()));
            }

            #[test]
            fn fingerprint_ignores_chunking(
                data in prop::collection::vec(any::<u8>(), 0..4096),
                chunk in 1usize..512,
            ) {
                let streamed = Fingerprinter::new()
                    .with_chunk_size(chunk)
                    .fingerprint(Cursor::new(&data), Some(data.len() as u64))
                    .unwrap();
                prop_assert_eq!(streamed, fingerprint_bytes(&data));
            }

            #[test]
            fn single_byte_flip_changes_cid(
                data in prop::collection::vec(any::<u8>(), 1..4096),
                idx in any::<prop::sample::Index>(),
            ) {
                let mut altered = data.clone();
                let i = idx.index(altered.len());
                altered[i] ^= 0x01;
                prop_assert_ne!(fingerprint_bytes(&data), fingerprint_bytes(&altered));
            }

            #[test]
            fn cid_string_roundtrips(data in prop::collection::vec(any::<u8>(), 0..256)) {
                let cid = fingerprint_bytes(&data);
                prop_assert_eq!(ContentId::parse(&cid.to_string()).unwrap(), cid);
            }
        }
    }
}
