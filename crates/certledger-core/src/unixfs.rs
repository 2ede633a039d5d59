//! UnixFS balanced file trees.
//!
//! Documents are cut into [`BLOCK_SIZE`] raw leaves. One leaf is its own
//! CID. More than one are linked from dag-pb nodes of at most
//! [`MAX_LINKS`] children each, level by level, until a single root is
//! left. Node bytes follow the dag-pb and UnixFS protobuf encodings exactly
//! (links before data, empty link names, non-packed block sizes) because the
//! root digest depends on every byte.

use sha2::{Digest, Sha256};

use crate::cid::{Codec, ContentId};

/// Size of a leaf block.
pub const BLOCK_SIZE: usize = 256 * 1024;

/// Most children a tree node links to.
pub const MAX_LINKS: usize = 174;

/// UnixFS `Data.DataType.File`.
const UNIXFS_FILE: u64 = 2;

/// A finished block as its parent sees it.
#[derive(Debug, Clone, Copy)]
struct Block {
    cid: ContentId,
    /// Document bytes under this block.
    file_size: u64,
    /// Encoded bytes of this block and everything below it.
    tree_size: u64,
}

/// Incremental tree builder. Holds one leaf's hash state plus a summary
/// per finished leaf, never the document itself.
pub(crate) struct DagBuilder {
    leaf: Sha256,
    leaf_len: usize,
    leaves: Vec<Block>,
}

impl DagBuilder {
    pub(crate) fn new() -> Self {
        Self {
            leaf: Sha256::new(),
            leaf_len: 0,
            leaves: Vec::new(),
        }
    }

    pub(crate) fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (BLOCK_SIZE - self.leaf_len).min(data.len());
            self.leaf.update(&data[..take]);
            self.leaf_len += take;
            data = &data[take..];
            if self.leaf_len == BLOCK_SIZE {
                self.seal_leaf();
            }
        }
    }

    fn seal_leaf(&mut self) {
        let digest = std::mem::replace(&mut self.leaf, Sha256::new()).finalize();
        let len = self.leaf_len as u64;
        self.leaves.push(Block {
            cid: ContentId::new(Codec::Raw, digest.into()),
            file_size: len,
            tree_size: len,
        });
        self.leaf_len = 0;
    }

    pub(crate) fn finish(mut self) -> ContentId {
        // An empty document is still one (empty) leaf.
        if self.leaf_len > 0 || self.leaves.is_empty() {
            self.seal_leaf();
        }
        if let [only] = self.leaves.as_slice() {
            return only.cid;
        }

        let mut level = self.leaves;
        loop {
            level = level.chunks(MAX_LINKS).map(file_node).collect();
            if let [root] = level.as_slice() {
                return root.cid;
            }
        }
    }
}

/// Encode a UnixFS file node over `children` and summarize it.
fn file_node(children: &[Block]) -> Block {
    let file_size: u64 = children.iter().map(|c| c.file_size).sum();

    let mut data = Vec::with_capacity(16 + children.len() * 5);
    put_varint_field(&mut data, 1, UNIXFS_FILE);
    put_varint_field(&mut data, 3, file_size);
    for child in children {
        put_varint_field(&mut data, 4, child.file_size);
    }

    let mut node = Vec::with_capacity(data.len() + children.len() * 48);
    for child in children {
        let mut link = Vec::with_capacity(48);
        put_bytes_field(&mut link, 1, &child.cid.to_bytes());
        put_bytes_field(&mut link, 2, b"");
        put_varint_field(&mut link, 3, child.tree_size);
        put_bytes_field(&mut node, 2, &link);
    }
    put_bytes_field(&mut node, 1, &data);

    let tree_size = node.len() as u64 + children.iter().map(|c| c.tree_size).sum::<u64>();
    Block {
        cid: ContentId::new(Codec::DagPb, Sha256::digest(&node).into()),
        file_size,
        tree_size,
    }
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn put_varint_field(out: &mut Vec<u8>, field: u64, value: u64) {
    put_varint(out, field << 3);
    put_varint(out, value);
}

fn put_bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    put_varint(out, (field << 3) | 2);
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
