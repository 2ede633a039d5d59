//! Golden CID vectors.
//!
//! Expected values are what an IPFS UnixFS importer produces with
//! `cidVersion: 1, rawLeaves: true` and sha2-256 (256 KiB blocks, balanced
//! layout, 174 links per node), so they pin the tree shape, the digest and
//! the string encoding.

/// A golden CID vector.
#[derive(Debug, Clone)]
pub struct CidVector {
    pub name: &'static str,
    /// Builds the document bytes.
    pub input: fn() -> Vec<u8>,
    pub expected_cid: &'static str,
}

/// All golden vectors.
pub fn all_vectors() -> Vec<CidVector> {
    vec![
        CidVector {
            name: "empty document",
            input: Vec::new,
            expected_cid: "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku",
        },
        CidVector {
            name: "hello",
            input: || b"hello".to_vec(),
            expected_cid: "bafkreibm6jg3ux5qumhcn2b3flc3tyu6dmlb4xa7u5bf44yegnrjhc4yeq",
        },
        CidVector {
            name: "hello with trailing newline",
            input: || b"hello\n".to_vec(),
            expected_cid: "bafkreicysg23kiwv34eg2d7qweipxwosdo2py4ldv42nbauguluen5v6am",
        },
        CidVector {
            name: "pdf header",
            input: || b"%PDF-1.7 certificate".to_vec(),
            expected_cid: "bafkreia2zycxuc2dhn7s2n73cr5xsutgzo7ahlfqnitgjqdninfw2w7hc4",
        },
        CidVector {
            name: "every byte value, four times",
            input: || (0..4).flat_map(|_| 0u8..=255).collect(),
            expected_cid: "bafkreidylmdvd7bmkpobjjgohwaa42ppttqqbhvte7gpiwfp4cocilbgze",
        },
        CidVector {
            name: "spans two fingerprint chunks",
            input: || vec![b'a'; 70_000],
            expected_cid: "bafkreidgsfoaq4uthw2qjz2xraun3bnx45fe4cqgd6lvm6j3rhcbkg6uwu",
        },
        CidVector {
            name: "exactly one block",
            input: || patterned(262_144),
            expected_cid: "bafkreibruh455iawsviqslif5c7uurdcfdemh22mtnytyzvnzn75kpejxy",
        },
        CidVector {
            name: "one block and a tail",
            input: || patterned(300 * 1024),
            expected_cid: "bafybeicqqpsudfblbjer72m5vzragvjxnpa7tv65nbz72epjrcxqm3jcs4",
        },
        CidVector {
            name: "two full blocks",
            input: || patterned(2 * 262_144),
            expected_cid: "bafybeihjlsmgtdumwxouubhh32wpo5k73zuptoz5bcxxcx3tflxmhyct2a",
        },
        CidVector {
            name: "one mebibyte of zeros",
            input: || vec![0u8; 1 << 20],
            expected_cid: "bafybeiggzq4ryi7hscq5hzvzcnk4urnxt3asp37dhgvnjilf7exskximla",
        },
        CidVector {
            name: "two tree levels",
            input: || vec![0u8; 175 * 262_144 + 1],
            expected_cid: "bafybeicyowx3udu4hzfyo2ekfduhsfhirbv5j2uhcuyz4zh53vrbx2jdfa",
        },
    ]
}

/// `len` bytes cycling through 0..251.
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
