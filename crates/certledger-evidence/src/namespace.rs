//! Evidence namespaces and file naming.

use std::fmt;

use certledger_core::ContentId;

/// Longest extension kept from an uploaded filename.
pub const MAX_EXTENSION_LEN: usize = 16;

/// A top-level directory of the evidence store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Documents bound to a ledger record. Write-once.
    Issued,
    /// Documents submitted for verification. Latest wins.
    VerifySubmissions,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Issued, Namespace::VerifySubmissions];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::VerifySubmissions => "verify-submissions",
        }
    }

    /// Whether a later write may replace an existing entry.
    pub fn overwrite_allowed(self) -> bool {
        matches!(self, Self::VerifySubmissions)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Extension to store a document under, derived from its original filename.
///
/// Returns `".ext"` (ASCII alphanumeric, lowercased, at most
/// [`MAX_EXTENSION_LEN`] characters) or the empty string.
pub fn sanitize_extension(filename: Option<&str>) -> String {
    let Some(name) = filename else {
        return String::new();
    };
    // Only the final path component counts.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let Some((stem, ext)) = base.rsplit_once('.') else {
        return String::new();
    };
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", ext.to_ascii_lowercase())
}

/// File name of an evidence entry: `<cid><ext>`.
pub fn file_name(cid: &ContentId, extension: &str) -> String {
    format!("{cid}{extension}")
}

/// Split an entry name into its CID text and extension (`".pdf"` or `""`).
pub(crate) fn split_name(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension(Some("diploma.PDF")), ".pdf");
        assert_eq!(sanitize_extension(Some("a.tar.gz")), ".gz");
        assert_eq!(sanitize_extension(Some("dir.d/noext")), "");
        assert_eq!(sanitize_extension(Some("..\\evil.p$f")), "");
        assert_eq!(sanitize_extension(Some(".bashrc")), "");
        assert_eq!(sanitize_extension(Some("x.")), "");
        assert_eq!(sanitize_extension(Some("x.abcdefghijklmnopq")), "");
        assert_eq!(sanitize_extension(None), "");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("bafkabc"), ("bafkabc", ""));
        assert_eq!(split_name("bafkabc.pdf"), ("bafkabc", ".pdf"));
        let cid = ContentId::of_bytes(b"x");
        let name = file_name(&cid, ".png");
        assert_eq!(split_name(&name), (cid.to_string().as_str(), ".png"));
    }

    #[test]
    fn test_namespace_dirs() {
        assert_eq!(Namespace::Issued.to_string(), "issued");
        assert_eq!(Namespace::VerifySubmissions.dir_name(), "verify-submissions");
        assert!(!Namespace::Issued.overwrite_allowed());
        assert!(Namespace::VerifySubmissions.overwrite_allowed());
    }
}
