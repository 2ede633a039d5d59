//! Who is calling, and whether they may issue.
//!
//! Token issuance and account management live elsewhere. This module only
//! turns a presented credential into a [`Caller`] and a caller into an
//! [`IssuerCapability`].

use std::collections::HashMap;
use std::fmt;

use crate::error::IssueError;

/// The identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// No credential presented.
    Anonymous,
    /// A credential was presented and did not check out.
    Rejected(String),
    /// A known subject.
    Authenticated { subject: String, can_issue: bool },
}

impl Caller {
    /// An authenticated caller allowed to issue.
    pub fn issuer(subject: impl Into<String>) -> Self {
        Self::Authenticated {
            subject: subject.into(),
            can_issue: true,
        }
    }

    /// Exchange this caller for an issuer capability.
    pub fn issuer_capability(&self) -> Result<IssuerCapability, IssueError> {
        match self {
            Self::Anonymous => Err(IssueError::Unauthenticated),
            Self::Rejected(reason) => Err(IssueError::Forbidden(reason.clone())),
            Self::Authenticated {
                can_issue: false,
                subject,
            } => Err(IssueError::Forbidden(format!(
                "{subject} is not allowed to issue certificates"
            ))),
            Self::Authenticated {
                subject,
                can_issue: true,
            } => Ok(IssuerCapability {
                subject: subject.clone(),
            }),
        }
    }
}

/// Proof that the holder passed the issuer check.
///
/// Only obtainable through [`Caller::issuer_capability`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerCapability {
    subject: String,
}

impl IssuerCapability {
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Maps an `Authorization` header to a [`Caller`].
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, authorization: Option<&str>) -> Caller;
}

#[derive(Clone)]
struct Grant {
    subject: String,
    can_issue: bool,
}

/// Fixed set of bearer tokens, held as BLAKE3 digests.
#[derive(Clone, Default)]
pub struct StaticTokens {
    grants: HashMap<[u8; 32], Grant>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `subject`, allowed to issue.
    pub fn with_issuer(mut self, token: &str, subject: impl Into<String>) -> Self {
        self.insert(token, subject.into(), true);
        self
    }

    /// Accept `token` as `subject`, not allowed to issue.
    pub fn with_viewer(mut self, token: &str, subject: impl Into<String>) -> Self {
        self.insert(token, subject.into(), false);
        self
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    fn insert(&mut self, token: &str, subject: String, can_issue: bool) {
        self.grants.insert(
            *blake3::hash(token.as_bytes()).as_bytes(),
            Grant { subject, can_issue },
        );
    }
}

impl fmt::Debug for StaticTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokens")
            .field("tokens", &self.grants.len())
            .finish()
    }
}

impl Authenticator for StaticTokens {
    fn authenticate(&self, authorization: Option<&str>) -> Caller {
        let Some(header) = authorization else {
            return Caller::Anonymous;
        };
        let header = header.trim();
        let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Caller::Rejected("expected a bearer token".into());
        }
        let token = token.trim();
        if token.is_empty() {
            return Caller::Anonymous;
        }

        match self.grants.get(blake3::hash(token.as_bytes()).as_bytes()) {
            Some(grant) => Caller::Authenticated {
                subject: grant.subject.clone(),
                can_issue: grant.can_issue,
            },
            None => Caller::Rejected("invalid or expired token".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> StaticTokens {
        StaticTokens::new()
            .with_issuer("s3cret", "registrar")
            .with_viewer("look", "auditor")
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(tokens().authenticate(None), Caller::Anonymous);
        assert_eq!(tokens().authenticate(Some("Bearer ")), Caller::Anonymous);
    }

    #[test]
    fn test_known_tokens() {
        assert_eq!(
            tokens().authenticate(Some("Bearer s3cret")),
            Caller::issuer("registrar")
        );
        assert_eq!(
            tokens().authenticate(Some("bearer look")),
            Caller::Authenticated {
                subject: "auditor".into(),
                can_issue: false
            }
        );
    }

    #[test]
    fn test_bad_tokens_rejected() {
        assert!(matches!(
            tokens().authenticate(Some("Bearer nope")),
            Caller::Rejected(_)
        ));
        assert!(matches!(
            tokens().authenticate(Some("Basic s3cret")),
            Caller::Rejected(_)
        ));
    }

    #[test]
    fn test_capability_exchange() {
        assert!(matches!(
            Caller::Anonymous.issuer_capability(),
            Err(IssueError::Unauthenticated)
        ));
        assert!(matches!(
            Caller::Rejected("x".into()).issuer_capability(),
            Err(IssueError::Forbidden(_))
        ));
        assert!(matches!(
            Caller::Authenticated {
                subject: "auditor".into(),
                can_issue: false
            }
            .issuer_capability(),
            Err(IssueError::Forbidden(_))
        ));
        let cap = Caller::issuer("registrar").issuer_capability().unwrap();
        assert_eq!(cap.subject(), "registrar");
    }

    #[test]
    fn test_debug_hides_tokens() {
        let rendered = format!("{:?}", tokens());
        assert!(!rendered.contains("s3cret"));
    }
}
