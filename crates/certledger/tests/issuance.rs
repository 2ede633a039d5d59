//! End-to-end issuance against an in-memory ledger.

use std::sync::Arc;
use std::time::Duration;

use certledger::{Caller, IssueError, Step};
use certledger_core::ContentId;
use certledger_ledger::Faults;
use certledger_testkit::{sample_pdf, TestHarness};

#[tokio::test]
async fn test_issue_returns_receipt_and_records() {
    let h = TestHarness::new().await;
    let doc = sample_pdf("ada");

    let receipt = h
        .service
        .issue(h.issuer(), h.upload(&doc, "diploma.pdf"), "Ada Lovelace".into(), "Analytical U".into())
        .await
        .unwrap();

    let cid = ContentId::of_bytes(&doc);
    assert_eq!(receipt.cid, cid);
    assert_eq!(
        receipt.verification_link,
        format!("https://certs.example.org/verify?fileH={cid}")
    );
    assert!(receipt.qr_image.starts_with("data:image/png;base64,"));

    let record = h.ledger.record(&cid).unwrap();
    assert_eq!(record.recipient, "Ada Lovelace");
    assert_eq!(record.issuer, "Analytical U");
    assert_eq!(record.issued_at, receipt.issued_on());
    assert_eq!(h.evidence_files("issued"), vec![format!("{cid}.pdf")]);
    assert!(h.evidence_files(".staging").is_empty());
}

#[tokio::test]
async fn test_second_issuance_is_duplicate() {
    let h = TestHarness::new().await;
    let doc = sample_pdf("ada");

    h.service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap();

    // Same bytes, different name and terms.
    let err = h
        .service
        .issue(h.issuer(), h.upload(&doc, "b.png"), "Eve".into(), "Other".into())
        .await
        .unwrap_err();

    assert!(matches!(err, IssueError::DuplicateContent(cid) if cid == ContentId::of_bytes(&doc)));
    assert_eq!(h.ledger.record_count(), 1);
    assert_eq!(h.ledger.submission_count(), 1);
    assert_eq!(h.evidence_files("issued").len(), 1);
}

#[tokio::test]
async fn test_duplicate_detected_from_ledger_alone() {
    let h = TestHarness::new().await;
    let doc = sample_pdf("ada");
    h.service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap();

    // Evidence lost; the ledger still knows.
    std::fs::remove_dir_all(h.service.evidence().root().join("issued")).unwrap();
    std::fs::create_dir_all(h.service.evidence().root().join("issued")).unwrap();

    let err = h
        .service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::DuplicateContent(_)));

    // Also when the fast existence check is missing.
    h.ledger.update_faults(|f| f.exists_unsupported = true);
    let err = h
        .service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::DuplicateContent(_)));
}

#[tokio::test]
async fn test_fields_are_trimmed_and_required() {
    let h = TestHarness::new().await;

    let receipt = h
        .service
        .issue(
            h.issuer(),
            h.upload(&sample_pdf("ada"), "a.pdf"),
            "  Ada Lovelace\t".into(),
            "\nAnalytical U ".into(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.recipient, "Ada Lovelace");
    assert_eq!(receipt.issuer, "Analytical U");

    let err = h
        .service
        .issue(h.issuer(), h.upload(&sample_pdf("bob"), "b.pdf"), "   ".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::InvalidRequest(_)));
    assert_eq!(h.ledger.submission_count(), 1);
}

#[tokio::test]
async fn test_capability_checked_first() {
    let h = TestHarness::new().await;
    // Nothing is read for a caller that may not issue.
    let missing = certledger::Upload::from_path("/nonexistent/upload", Some("x.pdf"));

    let err = h
        .service
        .issue(Caller::Anonymous, missing.clone(), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Unauthenticated));

    let viewer = Caller::Authenticated {
        subject: "auditor".into(),
        can_issue: false,
    };
    let err = h
        .service
        .issue(viewer, missing, "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Forbidden(_)));
}

#[tokio::test]
async fn test_ledger_down_is_distinct_and_leaves_nothing() {
    let h = TestHarness::new().await;
    h.ledger.set_reachable(false);

    let err = h
        .service
        .issue(h.issuer(), h.upload(&sample_pdf("ada"), "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();

    assert!(matches!(err, IssueError::LedgerUnavailable(_)));
    assert!(h.evidence_files("issued").is_empty());
    assert!(h.evidence_files(".staging").is_empty());
}

#[tokio::test]
async fn test_retry_after_confirmation_timeout_issues() {
    let h = TestHarness::with_config(|c| {
        c.ledger.confirmation_timeout = Duration::from_millis(50);
    })
    .await;
    let doc = sample_pdf("ada");
    let cid = ContentId::of_bytes(&doc);

    h.ledger
        .update_faults(|f| f.confirmation_delay = Some(Duration::from_millis(500)));
    let err = h
        .service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::LedgerUnavailable(_)));
    assert!(h.evidence_files("issued").is_empty());

    h.ledger.update_faults(|f| f.confirmation_delay = None);
    let receipt = h
        .service
        .issue(h.issuer(), h.upload(&doc, "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap();
    assert_eq!(receipt.cid, cid);
    assert_eq!(h.ledger.record_count(), 1);
    assert_eq!(h.ledger.pending_count(), 0);
    assert_eq!(h.evidence_files("issued"), vec![format!("{cid}.pdf")]);

    let verdict = h.service.verify(h.upload(&doc, "copy.pdf")).await.unwrap();
    assert!(verdict.is_authentic);
}

#[tokio::test]
async fn test_no_session_is_unavailable() {
    let h = TestHarness::new().await;
    h.service.ledger().disconnect();

    let err = h
        .service
        .issue(h.issuer(), h.upload(&sample_pdf("ada"), "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::LedgerUnavailable(_)));

    h.service.connect().await.unwrap();
    h.service
        .issue(h.issuer(), h.upload(&sample_pdf("ada"), "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_confirmation_persists_nothing() {
    let h = TestHarness::new().await;
    h.ledger.set_faults(Faults {
        fail_confirmations: true,
        ..Faults::default()
    });

    let err = h
        .service
        .issue(h.issuer(), h.upload(&sample_pdf("ada"), "a.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IssueError::Internal {
            step: Step::LedgerWrite,
            ..
        }
    ));
    assert_eq!(h.ledger.record_count(), 0);
    assert!(h.evidence_files("issued").is_empty());
    assert!(h.evidence_files(".staging").is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_read_error() {
    let h = TestHarness::with_config(|c| c.max_upload_bytes = Some(16)).await;

    let err = h
        .service
        .issue(h.issuer(), h.upload(&[0u8; 64], "big.pdf"), "Ada".into(), "Uni".into())
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Read(_)));
    assert_eq!(h.ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_concurrent_identical_issuances_single_winner() {
    let h = TestHarness::new().await;
    let service = Arc::new(h.service);
    let doc = sample_pdf("race");

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = Arc::clone(&service);
        let upload = certledger::Upload::from_bytes(doc.clone(), Some("race.pdf"));
        handles.push(tokio::spawn(async move {
            service
                .issue(
                    Caller::issuer("registrar"),
                    upload,
                    format!("Recipient {i}"),
                    "Uni".into(),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(IssueError::DuplicateContent(_)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(h.ledger.record_count(), 1);
    assert_eq!(h.ledger.submission_count(), 1);
}

#[tokio::test]
async fn test_distinct_documents_issue_independently() {
    let h = TestHarness::new().await;
    for name in ["ada", "bob", "cy"] {
        h.service
            .issue(h.issuer(), h.upload(&sample_pdf(name), "c.pdf"), name.into(), "Uni".into())
            .await
            .unwrap();
    }
    assert_eq!(h.ledger.record_count(), 3);
    assert_eq!(h.evidence_files("issued").len(), 3);
}
