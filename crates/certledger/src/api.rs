//! HTTP-shaped endpoint handlers.
//!
//! Handlers take already-parsed multipart forms and return a status code and
//! JSON body. Binding them to a server is up to the embedding application.

use serde_json::{json, Value};
use tracing::error;

use certledger_core::{Receipt, VerificationVerdict};
use certledger_ledger::LedgerBackend;

use crate::error::{IssueError, VerifyError};
use crate::service::CertService;
use crate::upload::Upload;

/// Status code and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fields of the issuance form.
#[derive(Debug, Clone, Default)]
pub struct IssueForm {
    pub file: Option<Upload>,
    pub recipient: Option<String>,
    pub issuer: Option<String>,
}

/// Fields of the verification form.
#[derive(Debug, Clone, Default)]
pub struct VerifyForm {
    pub certificate: Option<Upload>,
}

/// `POST /issue` (authenticated).
pub async fn issue_endpoint<B: LedgerBackend + 'static>(
    service: &CertService<B>,
    authorization: Option<&str>,
    form: IssueForm,
) -> ApiResponse {
    let caller = service.authenticate(authorization);
    // Credentials are checked before the body is looked at.
    if let Err(e) = caller.issuer_capability() {
        return issue_error(&e);
    }

    let Some(file) = form.file else {
        return ApiResponse::new(
            400,
            json!({ "success": false, "error": "No file uploaded" }),
        );
    };

    match service
        .issue(
            caller,
            file,
            form.recipient.unwrap_or_default(),
            form.issuer.unwrap_or_default(),
        )
        .await
    {
        Ok(receipt) => ApiResponse::new(200, receipt_body(&receipt)),
        Err(e) => issue_error(&e),
    }
}

/// `POST /verify` (public).
pub async fn verify_endpoint<B: LedgerBackend + 'static>(
    service: &CertService<B>,
    form: VerifyForm,
) -> ApiResponse {
    let Some(certificate) = form.certificate else {
        return ApiResponse::new(400, json!({ "error": "No file uploaded" }));
    };

    match service.verify(certificate).await {
        Ok(verdict) => ApiResponse::new(200, verdict_body(&verdict)),
        Err(VerifyError::InvalidRequest(msg)) => ApiResponse::new(400, json!({ "error": msg })),
        Err(VerifyError::Read(e)) => ApiResponse::new(
            400,
            json!({ "error": format!("File upload error: {e}") }),
        ),
        Err(VerifyError::Internal { step, message }) => {
            error!(%step, %message, "verification failed");
            ApiResponse::new(
                500,
                json!({
                    "error": "Internal server error during verification",
                    "isAuthentic": false,
                    "step": step.as_str(),
                    "details": message,
                }),
            )
        }
    }
}

/// Success body of the issuance endpoint.
pub fn receipt_body(receipt: &Receipt) -> Value {
    json!({
        "success": true,
        "fileHash": receipt.cid.to_string(),
        "recipient": receipt.recipient,
        "issuer": receipt.issuer,
        "issued_on": receipt.issued_on(),
        "qr": receipt.qr_image,
        "link": receipt.verification_link,
        "transaction": receipt.transaction.to_string(),
    })
}

/// Body of the verification endpoint.
pub fn verdict_body(verdict: &VerificationVerdict) -> Value {
    let resolved = verdict.recipient.is_known() || verdict.issuer.is_known();
    let ledger_data = if resolved {
        json!({
            "recipient": verdict.recipient.as_str(),
            "issuer": verdict.issuer.as_str(),
            "issued_on": verdict.issued_at.as_str(),
            "valid": verdict.is_authentic,
        })
    } else {
        Value::Null
    };

    json!({
        "isAuthentic": verdict.is_authentic,
        "details": {
            "fileHash": verdict.cid.to_string(),
            "recipient": verdict.recipient.as_str(),
            "issuer": verdict.issuer.as_str(),
            "issued_on": verdict.issued_at.as_str(),
        },
        "checks": {
            "blockchainVerification": verdict.is_authentic,
            "hashValidation": true,
        },
        "ledgerReachable": verdict.ledger_reachable,
        "errorMessage": verdict.error_message,
        "blockchainData": ledger_data,
    })
}

/// Status and body for a failed issuance.
pub fn issue_error(err: &IssueError) -> ApiResponse {
    match err {
        IssueError::Unauthenticated => ApiResponse::new(
            401,
            json!({ "success": false, "error": "Access token not found" }),
        ),
        IssueError::Forbidden(reason) => ApiResponse::new(
            403,
            json!({ "success": false, "error": "Access denied", "details": reason }),
        ),
        IssueError::InvalidRequest(reason) => {
            ApiResponse::new(400, json!({ "success": false, "error": reason }))
        }
        IssueError::Read(e) => ApiResponse::new(
            400,
            json!({ "success": false, "error": format!("File upload error: {e}") }),
        ),
        IssueError::DuplicateContent(cid) => ApiResponse::new(
            409,
            json!({
                "success": false,
                "error": "Certificate with this content already exists",
                "details": "A certificate with identical content has already been issued",
                "fileHash": cid.to_string(),
            }),
        ),
        IssueError::LedgerUnavailable(e) => ApiResponse::new(
            503,
            json!({
                "success": false,
                "error": "Ledger service unavailable",
                "details": e.to_string(),
            }),
        ),
        IssueError::Internal { step, message } => {
            error!(%step, %message, "issuance failed");
            ApiResponse::new(
                500,
                json!({
                    "success": false,
                    "error": "Internal server error during certificate issuance",
                    "step": step.as_str(),
                    "details": message,
                }),
            )
        }
    }
}
