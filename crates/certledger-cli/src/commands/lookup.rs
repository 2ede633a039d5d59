//! Lookup command implementation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;

use certledger_core::{ContentId, Keypair};
use certledger_ledger::{LedgerClient, Lookup};

use crate::context::Globals;
use crate::output::print_json;

pub async fn run(globals: &Globals, cid: &str) -> Result<ExitCode> {
    let cid = ContentId::parse(cid.trim()).context("invalid content identifier")?;

    // Reads need no credential of our own.
    let credential = match &globals.key {
        Some(_) => globals.credential()?,
        None => Keypair::generate(),
    };
    let client = LedgerClient::new(globals.open_ledger()?, credential, globals.config()?.ledger);
    client.connect().await.context("failed to connect to ledger")?;

    match client.lookup(&cid).await? {
        Lookup::Found(record) => {
            print_json(&json!({
                "fileHash": record.cid.to_string(),
                "recipient": record.recipient,
                "issuer": record.issuer,
                "issued_on": record.issued_at,
                "valid": record.valid,
            }));
            Ok(ExitCode::SUCCESS)
        }
        Lookup::NotFound => {
            print_json(&json!({ "fileHash": cid.to_string(), "found": false }));
            Ok(ExitCode::FAILURE)
        }
    }
}
