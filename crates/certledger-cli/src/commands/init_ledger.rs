//! Init-ledger command implementation.

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::context::Globals;
use crate::output::print_json;

pub fn run(globals: &Globals, network: &str) -> Result<ExitCode> {
    let owner = globals.credential()?.public_key();
    let ledger = globals.open_ledger()?;
    ledger
        .initialize(owner, network)
        .context("failed to initialize ledger")?;
    info!(path = %globals.ledger.display(), %network, %owner, "ledger initialized");

    print_json(&json!({
        "ledger": globals.ledger.display().to_string(),
        "network": network,
        "owner": owner.to_hex(),
        "records": ledger.record_count()?,
    }));
    Ok(ExitCode::SUCCESS)
}
