//! Keygen command implementation.

use std::process::ExitCode;

use anyhow::Result;
use serde_json::json;

use certledger_core::Keypair;

use crate::output::print_json;

pub fn run() -> Result<ExitCode> {
    let keypair = Keypair::generate();
    print_json(&json!({
        "seed": keypair.seed_hex(),
        "publicKey": keypair.public_key().to_hex(),
    }));
    Ok(ExitCode::SUCCESS)
}
