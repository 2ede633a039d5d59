//! Fingerprint command implementation.

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;

use certledger_core::Fingerprinter;

use crate::output::print_json;

pub fn run(path: &Path) -> Result<ExitCode> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let len = file.metadata()?.len();
    let cid = Fingerprinter::default()
        .fingerprint(file, Some(len))
        .with_context(|| format!("failed to read {}", path.display()))?;

    print_json(&json!({
        "file": path.display().to_string(),
        "fileHash": cid.to_string(),
        "codec": cid.codec().as_str(),
        "digest": cid.digest_hex(),
    }));
    Ok(ExitCode::SUCCESS)
}
