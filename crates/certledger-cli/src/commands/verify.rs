//! Verify command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};

use certledger::{verdict_body, Upload};

use crate::context::Globals;
use crate::output::print_json;

pub async fn run(globals: &Globals, file: PathBuf, strict: bool) -> Result<ExitCode> {
    let service = globals.service().await?;
    let filename = file.file_name().and_then(|n| n.to_str()).map(str::to_owned);
    let upload = Upload::from_path(&file, filename.as_deref());

    let verdict = service
        .verify(upload)
        .await
        .with_context(|| format!("failed to verify {}", file.display()))?;
    print_json(&verdict_body(&verdict));

    if strict && !verdict.is_authentic {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
