//! Issue command implementation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;

use certledger::{issue_error, receipt_body, Caller, Upload};

use crate::context::Globals;
use crate::output::print_json;

pub async fn run(
    globals: &Globals,
    file: PathBuf,
    recipient: String,
    issuer: String,
) -> Result<ExitCode> {
    let service = globals.service().await?;
    let filename = file.file_name().and_then(|n| n.to_str()).map(str::to_owned);
    let upload = Upload::from_path(&file, filename.as_deref());

    match service
        .issue(Caller::issuer("cli"), upload, recipient, issuer)
        .await
    {
        Ok(receipt) => {
            print_json(&receipt_body(&receipt));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&issue_error(&e).body);
            Ok(ExitCode::FAILURE)
        }
    }
}
