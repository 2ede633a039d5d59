//! certledger CLI - issue and verify certificates against a local ledger.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use certledger_ledger::DEFAULT_NETWORK;

mod commands;
mod context;
mod output;

use commands::{fingerprint, init_ledger, issue, keygen, lookup, verify};
use context::Globals;

#[derive(Parser)]
#[command(name = "certledger", version)]
#[command(about = "Certificate issuance and verification against a content-addressed ledger")]
struct Cli {
    /// Path to the ledger database
    #[arg(long, global = true, env = "CERTLEDGER_LEDGER", default_value = "certledger.db")]
    ledger: PathBuf,
    /// Ledger credential as a hex Ed25519 seed
    #[arg(long, global = true, env = "CERTLEDGER_LEDGER_KEY", hide_env_values = true)]
    key: Option<String>,
    /// Evidence store root (overrides CERTLEDGER_EVIDENCE_DIR)
    #[arg(long, global = true)]
    evidence_dir: Option<PathBuf>,
    /// Prefix of verification links (overrides CERTLEDGER_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a ledger credential
    Keygen,
    /// Create a ledger owned by the credential
    InitLedger {
        /// Network name reported by the ledger
        #[arg(long, default_value = DEFAULT_NETWORK)]
        network: String,
    },
    /// Print the content identifier of a document
    Fingerprint {
        /// Document to fingerprint
        file: PathBuf,
    },
    /// Issue a certificate for a document
    Issue {
        /// Document to certify
        file: PathBuf,
        /// Certificate recipient
        #[arg(long)]
        recipient: String,
        /// Issuing organization
        #[arg(long)]
        issuer: String,
    },
    /// Verify a document against the ledger
    Verify {
        /// Document to verify
        file: PathBuf,
        /// Exit with an error code unless the document is authentic
        #[arg(long)]
        strict: bool,
    },
    /// Show the ledger record for a content identifier
    Lookup {
        /// Content identifier (bafkrei... or bafybei...)
        cid: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let globals = Globals {
        ledger: cli.ledger,
        key: cli.key,
        evidence_dir: cli.evidence_dir,
        base_url: cli.base_url,
    };

    let result = match cli.command {
        Commands::Keygen => keygen::run(),
        Commands::InitLedger { network } => init_ledger::run(&globals, &network),
        Commands::Fingerprint { file } => fingerprint::run(&file),
        Commands::Issue {
            file,
            recipient,
            issuer,
        } => issue::run(&globals, file, recipient, issuer).await,
        Commands::Verify { file, strict } => verify::run(&globals, file, strict).await,
        Commands::Lookup { cid } => lookup::run(&globals, &cid).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
