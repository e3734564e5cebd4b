use clap::{Parser, Subcommand};
use log::{error, info, warn};
use service::{config::Config, logging::Logger};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use webhook_auth::webhook::{
    HmacSigner, DEFAULT_NONCE_HEADER, DEFAULT_SIGNATURE_HEADER, DEFAULT_TIMESTAMP_HEADER,
};

/// Operator tool for checking and producing signed payment webhooks.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify a captured delivery. Exits with status 1 when it is rejected.
    Verify {
        /// File holding the raw request body
        #[arg(long)]
        body_file: PathBuf,
        /// Value of the timestamp header
        #[arg(long)]
        timestamp: Option<String>,
        /// Value of the signature header
        #[arg(long)]
        signature: Option<String>,
        /// Value of the nonce header
        #[arg(long)]
        nonce: Option<String>,
    },
    /// Sign a body the way the provider does and print the headers to send.
    Sign {
        /// File holding the raw request body
        #[arg(long)]
        body_file: PathBuf,
        /// Timestamp to sign, defaults to now in Unix seconds
        #[arg(long)]
        timestamp: Option<String>,
        /// Nonce to sign, defaults to a random UUID
        #[arg(long)]
        nonce: Option<String>,
        /// Emit the signature as lowercase hex instead of base64
        #[arg(long, default_value_t = false)]
        hex: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file first
    dotenvy::dotenv().ok();
    // Then parse the command line parameters and flags
    let cli = Cli::parse();

    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
        process::exit(2);
    }

    match cli.command {
        Command::Verify {
            body_file,
            timestamp,
            signature,
            nonce,
        } => verify(&cli.config, &body_file, timestamp, signature, nonce).await,
        Command::Sign {
            body_file,
            timestamp,
            nonce,
            hex,
        } => sign(&cli.config, &body_file, timestamp, nonce, hex),
    }
}

/// Completes when `signal` fires. A signal that could not be installed never fires.
async fn interrupted_by<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to listen for Ctrl-C, verification cannot be interrupted: {e}");
        std::future::pending::<()>().await;
    }
}

fn read_body(path: &Path) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to read body from {}: {e}", path.display());
            process::exit(2);
        }
    }
}

async fn verify(
    config: &Config,
    body_file: &Path,
    timestamp: Option<String>,
    signature: Option<String>,
    nonce: Option<String>,
) {
    let verifier = match service::build_verifier(config) {
        Ok(verifier) => verifier,
        Err(e) => {
            error!("Failed to build webhook verifier: {e}");
            process::exit(2);
        }
    };
    let body = read_body(body_file);

    let pairs = [
        (DEFAULT_TIMESTAMP_HEADER, timestamp),
        (DEFAULT_SIGNATURE_HEADER, signature),
        (DEFAULT_NONCE_HEADER, nonce),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|value| (name, value)));
    let headers = verifier.headers(pairs);

    let interrupted = interrupted_by(tokio::signal::ctrl_c());
    let result = verifier
        .verify_with_cancel(&body, &headers, chrono::Utc::now(), interrupted)
        .await;

    match result.reason() {
        None => {
            info!("Delivery accepted");
            println!("accepted");
        }
        Some(reason) => {
            info!("Delivery rejected: {reason}");
            println!("rejected: {}", reason.code());
            process::exit(1);
        }
    }
}

fn sign(
    config: &Config,
    body_file: &Path,
    timestamp: Option<String>,
    nonce: Option<String>,
    hex: bool,
) {
    let Some(secret) = config.webhook_secret().filter(|secret| !secret.is_empty()) else {
        error!("A webhook secret is required to sign, set WEBHOOK_SECRET or --webhook-secret");
        process::exit(2);
    };
    let body = read_body(body_file);

    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
    let nonce = nonce.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    let signer = HmacSigner::new(secret.as_bytes());
    let signature = if hex {
        signer.sign_hex(&timestamp, &nonce, &body)
    } else {
        signer.sign(&timestamp, &nonce, &body)
    };

    match signature {
        Ok(signature) => {
            println!("{DEFAULT_TIMESTAMP_HEADER}: {timestamp}");
            println!("{DEFAULT_NONCE_HEADER}: {nonce}");
            println!("{DEFAULT_SIGNATURE_HEADER}: {signature}");
        }
        Err(e) => {
            error!("Failed to sign body: {e}");
            process::exit(2);
        }
    }
}
