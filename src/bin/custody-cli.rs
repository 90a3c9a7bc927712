//! Operator CLI over a bundle JSON file.
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use wallet_custody::core::signer::verify_message;
use wallet_custody::{CustodyConfig, SigningRequest, WalletShareBundle, WalletShareManager};

#[derive(Parser)]
#[command(name = "custody-cli")]
#[command(about = "Threshold wallet custody: create, sign, recover, rotate, export")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML config file (defaults to $CUSTODY_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment variable holding the PIN; prompts on stdin when unset
    #[arg(long, global = true, default_value = "CUSTODY_PIN")]
    pin_env: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a wallet and write its bundle
    Create {
        #[arg(long)]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Sign a message with the device + server shares
    SignMessage {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long)]
        message: String,
    },
    /// Rebuild from the server + recovery shares, optionally signing a message
    Recover {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long)]
        message: Option<String>,
    },
    /// Issue fresh shares at the next epoch
    Rotate {
        #[arg(long)]
        bundle: PathBuf,
        /// Where to write the rotated bundle (defaults to replacing --bundle)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the backup mnemonic
    ExportMnemonic {
        #[arg(long)]
        bundle: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let config = match &args.config {
        Some(path) => CustodyConfig::load(path)?,
        None => CustodyConfig::from_env()?,
    };
    let manager = WalletShareManager::new(config)?;

    match args.command {
        Commands::Create { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }
            let pin = read_pin(&args.pin_env)?;
            let created = manager.create_wallet(&pin).await?;
            write_bundle(&output, &created.bundle).await?;
            info!(address = %created.address, path = %output.display(), "bundle written");

            let mut out = io::stdout().lock();
            writeln!(out, "address:       {}", created.address)?;
            writeln!(out, "mnemonic:      {}", created.mnemonic.expose_secret())?;
            writeln!(out, "recovery code: {}", created.recovery_code.expose_secret())?;
            writeln!(out, "Write these down now; they are not shown again.")?;
        }
        Commands::SignMessage { bundle, message } => {
            let bundle = read_bundle(&bundle).await?;
            let pin = read_pin(&args.pin_env)?;
            let signed = manager.sign(&bundle, &pin, &SigningRequest::message(&message)).await?;
            println!("{}", signed.signature_hex());
        }
        Commands::Recover { bundle, message } => {
            let bundle = read_bundle(&bundle).await?;
            let pin = read_pin(&args.pin_env)?;
            match message {
                Some(message) => {
                    let signed = manager
                        .recover_and_sign(&bundle, &pin, &SigningRequest::message(&message))
                        .await?;
                    if !verify_message(message.as_bytes(), signed.signature(), &bundle.address)? {
                        bail!("signature does not verify against {}", bundle.address);
                    }
                    println!("{}", signed.signature_hex());
                }
                None => {
                    manager.verify_recovery(&bundle, &pin).await?;
                    println!("recovery shares rebuild {}", bundle.address);
                }
            }
        }
        Commands::Rotate { bundle: path, output } => {
            let bundle = read_bundle(&path).await?;
            let pin = read_pin(&args.pin_env)?;
            let rotated = manager.rotate_device_share(&bundle, &pin).await?;
            let target = output.unwrap_or(path);
            write_bundle(&target, &rotated.bundle).await?;
            println!(
                "rotated {} to epoch {} ({})",
                rotated.bundle.address,
                rotated.bundle.share_epoch,
                target.display()
            );
        }
        Commands::ExportMnemonic { bundle } => {
            let bundle = read_bundle(&bundle).await?;
            let pin = read_pin(&args.pin_env)?;
            let mnemonic = manager.export_mnemonic(&bundle, &pin).await?;
            println!("{}", mnemonic.expose_secret());
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn read_pin(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pin) = std::env::var(env_var) {
        let pin = Zeroizing::new(pin);
        return Ok(Zeroizing::new(pin.trim().to_string()));
    }
    if io::stdin().is_terminal() {
        eprint!("PIN: ");
        io::stderr().flush()?;
    }
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line).context("failed to read PIN from stdin")?;
    Ok(Zeroizing::new(line.trim().to_string()))
}

async fn read_bundle(path: &Path) -> Result<WalletShareBundle> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read bundle {}", path.display()))?;
    Ok(WalletShareBundle::from_json(&raw)?)
}

/// Write via a temp file and rename so a reader never sees a partial bundle.
async fn write_bundle(path: &Path, bundle: &WalletShareBundle) -> Result<()> {
    let json = bundle.to_json()?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move bundle into {}", path.display()))?;
    Ok(())
}
