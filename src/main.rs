//! Vault wallet CLI
//!
//! PINs are read from `WALLET_PIN` or, when unset, from a line on stdin.

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use stellar_vault_wallet::config::env_vars;
use stellar_vault_wallet::{
    AssetRef, Config, Error, Network, PublicKey, QuoteQuery, Result, SigningRequest, Slippage,
    WalletRunner,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "vault-wallet")]
#[command(about = "PIN-protected wallet with local signing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new keypair and store it encrypted
    Create,

    /// Import an S... secret seed read from stdin
    Import,

    /// Show wallet status
    Status,

    /// Lock the session
    Lock,

    /// Switch between testnet and public network
    Network {
        /// testnet or public
        network: Network,
    },

    /// Delete the stored wallet
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Print the secret seed for backup
    Export,

    /// Send a payment
    Pay {
        /// Destination account (G...)
        #[arg(long)]
        to: PublicKey,

        /// Decimal amount
        #[arg(long)]
        amount: String,

        /// "native" or CODE:ISSUER
        #[arg(long, default_value = "native")]
        asset: AssetRef,
    },

    /// Add a trustline
    Trust {
        /// CODE:ISSUER
        asset: AssetRef,

        /// Optional trust limit
        #[arg(long)]
        limit: Option<String>,
    },

    /// Remove a trustline
    Untrust {
        /// CODE:ISSUER
        asset: AssetRef,
    },

    /// List swap quotes
    Quotes {
        #[arg(long)]
        from: AssetRef,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        to: AssetRef,
    },

    /// Swap along a quoted path
    Swap {
        #[arg(long)]
        from: AssetRef,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        to: AssetRef,

        /// Quote source label; defaults to the first quote
        #[arg(long)]
        source: Option<String>,

        /// Slippage tolerance in percent
        #[arg(long, default_value_t = 0.5)]
        slippage: f64,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    let config = Config::load(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let runner = WalletRunner::open(config).await?;

    match cli.command {
        Commands::Create => {
            let pin = read_pin()?;
            let public_key = runner.session().lock().await.create_wallet(&pin).await?;
            println!("{}", public_key);
        }
        Commands::Import => {
            let secret = SecretString::from(read_line("Secret seed: ")?);
            let pin = read_pin()?;
            let public_key = runner
                .session()
                .lock()
                .await
                .import_wallet(&secret, &pin)
                .await?;
            println!("{}", public_key);
        }
        Commands::Status => {}
        Commands::Lock => runner.session().lock().await.lock(),
        Commands::Network { network } => {
            runner
                .session()
                .lock()
                .await
                .switch_network(network)
                .await?;
        }
        Commands::Delete { yes } => {
            if !yes {
                return Err(Error::InvalidArgument(
                    "Refusing to delete without --yes".to_string(),
                ));
            }
            runner.session().lock().await.delete_wallet().await?;
        }
        Commands::Export => {
            let pin = read_pin()?;
            let secret = runner.session().lock().await.export_secret(&pin).await?;
            println!("{}", secret.expose_secret());
            return Ok(());
        }
        Commands::Pay { to, amount, asset } => {
            let request = SigningRequest::payment(&to, &asset, &amount, read_pin()?)?;
            print_json(&runner.execute(request).await?)?;
            return Ok(());
        }
        Commands::Trust { asset, limit } => {
            let request = SigningRequest::trustline_add(&asset, limit.as_deref(), read_pin()?)?;
            print_json(&runner.execute(request).await?)?;
            return Ok(());
        }
        Commands::Untrust { asset } => {
            let request = SigningRequest::trustline_remove(&asset, read_pin()?);
            print_json(&runner.execute(request).await?)?;
            return Ok(());
        }
        Commands::Quotes { from, amount, to } => {
            let query = QuoteQuery::new(from, &amount, to)?;
            print_json(&runner.quotes(&query).await?)?;
            return Ok(());
        }
        Commands::Swap {
            from,
            amount,
            to,
            source,
            slippage,
        } => {
            let query = QuoteQuery::new(from, &amount, to)?;
            let slippage = Slippage::percent(slippage)?;
            let result = runner
                .swap(&query, source.as_deref(), slippage, read_pin()?)
                .await?;
            print_json(&result)?;
            return Ok(());
        }
        Commands::Config => {}
    }

    print_json(&runner.report().await)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_pin() -> Result<SecretString> {
    if let Ok(pin) = std::env::var(env_vars::PIN) {
        return Ok(SecretString::from(pin));
    }
    Ok(SecretString::from(read_line("PIN: ")?))
}

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        return Err(Error::InvalidArgument("Empty input".to_string()));
    }
    Ok(line)
}
