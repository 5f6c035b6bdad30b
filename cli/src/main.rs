//! chainops: operations CLI for proxied contract deployments.
//!
//! Resolves contracts through a chain-scoped JSON address book and
//! drives the two-phase implementation swap behind upgradeable proxies:
//! stage the new implementation on the proxy, then have the new
//! implementation accept it.

mod address_book;
mod commands;
mod env;

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};

use crate::commands::upgrade::{AcceptPolicy, UpgradeRequest};

#[derive(Parser)]
#[command(name = "chainops", version)]
#[command(about = "Operations CLI for proxied contract deployments")]
struct Cli {
    /// Path to the JSON address book
    #[arg(long, env = "ADDRESS_BOOK", default_value = "addresses.json")]
    address_book: PathBuf,

    /// Ethereum JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", default_value = "http://localhost:8545")]
    provider: String,

    /// Hex-encoded private key of the operator account
    #[arg(long, env = "OPERATOR_KEY", hide_env_values = true)]
    private_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Point a proxied contract at a new implementation
    Upgrade {
        /// Contract name to upgrade
        #[arg(short = 'n', long)]
        contract: String,

        /// Address of the new contract implementation
        #[arg(short = 'i', long = "impl")]
        implementation: Address,

        /// Init arguments as comma-separated values
        #[arg(short = 'x', long)]
        init: Option<String>,

        /// Stop without submitting anything when the proxy already
        /// points at the target implementation
        #[arg(long)]
        skip_if_current: bool,
    },

    /// Show the recorded and live state of a contract
    Status {
        /// Contract name to inspect
        #[arg(short = 'n', long)]
        contract: String,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chainops_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let env =
        env::load(&cli.address_book, &cli.provider, &cli.private_key).await?;

    match cli.command {
        Commands::Upgrade { contract, implementation, init, skip_if_current } => {
            let request = UpgradeRequest {
                contract,
                implementation,
                init_args: commands::upgrade::split_init_args(init.as_deref()),
            };
            let policy = if skip_if_current {
                AcceptPolicy::SkipWhenCurrent
            } else {
                AcceptPolicy::Always
            };
            commands::upgrade::run(&env.chain, &env.book, &request, policy)
                .await?;
        }
        Commands::Status { contract } => {
            commands::status::run(&env.chain, &env.book, &contract).await?;
        }
    }

    Ok(())
}
