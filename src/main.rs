use anyhow::Result;
use asset_price::core::log::init_logging;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for asset_price::AppCommand {
    fn from(cmd: Commands) -> asset_price::AppCommand {
        match cmd {
            Commands::Serve => asset_price::AppCommand::Serve,
            Commands::Price { symbol, currency } => {
                asset_price::AppCommand::Price { symbol, currency }
            }
            Commands::Assets => asset_price::AppCommand::Assets,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the price tools over stdio (default)
    Serve,
    /// Print the price of a symbol, or of the default symbols
    Price {
        /// Asset symbol such as XAU or BTC
        symbol: Option<String>,
        /// Currency to express the price in
        #[arg(short = 'C', long)]
        currency: Option<String>,
    },
    /// List every supported asset
    Assets,
    /// Create default configuration
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => asset_price::cli::setup::setup(),
        Some(cmd) => asset_price::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            asset_price::run_command(asset_price::AppCommand::Serve, cli.config_path.as_deref())
                .await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
