use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coincast::core::log::init_logging;

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

impl From<Commands> for coincast::AppCommand {
    fn from(cmd: Commands) -> coincast::AppCommand {
        match cmd {
            Commands::Convert { amount, from, to } => {
                coincast::AppCommand::Convert { amount, from, to }
            }
            Commands::Currencies => coincast::AppCommand::Currencies,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between currencies, forecasting crypto sources
    Convert {
        /// Amount of the source currency
        amount: f64,
        /// Source currency id, e.g. bitcoin or eur
        from: String,
        /// Target currency id, e.g. usd
        to: String,
    },
    /// List supported currencies
    Currencies,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coincast::cli::setup::setup(),
        Some(cmd) => coincast::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
