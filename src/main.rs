use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxwatch::cli::rates::parse_amount;
use fxwatch::core::CurrencyCode;
use fxwatch::core::log::init_logging;

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

impl From<Commands> for fxwatch::AppCommand {
    fn from(cmd: Commands) -> fxwatch::AppCommand {
        match cmd {
            Commands::Rates { base, amount } => fxwatch::AppCommand::Rates { base, amount },
            Commands::Watch { base, amount } => fxwatch::AppCommand::Watch { base, amount },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch and display the latest rates once
    Rates {
        /// Base currency, overriding the configured one
        #[arg(short, long)]
        base: Option<CurrencyCode>,
        /// Amount of the base currency to convert
        #[arg(short, long, default_value_t = 1.0, value_parser = parse_amount)]
        amount: f64,
    },
    /// Keep rates up to date and accept commands from stdin
    Watch {
        /// Base currency, overriding the configured one
        #[arg(short, long)]
        base: Option<CurrencyCode>,
        /// Amount of the base currency to convert
        #[arg(short, long, default_value_t = 1.0, value_parser = parse_amount)]
        amount: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxwatch::cli::setup::setup(),
        Some(cmd) => fxwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
