//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod ask;
pub mod chat;
pub mod status;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::cli::ask::run_ask;
use crate::cli::chat::run_chat;
use crate::cli::status::show_status;
use crate::core::app::AppSettings;
use crate::core::config::Config;

#[derive(Parser)]
#[command(name = "citytalk")]
#[command(about = "A terminal chat client for streaming city-data assistants")]
#[command(
    long_about = "CityTalk is a terminal chat client for backends that answer natural-language \
questions about city data. Answers stream in as they are written, and each \
query regenerates a map document whose URL is reported after the answer.\n\n\
Environment Variables:\n\
  CITYTALK_BASE_URL   Backend base URL (overridden by --base-url)\n\
  CITYTALK_LOG        Diagnostic log filter, e.g. citytalk=debug\n\n\
Controls:\n\
  Type              Enter your question at the prompt\n\
  Enter             Send the question\n\
  Ctrl+D            Quit the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL (overrides config and CITYTALK_BASE_URL)
    #[arg(short = 'u', long = "base-url", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Seconds to wait for a streamed answer before giving up
    #[arg(short = 't', long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Enable transcript logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Ask a single question, print the answer, and exit
    Ask {
        /// The question to send
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Show the backend's health report
    Status,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(async_main())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CITYTALK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = Config::load()?;
    let settings =
        AppSettings::from_config(&config, args.base_url.as_deref(), args.timeout, args.log);

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(settings).await,
        Commands::Ask { prompt } => run_ask(settings, &prompt.join(" ")).await,
        Commands::Status => show_status(&settings.base_url).await,
    }
}
