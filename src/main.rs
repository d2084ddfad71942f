//! BitMEX trading shell entry point.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bitmex_shell::config::{Config, Network};
use bitmex_shell::exchange::{Exchange, FeedExchange, RestExchange};
use bitmex_shell::shell::{Completions, EditorSource, Shell, Symbol};

/// Interactive shell for manual trading on BitMEX.
#[derive(Parser, Debug)]
#[command(name = "bitmex-shell")]
#[command(about = "Interactive command-line shell for manual trading on BitMEX")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Args {
    /// Symbol to start with (defaults to BITMEX_SYMBOL).
    symbol: Option<String>,

    /// Where account reads come from.
    #[arg(long, value_enum, default_value_t = FeedKind::Rest)]
    feed: FeedKind,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved configuration and check it.
    CheckConfig,
}

/// Source of account state.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FeedKind {
    /// Poll the REST API on every command.
    Rest,
    /// Stream account tables over the realtime websocket.
    Ws,
}

const MISSING_KEYS: &str = "Set the API keys first. Exiting.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the shell.
    let directives = Config::load()
        .unwrap_or_default()
        .log_filter(args.verbose);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    if args.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        None => cmd_shell(args.symbol, args.feed).await,
    }
}

/// Print the configuration with secrets masked.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BITMEX SHELL - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    println!("----------------------------------------------------------------------");
    println!("  Network:         {}", config.network());
    println!("  REST URL:        {}", config.bitmex_base_url);
    println!("  Realtime URL:    {}", config.bitmex_ws_url);
    println!("  API key:         {}", config.masked_api_key());
    println!(
        "  API secret:      {}",
        if config.bitmex_api_secret.is_empty() { "missing" } else { "present" }
    );
    println!("  Symbol:          {}", config.bitmex_symbol);
    println!("  Order id prefix: {}", config.order_id_prefix);
    println!("  Post-only:       {}", config.post_only);
    println!("  HTTP timeout:    {}ms", config.http_timeout_ms);
    println!("  Request expiry:  {}s", config.request_expiry_secs);
    println!("  Log filter:      {}", config.rust_log);
    println!("----------------------------------------------------------------------");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");
    Ok(())
}

/// Build the exchange and run the command loop.
async fn cmd_shell(symbol: Option<String>, feed: FeedKind) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    if !config.has_credentials() {
        println!("{MISSING_KEYS}");
        std::process::exit(1);
    }
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let symbol = Symbol::new(symbol.as_deref().unwrap_or(&config.bitmex_symbol))?;
    let network = config.network();
    info!(%network, %symbol, ?feed, "starting shell");

    match feed {
        FeedKind::Rest => {
            let exchange = RestExchange::new(&config).context("failed to build REST client")?;
            run_shell(exchange, network, symbol, config.post_only).await
        }
        FeedKind::Ws => {
            let exchange = FeedExchange::connect(&config)
                .await
                .context("failed to connect the account feed")?;
            run_shell(exchange, network, symbol, config.post_only).await
        }
    }
}

async fn run_shell<E: Exchange>(
    exchange: E,
    network: Network,
    symbol: Symbol,
    post_only: bool,
) -> anyhow::Result<()> {
    let completions = Completions::new();
    let input = EditorSource::new(completions.clone()).context("failed to open the terminal")?;
    let mut shell = Shell::new(exchange, network, symbol, input, std::io::stdout())
        .with_post_only(post_only)
        .with_completions(completions);

    // Ctrl-C at the prompt is handled by the editor; this covers a
    // command waiting on the exchange.
    tokio::select! {
        result = shell.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("Exit...");
            shell.close().await;
        }
    }

    Ok(())
}
