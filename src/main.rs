use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use hark::{Config, Daemon, StdinSource, TranscriptSource, find_match};

/// Hark - voice-command gateway
#[derive(Parser)]
#[command(name = "hark", version, about)]
struct Cli {
    /// Path to config.yaml (defaults to the user config dir)
    #[arg(short, long, env = "HARK_CONFIG")]
    config: Option<PathBuf>,

    /// Transcript source to run against
    #[arg(long, env = "HARK_SOURCE", default_value = "stdin")]
    source: SourceKind,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceKind {
    /// One finalized transcript per stdin line
    Stdin,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and print a summary
    Check,
    /// List configured commands and their phrases
    Commands,
    /// Push one transcript through the matcher (and optionally the executor)
    Test {
        /// Transcript text, as the STT engine would emit it
        text: String,
        /// Execute the matched action instead of only reporting the match
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,hark=info",
        1 => "info,hark=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Check => cmd_check(&config),
            Command::Commands => cmd_commands(&config),
            Command::Test { text, execute } => cmd_test(&config, &text, execute).await,
        };
    }

    tracing::info!(
        wake_words = ?config.wake_words,
        commands = config.commands.len(),
        source = ?cli.source,
        "starting hark gateway"
    );

    let source: Box<dyn TranscriptSource> = match cli.source {
        SourceKind::Stdin => Box::new(StdinSource::new()),
    };

    // Ctrl-c flips the shutdown signal; the daemon drains and exits
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let daemon = Daemon::new(config, shutdown_rx)?;
    daemon.run(source).await?;

    Ok(())
}

/// Validate configuration and print a summary
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    println!("configuration ok");
    println!("  wake words:           {}", config.wake_words.join(", "));
    println!("  match threshold:      {}", config.match_threshold);
    println!("  confidence threshold: {}", config.confidence_threshold);
    println!("  execution timeout:    {:?}", config.execution_timeout);
    println!("  command dwell:        {:?}", config.command_dwell);
    println!("  commands:             {}", config.commands.len());
    Ok(())
}

/// List configured commands with their phrases
fn cmd_commands(config: &Config) -> anyhow::Result<()> {
    if config.commands.is_empty() {
        println!("no commands configured");
        return Ok(());
    }

    for spec in &config.commands {
        println!("{}", spec.description);
        for phrase in &spec.phrases {
            println!("  \"{phrase}\"");
        }
    }
    Ok(())
}

/// Run one transcript through match (and optionally execute), no wake gating
async fn cmd_test(config: &Config, text: &str, execute: bool) -> anyhow::Result<()> {
    let Some(m) = find_match(text, &config.commands, config.match_threshold) else {
        println!("no command matched (threshold {})", config.match_threshold);
        return Ok(());
    };

    println!("matched: {} (score {:.2})", m.spec.description, m.score);
    if !m.params.is_empty() {
        let mut params: Vec<(&String, &String)> = m.params.iter().collect();
        params.sort();
        for (name, value) in params {
            println!("  {name} = \"{value}\"");
        }
    }

    if !execute {
        return Ok(());
    }

    let action = m.spec.action.clone();
    let params = m.params;
    let executor = hark::CommandExecutor::new(config.execution_timeout);
    let result = executor.execute(&action, &params).await;

    if result.success {
        println!("ok ({:?})", result.duration);
    } else if let Some(kind) = result.error_kind {
        println!("failed: {kind} ({:?})", result.duration);
    }
    if !result.output.is_empty() {
        println!("{}", result.output);
    }

    Ok(())
}
