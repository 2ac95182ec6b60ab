//! MauricIA binary — interactive chat loop over the query pipeline.
//!
//! The REPL layer contains no pipeline logic: it resolves configuration,
//! wires up the agent, warms the external services, and shuttles lines
//! between the terminal and [`Agent::answer`].

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mauricia::agent::{Agent, DEFAULT_SESSION};
use mauricia::config::{self, Config};
use mauricia::logging;
use mauricia::prompt::RESP_DESPEDIDA;
use mauricia::session::InMemorySessions;

/// Words that end the chat loop.
const EXIT_WORDS: &[&str] = &["salir", "exit", "chao"];

#[derive(Debug, Parser)]
#[command(name = "mauricia", version, about = "Asistente de Postgrados USACH")]
struct Cli {
    /// Path to the TOML config file (default: ~/.mauricia/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to stderr only; skip the rotating JSON log file.
    #[arg(long)]
    no_log_file: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials come from the environment; a local .env is honoured.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _logging_guard = if cli.no_log_file {
        logging::init_cli();
        None
    } else {
        let logs_dir = config::config_dir()
            .context("cannot resolve config directory")?
            .join("logs");
        Some(logging::init_chat(&logs_dir)?)
    };

    let config = resolve_config(cli.config.as_deref())?;
    let agent = Agent::new(config, Arc::new(InMemorySessions::new()));

    println!("🎓 === ASISTENTE DE POSTGRADOS USACH (MauricIA) ===");
    println!("   (Escribe 'salir' para cerrar)\n");

    info!("warming up external services");
    agent.warmup().await;

    run_chat_loop(&agent).await
}

/// Load the explicit config path, else the default location, else defaults.
fn resolve_config(path: Option<&std::path::Path>) -> Result<Config> {
    if let Some(path) = path {
        return config::load_config(path);
    }
    let default_path = config::config_dir()?.join("config.toml");
    if default_path.exists() {
        return config::load_config(&default_path);
    }
    info!("no config file found; using built-in defaults");
    Ok(Config::default())
}

/// Read lines from stdin and answer each one until an exit word or EOF.
async fn run_chat_loop(agent: &Agent) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("\n🧑 Tú: ");
        stdout.flush().context("failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("failed to read stdin")?;
        if read == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
            println!("\n🤖 MauricIA: {RESP_DESPEDIDA}");
            break;
        }

        let respuesta = agent.answer(input, DEFAULT_SESSION).await;
        println!("\n🤖 MauricIA: {respuesta}");
    }

    Ok(())
}
