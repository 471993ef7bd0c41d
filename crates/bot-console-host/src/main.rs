mod commands;
mod config;
mod device;
mod notifier;
mod session;

use bot_console_core::{BotSession, ConsoleSettings, LoginSolver};
use bot_console_runtime::{Collaborators, ConsoleAdapter, HttpAvatarFetcher};
use bytes::Bytes;
use commands::{parse_command, Command};
use config::HostSettings;
use device::SystemDeviceInfo;
use dotenvy::dotenv;
use notifier::TerminalNotifier;
use session::{LocalSession, LoggingScriptHost};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting bot console host...");

    let (settings, host) = init_settings();

    let notifier = Arc::new(TerminalNotifier::new());
    let collaborators = Collaborators {
        notifier: notifier.clone(),
        scripts: Arc::new(LoggingScriptHost),
        avatars: Arc::new(HttpAvatarFetcher::new(settings.avatar_fetch_timeout())),
        device: Arc::new(SystemDeviceInfo),
    };
    let adapter = ConsoleAdapter::new(settings, collaborators);
    adapter.push_version(env!("CARGO_PKG_VERSION"), "local", "n/a");

    let session = Arc::new(LocalSession::new(host.bot_id, host.avatar_url));
    adapter.pre_push_bot(host.bot_id);
    let tasks = adapter.push_bot(session.clone());

    info!("Console is running, type `quit` to stop");
    run_terminal(&adapter, &session).await;

    session.close();
    adapter.stop();
    if let Err(e) = tasks.refresh.await {
        warn!(error = %e, "Refresh loop ended abnormally");
    }
    info!(shown = ?notifier.shown(), "Notifications still shown");

    info!("Bot console host stopped");
    Ok(())
}

async fn run_terminal(adapter: &ConsoleAdapter, session: &LocalSession) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(adapter, session, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
        }
    }
}

/// Run one command; returns `false` when the terminal should stop.
async fn handle_line(adapter: &ConsoleAdapter, session: &LocalSession, line: &str) -> bool {
    let command = match parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Ignoring input");
            return true;
        }
    };

    match command {
        Command::Event(event) => session.emit(&event),
        Command::Captcha(path) => match tokio::fs::read(&path).await {
            Ok(image) => {
                let solver = adapter.login_solver();
                let bot_id = session.id();
                tokio::spawn(async move {
                    match solver.solve_pic_captcha(bot_id, Bytes::from(image)).await {
                        Ok(answer) => info!(bot_id, answer = %answer, "Captcha resolved"),
                        Err(e) => warn!(bot_id, error = %e, "Captcha request failed"),
                    }
                });
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot read captcha image"),
        },
        Command::Answer(answer) => {
            if let Err(e) = adapter.login_solver().submit_answer(answer) {
                warn!(error = %e, "Answer rejected");
            }
        }
        Command::Logs => {
            for line in adapter.logs().snapshot() {
                println!("{line}");
            }
        }
        Command::Quit => return false,
        Command::Empty => {}
    }
    true
}

fn init_logging() {
    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "bot_console_core=info,bot_console_runtime=info,bot_console_host=info,bot_console::log=debug,reqwest=warn,hyper=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_settings() -> (ConsoleSettings, HostSettings) {
    let settings = match ConsoleSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load console configuration: {}", e);
            std::process::exit(1);
        }
    };
    let host = match HostSettings::new() {
        Ok(host) => host,
        Err(e) => {
            error!("Failed to load host configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    (settings, host)
}
