//! `avr-sandbox` – process entry point for the reactive control layer.
//!
//! 1. Initialises logging (and OTLP export when configured).
//! 2. Loads `~/.avr/sandbox.toml`, writing defaults on first run.
//! 3. Starts the WebSocket bridge the broker relay connects to.
//! 4. Runs the dispatcher until **Ctrl-C**, which cancels pending servo steps
//!    and exits.

mod config;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use sandbox_middleware::{BusBridge, EventBus};
use sandbox_runtime::{Dispatcher, TagReactiveController};

fn main() -> ExitCode {
    let _guard = sandbox_runtime::init_tracing("avr-sandbox");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", config::config_path().display().to_string().bold());
            cfg
        }
        Ok(None) => {
            let cfg = config::default_with_env_overrides();
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::default_with_env_overrides()
        }
    };
    info!(?cfg, "configuration");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(cfg));
    ExitCode::SUCCESS
}

async fn run(cfg: config::Config) {
    let bus = Arc::new(EventBus::new(cfg.bus_capacity.max(1)));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping servo sequences …".yellow().bold());
        let _ = shutdown_tx.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Relay bridge ──────────────────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.bridge_port));
    let bridge = BusBridge::new(Arc::clone(&bus));
    tokio::spawn(async move {
        if let Err(e) = bridge.run_ws_server(addr).await {
            error!(error = %e, "bus bridge stopped");
        }
    });
    println!("  Relay bridge on {}\n", format!("ws://{addr}").bold().cyan());

    // ── Controller ────────────────────────────────────────────────────────
    let controller = TagReactiveController::new(cfg.controller_config());
    let controller = Dispatcher::new(controller, bus).run(shutdown_rx).await;

    let dumper = controller.state(sandbox_runtime::Actuator::SmallDumper);
    info!(dumped = dumper.dumped, "final small dumper state");
    println!("{}", "  ✓ Exiting sandbox.".green());
}

fn print_banner() {
    println!();
    println!("{}", r#"    ___ _    ______     _____                 ____              "#.bold().cyan());
    println!("{}", r#"   /   | |  / / __ \   / ___/____ _____  ____/ / /_  ____  _  __"#.bold().cyan());
    println!("{}", r#"  / /| | | / / /_/ /   \__ \/ __ `/ __ \/ __  / __ \/ __ \| |/_/"#.bold().cyan());
    println!("{}", r#" / ___ | |/ / _, _/   ___/ / /_/ / / / / /_/ / /_/ / /_/ />  <  "#.bold().cyan());
    println!("{}", r#"/_/  |_|___/_/ |_|   /____/\__,_/_/ /_/\__,_/_.___/\____/_/|_|  "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "AVR Sandbox".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Reactive servo and tag-indicator control");
    println!();
}
