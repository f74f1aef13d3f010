//! `roverlink` – bridge between the operator dashboard and the robot's ROS 2
//! stack.
//!
//! Startup order:
//!
//! 1. Initialise structured logging (`RUST_LOG`, JSON via
//!    `ROVERLINK_LOG_FORMAT=json`).
//! 2. Load `~/.roverlink/config.toml`, falling back to defaults.
//! 3. Build the [`StateStore`] and open the [`BusLink`] – the transport task
//!    keeps retrying rosbridge in the background, so the gateway serves
//!    zero-value snapshots until the robot stack comes up.
//! 4. Serve the HTTP gateway until Ctrl-C.

mod config;

use std::sync::Arc;

use colored::Colorize;
use tracing::{error, info};

use roverlink_gateway::GatewayServer;
use roverlink_middleware::{BusLink, CommandGate, StateStore};
use roverlink_supervisor::ProcessSupervisor;

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVERLINK_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  Wrote default config to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!(
                    "  No config at {} ({e}) – using defaults.",
                    config::config_path().display().to_string().dimmed()
                ),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Wiring ────────────────────────────────────────────────────────────
    let store = Arc::new(StateStore::new());
    let link = BusLink::connect(cfg.rosbridge_url.clone(), Arc::clone(&store));
    let gate = CommandGate::new(link);
    let supervisor = ProcessSupervisor::new(cfg.setup_prefix_opt(), cfg.processes.clone().into());

    println!(
        "  Bus:     {}",
        cfg.rosbridge_url.bold()
    );
    println!(
        "  Gateway: {}\n",
        format!("http://0.0.0.0:{}", cfg.http_port).bold()
    );

    let server = GatewayServer::new(store, gate, supervisor).with_port(cfg.http_port);

    // ── Serve until Ctrl-C ────────────────────────────────────────────────
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "gateway stopped");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("{}", "  ✓ Ctrl-C received – shutting down.".green());
            info!("shutdown requested by operator");
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "  RoverLink – web teleop bridge".bold().cyan());
    println!("{}", "  ───────────────────────────────".cyan());
}
