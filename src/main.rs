//! Main entry point for the Lane Marshal coordinator
//!
//! Runs the match lifecycle controller against the in-memory platform as an
//! interactive local session: control phrases typed on stdin are classified
//! exactly as control-channel messages would be, and a few extra commands
//! script platform-side events (reactions, room hops) so full match flows can
//! be exercised end to end.

use anyhow::Result;
use clap::Parser;
use lane_marshal::config::AppConfig;
use lane_marshal::matches::MatchController;
use lane_marshal::platform::{intent, SimPlatform};
use lane_marshal::types::{Intent, ScopeId};
use lane_marshal::LaneRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

/// Scope id used for the local session
const SESSION_SCOPE: ScopeId = 1;

/// Lane Marshal - match lifecycle and lane assignment coordinator
#[derive(Parser)]
#[command(
    name = "lane-marshal",
    version,
    about = "Timed match coordinator that moves participants into lane voice rooms",
    long_about = "Lane Marshal runs one timed match per scope. Participants pick a team lane by \
                 applying a selector to the match announcement, get moved into that lane's voice \
                 room, and are returned to their origin room when the match ends or expires."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Default match duration override
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "Override the default match duration in seconds"
    )]
    duration: Option<u64>,

    /// Sweep interval override
    #[arg(long, value_name = "SECONDS", help = "Override the expiry sweep interval")]
    sweep_interval: Option<u64>,

    /// Enable debug mode
    #[arg(long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting the session"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
    if let Some(duration) = args.duration {
        config.match_rules.default_duration_seconds = duration;
    }
    if let Some(sweep) = args.sweep_interval {
        config.match_rules.sweep_interval_seconds = sweep;
    }

    Ok(config)
}

/// Display startup banner with coordinator information
fn display_startup_banner(config: &AppConfig, lanes: &LaneRegistry) {
    info!("🎯 Lane Marshal Coordinator");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Control channel: #{}", config.service.control_channel);
    info!(
        "   Default duration: {}s",
        config.match_rules.default_duration_seconds
    );
    info!(
        "   Sweep interval: {}s",
        config.match_rules.sweep_interval_seconds
    );
    info!("   Lanes: {}", lanes.len());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn print_session_help() {
    println!("Control phrases (as typed in #lane-assignment):");
    println!("  start match lane assignments [seconds] | start laning [seconds]");
    println!("  stop match [id]  |  pause match  |  resume match");
    println!("  time remaining  |  match status");
    println!("Session commands:");
    println!("  room <name>             create a voice room");
    println!("  join <user> <room>      put a participant into a room");
    println!("  leave <user>            disconnect a participant from voice");
    println!("  name <user> <display>   set a display name");
    println!("  react <user> <emoji>    apply a selector to the announcement");
    println!("  unreact <user> <emoji>  withdraw a selector");
    println!("  notices                 dump everything posted to the scope");
    println!("  help  |  quit");
}

/// Handle one scripted platform command. Returns false on `quit`.
async fn handle_session_command(
    line: &str,
    controller: &MatchController,
    sim: &SimPlatform,
) -> Result<bool> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts.as_slice() {
        ["quit"] | ["exit"] => return Ok(false),
        ["help"] => print_session_help(),
        ["room", name @ ..] if !name.is_empty() => {
            let name = name.join(" ");
            let id = sim.add_room(&name);
            println!("room '{name}' created ({id})");
        }
        ["join", user, room @ ..] if !room.is_empty() => {
            let room = room.join(" ");
            let Ok(user) = user.parse() else {
                println!("participant ids are numeric");
                return Ok(true);
            };
            match sim.room_id(&room) {
                Some(id) => {
                    sim.place(user, id);
                    println!("participant {user} joined '{room}'");
                }
                None => println!("no room named '{room}'"),
            }
        }
        ["leave", user] => {
            let Ok(user) = user.parse() else {
                println!("participant ids are numeric");
                return Ok(true);
            };
            sim.disconnect(user);
            println!("participant {user} left voice");
        }
        ["name", user, display] => {
            let Ok(user) = user.parse() else {
                println!("participant ids are numeric");
                return Ok(true);
            };
            sim.set_display_name(user, display);
        }
        ["react", user, emoji] | ["unreact", user, emoji] => {
            let Ok(user) = user.parse() else {
                println!("participant ids are numeric");
                return Ok(true);
            };
            let Some(record) = controller.store().get(SESSION_SCOPE)? else {
                println!("no active match to react to");
                return Ok(true);
            };
            let artifact = record.artifact_ref;
            if parts[0] == "react" {
                sim.mark_selector(artifact, user, emoji);
                controller
                    .handle_selector_applied(artifact, user, emoji)
                    .await?;
            } else {
                sim.unmark_selector(artifact, user, emoji);
                controller
                    .handle_selector_withdrawn(artifact, user, emoji)
                    .await?;
            }
        }
        ["notices"] => {
            for (scope, notice) in sim.notices() {
                println!("[scope {scope}] {notice}");
            }
        }
        _ => {
            // Not a session command; try the control-phrase classifier
            match intent::classify(line) {
                Some(kind) => {
                    controller
                        .handle_intent(Intent {
                            scope: SESSION_SCOPE,
                            requester: "operator".to_string(),
                            kind,
                        })
                        .await?;
                    if let Some((_, latest)) = sim.notices().into_iter().last() {
                        println!("{latest}");
                    }
                }
                None => println!("unrecognized input; type `help` for commands"),
            }
        }
    }

    Ok(true)
}

/// Read stdin lines until EOF, `quit`, or a shutdown signal
async fn run_session(controller: Arc<MatchController>, sim: Arc<SimPlatform>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match handle_session_command(line, &controller, &sim).await {
                            Ok(true) => {}
                            Ok(false) => break,
                            Err(e) => warn!("Command failed: {}", e),
                        }
                    }
                    None => break, // EOF
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C) signal");
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let lanes = LaneRegistry::default();

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config, &lanes);
        info!("Dry run completed - exiting without starting the session");
        return Ok(());
    }

    display_startup_banner(&config, &lanes);

    let sim = Arc::new(SimPlatform::new());
    sim.add_room("General");
    let controller = Arc::new(MatchController::new(sim.clone(), lanes, &config));

    if let Err(e) = controller.provision_lane_rooms().await {
        error!("Failed to provision lane rooms: {}", e);
        std::process::exit(1);
    }

    controller.clone().start_sweep_task();

    info!("✅ Lane Marshal session is running");
    print_session_help();

    run_session(controller, sim).await?;

    info!("🛑 Lane Marshal session stopped");
    Ok(())
}
