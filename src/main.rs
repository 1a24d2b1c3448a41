//! boatlink CLI - remote operation link for an unmanned surface vehicle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tokio::signal;

use boatlink::cli::{Cli, Commands, MissionArgs, MissionCommand, MonitorArgs, SendArgs, SendCommand};
use boatlink::config::{init_logging, Config, LoggingConfig};
use boatlink::error::Result;
use boatlink::mission::builtin::ForwardSweep;
use boatlink::types::{LedMode, MovementSetpoint, PidGains, ProbeAction, VehicleMode};
use boatlink::{VehicleControl, VehicleLink, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let mut config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else if Config::default_path().exists() {
        Config::load(Config::default_path())?
    } else {
        Config::default()
    };

    let log_config = LoggingConfig {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        color: !cli.no_color && config.logging.color,
        ..config.logging.clone()
    };
    init_logging(&log_config)?;

    config.apply_env()?;
    let port = cli.vehicle_port.map(|p| p.to_string());
    config.apply_overrides(cli.vehicle.as_deref(), port.as_deref())?;
    if let Some(port) = cli.telemetry_port {
        config.link.telemetry_bind = SocketAddr::new(config.link.telemetry_bind.ip(), port);
    }
    config.validate()?;

    match cli.command {
        Commands::Monitor(args) => run_monitor(args, config).await,
        Commands::Send(args) => run_send(args, config).await,
        Commands::Mission(args) => run_mission(args, config).await,
        Commands::Config => run_config(),
    }
}

fn banner(config: &Config) {
    println!(
        "{} {} {} {}",
        "boatlink".bright_cyan().bold(),
        VERSION.dimmed(),
        "→".cyan(),
        config.link.vehicle_addr.to_string().bright_white()
    );
}

async fn open_link(config: Config) -> Result<Arc<VehicleLink>> {
    let link = Arc::new(VehicleLink::with_missions(config.link, config.mission));
    link.start().await?;
    Ok(link)
}

/// Print telemetry until Ctrl-C.
async fn run_monitor(args: MonitorArgs, config: Config) -> Result<()> {
    if !args.json {
        banner(&config);
    }
    let link = open_link(config).await?;

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval.max(10)));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let snapshot = link.snapshot();
                if args.json {
                    match serde_json::to_string(&snapshot) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::warn!(error = %e, "Telemetry serialization failed"),
                    }
                } else {
                    let age = link.telemetry_age().map_or_else(
                        || "no telemetry".yellow().to_string(),
                        |age| format!("{}ms old", age.as_millis()).dimmed().to_string(),
                    );
                    println!("{} {snapshot} ({age})", "telemetry".green());
                }
                if args.stats {
                    let stats = link.stats();
                    println!(
                        "{} sent={} heartbeats={} dropped={} rx={} malformed={} send_errors={}",
                        "stats".blue(),
                        stats.packets_sent(),
                        stats.heartbeats_sent,
                        stats.commands_dropped,
                        stats.telemetry_received,
                        stats.telemetry_malformed,
                        stats.send_errors
                    );
                }
            }
        }
    }

    link.close().await;
    Ok(())
}

/// Queue one command, keep the link up long enough to flush it, then stop.
async fn run_send(args: SendArgs, config: Config) -> Result<()> {
    let link = open_link(config).await?;
    let hold = Duration::from_millis(args.hold);

    let described = match args.command {
        SendCommand::Move {
            forward,
            lateral,
            yaw,
            speed,
        } => {
            let sp = MovementSetpoint::new(forward, lateral, yaw).scaled(speed);
            link.set_movement(sp.forward, sp.lateral, sp.yaw)?;
            format!("move {sp}")
        }
        SendCommand::Pid { p, i, d } => {
            let gains = PidGains::new(p, i, d);
            link.set_pid(gains)?;
            format!("pid {gains}")
        }
        SendCommand::Mode { mode } => {
            let mode = VehicleMode::from(mode);
            link.set_mode(mode)?;
            format!("mode {mode}")
        }
        SendCommand::Led { mode, r, g, b } => {
            let mode: LedMode = mode.into();
            link.set_led(mode, r, g, b)?;
            format!("led {mode} #{r:02x}{g:02x}{b:02x}")
        }
        SendCommand::Gpio { state } => {
            link.set_gpio(state)?;
            format!("gpio {state}")
        }
        SendCommand::Probe { action, timeout } => {
            let action: ProbeAction = action.into();
            link.set_probe(action, timeout)?;
            format!("probe {action} (timeout {timeout}s)")
        }
    };

    println!("{} {described}", "✓".green());
    tokio::time::sleep(hold).await;

    // Leave the vehicle at rest before the heartbeat goes away
    if !link.setpoint().is_zero() {
        link.halt()?;
    }

    link.close().await;
    Ok(())
}

/// Run a built-in mission, streaming its log. Ctrl-C requests a stop.
async fn run_mission(args: MissionArgs, config: Config) -> Result<()> {
    banner(&config);
    let link = open_link(config).await?;

    let mission = match args.mission {
        MissionCommand::Sweep {
            steps,
            speed,
            interval,
        } => ForwardSweep {
            steps,
            speed,
            step_interval: Duration::from_millis(interval),
        },
    };
    link.start_mission(mission)?;

    let mut cursor = 0;
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let mut stop_requested = false;

    loop {
        tokio::select! {
            _ = signal::ctrl_c(), if !stop_requested => {
                println!("{}", "Stopping mission...".yellow());
                link.request_stop_mission();
                stop_requested = true;
            }
            _ = ticker.tick() => {
                cursor = print_mission_log(&link, cursor);
                if link.mission_state().is_terminal() {
                    break;
                }
            }
        }
    }

    link.wait_mission().await;
    print_mission_log(&link, cursor);
    println!("{} mission {}", "■".cyan(), link.mission_state());

    link.close().await;
    Ok(())
}

fn print_mission_log(link: &VehicleLink, cursor: u64) -> u64 {
    let mut stream = link.mission_log(cursor);
    for line in stream.by_ref() {
        println!("  {} {line}", "│".dimmed());
    }
    stream.cursor()
}

/// Print an example configuration.
fn run_config() -> Result<()> {
    let example = toml::to_string_pretty(&Config::example())
        .map_err(|e| boatlink::Error::Config(format!("Failed to serialize config: {e}")))?;
    println!("{example}");
    Ok(())
}
