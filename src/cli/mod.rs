//! Command-line interface for boatlink.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{LedMode, ProbeAction, VehicleMode};

/// boatlink - remote operation link for an unmanned surface vehicle
#[derive(Parser, Debug)]
#[command(
    name = "boatlink",
    author,
    version,
    about = "Remote operation link for an unmanned surface vehicle",
    long_about = r#"
boatlink talks to the vehicle over UDP:

  - resends the movement setpoint every 100 ms as a heartbeat
  - queues one-off commands (PID, mode, LED, GPIO, sampling probe)
  - decodes telemetry (attitude, ADC, motor PWM, active PID gains)
  - runs missions that stop cooperatively on request

QUICK START:
  boatlink --vehicle 192.168.4.1 monitor
  boatlink send pid 1.0 0.2 0.05
  boatlink mission sweep --steps 10
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config value
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Vehicle host (overrides config and environment)
    #[arg(long, global = true)]
    pub vehicle: Option<String>,

    /// Vehicle command port (overrides config and environment)
    #[arg(long, global = true)]
    pub vehicle_port: Option<u16>,

    /// Local telemetry port
    #[arg(long, global = true)]
    pub telemetry_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print live telemetry until interrupted
    Monitor(MonitorArgs),

    /// Send a single command
    Send(SendArgs),

    /// Run a built-in mission
    Mission(MissionArgs),

    /// Show example configuration
    Config,
}

/// Monitor command arguments
#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Print interval in milliseconds
    #[arg(short, long, default_value = "500")]
    pub interval: u64,

    /// Print telemetry as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Also print link statistics
    #[arg(long)]
    pub stats: bool,
}

/// Send command arguments
#[derive(Args, Debug)]
pub struct SendArgs {
    /// How long to keep the link up after queueing, in milliseconds
    #[arg(long, default_value = "500")]
    pub hold: u64,

    #[command(subcommand)]
    pub command: SendCommand,
}

/// One-off commands
#[derive(Subcommand, Debug)]
pub enum SendCommand {
    /// Hold a movement setpoint for the hold duration, then stop
    Move {
        #[arg(allow_hyphen_values = true)]
        forward: f32,
        #[arg(allow_hyphen_values = true)]
        lateral: f32,
        #[arg(allow_hyphen_values = true)]
        yaw: f32,
        /// Speed multiplier in percent
        #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(0..=100))]
        speed: u8,
    },

    /// Update PID gains
    Pid {
        #[arg(allow_hyphen_values = true)]
        p: f32,
        #[arg(allow_hyphen_values = true)]
        i: f32,
        #[arg(allow_hyphen_values = true)]
        d: f32,
    },

    /// Switch operating mode
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Control the LED strip
    Led {
        #[arg(value_enum)]
        mode: LedArg,
        #[arg(default_value = "255")]
        r: u8,
        #[arg(default_value = "255")]
        g: u8,
        #[arg(default_value = "255")]
        b: u8,
    },

    /// Set the GPIO pin state
    Gpio {
        /// 0 = low, 1 = high
        state: u8,
    },

    /// Move the sampling probe
    Probe {
        #[arg(value_enum)]
        action: ProbeArg,
        /// Seconds until the probe stops by itself
        #[arg(short, long, default_value = "0")]
        timeout: u16,
    },
}

/// Mission command arguments
#[derive(Args, Debug)]
pub struct MissionArgs {
    #[command(subcommand)]
    pub mission: MissionCommand,
}

/// Built-in missions
#[derive(Subcommand, Debug)]
pub enum MissionCommand {
    /// Drive straight ahead step by step, then stop
    Sweep {
        /// Number of steps
        #[arg(long, default_value = "50")]
        steps: u32,

        /// Forward speed per step
        #[arg(long, default_value = "10.0")]
        speed: f32,

        /// Step length in milliseconds
        #[arg(long, default_value = "1000")]
        interval: u64,
    },
}

/// Operating mode argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Manual,
    Stabilize,
}

impl From<ModeArg> for VehicleMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Manual => Self::Manual,
            ModeArg::Stabilize => Self::Stabilize,
        }
    }
}

/// LED mode argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LedArg {
    Off,
    Static,
    Blink,
    Rainbow,
}

impl From<LedArg> for LedMode {
    fn from(arg: LedArg) -> Self {
        match arg {
            LedArg::Off => Self::Off,
            LedArg::Static => Self::Static,
            LedArg::Blink => Self::Blink,
            LedArg::Rainbow => Self::Rainbow,
        }
    }
}

/// Probe action argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ProbeArg {
    Up,
    Down,
    Stop,
}

impl From<ProbeArg> for ProbeAction {
    fn from(arg: ProbeArg) -> Self {
        match arg {
            ProbeArg::Up => Self::Up,
            ProbeArg::Down => Self::Down,
            ProbeArg::Stop => Self::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send_pid() {
        let cli = Cli::try_parse_from(["boatlink", "--vehicle", "10.0.0.2", "send", "pid", "1.0", "0.2", "-0.05"])
            .unwrap();

        assert_eq!(cli.vehicle.as_deref(), Some("10.0.0.2"));
        assert!(cli.log_level.is_none());
        match cli.command {
            Commands::Send(SendArgs {
                command: SendCommand::Pid { p, i, d },
                ..
            }) => {
                assert_eq!((p, i, d), (1.0, 0.2, -0.05));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_mission_sweep() {
        let cli = Cli::try_parse_from(["boatlink", "mission", "sweep", "--steps", "3", "-l", "trace"])
            .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("trace"));
        match cli.command {
            Commands::Mission(MissionArgs {
                mission: MissionCommand::Sweep { steps, interval, .. },
            }) => {
                assert_eq!(steps, 3);
                assert_eq!(interval, 1000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
