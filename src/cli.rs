//! Demo configuration and CLI argument parsing
//!
//! Settings come from, in order of precedence:
//! 1. CLI arguments
//! 2. Environment variables with the `THROTTLE_` prefix
//! 3. Default values
//!
//! A `--config <file>` JSON document replaces the throttle parameters
//! entirely when given.
//!
//! # Example Usage
//!
//! ```bash
//! # Five calls through a 200ms fixed-interval throttle
//! throttle-demo --mode fixed --interval-ms 200 --calls 5
//!
//! # Environment variables
//! export THROTTLE_MODE=capacity
//! export THROTTLE_COUNT=5
//! throttle-demo --calls 20
//! ```

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use throttle_queue::ThrottleConfig;

/// Which throttle the demo drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Fixed,
    Burst,
    Capacity,
}

/// Resolved demo configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub throttle: ThrottleConfig,
    /// Number of calls fired at once
    pub calls: usize,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

#[derive(Parser, Debug)]
#[command(
    name = "throttle-demo",
    about = "Fire a batch of calls through a queueing throttle and log when each one runs",
    long_about = "Fire a batch of calls through a queueing throttle and log when each one runs.\n\nEnvironment variables with THROTTLE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    #[arg(
        long,
        value_enum,
        help = "Throttle to use",
        default_value = "fixed",
        env = "THROTTLE_MODE"
    )]
    pub mode: Mode,

    #[arg(
        long,
        value_name = "MS",
        help = "Drain interval for fixed and burst throttles (milliseconds)",
        default_value_t = 1000,
        env = "THROTTLE_INTERVAL_MS"
    )]
    pub interval_ms: u64,

    #[arg(
        long,
        value_name = "N",
        help = "Immediate calls allowed per burst window",
        default_value_t = 3,
        env = "THROTTLE_BURST_SIZE"
    )]
    pub burst_size: usize,
    #[arg(
        long,
        value_name = "MS",
        help = "Burst window (milliseconds)",
        default_value_t = 1000,
        env = "THROTTLE_BURST_WINDOW_MS"
    )]
    pub burst_window_ms: u64,

    #[arg(
        long,
        value_name = "N",
        help = "Executions allowed per capacity window",
        default_value_t = 5,
        env = "THROTTLE_COUNT"
    )]
    pub count: usize,
    #[arg(
        long,
        value_name = "MS",
        help = "Capacity window (milliseconds)",
        default_value_t = 1000,
        env = "THROTTLE_WINDOW_MS"
    )]
    pub window_ms: u64,

    #[arg(
        long,
        value_name = "FILE",
        help = "JSON throttle configuration, overrides the mode options",
        env = "THROTTLE_CONFIG"
    )]
    pub config: Option<std::path::PathBuf>,

    #[arg(
        long,
        value_name = "N",
        help = "Calls to fire",
        default_value_t = 10,
        env = "THROTTLE_CALLS"
    )]
    pub calls: usize,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "THROTTLE_LOG_LEVEL"
    )]
    pub log_level: String,

    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let throttle = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ThrottleConfig::from_json(&json)?
            }
            None => match args.mode {
                Mode::Fixed => ThrottleConfig::Fixed {
                    interval_ms: args.interval_ms,
                },
                Mode::Burst => ThrottleConfig::Burst {
                    burst_size: args.burst_size,
                    burst_window_ms: args.burst_window_ms,
                    interval_ms: args.interval_ms,
                },
                Mode::Capacity => ThrottleConfig::Capacity {
                    count: args.count,
                    window_ms: args.window_ms,
                },
            },
        };

        let config = Config {
            throttle,
            calls: args.calls,
            log_level: args.log_level,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.calls == 0 {
            return Err(anyhow!("--calls must be at least 1"));
        }
        self.throttle.validate()?;
        Ok(())
    }

    fn print_env_vars() {
        println!("throttle-demo Environment Variables");
        println!("===================================");
        println!();
        println!("All environment variables use the THROTTLE_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();
        println!("  THROTTLE_MODE=<mode>              fixed, burst, capacity [default: fixed]");
        println!("  THROTTLE_INTERVAL_MS=<ms>         Drain interval [default: 1000]");
        println!("  THROTTLE_BURST_SIZE=<n>           Burst allowance [default: 3]");
        println!("  THROTTLE_BURST_WINDOW_MS=<ms>     Burst window [default: 1000]");
        println!("  THROTTLE_COUNT=<n>                Capacity per window [default: 5]");
        println!("  THROTTLE_WINDOW_MS=<ms>           Capacity window [default: 1000]");
        println!("  THROTTLE_CONFIG=<file>            JSON throttle configuration");
        println!("  THROTTLE_CALLS=<n>                Calls to fire [default: 10]");
        println!("  THROTTLE_LOG_LEVEL=<level>        error, warn, info, debug, trace [default: info]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Config> {
        let args = Args::try_parse_from(std::iter::once("throttle-demo").chain(argv.iter().copied()))?;
        Config::from_args(args)
    }

    #[test]
    fn test_burst_mode_from_args() {
        let config = parse(&["--mode", "burst", "--burst-size", "4", "--interval-ms", "250"]).unwrap();
        assert_eq!(
            config.throttle,
            ThrottleConfig::Burst {
                burst_size: 4,
                burst_window_ms: 1000,
                interval_ms: 250,
            }
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(parse(&["--mode", "capacity", "--count", "0"]).is_err());
        assert!(parse(&["--calls", "0"]).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(parse(&["--mode", "leaky"]).is_err());
    }
}
