use std::path::PathBuf;

use clap::Parser;

/// Bridge Growatt NOAH/NEXA batteries to an MQTT broker.
///
/// Polls the Growatt cloud, publishes device state as JSON and applies
/// parameter changes received on `<prefix>/<serial>/parameters/set`.
#[derive(Debug, Parser)]
#[command(name = "nexa-mqtt", version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "NEXA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level, overrides `log_level` from the config file
    #[arg(long, value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,

    /// Print the effective configuration (passwords masked) and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Log filter from the flags, falling back to `configured`.
    /// `-v` beats `--log-level`.
    pub fn log_filter<'a>(&'a self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => self.log_level.as_deref().unwrap_or(configured),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
