//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigSource, Overrides};

#[derive(Debug, Parser)]
#[command(name = "iostat-exporter", version, about = "Iostat exporter daemon")]
pub struct Cli {
    /// YAML configuration file; defaults apply when omitted
    #[arg(short, long, env = "IOSTAT_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stay in the foreground and log to the terminal
    #[arg(short, long)]
    pub foreground: bool,

    /// Port to listen on (default 9250)
    #[arg(long)]
    pub port: Option<u16>,

    /// Interval in seconds in which data is gathered (default 30)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Log level: debug, info, warning, error, critical (default error)
    #[arg(long)]
    pub loglevel: Option<String>,

    /// Log file used when not in the foreground
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// User ID or name the supervisor should run the exporter as
    #[arg(long)]
    pub uid: Option<String>,

    /// Group ID or name the supervisor should run the exporter as
    #[arg(long)]
    pub gid: Option<String>,

    /// Directory the supervisor should confine the exporter to
    #[arg(long)]
    pub chroot: Option<PathBuf>,

    /// PID file path
    #[arg(long)]
    pub pidfile: Option<PathBuf>,
}

impl Cli {
    pub fn config_source(&self) -> ConfigSource {
        ConfigSource::new(
            self.config.clone(),
            Overrides {
                foreground: self.foreground,
                port: self.port,
                interval_secs: self.interval,
                log_level: self.loglevel.clone(),
                log_file: self.logfile.clone(),
                uid: self.uid.clone(),
                gid: self.gid.clone(),
                chroot: self.chroot.clone(),
                pidfile: self.pidfile.clone(),
            },
        )
    }
}
