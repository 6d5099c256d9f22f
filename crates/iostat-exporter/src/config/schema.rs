use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use iostat_core::error::{IostatError, Result};
use iostat_core::parser::DEFAULT_DEVICE_PREFIX;
use iostat_core::{Metric, Parser};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub parser: ParserSection,

    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub process: ProcessSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            exporter: ExporterSection::default(),
            sampler: SamplerSection::default(),
            parser: ParserSection::default(),
            log: LogSection::default(),
            process: ProcessSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(IostatError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.exporter.validate()?;
        self.sampler.validate()?;
        self.parser.build()?;
        self.log.level()?;

        if let Some(timeout) = self.sampler.timeout_secs {
            if timeout > self.exporter.interval_secs {
                return Err(IostatError::Config(
                    "sampler.timeout_secs must not exceed exporter.interval_secs".into(),
                ));
            }
        }
        Ok(())
    }

    /// Sampler timeout in force for this config.
    pub fn sampler_timeout(&self) -> Duration {
        self.sampler.timeout(self.exporter.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1..=86_400).contains(&self.interval_secs) {
            return Err(IostatError::Config(
                "exporter.interval_secs must be between 1 and 86400".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            IostatError::Config(format!("exporter.listen {:?} is not a socket address: {e}", self.listen))
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_listen() -> String {
    "0.0.0.0:9250".into()
}
fn default_interval_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Unset means `DEFAULT_TIMEOUT_SECS`, capped at the interval.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: None,
        }
    }
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(IostatError::Config("sampler.program must not be empty".into()));
        }
        if let Some(timeout) = self.timeout_secs {
            if !(1..=3_600).contains(&timeout) {
                return Err(IostatError::Config(
                    "sampler.timeout_secs must be between 1 and 3600".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn timeout(&self, interval_secs: u64) -> Duration {
        let secs = self
            .timeout_secs
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.min(interval_secs));
        Duration::from_secs(secs)
    }
}

fn default_program() -> String {
    "iostat".into()
}
fn default_args() -> Vec<String> {
    vec!["-x".into()]
}
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserSection {
    #[serde(default = "default_device_prefix")]
    pub device_prefix: String,

    #[serde(default = "default_columns")]
    pub columns: Vec<Metric>,
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            device_prefix: default_device_prefix(),
            columns: default_columns(),
        }
    }
}

impl ParserSection {
    pub fn build(&self) -> Result<Parser> {
        Parser::new(self.device_prefix.clone(), self.columns.clone())
            .map_err(|e| IostatError::Config(format!("parser: {e}")))
    }
}

fn default_device_prefix() -> String {
    DEFAULT_DEVICE_PREFIX.into()
}
fn default_columns() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

/// Accepted log level names, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has nothing above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = IostatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(IostatError::Config(format!("Unknown log level {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl LogSection {
    pub fn level(&self) -> Result<LogLevel> {
        self.level.parse()
    }
}

fn default_log_level() -> String {
    "error".into()
}
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/var/log/iostatexporter.log"))
}

/// Process identity handed to the service supervisor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSection {
    #[serde(default)]
    pub foreground: bool,

    /// Numeric id or user name.
    #[serde(default)]
    pub uid: Option<String>,

    /// Numeric id or group name.
    #[serde(default)]
    pub gid: Option<String>,

    #[serde(default)]
    pub chroot: Option<PathBuf>,

    #[serde(default = "default_pidfile")]
    pub pidfile: PathBuf,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            foreground: false,
            uid: None,
            gid: None,
            chroot: None,
            pidfile: default_pidfile(),
        }
    }
}

fn default_pidfile() -> PathBuf {
    PathBuf::from("/var/run/iostatexporter.pid")
}
