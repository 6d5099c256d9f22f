//! Exporter config loader (strict parsing).
//!
//! A config file is optional. Command-line overrides are applied on top of
//! the file (or the defaults) before validation, and the same
//! [`ConfigSource`] is re-read on reload.

pub mod identity;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use iostat_core::error::{IostatError, Result};

pub use identity::ProcessIdentity;
pub use schema::{
    ExporterConfig, ExporterSection, LogLevel, LogSection, ParserSection, ProcessSection,
    SamplerSection,
};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let cfg = parse_file(path.as_ref())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg = parse_str(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse_file(path: &Path) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        IostatError::Config(format!("read config {} failed: {e}", path.display()))
    })?;
    parse_str(&s)
}

fn parse_str(s: &str) -> Result<ExporterConfig> {
    serde_yaml::from_str(s).map_err(|e| IostatError::Config(format!("invalid yaml: {e}")))
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub foreground: bool,
    pub port: Option<u16>,
    pub interval_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub chroot: Option<PathBuf>,
    pub pidfile: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut ExporterConfig) -> Result<()> {
        if self.foreground {
            cfg.process.foreground = true;
        }
        if let Some(port) = self.port {
            let mut addr = cfg.exporter.listen_addr()?;
            addr.set_port(port);
            cfg.exporter.listen = addr.to_string();
        }
        if let Some(secs) = self.interval_secs {
            cfg.exporter.interval_secs = secs;
        }
        if let Some(level) = &self.log_level {
            cfg.log.level = level.clone();
        }
        if let Some(file) = &self.log_file {
            cfg.log.file = Some(file.clone());
        }
        if let Some(uid) = &self.uid {
            cfg.process.uid = Some(uid.clone());
        }
        if let Some(gid) = &self.gid {
            cfg.process.gid = Some(gid.clone());
        }
        if let Some(chroot) = &self.chroot {
            cfg.process.chroot = Some(chroot.clone());
        }
        if let Some(pidfile) = &self.pidfile {
            cfg.process.pidfile = pidfile.clone();
        }
        Ok(())
    }
}

/// Where the effective configuration comes from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub path: Option<PathBuf>,
    pub overrides: Overrides,
}

impl ConfigSource {
    pub fn new(path: Option<PathBuf>, overrides: Overrides) -> Self {
        Self { path, overrides }
    }

    /// Read the file (if any), apply overrides, validate.
    pub fn load(&self) -> Result<ExporterConfig> {
        let cfg = match &self.path {
            Some(path) => parse_file(path)?,
            None => ExporterConfig::default(),
        };
        self.finish(cfg)
    }

    /// Same as [`ConfigSource::load`], reading the file through `tokio::fs`
    /// so a running scheduler does not block its worker.
    pub async fn load_async(&self) -> Result<ExporterConfig> {
        let cfg = match &self.path {
            Some(path) => {
                let s = tokio::fs::read_to_string(path).await.map_err(|e| {
                    IostatError::Config(format!("read config {} failed: {e}", path.display()))
                })?;
                parse_str(&s)?
            }
            None => ExporterConfig::default(),
        };
        self.finish(cfg)
    }

    fn finish(&self, mut cfg: ExporterConfig) -> Result<ExporterConfig> {
        self.overrides.apply(&mut cfg)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
