//! Process identity resolution.
//!
//! Forking, pidfile locking, privilege drop and chroot belong to the service
//! supervisor. The exporter only resolves and checks the requested identity so
//! that a bad user, group or directory stops startup with a clear message.

use std::path::{Path, PathBuf};

use nix::unistd::{Group, User};

use iostat_core::error::{IostatError, Result};

use super::schema::ProcessSection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub foreground: bool,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub chroot: PathBuf,
    pub pidfile: PathBuf,
}

impl ProcessIdentity {
    pub fn resolve(section: &ProcessSection) -> Result<Self> {
        let uid = section.uid.as_deref().map(resolve_uid).transpose()?;
        let gid = section.gid.as_deref().map(resolve_gid).transpose()?;

        let chroot = match &section.chroot {
            Some(dir) => {
                check_dir(dir)?;
                dir.clone()
            }
            None => PathBuf::from("/"),
        };

        Ok(Self {
            foreground: section.foreground,
            uid,
            gid,
            chroot,
            pidfile: section.pidfile.clone(),
        })
    }
}

fn resolve_uid(name: &str) -> Result<u32> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(id);
    }
    match User::from_name(name) {
        Ok(Some(user)) => Ok(user.uid.as_raw()),
        Ok(None) => Err(IostatError::Config(format!("Unknown user {name}"))),
        Err(e) => Err(IostatError::Config(format!("lookup of user {name} failed: {e}"))),
    }
}

fn resolve_gid(name: &str) -> Result<u32> {
    if let Ok(id) = name.parse::<u32>() {
        return Ok(id);
    }
    match Group::from_name(name) {
        Ok(Some(group)) => Ok(group.gid.as_raw()),
        Ok(None) => Err(IostatError::Config(format!("Unknown group {name}"))),
        Err(e) => Err(IostatError::Config(format!("lookup of group {name} failed: {e}"))),
    }
}

fn check_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(IostatError::Config(format!(
            "Non existing chroot directory {}",
            dir.display()
        )))
    }
}
