use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const PREFIX_ENV: &str = "MODSYNC_PREFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    prefix: PathBuf,
}

impl HostLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn components_dir(&self) -> PathBuf {
        self.prefix.join("components")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.prefix.join("state")
    }

    pub fn installed_state_dir(&self) -> PathBuf {
        self.state_dir().join("installed")
    }

    pub fn config_path(&self) -> PathBuf {
        self.prefix.join("config.toml")
    }

    pub fn component_dir(&self, id: &str) -> PathBuf {
        self.components_dir().join(id)
    }

    pub fn package_path(&self, id: &str, version: &str) -> PathBuf {
        self.component_dir(id).join(format!("{id}-{version}.cpk"))
    }

    pub fn receipt_path(&self, id: &str) -> PathBuf {
        self.installed_state_dir().join(format!("{id}.receipt"))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.components_dir(),
            self.state_dir(),
            self.installed_state_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_host_prefix() -> Result<PathBuf> {
    if let Some(prefix) = std::env::var_os(PREFIX_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(prefix));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows host prefix")?;
        return Ok(PathBuf::from(app_data).join("Modsync"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve host prefix")?;
    Ok(PathBuf::from(home).join(".modsync"))
}
