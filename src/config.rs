//! `config.toml` parsing. Every field is optional; a missing default file means
//! defaults everywhere.

use crate::services::storage::{config_dir, default_data_dir, expand_home};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    /// Directory holding `documents.json`.
    #[serde(default)]
    pub data_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ControlsConfig {
    /// Where control PDFs are written when `--out-dir` is not given.
    #[serde(default)]
    pub out_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AccessConfig {
    /// Emails that receive the admin role when they sign up.
    #[serde(default)]
    pub bootstrap_admins: Vec<String>,
}

impl Config {
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = config_dir()?.join("config.toml");
                if !p.exists() {
                    return Ok(Config::default());
                }
                p
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(raw)?)
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.store.data_dir {
            Some(dir) => expand_home(dir),
            None => default_data_dir(),
        }
    }

    pub fn out_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.controls.out_dir {
            Some(dir) => expand_home(dir),
            None => Ok(PathBuf::from(".")),
        }
    }

    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        let email = email.trim();
        self.access
            .bootstrap_admins
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(email))
    }
}
