use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub results_dir: PathBuf,
    pub frames_root: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = get("LABELSERVER_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let results_dir = PathBuf::from(get("LABELING_RESULTS_DIR").unwrap_or_else(|| "labeling_results".to_string()));
        let frames_root = PathBuf::from(get("FRAMES_ROOT").unwrap_or_else(|| ".".to_string()));

        // fail fast, fail loud
        bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("LABELSERVER_BIND_ADDR is not a socket address: {bind_addr}"))?;
        if results_dir.as_os_str().is_empty() {
            bail!("LABELING_RESULTS_DIR must not be empty");
        }
        if !frames_root.is_dir() {
            bail!("FRAMES_ROOT is not a directory: {}", frames_root.display());
        }

        Ok(Self { bind_addr, results_dir, frames_root })
    }
}
