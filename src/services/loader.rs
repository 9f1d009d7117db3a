use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::model::AppConfig;

pub const CONFIG_FILE: &str = "flowdeck.yaml";
pub const CONFIG_DIR_ENV: &str = "FLOWDECK_CONFIG_DIR";

pub fn config_from_str(s: &str) -> Result<AppConfig> {
    serde_yaml::from_str(s).context("parsing flowdeck config")
}

/// Locate and parse `flowdeck.yaml`: the `FLOWDECK_CONFIG_DIR` directory,
/// then CWD, then `.flowdeck/` in CWD and its ancestors, then `~/.flowdeck/`.
pub fn load_config() -> Result<AppConfig> {
    if let Ok(base) = std::env::var(CONFIG_DIR_ENV) {
        let entry = PathBuf::from(&base).join(CONFIG_FILE);
        let s = fs::read_to_string(&entry).with_context(|| format!("reading {entry:?}"))?;
        return config_from_str(&s).with_context(|| format!("parsing {entry:?}"));
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = [
        cwd.join(CONFIG_FILE),
        cwd.join(".flowdeck").join(CONFIG_FILE),
    ];
    for p in &candidates {
        if p.exists() {
            let s = fs::read_to_string(p).with_context(|| format!("reading {p:?}"))?;
            return config_from_str(&s).with_context(|| format!("parsing {p:?}"));
        }
    }
    let mut cur = cwd.as_path();
    while let Some(parent) = cur.parent() {
        let p = parent.join(".flowdeck").join(CONFIG_FILE);
        if p.exists() {
            let s = fs::read_to_string(&p).with_context(|| format!("reading {p:?}"))?;
            return config_from_str(&s).with_context(|| format!("parsing {p:?}"));
        }
        cur = parent;
    }
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".flowdeck").join(CONFIG_FILE);
        if p.exists() {
            let s = fs::read_to_string(&p).with_context(|| format!("reading {p:?}"))?;
            return config_from_str(&s).with_context(|| format!("parsing {p:?}"));
        }
    }
    Err(anyhow!(
        "No config found. Set {CONFIG_DIR_ENV}=<dir with {CONFIG_FILE}> or place {CONFIG_FILE} in CWD or .flowdeck/ in an ancestor"
    ))
}

#[cfg(test)]
mod loader_tests;
