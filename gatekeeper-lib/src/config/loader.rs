use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{GatekeeperError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| GatekeeperError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| GatekeeperError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg);

    Ok(cfg)
}

fn validate_config(cfg: &Config) {
    // Zero values are well-defined (fixed allowance / deny everything) but
    // almost always a config mistake, so flag them.
    if cfg.enforcement.monitoring.capacity == 0 {
        tracing::warn!("monitoring tier has capacity 0: every monitored request will be denied");
    }
    if cfg.enforcement.challenge.capacity == 0 {
        tracing::warn!("challenge tier has capacity 0: every challenged request will be denied");
    }
}
