//! `wpx config` – show where the config lives and what is in effect.

use anyhow::Result;
use wpx_core::config::{self, WpxConfig};

pub fn run_config(cfg: &WpxConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    match cfg.target_origin() {
        Some(origin) => println!("# effective target origin: {origin}"),
        None => println!("# no target origin configured"),
    }
    Ok(())
}
