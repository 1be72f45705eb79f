//! CLI for the WPX proxy rewriting engine.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use wpx_core::config::{self, WpxConfig};
use wpx_core::rewrite::{RewriteContext, Rewriter};

use commands::{
    run_attr, run_completions, run_config, run_navigate, run_rewrite, run_simulate, SimulateArgs,
};

/// Top-level CLI for WPX.
#[derive(Debug, Parser)]
#[command(name = "wpx")]
#[command(about = "WPX: rewrite page URLs so they route through a web proxy", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Proxy and target origins; fall back to config.toml when omitted.
#[derive(Debug, Clone, Default, Args)]
pub struct OriginArgs {
    /// Origin serving the proxied page (host[:port]).
    #[arg(long, value_name = "HOST")]
    pub proxy: Option<String>,
    /// Origin that relative URLs resolve against (host[:port]).
    #[arg(long, value_name = "HOST")]
    pub target: Option<String>,
}

impl OriginArgs {
    /// Builds the rewriter from flags, then config values.
    pub fn rewriter(&self, cfg: &WpxConfig) -> Result<Rewriter> {
        let proxy = self.proxy.clone().unwrap_or_else(|| cfg.proxy_host.clone());
        let target = self
            .target
            .clone()
            .or_else(|| cfg.target_origin())
            .context("no target origin: pass --target or set target_domain in config.toml")?;
        Ok(Rewriter::new(RewriteContext::new(proxy), target))
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Rewrite one URL into its proxied form.
    Rewrite {
        /// URL as it appears in the page (absolute, relative, //host/...).
        url: String,
        #[command(flatten)]
        origins: OriginArgs,
        /// Also print how the URL was classified and its decoded target.
        #[arg(long)]
        explain: bool,
    },

    /// Rewrite a whole attribute value using the strategy for its name.
    Attr {
        /// Attribute name (src, href, srcset, archive, content, ...).
        name: String,
        /// Attribute value.
        value: String,
        #[command(flatten)]
        origins: OriginArgs,
    },

    /// Compute the redirect a page entering at LOCATION would perform.
    Navigate {
        /// Full location of the page, e.g. http://proxy:3000/path?proxyTargetURI=...
        location: String,
    },

    /// Load a small page, apply scripted mutations, and print every flush.
    Simulate(SimulateArgs),

    /// Show the config file path and effective settings.
    Config,

    /// Print shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Rewrite {
                url,
                origins,
                explain,
            } => run_rewrite(&origins.rewriter(&cfg)?, &url, explain)?,
            CliCommand::Attr {
                name,
                value,
                origins,
            } => run_attr(&origins.rewriter(&cfg)?, &name, &value),
            CliCommand::Navigate { location } => run_navigate(&location),
            CliCommand::Simulate(args) => run_simulate(&cfg, &args).await?,
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
