//! CLI command handlers, one per file.

mod attr;
mod completions;
mod config;
mod navigate;
mod rewrite;
mod simulate;

pub use attr::run_attr;
pub use completions::run_completions;
pub use config::run_config;
pub use navigate::run_navigate;
pub use rewrite::run_rewrite;
pub use simulate::{run_simulate, SimulateArgs};
