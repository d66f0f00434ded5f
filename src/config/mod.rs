//! Runner configuration.
//!
//! [`RunnerConfig`] controls how a suite runs: strictness, dry runs, scenario
//! selection by tag, and the worker count for concurrent runs. Values are
//! merged from application defaults, a configuration file, and `STEPWRIGHT_*`
//! environment variables, later layers overriding earlier ones.
//!
//! The configuration file is discovered at `~/.config/stepwright/stepwright.toml`
//! by default, or at the path named by `STEPWRIGHT_CONFIG_PATH`.
//!
//! # Example Configuration
//!
//! ```toml
//! tags = "@checkout,@payments&&~@slow"
//!
//! [execution]
//! strict = true
//! dry_run = false
//! workers = 8
//! ```

mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use loader::{env_var_names, load_config};
pub use types::{ExecutionConfig, RunnerConfig};
