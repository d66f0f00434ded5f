//! Configuration data types for stepwright.

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::error::ConfigError;
use crate::tags::TagFilter;

/// How scenarios execute.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Treat undefined and pending steps as fatal.
    pub strict: bool,

    /// Match steps and report them without invoking anything.
    pub dry_run: bool,

    /// Upper bound on features running at once in concurrent runs.
    #[default(4)]
    pub workers: usize,
}

/// Root runner configuration.
///
/// Loaded from defaults, a configuration file, and environment variables,
/// lowest to highest precedence. Configuration files are discovered in this
/// order:
/// 1. Path specified via the `STEPWRIGHT_CONFIG_PATH` environment variable
/// 2. `.stepwright.toml` in the current working directory
/// 3. `.stepwright.toml` in the home directory
/// 4. `~/.config/stepwright/stepwright.toml` (XDG default)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "STEPWRIGHT",
    post_merge_hook,
    discovery(
        app_name = "stepwright",
        env_var = "STEPWRIGHT_CONFIG_PATH",
        config_file_name = "stepwright.toml",
        dotfile_name = ".stepwright.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct RunnerConfig {
    /// Tag expression selecting which scenarios run, such as `@web&&~@slow`.
    pub tags: Option<String>,

    /// Execution settings.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub execution: ExecutionConfig,
}

impl RunnerConfig {
    /// Checks that the merged values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `tags` is not a valid tag
    /// expression or `execution.workers` is zero.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(tags) = self.tags.as_deref() {
            TagFilter::parse(tags).map_err(|err| ConfigError::InvalidValue {
                field: String::from("tags"),
                reason: err.to_string(),
            })?;
        }
        if self.execution.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: String::from("execution.workers"),
                reason: String::from("must be at least 1"),
            }
            .into());
        }
        Ok(())
    }
}

impl PostMergeHook for RunnerConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // A blank expression from an empty env var means "run everything".
        self.tags = self
            .tags
            .take()
            .map(|tags| tags.trim().to_owned())
            .filter(|tags| !tags.is_empty());
        Ok(())
    }
}
