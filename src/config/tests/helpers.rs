//! Shared fixtures and helper functions for config tests.

use crate::config::RunnerConfig;
use ortho_config::MergeComposer;
use ortho_config::serde_json::json;
use rstest::fixture;
use std::sync::Arc;

/// Fixture providing a `RunnerConfig` parsed from a full TOML example.
#[fixture]
pub fn runner_config_from_full_toml() -> RunnerConfig {
    let toml = r#"
        tags = "@checkout,@payments&&~@slow"

        [execution]
        strict = true
        dry_run = true
        workers = 8
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Creates a `MergeComposer` with the defaults layer already pushed.
pub fn create_composer_with_defaults() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = MergeComposer::new();
    let defaults = ortho_config::serde_json::to_value(RunnerConfig::default())?;
    composer.push_defaults(defaults);
    Ok(composer)
}

/// Creates a composer with defaults, a file layer, and an environment layer.
///
/// The file sets `tags`, `strict`, and `workers`; the environment overrides
/// `workers` only.
pub fn create_composer_with_file_and_env() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = create_composer_with_defaults()?;
    composer.push_file(
        json!({
            "tags": "@from-file",
            "execution": { "strict": true, "workers": 2 }
        }),
        None,
    );
    composer.push_environment(json!({
        "execution": { "workers": 6 }
    }));
    Ok(composer)
}

/// Merges a composer's layers into a `RunnerConfig`.
pub fn merge_config(
    composer: MergeComposer,
) -> Result<RunnerConfig, Arc<ortho_config::OrthoError>> {
    RunnerConfig::merge_from_layers(composer.layers())
}

/// Asserts that `config` carries default values throughout.
pub fn assert_config_has_defaults(config: &RunnerConfig) {
    assert!(config.tags.is_none(), "tags should be None");
    assert!(!config.execution.strict, "execution.strict should be false");
    assert!(
        !config.execution.dry_run,
        "execution.dry_run should be false"
    );
    assert_eq!(config.execution.workers, 4, "execution.workers should be 4");
}
