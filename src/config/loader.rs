//! Configuration loading with layered precedence.
//!
//! Layers are composed by hand with `MergeComposer` (lowest to highest):
//! application defaults, configuration file, environment variables. Composing
//! manually lets the environment layer read through a [`mockable::Env`] and
//! fail fast on values that do not parse, where Figment's environment
//! provider would silently drop them.
//!
//! # Environment Variable Handling
//!
//! `STEPWRIGHT_TAGS` is a string and always accepted at this stage; its
//! expression is checked by [`RunnerConfig::validate`] after merging. Typed
//! variables such as `STEPWRIGHT_EXECUTION_STRICT=maybe` or
//! `STEPWRIGHT_EXECUTION_WORKERS=lots` are rejected with
//! `ConfigError::InvalidValue`.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::RunnerConfig;
use crate::error::{ConfigError, Result};

const CONFIG_PATH_VAR: &str = "STEPWRIGHT_CONFIG_PATH";

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    String,
    Bool,
    Count,
}

/// One environment variable and where its value lands in the config tree.
struct EnvVarSpec {
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
}

const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "STEPWRIGHT_TAGS",
        path: &["tags"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "STEPWRIGHT_EXECUTION_STRICT",
        path: &["execution", "strict"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "STEPWRIGHT_EXECUTION_DRY_RUN",
        path: &["execution", "dry_run"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "STEPWRIGHT_EXECUTION_WORKERS",
        path: &["execution", "workers"],
        var_type: EnvVarType::Count,
    },
];

/// Returns the environment variable names the loader reads.
///
/// Tests use this to clear every `STEPWRIGHT_*` variable without keeping a
/// second list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS
        .iter()
        .map(|spec| spec.env_var)
        .chain(std::iter::once(CONFIG_PATH_VAR))
        .collect()
}

/// Loads the runner configuration.
///
/// The file layer comes from `explicit_path` when given, otherwise from
/// `STEPWRIGHT_CONFIG_PATH` in `env`, otherwise from the first discovered
/// candidate that exists. No file at all is fine; defaults apply. The merged
/// result is validated before it is returned.
///
/// # Errors
///
/// Returns `ConfigError` when:
/// - an explicit or environment-named file does not exist
/// - a file cannot be read or is not valid TOML
/// - a typed environment variable does not parse
/// - the merged values fail [`RunnerConfig::validate`]
pub fn load_config<E: mockable::Env>(
    explicit_path: Option<&Utf8Path>,
    env: &E,
) -> Result<RunnerConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(RunnerConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(path) = resolve_config_path(explicit_path, env)? {
        load_config_file(&path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let config =
        RunnerConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn resolve_config_path<E: mockable::Env>(
    explicit_path: Option<&Utf8Path>,
    env: &E,
) -> Result<Option<Utf8PathBuf>> {
    let named = explicit_path
        .map(Utf8Path::to_path_buf)
        .or_else(|| env.string(CONFIG_PATH_VAR).map(Utf8PathBuf::from));

    if let Some(path) = named {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.into_std_path_buf(),
            }
            .into());
        }
        return Ok(Some(path));
    }

    let discovery = ConfigDiscovery::builder("stepwright")
        .config_file_name("stepwright.toml")
        .dotfile_name(".stepwright.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok()))
}

/// Reads a TOML file through `cap_std` and pushes it as the file layer.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value = toml::from_str::<Value>(&content).map_err(|e| ConfigError::ParseError {
        message: format!("failed to parse {path}: {e}"),
    })?;

    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Collects the `STEPWRIGHT_*` variables present in `env` into a JSON tree.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };
        let json_value = parse_env_value(spec, raw_value)?;
        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

fn parse_env_value(spec: &EnvVarSpec, raw_value: String) -> Result<Value> {
    let invalid = |expected: &str, raw: &str| ConfigError::InvalidValue {
        field: spec.env_var.to_owned(),
        reason: format!("expected {expected}, got '{raw}'"),
    };
    match spec.var_type {
        EnvVarType::String => Ok(Value::String(raw_value)),
        EnvVarType::Bool => raw_value
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| invalid("bool (true/false)", &raw_value).into()),
        EnvVarType::Count => raw_value
            .trim()
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| invalid("unsigned integer", &raw_value).into()),
    }
}

/// Inserts `value` at a nested path, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }
    current.insert(field.to_owned(), value);
}
