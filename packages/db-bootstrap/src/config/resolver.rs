use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::BootstrapError;
use crate::loader::{JsonFileSource, Loader};

/// Config file stem, and top-level key, looked up by default.
pub const DEFAULT_CONFIG_NAME: &str = "sequelize";

/// Load `<directory>/<name>.json` into a fresh mapping keyed by file stem.
/// Nothing is validated; a missing file simply yields an empty mapping.
pub fn load_config(directory: &Path, name: &str) -> Result<Map<String, Value>, BootstrapError> {
    let source = JsonFileSource;
    let mut target = BTreeMap::new();
    Loader::new(directory, &source)
        .matching([format!("{name}.json")])
        .load(&mut target)?;
    Ok(target.into_iter().collect())
}

/// Select `config[name][env]`.
///
/// `Ok(None)` when `config` has no `name` key at all; the caller decides how
/// to degrade. A present key with no usable entry for `env` is an error.
pub fn resolve_environment(
    config: &Map<String, Value>,
    name: &str,
    env: &str,
) -> Result<Option<Map<String, Value>>, BootstrapError> {
    let Some(section) = config.get(name) else {
        return Ok(None);
    };

    match section.get(env) {
        Some(Value::Object(env_config)) => Ok(Some(env_config.clone())),
        Some(other) => Err(BootstrapError::config(format!(
            "{name}.{env} must be an object, got {other}"
        ))),
        None => Err(BootstrapError::config(format!(
            "{name} config has no entry for environment '{env}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn loads_named_file_under_its_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("sequelize.json"),
            r#"{ "development": { "database": "d" } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("other.json"), r#"{ "x": 1 }"#).unwrap();

        let config = load_config(dir.path(), "sequelize").unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config["sequelize"]["development"]["database"], json!("d"));
    }

    #[test]
    fn missing_file_yields_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), "sequelize").unwrap();
        assert!(config.is_empty());
        assert_eq!(resolve_environment(&config, "sequelize", "development").unwrap(), None);
    }

    #[test]
    fn selects_environment_subtree() {
        let config: Map<String, Value> = serde_json::from_value(json!({
            "sequelize": {
                "development": { "database": "dev" },
                "production": { "database": "prod" },
            }
        }))
        .unwrap();

        let env = resolve_environment(&config, "sequelize", "production")
            .unwrap()
            .unwrap();
        assert_eq!(env["database"], json!("prod"));
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let config: Map<String, Value> =
            serde_json::from_value(json!({ "sequelize": { "development": {} } })).unwrap();

        let err = resolve_environment(&config, "sequelize", "staging").unwrap_err();
        assert!(err.to_string().contains("staging"));

        let config: Map<String, Value> =
            serde_json::from_value(json!({ "sequelize": { "staging": "oops" } })).unwrap();
        assert!(resolve_environment(&config, "sequelize", "staging").is_err());
    }
}
