use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::deprecation::deprecate;
use crate::error::BootstrapError;

/// Defaults every datasource is merged over.
pub fn default_config() -> Map<String, Value> {
    let defaults = json!({
        "delegate": "model",
        "baseDir": "model",
        "dialect": "mysql",
        "host": "localhost",
        "port": 3306,
        "username": "root",
        "logging": true,
        "benchmark": true,
        "define": {
            "freezeTableName": false,
            "underscored": true,
        },
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// One datasource's options as a plain mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasourceConfig {
    raw: Map<String, Value>,
}

impl DatasourceConfig {
    pub fn from_map(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Shallow merge: keys present in `overrides` replace the default wholesale.
    pub fn merged(defaults: &Map<String, Value>, overrides: &Map<String, Value>) -> Self {
        let mut raw = defaults.clone();
        for (key, value) in overrides {
            raw.insert(key.clone(), value.clone());
        }
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn delegate(&self) -> &str {
        self.raw
            .get("delegate")
            .and_then(Value::as_str)
            .unwrap_or("model")
    }

    /// Move a string/list `ignore` to `exclude`. Returns `true` if migrated.
    pub fn migrate_ignore(&mut self) -> bool {
        let migrate = matches!(self.raw.get("ignore"), Some(Value::String(_) | Value::Array(_)));
        if !migrate {
            return false;
        }
        if let Some(ignore) = self.raw.remove("ignore") {
            deprecate(&format!(
                "if you want to exclude {} when load models, please set to config.sequelize.exclude instead of config.sequelize.ignore",
                pattern_list(&ignore).join(",")
            ));
            self.raw.insert("exclude".to_string(), ignore);
        }
        true
    }

    pub fn settings(&self) -> Result<DatasourceSettings, BootstrapError> {
        let settings = serde_json::from_value(Value::Object(self.raw.clone()))?;
        Ok(settings)
    }
}

fn pattern_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Expand an environment sub-tree into one config per datasource.
pub fn normalize(env_config: &Map<String, Value>) -> Result<Vec<DatasourceConfig>, BootstrapError> {
    let defaults = default_config();

    let configs = match env_config.get("datasources") {
        None => vec![DatasourceConfig::merged(&defaults, env_config)],
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| match entry {
                Value::Object(map) => Ok(DatasourceConfig::merged(&defaults, map)),
                other => Err(BootstrapError::config(format!(
                    "datasources[{idx}] must be an object, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(BootstrapError::config(format!(
                "datasources must be an array, got {other}"
            )))
        }
    };

    ensure_unique_delegates(&configs)?;
    Ok(configs)
}

fn ensure_unique_delegates(configs: &[DatasourceConfig]) -> Result<(), BootstrapError> {
    let mut seen = HashSet::new();
    for config in configs {
        if !seen.insert(config.delegate()) {
            return Err(BootstrapError::DuplicateDelegate {
                name: config.delegate().to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mysql,
    Mariadb,
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Patterns::One(p) => vec![p.clone()],
            Patterns::Many(ps) => ps.clone(),
        }
    }
}

/// Options applied to every model defined on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefineOptions {
    pub freeze_table_name: bool,
    pub underscored: bool,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            freeze_table_name: false,
            underscored: true,
        }
    }
}

/// Pool sizing; times are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolOptions {
    pub max: Option<u32>,
    pub min: Option<u32>,
    pub acquire: Option<u64>,
    pub idle: Option<u64>,
}

impl PoolOptions {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire.map(Duration::from_millis)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle.map(Duration::from_millis)
    }
}

/// Typed view over a merged [`DatasourceConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceSettings {
    pub delegate: String,
    pub base_dir: String,
    pub dialect: Dialect,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// SQLite file path, or `:memory:`.
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub exclude: Option<Patterns>,
    #[serde(default = "enabled")]
    pub logging: bool,
    #[serde(default = "enabled")]
    pub benchmark: bool,
    #[serde(default)]
    pub define: DefineOptions,
    #[serde(default)]
    pub pool: PoolOptions,
}

fn enabled() -> bool {
    true
}

impl DatasourceSettings {
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.exclude.as_ref().map(Patterns::to_vec).unwrap_or_default()
    }
}
