pub mod datasource;
pub mod deprecation;
pub mod resolver;

pub use datasource::{
    default_config, normalize, DatasourceConfig, DatasourceSettings, DefineOptions, Dialect,
    PoolOptions,
};
pub use resolver::{load_config, resolve_environment, DEFAULT_CONFIG_NAME};
