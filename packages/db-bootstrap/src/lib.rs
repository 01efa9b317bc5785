//! Multi-datasource database bootstrap: resolves per-environment datasource
//! config, builds one connection per datasource, loads model modules into
//! each, resolves associations and verifies connectivity with bounded retry.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod host;
pub mod infra;
pub mod loader;
pub mod models;
pub mod timing;

#[cfg(test)]
pub mod test_bootstrap;

pub use bootstrap::{bootstrap, configure, Bootstrap, BootstrapBuilder};
pub use config::{DatasourceConfig, DatasourceSettings, Dialect};
pub use error::{AuthError, AuthErrorKind, BootstrapError};
pub use host::{AppRegistry, DatasourceSlot, Host};
pub use infra::db::{
    join_auth, AuthPhase, AuthReport, AuthState, AuthStates, Authenticate, ConnectionHandle,
    RetryPolicy,
};
pub use models::{
    AppContext, Export, LoadedUnit, Model, ModelDefinition, ModuleCatalog,
};
pub use timing::Timing;

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
