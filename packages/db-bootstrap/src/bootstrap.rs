//! Entry point: resolve config, build every datasource, hand back the
//! authentication phase.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{load_config, normalize, resolve_environment, DEFAULT_CONFIG_NAME};
use crate::error::BootstrapError;
use crate::host::Host;
use crate::infra::db::auth::{AuthPhase, AuthReport, AuthStates, Authenticate, RetryPolicy};
use crate::infra::db::connection::ConnectionHandle;
use crate::models::{load_database, ModuleCatalog};
use crate::timing::Timing;

/// Result of [`BootstrapBuilder::configure`]. Connections are built and
/// published; nothing has touched the network yet.
#[derive(Debug)]
pub struct Bootstrap {
    connections: Vec<Arc<ConnectionHandle>>,
    timing: Timing,
    auth: AuthPhase,
}

impl Bootstrap {
    fn empty(timing: Timing, policy: RetryPolicy) -> Self {
        Self {
            connections: Vec::new(),
            timing,
            auth: AuthPhase::new(Vec::new(), policy),
        }
    }

    /// Connections in datasource order.
    pub fn connections(&self) -> &[Arc<ConnectionHandle>] {
        &self.connections
    }

    pub fn delegates(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.delegate()).collect()
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn auth_states(&self) -> AuthStates {
        self.auth.states()
    }

    pub fn into_auth(self) -> AuthPhase {
        self.auth
    }

    /// Await authentication of every connection.
    pub async fn authenticate(self) -> Result<Vec<AuthReport>, BootstrapError> {
        self.auth.run().await
    }
}

/// Builder for a multi-datasource bootstrap.
pub struct BootstrapBuilder {
    config_name: String,
    catalog: ModuleCatalog,
    retry: RetryPolicy,
}

impl BootstrapBuilder {
    pub fn new() -> Self {
        Self {
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            catalog: ModuleCatalog::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Config file stem and top-level key (`sequelize` by default).
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    pub fn with_catalog(mut self, catalog: ModuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build and publish every datasource on `host`, then return the pending
    /// authentication phase. Performs no network I/O.
    pub fn configure<H: Host + ?Sized>(self, host: &mut H) -> Result<Bootstrap, BootstrapError> {
        let config_dir = host.base_dir().join("config");
        info!(
            base = %host.base_dir().display(),
            env = %host.env(),
            config = %self.config_name,
            "bootstrap=start"
        );

        let mut timing = Timing::new();
        let env_config = timing.measure("Load Sequelize Config", || {
            let config = load_config(&config_dir, &self.config_name)?;
            resolve_environment(&config, &self.config_name, host.env())
        })?;

        let Some(env_config) = env_config else {
            error!(
                "can not find {} config in {}",
                self.config_name,
                config_dir.display()
            );
            return Ok(Bootstrap::empty(timing, self.retry));
        };

        let datasources = normalize(&env_config)?;
        let mut connections = Vec::with_capacity(datasources.len());
        for datasource in datasources {
            let connection = load_database(host, &self.catalog, datasource, &mut timing)?;
            connections.push(connection);
        }

        let targets = connections
            .iter()
            .map(|c| c.clone() as Arc<dyn Authenticate>)
            .collect();
        let auth = AuthPhase::new(targets, self.retry);

        info!(
            datasources = connections.len(),
            elapsed_ms = timing.total().as_millis(),
            "bootstrap=ready"
        );
        Ok(Bootstrap {
            connections,
            timing,
            auth,
        })
    }
}

impl Default for BootstrapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bootstrap() -> BootstrapBuilder {
    BootstrapBuilder::new()
}

/// [`BootstrapBuilder::configure`] with default options.
pub fn configure<H: Host + ?Sized>(
    host: &mut H,
    catalog: ModuleCatalog,
) -> Result<Bootstrap, BootstrapError> {
    bootstrap().with_catalog(catalog).configure(host)
}
