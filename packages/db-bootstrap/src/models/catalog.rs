use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BootstrapError;
use crate::infra::db::connection::ConnectionHandle;
use crate::loader::{ModuleFile, ModuleSource};
use crate::models::model::{Model, ModelDefinition};

/// What a factory sees of the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub base_dir: PathBuf,
    pub env: String,
}

/// What an initialized model module yields.
#[derive(Debug, Clone)]
pub enum Export {
    Model(Arc<Model>),
    Value(Value),
}

impl Export {
    pub fn as_model(&self) -> Option<&Arc<Model>> {
        match self {
            Export::Model(model) => Some(model),
            Export::Value(_) => None,
        }
    }

    /// The model, if this export is one produced by a live connection.
    pub fn registered_model(&self) -> Option<&Arc<Model>> {
        self.as_model().filter(|model| model.is_registered())
    }
}

impl From<Arc<Model>> for Export {
    fn from(model: Arc<Model>) -> Self {
        Export::Model(model)
    }
}

impl From<Value> for Export {
    fn from(value: Value) -> Self {
        Export::Value(value)
    }
}

pub type ModelFactory = Arc<
    dyn Fn(&AppContext, &Arc<ConnectionHandle>) -> Result<Export, BootstrapError> + Send + Sync,
>;

/// A module as registered in the catalog: either a finished export or a
/// factory run against each connection that loads it.
#[derive(Clone)]
pub enum LoadedUnit {
    Value(Export),
    Factory(ModelFactory),
}

impl fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedUnit::Value(export) => f.debug_tuple("Value").field(export).finish(),
            LoadedUnit::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl LoadedUnit {
    pub fn factory(
        f: impl Fn(&AppContext, &Arc<ConnectionHandle>) -> Result<Export, BootstrapError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        LoadedUnit::Factory(Arc::new(f))
    }

    pub fn value(export: impl Into<Export>) -> Self {
        LoadedUnit::Value(export.into())
    }

    pub fn resolve(
        self,
        app: &AppContext,
        connection: &Arc<ConnectionHandle>,
    ) -> Result<Export, BootstrapError> {
        match self {
            LoadedUnit::Value(export) => Ok(export),
            LoadedUnit::Factory(factory) => factory(app, connection),
        }
    }
}

/// Compiled-in model modules keyed by their path under the model directory
/// (`user`, `admin/role`). A file on disk is only loaded when the catalog
/// has an entry for it.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    units: HashMap<String, LoadedUnit>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module_path: impl Into<String>, unit: LoadedUnit) -> &mut Self {
        self.units.insert(module_path.into(), unit);
        self
    }

    pub fn with_factory(
        mut self,
        module_path: impl Into<String>,
        f: impl Fn(&AppContext, &Arc<ConnectionHandle>) -> Result<Export, BootstrapError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.register(module_path, LoadedUnit::factory(f));
        self
    }

    /// Module that defines `definition` on whichever connection loads it.
    pub fn with_model(self, module_path: impl Into<String>, definition: ModelDefinition) -> Self {
        self.with_factory(module_path, move |_, connection| {
            connection.define(definition.clone()).map(Export::Model)
        })
    }

    pub fn with_value(mut self, module_path: impl Into<String>, value: impl Into<Export>) -> Self {
        self.register(module_path, LoadedUnit::value(value));
        self
    }

    pub fn get(&self, module_path: &str) -> Option<&LoadedUnit> {
        self.units.get(module_path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl ModuleSource for ModuleCatalog {
    type Unit = LoadedUnit;

    fn load(&self, file: &ModuleFile) -> Result<Option<LoadedUnit>, BootstrapError> {
        Ok(self.get(file.module_path()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::datasource::normalize;

    fn sqlite_connection() -> Arc<ConnectionHandle> {
        let env = json!({ "dialect": "sqlite" });
        let configs = normalize(env.as_object().unwrap()).unwrap();
        ConnectionHandle::new(configs[0].settings().unwrap())
    }

    fn app() -> AppContext {
        AppContext {
            base_dir: PathBuf::from("/srv/app"),
            env: "test".to_string(),
        }
    }

    #[test]
    fn model_entries_define_on_the_loading_connection() {
        let catalog = ModuleCatalog::new().with_model("user", ModelDefinition::new("User"));
        let conn = sqlite_connection();

        let unit = catalog.get("user").cloned().unwrap();
        let export = unit.resolve(&app(), &conn).unwrap();

        let model = export.registered_model().unwrap();
        assert_eq!(model.name(), "User");
        assert!(Arc::ptr_eq(&model.connection().unwrap(), &conn));
    }

    #[test]
    fn plain_values_are_not_models() {
        let catalog = ModuleCatalog::new().with_value("util", json!({ "k": 1 }));
        let export = catalog
            .get("util")
            .cloned()
            .unwrap()
            .resolve(&app(), &sqlite_connection())
            .unwrap();
        assert!(export.as_model().is_none());
        assert!(export.registered_model().is_none());
    }

    #[test]
    fn models_from_dropped_connections_are_unregistered() {
        let conn = sqlite_connection();
        let model = conn.define(ModelDefinition::new("Ghost")).unwrap();
        drop(conn);

        let export = Export::from(model);
        assert!(export.as_model().is_some());
        assert!(export.registered_model().is_none());
    }

    #[test]
    fn factories_see_the_app_context() {
        let catalog = ModuleCatalog::new().with_factory("env", |app, _| {
            Ok(Export::Value(json!(app.env.clone())))
        });
        let export = catalog
            .get("env")
            .cloned()
            .unwrap()
            .resolve(&app(), &sqlite_connection())
            .unwrap();
        assert!(matches!(export, Export::Value(Value::String(ref s)) if s == "test"));
    }
}
