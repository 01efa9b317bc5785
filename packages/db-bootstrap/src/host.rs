//! The application object datasources are published on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::BootstrapError;
use crate::infra::db::connection::ConnectionHandle;
use crate::models::{AppContext, Model};

/// A connection and the models loaded into it, as seen by the host.
#[derive(Debug, Clone)]
pub struct DatasourceSlot {
    pub connection: Arc<ConnectionHandle>,
    pub models: BTreeMap<String, Arc<Model>>,
}

impl DatasourceSlot {
    pub fn new(connection: Arc<ConnectionHandle>) -> Self {
        Self {
            connection,
            models: BTreeMap::new(),
        }
    }

    pub fn model(&self, key: &str) -> Option<&Arc<Model>> {
        self.models.get(key)
    }
}

/// Capabilities the bootstrap needs from the hosting application.
pub trait Host {
    fn base_dir(&self) -> &Path;

    fn env(&self) -> &str;

    /// Publish `slot` under `name`. An existing slot may only be replaced
    /// when it was published as overridable.
    fn set(&mut self, name: &str, slot: DatasourceSlot, overridable: bool) -> Result<(), BootstrapError>;

    fn slot_mut(&mut self, name: &str) -> Option<&mut DatasourceSlot>;

    fn context(&self) -> AppContext {
        AppContext {
            base_dir: self.base_dir().to_path_buf(),
            env: self.env().to_string(),
        }
    }
}

#[derive(Debug)]
struct Entry {
    slot: DatasourceSlot,
    overridable: bool,
}

/// Plain in-process [`Host`].
#[derive(Debug)]
pub struct AppRegistry {
    base_dir: PathBuf,
    env: String,
    slots: BTreeMap<String, Entry>,
}

impl AppRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, env: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            env: env.into(),
            slots: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DatasourceSlot> {
        self.slots.get(name).map(|entry| &entry.slot)
    }

    pub fn delegates(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }
}

impl Host for AppRegistry {
    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn env(&self) -> &str {
        &self.env
    }

    fn set(&mut self, name: &str, slot: DatasourceSlot, overridable: bool) -> Result<(), BootstrapError> {
        if let Some(existing) = self.slots.get(name) {
            if !existing.overridable {
                return Err(BootstrapError::SlotTaken {
                    name: name.to_string(),
                });
            }
            debug!(delegate = %name, "host_slot=replaced");
        }
        self.slots.insert(name.to_string(), Entry { slot, overridable });
        Ok(())
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut DatasourceSlot> {
        self.slots.get_mut(name).map(|entry| &mut entry.slot)
    }
}
