use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::datasource::DatasourceConfig;
use crate::error::BootstrapError;
use crate::host::{DatasourceSlot, Host};
use crate::infra::db::connection::ConnectionHandle;
use crate::loader::{CaseStyle, Loader};
use crate::models::associate::resolve_associations;
use crate::models::catalog::{AppContext, Export, ModuleCatalog};
use crate::models::model::Model;
use crate::timing::Timing;

/// Files considered model modules unless a datasource says otherwise.
pub const DEFAULT_MODEL_MATCH: &[&str] = &["**/*.rs"];

/// Build one datasource: connection, host slot, models and associations.
pub fn load_database<H: Host + ?Sized>(
    host: &mut H,
    catalog: &ModuleCatalog,
    mut config: DatasourceConfig,
    timing: &mut Timing,
) -> Result<Arc<ConnectionHandle>, BootstrapError> {
    config.migrate_ignore();
    let settings = config.settings()?;
    let delegate = settings.delegate.clone();

    let connection = ConnectionHandle::new(settings);
    host.set(&delegate, DatasourceSlot::new(connection.clone()), true)?;

    let model_dir = host
        .base_dir()
        .join("app")
        .join(&connection.settings().base_dir);
    let app = host.context();

    timing.measure(format!("Load \"{delegate}\" to Application"), || {
        let (models, registered) = load_models(&model_dir, catalog, &app, &connection)?;
        let count = models.len();

        let slot = host.slot_mut(&delegate).ok_or_else(|| {
            BootstrapError::config(format!("host lost the slot for delegate '{delegate}'"))
        })?;
        slot.models.extend(models);

        let associated = resolve_associations(&registered)?;
        info!(
            delegate = %delegate,
            models = count,
            associated,
            dir = %model_dir.display(),
            "datasource=loaded"
        );
        Ok::<(), BootstrapError>(())
    })?;

    Ok(connection)
}

/// Models keyed by upper-camel path, plus the registered ones in discovery order.
type LoadedModels = (BTreeMap<String, Arc<Model>>, Vec<Arc<Model>>);

fn load_models(
    model_dir: &Path,
    catalog: &ModuleCatalog,
    app: &AppContext,
    connection: &Arc<ConnectionHandle>,
) -> Result<LoadedModels, BootstrapError> {
    let mut registered: Vec<Arc<Model>> = Vec::new();
    let mut exports: BTreeMap<String, Export> = BTreeMap::new();

    Loader::with_initializer(model_dir, catalog, |unit, _| unit.resolve(app, connection))
        .matching(DEFAULT_MODEL_MATCH.iter().copied())
        .ignoring(connection.settings().exclude_patterns())
        .case_style(CaseStyle::Upper)
        .filter(|export| match export.registered_model() {
            Some(model) => {
                registered.push(model.clone());
                true
            }
            None => false,
        })
        .load(&mut exports)?;

    let models = exports
        .into_iter()
        .filter_map(|(key, export)| match export {
            Export::Model(model) => Some((key, model)),
            Export::Value(_) => None,
        })
        .collect::<BTreeMap<_, _>>();

    debug!(
        delegate = %connection.delegate(),
        registered = registered.len(),
        "models=collected"
    );
    Ok((models, registered))
}
