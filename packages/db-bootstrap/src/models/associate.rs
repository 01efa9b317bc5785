use std::sync::Arc;

use tracing::trace;

use crate::error::BootstrapError;
use crate::models::model::Model;

/// Run each model's `associate` hook once, in discovery order. Returns how
/// many hooks ran.
pub fn resolve_associations(models: &[Arc<Model>]) -> Result<usize, BootstrapError> {
    let mut invoked = 0;
    for model in models.iter().map(Arc::as_ref) {
        let Some(hook) = model.associate_hook() else {
            continue;
        };
        trace!(model = %model.name(), "associate=invoke");
        hook(model)?;
        invoked += 1;
    }
    Ok(invoked)
}
