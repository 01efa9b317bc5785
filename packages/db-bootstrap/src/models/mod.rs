//! Models bound to a connection, the compiled-in module catalog they are
//! loaded from, and the association pass run after loading.

pub mod associate;
pub mod catalog;
pub mod loader;
pub mod model;

pub use associate::resolve_associations;
pub use catalog::{AppContext, Export, LoadedUnit, ModelFactory, ModuleCatalog};
pub use loader::{load_database, DEFAULT_MODEL_MATCH};
pub use model::{
    AssociateHook, Association, AssociationKind, Attribute, ColumnKind, Model, ModelDefinition,
};
