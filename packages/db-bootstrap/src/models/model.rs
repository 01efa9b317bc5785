use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::config::datasource::DefineOptions;
use crate::error::BootstrapError;
use crate::infra::db::connection::ConnectionHandle;

/// Hook run once after every model of a connection is loaded.
pub type AssociateHook = Arc<dyn Fn(&Model) -> Result<(), BootstrapError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    BigInteger,
    String,
    Text,
    Boolean,
    Float,
    Date,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub kind: AssociationKind,
    pub target: String,
    pub foreign_key: String,
}

/// Everything a module declares about a model before it is bound to a
/// connection.
#[derive(Clone)]
pub struct ModelDefinition {
    name: String,
    table: Option<String>,
    attributes: Vec<Attribute>,
    associate: Option<AssociateHook>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .field("associate", &self.associate.is_some())
            .finish()
    }
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            attributes: Vec::new(),
            associate: None,
        }
    }

    /// Explicit table name; bypasses `define` naming rules.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn attribute(self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.column(Attribute::new(name, kind))
    }

    pub fn column(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn associate(
        mut self,
        hook: impl Fn(&Model) -> Result<(), BootstrapError> + Send + Sync + 'static,
    ) -> Self {
        self.associate = Some(Arc::new(hook));
        self
    }
}

/// A model bound to one connection.
pub struct Model {
    name: String,
    table_name: String,
    attributes: Vec<Attribute>,
    underscored: bool,
    connection: Weak<ConnectionHandle>,
    associate: Option<AssociateHook>,
    associations: RwLock<Vec<Association>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("attributes", &self.attributes)
            .field("registered", &self.is_registered())
            .field("associations", &*self.associations.read())
            .finish()
    }
}

impl Model {
    pub(crate) fn build(
        definition: ModelDefinition,
        options: DefineOptions,
        connection: Weak<ConnectionHandle>,
    ) -> Self {
        let table_name = definition
            .table
            .unwrap_or_else(|| table_name_for(&definition.name, options));
        Self {
            name: definition.name,
            table_name,
            attributes: definition.attributes,
            underscored: options.underscored,
            connection,
            associate: definition.associate,
            associations: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Column names as stored in the database.
    pub fn columns(&self) -> Vec<String> {
        self.attributes
            .iter()
            .map(|a| {
                if self.underscored {
                    snake_case(&a.name)
                } else {
                    a.name.clone()
                }
            })
            .collect()
    }

    /// The owning connection, while it is alive.
    pub fn connection(&self) -> Option<Arc<ConnectionHandle>> {
        self.connection.upgrade()
    }

    /// True when this model was produced by a live connection's factory.
    pub fn is_registered(&self) -> bool {
        self.connection.strong_count() > 0
    }

    pub fn associate_hook(&self) -> Option<&AssociateHook> {
        self.associate.as_ref()
    }

    pub fn associations(&self) -> Vec<Association> {
        self.associations.read().clone()
    }

    pub fn belongs_to(&self, target: &str) -> Result<Association, BootstrapError> {
        let foreign_key = self.foreign_key_for(target);
        self.link(AssociationKind::BelongsTo, target, foreign_key)
    }

    pub fn has_one(&self, target: &str) -> Result<Association, BootstrapError> {
        let foreign_key = self.foreign_key_for(&self.name);
        self.link(AssociationKind::HasOne, target, foreign_key)
    }

    pub fn has_many(&self, target: &str) -> Result<Association, BootstrapError> {
        let foreign_key = self.foreign_key_for(&self.name);
        self.link(AssociationKind::HasMany, target, foreign_key)
    }

    /// Like the shorthands but with an explicit foreign key.
    pub fn link(
        &self,
        kind: AssociationKind,
        target: &str,
        foreign_key: impl Into<String>,
    ) -> Result<Association, BootstrapError> {
        let connection = self.connection().ok_or_else(|| {
            BootstrapError::model(format!("model '{}' is not bound to a connection", self.name))
        })?;
        if connection.model(target).is_none() {
            return Err(BootstrapError::model(format!(
                "model '{}' cannot associate with unknown model '{}' on '{}'",
                self.name,
                target,
                connection.delegate()
            )));
        }

        let association = Association {
            kind,
            target: target.to_string(),
            foreign_key: foreign_key.into(),
        };
        debug!(
            model = %self.name,
            target = %association.target,
            kind = ?association.kind,
            foreign_key = %association.foreign_key,
            "association=added"
        );
        self.associations.write().push(association.clone());
        Ok(association)
    }

    fn foreign_key_for(&self, model: &str) -> String {
        if self.underscored {
            format!("{}_id", snake_case(model))
        } else {
            let mut chars = model.chars();
            let first = chars.next().map(|c| c.to_ascii_lowercase());
            first.into_iter().chain(chars).chain("Id".chars()).collect()
        }
    }
}

fn table_name_for(model: &str, options: DefineOptions) -> String {
    if options.freeze_table_name {
        return model.to_string();
    }
    if options.underscored {
        pluralize(&snake_case(model))
    } else {
        pluralize(model)
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if lower.ends_with('y')
        && !matches!(lower.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u') | None)
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbound(definition: ModelDefinition, options: DefineOptions) -> Model {
        Model::build(definition, options, Weak::new())
    }

    #[test]
    fn table_names_follow_define_options() {
        let underscored = DefineOptions {
            freeze_table_name: false,
            underscored: true,
        };
        assert_eq!(
            unbound(ModelDefinition::new("UserRole"), underscored).table_name(),
            "user_roles"
        );
        assert_eq!(
            unbound(ModelDefinition::new("Category"), underscored).table_name(),
            "categories"
        );

        let plain = DefineOptions {
            freeze_table_name: false,
            underscored: false,
        };
        assert_eq!(unbound(ModelDefinition::new("Box"), plain).table_name(), "Boxes");
        assert_eq!(unbound(ModelDefinition::new("Day"), plain).table_name(), "Days");

        let frozen = DefineOptions {
            freeze_table_name: true,
            underscored: true,
        };
        assert_eq!(unbound(ModelDefinition::new("User"), frozen).table_name(), "User");

        let explicit = ModelDefinition::new("User").table("accounts");
        assert_eq!(unbound(explicit, underscored).table_name(), "accounts");
    }

    #[test]
    fn columns_are_snake_cased_when_underscored() {
        let def = ModelDefinition::new("User")
            .column(Attribute::new("id", ColumnKind::BigInteger).primary_key())
            .attribute("createdAt", ColumnKind::Date);
        let model = unbound(def, DefineOptions::default());
        assert_eq!(model.columns(), vec!["id", "created_at"]);
        assert!(!model.attributes()[0].nullable);
    }

    #[test]
    fn unbound_model_is_not_registered() {
        let model = unbound(ModelDefinition::new("User"), DefineOptions::default());
        assert!(!model.is_registered());
        assert!(model.connection().is_none());
        assert!(matches!(
            model.belongs_to("Team"),
            Err(BootstrapError::Model { .. })
        ));
    }

    #[test]
    fn snake_case_handles_acronyms_and_digits() {
        assert_eq!(snake_case("UserRole"), "user_role");
        assert_eq!(snake_case("HTTPLog"), "httplog");
        assert_eq!(snake_case("V2Item"), "v2_item");
    }
}
