//! Column descriptors.
//!
//! A [`Field`] describes one column: its storage type, constraints, default
//! and, for relations, the referenced model. Fields are plain values; they are
//! bound to a column name and an owning model when the model is registered.

use crate::error::{Error, Result};
use crate::orm::model::{Model, Registry};
use crate::orm::value::Value;

/// What happens to referencing rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    #[default]
    NoAction,
    Cascade,
}

/// Storage type of a column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Integer { autoincrement: bool },
    Real,
    Text { datetime: bool },
    Blob,
    /// Relation to another model, referenced by its type name.
    ForeignKey { reference: String, on_delete: OnDelete },
}

/// Column metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    kind: FieldKind,
    primary_key: bool,
    not_null: bool,
    unique: bool,
    default: Option<Value>,
    use_default: bool,
}

impl Field {
    fn new(kind: FieldKind) -> Self {
        Field {
            kind,
            primary_key: false,
            not_null: true,
            unique: false,
            default: None,
            use_default: false,
        }
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer {
            autoincrement: false,
        })
    }

    pub fn real() -> Self {
        Self::new(FieldKind::Real)
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text { datetime: false })
    }

    pub fn blob() -> Self {
        Self::new(FieldKind::Blob)
    }

    /// Relation to the model registered under `reference`.
    pub fn foreign_key(reference: impl Into<String>) -> Self {
        Self::new(FieldKind::ForeignKey {
            reference: reference.into(),
            on_delete: OnDelete::NoAction,
        })
    }

    /// Relation to the model type `M`.
    pub fn references<M: Model>() -> Self {
        Self::foreign_key(M::NAME)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Only meaningful on integer columns; ignored elsewhere.
    pub fn autoincrement(mut self) -> Self {
        if let FieldKind::Integer { autoincrement } = &mut self.kind {
            *autoincrement = true;
        }
        self
    }

    /// Only meaningful on text columns; ignored elsewhere.
    pub fn datetime(mut self) -> Self {
        if let FieldKind::Text { datetime } = &mut self.kind {
            *datetime = true;
        }
        self
    }

    /// Only meaningful on relations; ignored elsewhere.
    pub fn on_delete(mut self, action: OnDelete) -> Self {
        if let FieldKind::ForeignKey { on_delete, .. } = &mut self.kind {
            *on_delete = action;
        }
        self
    }

    pub fn nullable(mut self) -> Self {
        self.not_null = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default value and render it in the column definition.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.use_default = true;
        self
    }

    /// Toggle whether the stored default is rendered.
    pub fn use_default(mut self, use_default: bool) -> Self {
        self.use_default = use_default;
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_not_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique || self.primary_key
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Primary keys and unique columns never use a default.
    pub fn uses_default(&self) -> bool {
        self.use_default && !self.is_unique()
    }

    pub fn is_autoincrement(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Integer {
                autoincrement: true
            }
        )
    }

    pub fn is_datetime(&self) -> bool {
        matches!(self.kind, FieldKind::Text { datetime: true })
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::ForeignKey { .. })
    }

    /// Name of the referenced model for relations.
    pub fn reference(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::ForeignKey { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Check the descriptor's own consistency.
    pub fn validate(&self, column: &str) -> Result<()> {
        if self.uses_default()
            && self.is_not_null()
            && self.default.as_ref().is_none_or(Value::is_null)
        {
            return Err(Error::Configuration {
                column: column.to_string(),
            });
        }
        Ok(())
    }

    /// Engine-level type token. Relations take the referenced primary key's type.
    pub fn sql_type(&self, registry: &Registry) -> Result<String> {
        let token = match &self.kind {
            FieldKind::Integer { .. } => "INTEGER",
            FieldKind::Real => "REAL",
            FieldKind::Text { .. } => "TEXT",
            FieldKind::Blob => "BLOB",
            FieldKind::ForeignKey { reference, .. } => {
                let target = registry.resolve_reference(reference)?;
                let pk = target.primary_key_column();
                if pk.field.reference() == Some(reference.as_str()) {
                    return Err(Error::Schema(format!(
                        "primary key of {reference} references its own model"
                    )));
                }
                return pk.field.sql_type(registry);
            }
        };
        Ok(token.to_string())
    }

    /// Column definition without the column name, e.g.
    /// `INTEGER PRIMARY KEY AUTOINCREMENT` or `TEXT NOT NULL DEFAULT 'x'`.
    pub fn to_column_sql(&self, column: &str, registry: &Registry) -> Result<String> {
        self.validate(column)?;

        let mut parts = vec![self.sql_type(registry)?];
        if self.primary_key {
            parts.push("PRIMARY KEY".to_string());
            if self.is_autoincrement() {
                parts.push("AUTOINCREMENT".to_string());
            }
        } else if self.not_null {
            parts.push("NOT NULL".to_string());
        }
        if self.unique && !self.primary_key {
            parts.push("UNIQUE".to_string());
        }
        if self.uses_default() {
            let literal = self
                .default
                .as_ref()
                .map_or_else(|| "NULL".to_string(), Value::to_sql_literal);
            parts.push(format!("DEFAULT {literal}"));
        }
        if let FieldKind::ForeignKey {
            reference,
            on_delete,
        } = &self.kind
        {
            let target = registry.resolve_reference(reference)?;
            parts.push(format!(
                "REFERENCES \"{}\"(\"{}\")",
                target.table_name(),
                target.primary_key_column().name
            ));
            if *on_delete == OnDelete::Cascade {
                parts.push("ON DELETE CASCADE".to_string());
            }
        }

        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::model::ModelDef;

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry
            .register(
                ModelDef::new("User")
                    .field("last_name", Field::text().primary_key())
                    .field("first_name", Field::text().nullable()),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_type_mapping() {
        let registry = Registry::default();
        assert_eq!(Field::integer().sql_type(&registry).unwrap(), "INTEGER");
        assert_eq!(Field::real().sql_type(&registry).unwrap(), "REAL");
        assert_eq!(Field::text().sql_type(&registry).unwrap(), "TEXT");
        assert_eq!(Field::blob().sql_type(&registry).unwrap(), "BLOB");
    }

    #[test]
    fn test_foreign_key_takes_referenced_pk_type() {
        let registry = registry();
        let fk = Field::foreign_key("User");
        assert_eq!(fk.sql_type(&registry).unwrap(), "TEXT");
    }

    #[test]
    fn test_unresolved_reference() {
        let registry = registry();
        let fk = Field::foreign_key("Nobody");
        assert!(matches!(
            fk.sql_type(&registry),
            Err(Error::UnresolvedReference(name)) if name == "Nobody"
        ));
    }

    #[test]
    fn test_primary_key_implies_constraints() {
        let field = Field::integer().nullable().default(3).primary_key();
        assert!(field.is_not_null());
        assert!(field.is_unique());
        assert!(!field.uses_default());

        let field = Field::text().default("x").unique();
        assert!(!field.uses_default());
    }

    #[test]
    fn test_column_sql() {
        let registry = Registry::default();
        let sql = Field::integer()
            .primary_key()
            .autoincrement()
            .to_column_sql("id", &registry)
            .unwrap();
        assert_eq!(sql, "INTEGER PRIMARY KEY AUTOINCREMENT");

        let sql = Field::text().to_column_sql("body", &registry).unwrap();
        assert_eq!(sql, "TEXT NOT NULL");

        let sql = Field::text()
            .default("txt")
            .to_column_sql("body", &registry)
            .unwrap();
        assert_eq!(sql, "TEXT NOT NULL DEFAULT 'txt'");

        let sql = Field::integer()
            .nullable()
            .default(Value::Null)
            .to_column_sql("n", &registry)
            .unwrap();
        assert_eq!(sql, "INTEGER DEFAULT NULL");

        // autoincrement only renders on primary keys
        let sql = Field::integer()
            .autoincrement()
            .to_column_sql("n", &registry)
            .unwrap();
        assert_eq!(sql, "INTEGER NOT NULL");
    }

    #[test]
    fn test_default_without_use_default_is_not_rendered() {
        let registry = Registry::default();
        let sql = Field::integer()
            .default(1)
            .use_default(false)
            .to_column_sql("n", &registry)
            .unwrap();
        assert!(!sql.contains("DEFAULT"));
    }

    #[test]
    fn test_null_default_on_not_null_is_configuration_error() {
        let registry = Registry::default();
        let field = Field::text().default(Value::Null);
        assert!(matches!(
            field.to_column_sql("body", &registry),
            Err(Error::Configuration { column }) if column == "body"
        ));
    }

    #[test]
    fn test_foreign_key_column_sql() {
        let registry = registry();
        let sql = Field::foreign_key("User")
            .nullable()
            .on_delete(OnDelete::Cascade)
            .to_column_sql("owner", &registry)
            .unwrap();
        assert_eq!(
            sql,
            "TEXT REFERENCES \"user\"(\"last_name\") ON DELETE CASCADE"
        );
    }

    #[test]
    fn test_modifiers_ignored_on_other_kinds() {
        let field = Field::text().autoincrement();
        assert!(!field.is_autoincrement());
        let field = Field::integer().datetime();
        assert!(!field.is_datetime());
        assert!(Field::text().datetime().is_datetime());
    }
}
