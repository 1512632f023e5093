//! The record capability: field descriptors, typed accessors and lifecycle hooks.
//!
//! Rust has no runtime reflection, so each record type describes itself once through
//! [`Record::fields`] (normally generated by `#[derive(Record)]`). The registry turns
//! those descriptors into column metadata and the executor reads and writes fields
//! through the by-path accessors.

use std::any::TypeId;
use std::fmt;

use crate::error::{BindError, BindErrorKind, Result};
use crate::executor::SqlExecutor;
use crate::types::{FieldType, SqlType};
use crate::value::Value;

/// Descriptor for one declared field of a record type.
#[derive(Clone, Copy)]
pub struct FieldDef {
    /// Rust field name
    pub name: &'static str,
    /// Raw metadata tag, e.g. `"id, primarykey, autoincrement"`
    pub tag: &'static str,
    /// Semantic SQL type of the field
    pub sql_type: SqlType,
    /// Whether the Rust type admits NULL
    pub nullable: bool,
    /// For embedded groups, the nested record's descriptors
    pub embedded: Option<fn() -> Vec<FieldDef>>,
}

impl FieldDef {
    /// Descriptor for a scalar field.
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            tag: "",
            sql_type,
            nullable: false,
            embedded: None,
        }
    }

    /// Descriptor for a field of Rust type `T`.
    pub const fn of<T: FieldType>(name: &'static str) -> Self {
        Self::new(name, T::SQL_TYPE).nullable(T::NULLABLE)
    }

    /// Descriptor for an embedded record whose fields are flattened into the parent.
    pub const fn embedded(name: &'static str, fields: fn() -> Vec<FieldDef>) -> Self {
        Self {
            name,
            tag: "",
            sql_type: SqlType::Blob,
            nullable: false,
            embedded: Some(fields),
        }
    }

    /// Set the metadata tag.
    pub const fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("sql_type", &self.sql_type)
            .field("nullable", &self.nullable)
            .field("embedded", &self.embedded.is_some())
            .finish()
    }
}

/// Runtime identity of a record type, usable through `dyn Record`.
#[derive(Clone, Copy)]
pub struct RecordType {
    id: TypeId,
    name: &'static str,
    fields: fn() -> Vec<FieldDef>,
}

impl RecordType {
    /// Identity of `T`.
    pub fn of<T: Record>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            fields: T::fields,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type's field descriptors.
    pub fn fields(&self) -> Vec<FieldDef> {
        (self.fields)()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordType").field(&self.name).finish()
    }
}

/// A value the engine can map to and from table rows.
///
/// Paths address fields by name; embedded records are reached through their field name
/// followed by the nested path (`["audit", "created_by"]`).
pub trait Record: 'static {
    /// Ordered descriptors for the declared fields.
    fn fields() -> Vec<FieldDef>
    where
        Self: Sized;

    /// Runtime identity of the concrete type.
    fn record_type(&self) -> RecordType;

    /// Read a field as a [`Value`]. `None` when the path names no field.
    fn field_value(&self, path: &[&str]) -> Option<Value>;

    /// Write a [`Value`] into a field, converting to the field's type.
    fn set_field_value(&mut self, path: &[&str], value: Value) -> Result<()>;

    /// Lifecycle hooks, when the type implements them.
    fn hooks(&mut self) -> Option<&mut dyn Hooks> {
        None
    }
}

/// Error for an accessor path that names no field of `type_name`.
pub fn unknown_field(type_name: &str, path: &[&str]) -> crate::Error {
    BindError::new(
        BindErrorKind::UnknownField,
        format!("{type_name} has no field {}", path.join(".")),
    )
    .into()
}

/// Optional lifecycle callbacks.
///
/// Every hook receives the executor running the current operation (the top-level map or a
/// transaction), so hooks may issue further statements, e.g. a cascading delete. The engine
/// does not detect cycles between hooks that call each other.
///
/// Returning an error aborts the remaining steps for that record.
pub trait Hooks {
    fn pre_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_insert(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    /// Runs before the version column is incremented.
    fn pre_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    /// Runs after the version column is incremented.
    fn post_update(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn pre_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_delete(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }

    fn post_get(&mut self, _exec: &dyn SqlExecutor) -> Result<()> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_records::*;
    use super::*;

    #[test]
    fn test_record_type_identity() {
        let a = Invoice::default();
        let dyn_a: &dyn Record = &a;
        assert_eq!(dyn_a.record_type(), RecordType::of::<Invoice>());
        assert_ne!(dyn_a.record_type(), RecordType::of::<Audit>());
        assert!(dyn_a.record_type().name().ends_with("Invoice"));
    }

    #[test]
    fn test_nested_accessors() {
        let mut inv = Invoice::default();
        inv.set_field_value(&["audit", "created_by"], Value::Text("ann".into()))
            .unwrap();
        assert_eq!(inv.audit.created_by, "ann");
        assert_eq!(
            inv.field_value(&["audit", "created_by"]),
            Some(Value::Text("ann".into()))
        );
        assert!(inv.field_value(&["audit", "nope"]).is_none());
        assert!(inv.set_field_value(&["nope"], Value::Null).is_err());
    }

    #[test]
    fn test_field_def_of_reads_type_info() {
        let def = FieldDef::of::<Option<String>>("memo").tag("memo, size:10");
        assert_eq!(def.sql_type, SqlType::Text);
        assert!(def.nullable);
        assert_eq!(def.tag, "memo, size:10");
        assert!(def.embedded.is_none());
    }
}
