//! The type registry.
//!
//! A [`Registry`] is an explicit value holding every registered [`TableMap`]. There is no
//! global state: independent registries coexist, and dropping one forgets its tables.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, RegistrationError, RegistrationErrorKind, Result};
use crate::record::{FieldDef, Record, RecordType};
use crate::table::{ColumnMap, TableMap, validate_columns};
use crate::tag::FieldTag;

/// Column layout used to bind rows onto a record type.
#[derive(Debug, Clone)]
pub enum Shape<'a> {
    /// The type is registered; its first table map is used.
    Table(&'a TableMap),
    /// Unregistered type, shape derived from its field descriptors and cached.
    AdHoc(Arc<[ColumnMap]>),
}

impl Shape<'_> {
    /// All columns, transient ones included.
    pub fn columns(&self) -> &[ColumnMap] {
        match self {
            Shape::Table(table) => table.columns(),
            Shape::AdHoc(columns) => columns,
        }
    }

    pub fn table(&self) -> Option<&TableMap> {
        match self {
            Shape::Table(table) => Some(table),
            Shape::AdHoc(_) => None,
        }
    }
}

/// Registered tables plus the ad hoc shape cache.
#[derive(Debug, Default)]
pub struct Registry {
    tables: Vec<TableMap>,
    shapes: RwLock<HashMap<TypeId, Arc<[ColumnMap]>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` as table `name`.
    ///
    /// The returned table map can be adjusted (keys, version column, indexes, column
    /// tweaks) until it is first used.
    pub fn register<T: Record>(&mut self, name: &str) -> Result<&mut TableMap> {
        self.register_type(RecordType::of::<T>(), None, name)
    }

    /// Register `T` as table `schema.name`.
    pub fn register_with_schema<T: Record>(
        &mut self,
        schema: &str,
        name: &str,
    ) -> Result<&mut TableMap> {
        self.register_type(RecordType::of::<T>(), Some(schema), name)
    }

    /// Register a record type known only by its runtime descriptor.
    #[tracing::instrument(level = "debug", skip(self), fields(record = record_type.name()))]
    pub fn register_type(
        &mut self,
        record_type: RecordType,
        schema: Option<&str>,
        name: &str,
    ) -> Result<&mut TableMap> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistrationError::new(
                RegistrationErrorKind::MissingTableName,
                format!("no table name given for {}", record_type.name()),
            )
            .into());
        }
        let schema = schema.map(str::trim).filter(|s| !s.is_empty());
        self.check_name_free(schema, name)?;

        let columns = build_columns(record_type.fields(), &[])
            .map_err(|e| e.table(qualify(schema, name)))?;
        let table = TableMap::new(
            name.to_string(),
            schema.map(str::to_string),
            record_type,
            columns,
        )?;

        tracing::info!(
            table = %table.qualified_name(),
            columns = table.columns().len(),
            "registered table"
        );
        self.tables.push(table);
        let idx = self.tables.len() - 1;
        Ok(&mut self.tables[idx])
    }

    /// Rename a registered table. Fails once the table has been used.
    pub fn rename_table(&mut self, name: &str, new_name: &str) -> Result<&mut TableMap> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(RegistrationError::new(
                RegistrationErrorKind::MissingTableName,
                "new table name is empty",
            )
            .table(name)
            .into());
        }
        let idx = self.index_named(name)?;
        let schema = self.tables[idx].schema().map(str::to_string);
        if !self.tables[idx].name().eq_ignore_ascii_case(new_name) {
            self.check_name_free(schema.as_deref(), new_name)?;
        }
        self.tables[idx].set_name(new_name.to_string())?;
        Ok(&mut self.tables[idx])
    }

    /// All registered tables in registration order.
    pub fn tables(&self) -> &[TableMap] {
        &self.tables
    }

    /// Table for a record type, marking it used.
    ///
    /// A type registered under several names resolves to its first registration.
    pub fn table_for(&self, record_type: RecordType) -> Result<&TableMap> {
        let table = self
            .tables
            .iter()
            .find(|t| t.record_type() == record_type)
            .ok_or_else(|| not_registered(record_type.name()))?;
        table.freeze();
        Ok(table)
    }

    /// Table for `T`, for setup. Does not freeze.
    pub fn table_mut<T: Record>(&mut self) -> Option<&mut TableMap> {
        let record_type = RecordType::of::<T>();
        self.tables
            .iter_mut()
            .find(|t| t.record_type() == record_type)
    }

    /// Table by name (qualified or bare), compared case-insensitively. Does not freeze.
    ///
    /// `None` when no table matches or a bare name is shared across schemas.
    pub fn table_named(&self, name: &str) -> Option<&TableMap> {
        self.index_named(name).ok().map(|i| &self.tables[i])
    }

    /// Mutable table by name, for setup.
    pub fn table_named_mut(&mut self, name: &str) -> Option<&mut TableMap> {
        self.index_named(name).ok().map(|i| &mut self.tables[i])
    }

    /// Binding shape for a record type: its table when registered, otherwise a cached
    /// shape derived from the type's field descriptors.
    pub fn shape(&self, record_type: RecordType) -> Result<Shape<'_>> {
        if let Ok(table) = self.table_for(record_type) {
            return Ok(Shape::Table(table));
        }

        if let Some(columns) = self
            .shapes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&record_type.id())
        {
            return Ok(Shape::AdHoc(Arc::clone(columns)));
        }

        let columns = build_columns(record_type.fields(), &[])
            .and_then(|columns| validate_columns(&columns).map(|()| columns))
            .map_err(|e| e.table(record_type.name()))?;
        let columns: Arc<[ColumnMap]> = columns.into();
        tracing::debug!(record = record_type.name(), "derived ad hoc shape");
        self.shapes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(record_type.id())
            .or_insert_with(|| Arc::clone(&columns));
        Ok(Shape::AdHoc(columns))
    }

    /// An exact qualified match wins. A bare name resolves only when one table has it.
    fn index_named(&self, name: &str) -> Result<usize> {
        if let Some(idx) = self
            .tables
            .iter()
            .position(|t| t.qualified_name().eq_ignore_ascii_case(name))
        {
            return Ok(idx);
        }
        let mut bare = self
            .tables
            .iter()
            .enumerate()
            .filter(|(_, t)| t.name().eq_ignore_ascii_case(name))
            .map(|(idx, _)| idx);
        match (bare.next(), bare.next()) {
            (Some(idx), None) => Ok(idx),
            (None, _) => Err(not_registered(name)),
            (Some(_), Some(_)) => Err(RegistrationError::new(
                RegistrationErrorKind::AmbiguousTable,
                format!("{name} names tables in several schemas"),
            )
            .table(name)
            .into()),
        }
    }

    fn check_name_free(&self, schema: Option<&str>, name: &str) -> Result<()> {
        let qualified = qualify(schema, name);
        if self
            .tables
            .iter()
            .any(|t| t.qualified_name().eq_ignore_ascii_case(&qualified))
        {
            return Err(RegistrationError::new(
                RegistrationErrorKind::DuplicateTable,
                format!("table {qualified} is already registered"),
            )
            .table(qualified)
            .into());
        }
        Ok(())
    }
}

fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{schema}.{name}"),
        None => name.to_string(),
    }
}

fn not_registered(name: &str) -> Error {
    RegistrationError::new(
        RegistrationErrorKind::NotRegistered,
        format!("{name} is not registered"),
    )
    .into()
}

/// Flatten field descriptors into columns. Embedded groups expand in place, depth first.
pub(crate) fn build_columns(
    fields: Vec<FieldDef>,
    prefix: &[&'static str],
) -> std::result::Result<Vec<ColumnMap>, RegistrationError> {
    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        let mut path = prefix.to_vec();
        path.push(field.name);

        if let Some(nested) = field.embedded {
            columns.extend(build_columns(nested(), &path)?);
            continue;
        }

        let tag = FieldTag::parse(field.tag)?;
        columns.push(ColumnMap {
            field_name: field.name,
            field_path: path,
            column_name: tag.column.unwrap_or_else(|| field.name.to_string()),
            sql_type: field.sql_type,
            max_size: tag.max_size,
            primary_key: tag.primary_key,
            auto_increment: tag.auto_increment,
            transient: tag.transient,
            nullable: tag.nullable.unwrap_or(field.nullable),
            unique: tag.unique,
            version: tag.version,
        });
    }
    Ok(columns)
}
