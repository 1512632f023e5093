//! Table and column metadata.
//!
//! A [`TableMap`] is built once per registration and can be adjusted through its builder
//! methods until the first CRUD, DDL or binding operation uses it. After that it is frozen
//! and every mutator fails with [`RegistrationErrorKind::Frozen`].

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{RegistrationError, RegistrationErrorKind};
use crate::record::RecordType;
use crate::types::SqlType;

type Result<T> = std::result::Result<T, RegistrationError>;

/// Metadata for one mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    /// Rust field name (the leaf name for embedded fields).
    pub field_name: &'static str,
    /// Accessor path from the top-level record to this field.
    pub field_path: Vec<&'static str>,
    pub column_name: String,
    pub sql_type: SqlType,
    /// Size hint for text columns.
    pub max_size: Option<u32>,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// Excluded from all SQL and binding.
    pub transient: bool,
    pub nullable: bool,
    pub unique: bool,
    /// Optimistic-lock version column.
    pub version: bool,
}

impl ColumnMap {
    /// Create a plain column for a top-level field.
    pub fn new(field_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            field_name,
            field_path: vec![field_name],
            column_name: field_name.to_string(),
            sql_type,
            max_size: None,
            primary_key: false,
            auto_increment: false,
            transient: false,
            nullable: false,
            unique: false,
            version: false,
        }
    }

    /// Whether this column takes part in SQL generation.
    pub fn is_mapped(&self) -> bool {
        !self.transient
    }

    /// Dotted field path, e.g. `audit.created_by`.
    pub fn path_string(&self) -> String {
        self.field_path.join(".")
    }

    /// Whether `name` refers to this column's field, by leaf name or dotted path.
    pub fn matches_field(&self, name: &str) -> bool {
        self.field_name == name || self.path_string() == name
    }
}

/// A named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    pub name: String,
    pub unique: bool,
    /// Column names in index order.
    pub columns: Vec<String>,
}

/// Metadata for one registered table.
#[derive(Debug)]
pub struct TableMap {
    name: String,
    schema: Option<String>,
    record_type: RecordType,
    columns: Vec<ColumnMap>,
    indexes: Vec<IndexMap>,
    frozen: AtomicBool,
}

impl TableMap {
    /// Build and validate a table map. Used by the registry.
    pub(crate) fn new(
        name: String,
        schema: Option<String>,
        record_type: RecordType,
        columns: Vec<ColumnMap>,
    ) -> Result<Self> {
        let table = Self {
            name,
            schema,
            record_type,
            columns,
            indexes: Vec::new(),
            frozen: AtomicBool::new(false),
        };
        validate_columns(&table.columns).map_err(|e| e.table(table.qualified_name()))?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `schema.name`, or just `name` without a schema.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// All columns in declaration order, transient ones included.
    pub fn columns(&self) -> &[ColumnMap] {
        &self.columns
    }

    /// Non-transient columns in declaration order.
    pub fn mapped_columns(&self) -> impl Iterator<Item = (usize, &ColumnMap)> {
        self.columns.iter().enumerate().filter(|(_, c)| c.is_mapped())
    }

    /// Primary-key columns in declaration order.
    pub fn key_columns(&self) -> impl Iterator<Item = (usize, &ColumnMap)> {
        self.mapped_columns().filter(|(_, c)| c.primary_key)
    }

    pub fn key_count(&self) -> usize {
        self.key_columns().count()
    }

    pub fn version_column(&self) -> Option<(usize, &ColumnMap)> {
        self.mapped_columns().find(|(_, c)| c.version)
    }

    pub fn auto_increment_column(&self) -> Option<(usize, &ColumnMap)> {
        self.mapped_columns().find(|(_, c)| c.auto_increment)
    }

    /// Mapped column with this name, compared case-insensitively.
    pub fn column_named(&self, column: &str) -> Option<(usize, &ColumnMap)> {
        self.mapped_columns()
            .find(|(_, c)| c.column_name.eq_ignore_ascii_case(column))
    }

    pub fn indexes(&self) -> &[IndexMap] {
        &self.indexes
    }

    /// Whether any operation has used this table yet.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Mark the table as used. Further mutation fails.
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            tracing::trace!(table = %self.qualified_name(), "table metadata frozen");
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Replace the primary key with the named fields.
    ///
    /// With `auto_increment`, exactly one integer field must be named.
    pub fn set_keys(&mut self, auto_increment: bool, fields: &[&str]) -> Result<&mut Self> {
        self.check_mutable()?;
        if auto_increment && fields.len() != 1 {
            return Err(self.error(
                RegistrationErrorKind::InvalidAutoIncrement,
                format!("auto-increment key needs exactly one column, got {}", fields.len()),
            ));
        }
        let mut columns = self.columns.clone();
        for column in &mut columns {
            column.primary_key = false;
            column.auto_increment = false;
        }
        for field in fields {
            let idx = self.field_index(field)?;
            columns[idx].primary_key = true;
            columns[idx].auto_increment = auto_increment;
        }
        self.commit(columns)
    }

    /// Make the named field the optimistic-lock version column.
    pub fn set_version_col(&mut self, field: &str) -> Result<&mut Self> {
        self.check_mutable()?;
        let idx = self.field_index(field)?;
        let mut columns = self.columns.clone();
        for column in &mut columns {
            column.version = false;
        }
        columns[idx].version = true;
        self.commit(columns)
    }

    /// Override the column name of a field.
    pub fn rename_column(&mut self, field: &str, column: &str) -> Result<&mut Self> {
        self.tweak(field, |c| c.column_name = column.to_string())
    }

    pub fn set_transient(&mut self, field: &str, transient: bool) -> Result<&mut Self> {
        self.tweak(field, |c| c.transient = transient)
    }

    pub fn set_max_size(&mut self, field: &str, size: u32) -> Result<&mut Self> {
        self.tweak(field, |c| c.max_size = Some(size))
    }

    pub fn set_unique(&mut self, field: &str, unique: bool) -> Result<&mut Self> {
        self.tweak(field, |c| c.unique = unique)
    }

    pub fn set_nullable(&mut self, field: &str, nullable: bool) -> Result<&mut Self> {
        self.tweak(field, |c| c.nullable = nullable)
    }

    /// Add a named index. Columns may be given by column or field name.
    pub fn add_index(&mut self, name: &str, unique: bool, columns: &[&str]) -> Result<&mut Self> {
        self.check_mutable()?;
        if name.is_empty() || columns.is_empty() {
            return Err(self.error(
                RegistrationErrorKind::InvalidTag,
                "an index needs a name and at least one column",
            ));
        }
        if self.indexes.iter().any(|i| i.name.eq_ignore_ascii_case(name)) {
            return Err(self.error(
                RegistrationErrorKind::DuplicateIndex,
                format!("index {name} already exists"),
            ));
        }
        let resolved = columns
            .iter()
            .map(|col| {
                self.column_named(col)
                    .map(|(_, c)| c)
                    .or_else(|| {
                        self.mapped_columns()
                            .map(|(_, c)| c)
                            .find(|c| c.matches_field(col))
                    })
                    .map(|c| c.column_name.clone())
                    .ok_or_else(|| {
                        self.error(
                            RegistrationErrorKind::UnknownField,
                            format!("index {name} names unknown column {col}"),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.indexes.push(IndexMap {
            name: name.to_string(),
            unique,
            columns: resolved,
        });
        Ok(self)
    }

    /// Rename the table. Uniqueness within the registry is checked by the registry.
    pub(crate) fn set_name(&mut self, name: String) -> Result<()> {
        self.check_mutable()?;
        self.name = name;
        Ok(())
    }

    fn tweak(&mut self, field: &str, apply: impl FnOnce(&mut ColumnMap)) -> Result<&mut Self> {
        self.check_mutable()?;
        let idx = self.field_index(field)?;
        let mut columns = self.columns.clone();
        apply(&mut columns[idx]);
        self.commit(columns)
    }

    fn commit(&mut self, columns: Vec<ColumnMap>) -> Result<&mut Self> {
        validate_columns(&columns).map_err(|e| e.table(self.qualified_name()))?;
        self.columns = columns;
        Ok(self)
    }

    fn check_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(self.error(
                RegistrationErrorKind::Frozen,
                "table metadata cannot change after the table has been used",
            ));
        }
        Ok(())
    }

    fn field_index(&self, field: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.matches_field(field))
            .ok_or_else(|| {
                self.error(
                    RegistrationErrorKind::UnknownField,
                    format!("no field named {field}"),
                )
            })
    }

    fn error(&self, kind: RegistrationErrorKind, message: impl Into<String>) -> RegistrationError {
        RegistrationError::new(kind, message).table(self.qualified_name())
    }
}

/// Check the per-table column invariants.
pub(crate) fn validate_columns(columns: &[ColumnMap]) -> Result<()> {
    let mapped: Vec<&ColumnMap> = columns.iter().filter(|c| c.is_mapped()).collect();

    for (i, column) in mapped.iter().enumerate() {
        if mapped[..i]
            .iter()
            .any(|other| other.column_name.eq_ignore_ascii_case(&column.column_name))
        {
            return Err(RegistrationError::new(
                RegistrationErrorKind::DuplicateColumn,
                format!("column {} is mapped more than once", column.column_name),
            ));
        }
    }

    let versions: Vec<&&ColumnMap> = mapped.iter().filter(|c| c.version).collect();
    if versions.len() > 1 {
        return Err(RegistrationError::new(
            RegistrationErrorKind::MultipleVersionColumns,
            format!("{} version columns, at most one allowed", versions.len()),
        ));
    }
    if let Some(version) = versions.first() {
        if !version.sql_type.is_integer() {
            return Err(RegistrationError::new(
                RegistrationErrorKind::InvalidVersionColumn,
                format!("version column {} must be an integer", version.column_name),
            ));
        }
    }

    let autos: Vec<&&ColumnMap> = mapped.iter().filter(|c| c.auto_increment).collect();
    if autos.len() > 1 {
        return Err(RegistrationError::new(
            RegistrationErrorKind::InvalidAutoIncrement,
            "more than one auto-increment column",
        ));
    }
    if let Some(auto) = autos.first() {
        if !auto.sql_type.is_integer() {
            return Err(RegistrationError::new(
                RegistrationErrorKind::InvalidAutoIncrement,
                format!("auto-increment column {} must be an integer", auto.column_name),
            ));
        }
        if mapped.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(RegistrationError::new(
                RegistrationErrorKind::InvalidAutoIncrement,
                "an auto-increment key cannot be part of a composite key",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_records::Invoice;

    fn invoice_table() -> TableMap {
        let mut id = ColumnMap::new("id", SqlType::BigInt);
        id.primary_key = true;
        id.auto_increment = true;
        let memo = ColumnMap::new("memo", SqlType::Text);
        let mut version = ColumnMap::new("version", SqlType::BigInt);
        version.field_path = vec!["audit", "version"];
        version.version = true;
        TableMap::new(
            "invoice".to_string(),
            None,
            RecordType::of::<Invoice>(),
            vec![id, memo, version],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let table = invoice_table();
        assert_eq!(table.key_count(), 1);
        assert_eq!(table.version_column().unwrap().0, 2);
        assert_eq!(table.auto_increment_column().unwrap().1.column_name, "id");
        assert_eq!(table.column_named("MEMO").unwrap().0, 1);
    }

    #[test]
    fn test_field_lookup_by_leaf_or_path() {
        let mut table = invoice_table();
        table.set_version_col("audit.version").unwrap();
        table.set_version_col("version").unwrap();
        let err = table.set_version_col("missing").unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::UnknownField);
    }

    #[test]
    fn test_set_keys_validates() {
        let mut table = invoice_table();
        let err = table.set_keys(true, &["id", "memo"]).unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::InvalidAutoIncrement);
        let err = table.set_keys(true, &["memo"]).unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::InvalidAutoIncrement);
        // A failed mutation leaves the table unchanged.
        assert!(table.columns()[0].auto_increment);

        table.set_keys(false, &["id", "memo"]).unwrap();
        assert_eq!(table.key_count(), 2);
        assert!(table.auto_increment_column().is_none());
    }

    #[test]
    fn test_version_must_be_integer() {
        let mut table = invoice_table();
        let err = table.set_version_col("memo").unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::InvalidVersionColumn);
    }

    #[test]
    fn test_rename_column_detects_duplicates() {
        let mut table = invoice_table();
        let err = table.rename_column("memo", "ID").unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::DuplicateColumn);
        table.rename_column("memo", "note").unwrap();
        assert!(table.column_named("note").is_some());
    }

    #[test]
    fn test_transient_columns_are_skipped() {
        let mut table = invoice_table();
        table.set_transient("memo", true).unwrap();
        assert_eq!(table.mapped_columns().count(), 2);
        assert!(table.column_named("memo").is_none());
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn test_add_index() {
        let mut table = invoice_table();
        table.add_index("idx_memo", true, &["memo"]).unwrap();
        let err = table.add_index("IDX_MEMO", false, &["id"]).unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::DuplicateIndex);
        let err = table.add_index("idx_other", false, &["nope"]).unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::UnknownField);
        assert_eq!(table.indexes()[0].columns, vec!["memo".to_string()]);
    }

    #[test]
    fn test_frozen_table_rejects_mutation() {
        let mut table = invoice_table();
        table.freeze();
        assert!(table.is_frozen());
        let err = table.set_keys(false, &["memo"]).unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::Frozen);
        assert_eq!(err.table.as_deref(), Some("invoice"));
        assert!(table.set_max_size("memo", 10).is_err());
        assert!(table.add_index("idx", false, &["memo"]).is_err());
    }
}
