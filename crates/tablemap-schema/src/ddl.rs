//! DDL statements for registered tables.

use tablemap_core::{ColumnMap, TableMap};
use tablemap_query::Dialect;

/// Statements creating `table`, preceded by `CREATE SCHEMA` when the table is
/// schema-qualified and the dialect has schemas.
pub fn create_table(table: &TableMap, dialect: &dyn Dialect, if_not_exists: bool) -> Vec<String> {
    tracing::debug!(dialect = dialect.name(), table = %table.qualified_name(), "Generating DDL");

    let guard = if if_not_exists { " IF NOT EXISTS" } else { "" };
    let mut statements = Vec::new();

    if let Some(schema) = table.schema() {
        if dialect.supports_schemas() {
            statements.push(format!(
                "CREATE SCHEMA{guard} {}",
                dialect.quote_identifier(schema)
            ));
        }
    }

    let single_key = table.key_count() == 1;
    let mut parts: Vec<String> = table
        .mapped_columns()
        .map(|(_, column)| column_definition(column, dialect, single_key))
        .collect();

    if table.key_count() > 1 {
        let keys: Vec<String> = table
            .key_columns()
            .map(|(_, c)| dialect.quote_identifier(&c.column_name))
            .collect();
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    statements.push(format!(
        "CREATE TABLE{guard} {} ({}){}",
        dialect.quote_table(table.schema(), table.name()),
        parts.join(", "),
        dialect.create_table_suffix()
    ));
    statements
}

fn column_definition(column: &ColumnMap, dialect: &dyn Dialect, single_key: bool) -> String {
    let mut def = format!(
        "{} {}",
        dialect.quote_identifier(&column.column_name),
        dialect.type_name(column.sql_type, column.max_size, column.auto_increment)
    );
    if !column.nullable || column.primary_key {
        def.push_str(" NOT NULL");
    }
    if column.primary_key && single_key {
        def.push_str(" PRIMARY KEY");
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if column.auto_increment {
        let clause = dialect.auto_increment_clause();
        if !clause.is_empty() {
            def.push(' ');
            def.push_str(clause);
        }
    }
    def
}

pub fn drop_table(table: &TableMap, dialect: &dyn Dialect, if_exists: bool) -> String {
    let guard = if if_exists { " IF EXISTS" } else { "" };
    format!(
        "DROP TABLE{guard} {}",
        dialect.quote_table(table.schema(), table.name())
    )
}

pub fn truncate_table(table: &TableMap, dialect: &dyn Dialect) -> String {
    dialect.truncate_statement(&dialect.quote_table(table.schema(), table.name()))
}

/// One `CREATE [UNIQUE] INDEX` per named index of the table.
pub fn create_indexes(table: &TableMap, dialect: &dyn Dialect) -> Vec<String> {
    let quoted_table = dialect.quote_table(table.schema(), table.name());
    table
        .indexes()
        .iter()
        .map(|index| {
            let columns: Vec<String> = index
                .columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect();
            format!(
                "CREATE {}INDEX {} ON {} ({}){}",
                if index.unique { "UNIQUE " } else { "" },
                dialect.quote_identifier(&index.name),
                quoted_table,
                columns.join(", "),
                dialect.create_index_suffix()
            )
        })
        .collect()
}
