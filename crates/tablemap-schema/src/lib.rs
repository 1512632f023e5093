//! Schema DDL for tablemap.
//!
//! Renders CREATE/DROP/TRUNCATE TABLE and CREATE INDEX statements from registered table
//! metadata. There is no diffing or migration support; tables are created from scratch.

pub mod ddl;

pub use ddl::{create_indexes, create_table, drop_table, truncate_table};
