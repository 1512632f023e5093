//! `DbMap`, transactions and the CRUD executor for tablemap.
//!
//! [`DbMap`] owns a [`Registry`](tablemap_core::Registry), a boxed
//! [`Dialect`](tablemap_query::Dialect) and a driver [`Connection`](tablemap_core::Connection).
//! It implements [`SqlExecutor`](tablemap_core::SqlExecutor) by building statements per
//! table (cached after first use), binding record fields, and running lifecycle hooks
//! around each record. [`DbMap::begin`] opens a [`Transaction`] exposing the same
//! contract. [`SelectExt`] adds typed selects to both.
//!
//! Operations run synchronously on the caller's thread. A multi-record call is not
//! atomic on its own; wrap it in a transaction when it has to be.

mod config;
mod dbmap;
mod engine;
mod plan;
mod select;
mod transaction;

#[cfg(test)]
mod mock;

pub use config::DbMapConfig;
pub use dbmap::DbMap;
pub use select::SelectExt;
pub use transaction::Transaction;
