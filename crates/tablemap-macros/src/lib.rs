//! Procedural macros for tablemap.
//!
//! `#[derive(Record)]` implements `tablemap_core::Record` for a struct with named fields.
//! The generated code names `::tablemap_core`, so the deriving crate depends on it.
//!
//! ```ignore
//! #[derive(Debug, Default, Record)]
//! #[db(hooks)]
//! struct Invoice {
//!     #[db("id, primarykey, autoincrement")]
//!     id: i64,
//!     #[db("memo, size:200")]
//!     memo: String,
//!     #[db("-")]
//!     scratch: Vec<String>,
//!     #[db(embed)]
//!     audit: Audit,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record_derive;

/// Derive `Record` from field declarations and `#[db(...)]` attributes.
///
/// Field attributes:
/// - `#[db("column, directive, ...")]`: column name and directives (`primarykey`,
///   `autoincrement`, `size:<n>`, `version`, `nullable`, `notnull`, `unique`); `"-"` marks
///   the field transient
/// - `#[db(embed)]`: flatten a nested `Record` into this one
///
/// Struct attribute `#[db(hooks)]` enables lifecycle hooks; the type must implement
/// `tablemap_core::Hooks`.
#[proc_macro_derive(Record, attributes(db))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_derive::parse_record(&input) {
        Ok(def) => record_derive::generate_record_impl(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
