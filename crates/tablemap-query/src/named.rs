//! Named parameter expansion for ad hoc statements.
//!
//! `:name` markers are rewritten into the dialect's placeholders and the values collected
//! in placeholder order. Markers inside quoted strings or identifiers and `::` casts are
//! left alone.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tablemap_core::{BindError, BindErrorKind, Params, Registry, Result, Value};

use crate::dialect::{Dialect, PlaceholderStyle};

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"::|'(?:[^']|'')*'|"(?:[^"]|"")*"|:([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("valid marker regex")
});

/// SQL ready for the driver, with values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Expanded {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Expand `params` for `sql`.
///
/// Positional parameters pass through unchanged. Named parameters and records have each
/// marker replaced; with numbered placeholders a repeated name reuses its number, with
/// positional placeholders its value is bound again.
pub fn expand(
    sql: &str,
    params: &Params<'_>,
    dialect: &dyn Dialect,
    registry: &Registry,
) -> Result<Expanded> {
    if !params.is_named() {
        return Ok(Expanded {
            sql: sql.to_string(),
            values: params.positional().to_vec(),
        });
    }

    let numbered = dialect.placeholder_style() == PlaceholderStyle::Numbered;
    let mut values: Vec<Value> = Vec::new();
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    let mut failure = None;

    let rewritten = MARKER.replace_all(sql, |caps: &Captures<'_>| {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            return caps[0].to_string();
        };
        if numbered {
            if let Some(&ordinal) = ordinals.get(name) {
                return dialect.placeholder(ordinal);
            }
        }
        match params.lookup(name, registry) {
            Some(value) => {
                values.push(value);
                ordinals.insert(name.to_string(), values.len());
                dialect.placeholder(values.len())
            }
            None => {
                failure.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });

    if let Some(name) = failure {
        return Err(BindError::new(
            BindErrorKind::MissingParameter,
            "no value for named parameter",
        )
        .column(name)
        .into());
    }

    tracing::trace!(markers = ordinals.len(), values = values.len(), "expanded named parameters");
    Ok(Expanded {
        sql: rewritten.into_owned(),
        values,
    })
}
