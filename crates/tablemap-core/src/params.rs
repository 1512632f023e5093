//! Parameters for ad hoc statements.

use crate::record::Record;
use crate::registry::Registry;
use crate::value::{ToValue, Value};

/// Arguments to an ad hoc statement.
///
/// Positional values bind to the dialect's placeholders in order. Named values and
/// records resolve `:name` markers in the SQL text.
#[derive(Default)]
pub enum Params<'a> {
    #[default]
    None,
    Positional(Vec<Value>),
    /// `(name, value)` pairs; names are matched exactly.
    Named(Vec<(String, Value)>),
    /// A record whose fields resolve markers by field name or column name.
    Record(&'a dyn Record),
}

impl<'a> Params<'a> {
    /// Named parameters from `(name, value)` pairs.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: ToValue,
        I: IntoIterator<Item = (K, V)>,
    {
        Params::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_value()))
                .collect(),
        )
    }

    /// Resolve markers against a record's fields.
    pub fn record(record: &'a dyn Record) -> Self {
        Params::Record(record)
    }

    /// Whether markers in the SQL text are names rather than positions.
    pub fn is_named(&self) -> bool {
        matches!(self, Params::Named(_) | Params::Record(_))
    }

    /// Positional values, empty for named styles.
    pub fn positional(&self) -> &[Value] {
        match self {
            Params::Positional(values) => values,
            _ => &[],
        }
    }

    /// Value for a named marker.
    pub fn lookup(&self, name: &str, registry: &Registry) -> Option<Value> {
        match self {
            Params::Named(pairs) => pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            Params::Record(record) => {
                let shape = registry.shape(record.record_type()).ok()?;
                let column = shape
                    .columns()
                    .iter()
                    .filter(|c| c.is_mapped())
                    .find(|c| c.matches_field(name) || c.column_name.eq_ignore_ascii_case(name))?;
                record.field_value(&column.field_path)
            }
            Params::None | Params::Positional(_) => None,
        }
    }
}

impl std::fmt::Debug for Params<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Params::None => f.write_str("None"),
            Params::Positional(values) => f.debug_tuple("Positional").field(values).finish(),
            Params::Named(pairs) => f.debug_tuple("Named").field(pairs).finish(),
            Params::Record(record) => f
                .debug_tuple("Record")
                .field(&record.record_type().name())
                .finish(),
        }
    }
}

impl From<Vec<Value>> for Params<'_> {
    fn from(values: Vec<Value>) -> Self {
        if values.is_empty() {
            Params::None
        } else {
            Params::Positional(values)
        }
    }
}

/// Build [`Params`] from Rust values.
///
/// ```ignore
/// let none = params![];
/// let by_position = params![42, "memo"];
/// let by_name = params!["id" => 42, "memo" => "text"];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::None
    };
    ($($name:literal => $value:expr),+ $(,)?) => {
        $crate::Params::Named(::std::vec![
            $((::std::string::String::from($name), $crate::ToValue::to_value(&$value))),+
        ])
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Params::Positional(::std::vec![$($crate::ToValue::to_value(&$value)),+])
    };
}
