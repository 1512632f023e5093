//! Field tag parsing.
//!
//! A tag is a comma-separated list. The first token is the column name (empty keeps the
//! field name, `-` marks the field transient); the rest are directives.

use crate::error::{RegistrationError, RegistrationErrorKind};

/// Parsed form of one field tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTag {
    /// Explicit column name.
    pub column: Option<String>,
    pub transient: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub version: bool,
    /// `Some(true)` for `nullable`, `Some(false)` for `notnull`.
    pub nullable: Option<bool>,
    pub unique: bool,
    /// From `size:<n>`.
    pub max_size: Option<u32>,
}

impl FieldTag {
    /// Parse a tag string.
    pub fn parse(tag: &str) -> Result<Self, RegistrationError> {
        let mut parsed = FieldTag::default();
        let mut tokens = tag.split(',').map(str::trim);

        match tokens.next() {
            Some("-") => parsed.transient = true,
            Some("") | None => {}
            Some(name) => parsed.column = Some(name.to_string()),
        }

        for token in tokens {
            if token.is_empty() {
                continue;
            }
            let lower = token.to_ascii_lowercase();
            if let Some(size) = lower.strip_prefix("size:") {
                let size = size.trim().parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                    RegistrationError::new(
                        RegistrationErrorKind::InvalidTag,
                        format!("invalid size in tag {tag:?}"),
                    )
                })?;
                parsed.max_size = Some(size);
                continue;
            }
            match lower.as_str() {
                "primarykey" => parsed.primary_key = true,
                "autoincrement" => {
                    parsed.auto_increment = true;
                    parsed.primary_key = true;
                }
                "version" => parsed.version = true,
                "nullable" => parsed.nullable = Some(true),
                "notnull" => parsed.nullable = Some(false),
                "unique" => parsed.unique = true,
                _ => {
                    return Err(RegistrationError::new(
                        RegistrationErrorKind::InvalidTag,
                        format!("unknown directive {token:?} in tag {tag:?}"),
                    ));
                }
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tag() {
        assert_eq!(FieldTag::parse("").unwrap(), FieldTag::default());
    }

    #[test]
    fn test_transient() {
        let tag = FieldTag::parse("-").unwrap();
        assert!(tag.transient);
        assert!(tag.column.is_none());
    }

    #[test]
    fn test_full_tag_tolerates_whitespace() {
        let tag = FieldTag::parse(" Id ,  primarykey,autoincrement , size: 20").unwrap();
        assert_eq!(tag.column.as_deref(), Some("Id"));
        assert!(tag.primary_key);
        assert!(tag.auto_increment);
        assert_eq!(tag.max_size, Some(20));
    }

    #[test]
    fn test_directives_without_column_name() {
        let tag = FieldTag::parse(", version, notnull, unique").unwrap();
        assert!(tag.column.is_none());
        assert!(tag.version);
        assert!(tag.unique);
        assert_eq!(tag.nullable, Some(false));
    }

    #[test]
    fn test_autoincrement_implies_key() {
        assert!(FieldTag::parse("id, autoincrement").unwrap().primary_key);
    }

    #[test]
    fn test_bad_directives() {
        let err = FieldTag::parse("id, primary").unwrap_err();
        assert_eq!(err.kind, RegistrationErrorKind::InvalidTag);
        assert!(FieldTag::parse("memo, size:abc").is_err());
        assert!(FieldTag::parse("memo, size:0").is_err());
    }
}
