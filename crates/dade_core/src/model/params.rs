//! Owned SQL parameter object.
//!
//! # Responsibility
//! - Carry statement parameters across threads for async calls.
//! - Bind positional or named values onto a prepared statement.
//!
//! # Invariants
//! - Every value is owned, so `SqlParams` is `Send + 'static`.
//! - Named parameters always bind by name; positional ones by 1-based index.

use rusqlite::types::Value;
use rusqlite::Statement;
use std::collections::BTreeSet;

const NAME_PREFIXES: [char; 3] = [':', '@', '$'];

/// Parameters for an ad-hoc statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SqlParams {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl SqlParams {
    pub fn none() -> Self {
        Self::None
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Builds named parameters.
    ///
    /// Names may carry their `:`/`@`/`$` prefix or omit it; an unprefixed
    /// name binds to whichever prefixed form appears in the SQL text.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(values) => values.len(),
            Self::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds all values onto a freshly prepared statement.
    ///
    /// # Errors
    /// - `InvalidParameterCount` when the value count does not match the
    ///   statement's placeholders.
    /// - `InvalidParameterName` when a named value has no placeholder or
    ///   names a placeholder that is already bound.
    pub(crate) fn bind(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<()> {
        let expected = stmt.parameter_count();
        match self {
            Self::None => {
                if expected != 0 {
                    return Err(rusqlite::Error::InvalidParameterCount(0, expected));
                }
            }
            Self::Positional(values) => {
                if values.len() != expected {
                    return Err(rusqlite::Error::InvalidParameterCount(values.len(), expected));
                }
                for (offset, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(offset + 1, value)?;
                }
            }
            Self::Named(pairs) => {
                let mut bound = BTreeSet::new();
                for (name, value) in pairs {
                    let index = resolve_name(stmt, name)?;
                    if !bound.insert(index) {
                        return Err(rusqlite::Error::InvalidParameterName(name.clone()));
                    }
                    stmt.raw_bind_parameter(index, value)?;
                }
                if bound.len() != expected {
                    return Err(rusqlite::Error::InvalidParameterCount(bound.len(), expected));
                }
            }
        }
        Ok(())
    }
}

impl From<()> for SqlParams {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<Vec<Value>> for SqlParams {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

fn resolve_name(stmt: &Statement<'_>, name: &str) -> rusqlite::Result<usize> {
    if name.starts_with(NAME_PREFIXES) {
        return stmt
            .parameter_index(name)?
            .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.to_string()));
    }

    for prefix in NAME_PREFIXES {
        if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            return Ok(index);
        }
    }
    Err(rusqlite::Error::InvalidParameterName(name.to_string()))
}
