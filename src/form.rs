//! Form snapshots and their `application/x-www-form-urlencoded` encoding.

use std::str::FromStr;

use crate::error::{ClientError, Result};

/// Ordered field list captured from a form at submission time.
///
/// Names may repeat and values may be empty; nothing is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    fields: Vec<(String, String)>,
}

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a field, keeping any earlier field with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// URL-encode the fields in snapshot order.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_urlencoded::to_string(&self.fields)?)
    }

    /// Parse a single `NAME=VALUE` argument. The value may be empty and may
    /// itself contain `=`.
    pub fn parse_field(arg: &str) -> Result<(String, String)> {
        match arg.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
            _ => Err(ClientError::InvalidField {
                message: format!("expected NAME=VALUE, got '{}'", arg),
            }),
        }
    }
}

impl FromStr for FormSnapshot {
    type Err = ClientError;

    /// Decode an already URL-encoded body such as `idade=71&sexo=F`.
    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<(String, String)> =
            serde_urlencoded::from_str(s).map_err(|e| ClientError::InvalidField {
                message: format!("invalid encoded form: {}", e),
            })?;
        Ok(Self { fields })
    }
}

/// Anything that can hand over its current field values, e.g. a form widget.
pub trait FormSource: Send + Sync {
    fn snapshot(&self) -> FormSnapshot;
}

impl FormSource for FormSnapshot {
    fn snapshot(&self) -> FormSnapshot {
        self.clone()
    }
}
