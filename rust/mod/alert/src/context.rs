//! Typed alert context and message templating.
//!
//! The context travels with every job and fills `{{key}}` placeholders in
//! rule subjects and bodies. Values are scalars only; nested objects and
//! arrays are refused when the payload is decoded.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("invalid context key '{0}'")]
    InvalidKey(String),

    #[error("template references unknown key '{0}'")]
    MissingKey(String),

    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

/// A single context value, serialized as a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Null => Ok(()),
            ContextValue::Bool(b) => write!(f, "{b}"),
            ContextValue::Integer(i) => write!(f, "{i}"),
            ContextValue::Number(n) => write!(f, "{n}"),
            ContextValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Text(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Text(s)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Integer(i)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        ContextValue::Number(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

/// Key/value context attached to an alert job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertContext(BTreeMap<String, ContextValue>);

impl AlertContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys must be non-empty ASCII alphanumerics, `_`, `-` or `.`.
    pub fn validate(&self) -> Result<(), ContextError> {
        match self.0.keys().find(|k| !is_valid_key(k)) {
            Some(bad) => Err(ContextError::InvalidKey(bad.clone())),
            None => Ok(()),
        }
    }

    /// Replace every `{{key}}` in `template` with the context value.
    ///
    /// Whitespace inside the braces is ignored. Unknown keys are an error.
    pub fn render(&self, template: &str) -> Result<String, ContextError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(ContextError::Unterminated(offset + start))?;
            let key = after[..end].trim();
            let value = self
                .0
                .get(key)
                .ok_or_else(|| ContextError::MissingKey(key.to_string()))?;
            out.push_str(&value.to_string());

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
