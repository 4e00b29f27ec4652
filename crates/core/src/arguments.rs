//! Key/value arguments handed to pipeline jobs.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Well-known argument keys.
pub mod keys {
    pub const VAULT_TOKEN: &str = "vault-token";
    pub const VAULT_ADDRESS: &str = "vault-address";
    pub const APP_NAME: &str = "app-name";
    pub const IMAGE_NAME: &str = "image-name";
    pub const REPLICAS: &str = "replicas";
    pub const NAMESPACE: &str = "namespace";
    pub const CONFIG_MAP: &str = "configmap";
}

/// How an argument value is collected from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    /// Free-form text input.
    #[default]
    TextField,
    /// Value sourced from the secret store credentials.
    Vault,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextField => write!(f, "text"),
            Self::Vault => write!(f, "vault"),
        }
    }
}

/// A single named argument.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub kind: ArgumentKind,
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: String,
}

impl Argument {
    /// Create a text argument with a value.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ArgumentKind::TextField,
            key: key.into(),
            description: String::new(),
            value: value.into(),
        }
    }

    /// Create a vault-sourced argument with a value.
    pub fn vault(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ArgumentKind::Vault,
            key: key.into(),
            description: String::new(),
            value: value.into(),
        }
    }

    /// Set the operator-facing description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the value must be kept out of logs.
    pub const fn is_sensitive(&self) -> bool {
        matches!(self.kind, ArgumentKind::Vault)
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.is_sensitive() && !self.value.is_empty() {
            "<redacted>"
        } else {
            self.value.as_str()
        };
        f.debug_struct("Argument")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("value", &value)
            .finish()
    }
}

/// Ordered list of arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Vec<Argument>);

impl Arguments {
    /// Create an empty argument list.
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an argument, replacing the value of an existing key.
    #[must_use]
    pub fn with(mut self, argument: Argument) -> Self {
        self.set(argument);
        self
    }

    /// Insert or replace an argument by key.
    pub fn set(&mut self, argument: Argument) {
        match self.0.iter_mut().find(|a| a.key == argument.key) {
            Some(existing) => existing.value = argument.value,
            None => self.0.push(argument),
        }
    }

    /// Look up the value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Look up a key that must be present with a non-blank value.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` if the key is absent and `InvalidArgument`
    /// if the value is blank.
    pub fn require(&self, key: &str) -> Result<&str> {
        let value = self.get(key).ok_or_else(|| Error::missing_argument(key))?;
        if value.trim().is_empty() {
            return Err(Error::invalid_argument(key, "value must not be empty"));
        }
        Ok(value)
    }

    /// Overlay values from `overrides` onto the keys this list already
    /// declares. Keys not declared here are ignored.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Self) -> Self {
        Self(
            self.0
                .iter()
                .map(|declared| match overrides.get(&declared.key) {
                    Some(value) => Argument {
                        value: value.to_string(),
                        ..declared.clone()
                    },
                    None => declared.clone(),
                })
                .collect_vec(),
        )
    }

    /// Parse a `KEY=VALUE` pair as a text argument.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when there is no `=` or the key is empty.
    pub fn parse_pair(pair: &str) -> Result<Argument> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_argument(pair, "expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_argument(pair, "key must not be empty"));
        }
        Ok(Argument::text(key, value))
    }

    /// Iterate over the arguments in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.0.iter()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
