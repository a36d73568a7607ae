//! Storage Key - the textual primary key of every variable row
//!
//! Format: `<name>[_<scope0>[_<scope1>...]]`
//!
//! Examples:
//! - `money` (global variable, no scope)
//! - `money_608233` (per-user)
//! - `money_608233_771004` (per-user, per-guild)
//!
//! Decoding is lossless only when neither the name nor any scope segment
//! contains the separator. This is not validated.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Separator between the variable name and each scope segment
pub const SEPARATOR: char = '_';

/// Encoded `(name, scope)` pair, stored in the `key` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Encode a variable name and its ordered scope segments
    pub fn encode<S: AsRef<str>>(name: &str, scope: &[S]) -> Self {
        let mut key = String::from(name);
        for segment in scope {
            key.push(SEPARATOR);
            key.push_str(segment.as_ref());
        }
        Self(key)
    }

    /// Split the key back into `(name, scope)`
    pub fn decode(&self) -> (String, Vec<String>) {
        let mut parts = self.0.split(SEPARATOR);
        let name = parts.next().unwrap_or_default().to_string();
        let scope = parts.map(str::to_string).collect();
        (name, scope)
    }

    /// Variable name, i.e. the first segment
    pub fn name(&self) -> &str {
        self.0.split(SEPARATOR).next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for StorageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Configuration("storage key cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Serialize for StorageKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StorageKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StorageKey::from_str(&s).map_err(serde::de::Error::custom)
    }
}
