use super::namespace::Namespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("Quantity name must not be empty")]
    EmptyName,

    #[error("Quantity '{name}' needs a non-empty namespace")]
    EmptyNamespace { name: String },

    #[error("Unknown log flag '{0}'")]
    UnknownFlag(String),
}

/// Describes how an exported value is to be interpreted downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFlag {
    #[default]
    Scalar,
    Sequence,
    String,
    Object,
    /// Already-structured mapping; passed through verbatim when logged.
    Dict,
}

impl LogFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFlag::Scalar => "scalar",
            LogFlag::Sequence => "sequence",
            LogFlag::String => "string",
            LogFlag::Object => "object",
            LogFlag::Dict => "dict",
        }
    }
}

impl fmt::Display for LogFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFlag {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(LogFlag::Scalar),
            "sequence" => Ok(LogFlag::Sequence),
            "string" => Ok(LogFlag::String),
            "object" => Ok(LogFlag::Object),
            "dict" => Ok(LogFlag::Dict),
            other => Err(QuantityError::UnknownFlag(other.to_string())),
        }
    }
}

/// A value read from a loggable quantity at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Sequence(Vec<LogValue>),
    Map(BTreeMap<String, LogValue>),
}

impl From<bool> for LogValue {
    fn from(value: bool) -> Self {
        LogValue::Bool(value)
    }
}

impl From<i32> for LogValue {
    fn from(value: i32) -> Self {
        LogValue::Int(value.into())
    }
}

impl From<i64> for LogValue {
    fn from(value: i64) -> Self {
        LogValue::Int(value)
    }
}

impl From<u32> for LogValue {
    fn from(value: u32) -> Self {
        LogValue::Int(value.into())
    }
}

impl From<u64> for LogValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(LogValue::Int)
            .unwrap_or(LogValue::Float(value as f64))
    }
}

impl From<usize> for LogValue {
    fn from(value: usize) -> Self {
        (value as u64).into()
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Float(value)
    }
}

impl From<&str> for LogValue {
    fn from(value: &str) -> Self {
        LogValue::Text(value.to_string())
    }
}

impl From<String> for LogValue {
    fn from(value: String) -> Self {
        LogValue::Text(value)
    }
}

impl From<Vec<f64>> for LogValue {
    fn from(values: Vec<f64>) -> Self {
        LogValue::Sequence(values.into_iter().map(LogValue::Float).collect())
    }
}

impl From<BTreeMap<String, LogValue>> for LogValue {
    fn from(map: BTreeMap<String, LogValue>) -> Self {
        LogValue::Map(map)
    }
}

/// Identifies one loggable quantity: its name, the namespace of the type that
/// declares it, and how its value is flagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoggerQuantity {
    name: String,
    namespace: Namespace,
    flag: LogFlag,
}

impl LoggerQuantity {
    pub fn new(
        name: impl Into<String>,
        namespace: Namespace,
        flag: LogFlag,
    ) -> Result<Self, QuantityError> {
        let name = name.into();
        if name.is_empty() {
            return Err(QuantityError::EmptyName);
        }
        if namespace.is_empty() {
            return Err(QuantityError::EmptyNamespace { name });
        }
        Ok(Self {
            name,
            namespace,
            flag,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn flag(&self) -> LogFlag {
        self.flag
    }

    /// Candidate full paths for this quantity, in preference order.
    ///
    /// The first candidate is `(namespace..., name)`. Every later one suffixes
    /// `_1`, `_2`, ... onto the last namespace segment, so several instances of
    /// the same type log side by side as `Type`, `Type_1`, `Type_2`. The
    /// sequence only ends once the suffix counter is exhausted; each call
    /// starts over from the first candidate.
    pub fn yield_names(&self) -> NameCandidates<'_> {
        NameCandidates {
            quantity: self,
            index: Some(0),
        }
    }
}

impl fmt::Display for LoggerQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.namespace, self.name, self.flag)
    }
}

#[derive(Debug, Clone)]
pub struct NameCandidates<'a> {
    quantity: &'a LoggerQuantity,
    index: Option<u64>,
}

impl Iterator for NameCandidates<'_> {
    type Item = Namespace;

    fn next(&mut self) -> Option<Self::Item> {
        let quantity = self.quantity;
        let index = self.index?;
        let candidate = match (index, quantity.namespace.split_last()) {
            (0, _) | (_, None) => quantity.namespace.join(quantity.name.as_str()),
            (index, Some((owner, parent))) => {
                let mut segments = parent.to_vec();
                segments.push(format!("{owner}_{index}"));
                segments.push(quantity.name.clone());
                Namespace::from(segments)
            }
        };
        self.index = index.checked_add(1);
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.index {
            Some(_) => (usize::MAX, None),
            None => (0, Some(0)),
        }
    }
}
