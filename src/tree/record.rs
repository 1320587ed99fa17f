//! Instance representation.

use std::collections::BTreeMap;
use std::fmt;

/// An attribute value.
///
/// Numeric values are modeled as Gaussians, everything else is counted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A continuous value.
    Numeric(f64),
    /// A nominal (symbolic) value.
    Nominal(String),
}

impl Value {
    /// The number if this is a finite numeric value.
    ///
    /// NaN is treated as missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Numeric(x) if !x.is_nan() => Some(*x),
            _ => None,
        }
    }

    /// The symbol if this is a nominal value.
    pub fn as_nominal(&self) -> Option<&str> {
        match self {
            Value::Nominal(s) => Some(s),
            Value::Numeric(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(x) => write!(f, "{x}"),
            Value::Nominal(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Numeric(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Nominal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Nominal(s)
    }
}

/// A mapping from attribute name to value.
///
/// Attributes whose name starts with `_` are carried along but never modeled.
pub type Instance = BTreeMap<String, Value>;

/// Build an [`Instance`] from `(attribute, value)` pairs.
pub fn instance<K, V, I>(pairs: I) -> Instance
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
