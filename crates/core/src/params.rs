//! Query parameters sent to the Listing Service
//!
//! Parameters are kept in a sorted map so that two logically identical
//! queries always render the same cache key and the same query string,
//! regardless of the order in which callers inserted them. A parameter
//! that is not specified is simply absent; there is no null encoding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar query parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for ParamValue {
    /// Saturates at `i64::MAX`
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Flat, ordered set of query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value for the key
    pub fn insert<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set a parameter only when a value is present; `None` leaves the key out
    pub fn insert_opt<K, V>(&mut self, key: K, value: Option<V>) -> &mut Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        if let Some(value) = value {
            self.values.insert(key.into(), value.into());
        }
        self
    }

    /// Builder-style variant of [`QueryParams::insert`]
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Key/value pairs in key order, rendered for a URL query string
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Deterministic cache key for a query against `endpoint`
    ///
    /// # Examples
    ///
    /// ```
    /// use proplink_core::params::QueryParams;
    ///
    /// let a = QueryParams::new().with("limit", 10usize).with("offset", 0usize);
    /// let b = QueryParams::new().with("offset", 0usize).with("limit", 10usize);
    /// assert_eq!(a.cache_key("properties.json"), b.cache_key("properties.json"));
    /// assert_eq!(a.cache_key("properties.json"), "properties.json?limit=10&offset=0");
    /// ```
    pub fn cache_key(&self, endpoint: &str) -> String {
        let query = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", endpoint, query)
    }
}
