use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Type-safe parameter values for curve generators and pattern handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    List(Vec<f64>),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            ParamValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Named parameters, kept in insertion order so serialized output is stable.
/// Serializes as a flat JSON object (transparent over the inner map).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CurveParams(IndexMap<String, ParamValue>);

impl CurveParams {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn set(mut self, key: &str, value: ParamValue) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn with_float(self, key: &str, value: f64) -> Self {
        self.set(key, ParamValue::Number(value))
    }

    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.set(key, ParamValue::Bool(value))
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Get a float param with a default fallback.
    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(ParamValue::as_float).unwrap_or(default)
    }

    /// Get a bool param with a default fallback.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(ParamValue::as_bool).unwrap_or(default)
    }

    /// Get a list param with a default fallback.
    pub fn list_or<'a>(&'a self, key: &str, default: &'a [f64]) -> &'a [f64] {
        self.get(key).and_then(ParamValue::as_list).unwrap_or(default)
    }

    /// Overlay `other` on top of `self`: keys present in `other` replace ours.
    pub fn overlay(&self, other: &CurveParams) -> CurveParams {
        let mut merged = self.0.clone();
        for (k, v) in &other.0 {
            merged.insert(k.clone(), v.clone());
        }
        CurveParams(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
