//! Serialized model description: declared input shape, declared descriptor
//! length, and the ordered layer list a graph is assembled from.

use super::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The buffer shape a model expects at its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

/// One named configuration value of a layer.
///
/// Untagged so manifests stay plain JSON: numbers, strings, and flat float
/// arrays (weights, biases, running statistics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Array(Vec<f32>),
}

/// One layer of a model description. Immutable once the graph is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    pub kind: String,
    /// Names of upstream layers feeding this one. Empty = reads the graph input.
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl LayerDescriptor {
    fn missing(&self, key: &str) -> ModelError {
        ModelError::Malformed(format!("layer '{}': missing parameter '{key}'", self.name))
    }

    fn wrong_type(&self, key: &str, expected: &str) -> ModelError {
        ModelError::Malformed(format!(
            "layer '{}': parameter '{key}' must be {expected}",
            self.name
        ))
    }

    /// Required float parameter.
    pub fn param_f32(&self, key: &str) -> Result<f32, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Number(n)) => Ok(*n as f32),
            Some(_) => Err(self.wrong_type(key, "a number")),
            None => Err(self.missing(key)),
        }
    }

    /// Optional float parameter with a default.
    pub fn param_f32_or(&self, key: &str, default: f32) -> Result<f32, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Number(n)) => Ok(*n as f32),
            Some(_) => Err(self.wrong_type(key, "a number")),
            None => Ok(default),
        }
    }

    /// Required non-negative integer parameter.
    pub fn param_usize(&self, key: &str) -> Result<usize, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
            Some(_) => Err(self.wrong_type(key, "a non-negative integer")),
            None => Err(self.missing(key)),
        }
    }

    /// Optional non-negative integer parameter with a default.
    pub fn param_usize_or(&self, key: &str, default: usize) -> Result<usize, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
            Some(_) => Err(self.wrong_type(key, "a non-negative integer")),
            None => Ok(default),
        }
    }

    /// Required float-array parameter.
    pub fn param_array(&self, key: &str) -> Result<&[f32], ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Array(v)) => Ok(v),
            Some(_) => Err(self.wrong_type(key, "an array of numbers")),
            None => Err(self.missing(key)),
        }
    }

    /// Optional float-array parameter.
    pub fn param_array_opt(&self, key: &str) -> Result<Option<&[f32]>, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Array(v)) => Ok(Some(v)),
            Some(_) => Err(self.wrong_type(key, "an array of numbers")),
            None => Ok(None),
        }
    }

    /// Optional string parameter with a default.
    pub fn param_text_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, ModelError> {
        match self.params.get(key) {
            Some(ParamValue::Text(s)) => Ok(s),
            Some(_) => Err(self.wrong_type(key, "a string")),
            None => Ok(default),
        }
    }
}

/// A complete, build-ready model description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub input: InputShape,
    /// Declared descriptor length; the graph builder verifies the final layer
    /// actually produces this many values.
    pub feature_len: usize,
    pub layers: Vec<LayerDescriptor>,
}
