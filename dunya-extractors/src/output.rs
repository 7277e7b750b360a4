//! Named outputs returned by a module run

use crate::metadata::OutputFormat;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One unit of output data
#[derive(Debug, Clone, PartialEq)]
pub enum OutputData {
    /// Structure serialised as JSON when stored
    Json(Value),
    /// Raw bytes written as-is with the declared extension
    Bytes(Vec<u8>),
    /// Text written as-is with the declared extension
    Text(String),
}

impl OutputData {
    /// JSON rendering for display; bytes are base64-encoded
    pub fn to_json(&self) -> Value {
        match self {
            OutputData::Json(value) => value.clone(),
            OutputData::Text(text) => Value::String(text.clone()),
            OutputData::Bytes(bytes) => json!({ "base64": BASE64.encode(bytes) }),
        }
    }
}

/// A single unit or an ordered sequence of parts
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Single(OutputData),
    Parts(Vec<OutputData>),
}

impl OutputValue {
    /// Whether this value can be stored in `format`
    ///
    /// The parts flag must agree, and JSON formats only take JSON data.
    pub fn matches(&self, format: &OutputFormat) -> bool {
        let data: Vec<&OutputData> = match self {
            OutputValue::Single(data) if !format.parts => vec![data],
            OutputValue::Parts(parts) if format.parts => parts.iter().collect(),
            _ => return false,
        };

        !format.is_json() || data.iter().all(|d| matches!(d, OutputData::Json(_)))
    }

    pub fn to_json(&self) -> Value {
        match self {
            OutputValue::Single(data) => data.to_json(),
            OutputValue::Parts(parts) => parts.iter().map(OutputData::to_json).collect(),
        }
    }
}

impl From<Value> for OutputValue {
    fn from(value: Value) -> Self {
        OutputValue::Single(OutputData::Json(value))
    }
}

/// Outputs of one run, keyed by output name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleOutputs(BTreeMap<String, OutputValue>);

impl ModuleOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OutputValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style [`ModuleOutputs::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OutputValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}
