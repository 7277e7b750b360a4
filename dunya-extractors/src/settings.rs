//! Module settings
//!
//! A plain name → value map. Lookups by a name that was never registered
//! fail with [`ExtractorError::MissingSetting`] rather than yielding a default.

use crate::error::{ExtractorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Option name of the shared cache host
pub const REDIS_HOST: &str = "redis_host";

/// Configuration options of one module instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an option, failing if it was never set
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| ExtractorError::MissingSetting(name.to_string()))
    }

    /// Look up an option and deserialise it into `T`
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        T::deserialize(value).map_err(|e| ExtractorError::InvalidSetting {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Look up a string option
    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| ExtractorError::InvalidSetting {
                name: name.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set one option, returning the value it replaced
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Merge options, overwriting same-named entries
    pub fn merge<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in options {
            self.0.insert(name.into(), value.into());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        settings.merge(iter);
        settings
    }
}

impl From<serde_json::Map<String, Value>> for Settings {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_setting_fails_clearly() {
        let settings = Settings::new();
        match settings.get("block_size") {
            Err(ExtractorError::MissingSetting(name)) => assert_eq!(name, "block_size"),
            other => panic!("Expected MissingSetting, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_overwrites_only_same_name() {
        let mut settings: Settings = [("a", json!(1)), ("b", json!("two"))].into_iter().collect();

        settings.merge([("a", json!(10)), ("c", json!(true))]);

        assert_eq!(settings.get("a").unwrap(), &json!(10));
        assert_eq!(settings.get("b").unwrap(), &json!("two"));
        assert_eq!(settings.get("c").unwrap(), &json!(true));
        assert_eq!(settings.len(), 3);
    }

    #[test]
    fn test_typed_accessors() {
        let settings: Settings = [("size", json!(4096)), ("host", json!("localhost"))]
            .into_iter()
            .collect();

        assert_eq!(settings.get_as::<u64>("size").unwrap(), 4096);
        assert_eq!(settings.get_str("host").unwrap(), "localhost");
        assert!(matches!(
            settings.get_str("size"),
            Err(ExtractorError::InvalidSetting { .. })
        ));
        assert!(matches!(
            settings.get_as::<String>("size"),
            Err(ExtractorError::InvalidSetting { .. })
        ));
    }
}
