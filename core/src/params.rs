//! Tile request parameters and their validators

use schemars::JsonSchema;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// Key-value bag of params sent by the client with a tile request.
///
/// Values coming from a query string are kept as JSON strings; typed
/// params structs decide how to read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileParams(BTreeMap<String, Value>);

impl TileParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from a decoded query string
    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self(
            query
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        )
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Read the bag into a concrete params struct
    pub fn to_typed<P: DeserializeOwned>(&self) -> Result<P, ValidationError> {
        let object = Value::Object(self.0.clone().into_iter().collect());
        serde_json::from_value(object).map_err(|e| ValidationError::Malformed(e.to_string()))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required param '{0}'")]
    MissingParam(String),

    #[error("invalid value for param '{param}': {reason}")]
    InvalidParam { param: String, reason: String },

    #[error("unable to read params: {0}")]
    Malformed(String),
}

/// Checks the params of a tile request before any upstream fetch.
///
/// Stored by the registry per (type, variant) and handed to whoever serves
/// the tile; the registry itself only calls it from `verify`.
pub trait ParamsValidator: Send + Sync {
    fn validate(&self, params: &TileParams) -> Result<(), ValidationError>;

    /// JSON Schema of the accepted params, published with hydration
    fn schema(&self) -> Value {
        Value::Null
    }
}

/// A concrete params struct for one tile type
pub trait TypedParams: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    /// Semantic checks that serde cannot express
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Validator that reads the bag into `P` and runs its checks
pub struct ParamsSchema<P> {
    _params: PhantomData<fn() -> P>,
}

impl<P: TypedParams> ParamsSchema<P> {
    pub fn new() -> Self {
        Self {
            _params: PhantomData,
        }
    }

    pub fn shared() -> Arc<dyn ParamsValidator> {
        Arc::new(Self::new())
    }

    /// Validate and return the typed params in one go
    pub fn parse(&self, params: &TileParams) -> Result<P, ValidationError> {
        let typed: P = params.to_typed()?;
        typed.validate()?;
        Ok(typed)
    }
}

impl<P: TypedParams> Default for ParamsSchema<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TypedParams> ParamsValidator for ParamsSchema<P> {
    fn validate(&self, params: &TileParams) -> Result<(), ValidationError> {
        self.parse(params).map(|_| ())
    }

    fn schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(P)).unwrap_or(Value::Null)
    }
}

/// Deserialize a value that may arrive either typed or as a query string
pub fn from_str_or_value<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Typed(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Typed(value) => Ok(value),
        Raw::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct SampleParams {
        #[serde(deserialize_with = "from_str_or_value")]
        #[schemars(with = "u64")]
        id: u64,
        #[serde(default)]
        label: Option<String>,
    }

    impl TypedParams for SampleParams {
        fn validate(&self) -> Result<(), ValidationError> {
            if self.id == 0 {
                return Err(ValidationError::InvalidParam {
                    param: "id".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_query_strings_are_read_as_numbers() {
        let query = HashMap::from([("id".to_string(), "42".to_string())]);
        let params = TileParams::from_query(query);

        let typed: SampleParams = ParamsSchema::<SampleParams>::new().parse(&params).unwrap();
        assert_eq!(typed.id, 42);
        assert_eq!(typed.label, None);
    }

    #[test]
    fn test_typed_values_are_accepted() {
        let params = TileParams::new().with("id", 7).with("label", "api");
        let typed: SampleParams = params.to_typed().unwrap();
        assert_eq!(typed.id, 7);
        assert_eq!(typed.label.as_deref(), Some("api"));
    }

    #[test]
    fn test_missing_param_is_malformed() {
        let validator = ParamsSchema::<SampleParams>::shared();
        let result = validator.validate(&TileParams::new());
        assert!(matches!(result, Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn test_semantic_check_runs() {
        let validator = ParamsSchema::<SampleParams>::shared();
        let result = validator.validate(&TileParams::new().with("id", "0"));
        assert!(matches!(result, Err(ValidationError::InvalidParam { .. })));
    }

    #[test]
    fn test_schema_lists_properties() {
        let schema = ParamsSchema::<SampleParams>::new().schema();
        assert!(schema["properties"].get("id").is_some());
        assert!(schema["properties"].get("label").is_some());
    }
}
