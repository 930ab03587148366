//! Configuration documents and envelope validation.
//!
//! The authority wraps every document in an envelope:
//! `{"configuration_data": "<serialized json document>"}`. Only the envelope
//! and the shape of the known collections are checked here; what the entries
//! mean is the applier's business.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const ENVELOPE_FIELD: &str = "configuration_data";
pub const BLOCKS: &str = "blocks";
pub const SERVICES: &str = "services";
pub const BLOCK_TYPES: &str = "blockTypes";

/// Why a fetched payload was rejected.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no 'configuration_data' field")]
    MissingEnvelope,

    #[error("'configuration_data' is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("'configuration_data' must hold a JSON object or a serialized one")]
    UnexpectedEnvelopeType,

    #[error("'{0}' must be a map of name to definition")]
    InvalidCollection(&'static str),
}

/// A validated configuration document, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(transparent)]
pub struct ConfigurationDocument(Map<String, Value>);

impl ConfigurationDocument {
    /// Unwrap and validate a payload returned by the authority.
    pub fn from_envelope(payload: &Value) -> Result<Self, PayloadError> {
        let envelope = payload.as_object().ok_or(PayloadError::NotAnObject)?;
        let data = envelope
            .get(ENVELOPE_FIELD)
            .ok_or(PayloadError::MissingEnvelope)?;

        let document = match data {
            Value::String(serialized) => serde_json::from_str::<Value>(serialized)?,
            Value::Object(_) => data.clone(),
            _ => return Err(PayloadError::UnexpectedEnvelopeType),
        };

        match document {
            Value::Object(map) => Self::from_map(map),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Validate an already-unwrapped document.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, PayloadError> {
        for collection in [BLOCKS, SERVICES, BLOCK_TYPES] {
            if let Some(value) = map.get(collection) {
                if !value.is_object() {
                    return Err(PayloadError::InvalidCollection(collection));
                }
            }
        }
        Ok(Self(map))
    }

    pub fn blocks(&self) -> Option<&Map<String, Value>> {
        self.collection(BLOCKS)
    }

    pub fn services(&self) -> Option<&Map<String, Value>> {
        self.collection(SERVICES)
    }

    pub fn block_types(&self) -> Option<&Map<String, Value>> {
        self.collection(BLOCK_TYPES)
    }

    pub fn collection(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(document: &Value) -> Value {
        json!({ "configuration_data": document.to_string() })
    }

    #[test]
    fn test_passes_document_through_unchanged() {
        let document = json!({
            "blocks": {},
            "services": {},
            "blockTypes": {},
            "any_other_data": {}
        });
        let parsed = ConfigurationDocument::from_envelope(&envelope(&document)).unwrap();
        assert_eq!(parsed.to_value(), document);
        assert!(parsed.blocks().unwrap().is_empty());
    }

    #[test]
    fn test_empty_document_is_valid() {
        let parsed = ConfigurationDocument::from_envelope(&envelope(&json!({}))).unwrap();
        assert!(parsed.as_map().is_empty());
        assert!(parsed.services().is_none());
    }

    #[test]
    fn test_inline_object_envelope() {
        let payload = json!({ "configuration_data": { "blocks": { "b1": { "type": "Counter" } } } });
        let parsed = ConfigurationDocument::from_envelope(&payload).unwrap();
        assert!(parsed.blocks().unwrap().contains_key("b1"));
    }

    #[test]
    fn test_missing_envelope() {
        let payload = json!({ "a_field": "a_field_data" });
        assert!(matches!(
            ConfigurationDocument::from_envelope(&payload),
            Err(PayloadError::MissingEnvelope)
        ));
    }

    #[test]
    fn test_malformed_serialization() {
        let payload = json!({ "configuration_data": "{not json" });
        assert!(matches!(
            ConfigurationDocument::from_envelope(&payload),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_object_document() {
        let payload = json!({ "configuration_data": "[1, 2]" });
        assert!(matches!(
            ConfigurationDocument::from_envelope(&payload),
            Err(PayloadError::NotAnObject)
        ));
        assert!(matches!(
            ConfigurationDocument::from_envelope(&json!({ "configuration_data": 7 })),
            Err(PayloadError::UnexpectedEnvelopeType)
        ));
    }

    #[test]
    fn test_collection_must_be_map() {
        let payload = envelope(&json!({ "services": ["svc"] }));
        assert!(matches!(
            ConfigurationDocument::from_envelope(&payload),
            Err(PayloadError::InvalidCollection(SERVICES))
        ));
    }
}
