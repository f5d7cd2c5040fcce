//! Schema contract and canonical JSON codec for stream records.
//!
//! Every record that travels through a stream implements [`Schema`]. The codec
//! validates before it serializes and after it deserializes, so an invalid
//! record is never written and never handed to a consumer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A record failed its schema contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `detections[2].objectid`
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the field path with the enclosing field
    pub fn within(mut self, parent: impl AsRef<str>) -> Self {
        self.field = format!("{}.{}", parent.as_ref(), self.field);
        self
    }
}

/// Errors produced by [`encode`] and [`decode`]
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{schema} failed validation: {source}")]
    Invalid {
        schema: &'static str,
        source: ValidationError,
    },

    #[error("Failed to serialize {schema}: {source}")]
    Serialization {
        schema: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to deserialize {schema}: {source}")]
    Deserialization {
        schema: &'static str,
        source: serde_json::Error,
    },
}

/// A record with a checkable contract and a canonical JSON form
pub trait Schema: Serialize + DeserializeOwned {
    /// Name used in log lines and errors
    const NAME: &'static str;

    /// Check the contract serde's structural checks cannot express
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Validate every item of a sequence, tagging failures with their index
pub fn validate_each<'a, T, I, F>(field: &str, items: I, check: F) -> Result<(), ValidationError>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> Result<(), ValidationError>,
{
    for (index, item) in items.into_iter().enumerate() {
        check(item).map_err(|e| e.within(format!("{}[{}]", field, index)))?;
    }
    Ok(())
}

/// Validate and serialize a record to canonical JSON text
pub fn encode<T: Schema>(record: &T) -> Result<String, CodecError> {
    record.validate().map_err(|source| CodecError::Invalid {
        schema: T::NAME,
        source,
    })?;

    serde_json::to_string(record).map_err(|source| CodecError::Serialization {
        schema: T::NAME,
        source,
    })
}

/// Deserialize and validate a record from JSON text
pub fn decode<T: Schema>(text: &str) -> Result<T, CodecError> {
    let record: T = serde_json::from_str(text).map_err(|source| CodecError::Deserialization {
        schema: T::NAME,
        source,
    })?;

    record.validate().map_err(|source| CodecError::Invalid {
        schema: T::NAME,
        source,
    })?;

    Ok(record)
}
