// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conversion between live entities and JSON records.
//!
//! Each entity kind has a `*_to_record` / `*_from_record` pair. Subtype
//! serializers call their base serializer first and then overlay their own
//! fields, so base fields are always populated before subtype fields.
//!
//! Loading a document never fails on a bad sub-record: problems are pushed
//! to [`Warnings`] and the offending record or reference is skipped.

pub mod animation;
pub mod document;
pub mod geometry;
pub mod material;
pub mod object;

use crate::registry::Registry;
use crate::scene::{EntityId, SceneNode, Subtree};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A JSON object record
pub type Record = Map<String, Value>;

/// Record errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// Required field absent
    #[error("{record} record is missing required field `{field}`")]
    MissingField {
        /// Record kind
        record: String,
        /// Field name
        field: String,
    },

    /// Field present with the wrong shape
    #[error("{record} record has invalid field `{field}`: {reason}")]
    InvalidField {
        /// Record kind
        record: String,
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },

    /// Type tag with no serializer
    #[error("Unknown {category} type `{tag}`")]
    UnknownType {
        /// Entity category
        category: &'static str,
        /// Offending tag
        tag: String,
    },

    /// Reference to an identifier that does not exist
    #[error("{owner} references missing {missing}")]
    UnresolvedReference {
        /// Referencing entity
        owner: String,
        /// Missing identifier
        missing: String,
    },

    /// Record that is not a JSON object or fails to decode as a whole
    #[error("Malformed {record} record: {reason}")]
    Malformed {
        /// Record kind
        record: String,
        /// Decoder message
        reason: String,
    },
}

/// Result type for record conversion
pub type Result<T> = std::result::Result<T, RecordError>;

/// Result of writing a record; only serde encoding can fail
pub type Encoded<T = Record> = std::result::Result<T, serde_json::Error>;

/// A recoverable problem found while loading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadWarning {
    /// A cross-reference was dropped
    #[error("Dropped reference from {owner} to missing {missing}")]
    UnresolvedReference {
        /// Referencing entity
        owner: String,
        /// Missing identifier
        missing: String,
    },

    /// A sub-record could not be read and was skipped
    #[error("Skipped {context}: {error}")]
    SkippedRecord {
        /// Where the record sits in the document
        context: String,
        /// Why it was skipped
        error: RecordError,
    },

    /// A history entry named a command kind that does not exist
    #[error("Skipped history entry {index}: unknown command kind `{kind}`")]
    UnknownCommandKind {
        /// Position in the saved history
        index: usize,
        /// Offending type tag
        kind: String,
    },

    /// A history entry could not be rebuilt
    #[error("Skipped history entry {index}: {reason}")]
    SkippedCommand {
        /// Position in the saved history
        index: usize,
        /// Why it was skipped
        reason: String,
    },

    /// Two records share an identifier; the later one was skipped
    #[error("Skipped record with duplicate identifier {0}")]
    DuplicateId(String),
}

impl LoadWarning {
    fn into_record_error(self) -> RecordError {
        match self {
            Self::UnresolvedReference { owner, missing } => {
                RecordError::UnresolvedReference { owner, missing }
            }
            Self::SkippedRecord { error, .. } => error,
            other => RecordError::Malformed {
                record: "nested".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Warning collector threaded through loading
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<LoadWarning>,
}

impl Warnings {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning
    pub fn push(&mut self, warning: LoadWarning) {
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }

    /// Number of warnings so far
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing went wrong
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the collected warnings
    pub fn into_vec(self) -> Vec<LoadWarning> {
        self.items
    }

    /// Treat the first warning as an error
    pub(crate) fn into_strict(self) -> Result<()> {
        match self.items.into_iter().next() {
            Some(warning) => Err(warning.into_record_error()),
            None => Ok(()),
        }
    }
}

/// Read access to nodes by identifier
pub trait NodeLookup {
    /// Find a node
    fn lookup(&self, id: &EntityId) -> Option<&SceneNode>;
}

impl NodeLookup for Registry {
    fn lookup(&self, id: &EntityId) -> Option<&SceneNode> {
        self.node(id).ok()
    }
}

impl NodeLookup for Subtree {
    fn lookup(&self, id: &EntityId) -> Option<&SceneNode> {
        self.node(id)
    }
}

/// Typed field access on a record
pub(crate) struct RecordReader<'a> {
    kind: &'a str,
    record: &'a Record,
}

impl<'a> RecordReader<'a> {
    pub(crate) fn new(kind: &'a str, record: &'a Record) -> Self {
        Self { kind, record }
    }

    pub(crate) fn invalid(&self, field: &str, reason: impl Into<String>) -> RecordError {
        RecordError::InvalidField {
            record: self.kind.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    fn optional(&self, field: &str) -> Option<&'a Value> {
        self.record.get(field).filter(|v| !v.is_null())
    }

    pub(crate) fn required(&self, field: &str) -> Result<&'a Value> {
        self.optional(field).ok_or_else(|| RecordError::MissingField {
            record: self.kind.to_string(),
            field: field.to_string(),
        })
    }

    pub(crate) fn str(&self, field: &str) -> Result<&'a str> {
        self.required(field)?
            .as_str()
            .ok_or_else(|| self.invalid(field, "expected a string"))
    }

    pub(crate) fn id(&self, field: &str) -> Result<EntityId> {
        self.str(field).map(EntityId::from)
    }

    pub(crate) fn opt_id(&self, field: &str) -> Result<Option<EntityId>> {
        self.optional(field)
            .map(|v| {
                v.as_str()
                    .map(EntityId::from)
                    .ok_or_else(|| self.invalid(field, "expected a string"))
            })
            .transpose()
    }

    pub(crate) fn string_or(&self, field: &str, default: &str) -> Result<String> {
        match self.optional(field) {
            None => Ok(default.to_string()),
            Some(v) => v
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(field, "expected a string")),
        }
    }

    pub(crate) fn f32_or(&self, field: &str, default: f32) -> Result<f32> {
        match self.optional(field) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| self.invalid(field, "expected a number")),
        }
    }

    pub(crate) fn u64_or(&self, field: &str, default: u64) -> Result<u64> {
        match self.optional(field) {
            None => Ok(default),
            Some(v) => v
                .as_u64()
                .ok_or_else(|| self.invalid(field, "expected a non-negative integer")),
        }
    }

    pub(crate) fn u32_or(&self, field: &str, default: u32) -> Result<u32> {
        let value = self.u64_or(field, u64::from(default))?;
        u32::try_from(value).map_err(|_| self.invalid(field, "out of range"))
    }

    pub(crate) fn i32_or(&self, field: &str, default: i32) -> Result<i32> {
        match self.optional(field) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| self.invalid(field, "expected an integer")),
        }
    }

    pub(crate) fn bool_or(&self, field: &str, default: bool) -> Result<bool> {
        match self.optional(field) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(field, "expected a boolean")),
        }
    }

    pub(crate) fn vec3_or(&self, field: &str, default: [f32; 3]) -> Result<[f32; 3]> {
        let Some(value) = self.optional(field) else {
            return Ok(default);
        };
        let numbers: Option<Vec<f32>> = value
            .as_array()
            .and_then(|items| items.iter().map(|n| n.as_f64().map(|n| n as f32)).collect());
        match numbers.as_deref() {
            Some([x, y, z]) => Ok([*x, *y, *z]),
            _ => Err(self.invalid(field, "expected three numbers")),
        }
    }

    pub(crate) fn array(&self, field: &str) -> Result<&'a [Value]> {
        match self.optional(field) {
            None => Ok(&[]),
            Some(v) => v
                .as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| self.invalid(field, "expected an array")),
        }
    }

    pub(crate) fn object(&self, field: &str) -> Result<Option<&'a Record>> {
        self.optional(field)
            .map(|v| {
                v.as_object()
                    .ok_or_else(|| self.invalid(field, "expected an object"))
            })
            .transpose()
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        self.optional(field)
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|err| self.invalid(field, err.to_string()))
            })
            .transpose()
    }
}

pub(crate) fn vec3(v: [f32; 3]) -> Value {
    Value::from(v.to_vec())
}

pub(crate) fn as_record<'a>(kind: &str, value: &'a Value) -> Result<&'a Record> {
    value.as_object().ok_or_else(|| RecordError::Malformed {
        record: kind.to_string(),
        reason: "expected a JSON object".to_string(),
    })
}

pub(crate) fn encode_record<T: Serialize>(value: &T) -> Encoded {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Record::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

pub(crate) fn decode_record<T: DeserializeOwned>(kind: &str, record: &Record) -> Result<T> {
    serde_json::from_value(Value::Object(record.clone())).map_err(|err| RecordError::Malformed {
        record: kind.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reader_required_and_defaults() {
        let r = record(json!({ "uuid": "A", "visible": false, "position": [1, 2, 3], "name": null }));
        let reader = RecordReader::new("Mesh", &r);
        assert_eq!(reader.id("uuid").unwrap(), EntityId::from("A"));
        assert!(!reader.bool_or("visible", true).unwrap());
        assert_eq!(reader.vec3_or("position", [0.0; 3]).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(reader.string_or("name", "x").unwrap(), "x");
        assert_eq!(
            reader.str("type"),
            Err(RecordError::MissingField {
                record: "Mesh".to_string(),
                field: "type".to_string(),
            })
        );
    }

    #[test]
    fn test_reader_rejects_wrong_shapes() {
        let r = record(json!({ "scale": [1, 2], "visible": "yes", "renderOrder": 1.5 }));
        let reader = RecordReader::new("Group", &r);
        assert!(matches!(reader.vec3_or("scale", [1.0; 3]), Err(RecordError::InvalidField { .. })));
        assert!(reader.bool_or("visible", true).is_err());
        assert!(reader.i32_or("renderOrder", 0).is_err());
    }

    #[test]
    fn test_strict_warnings() {
        let mut warnings = Warnings::new();
        assert_eq!(Warnings::new().into_strict(), Ok(()));
        warnings.push(LoadWarning::UnresolvedReference {
            owner: "A".to_string(),
            missing: "B".to_string(),
        });
        assert_eq!(
            warnings.into_strict(),
            Err(RecordError::UnresolvedReference {
                owner: "A".to_string(),
                missing: "B".to_string(),
            })
        );
    }
}
