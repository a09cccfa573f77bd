use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::{FieldId, FieldValue, SpatialPoint};

/// Field value as it is laid out inside an entry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Null,
    Empty,
    Raw(Vec<u8>),
    Tuple { text: Vec<u8>, long: i64, double: f64 },
    List(Vec<StoredValue>),
    Spatial(SpatialPoint),
    SpatialList(Vec<SpatialPoint>),
}

impl From<FieldValue> for StoredValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => StoredValue::Null,
            FieldValue::Empty => StoredValue::Empty,
            FieldValue::Text(text) if text.is_empty() => StoredValue::Empty,
            FieldValue::Text(text) => StoredValue::Raw(text.into_bytes()),
            FieldValue::Raw(bytes) if bytes.is_empty() => StoredValue::Empty,
            FieldValue::Raw(bytes) => StoredValue::Raw(bytes),
            FieldValue::Numeric { text, long, double } => StoredValue::Tuple {
                text: text.into_bytes(),
                long,
                double,
            },
            FieldValue::List(items) => StoredValue::List(items.into_iter().map(StoredValue::from).collect()),
            FieldValue::Spatial(point) => StoredValue::Spatial(point),
            FieldValue::SpatialList(points) => StoredValue::SpatialList(points),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct EntryPayload {
    pub(crate) known: BTreeMap<FieldId, StoredValue>,
    pub(crate) dynamic: BTreeMap<String, StoredValue>,
}

/// Builds the payload handed to `IndexWriter::index`.
///
/// Writing the same field twice keeps the last value.
#[derive(Debug, Default)]
pub struct EntryBuilder {
    payload: EntryPayload,
}

impl EntryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, field: FieldId, value: impl Into<FieldValue>) -> &mut Self {
        self.payload.known.insert(field, StoredValue::from(value.into()));
        self
    }

    pub fn write_dynamic(&mut self, name: &str, value: impl Into<FieldValue>) -> &mut Self {
        self.payload.dynamic.insert(name.to_string(), StoredValue::from(value.into()));
        self
    }

    pub fn field_count(&self) -> usize {
        self.payload.known.len() + self.payload.dynamic.len()
    }

    pub fn finish(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.payload)?)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::text(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::long(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::double(value)
    }
}

impl From<SpatialPoint> for FieldValue {
    fn from(value: SpatialPoint) -> Self {
        FieldValue::Spatial(value)
    }
}
