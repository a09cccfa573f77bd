use serde::{Serialize, Deserialize};

/// Dense field identifier assigned by the field mapping.
pub type FieldId = u16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl SpatialPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        SpatialPoint { latitude, longitude }
    }
}

/// Application value of a single field, before it is written into an entry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Empty,
    Text(String),
    Raw(Vec<u8>),
    /// Textual form plus the numeric forms indexed in the numeric trees.
    Numeric { text: String, long: i64, double: f64 },
    List(Vec<FieldValue>),
    Spatial(SpatialPoint),
    SpatialList(Vec<SpatialPoint>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(value)
        }
    }

    pub fn long(value: i64) -> Self {
        FieldValue::Numeric {
            text: value.to_string(),
            long: value,
            double: value as f64,
        }
    }

    pub fn double(value: f64) -> Self {
        FieldValue::Numeric {
            text: value.to_string(),
            long: value as i64,
            double: value,
        }
    }
}
