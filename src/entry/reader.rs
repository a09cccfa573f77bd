use bitflags::bitflags;
use crate::core::error::{Error, Result};
use crate::core::types::{FieldId, SpatialPoint};
use crate::entry::writer::{EntryPayload, StoredValue};

bitflags! {
    /// Shape of a field value inside an entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IndexEntryFieldType: u8 {
        const NULL = 1;
        const EMPTY = 2;
        const RAW = 4;
        const TUPLE = 8;
        const LIST = 16;
        const SPATIAL = 32;
    }
}

/// Single item yielded by [`FieldReader::read_many`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldItem<'a> {
    Null,
    Empty,
    Raw(&'a [u8]),
    Tuple { text: &'a [u8], long: i64, double: f64 },
}

/// Parsed view over one entry payload.
#[derive(Debug, Clone)]
pub struct EntryReader {
    payload: EntryPayload,
}

impl EntryReader {
    pub fn new(payload: &[u8]) -> Result<Self> {
        let payload: EntryPayload = bincode::deserialize(payload)
            .map_err(|e| Error::corruption(format!("invalid entry payload: {}", e)))?;
        Ok(EntryReader { payload })
    }

    pub fn get(&self, field: FieldId) -> Option<FieldReader<'_>> {
        self.payload.known.get(&field).map(FieldReader::new)
    }

    pub fn get_dynamic(&self, name: &str) -> Option<FieldReader<'_>> {
        self.payload.dynamic.get(name).map(FieldReader::new)
    }

    pub fn dynamic_fields(&self) -> impl Iterator<Item = (&str, FieldReader<'_>)> {
        self.payload.dynamic.iter().map(|(name, value)| (name.as_str(), FieldReader::new(value)))
    }

    pub fn known_fields(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.payload.known.keys().copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    value: &'a StoredValue,
}

impl<'a> FieldReader<'a> {
    fn new(value: &'a StoredValue) -> Self {
        FieldReader { value }
    }

    pub fn field_type(&self) -> IndexEntryFieldType {
        match self.value {
            StoredValue::Null => IndexEntryFieldType::NULL,
            StoredValue::Empty => IndexEntryFieldType::EMPTY,
            StoredValue::Raw(_) => IndexEntryFieldType::RAW,
            StoredValue::Tuple { .. } => IndexEntryFieldType::TUPLE,
            StoredValue::Spatial(_) => IndexEntryFieldType::SPATIAL,
            StoredValue::SpatialList(_) => IndexEntryFieldType::LIST | IndexEntryFieldType::SPATIAL,
            StoredValue::List(items) => {
                let mut flags = IndexEntryFieldType::LIST;
                for item in items {
                    flags |= FieldReader::new(item).field_type() - IndexEntryFieldType::LIST;
                }
                flags
            }
        }
    }

    /// Textual bytes of a raw or tuple value.
    pub fn read(&self) -> Option<&'a [u8]> {
        match self.value {
            StoredValue::Raw(bytes) => Some(bytes),
            StoredValue::Tuple { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn read_tuple(&self) -> Option<(&'a [u8], i64, f64)> {
        match self.value {
            StoredValue::Tuple { text, long, double } => Some((text.as_slice(), *long, *double)),
            _ => None,
        }
    }

    pub fn read_long(&self) -> Option<i64> {
        self.read_tuple().map(|(_, long, _)| long)
    }

    pub fn read_double(&self) -> Option<f64> {
        self.read_tuple().map(|(_, _, double)| double)
    }

    pub fn read_spatial(&self) -> Option<SpatialPoint> {
        match self.value {
            StoredValue::Spatial(point) => Some(*point),
            _ => None,
        }
    }

    /// Items of a list value; a scalar value reads as a one-item list.
    pub fn read_many(self) -> impl Iterator<Item = FieldItem<'a>> + 'a {
        let items: &'a [StoredValue] = match self.value {
            StoredValue::List(items) => items,
            StoredValue::Spatial(_) | StoredValue::SpatialList(_) => &[],
            other => std::slice::from_ref(other),
        };
        items.iter().filter_map(|item| match item {
            StoredValue::Null => Some(FieldItem::Null),
            StoredValue::Empty => Some(FieldItem::Empty),
            StoredValue::Raw(bytes) => Some(FieldItem::Raw(bytes)),
            StoredValue::Tuple { text, long, double } => Some(FieldItem::Tuple {
                text,
                long: *long,
                double: *double,
            }),
            _ => None,
        })
    }

    pub fn read_many_spatial(self) -> impl Iterator<Item = SpatialPoint> + 'a {
        let points: &'a [SpatialPoint] = match self.value {
            StoredValue::Spatial(point) => std::slice::from_ref(point),
            StoredValue::SpatialList(points) => points,
            _ => &[],
        };
        points.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldValue;
    use crate::entry::writer::EntryBuilder;

    #[test]
    fn reads_back_typed_values() {
        let mut builder = EntryBuilder::new();
        builder
            .write(0, "users/1")
            .write(1, 42i64)
            .write(2, FieldValue::List(vec![FieldValue::text("a"), FieldValue::Null, FieldValue::long(7)]))
            .write(3, SpatialPoint::new(10.0, 20.0))
            .write_dynamic("Color", "red");
        let reader = EntryReader::new(&builder.finish().unwrap()).unwrap();

        assert_eq!(reader.get(0).unwrap().read(), Some(&b"users/1"[..]));
        assert_eq!(reader.get(1).unwrap().field_type(), IndexEntryFieldType::TUPLE);
        assert_eq!(reader.get(1).unwrap().read_long(), Some(42));

        let list = reader.get(2).unwrap();
        assert_eq!(
            list.field_type(),
            IndexEntryFieldType::LIST | IndexEntryFieldType::RAW | IndexEntryFieldType::NULL | IndexEntryFieldType::TUPLE
        );
        let items: Vec<_> = list.read_many().collect();
        assert_eq!(items[0], FieldItem::Raw(b"a"));
        assert_eq!(items[1], FieldItem::Null);

        let spatial: Vec<_> = reader.get(3).unwrap().read_many_spatial().collect();
        assert_eq!(spatial, vec![SpatialPoint::new(10.0, 20.0)]);
        assert_eq!(reader.get_dynamic("Color").unwrap().read(), Some(&b"red"[..]));
        assert!(reader.get(9).is_none());
    }

    #[test]
    fn empty_strings_are_stored_as_empty() {
        let mut builder = EntryBuilder::new();
        builder.write(0, "");
        let reader = EntryReader::new(&builder.finish().unwrap()).unwrap();
        assert_eq!(reader.get(0).unwrap().field_type(), IndexEntryFieldType::EMPTY);
        assert_eq!(reader.get(0).unwrap().read_many().collect::<Vec<_>>(), vec![FieldItem::Empty]);
    }

    #[test]
    fn garbage_payload_is_corruption() {
        let err = EntryReader::new(&[0xFF; 3]).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Corruption);
    }
}
