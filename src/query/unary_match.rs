use std::cmp::Ordering;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::FieldId;
use crate::entry::{EntryReader, EntryStore, FieldItem, FieldReader};
use crate::query::matcher::{QueryCountConfidence, QueryMatch};

/// Field of a stored entry, by declared id or by dynamic name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    Known(FieldId),
    Dynamic(String),
}

impl FieldRef {
    pub fn read<'a>(&self, reader: &'a EntryReader) -> Option<FieldReader<'a>> {
        match self {
            FieldRef::Known(id) => reader.get(*id),
            FieldRef::Dynamic(name) => reader.get_dynamic(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperation {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    NotBetween,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryValue {
    Long(i64),
    Double(f64),
    Bytes(Vec<u8>),
}

impl UnaryValue {
    /// Orders a stored item against this value. `None` when the item has no
    /// comparable form (null, or text that does not parse as a number).
    pub fn compare(&self, item: &FieldItem<'_>) -> Option<Ordering> {
        match (self, item) {
            (_, FieldItem::Null) => None,
            (UnaryValue::Long(v), FieldItem::Tuple { long, .. }) => Some(long.cmp(v)),
            (UnaryValue::Long(v), FieldItem::Raw(bytes)) => {
                std::str::from_utf8(bytes).ok()?.parse::<i64>().ok().map(|long| long.cmp(v))
            }
            (UnaryValue::Double(v), FieldItem::Tuple { double, .. }) => double.partial_cmp(v),
            (UnaryValue::Double(v), FieldItem::Raw(bytes)) => {
                std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()?.partial_cmp(v)
            }
            (UnaryValue::Long(_) | UnaryValue::Double(_), FieldItem::Empty) => None,
            (UnaryValue::Bytes(v), FieldItem::Raw(bytes)) => Some(bytes.cmp(&v.as_slice())),
            (UnaryValue::Bytes(v), FieldItem::Tuple { text, .. }) => Some(text.cmp(&v.as_slice())),
            (UnaryValue::Bytes(v), FieldItem::Empty) => Some([0u8; 0].as_slice().cmp(v.as_slice())),
        }
    }

    fn kind_matches(&self, other: &UnaryValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn order_against(&self, other: &UnaryValue) -> Option<Ordering> {
        match (self, other) {
            (UnaryValue::Long(a), UnaryValue::Long(b)) => Some(a.cmp(b)),
            (UnaryValue::Double(a), UnaryValue::Double(b)) => a.partial_cmp(b),
            (UnaryValue::Bytes(a), UnaryValue::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Filters an inner match by reading a field of every candidate entry.
///
/// Entries without the field (or with a null value) only pass `NotEquals`
/// and `NotBetween`. List fields pass when any item passes.
pub struct UnaryMatch<M> {
    inner: M,
    store: EntryStore,
    field: FieldRef,
    operation: UnaryOperation,
    value: UnaryValue,
    upper: Option<UnaryValue>,
}

impl<M: QueryMatch> UnaryMatch<M> {
    pub fn new(inner: M, store: EntryStore, field: FieldRef, operation: UnaryOperation, value: UnaryValue) -> Result<Self> {
        if matches!(operation, UnaryOperation::Between | UnaryOperation::NotBetween) {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "range operations take two values, use UnaryMatch::between",
            ));
        }
        Ok(UnaryMatch { inner, store, field, operation, value, upper: None })
    }

    /// Entries whose value lies in `[low, high]`, or outside it when `negate` is set.
    /// The bounds are swapped when given in descending order.
    pub fn between(
        inner: M,
        store: EntryStore,
        field: FieldRef,
        low: UnaryValue,
        high: UnaryValue,
        negate: bool,
    ) -> Result<Self> {
        if !low.kind_matches(&high) {
            return Err(Error::new(ErrorKind::InvalidArgument, "range bounds must have the same type"));
        }
        let (low, high) = match low.order_against(&high) {
            Some(Ordering::Greater) => (high, low),
            Some(_) => (low, high),
            None => return Err(Error::new(ErrorKind::InvalidArgument, "range bounds are not comparable")),
        };
        let operation = if negate { UnaryOperation::NotBetween } else { UnaryOperation::Between };
        Ok(UnaryMatch { inner, store, field, operation, value: low, upper: Some(high) })
    }

    pub fn operation(&self) -> UnaryOperation {
        self.operation
    }

    fn item_matches(&self, item: &FieldItem<'_>) -> bool {
        let ordering = self.value.compare(item);
        match self.operation {
            UnaryOperation::Equals => ordering == Some(Ordering::Equal),
            UnaryOperation::NotEquals => ordering != Some(Ordering::Equal),
            UnaryOperation::GreaterThan => ordering == Some(Ordering::Greater),
            UnaryOperation::GreaterThanOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            UnaryOperation::LessThan => ordering == Some(Ordering::Less),
            UnaryOperation::LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            UnaryOperation::Between | UnaryOperation::NotBetween => {
                let upper = self.upper.as_ref().and_then(|upper| upper.compare(item));
                let inside = matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    && matches!(upper, Some(Ordering::Less | Ordering::Equal));
                inside == (self.operation == UnaryOperation::Between)
            }
        }
    }

    fn entry_matches(&self, entry_id: u64) -> Result<bool> {
        let reader = self.store.reader(entry_id)?;
        let Some(field) = self.field.read(&reader) else {
            return Ok(self.item_matches(&FieldItem::Null));
        };
        let mut items = field.read_many().peekable();
        if items.peek().is_none() {
            return Ok(self.item_matches(&FieldItem::Null));
        }
        Ok(items.any(|item| self.item_matches(&item)))
    }

    fn retain(&self, buffer: &mut [u64], count: usize) -> Result<usize> {
        let mut kept = 0;
        for i in 0..count {
            let id = buffer[i];
            if self.entry_matches(id)? {
                buffer[kept] = id;
                kept += 1;
            }
        }
        Ok(kept)
    }
}

impl<M: QueryMatch> QueryMatch for UnaryMatch<M> {
    fn count(&self) -> u64 {
        self.inner.count()
    }

    fn confidence(&self) -> QueryCountConfidence {
        QueryCountConfidence::Low
    }

    fn is_boosting(&self) -> bool {
        self.inner.is_boosting()
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        loop {
            let read = self.inner.fill(buffer)?;
            if read == 0 {
                return Ok(0);
            }
            let kept = self.retain(buffer, read)?;
            if kept > 0 {
                return Ok(kept);
            }
        }
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        let kept = self.inner.and_with(buffer, count)?;
        self.retain(buffer, kept)
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        self.inner.score(ids, scores, boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_across_stored_forms() {
        let tuple = FieldItem::Tuple { text: b"10", long: 10, double: 10.0 };
        assert_eq!(UnaryValue::Long(5).compare(&tuple), Some(Ordering::Greater));
        assert_eq!(UnaryValue::Double(10.5).compare(&tuple), Some(Ordering::Less));
        assert_eq!(UnaryValue::Long(7).compare(&FieldItem::Raw(b"7")), Some(Ordering::Equal));
        assert_eq!(UnaryValue::Long(7).compare(&FieldItem::Raw(b"seven")), None);
        assert_eq!(UnaryValue::Bytes(b"b".to_vec()).compare(&FieldItem::Raw(b"a")), Some(Ordering::Less));
        assert_eq!(UnaryValue::Bytes(b"a".to_vec()).compare(&FieldItem::Null), None);
    }
}
