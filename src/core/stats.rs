use serde::{Serialize, Deserialize};

/// Snapshot statistics reported by an index searcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub number_of_entries: u64,
    pub last_entry_id: u64,
    pub posting_lists: usize,
    pub fields: Vec<FieldStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStats {
    pub name: String,
    pub terms: usize,
    pub long_terms: usize,
    pub double_terms: usize,
    pub total_length: u64,
    pub entries_with_field: u64,
    pub suggestion_keys: usize,
}

impl FieldStats {
    pub fn average_length(&self) -> f32 {
        if self.entries_with_field == 0 {
            return 0.0;
        }
        self.total_length as f32 / self.entries_with_field as f32
    }
}
