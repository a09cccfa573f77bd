use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::analysis::Analyzer;
use crate::core::constants::RESERVED_NAME_CHAR;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::FieldId;

/// How the writer turns a field value into terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldIndexingMode {
    /// Stored in the entry but never indexed.
    No,
    /// Analyzed when an analyzer is bound, otherwise indexed verbatim.
    Normal,
    /// Always indexed verbatim.
    Exact,
    /// Always analyzed.
    Search,
}

/// Field names must be non-empty and free of the reserved separator used to
/// name a field's internal trees.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument, "field names cannot be empty"));
    }
    if name.contains(RESERVED_NAME_CHAR) {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("field name {:?} contains a reserved character", name),
        ));
    }
    Ok(())
}

/// Static metadata of one indexed field.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub field_id: FieldId,
    pub field_name: String,
    pub mode: FieldIndexingMode,
    pub analyzer: Option<Arc<dyn Analyzer>>,
    pub has_suggestions: bool,
    pub has_spatial: bool,
}

impl FieldBinding {
    pub fn new(field_id: FieldId, field_name: impl Into<String>, mode: FieldIndexingMode) -> Self {
        FieldBinding {
            field_id,
            field_name: field_name.into(),
            mode,
            analyzer: None,
            has_suggestions: false,
            has_spatial: false,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.mode != FieldIndexingMode::No
    }

    /// The analyzer to run over this field's values, if any.
    pub fn effective_analyzer(&self) -> Option<&Arc<dyn Analyzer>> {
        match self.mode {
            FieldIndexingMode::No | FieldIndexingMode::Exact => None,
            FieldIndexingMode::Normal | FieldIndexingMode::Search => self.analyzer.as_ref(),
        }
    }
}

/// Field bindings of one index, addressable by id and by name.
#[derive(Debug, Clone, Default)]
pub struct IndexFieldsMapping {
    bindings: Vec<FieldBinding>,
    by_name: HashMap<String, usize>,
    default_analyzer: Option<Arc<dyn Analyzer>>,
}

impl IndexFieldsMapping {
    pub fn builder() -> IndexFieldsMappingBuilder {
        IndexFieldsMappingBuilder::default()
    }

    pub fn get(&self, field_id: FieldId) -> Option<&FieldBinding> {
        self.bindings.iter().find(|b| b.field_id == field_id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FieldBinding> {
        self.by_name.get(name).map(|&i| &self.bindings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Analyzer applied to fields that are not declared in the mapping.
    pub fn default_analyzer(&self) -> Option<&Arc<dyn Analyzer>> {
        self.default_analyzer.as_ref()
    }

    /// Binding used for a field discovered at write time.
    pub fn dynamic_binding(&self, name: &str) -> FieldBinding {
        let mut binding = FieldBinding::new(FieldId::MAX, name, FieldIndexingMode::Normal);
        binding.analyzer = self.default_analyzer.clone();
        binding
    }
}

#[derive(Default)]
pub struct IndexFieldsMappingBuilder {
    bindings: Vec<FieldBinding>,
    default_analyzer: Option<Arc<dyn Analyzer>>,
}

impl IndexFieldsMappingBuilder {
    /// Adds a field indexed verbatim, e.g. a primary key.
    pub fn exact(self, name: &str) -> Self {
        let id = self.bindings.len() as FieldId;
        self.binding(FieldBinding::new(id, name, FieldIndexingMode::Exact))
    }

    pub fn analyzed(self, name: &str, analyzer: Arc<dyn Analyzer>) -> Self {
        let id = self.bindings.len() as FieldId;
        let mut binding = FieldBinding::new(id, name, FieldIndexingMode::Search);
        binding.analyzer = Some(analyzer);
        self.binding(binding)
    }

    pub fn binding(mut self, binding: FieldBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Marks the last added field as tracking suggestions.
    pub fn with_suggestions(mut self) -> Self {
        if let Some(last) = self.bindings.last_mut() {
            last.has_suggestions = true;
        }
        self
    }

    pub fn with_spatial(mut self) -> Self {
        if let Some(last) = self.bindings.last_mut() {
            last.has_spatial = true;
        }
        self
    }

    pub fn default_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.default_analyzer = Some(analyzer);
        self
    }

    pub fn build(self) -> Result<IndexFieldsMapping> {
        let mut by_name = HashMap::with_capacity(self.bindings.len());
        for (i, binding) in self.bindings.iter().enumerate() {
            validate_field_name(&binding.field_name)?;
            if binding.mode == FieldIndexingMode::Search && binding.analyzer.is_none() {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("field '{}' is searchable but has no analyzer", binding.field_name),
                ));
            }
            if by_name.insert(binding.field_name.clone(), i).is_some()
                || self.bindings[..i].iter().any(|b| b.field_id == binding.field_id)
            {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("field '{}' (id {}) declared twice", binding.field_name, binding.field_id),
                ));
            }
        }
        Ok(IndexFieldsMapping {
            bindings: self.bindings,
            by_name,
            default_analyzer: self.default_analyzer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{KeywordAnalyzer, StandardAnalyzer};

    #[test]
    fn builder_assigns_dense_ids() {
        let mapping = IndexFieldsMapping::builder()
            .exact("Id")
            .analyzed("Content", Arc::new(StandardAnalyzer::standard()))
            .with_suggestions()
            .build()
            .unwrap();

        assert_eq!(mapping.get_by_name("Content").unwrap().field_id, 1);
        assert!(mapping.get(1).unwrap().has_suggestions);
        assert!(mapping.get(0).unwrap().effective_analyzer().is_none());
        assert!(mapping.get(1).unwrap().effective_analyzer().is_some());
    }

    #[test]
    fn exact_fields_ignore_bound_analyzer() {
        let mut binding = FieldBinding::new(0, "Id", FieldIndexingMode::Exact);
        binding.analyzer = Some(Arc::new(KeywordAnalyzer::new(true)));
        assert!(binding.effective_analyzer().is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = IndexFieldsMapping::builder().exact("Id").exact("Id").build();
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidArgument);
    }
}
