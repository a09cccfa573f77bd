use std::sync::Arc;
use crate::analysis::{Analyzer, TokenSpan};
use crate::core::constants::{EMPTY_VALUE, MAX_TERM_LENGTH, NULL_VALUE};
use crate::core::error::Result;
use crate::entry::spatial::geohash_prefixes;
use crate::entry::{EntryReader, FieldItem, FieldReader, IndexEntryFieldType};
use crate::index::{NumericKey, TermTree};
use crate::schema::{validate_field_name, FieldBinding, IndexFieldsMapping};

/// Terms one field of one entry contributes to the index.
#[derive(Debug, Clone, Default)]
pub struct FieldTerms {
    pub field_name: String,
    pub terms: Vec<(TermTree, Vec<u8>)>,
    /// Number of textual terms, repetitions included.
    pub length: u32,
    /// Textual terms that feed the suggestions table.
    pub suggestions: Vec<Vec<u8>>,
}

/// Derives the terms of an entry. Indexing and deletion both go through it, so
/// deleting re-derives exactly what was written.
pub struct TermExtractor {
    output: Vec<u8>,
    tokens: Vec<TokenSpan>,
}

impl Default for TermExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TermExtractor {
    pub fn new() -> Self {
        TermExtractor {
            output: Vec::new(),
            tokens: Vec::new(),
        }
    }

    pub fn extract(&mut self, mapping: &IndexFieldsMapping, reader: &EntryReader) -> Result<Vec<FieldTerms>> {
        let mut fields = Vec::new();
        for binding in mapping.iter().filter(|b| b.is_indexed()) {
            if let Some(field) = reader.get(binding.field_id) {
                fields.push(self.extract_field(binding, field)?);
            }
        }
        for (name, field) in reader.dynamic_fields() {
            validate_field_name(name)?;
            let binding = match mapping.get_by_name(name) {
                Some(declared) if !declared.is_indexed() => continue,
                Some(declared) => declared.clone(),
                None => mapping.dynamic_binding(name),
            };
            fields.push(self.extract_field(&binding, field)?);
        }
        Ok(fields)
    }

    fn extract_field(&mut self, binding: &FieldBinding, field: FieldReader<'_>) -> Result<FieldTerms> {
        let mut terms = FieldTerms {
            field_name: binding.field_name.clone(),
            ..FieldTerms::default()
        };
        let analyzer = binding.effective_analyzer().cloned();

        let shape = field.field_type();
        if shape.contains(IndexEntryFieldType::SPATIAL) {
            for point in field.read_many_spatial() {
                for prefix in geohash_prefixes(point)? {
                    terms.terms.push((TermTree::Text, prefix.into_bytes()));
                }
            }
            return Ok(terms);
        }

        for item in field.read_many() {
            match item {
                FieldItem::Null => self.push_sentinel(&mut terms, NULL_VALUE),
                FieldItem::Empty => self.push_sentinel(&mut terms, EMPTY_VALUE),
                FieldItem::Raw(bytes) => self.push_text(&mut terms, binding, analyzer.as_ref(), bytes),
                FieldItem::Tuple { text, long, double } => {
                    self.push_text(&mut terms, binding, analyzer.as_ref(), text);
                    terms.terms.push((TermTree::Long, NumericKey::from_long(long).to_vec()));
                    terms.terms.push((TermTree::Double, NumericKey::from_double(double).to_vec()));
                }
            }
        }
        Ok(terms)
    }

    fn push_sentinel(&self, terms: &mut FieldTerms, sentinel: &[u8]) {
        terms.terms.push((TermTree::Text, sentinel.to_vec()));
        terms.length += 1;
    }

    fn push_text(
        &mut self,
        terms: &mut FieldTerms,
        binding: &FieldBinding,
        analyzer: Option<&Arc<dyn Analyzer>>,
        value: &[u8],
    ) {
        if value.is_empty() {
            self.push_sentinel(terms, EMPTY_VALUE);
            return;
        }
        let Some(analyzer) = analyzer else {
            push_term(terms, binding, value);
            return;
        };

        let (bytes, count) = analyzer.output_buffer_size(value.len());
        self.output.reserve(bytes);
        self.tokens.reserve(count);
        analyzer.execute(value, &mut self.output, &mut self.tokens);
        for token in &self.tokens {
            let term = token.slice(&self.output);
            if !term.is_empty() {
                push_term(terms, binding, term);
            }
        }
    }
}

fn push_term(terms: &mut FieldTerms, binding: &FieldBinding, term: &[u8]) {
    let term = &term[..term.len().min(MAX_TERM_LENGTH)];
    terms.terms.push((TermTree::Text, term.to_vec()));
    terms.length += 1;
    if binding.has_suggestions {
        terms.suggestions.push(term.to_vec());
    }
}
