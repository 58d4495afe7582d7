//! Mapping from the schema descriptor to a tantivy schema
//!
//! Every free-text field of every collection becomes its own tantivy text
//! field named `collection/field`, analyzed by the text or the HTML analyzer
//! depending on its declared kind. A stored raw `reference` field holds the
//! `collection/id` key used for deletes and for reading hits back.

use ahash::AHashMap;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions,
};
use tantivy::tokenizer::{
    AsciiFoldingFilter, Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer,
    StopWordFilter, TextAnalyzer, TokenizerManager,
};

use super::tokenizer::HtmlStripTokenizer;
use crate::model::{FieldKind, SchemaProvider};

/// Analyzer for plain long-form text
pub const TEXT_ANALYZER: &str = "searchd_text";

/// Analyzer for HTML-flavored text
pub const HTML_ANALYZER: &str = "searchd_html";

/// Stored raw field holding the entity reference
pub const REFERENCE_FIELD: &str = "reference";

/// Tokens longer than this are dropped before analysis
const MAX_TOKEN_LEN: usize = 40;

/// One indexed field of a collection
#[derive(Debug, Clone)]
pub struct MappedField {
    /// Key of the value in the record payload
    pub name: String,
    pub field: Field,
    pub kind: FieldKind,
}

/// Tantivy schema derived from a schema descriptor
#[derive(Debug, Clone)]
pub struct SearchSchema {
    schema: Schema,
    reference: Field,
    collections: AHashMap<String, Vec<MappedField>>,
    language: Language,
}

impl SearchSchema {
    /// Map every free-text field of `provider`'s schema
    ///
    /// Fields of a kind no analyzer exists for are skipped with a warning, as
    /// are repeated declarations of a collection or of a field within one.
    pub fn from_provider(provider: &impl SchemaProvider, language: Language) -> Self {
        let descriptor = provider.schema();
        let mut builder = Schema::builder();
        let reference = builder.add_text_field(REFERENCE_FIELD, STRING | STORED);
        let mut collections: AHashMap<String, Vec<MappedField>> =
            AHashMap::with_capacity(descriptor.len());
        let mut skipped = 0usize;

        for collection in descriptor.collections() {
            if collections.contains_key(&collection.name) {
                tracing::warn!(
                    collection = %collection.name,
                    "Collection declared twice, keeping the first declaration"
                );
                continue;
            }
            let mut mapped: Vec<MappedField> = Vec::new();
            for spec in collection.free_text_fields() {
                if mapped.iter().any(|m| m.name == spec.name) {
                    tracing::warn!(
                        collection = %collection.name,
                        field = %spec.name,
                        "Field declared twice, keeping the first declaration"
                    );
                    skipped += 1;
                    continue;
                }
                let analyzer = match spec.kind {
                    FieldKind::String | FieldKind::Text => TEXT_ANALYZER,
                    FieldKind::HtmlStrict | FieldKind::HtmlPermissive => HTML_ANALYZER,
                    FieldKind::Other(ref kind) => {
                        tracing::warn!(
                            collection = %collection.name,
                            field = %spec.name,
                            kind = %kind,
                            "Unsupported field kind, field will not be indexed"
                        );
                        skipped += 1;
                        continue;
                    }
                };

                let field = builder.add_text_field(
                    &format!("{}/{}", collection.name, spec.name),
                    text_options(analyzer),
                );
                mapped.push(MappedField {
                    name: spec.name.clone(),
                    field,
                    kind: spec.kind.clone(),
                });
            }
            collections.insert(collection.name.clone(), mapped);
        }

        let mapping = Self {
            schema: builder.build(),
            reference,
            collections,
            language,
        };
        tracing::debug!(
            collections = mapping.collections.len(),
            fields = mapping.num_text_fields(),
            skipped,
            "Mapped schema descriptor"
        );
        mapping
    }

    /// Register the text and HTML analyzers on an index's tokenizer manager
    pub fn register_tokenizers(&self, manager: &TokenizerManager) {
        manager.register(TEXT_ANALYZER, text_analyzer(self.language));
        manager.register(HTML_ANALYZER, html_analyzer(self.language));
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn reference_field(&self) -> Field {
        self.reference
    }

    /// Indexed fields of `collection`, or `None` if the schema does not know it
    #[must_use]
    pub fn collection(&self, collection: &str) -> Option<&[MappedField]> {
        self.collections.get(collection).map(Vec::as_slice)
    }

    /// Every indexed text field across all collections
    pub fn text_fields(&self) -> impl Iterator<Item = &MappedField> {
        self.collections.values().flatten()
    }

    #[must_use]
    pub fn num_text_fields(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}

fn text_options(analyzer: &str) -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(analyzer)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    )
}

fn stop_words(language: Language) -> StopWordFilter {
    StopWordFilter::new(language).unwrap_or_else(|| {
        tracing::debug!(?language, "No stop word list for language");
        StopWordFilter::remove(Vec::<String>::new())
    })
}

/// Word tokens, lowercased, stop words removed, stemmed, ASCII folded
pub fn text_analyzer(language: Language) -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(stop_words(language))
        .filter(Stemmer::new(language))
        .filter(AsciiFoldingFilter)
        .build()
}

/// The text analyzer applied to the text content of an HTML fragment
pub fn html_analyzer(language: Language) -> TextAnalyzer {
    TextAnalyzer::builder(HtmlStripTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(stop_words(language))
        .filter(Stemmer::new(language))
        .filter(AsciiFoldingFilter)
        .build()
}
