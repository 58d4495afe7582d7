//! Fuzzy matching across every mapped text field
//!
//! The query text is run through each field's own analyzer so that stemmed
//! and folded terms line up with the indexed ones. Every resulting term
//! becomes a fuzzy term query with edit distance 1 (transpositions count as
//! one edit); all of them are OR-ed together. Fuzzy clauses score as a
//! constant, so each term also gets a boosted exact clause that ranks
//! literal matches above near misses.

use ahash::AHashSet;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Value};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::{Index, Searcher, TantivyDocument, Term};

use super::errors::{SearchError, SearchResult};
use super::schema::SearchSchema;
use crate::store::EntityRef;

/// Maximum edit distance between a query term and an indexed term
pub const FUZZY_DISTANCE: u8 = 1;

/// Weight of the exact-term clause relative to its fuzzy sibling
const EXACT_BOOST: f32 = 2.0;

/// Analyzer registered for `field` on `index`, if it is an indexed text field
pub(crate) fn text_analyzer_for(index: &Index, field: Field) -> Option<TextAnalyzer> {
    let schema = index.schema();
    let field_entry = schema.get_field_entry(field);

    if let FieldType::Str(text_options) = field_entry.field_type()
        && let Some(indexing_options) = text_options.get_indexing_options()
    {
        return index.tokenizers().get(indexing_options.tokenizer());
    }
    None
}

/// Build the disjunction of fuzzy term queries for `text`
///
/// Returns `None` when the text produces no terms at all, e.g. when it
/// consists only of stop words or punctuation.
pub(crate) fn build_fuzzy_query(
    mapping: &SearchSchema,
    index: &Index,
    text: &str,
) -> Option<Box<dyn Query>> {
    let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    for mapped in mapping.text_fields() {
        let Some(mut analyzer) = text_analyzer_for(index, mapped.field) else {
            continue;
        };
        let mut token_stream = analyzer.token_stream(text);
        token_stream.process(&mut |token| {
            let term = Term::from_field_text(mapped.field, &token.text);
            let exact = TermQuery::new(term.clone(), IndexRecordOption::WithFreqs);
            let fuzzy = FuzzyTermQuery::new(term, FUZZY_DISTANCE, true);
            subqueries.push((
                Occur::Should,
                Box::new(BoostQuery::new(Box::new(exact), EXACT_BOOST)) as Box<dyn Query>,
            ));
            subqueries.push((Occur::Should, Box::new(fuzzy) as Box<dyn Query>));
        });
    }

    if subqueries.is_empty() {
        return None;
    }
    Some(Box::new(BooleanQuery::new(subqueries)))
}

/// Run `query` and read back the references of the hits, best first
///
/// A reference seen again further down the ranking is dropped; the first
/// occurrence keeps its position.
pub(crate) fn collect_references(
    mapping: &SearchSchema,
    searcher: &Searcher,
    query: &dyn Query,
    limit: usize,
) -> SearchResult<Vec<EntityRef>> {
    let top_docs = searcher
        .search(query, &TopDocs::with_limit(limit.max(1)))
        .map_err(|e| SearchError::SearchExecution(format!("Failed to execute search query: {e}")))?;

    let hits = top_docs.len();
    let mut seen: AHashSet<String> = AHashSet::with_capacity(hits);
    let mut references = Vec::with_capacity(hits);
    let mut duplicates = 0usize;

    for (_score, doc_address) in top_docs {
        let doc: TantivyDocument = searcher.doc(doc_address).map_err(|e| {
            SearchError::SearchExecution(format!("Failed to retrieve document: {e}"))
        })?;

        let Some(raw) = doc
            .get_first(mapping.reference_field())
            .and_then(|v| v.as_str())
        else {
            tracing::warn!(?doc_address, "Hit without stored reference");
            continue;
        };

        if !seen.insert(raw.to_string()) {
            duplicates += 1;
            continue;
        }
        match raw.parse::<EntityRef>() {
            Ok(reference) => references.push(reference),
            Err(e) => tracing::warn!(error = %e, "Hit with malformed stored reference"),
        }
    }

    tracing::debug!(hits, duplicates, results = references.len(), "Search finished");
    Ok(references)
}
