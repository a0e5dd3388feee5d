//! TF-IDF cosine similarity between two token sequences.
//!
//! Every comparison fits a fresh vectorizer over a corpus made of exactly the
//! two documents being compared. With `n = 2` the smoothed idf only separates
//! shared terms (`idf = 1`) from one-sided terms (`idf = 1 + ln 1.5`), so the
//! score behaves like a weighted, length-normalized term overlap.

use std::collections::BTreeMap;

use crate::normalizer::TokenSequence;

/// Sparse L2-normalized term weights keyed by vocabulary index.
pub type SparseVector = BTreeMap<usize, f64>;

/// Vectorizer fitted on a small in-memory corpus.
///
/// Terms are runs of two or more word characters, term frequency is the raw
/// count and idf is smoothed: `ln((1 + n) / (1 + df)) + 1`.
#[derive(Debug)]
pub struct TfIdfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Fit on `documents`. Returns `None` when the corpus has no terms at all.
    pub fn fit(documents: &[&str]) -> Option<Self> {
        let analyzed: Vec<Vec<&str>> = documents.iter().map(|doc| analyze(doc)).collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &analyzed {
            let mut seen: Vec<&str> = terms.clone();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }
        if document_frequency.is_empty() {
            return None;
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), index);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        Some(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// L2-normalized tf-idf vector of `document`. Terms outside the fitted
    /// vocabulary are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut vector = SparseVector::new();
        for term in analyze(document) {
            if let Some(&index) = self.vocabulary.get(term) {
                *vector.entry(index).or_insert(0.0) += 1.0;
            }
        }
        for (index, weight) in vector.iter_mut() {
            *weight *= self.idf[*index];
        }

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Split a document into vectorizer terms.
fn analyze(document: &str) -> Vec<&str> {
    document
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|term| term.chars().count() >= 2)
        .collect()
}

/// Cosine similarity of two sparse vectors.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(index, x)| b.get(index).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Similarity of two token sequences in `[0, 1]`.
///
/// Empty sequences, sequences without vectorizer terms and pairs without a
/// shared term score exactly `0.0` without fitting anything.
pub fn score(a: &TokenSequence, b: &TokenSequence) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let doc_a = a.to_document();
    let doc_b = b.to_document();
    let terms_a = analyze(&doc_a);
    let terms_b = analyze(&doc_b);
    if terms_a.is_empty() || terms_b.is_empty() {
        return 0.0;
    }
    if !terms_a.iter().any(|term| terms_b.contains(term)) {
        return 0.0;
    }

    let Some(vectorizer) = TfIdfVectorizer::fit(&[doc_a.as_str(), doc_b.as_str()]) else {
        return 0.0;
    };
    let similarity = cosine_similarity(
        &vectorizer.transform(&doc_a),
        &vectorizer.transform(&doc_b),
    );
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(0.0, 1.0)
}
