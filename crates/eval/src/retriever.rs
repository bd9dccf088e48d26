//! Retrieval: narrow the rule table to the cases most relevant to an input.
//!
//! Retrieval only conditions generation. It never decides correctness, so
//! a failing backend degrades to load order instead of failing the session.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use casegate_core::{GrammaticalCase, RuleStore};

/// One case id as ranked by a similarity backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCase {
    pub code: String,
    /// Higher is more similar. Only compared, never interpreted.
    pub score: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("similarity index unavailable: {0}")]
    Unavailable(String),
}

/// An opaque similarity backend over case ids.
pub trait SimilarityIndex: Send + Sync {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedCase>, RetrievalError>;
}

pub struct Retriever {
    store: Arc<RuleStore>,
    index: Box<dyn SimilarityIndex>,
}

impl Retriever {
    pub fn new(store: Arc<RuleStore>, index: Box<dyn SimilarityIndex>) -> Self {
        Retriever { store, index }
    }

    /// A retriever backed by a `LexicalIndex` over the store's embedding text.
    pub fn lexical(store: Arc<RuleStore>) -> Self {
        let index = LexicalIndex::new(store.all_cases());
        Retriever::new(store, Box::new(index))
    }

    /// At most `k` cases, most relevant first, ties in load order.
    pub fn retrieve(&self, description: &str, k: usize) -> Vec<&GrammaticalCase> {
        if k == 0 {
            return Vec::new();
        }
        if description.trim().is_empty() {
            return self.first(k);
        }

        let ranked = match self.index.rank(description, k) {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed, falling back to load order");
                return self.first(k);
            }
        };

        let mut hits: Vec<(f64, usize)> = Vec::with_capacity(ranked.len());
        let mut seen: HashSet<usize> = HashSet::new();
        for hit in ranked {
            match self.store.position(&hit.code) {
                Some(pos) if seen.insert(pos) => hits.push((hit.score, pos)),
                Some(_) => {}
                None => tracing::debug!(code = %hit.code, "similarity index returned unknown case"),
            }
        }
        hits.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let cases = self.store.all_cases();
        hits.into_iter().take(k).map(|(_, pos)| &cases[pos]).collect()
    }

    fn first(&self, k: usize) -> Vec<&GrammaticalCase> {
        self.store.all_cases().iter().take(k).collect()
    }
}

// ──────────────────────────────────────────────
// LexicalIndex
// ──────────────────────────────────────────────

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it",
    "its", "of", "on", "or", "that", "the", "this", "to", "was", "with",
];

/// TF-IDF cosine similarity over each case's embedding text.
///
/// Deterministic and dependency-free; good enough to rank a few dozen
/// cases by word overlap.
pub struct LexicalIndex {
    codes: Vec<String>,
    vectors: Vec<HashMap<String, f64>>,
    idf: HashMap<String, f64>,
}

impl LexicalIndex {
    pub fn new(cases: &[GrammaticalCase]) -> Self {
        let docs: Vec<Vec<String>> = cases.iter().map(|c| terms(&c.embedding_text)).collect();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }
        let n = docs.len() as f64;
        let idf: HashMap<String, f64> = df
            .into_iter()
            .map(|(term, count)| (term.to_string(), ((n + 1.0) / (count as f64 + 1.0)).ln() + 1.0))
            .collect();

        let vectors = docs.iter().map(|doc| weigh(doc, &idf)).collect();

        LexicalIndex {
            codes: cases.iter().map(|c| c.code.clone()).collect(),
            vectors,
            idf,
        }
    }
}

impl SimilarityIndex for LexicalIndex {
    fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedCase>, RetrievalError> {
        let query = weigh(&terms(query), &self.idf);

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let dot: f64 = query
                    .iter()
                    .filter_map(|(term, w)| doc.get(term).map(|d| w * d))
                    .sum();
                (i, dot)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| RankedCase {
                code: self.codes[i].clone(),
                score,
            })
            .collect())
    }
}

/// Unit-length TF-IDF vector. Terms without an idf weight are dropped.
fn weigh(terms: &[String], idf: &HashMap<String, f64>) -> HashMap<String, f64> {
    let mut tf: HashMap<String, f64> = HashMap::new();
    for term in terms {
        if idf.contains_key(term) {
            *tf.entry(term.clone()).or_insert(0.0) += 1.0;
        }
    }
    for (term, weight) in tf.iter_mut() {
        *weight *= idf[term];
    }
    let norm = tf.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in tf.values_mut() {
            *weight /= norm;
        }
    }
    tf
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| stem(&w))
        .collect()
}

/// Crude suffix stripping so "feeling" meets "feel" and "emotions" meets "emotion".
fn stem(word: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(base) = word.strip_suffix(suffix) {
            if base.len() >= 3 && !base.ends_with('s') {
                return base.to_string();
            }
        }
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_common_suffixes() {
        assert_eq!(stem("feeling"), "feel");
        assert_eq!(stem("emotions"), "emotion");
        assert_eq!(stem("broken"), "broken");
        assert_eq!(stem("glass"), "glass");
    }

    #[test]
    fn terms_drop_stopwords_and_punctuation() {
        assert_eq!(terms("The chef, cooking dinner!"), vec!["chef", "cook", "dinner"]);
    }
}
