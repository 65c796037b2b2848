use crate::error::{Result, SearchError};
use crate::tokenize::tokenize;
use haste_code_chunker::{Unit, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// BM25 tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term-frequency saturation
    pub k1: f64,
    /// Document-length normalization, in `[0, 1]`
    pub b: f64,
    /// Extra occurrences credited to each term of a unit's name
    pub name_boost: u32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            name_boost: 2,
        }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(SearchError::invalid_parameter(format!(
                "bm25.k1 must be a non-negative number, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(SearchError::invalid_parameter(format!(
                "bm25.b must be within [0, 1], got {}",
                self.b
            )));
        }
        Ok(())
    }
}

/// One unit's relevance to a query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredUnit {
    pub id: UnitId,
    pub lexical: f64,
    pub semantic: Option<f64>,
    /// Score used for ranking; equals `lexical` until a ranker blends it
    pub combined: f64,
}

impl ScoredUnit {
    #[must_use]
    pub const fn lexical(id: UnitId, score: f64) -> Self {
        Self {
            id,
            lexical: score,
            semantic: None,
            combined: score,
        }
    }
}

/// A term occurrence count within one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub unit: UnitId,
    pub tf: u32,
}

/// In-memory BM25 index over one unit set
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    config: Bm25Config,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f64,
}

impl LexicalIndex {
    /// Index every unit's text; name terms count `name_boost` extra times
    #[must_use]
    pub fn build(units: &[Unit], config: Bm25Config) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(units.len());

        for unit in units {
            let mut terms = tokenize(&unit.text);
            let name_terms = tokenize(&unit.name);
            for _ in 0..config.name_boost {
                terms.extend(name_terms.iter().cloned());
            }

            let mut counts: HashMap<String, u32> = HashMap::new();
            for term in &terms {
                *counts.entry(term.clone()).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push(Posting { unit: unit.id, tf });
            }
            doc_lengths.push(u32::try_from(terms.len()).unwrap_or(u32::MAX));
        }

        for list in postings.values_mut() {
            list.sort_by_key(|p| p.unit);
        }

        let total: f64 = doc_lengths.iter().map(|&len| f64::from(len)).sum();
        #[allow(clippy::cast_precision_loss)]
        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            total / doc_lengths.len() as f64
        };

        log::debug!(
            "Lexical index: {} units, {} terms, avg length {avg_doc_length:.1}",
            doc_lengths.len(),
            postings.len()
        );

        Self {
            config,
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    #[must_use]
    pub const fn config(&self) -> &Bm25Config {
        &self.config
    }

    /// Number of units containing `term`
    #[must_use]
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map_or(&[], Vec::as_slice)
    }

    #[allow(clippy::cast_precision_loss)]
    fn idf(&self, df: usize) -> f64 {
        let n = self.doc_lengths.len() as f64;
        let df = df as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 score of every unit, indexed by `UnitId`.
    ///
    /// Query terms are deduplicated and accumulated in ascending term order
    /// so equal inputs always produce bit-identical scores.
    #[must_use]
    pub fn score(&self, query: &str) -> Vec<ScoredUnit> {
        let mut scores = vec![0.0f64; self.doc_lengths.len()];
        let terms: BTreeSet<String> = tokenize(query).into_iter().collect();
        let Bm25Config { k1, b, .. } = self.config;
        let avg = if self.avg_doc_length > 0.0 {
            self.avg_doc_length
        } else {
            1.0
        };

        for term in &terms {
            let Some(list) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(list.len());
            for posting in list {
                let tf = f64::from(posting.tf);
                let len = f64::from(self.doc_lengths[posting.unit.index()]);
                let norm = k1 * (1.0 - b + b * len / avg);
                scores[posting.unit.index()] += idf * tf * (k1 + 1.0) / (tf + norm);
            }
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(idx, score)| ScoredUnit::lexical(UnitId(idx), score))
            .collect()
    }
}
