//! BM25 ranking over the stored index tables.

use crate::config::{BM25_B, BM25_K1, TOP_K};
use crate::store::IndexStore;
use crate::{DocId, DocInfo, PostingRow, RankedDoc};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How a ranking ended. Every variant is a successful query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOutcome {
    Ranked,
    /// None of the query terms are in the vocabulary.
    NoVocabulary,
    /// The corpus has no statistics (or no documents).
    NoCorpusStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub outcome: RankOutcome,
    /// Documents that scored before truncation.
    pub candidates: usize,
    pub results: Vec<RankedDoc>,
}

impl Ranking {
    fn empty(outcome: RankOutcome) -> Self {
        Self { outcome, candidates: 0, results: Vec::new() }
    }
}

/// Distinct lower-cased whitespace-separated terms of a query.
pub fn query_terms(query: &str) -> BTreeSet<String> {
    query.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Contribution of one term to one document:
/// `ln(N/df) * (k1+1)*tf / (tf + k1*(1 - b + b*dl/avgdl))`.
/// The idf is unsmoothed.
pub fn term_score(term_frequency: u64, doc_length: u64, doc_frequency: u64, total_docs: u64, avg_doc_len: f64) -> f64 {
    let tf = term_frequency as f64;
    let idf = (total_docs as f64 / doc_frequency as f64).ln();
    let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * doc_length as f64 / avg_doc_len);
    idf * (BM25_K1 + 1.0) * tf / (tf + norm)
}

/// Sort by descending rank, ties by ascending doc id, and keep the first `k`.
pub fn top_k(mut docs: Vec<RankedDoc>, k: usize) -> Vec<RankedDoc> {
    docs.sort_by(|a, b| {
        b.doc_rank
            .total_cmp(&a.doc_rank)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
            .then_with(|| a.doc_title.cmp(&b.doc_title))
    });
    docs.truncate(k);
    docs
}

/// Rank the documents of `corpus` against `query`, keeping the top ten.
pub fn rank_query<S: IndexStore + ?Sized>(store: &S, corpus: &str, query: &str) -> Result<Ranking> {
    let terms = query_terms(query);

    let mut vocabulary: BTreeMap<String, u64> = BTreeMap::new();
    for term in &terms {
        if let Some(df) = store.doc_frequency(corpus, term)? {
            vocabulary.insert(term.clone(), df);
        }
    }
    if vocabulary.is_empty() {
        tracing::debug!(corpus, terms = terms.len(), "no query term in vocabulary");
        return Ok(Ranking::empty(RankOutcome::NoVocabulary));
    }

    let mut postings: Vec<PostingRow> = Vec::new();
    for term in vocabulary.keys() {
        postings.extend(store.postings_for_term(corpus, term)?);
    }

    let doc_ids: BTreeSet<DocId> = postings.iter().map(|p| p.doc_id).collect();
    let mut docs: HashMap<DocId, DocInfo> = HashMap::with_capacity(doc_ids.len());
    for doc_id in doc_ids {
        if let Some(info) = store.doc_info(doc_id)? {
            docs.insert(doc_id, info);
        }
    }

    let (stats, avg_doc_len) = match store.corpus_stats(corpus)?.and_then(|s| s.avg_doc_len().map(|avg| (s, avg))) {
        Some(found) => found,
        None => {
            tracing::debug!(corpus, "corpus statistics missing");
            return Ok(Ranking::empty(RankOutcome::NoCorpusStats));
        }
    };

    let mut scores: BTreeMap<(DocId, String), f64> = BTreeMap::new();
    for p in &postings {
        let df = match vocabulary.get(&p.term) {
            Some(&df) if df > 0 => df,
            _ => continue,
        };
        let doc = match docs.get(&p.doc_id) {
            Some(d) if d.doc_title == p.doc_title => d,
            _ => continue,
        };
        let contribution = term_score(p.term_frequency, doc.doc_length, df, stats.doc_count, avg_doc_len);
        *scores.entry((p.doc_id, p.doc_title.clone())).or_insert(0.0) += contribution;
    }

    let candidates = scores.len();
    let ranked: Vec<RankedDoc> = scores
        .into_iter()
        .map(|((doc_id, doc_title), doc_rank)| RankedDoc { doc_id, doc_title, doc_rank })
        .collect();
    let results = top_k(ranked, TOP_K);
    tracing::debug!(corpus, vocabulary = vocabulary.len(), postings = postings.len(), candidates, returned = results.len(), "query ranked");
    Ok(Ranking { outcome: RankOutcome::Ranked, candidates, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::CorpusStats;

    #[test]
    fn worked_example() {
        let s = term_score(3, 10, 1, 2, 10.0);
        assert!((s - 1.0893).abs() < 1e-4, "{s}");
        let expected = (2.0f64).ln() * 6.6 / 4.2;
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn query_terms_are_lowercased_and_deduplicated() {
        let t = query_terms("  Rust rust RUST  lang ");
        assert_eq!(t.into_iter().collect::<Vec<_>>(), vec!["lang", "rust"]);
    }

    #[test]
    fn ties_break_on_doc_id() {
        let docs = vec![
            RankedDoc { doc_id: 9, doc_title: "a".into(), doc_rank: 1.0 },
            RankedDoc { doc_id: 2, doc_title: "b".into(), doc_rank: 1.0 },
            RankedDoc { doc_id: 5, doc_title: "c".into(), doc_rank: 2.0 },
        ];
        let ids: Vec<DocId> = top_k(docs, 10).iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[test]
    fn ordering_is_total_over_extreme_ranks() {
        let rank = |doc_id: DocId, doc_rank: f64| RankedDoc { doc_id, doc_title: "t".into(), doc_rank };
        let docs = vec![rank(1, 0.0), rank(2, f64::INFINITY), rank(3, -0.0), rank(4, 0.5), rank(5, 0.0)];
        let ids: Vec<DocId> = top_k(docs, 10).iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![2, 4, 1, 5, 3]);
    }

    #[test]
    fn missing_corpus_stats_is_empty_success() {
        let store = MemoryStore::new();
        store.add_doc_frequency("c", "cat", 1).unwrap();
        let r = rank_query(&store, "c", "cat").unwrap();
        assert_eq!(r.outcome, RankOutcome::NoCorpusStats);
        assert!(r.results.is_empty());
    }

    #[test]
    fn posting_with_stale_title_does_not_join() {
        let store = MemoryStore::new();
        store.add_doc_frequency("c", "cat", 1).unwrap();
        store.add_corpus_stats("c", CorpusStats::new(2, 4)).unwrap();
        store.put_posting(&PostingRow { term: "cat".into(), corpus_name: "c".into(), doc_id: 1, doc_title: "Old".into(), term_frequency: 1 }).unwrap();
        store.put_doc_info(&DocInfo { doc_id: 1, doc_title: "New".into(), doc_length: 2 }).unwrap();
        let r = rank_query(&store, "c", "cat").unwrap();
        assert_eq!(r.outcome, RankOutcome::Ranked);
        assert!(r.results.is_empty());
    }
}
