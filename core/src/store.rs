//! The keyed store behind the four index tables.
//!
//! Counter tables (`doc_frequency_of_term`, `corpus_info`) are only ever
//! changed through the `add_*` methods, which read the stored value, add the
//! delta and write the sum back as one atomic step per key. The addition is
//! not idempotent: applying the same delta twice counts it twice.

use crate::{CorpusStats, DocId, DocInfo, PostingRow};
use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DOC_FREQUENCY_TABLE: &str = "doc_frequency_of_term";
pub const POSTINGS_TABLE: &str = "term_frequency_in_doc";
pub const DOC_INFO_TABLE: &str = "doc_info";
pub const CORPUS_INFO_TABLE: &str = "corpus_info";

/// Row counts per table, reported by the connection check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableSizes {
    pub doc_frequency_of_term: usize,
    pub term_frequency_in_doc: usize,
    pub doc_info: usize,
    pub corpus_info: usize,
}

pub trait IndexStore: Send + Sync {
    fn doc_frequency(&self, corpus: &str, term: &str) -> Result<Option<u64>>;
    /// Add `delta` to the stored document frequency (absent counts as 0) and return the new value.
    fn add_doc_frequency(&self, corpus: &str, term: &str, delta: u64) -> Result<u64>;

    /// Write a posting, replacing whatever was stored under its key.
    fn put_posting(&self, row: &PostingRow) -> Result<()>;
    /// All postings of `term` in `corpus`, ordered by doc id.
    fn postings_for_term(&self, corpus: &str, term: &str) -> Result<Vec<PostingRow>>;

    fn put_doc_info(&self, info: &DocInfo) -> Result<()>;
    fn doc_info(&self, doc_id: DocId) -> Result<Option<DocInfo>>;

    fn corpus_stats(&self, corpus: &str) -> Result<Option<CorpusStats>>;
    /// Add both fields of `delta` to the stored stats and return the merged value.
    fn add_corpus_stats(&self, corpus: &str, delta: CorpusStats) -> Result<CorpusStats>;

    fn table_sizes(&self) -> Result<TableSizes>;

    /// Make prior writes durable.
    fn flush(&self) -> Result<()> { Ok(()) }
}

#[derive(Default)]
struct Tables {
    doc_frequency: HashMap<(String, String), u64>,
    postings: BTreeMap<(String, String, DocId), PostingRow>,
    doc_info: HashMap<DocId, DocInfo>,
    corpus_info: HashMap<String, CorpusStats>,
}

/// Non-persistent store, used by tests and one-shot pipelines.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl IndexStore for MemoryStore {
    fn doc_frequency(&self, corpus: &str, term: &str) -> Result<Option<u64>> {
        let t = self.tables.read();
        Ok(t.doc_frequency.get(&(corpus.to_string(), term.to_string())).copied())
    }

    fn add_doc_frequency(&self, corpus: &str, term: &str, delta: u64) -> Result<u64> {
        let mut t = self.tables.write();
        let slot = t.doc_frequency.entry((corpus.to_string(), term.to_string())).or_insert(0);
        *slot += delta;
        Ok(*slot)
    }

    fn put_posting(&self, row: &PostingRow) -> Result<()> {
        let key = (row.term.clone(), row.corpus_name.clone(), row.doc_id);
        self.tables.write().postings.insert(key, row.clone());
        Ok(())
    }

    fn postings_for_term(&self, corpus: &str, term: &str) -> Result<Vec<PostingRow>> {
        let t = self.tables.read();
        let lo = (term.to_string(), corpus.to_string(), DocId::MIN);
        let hi = (term.to_string(), corpus.to_string(), DocId::MAX);
        Ok(t.postings.range(lo..=hi).map(|(_, row)| row.clone()).collect())
    }

    fn put_doc_info(&self, info: &DocInfo) -> Result<()> {
        self.tables.write().doc_info.insert(info.doc_id, info.clone());
        Ok(())
    }

    fn doc_info(&self, doc_id: DocId) -> Result<Option<DocInfo>> {
        Ok(self.tables.read().doc_info.get(&doc_id).cloned())
    }

    fn corpus_stats(&self, corpus: &str) -> Result<Option<CorpusStats>> {
        Ok(self.tables.read().corpus_info.get(corpus).copied())
    }

    fn add_corpus_stats(&self, corpus: &str, delta: CorpusStats) -> Result<CorpusStats> {
        let mut t = self.tables.write();
        let slot = t.corpus_info.entry(corpus.to_string()).or_default();
        *slot = slot.merged(delta);
        Ok(*slot)
    }

    fn table_sizes(&self) -> Result<TableSizes> {
        let t = self.tables.read();
        Ok(TableSizes {
            doc_frequency_of_term: t.doc_frequency.len(),
            term_frequency_in_doc: t.postings.len(),
            doc_info: t.doc_info.len(),
            corpus_info: t.corpus_info.len(),
        })
    }
}
