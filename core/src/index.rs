use serde::{Deserialize, Serialize};

pub type DocId = i64;

/// One row of `term_frequency_in_doc`, keyed by (term, corpus_name, doc_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRow {
    pub term: String,
    pub corpus_name: String,
    pub doc_id: DocId,
    pub doc_title: String,
    pub term_frequency: u64,
}

/// One row of `doc_info`, keyed by doc_id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocInfo {
    pub doc_id: DocId,
    pub doc_title: String,
    pub doc_length: u64,
}

/// Value of `corpus_info` for one corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub doc_count: u64,
    pub total_length: u64,
}

impl CorpusStats {
    pub fn new(doc_count: u64, total_length: u64) -> Self { Self { doc_count, total_length } }

    /// Average document length, `None` for a corpus without documents.
    pub fn avg_doc_len(&self) -> Option<f64> {
        if self.doc_count == 0 { return None; }
        Some(self.total_length as f64 / self.doc_count as f64)
    }

    pub fn merged(self, delta: CorpusStats) -> Self {
        Self {
            doc_count: self.doc_count + delta.doc_count,
            total_length: self.total_length + delta.total_length,
        }
    }
}

/// A single line of the ranking output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub doc_title: String,
    pub doc_rank: f64,
}
