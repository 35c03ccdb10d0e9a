//! Reduce side of the index build.
//!
//! Both aggregators accumulate whatever batches of events they are handed and
//! only touch the store on `flush`, so a key whose events arrive over several
//! calls is still written once per run.

use crate::mapper::{parse_frequency_event, parse_posting_event, PostingEvent};
use crate::store::IndexStore;
use crate::{CorpusStats, DocId, DocInfo, PostingRow};
use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocFrequencySummary {
    pub terms_written: usize,
    pub skipped_lines: usize,
}

/// Sums `(term, count)` events and merges them into `doc_frequency_of_term`.
#[derive(Debug, Default)]
pub struct DocFrequencyAggregator {
    deltas: HashMap<String, u64>,
    skipped: usize,
}

impl DocFrequencyAggregator {
    pub fn new() -> Self { Self::default() }

    pub fn accept(&mut self, term: &str, count: u64) {
        *self.deltas.entry(term.to_string()).or_insert(0) += count;
    }

    pub fn accept_group<I: IntoIterator<Item = u64>>(&mut self, term: &str, counts: I) {
        let sum: u64 = counts.into_iter().sum();
        *self.deltas.entry(term.to_string()).or_insert(0) += sum;
    }

    /// Accept one `term<TAB>count` line; malformed lines are counted and skipped.
    pub fn accept_line(&mut self, line: &str) -> bool {
        match parse_frequency_event(line) {
            Some((term, count)) => { self.accept(&term, count); true }
            None => { self.skipped += 1; false }
        }
    }

    pub fn pending_terms(&self) -> usize { self.deltas.len() }

    /// Add every accumulated delta to the stored counter of its term.
    pub fn flush<S: IndexStore + ?Sized>(self, store: &S, corpus: &str) -> Result<DocFrequencySummary> {
        let terms_written = self.deltas.len();
        for (term, delta) in self.deltas {
            let total = store.add_doc_frequency(corpus, &term, delta)?;
            tracing::trace!(%term, delta, total, "doc frequency updated");
        }
        tracing::debug!(corpus, terms_written, skipped = self.skipped, "doc frequencies flushed");
        Ok(DocFrequencySummary { terms_written, skipped_lines: self.skipped })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostingSummary {
    pub postings_written: usize,
    pub documents_written: usize,
    pub skipped_lines: usize,
    /// Statistics of this run alone, before merging into the corpus totals.
    pub run_stats: CorpusStats,
    pub corpus_stats: CorpusStats,
}

type PostingKey = (DocId, String, String);
type DocKey = (DocId, String);

/// Sums `(doc_id, doc_title, term, count)` events into term frequencies and
/// document lengths.
#[derive(Debug, Default)]
pub struct PostingAggregator {
    postings: BTreeMap<PostingKey, u64>,
    doc_lengths: BTreeMap<DocKey, u64>,
    skipped: usize,
}

impl PostingAggregator {
    pub fn new() -> Self { Self::default() }

    pub fn accept(&mut self, doc_id: DocId, doc_title: &str, term: &str, count: u64) {
        *self.postings.entry((doc_id, doc_title.to_string(), term.to_string())).or_insert(0) += count;
        *self.doc_lengths.entry((doc_id, doc_title.to_string())).or_insert(0) += count;
    }

    /// Accept a mapper event. Events whose doc id is not an integer are skipped.
    pub fn accept_event(&mut self, ev: &PostingEvent) -> bool {
        match ev.doc_id.parse::<DocId>() {
            Ok(doc_id) => { self.accept(doc_id, &ev.doc_title, &ev.term, ev.count); true }
            Err(_) => { self.skipped += 1; false }
        }
    }

    /// Accept every count of one `(doc_id, doc_title, term)` group. A bad doc id
    /// skips each event of the group.
    pub fn accept_group<I: IntoIterator<Item = u64>>(&mut self, doc_id: &str, doc_title: &str, term: &str, counts: I) -> bool {
        match doc_id.parse::<DocId>() {
            Ok(doc_id) => { self.accept(doc_id, doc_title, term, counts.into_iter().sum()); true }
            Err(_) => { self.skipped += counts.into_iter().count(); false }
        }
    }

    pub fn accept_line(&mut self, line: &str) -> bool {
        match parse_posting_event(line) {
            Some(ev) => self.accept_event(&ev),
            None => { self.skipped += 1; false }
        }
    }

    /// Statistics of the events accepted so far.
    pub fn run_stats(&self) -> CorpusStats {
        CorpusStats::new(self.doc_lengths.len() as u64, self.doc_lengths.values().sum())
    }

    /// Overwrite postings and document info for every key seen, then add this
    /// run's document count and total length to the corpus totals.
    pub fn flush<S: IndexStore + ?Sized>(self, store: &S, corpus: &str) -> Result<PostingSummary> {
        let run_stats = self.run_stats();
        let mut postings_written = 0;
        for ((doc_id, doc_title, term), term_frequency) in self.postings {
            if term_frequency == 0 { continue; }
            store.put_posting(&PostingRow { term, corpus_name: corpus.to_string(), doc_id, doc_title, term_frequency })?;
            postings_written += 1;
        }
        let documents_written = self.doc_lengths.len();
        for ((doc_id, doc_title), doc_length) in self.doc_lengths {
            store.put_doc_info(&DocInfo { doc_id, doc_title, doc_length })?;
        }
        let corpus_stats = store.add_corpus_stats(corpus, run_stats)?;
        tracing::debug!(
            corpus,
            postings_written,
            documents_written,
            run_docs = run_stats.doc_count,
            run_length = run_stats.total_length,
            skipped = self.skipped,
            "postings flushed"
        );
        Ok(PostingSummary { postings_written, documents_written, skipped_lines: self.skipped, run_stats, corpus_stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn df_batches_accumulate_before_flush() {
        let store = MemoryStore::new();
        let mut agg = DocFrequencyAggregator::new();
        agg.accept_group("cat", [1, 1]);
        agg.accept_group("dog", [1]);
        agg.accept_group("cat", [1]);
        assert_eq!(agg.pending_terms(), 2);
        let summary = agg.flush(&store, "c").unwrap();
        assert_eq!(summary.terms_written, 2);
        assert_eq!(store.doc_frequency("c", "cat").unwrap(), Some(3));
        assert_eq!(store.doc_frequency("c", "dog").unwrap(), Some(1));
    }

    #[test]
    fn df_malformed_lines_are_skipped() {
        let store = MemoryStore::new();
        let mut agg = DocFrequencyAggregator::new();
        for line in ["cat\t1", "cat\tone", "garbage", "cat\t1", ""] {
            agg.accept_line(line);
        }
        let summary = agg.flush(&store, "c").unwrap();
        assert_eq!(summary.skipped_lines, 3);
        assert_eq!(store.doc_frequency("c", "cat").unwrap(), Some(2));
    }

    #[test]
    fn df_rerun_doubles_stored_counts() {
        let store = MemoryStore::new();
        let lines = ["cat\t1", "cat\t1", "dog\t1"];
        for _ in 0..2 {
            let mut agg = DocFrequencyAggregator::new();
            lines.iter().for_each(|l| { agg.accept_line(l); });
            agg.flush(&store, "c").unwrap();
        }
        assert_eq!(store.doc_frequency("c", "cat").unwrap(), Some(4));
        assert_eq!(store.doc_frequency("c", "dog").unwrap(), Some(2));
    }

    #[test]
    fn postings_and_lengths_agree() {
        let store = MemoryStore::new();
        let mut agg = PostingAggregator::new();
        for line in ["1\tA\tcat\t1", "1\tA\tdog\t1", "1\tA\tcat\t1", "2\tB\tcat\t1", "x\tB\tcat\t1", "2\tB\tcat"] {
            agg.accept_line(line);
        }
        let summary = agg.flush(&store, "c").unwrap();
        assert_eq!(summary.skipped_lines, 2);
        assert_eq!(summary.postings_written, 3);
        assert_eq!(summary.run_stats, CorpusStats::new(2, 4));

        let cat = store.postings_for_term("c", "cat").unwrap();
        assert_eq!(cat.iter().map(|p| (p.doc_id, p.term_frequency)).collect::<Vec<_>>(), vec![(1, 2), (2, 1)]);
        let doc1 = store.doc_info(1).unwrap().unwrap();
        assert_eq!(doc1.doc_length, 3);
        assert_eq!(doc1.doc_title, "A");
    }

    #[test]
    fn postings_rerun_overwrites_but_corpus_stats_add() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            let mut agg = PostingAggregator::new();
            agg.accept(5, "T", "cat", 1);
            agg.accept(5, "T", "cat", 1);
            agg.flush(&store, "c").unwrap();
        }
        let rows = store.postings_for_term("c", "cat").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].term_frequency, 2);
        assert_eq!(store.doc_info(5).unwrap().unwrap().doc_length, 2);
        assert_eq!(store.corpus_stats("c").unwrap(), Some(CorpusStats::new(2, 4)));
    }

    #[test]
    fn bad_doc_id_group_skips_every_event() {
        let store = MemoryStore::new();
        let mut agg = PostingAggregator::new();
        assert!(!agg.accept_group("x1", "T", "cat", [1, 1, 1]));
        assert!(agg.accept_group("-5", "Neg", "cat", [1, 1]));
        let summary = agg.flush(&store, "c").unwrap();
        assert_eq!(summary.skipped_lines, 3);
        assert_eq!(summary.run_stats, CorpusStats::new(1, 2));
        assert_eq!(store.doc_info(-5).unwrap().unwrap().doc_title, "Neg");
    }

    #[test]
    fn zero_counts_are_not_posted() {
        let store = MemoryStore::new();
        let mut agg = PostingAggregator::new();
        agg.accept(1, "T", "ghost", 0);
        agg.accept(1, "T", "cat", 1);
        let summary = agg.flush(&store, "c").unwrap();
        assert_eq!(summary.postings_written, 1);
        assert!(store.postings_for_term("c", "ghost").unwrap().is_empty());
    }
}
