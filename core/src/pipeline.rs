//! Single-node index build: map records in parallel, group events by key, and
//! reduce each shard of groups into the store.

use crate::aggregate::{DocFrequencyAggregator, DocFrequencySummary, PostingAggregator, PostingSummary};
use crate::mapper::{frequency_events, parse_record, posting_events, Record};
use crate::shuffle::{group_by_key, partition_by};
use crate::store::IndexStore;
use crate::{CorpusStats, DocId};
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::io::BufRead;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Number of aggregator instances per pass. Each owns a disjoint set of keys.
    pub reducers: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self { Self { reducers: 1 } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexRun {
    pub records: usize,
    pub dropped_lines: usize,
    pub doc_frequency: DocFrequencySummary,
    pub postings: PostingSummary,
}

/// Index every valid `doc_id<TAB>doc_title<TAB>content` line into `corpus`.
pub fn index_lines<S, L>(store: &S, corpus: &str, lines: &[L], opts: PipelineOptions) -> Result<IndexRun>
where
    S: IndexStore + ?Sized,
    L: AsRef<str> + Sync,
{
    let records: Vec<Record<'_>> = lines.par_iter().filter_map(|l| parse_record(l.as_ref())).collect();
    let dropped_lines = lines.len() - records.len();
    tracing::info!(corpus, records = records.len(), dropped_lines, "mapping records");

    let doc_frequency = reduce_doc_frequencies(store, corpus, &records, opts.reducers)?;
    let postings = reduce_postings(store, corpus, &records, opts.reducers)?;
    store.flush()?;

    tracing::info!(
        corpus,
        terms = doc_frequency.terms_written,
        postings = postings.postings_written,
        documents = postings.documents_written,
        "index run complete"
    );
    Ok(IndexRun { records: records.len(), dropped_lines, doc_frequency, postings })
}

/// Read lines from `reader` and index them.
pub fn index_reader<S, R>(store: &S, corpus: &str, reader: R, opts: PipelineOptions) -> Result<IndexRun>
where
    S: IndexStore + ?Sized,
    R: BufRead,
{
    let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    index_lines(store, corpus, &lines, opts)
}

fn reduce_doc_frequencies<S: IndexStore + ?Sized>(store: &S, corpus: &str, records: &[Record<'_>], reducers: usize) -> Result<DocFrequencySummary> {
    let events: Vec<(String, u64)> = records.par_iter().flat_map_iter(frequency_events).collect();
    let shards = partition_by(group_by_key(events), reducers, |term: &String| term.clone());
    let summaries = shards
        .into_par_iter()
        .map(|shard| {
            let mut agg = DocFrequencyAggregator::new();
            for (term, counts) in shard {
                agg.accept_group(&term, counts);
            }
            agg.flush(store, corpus)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(summaries.into_iter().fold(DocFrequencySummary::default(), |acc, s| DocFrequencySummary {
        terms_written: acc.terms_written + s.terms_written,
        skipped_lines: acc.skipped_lines + s.skipped_lines,
    }))
}

fn reduce_postings<S: IndexStore + ?Sized>(store: &S, corpus: &str, records: &[Record<'_>], reducers: usize) -> Result<PostingSummary> {
    let events: Vec<((String, String, String), u64)> = records
        .par_iter()
        .flat_map_iter(posting_events)
        .map(|ev| ((ev.doc_id, ev.doc_title, ev.term), ev.count))
        .collect();
    // Shard by parsed doc id: "1" and "01" are one document and must meet in
    // one aggregator. Unparseable ids are skipped wherever they land.
    let shards = partition_by(group_by_key(events), reducers, |(doc_id, _, _): &(String, String, String)| {
        doc_id.parse::<DocId>().map_err(|_| doc_id.clone())
    });
    let summaries = shards
        .into_par_iter()
        .map(|shard| {
            let mut agg = PostingAggregator::new();
            for ((doc_id, doc_title, term), counts) in shard {
                agg.accept_group(&doc_id, &doc_title, &term, counts);
            }
            agg.flush(store, corpus)
        })
        .collect::<Result<Vec<_>>>()?;
    let mut total = summaries.into_iter().fold(PostingSummary::default(), |acc, s| PostingSummary {
        postings_written: acc.postings_written + s.postings_written,
        documents_written: acc.documents_written + s.documents_written,
        skipped_lines: acc.skipped_lines + s.skipped_lines,
        run_stats: acc.run_stats.merged(s.run_stats),
        corpus_stats: CorpusStats::default(),
    });
    total.corpus_stats = store.corpus_stats(corpus)?.unwrap_or_default();
    Ok(total)
}
