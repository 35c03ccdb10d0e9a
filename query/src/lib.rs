use anyhow::Result;
use bm25_core::output::write_results;
use bm25_core::rank::{rank_query, Ranking};
use bm25_core::store::IndexStore;
use std::path::Path;

/// Rank `query` against `corpus` and replace the result file at `output`.
/// A query without matches still writes an empty result file.
pub fn run_query<S: IndexStore + ?Sized>(store: &S, corpus: &str, query: &str, output: &Path) -> Result<Ranking> {
    let ranking = rank_query(store, corpus, query)?;
    tracing::info!(query, outcome = ?ranking.outcome, candidates = ranking.candidates, "query ranked");
    write_results(output, &ranking.results)?;
    Ok(ranking)
}
