use anyhow::Result;
use bm25_core::config::{DEFAULT_CORPUS, DEFAULT_OUTPUT, DEFAULT_STORE_DIR};
use bm25_core::persist::SledStore;
use clap::Parser;
use query::run_query;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Rank documents for a query with BM25 and write the top ten as TSV")]
struct Args {
    /// Free-text query
    query: String,
    /// Index store directory
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store: String,
    /// Corpus to rank
    #[arg(long, default_value = DEFAULT_CORPUS)]
    corpus: String,
    /// Result file, replaced on every run
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let store = SledStore::open(&args.store)?;
    let ranking = run_query(&store, &args.corpus, &args.query, &args.output)?;
    for r in &ranking.results {
        println!("{}\t{}\t{:.4}", r.doc_id, r.doc_title, r.doc_rank);
    }
    Ok(())
}
