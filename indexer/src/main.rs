use anyhow::{bail, Result};
use bm25_core::aggregate::{DocFrequencyAggregator, PostingAggregator};
use bm25_core::config::{DEFAULT_CORPUS, DEFAULT_STORE_DIR};
use bm25_core::mapper::{format_frequency_event, format_posting_event, frequency_events, parse_record, posting_events};
use bm25_core::persist::SledStore;
use bm25_core::pipeline::{index_lines, PipelineOptions};
use bm25_core::store::IndexStore;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the BM25 inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Index store directory
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store: String,
    /// Corpus the records belong to
    #[arg(long, default_value = DEFAULT_CORPUS)]
    corpus: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over input files or a directory of them
    Build {
        /// Input path (file or directory of .tsv/.txt files)
        #[arg(long)]
        input: String,
        #[command(flatten)]
        store: StoreArgs,
        /// Aggregator instances per pass
        #[arg(long, default_value_t = 1)]
        reducers: usize,
    },
    /// Read records on stdin, write `term<TAB>1` per distinct term per document
    MapDf,
    /// Read records on stdin, write `doc_id<TAB>doc_title<TAB>term<TAB>1` per occurrence
    MapPostings,
    /// Read `term<TAB>count` lines on stdin and merge them into document frequencies
    ReduceDf {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Read posting events on stdin and write postings, document info and corpus totals
    ReducePostings {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Open the store and report its tables
    Check {
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> Result<()> {
    // stdout carries events for the streaming subcommands
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, store, reducers } => build_index(&input, &store, reducers),
        Commands::MapDf => {
            let n = map_df(io::stdin().lock(), io::stdout().lock())?;
            tracing::info!(events = n, "df map done");
            Ok(())
        }
        Commands::MapPostings => {
            let n = map_postings(io::stdin().lock(), io::stdout().lock())?;
            tracing::info!(events = n, "posting map done");
            Ok(())
        }
        Commands::ReduceDf { store } => {
            let db = SledStore::open(&store.store)?;
            reduce_df(io::stdin().lock(), &db, &store.corpus)?;
            db.flush()
        }
        Commands::ReducePostings { store } => {
            let db = SledStore::open(&store.store)?;
            reduce_postings(io::stdin().lock(), &db, &store.corpus)?;
            db.flush()
        }
        Commands::Check { store } => check(&store),
    }
}

fn build_index(input: &str, args: &StoreArgs, reducers: usize) -> Result<()> {
    let files = collect_inputs(Path::new(input))?;
    let mut lines: Vec<String> = Vec::new();
    for file in &files {
        let reader = BufReader::new(File::open(file)?);
        for line in reader.lines() {
            lines.push(line?);
        }
    }
    tracing::info!(files = files.len(), lines = lines.len(), "read input");

    let store = SledStore::open(&args.store)?;
    let run = index_lines(&store, &args.corpus, &lines, PipelineOptions { reducers })?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("tsv" | "txt")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

fn map_df<R: BufRead, W: Write>(reader: R, writer: W) -> Result<usize> {
    let mut out = BufWriter::new(writer);
    let mut n = 0;
    for line in reader.lines() {
        let line = line?;
        let Some(record) = parse_record(&line) else { continue };
        for (term, count) in frequency_events(&record) {
            writeln!(out, "{}", format_frequency_event(&term, count))?;
            n += 1;
        }
    }
    out.flush()?;
    Ok(n)
}

fn map_postings<R: BufRead, W: Write>(reader: R, writer: W) -> Result<usize> {
    let mut out = BufWriter::new(writer);
    let mut n = 0;
    for line in reader.lines() {
        let line = line?;
        let Some(record) = parse_record(&line) else { continue };
        for ev in posting_events(&record) {
            writeln!(out, "{}", format_posting_event(&ev))?;
            n += 1;
        }
    }
    out.flush()?;
    Ok(n)
}

fn reduce_df<R: BufRead, S: IndexStore + ?Sized>(reader: R, store: &S, corpus: &str) -> Result<()> {
    let mut agg = DocFrequencyAggregator::new();
    for line in reader.lines() {
        agg.accept_line(&line?);
    }
    let summary = agg.flush(store, corpus)?;
    tracing::info!(terms = summary.terms_written, skipped = summary.skipped_lines, "df reduce done");
    Ok(())
}

fn reduce_postings<R: BufRead, S: IndexStore + ?Sized>(reader: R, store: &S, corpus: &str) -> Result<()> {
    let mut agg = PostingAggregator::new();
    for line in reader.lines() {
        agg.accept_line(&line?);
    }
    let summary = agg.flush(store, corpus)?;
    tracing::info!(
        postings = summary.postings_written,
        documents = summary.documents_written,
        skipped = summary.skipped_lines,
        doc_count = summary.corpus_stats.doc_count,
        "posting reduce done"
    );
    Ok(())
}

fn check(args: &StoreArgs) -> Result<()> {
    let store = SledStore::open(&args.store)?;
    let sizes = store.table_sizes()?;
    let stats = store.corpus_stats(&args.corpus)?;
    tracing::info!(store = %args.store, ?sizes, ?stats, "store reachable");
    let report = serde_json::json!({
        "store": args.store,
        "corpus": args.corpus,
        "tables": sizes,
        "corpus_info": stats,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
