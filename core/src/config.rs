//! Compile-time defaults shared by the binaries and the ranking engine.

/// Corpus every record is indexed into unless told otherwise.
pub const DEFAULT_CORPUS: &str = "whole_corpus";

/// Directory of the sled database holding the index tables.
pub const DEFAULT_STORE_DIR: &str = "./index";

/// Fixed location of the query result file.
pub const DEFAULT_OUTPUT: &str = "./bm25_output.tsv";

/// Term frequency saturation.
pub const BM25_K1: f64 = 1.2;

/// Document length normalization.
pub const BM25_B: f64 = 0.75;

/// Number of documents a ranking keeps.
pub const TOP_K: usize = 10;
