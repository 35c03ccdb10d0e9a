use crate::RankedDoc;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render results as `doc_id<TAB>doc_title<TAB>doc_rank` lines, no header.
pub fn to_tsv(results: &[RankedDoc]) -> String {
    let mut out = String::new();
    for r in results {
        out.push_str(&format!("{}\t{}\t{}\n", r.doc_id, r.doc_title, r.doc_rank));
    }
    out
}

/// Replace the file at `path` with the given results. An empty slice still
/// produces an (empty) result file.
pub fn write_results(path: &Path, results: &[RankedDoc]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?);
        w.write_all(to_tsv(results).as_bytes())?;
        w.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = results.len(), "results written");
    Ok(())
}
