use crate::store::{IndexStore, TableSizes, CORPUS_INFO_TABLE, DOC_FREQUENCY_TABLE, DOC_INFO_TABLE, POSTINGS_TABLE};
use crate::{CorpusStats, DocId, DocInfo, PostingRow};
use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::Path;

const SEP: u8 = 0;

/// Index tables persisted in a sled database, one tree per table.
///
/// Keys are the table's key components joined by a NUL byte, with doc ids
/// appended as order-preserving big-endian bytes so a posting scan over `(term, corpus)` is a prefix scan
/// returning rows in doc id order. Values are bincode.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    doc_frequency: Tree,
    postings: Tree,
    doc_info: Tree,
    corpus_info: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening index store at {}", path.display()))?;
        Self::from_db(db)
    }

    /// A store that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            doc_frequency: db.open_tree(DOC_FREQUENCY_TABLE)?,
            postings: db.open_tree(POSTINGS_TABLE)?,
            doc_info: db.open_tree(DOC_INFO_TABLE)?,
            corpus_info: db.open_tree(CORPUS_INFO_TABLE)?,
            db,
        })
    }
}

fn doc_frequency_key(corpus: &str, term: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(corpus.len() + term.len() + 1);
    k.extend_from_slice(corpus.as_bytes());
    k.push(SEP);
    k.extend_from_slice(term.as_bytes());
    k
}

fn postings_prefix(term: &str, corpus: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(term.len() + corpus.len() + 6);
    k.extend_from_slice(term.as_bytes());
    k.push(SEP);
    k.extend_from_slice(corpus.as_bytes());
    k.push(SEP);
    k
}

/// Big-endian with the sign bit flipped, so byte order matches numeric order.
fn doc_id_key(doc_id: DocId) -> [u8; 8] {
    ((doc_id as u64) ^ (1 << 63)).to_be_bytes()
}

fn posting_key(term: &str, corpus: &str, doc_id: DocId) -> Vec<u8> {
    let mut k = postings_prefix(term, corpus);
    k.extend_from_slice(&doc_id_key(doc_id));
    k
}

fn decode<T: DeserializeOwned>(bytes: &[u8], table: &str) -> Result<T> {
    bincode::deserialize(bytes).with_context(|| format!("corrupt value in {table}"))
}

/// Read-add-write of one key as a compare-and-swap loop, so concurrent adders
/// never lose each other's deltas.
fn merge_value<T, F>(tree: &Tree, key: &[u8], table: &str, merge: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: Fn(Option<T>) -> T,
{
    let mut corrupt = false;
    let updated = tree.update_and_fetch(key, |old| {
        corrupt = false;
        let current = match old {
            Some(bytes) => match bincode::deserialize::<T>(bytes) {
                Ok(v) => Some(v),
                Err(_) => {
                    corrupt = true;
                    return Some(bytes.to_vec());
                }
            },
            None => None,
        };
        match bincode::serialize(&merge(current)) {
            Ok(encoded) => Some(encoded),
            Err(_) => {
                corrupt = true;
                old.map(|b| b.to_vec())
            }
        }
    })?;
    if corrupt {
        bail!("corrupt value in {table}");
    }
    let bytes = updated.ok_or_else(|| anyhow!("{table} value missing after update"))?;
    decode(&bytes, table)
}

impl IndexStore for SledStore {
    fn doc_frequency(&self, corpus: &str, term: &str) -> Result<Option<u64>> {
        match self.doc_frequency.get(doc_frequency_key(corpus, term))? {
            Some(v) => Ok(Some(decode(&v, DOC_FREQUENCY_TABLE)?)),
            None => Ok(None),
        }
    }

    fn add_doc_frequency(&self, corpus: &str, term: &str, delta: u64) -> Result<u64> {
        merge_value(&self.doc_frequency, &doc_frequency_key(corpus, term), DOC_FREQUENCY_TABLE, |old: Option<u64>| {
            old.unwrap_or(0) + delta
        })
    }

    fn put_posting(&self, row: &PostingRow) -> Result<()> {
        let key = posting_key(&row.term, &row.corpus_name, row.doc_id);
        self.postings.insert(key, bincode::serialize(row)?)?;
        Ok(())
    }

    fn postings_for_term(&self, corpus: &str, term: &str) -> Result<Vec<PostingRow>> {
        let mut rows = Vec::new();
        for kv in self.postings.scan_prefix(postings_prefix(term, corpus)) {
            let (_, v) = kv?;
            rows.push(decode(&v, POSTINGS_TABLE)?);
        }
        Ok(rows)
    }

    fn put_doc_info(&self, info: &DocInfo) -> Result<()> {
        self.doc_info.insert(doc_id_key(info.doc_id), bincode::serialize(info)?)?;
        Ok(())
    }

    fn doc_info(&self, doc_id: DocId) -> Result<Option<DocInfo>> {
        match self.doc_info.get(doc_id_key(doc_id))? {
            Some(v) => Ok(Some(decode(&v, DOC_INFO_TABLE)?)),
            None => Ok(None),
        }
    }

    fn corpus_stats(&self, corpus: &str) -> Result<Option<CorpusStats>> {
        match self.corpus_info.get(corpus.as_bytes())? {
            Some(v) => Ok(Some(decode(&v, CORPUS_INFO_TABLE)?)),
            None => Ok(None),
        }
    }

    fn add_corpus_stats(&self, corpus: &str, delta: CorpusStats) -> Result<CorpusStats> {
        merge_value(&self.corpus_info, corpus.as_bytes(), CORPUS_INFO_TABLE, |old: Option<CorpusStats>| {
            old.unwrap_or_default().merged(delta)
        })
    }

    fn table_sizes(&self) -> Result<TableSizes> {
        Ok(TableSizes {
            doc_frequency_of_term: self.doc_frequency.len(),
            term_frequency_in_doc: self.postings.len(),
            doc_info: self.doc_info.len(),
            corpus_info: self.corpus_info.len(),
        })
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
