//! Per-record event emission for the two index passes.
//!
//! Input records are `doc_id<TAB>doc_title<TAB>content` lines. Both mappers are
//! pure: a record's events depend on nothing but the record itself.

use crate::tokenizer::{distinct_terms, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub doc_id: &'a str,
    pub doc_title: &'a str,
    pub content: &'a str,
}

/// Split a line into a record. Tabs inside the content survive; lines with
/// fewer than three fields yield `None`.
pub fn parse_record(line: &str) -> Option<Record<'_>> {
    let line = line.trim();
    if line.is_empty() { return None; }
    let mut parts = line.splitn(3, '\t');
    let doc_id = parts.next()?;
    let doc_title = parts.next()?;
    let content = parts.next()?;
    Some(Record { doc_id, doc_title, content })
}

/// Event of the posting pass: one raw occurrence of `term` in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostingEvent {
    pub doc_id: String,
    pub doc_title: String,
    pub term: String,
    pub count: u64,
}

/// One `(term, 1)` per distinct term of the record.
pub fn frequency_events(record: &Record<'_>) -> Vec<(String, u64)> {
    distinct_terms(record.content).into_iter().map(|t| (t, 1)).collect()
}

/// One event per token occurrence, in document order.
pub fn posting_events(record: &Record<'_>) -> Vec<PostingEvent> {
    tokenize(record.content)
        .into_iter()
        .map(|term| PostingEvent {
            doc_id: record.doc_id.to_string(),
            doc_title: record.doc_title.to_string(),
            term,
            count: 1,
        })
        .collect()
}

pub fn format_frequency_event(term: &str, count: u64) -> String {
    format!("{term}\t{count}")
}

pub fn format_posting_event(ev: &PostingEvent) -> String {
    format!("{}\t{}\t{}\t{}", ev.doc_id, ev.doc_title, ev.term, ev.count)
}

/// Parse a `term<TAB>count` line. Anything but exactly two fields with an
/// unsigned count is rejected.
pub fn parse_frequency_event(line: &str) -> Option<(String, u64)> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    match fields.as_slice() {
        [term, count] => Some((term.to_string(), count.parse().ok()?)),
        _ => None,
    }
}

/// Parse a `doc_id<TAB>doc_title<TAB>term<TAB>count` line.
pub fn parse_posting_event(line: &str) -> Option<PostingEvent> {
    let fields: Vec<&str> = line.trim().split('\t').collect();
    match fields.as_slice() {
        [doc_id, doc_title, term, count] => Some(PostingEvent {
            doc_id: doc_id.to_string(),
            doc_title: doc_title.to_string(),
            term: term.to_string(),
            count: count.parse().ok()?,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_are_dropped() {
        assert!(parse_record("").is_none());
        assert!(parse_record("   ").is_none());
        assert!(parse_record("1\tonly title").is_none());
        assert!(parse_record("no tabs at all").is_none());
    }

    #[test]
    fn content_keeps_embedded_tabs() {
        let r = parse_record("7\tTitle\tfirst\tsecond\tthird\n").unwrap();
        assert_eq!(r.doc_id, "7");
        assert_eq!(r.doc_title, "Title");
        assert_eq!(r.content, "first\tsecond\tthird");
    }

    #[test]
    fn frequency_mapper_emits_once_per_distinct_term() {
        let r = parse_record("1\tT\tcat cat cat dog").unwrap();
        let events = frequency_events(&r);
        assert_eq!(events, vec![("cat".to_string(), 1), ("dog".to_string(), 1)]);
    }

    #[test]
    fn posting_mapper_emits_every_occurrence() {
        let r = parse_record("1\tT\tcat dog cat").unwrap();
        let terms: Vec<String> = posting_events(&r).into_iter().map(|e| e.term).collect();
        assert_eq!(terms, vec!["cat", "dog", "cat"]);
        let lines: Vec<String> = posting_events(&r).iter().map(format_posting_event).collect();
        assert_eq!(lines[0], "1\tT\tcat\t1");
    }

    #[test]
    fn event_lines_reject_bad_counts() {
        assert_eq!(parse_frequency_event("cat\t3"), Some(("cat".to_string(), 3)));
        assert!(parse_frequency_event("cat\tthree").is_none());
        assert!(parse_frequency_event("cat\t-1").is_none());
        assert!(parse_frequency_event("cat\t1\textra").is_none());
        assert!(parse_posting_event("1\tT\tcat").is_none());
        assert!(parse_posting_event("1\tT\tcat\tx").is_none());
        assert_eq!(parse_posting_event("1\tT\tcat\t2").unwrap().count, 2);
    }
}
