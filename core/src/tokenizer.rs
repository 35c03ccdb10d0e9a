use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z0-9']+").expect("valid regex");
}

/// Tokenize text into lower-cased runs of `[a-z0-9']`, keeping repetitions and order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Distinct terms of the text, sorted.
pub fn distinct_terms(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}
