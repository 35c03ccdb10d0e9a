use bm25_core::tokenizer::{distinct_terms, tokenize};

#[test]
fn it_lowercases_and_keeps_apostrophes() {
    let toks = tokenize("It's RUST o'clock, 2024!");
    assert_eq!(toks, vec!["it's", "rust", "o'clock", "2024"]);
}

#[test]
fn it_is_deterministic() {
    let text = "The quick brown fox; the lazy dog. THE END";
    assert_eq!(tokenize(text), tokenize(text));
    assert_eq!(distinct_terms(text), distinct_terms(text));
    let again: Vec<String> = tokenize(&tokenize(text).join(" "));
    assert_eq!(again, tokenize(text));
}

#[test]
fn non_ascii_letters_split_tokens() {
    let toks = tokenize("café naïve");
    assert_eq!(toks, vec!["caf", "na", "ve"]);
}
