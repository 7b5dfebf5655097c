use placement_core::tokenizer::{tokenize, TokenizerConfig};

#[test]
fn it_normalizes_and_lowercases() {
    // fullwidth digits and letters fold under NFKC
    let words = tokenize("ＳＷＥ Role at GOOGLE, ２０ LPA", TokenizerConfig::default());
    assert_eq!(words, vec!["swe", "role", "google", "20", "lpa"]);
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("Company: Not specified | Role: The analyst", TokenizerConfig::default());
    assert!(!words.contains(&"not".to_string()));
    assert!(!words.contains(&"the".to_string()));
    assert!(words.contains(&"specified".to_string()));
}

#[test]
fn it_stems_on_request() {
    let words = tokenize("Engineers engineering", TokenizerConfig { stem: true });
    assert_eq!(words[0], words[1]);
}
