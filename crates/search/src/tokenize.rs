use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Alphabetic}\p{Nd}_]+").expect("word pattern is valid"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // English function words
        "the", "an", "and", "or", "of", "to", "in", "is", "it", "for", "on", "with", "as", "by",
        "at", "be", "this", "that", "from", "are", "was", "not", "but", "if", "into", "its",
        "how", "what", "does", "do", "which", "where", "when", "who", "my", "me", "we", "our",
        // Keywords shared by most sources
        "def", "fn", "return", "self", "cls", "pub", "let", "mut", "else", "elif", "while",
        "import", "use", "class", "struct", "impl", "none", "true", "false", "pass", "crate",
        "super",
    ]
    .into_iter()
    .collect()
});

/// Split text into lowercase search terms.
///
/// Every identifier yields its lowercased compound form plus its
/// `snake_case` / `camelCase` parts, so `getUserName` matches both
/// `getusername` and `user`. One-character terms and stopwords are dropped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for word in WORD.find_iter(text) {
        let word = word.as_str();
        let parts = split_identifier(word);
        let compound = word.trim_matches('_').to_lowercase();
        let compound_is_part = parts.len() == 1 && parts[0] == compound;

        if !compound_is_part {
            push_term(&mut terms, compound);
        }
        for part in parts {
            push_term(&mut terms, part);
        }
    }
    terms
}

fn push_term(terms: &mut Vec<String>, term: String) {
    if term.chars().count() < 2 || STOPWORDS.contains(term.as_str()) {
        return;
    }
    terms.push(term);
}

/// `parseHTTPResponse_v2` -> `parse`, `http`, `response`, `v2`
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for piece in word.split('_').filter(|p| !p.is_empty()) {
        let chars: Vec<char> = piece.chars().collect();
        let mut current = String::new();
        for (idx, &ch) in chars.iter().enumerate() {
            let boundary = idx > 0 && ch.is_uppercase() && {
                let prev = chars[idx - 1];
                let next_lower = chars.get(idx + 1).is_some_and(|c| c.is_lowercase());
                prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_lower)
            };
            if boundary && !current.is_empty() {
                parts.push(current.to_lowercase());
                current.clear();
            }
            current.push(ch);
        }
        if !current.is_empty() {
            parts.push(current.to_lowercase());
        }
    }
    parts
}
