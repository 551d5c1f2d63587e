//! TF-IDF labels for communities, built from camel-case name tokens

use std::collections::BTreeMap;

/// Separator between the terms of a label.
pub const LABEL_SEPARATOR: &str = "-";

/// Split a simple class name before every uppercase letter except the first
/// character: `UserRepository` -> `User`, `Repository`; `URLParser` -> `U`,
/// `R`, `L`, `Parser`.
pub fn split_camel_case(name: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in name.char_indices() {
        if i > 0 && c.is_uppercase() {
            tokens.push(&name[start..i]);
            start = i;
        }
    }
    if start < name.len() {
        tokens.push(&name[start..]);
    }
    tokens
}

/// One label per community, given the simple names of its members.
///
/// Term frequency is the token count within the community; inverse document
/// frequency is `log2(communities / communities containing the token)`.
/// Tokens rank by score, then frequency, then alphabetically, and the top
/// `terms` of them are lower-cased and joined.
pub fn community_labels<S: AsRef<str>>(communities: &[Vec<S>], terms: usize) -> Vec<String> {
    let frequencies: Vec<BTreeMap<&str, usize>> = communities
        .iter()
        .map(|names| {
            let mut tf = BTreeMap::new();
            for name in names {
                for token in split_camel_case(name.as_ref()) {
                    *tf.entry(token).or_insert(0) += 1;
                }
            }
            tf
        })
        .collect();

    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for tf in &frequencies {
        for token in tf.keys() {
            *document_frequency.entry(*token).or_insert(0) += 1;
        }
    }

    let k = communities.len() as f64;
    frequencies
        .iter()
        .map(|tf| {
            let mut scored: Vec<(&str, f64, usize)> = tf
                .iter()
                .map(|(token, count)| {
                    let df = document_frequency.get(token).copied().unwrap_or(1) as f64;
                    (*token, *count as f64 * (k / df).log2(), *count)
                })
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)));
            scored
                .iter()
                .take(terms)
                .map(|(token, _, _)| token.to_lowercase())
                .collect::<Vec<_>>()
                .join(LABEL_SEPARATOR)
        })
        .collect()
}
