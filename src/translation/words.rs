#![cfg_attr(
    not(any(feature = "sqlite", feature = "mssql")),
    allow(dead_code)
)]

use super::scanner::State;

/// A bare word of a statement, uppercased, with the number of parentheses around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Word {
    pub(crate) text: String,
    pub(crate) depth: u32,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'#' | b'$')
}

/// Bare words of each `;`-separated statement of `sql`.
///
/// Literals, quoted or bracketed identifiers and comments are skipped, so only keywords
/// and plain names come back. Empty statements are dropped.
pub(crate) fn statement_words(sql: &str) -> Vec<Vec<Word>> {
    let bytes = sql.as_bytes();
    let mut statements = vec![Vec::new()];
    let mut state = State::Normal;
    let mut depth = 0_u32;
    let mut idx = 0;

    while idx < bytes.len() {
        if state != State::Normal {
            let (next, width) = state.advance(bytes, idx);
            state = next;
            idx += width;
            continue;
        }
        if let Some((opened, width)) = State::opened_at(bytes, idx) {
            state = opened;
            idx += width;
            continue;
        }

        let b = bytes[idx];
        if is_word_byte(b) {
            let start = idx;
            while idx < bytes.len() && is_word_byte(bytes[idx]) {
                idx += 1;
            }
            if let Some(words) = statements.last_mut() {
                words.push(Word {
                    text: String::from_utf8_lossy(&bytes[start..idx]).to_ascii_uppercase(),
                    depth,
                });
            }
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b';' => {
                statements.push(Vec::new());
                depth = 0;
            }
            _ => {}
        }
        idx += 1;
    }

    statements.retain(|words| !words.is_empty());
    statements
}

const VERBS: [&str; 8] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "REPLACE", "VALUES", "TABLE",
];

/// The verb a statement runs: its first word, or for `WITH` the first verb after the
/// common table expressions at the same nesting level.
pub(crate) fn main_verb(words: &[Word]) -> Option<&str> {
    let first = words.first()?;
    if first.text != "WITH" {
        return Some(first.text.as_str());
    }
    words
        .iter()
        .skip(1)
        .find(|w| w.depth == first.depth && VERBS.contains(&w.text.as_str()))
        .map(|w| w.text.as_str())
}
