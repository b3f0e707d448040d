//! Rewriting `?` placeholders for drivers that want numbered ones.

use std::borrow::Cow;

mod scanner;
pub(crate) mod words;

use scanner::State;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// SQL Server / tiberius style: `@P1`, `@P2`, ...
    AtP,
    /// PostgreSQL style: `$1`, `$2`, ...
    Dollar,
}

impl PlaceholderStyle {
    fn prefix(self) -> &'static str {
        match self {
            PlaceholderStyle::AtP => "@P",
            PlaceholderStyle::Dollar => "$",
        }
    }
}

/// Number the `?` placeholders of `sql` in order of appearance.
///
/// Placeholders inside string literals, quoted or bracketed identifiers and comments are
/// left alone. Returns a borrowed `Cow` when the SQL has no placeholders.
///
/// ```rust
/// use peachy_sql::translation::{PlaceholderStyle, translate_placeholders};
///
/// let sql = translate_placeholders("SELECT [a?] FROM t WHERE b = ? AND c = '?'", PlaceholderStyle::AtP);
/// assert_eq!(sql, "SELECT [a?] FROM t WHERE b = @P1 AND c = '?'");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    let mut out: Option<Vec<u8>> = None;
    let mut state = State::Normal;
    let mut next_param = 1_usize;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        // Bytes copied verbatim at this position; 0 means a placeholder was written instead.
        let mut width = 1;
        if state != State::Normal {
            (state, width) = state.advance(bytes, idx);
        } else if let Some((opened, opener)) = State::opened_at(bytes, idx) {
            state = opened;
            width = opener;
        } else if bytes[idx] == b'?' {
            let buf = out.get_or_insert_with(|| bytes[..idx].to_vec());
            buf.extend_from_slice(target.prefix().as_bytes());
            buf.extend_from_slice(next_param.to_string().as_bytes());
            next_param += 1;
            width = 0;
        }

        if width == 0 {
            idx += 1;
            continue;
        }
        if let Some(buf) = out.as_mut() {
            buf.extend_from_slice(&bytes[idx..idx + width]);
        }
        idx += width;
    }

    match out {
        // Only whole source bytes and ASCII are written, so this stays valid UTF-8.
        Some(buf) => Cow::Owned(String::from_utf8_lossy(&buf).into_owned()),
        None => Cow::Borrowed(sql),
    }
}
