use crate::error::PeachySqlError;
use crate::options::QuoteStyle;

/// Quotes identifiers for one [`QuoteStyle`].
///
/// Dotted names are split and each segment is quoted on its own, so `dbo.Users` becomes
/// `[dbo].[Users]` under bracket quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escaper {
    style: QuoteStyle,
}

impl Escaper {
    #[must_use]
    pub fn new(style: QuoteStyle) -> Self {
        Self { style }
    }

    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` if `identifier` is blank or has an empty
    /// segment (`a..b`, `.a`).
    pub fn escape(&self, identifier: &str) -> Result<String, PeachySqlError> {
        if identifier.trim().is_empty() {
            return Err(PeachySqlError::InvalidArgument(
                "Identifier cannot be blank".into(),
            ));
        }

        let mut out = String::with_capacity(identifier.len() + 4);
        for (i, segment) in identifier.split('.').enumerate() {
            if segment.is_empty() {
                return Err(PeachySqlError::InvalidArgument(format!(
                    "Identifier {identifier} contains an empty segment"
                )));
            }
            if i > 0 {
                out.push('.');
            }
            self.quote_segment(segment, &mut out);
        }
        Ok(out)
    }

    fn quote_segment(&self, segment: &str, out: &mut String) {
        let (open, close) = match self.style {
            QuoteStyle::Ansi => ('"', '"'),
            QuoteStyle::Backtick => ('`', '`'),
            QuoteStyle::Bracket => ('[', ']'),
        };
        out.push(open);
        for ch in segment.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
    }
}
