/// Lexical region the translator is currently inside.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    Backticked,
    LineComment,
    /// Nesting depth; T-SQL block comments nest.
    BlockComment(u32),
}

impl State {
    /// Byte that ends a quoted region, `None` outside quotes.
    pub(super) fn closing_byte(self) -> Option<u8> {
        match self {
            State::SingleQuoted => Some(b'\''),
            State::DoubleQuoted => Some(b'"'),
            State::Bracketed => Some(b']'),
            State::Backticked => Some(b'`'),
            _ => None,
        }
    }

    /// Region opened at `idx` of normal text, with the bytes its opener spans.
    pub(super) fn opened_at(bytes: &[u8], idx: usize) -> Option<(State, usize)> {
        match bytes.get(idx)? {
            b'\'' => Some((State::SingleQuoted, 1)),
            b'"' => Some((State::DoubleQuoted, 1)),
            b'[' => Some((State::Bracketed, 1)),
            b'`' => Some((State::Backticked, 1)),
            _ if at(bytes, idx, b"--") => Some((State::LineComment, 1)),
            _ if at(bytes, idx, b"/*") => Some((State::BlockComment(1), 2)),
            _ => None,
        }
    }

    /// Step over the byte at `idx` inside a region: the next state and the bytes consumed.
    pub(super) fn advance(self, bytes: &[u8], idx: usize) -> (State, usize) {
        let b = bytes[idx];
        match self {
            State::Normal => (self, 1),
            State::SingleQuoted | State::DoubleQuoted | State::Bracketed | State::Backticked => {
                if Some(b) != self.closing_byte() {
                    (self, 1)
                } else if bytes.get(idx + 1) == Some(&b) {
                    // doubled closer is an escape
                    (self, 2)
                } else {
                    (State::Normal, 1)
                }
            }
            State::LineComment if b == b'\n' => (State::Normal, 1),
            State::LineComment => (self, 1),
            State::BlockComment(depth) => {
                if at(bytes, idx, b"/*") {
                    (State::BlockComment(depth + 1), 2)
                } else if at(bytes, idx, b"*/") {
                    let next = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    (next, 2)
                } else {
                    (self, 1)
                }
            }
        }
    }
}

pub(super) fn at(bytes: &[u8], idx: usize, pattern: &[u8; 2]) -> bool {
    bytes.get(idx..idx + 2) == Some(pattern.as_slice())
}
