use tracing::{debug, trace};

use crate::control::{self, BACKSPACE, BELL, DEL, ESC};

/// Canonical-mode input editing.
///
/// The line being edited is split at the cursor: `backward` holds the text
/// to the left of the cursor and `forward` the text to its right, so the
/// logical line is always `backward + forward`. Each call to
/// [`process`](Self::process) consumes one chunk of raw input and returns
/// what has to be echoed to keep the screen in sync with the buffer.
///
/// Every code point is assumed to occupy a single terminal cell.
#[derive(Debug, Default, Clone)]
pub struct LineDiscipline {
    backward: String,
    forward: String,
    ended: bool,
    /// Tail of a UTF-8 sequence that was split across chunks.
    pending_utf8: Vec<u8>,
    /// Escape sequence that was split across chunks.
    pending_escape: String,
}

/// Per-call echo bookkeeping.
#[derive(Debug, Default)]
struct Echo {
    out: String,
    bell: bool,
    trailing_blanks: usize,
}

impl Echo {
    fn bell(&mut self) {
        // One bell per chunk is plenty.
        if !self.bell {
            self.out.push(BELL);
            self.bell = true;
        }
    }
}

enum Escape {
    /// `ESC [ params terminator`, `len` chars long.
    Csi { terminator: char, len: usize },
    /// `ESC` followed by something that does not start a CSI sequence.
    NotCsi,
    /// `ESC [ params` cut short by a character that cannot end a sequence.
    /// Only the `len` chars before that character belong to the sequence.
    Unterminated { len: usize },
    /// Ran out of input before the terminator.
    Incomplete,
}

impl LineDiscipline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of raw terminal input and returns the echo for it.
    ///
    /// Processing stops at the first newline; anything after it in the same
    /// chunk is dropped, as is any input fed once the line has ended.
    pub fn process(&mut self, raw: &[u8]) -> String {
        let mut echo = Echo::default();
        if self.ended {
            trace!(len = raw.len(), "line already ended, dropping input");
            return echo.out;
        }

        let text = self.decode(raw).replace("\r\n", "\n").replace('\r', "\n");
        let mut input = std::mem::take(&mut self.pending_escape);
        input.push_str(&text);
        let chars: Vec<char> = input.chars().collect();

        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                DEL | BACKSPACE => {
                    self.delete_backward(&mut echo);
                    i += 1;
                }
                ESC => match parse_escape(&chars[i..]) {
                    Escape::Csi { terminator, len } => {
                        self.apply_csi(terminator, &mut echo);
                        i += len;
                    }
                    Escape::NotCsi => {
                        trace!("dropping lone escape");
                        i += 1;
                    }
                    Escape::Unterminated { len } => {
                        debug!("dropping unterminated escape sequence");
                        i += len;
                    }
                    Escape::Incomplete => {
                        self.pending_escape = chars[i..].iter().collect();
                        break;
                    }
                },
                '\n' => {
                    echo.out.push('\n');
                    self.ended = true;
                    break;
                }
                c => {
                    self.backward.push(c);
                    echo.out.push(c);
                    i += 1;
                }
            }
        }

        self.redraw_forward(&mut echo);
        echo.out
    }

    /// Whether a newline has been seen.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The logical line, regardless of where the cursor is.
    pub fn line(&self) -> String {
        let mut line = String::with_capacity(self.backward.len() + self.forward.len());
        line.push_str(&self.backward);
        line.push_str(&self.forward);
        line
    }

    /// Text left of the cursor.
    pub fn backward(&self) -> &str {
        &self.backward
    }

    /// Text right of the cursor.
    pub fn forward(&self) -> &str {
        &self.forward
    }

    /// Cursor position, in cells from the start of the line.
    pub fn cursor(&self) -> usize {
        self.backward.chars().count()
    }

    fn decode(&mut self, raw: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_utf8);
        bytes.extend_from_slice(raw);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, invalid) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &invalid[len..];
                        }
                        None => {
                            self.pending_utf8 = invalid.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    fn delete_backward(&mut self, echo: &mut Echo) {
        match self.backward.pop() {
            Some(_) => {
                echo.out.push_str(&control::cursor_left(1));
                echo.trailing_blanks += 1;
            }
            None => echo.bell(),
        }
    }

    fn apply_csi(&mut self, terminator: char, echo: &mut Echo) {
        match terminator {
            // Up and down are reserved for history.
            'A' | 'B' => trace!(%terminator, "history is not implemented"),
            'C' => {
                if self.forward.is_empty() {
                    echo.bell();
                } else {
                    let c = self.forward.remove(0);
                    self.backward.push(c);
                    echo.out.push_str(&control::cursor_right(1));
                }
            }
            'D' => match self.backward.pop() {
                Some(c) => {
                    self.forward.insert(0, c);
                    echo.out.push_str(&control::cursor_left(1));
                }
                None => echo.bell(),
            },
            'H' => {
                if self.backward.is_empty() {
                    echo.bell();
                } else {
                    let columns = self.backward.chars().count();
                    self.forward.insert_str(0, &self.backward);
                    self.backward.clear();
                    echo.out.push_str(&control::cursor_left(columns));
                }
            }
            'F' => {
                if self.forward.is_empty() {
                    echo.bell();
                } else {
                    let columns = self.forward.chars().count();
                    self.backward.push_str(&self.forward);
                    self.forward.clear();
                    echo.out.push_str(&control::cursor_right(columns));
                }
            }
            other => debug!(terminator = %other.escape_debug(), "ignoring unrecognized escape sequence"),
        }
    }

    /// Reprints the text right of the cursor, blanks out cells left stale by
    /// deletions and moves the cursor back to where the buffer says it is.
    fn redraw_forward(&self, echo: &mut Echo) {
        if self.forward.is_empty() && echo.trailing_blanks == 0 {
            return;
        }
        let columns = self.forward.chars().count() + echo.trailing_blanks;
        echo.out.push_str(&self.forward);
        echo.out.extend(std::iter::repeat_n(' ', echo.trailing_blanks));
        echo.out.push_str(&control::cursor_left(columns));
        echo.trailing_blanks = 0;
    }
}

fn parse_escape(chars: &[char]) -> Escape {
    match chars.get(1) {
        None => return Escape::Incomplete,
        Some('[') => {}
        Some(_) => return Escape::NotCsi,
    }
    let mut len = 2;
    while let Some(c) = chars.get(len) {
        if c.is_ascii_digit() || *c == ';' {
            len += 1;
        } else if c.is_ascii_alphabetic() || *c == '~' {
            return Escape::Csi {
                terminator: *c,
                len: len + 1,
            };
        } else {
            return Escape::Unterminated { len };
        }
    }
    Escape::Incomplete
}
