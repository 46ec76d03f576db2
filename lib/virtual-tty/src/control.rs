//! Control characters and the escape sequences echoed back to the terminal.

/// Rings the terminal bell, used to reject an edit.
pub const BELL: char = '\x07';

/// Starts an escape sequence.
pub const ESC: char = '\x1b';

/// Sent by most terminals for the backspace key.
pub const DEL: char = '\x7f';

/// `^H`, the other backspace.
pub const BACKSPACE: char = '\x08';

/// Moves the cursor `columns` cells to the left.
pub fn cursor_left(columns: usize) -> String {
    format!("{ESC}[{columns}D")
}

/// Moves the cursor `columns` cells to the right.
pub fn cursor_right(columns: usize) -> String {
    format!("{ESC}[{columns}C")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_sequences() {
        assert_eq!(cursor_left(1), "\x1b[1D");
        assert_eq!(cursor_right(12), "\x1b[12C");
    }
}
