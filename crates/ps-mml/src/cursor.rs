//! Byte cursor with line/column tracking.

/// 1-based source position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Position {
    pub line: u32,
    pub column: u32,
}

pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Position of the next unread byte.
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// The full character at the cursor, for diagnostics.
    pub fn peek_char(&self) -> Option<char> {
        self.text.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    /// Consume one byte. Carriage returns do not advance the column.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        match b {
            b'\n' => {
                self.line += 1;
                self.column = 1;
            }
            b'\r' => {}
            _ => self.column += 1,
        }
        Some(b)
    }

    /// Consume `b` if it is next.
    pub fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Count and consume a run of `b`.
    pub fn eat_run(&mut self, b: u8) -> u32 {
        let mut n = 0;
        while self.eat(b) {
            n += 1;
        }
        n
    }

    pub fn at_digit(&self) -> bool {
        self.peek().is_some_and(|b| b.is_ascii_digit())
    }

    /// Read a decimal number.
    ///
    /// Returns `None` if there is no digit or the value overflows; the
    /// digits are consumed either way.
    pub fn read_number(&mut self) -> Option<u32> {
        if !self.at_digit() {
            return None;
        }
        let mut value: Option<u32> = Some(0);
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            self.bump();
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add((b - b'0') as u32));
        }
        value
    }

    /// Skip to the end of the line, leaving the newline unread.
    pub fn skip_line(&mut self) {
        while self.peek().is_some_and(|b| b != b'\n') {
            self.bump();
        }
    }
}
