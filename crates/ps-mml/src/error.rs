//! Parse errors and the error observer hook.

use ps_ir::MAX_DURATION_SCALE;

/// What went wrong.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Invalid octave")]
    InvalidOctave,
    #[error("Invalid length")]
    InvalidLength,
    #[error("Invalid tempo")]
    InvalidTempo,
    #[error("Invalid volume")]
    InvalidVolume,
    #[error("Invalid octave step down")]
    OctaveStepDown,
    #[error("Invalid octave step up")]
    OctaveStepUp,
    #[error("Invalid music articulation")]
    InvalidArticulation,
    #[error("Invalid accidental")]
    InvalidAccidental,
    #[error("Invalid note code")]
    InvalidNoteCode,
    #[error("Misplaced channel selector")]
    MisplacedChannelSelector,
    #[error("Unknown command '{0}'")]
    UnknownCommand(char),
    #[error("Can't join, no note before")]
    TieWithoutNote,
    #[error("Tie is not followed by a note")]
    DanglingTie,
    #[error("Note is shorter than one time unit")]
    ZeroDuration,
    #[error("Note is longer than {} time units", MAX_DURATION_SCALE)]
    DurationOverflow,
    #[error("Out of memory growing frame buffers")]
    OutOfMemory,
}

/// A compile error with its 1-based source position.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(kind: ErrorKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }
}

/// Receives the first compile error, before it is returned.
pub trait ErrorObserver {
    fn on_error(&mut self, message: &str, line: u32, column: u32);
}

impl<F> ErrorObserver for F
where
    F: FnMut(&str, u32, u32),
{
    fn on_error(&mut self, message: &str, line: u32, column: u32) {
        self(message, line, column)
    }
}
