//! Error types for chart parsing.
//!
//! Builder and line errors carry only a message; the chart driver attaches the
//! 1-based line number when it reports them through [`Error::Parse`].

use thiserror::Error;

use crate::chart::note::Beat;

/// A single line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("empty line")]
    Empty,

    #[error("invalid instruction: {0:?}")]
    InvalidInstruction(String),

    #[error("incomplete note")]
    IncompleteNote,

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("unknown note type {0:?}")]
    UnknownNoteTag(char),

    #[error("linebreak has no beat")]
    InvalidLinebreak,
}

/// Ordering and overlap violations raised by the sentence and voice builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("notes after linebreak not allowed")]
    NoteAfterLinebreak,

    #[error("note at beat {start} overlaps with existing sentence, which lasts until beat {until}")]
    NoteOverlap { start: Beat, until: Beat },

    #[error("linebreak at beat {beat} conflicts with existing sentence, which lasts until beat {until}")]
    LinebreakConflict { beat: Beat, until: Beat },

    #[error("sentence at beat {start} starts before previous sentence is over at beat {previous_end}")]
    SentenceOverlap { start: Beat, previous_end: Beat },

    #[error("sentence at beat {start} conflicts with linebreak of previous sentence at beat {linebreak}")]
    LinebreakOverlap { start: Beat, linebreak: Beat },
}

/// Everything the chart driver can report against a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Line(#[from] LineError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("no active voice")]
    NoActiveVoice,

    #[error("no active sentence")]
    NoActiveSentence,

    #[error("unknown voice {0:?}")]
    UnknownVoice(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("line {line}: {kind}")]
    Parse { line: usize, kind: ErrorKind },

    #[error("failed to read chart: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn at(line: usize, kind: impl Into<ErrorKind>) -> Self {
        Error::Parse {
            line,
            kind: kind.into(),
        }
    }

    /// 1-based line number, when the error belongs to a line.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parse { line, .. } => Some(*line),
            Error::Io(_) => None,
        }
    }

    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Error::Parse { kind, .. } => Some(kind),
            Error::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_error_display() {
    let err = Error::at(3, BuildError::NoteAfterLinebreak);
    assert_eq!(err.to_string(), "line 3: notes after linebreak not allowed");
    assert_eq!(err.line(), Some(3));

    let err = Error::at(7, ErrorKind::UnknownVoice("P3".to_string()));
    assert_eq!(err.to_string(), "line 7: unknown voice \"P3\"");

    let err = Error::at(
        2,
        BuildError::NoteOverlap {
            start: Beat(2),
            until: Beat(4),
        },
    );
    assert_eq!(
        err.to_string(),
        "line 2: note at beat 2 overlaps with existing sentence, which lasts until beat 4"
    );
}

#[test]
fn test_io_error_has_no_line() {
    let err = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
    assert_eq!(err.line(), None);
    assert!(err.kind().is_none());
}
