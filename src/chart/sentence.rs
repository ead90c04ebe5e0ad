use crate::chart::note::{Beat, Note};
#[cfg(test)]
use crate::chart::note::NoteType;
use crate::error::BuildError;

/// A finished run of notes, closed by a linebreak or by the end of the song.
///
/// Notes are kept in the order they were added. They are non-overlapping and
/// non-decreasing in start beat; [`SentenceBuilder`] enforces that while
/// accumulating, so it is not checked again here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    notes: Vec<Note>,
    end_beat: Beat,
    linebreak_beat: Option<Beat>,
}

impl Sentence {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn start_beat(&self) -> Beat {
        self.notes[0].start_beat()
    }

    /// Latest end over all notes.
    pub fn end_beat(&self) -> Beat {
        self.end_beat
    }

    /// `None` when the song ends after this sentence without a `-` line.
    pub fn linebreak_beat(&self) -> Option<Beat> {
        self.linebreak_beat
    }

    pub fn text(&self) -> String {
        self.notes.iter().map(Note::text).collect()
    }
}

/// Accumulates the notes of the sentence currently being read.
#[derive(Debug, Default)]
pub struct SentenceBuilder {
    notes: Vec<Note>,
    linebreak_beat: Option<Beat>,
}

impl SentenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    // End of the last note, or 0 while empty.
    fn until_beat(&self) -> Beat {
        self.notes.last().map(Note::end_beat).unwrap_or_default()
    }

    pub fn add(&mut self, note: Note) -> Result<(), BuildError> {
        if self.linebreak_beat.is_some() {
            return Err(BuildError::NoteAfterLinebreak);
        }
        let until = self.until_beat();
        if note.start_beat() < until {
            return Err(BuildError::NoteOverlap {
                start: note.start_beat(),
                until,
            });
        }
        self.notes.push(note);
        Ok(())
    }

    pub fn set_linebreak(&mut self, beat: Beat) -> Result<(), BuildError> {
        let until = self.until_beat();
        if beat < until {
            return Err(BuildError::LinebreakConflict { beat, until });
        }
        self.linebreak_beat = Some(beat);
        Ok(())
    }

    /// Moves the accumulated notes into an immutable [`Sentence`].
    ///
    /// Returns `None` for a builder without notes; the chart driver only
    /// finalizes builders it has added a note to.
    pub fn finalize(self) -> Option<Sentence> {
        if self.notes.is_empty() {
            return None;
        }
        let end_beat = self
            .notes
            .iter()
            .map(Note::end_beat)
            .max()
            .unwrap_or_default();
        Some(Sentence {
            notes: self.notes,
            end_beat,
            linebreak_beat: self.linebreak_beat,
        })
    }
}

#[cfg(test)]
pub(crate) fn note(start: i64, length: i64) -> Note {
    Note::new(NoteType::Normal, Beat(start), Beat(length), 0, "la")
}

#[test]
fn test_add_in_order() {
    let mut builder = SentenceBuilder::new();
    assert_eq!(builder.add(note(0, 4)), Ok(()));
    assert_eq!(builder.add(note(4, 2)), Ok(()));
    assert_eq!(builder.add(note(10, 0)), Ok(()));
    let sentence = builder.finalize().unwrap();
    assert_eq!(sentence.notes().len(), 3);
    assert_eq!(sentence.start_beat(), Beat(0));
    assert_eq!(sentence.end_beat(), Beat(10));
    assert_eq!(sentence.linebreak_beat(), None);
}

#[test]
fn test_add_overlapping_note() {
    let mut builder = SentenceBuilder::new();
    builder.add(note(0, 4)).unwrap();
    assert_eq!(
        builder.add(note(2, 4)),
        Err(BuildError::NoteOverlap {
            start: Beat(2),
            until: Beat(4)
        })
    );
}

#[test]
fn test_first_note_before_zero() {
    let mut builder = SentenceBuilder::new();
    assert!(matches!(
        builder.add(note(-1, 2)),
        Err(BuildError::NoteOverlap { .. })
    ));
}

#[test]
fn test_note_after_linebreak() {
    let mut builder = SentenceBuilder::new();
    builder.add(note(0, 4)).unwrap();
    builder.set_linebreak(Beat(6)).unwrap();
    assert_eq!(builder.add(note(8, 1)), Err(BuildError::NoteAfterLinebreak));
}

#[test]
fn test_linebreak_inside_note() {
    let mut builder = SentenceBuilder::new();
    builder.add(note(0, 4)).unwrap();
    assert_eq!(
        builder.set_linebreak(Beat(3)),
        Err(BuildError::LinebreakConflict {
            beat: Beat(3),
            until: Beat(4)
        })
    );
    assert_eq!(builder.set_linebreak(Beat(4)), Ok(()));
    assert_eq!(builder.finalize().unwrap().linebreak_beat(), Some(Beat(4)));
}

#[test]
fn test_end_beat_is_max_over_notes() {
    let mut builder = SentenceBuilder::new();
    builder.add(note(0, 10)).unwrap();
    // zero-length note sitting exactly at the end of the first one
    builder.add(note(10, 0)).unwrap();
    let sentence = builder.finalize().unwrap();
    assert_eq!(sentence.end_beat(), Beat(10));
}

#[test]
fn test_finalize_empty() {
    assert_eq!(SentenceBuilder::new().finalize(), None);
}

#[test]
fn test_sentence_text() {
    let mut builder = SentenceBuilder::new();
    builder
        .add(Note::new(NoteType::Normal, Beat(0), Beat(1), 0, "Hel"))
        .unwrap();
    builder
        .add(Note::new(NoteType::Golden, Beat(1), Beat(1), 2, "lo "))
        .unwrap();
    assert_eq!(builder.finalize().unwrap().text(), "Hello ");
}
