extern crate derive_more;
use std::fmt;

// Abstract time unit of the chart format. Not tied to wall-clock time.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
#[repr(transparent)]
pub struct Beat(pub i64);

#[test]
fn test_add_beat() {
    assert_eq!(Beat(2) + Beat(2), Beat(4));
    assert_eq!(Beat(2) - Beat(5), Beat(-3));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteType {
    Normal,
    Golden,
    Freestyle,
    Rap,
    RapGolden,
}

impl NoteType {
    pub fn from_tag(tag: char) -> Option<NoteType> {
        match tag {
            ':' => Some(NoteType::Normal),
            '*' => Some(NoteType::Golden),
            'F' => Some(NoteType::Freestyle),
            'R' => Some(NoteType::Rap),
            'G' => Some(NoteType::RapGolden),
            _ => None,
        }
    }

    pub fn tag(&self) -> char {
        match self {
            NoteType::Normal => ':',
            NoteType::Golden => '*',
            NoteType::Freestyle => 'F',
            NoteType::Rap => 'R',
            NoteType::RapGolden => 'G',
        }
    }

    pub fn is_golden(&self) -> bool {
        matches!(self, NoteType::Golden | NoteType::RapGolden)
    }

    pub fn is_rap(&self) -> bool {
        matches!(self, NoteType::Rap | NoteType::RapGolden)
    }

    pub fn is_freestyle(&self) -> bool {
        *self == NoteType::Freestyle
    }

    /// Whether the note carries a sung pitch. Freestyle and rap notes keep
    /// their pitch field but it is not meant to be matched.
    pub fn is_pitched(&self) -> bool {
        matches!(self, NoteType::Normal | NoteType::Golden)
    }
}

#[test]
fn test_note_type_tags() {
    for tag in [':', '*', 'F', 'R', 'G'] {
        assert_eq!(NoteType::from_tag(tag).map(|t| t.tag()), Some(tag));
    }
    assert_eq!(NoteType::from_tag('X'), None);
    assert!(NoteType::RapGolden.is_golden());
    assert!(NoteType::RapGolden.is_rap());
    assert!(!NoteType::Freestyle.is_pitched());
}

/// One sung (or spoken) syllable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    note_type: NoteType,
    start_beat: Beat,
    length: Beat,
    pitch: i64,
    text: String,
}

impl Note {
    pub fn new(note_type: NoteType, start_beat: Beat, length: Beat, pitch: i64, text: impl Into<String>) -> Self {
        Self {
            note_type,
            start_beat,
            length,
            pitch,
            text: text.into(),
        }
    }

    pub fn note_type(&self) -> NoteType {
        self.note_type
    }

    pub fn start_beat(&self) -> Beat {
        self.start_beat
    }

    pub fn length(&self) -> Beat {
        self.length
    }

    pub fn pitch(&self) -> i64 {
        self.pitch
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// First beat after the note. Saturates instead of overflowing on absurd input.
    pub fn end_beat(&self) -> Beat {
        Beat(self.start_beat.0.saturating_add(self.length.0))
    }
}

// Re-emits the note in chart line form.
impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.note_type.tag(),
            self.start_beat,
            self.length,
            self.pitch,
            self.text
        )
    }
}

#[test]
fn test_note_display() {
    let note = Note::new(NoteType::Golden, Beat(12), Beat(3), -2, " la");
    assert_eq!(note.to_string(), "* 12 3 -2  la");
    assert_eq!(note.end_beat(), Beat(15));
}
