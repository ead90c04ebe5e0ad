//! Parser and validator for line-oriented karaoke song charts.
//!
//! A chart is a sequence of text lines. Header lines (`#...`) are skipped,
//! note lines (`:`, `*`, `F`, `R`, `G`) accumulate into sentences, `-` lines
//! close a sentence, `P...` lines switch the active voice and `E` ends the song.
//! The result is a [`Chart`]: every declared voice mapped to its ordered,
//! non-overlapping sentences.
//!
//! ```
//! use songchart::parse_lines;
//!
//! let chart = parse_lines([": 0 4 60 la", "- 4", "E"], &[] as &[&str]).unwrap();
//! assert_eq!(chart.solo().unwrap().sentences().len(), 1);
//! ```

pub mod chart;
pub mod dsl;
pub mod error;
pub mod midi;

pub use chart::note::{Beat, Note, NoteType};
pub use chart::sentence::{Sentence, SentenceBuilder};
pub use chart::voice::{Chart, Voice, VoiceBuilder};
pub use dsl::process::{parse_lines, parse_reader};
pub use error::{BuildError, Error, ErrorKind, LineError, Result};
