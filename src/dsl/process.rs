use std::collections::HashMap;
use std::io::BufRead;

use log::{debug, info, trace};

use crate::chart::sentence::SentenceBuilder;
use crate::chart::voice::{Chart, VoiceBuilder};
use crate::dsl::line::{instruction, Instruction};
use crate::error::{Error, ErrorKind, Result};

/// Line-by-line state of one parse.
struct ChartParser {
    voices: HashMap<String, VoiceBuilder>,
    active_voice: Option<String>,
    active_sentence: Option<SentenceBuilder>,
    line: usize,
    done: bool,
}

impl ChartParser {
    fn new<V: AsRef<str>>(declared: &[V]) -> Self {
        let mut voices: HashMap<String, VoiceBuilder> = declared
            .iter()
            .map(|v| (v.as_ref().to_string(), VoiceBuilder::new()))
            .collect();
        // Solo chart: one unnamed voice, active from the first line.
        let active_voice = if voices.is_empty() {
            voices.insert(String::new(), VoiceBuilder::new());
            Some(String::new())
        } else {
            None
        };
        ChartParser {
            voices,
            active_voice,
            active_sentence: None,
            line: 0,
            done: false,
        }
    }

    /// Consumes one line. Returns `true` once the song has ended.
    fn feed(&mut self, line: &str) -> Result<bool> {
        self.line += 1;
        trace!("line {}: {:?}", self.line, line);
        let number = self.line;
        self.dispatch(line).map_err(|kind| Error::at(number, kind))?;
        Ok(self.done)
    }

    fn dispatch(&mut self, line: &str) -> std::result::Result<(), ErrorKind> {
        match instruction(line)? {
            Instruction::Header => {}
            Instruction::Note(note) => {
                if self.active_voice.is_none() {
                    return Err(ErrorKind::NoActiveVoice);
                }
                self.active_sentence
                    .get_or_insert_with(SentenceBuilder::new)
                    .add(note)?;
            }
            Instruction::Linebreak(beat) => {
                if self.active_voice.is_none() {
                    return Err(ErrorKind::NoActiveVoice);
                }
                let mut sentence = self
                    .active_sentence
                    .take()
                    .ok_or(ErrorKind::NoActiveSentence)?;
                sentence.set_linebreak(beat)?;
                self.commit(sentence)?;
            }
            Instruction::VoiceSwitch(key) => {
                // the pending sentence belongs to the previous voice, so it is
                // finalized before the new identifier is looked up
                self.flush()?;
                if !self.voices.contains_key(key) {
                    return Err(ErrorKind::UnknownVoice(key.to_string()));
                }
                debug!("line {}: switching to voice {:?}", self.line, key);
                self.active_voice = Some(key.to_string());
            }
            Instruction::End => {
                self.flush()?;
                self.done = true;
            }
        }
        Ok(())
    }

    /// Finalizes the in-progress sentence, if any, into the active voice.
    fn flush(&mut self) -> std::result::Result<(), ErrorKind> {
        match self.active_sentence.take() {
            Some(sentence) => self.commit(sentence),
            None => Ok(()),
        }
    }

    fn commit(&mut self, sentence: SentenceBuilder) -> std::result::Result<(), ErrorKind> {
        let key = self.active_voice.as_deref().ok_or(ErrorKind::NoActiveVoice)?;
        let voice = self
            .voices
            .get_mut(key)
            .ok_or_else(|| ErrorKind::UnknownVoice(key.to_string()))?;
        if let Some(sentence) = sentence.finalize() {
            debug!(
                "line {}: sentence {}..{} added to voice {:?}",
                self.line,
                sentence.start_beat(),
                sentence.end_beat(),
                key
            );
            voice.add(sentence)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Chart> {
        // Running out of lines without `E` counts as the end of the song.
        if !self.done {
            let number = self.line;
            self.flush().map_err(|kind| Error::at(number, kind))?;
        }
        let voices: HashMap<_, _> = self
            .voices
            .into_iter()
            .map(|(key, builder)| (key, builder.finalize()))
            .collect();
        info!(
            "parsed {} lines into {} voice(s)",
            self.line,
            voices.len()
        );
        Ok(Chart::new(voices))
    }
}

/// Parses already-decoded chart lines against the declared voice identifiers.
///
/// With no declared voices the chart is a solo chart and the result holds a
/// single voice under the empty identifier. Lines after `E` are never read.
pub fn parse_lines<I, S, V>(lines: I, voices: &[V]) -> Result<Chart>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    V: AsRef<str>,
{
    let mut parser = ChartParser::new(voices);
    for line in lines {
        if parser.feed(line.as_ref())? {
            break;
        }
    }
    parser.finish()
}

/// Same as [`parse_lines`], reading UTF-8 lines from `reader`.
///
/// The reader is consumed and dropped on every exit path.
pub fn parse_reader<R: BufRead, V: AsRef<str>>(reader: R, voices: &[V]) -> Result<Chart> {
    let mut parser = ChartParser::new(voices);
    for line in reader.lines() {
        if parser.feed(&line?)? {
            break;
        }
    }
    parser.finish()
}

#[cfg(test)]
use crate::chart::note::{Beat, Note, NoteType};
#[cfg(test)]
use crate::error::{BuildError, LineError};

#[cfg(test)]
static SOLO: &[&str] = &[];

#[cfg(test)]
fn parse_err<V: AsRef<str>>(lines: &[&str], voices: &[V]) -> (usize, ErrorKind) {
    match parse_lines(lines, voices) {
        Err(Error::Parse { line, kind }) => (line, kind),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_single_sentence_solo() {
    let chart = parse_lines([": 0 4 60 la", "- 4", "E"], SOLO).unwrap();
    assert_eq!(chart.len(), 1);
    let voice = chart.solo().unwrap();
    assert_eq!(voice.sentences().len(), 1);
    let sentence = &voice.sentences()[0];
    assert_eq!(
        sentence.notes(),
        &[Note::new(NoteType::Normal, Beat(0), Beat(4), 60, "la")]
    );
    assert_eq!(sentence.linebreak_beat(), Some(Beat(4)));
}

#[test]
fn test_overlapping_notes() {
    let (line, kind) = parse_err(&[": 0 4 60 la", ": 2 4 61 na", "E"], SOLO);
    assert_eq!(line, 2);
    assert_eq!(
        kind,
        ErrorKind::Build(BuildError::NoteOverlap {
            start: Beat(2),
            until: Beat(4)
        })
    );
}

#[test]
fn test_two_voices() {
    let chart = parse_lines(
        ["P1", ": 0 2 60 a", "- 2", "P2", ": 0 2 61 b", "- 2", "E"],
        &["P1", "P2"],
    )
    .unwrap();
    assert_eq!(chart.sorted_keys(), vec!["P1", "P2"]);
    assert_eq!(chart.voice("P1").unwrap().lyrics(), vec!["a"]);
    assert_eq!(chart.voice("P2").unwrap().lyrics(), vec!["b"]);
}

#[test]
fn test_unknown_voice() {
    let (line, kind) = parse_err(&["#TITLE:x", "P1", ": 0 2 60 a", "P3"], &["P1", "P2"]);
    assert_eq!(line, 4);
    assert_eq!(kind, ErrorKind::UnknownVoice("P3".to_string()));
}

#[test]
fn test_voice_switch_in_solo_chart() {
    let (line, kind) = parse_err(&[": 0 2 60 a", "P1"], SOLO);
    assert_eq!(line, 2);
    assert_eq!(kind, ErrorKind::UnknownVoice("P1".to_string()));
}

#[test]
fn test_linebreak_after_switch() {
    let (line, kind) = parse_err(&["P1", ": 0 2 60 a", "P2", "- 2"], &["P1", "P2"]);
    assert_eq!(line, 4);
    assert_eq!(kind, ErrorKind::NoActiveSentence);
}

#[test]
fn test_note_before_voice() {
    let (line, kind) = parse_err(&["#ARTIST:x", ": 0 2 60 a"], &["P1"]);
    assert_eq!(line, 2);
    assert_eq!(kind, ErrorKind::NoActiveVoice);

    let (line, kind) = parse_err(&["- 2"], &["P1"]);
    assert_eq!(line, 1);
    assert_eq!(kind, ErrorKind::NoActiveVoice);
}

#[test]
fn test_switch_finalizes_into_previous_voice() {
    let chart = parse_lines(
        ["P1", ": 0 2 60 a", "P2", ": 0 2 61 b", "E"],
        &["P1", "P2"],
    )
    .unwrap();
    let p1 = chart.voice("P1").unwrap();
    assert_eq!(p1.lyrics(), vec!["a"]);
    assert_eq!(p1.sentences()[0].linebreak_beat(), None);
    assert_eq!(chart.voice("P2").unwrap().lyrics(), vec!["b"]);
}

#[test]
fn test_returning_to_voice_checks_order() {
    let (line, kind) = parse_err(
        &["P1", ": 0 4 60 a", "- 6", "P2", ": 0 2 61 b", "P1", ": 5 1 60 c", "E"],
        &["P1", "P2"],
    );
    assert_eq!(line, 8);
    assert_eq!(
        kind,
        ErrorKind::Build(BuildError::LinebreakOverlap {
            start: Beat(5),
            linebreak: Beat(6)
        })
    );
}

#[test]
fn test_sentence_overlap_reported_at_linebreak() {
    let (line, kind) = parse_err(&[": 0 4 60 a", "- 4", ": 2 1 60 b", "- 5"], SOLO);
    assert_eq!(line, 4);
    assert!(matches!(
        kind,
        ErrorKind::Build(BuildError::SentenceOverlap { .. })
    ));
}

#[test]
fn test_unused_voice_is_empty() {
    let chart = parse_lines(["P1", ": 0 1 0 a", "E"], &["P1", "P2"]).unwrap();
    assert!(chart.voice("P2").unwrap().is_empty());
}

#[test]
fn test_missing_end_line() {
    let chart = parse_lines([": 0 4 60 la", "- 4", ": 4 2 60 na"], SOLO).unwrap();
    let voice = chart.solo().unwrap();
    assert_eq!(voice.lyrics(), vec!["la", "na"]);
    assert_eq!(voice.sentences()[1].linebreak_beat(), None);
}

#[test]
fn test_missing_end_line_overlap() {
    let (line, kind) = parse_err(&[": 0 4 60 a", "- 4", ": 2 1 60 b"], SOLO);
    assert_eq!(line, 3);
    assert_eq!(
        kind,
        ErrorKind::Build(BuildError::SentenceOverlap {
            start: Beat(2),
            previous_end: Beat(4)
        })
    );
}

#[test]
fn test_switch_flush_conflict() {
    let expected = ErrorKind::Build(BuildError::LinebreakOverlap {
        start: Beat(5),
        linebreak: Beat(6),
    });
    let (line, kind) = parse_err(
        &["P1", ": 0 4 60 a", "- 6", ": 5 1 0 b", "P2"],
        &["P1", "P2"],
    );
    assert_eq!(line, 5);
    assert_eq!(kind, expected);

    // the pending sentence is checked before the identifier
    let (line, kind) = parse_err(
        &["P1", ": 0 4 60 a", "- 6", ": 5 1 0 b", "P9"],
        &["P1", "P2"],
    );
    assert_eq!(line, 5);
    assert_eq!(kind, expected);
}

#[test]
fn test_multibyte_separator() {
    let chart = parse_lines([":\u{a0}0 4 60 a", "-\u{a0}4", "E"], SOLO).unwrap();
    let sentence = &chart.solo().unwrap().sentences()[0];
    assert_eq!(sentence.linebreak_beat(), Some(Beat(4)));
}

#[test]
fn test_lines_after_end_are_ignored() {
    let chart = parse_lines([": 0 4 60 la", "E", "garbage", ""], SOLO).unwrap();
    assert_eq!(chart.solo().unwrap().note_count(), 1);
}

#[test]
fn test_invalid_lines() {
    let (line, kind) = parse_err(&["#TITLE:x", "#BPM:100", "? 0 1 2"], SOLO);
    assert_eq!(line, 3);
    assert_eq!(
        kind,
        ErrorKind::Line(LineError::InvalidInstruction("? 0 1 2".to_string()))
    );

    let (line, kind) = parse_err(&[": 0 4 60 la", ""], SOLO);
    assert_eq!(line, 2);
    assert_eq!(kind, ErrorKind::Line(LineError::Empty));

    let (line, kind) = parse_err(&[": 0 x 60 la"], SOLO);
    assert_eq!(line, 1);
    assert_eq!(
        kind,
        ErrorKind::Line(LineError::InvalidNumber("x".to_string()))
    );
}

#[test]
fn test_error_message() {
    let err = parse_lines(["#TITLE:x", ": 0 4 60 la", "- 3"], SOLO).unwrap_err();
    assert_eq!(
        err.to_string(),
        "line 3: linebreak at beat 3 conflicts with existing sentence, which lasts until beat 4"
    );
}

#[test]
fn test_reparse_is_equal() {
    let lines = [
        "#TITLE:Song",
        ": 0 2 3 Hel",
        "* 2 2 5 lo",
        "- 6",
        "F 8 4 0 hey",
        "R 12 1 0  you",
        "E",
    ];
    let first = parse_lines(lines, SOLO).unwrap();
    let second = parse_lines(lines, SOLO).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parsed_invariants() {
    let lines = [
        "P1", ": 0 2 0 a", ": 2 0 0 b", ": 3 1 0 c", "- 5", ": 5 1 0 d", "- 9",
        "P2", "* 1 1 0 e", "- 2", "G 2 3 0 f", "E",
    ];
    let chart = parse_lines(lines, &["P1", "P2"]).unwrap();
    for voice in chart.values() {
        for sentence in voice.sentences() {
            for pair in sentence.notes().windows(2) {
                assert!(pair[0].end_beat() <= pair[1].start_beat());
            }
        }
        for pair in voice.sentences().windows(2) {
            assert!(pair[0].end_beat() <= pair[1].start_beat());
            if let Some(linebreak) = pair[0].linebreak_beat() {
                assert!(linebreak <= pair[1].start_beat());
            }
        }
    }
}

#[test]
fn test_parse_reader() {
    let input = "#TITLE:x\r\nP1\r\n: 0 4 60 la\r\n- 4\r\nE\r\n";
    let chart = parse_reader(std::io::Cursor::new(input), &["P1"]).unwrap();
    assert_eq!(chart.voice("P1").unwrap().lyrics(), vec!["la"]);
}

#[test]
fn test_parse_reader_invalid_utf8() {
    let input: &[u8] = b": 0 4 60 l\xffa\n";
    let err = parse_reader(input, SOLO).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.line(), None);
}
