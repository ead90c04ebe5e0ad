use std::str;

use nom::character::complete::{anychar, digit1, one_of};
use nom::combinator::{all_consuming, map_opt, map_res, opt, recognize};
use nom::sequence::pair;
use nom::IResult;

use crate::chart::note::{Beat, Note, NoteType};
use crate::error::LineError;

/// One decoded chart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// `#...`, skipped without interpretation.
    Header,
    /// `E`, end of song.
    End,
    /// `P...`. The identifier is the whole line, tag included.
    VoiceSwitch(&'a str),
    /// `- <beat>`
    Linebreak(Beat),
    Note(Note),
}

// Signed base-10 integer, optional leading sign.
fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse)(input)
}

fn note_tag(input: &str) -> IResult<&str, NoteType> {
    map_opt(anychar, NoteType::from_tag)(input)
}

/// Parses a whole token as an integer. Partial matches such as `4x` are rejected.
fn number(token: &str) -> Result<i64, LineError> {
    all_consuming(integer)(token)
        .map(|(_, n)| n)
        .map_err(|_| LineError::InvalidNumber(token.to_string()))
}

fn linebreak(line: &str) -> Result<Instruction<'_>, LineError> {
    // skip the tag and exactly one separator character
    let mut chars = line.chars();
    chars.next();
    chars.next().ok_or(LineError::InvalidLinebreak)?;
    let payload = chars.as_str();
    Ok(Instruction::Linebreak(Beat(number(payload)?)))
}

fn note(line: &str) -> Result<Instruction<'_>, LineError> {
    let fields: Vec<&str> = line.splitn(5, char::is_whitespace).collect();
    if fields.len() < 5 {
        return Err(LineError::IncompleteNote);
    }
    let note_type = match all_consuming(note_tag)(fields[0]) {
        Ok((_, note_type)) => note_type,
        Err(_) => {
            return Err(match fields[0].chars().next() {
                Some(c) if NoteType::from_tag(c).is_none() => LineError::UnknownNoteTag(c),
                _ => LineError::InvalidInstruction(line.to_string()),
            })
        }
    };
    let start = number(fields[1])?;
    let length = number(fields[2])?;
    let pitch = number(fields[3])?;
    Ok(Instruction::Note(Note::new(
        note_type,
        Beat(start),
        Beat(length),
        pitch,
        fields[4],
    )))
}

/// Classifies a line by its first character and decodes its payload.
///
/// The line must already be stripped of its terminator. An empty line is an
/// error, not a blank.
pub fn instruction(line: &str) -> Result<Instruction<'_>, LineError> {
    match line.chars().next() {
        None => Err(LineError::Empty),
        Some('#') => Ok(Instruction::Header),
        Some('E') => Ok(Instruction::End),
        Some('P') => Ok(Instruction::VoiceSwitch(line)),
        Some('-') => linebreak(line),
        Some(':' | '*' | 'F' | 'R' | 'G') => note(line),
        Some(_) => Err(LineError::InvalidInstruction(line.to_string())),
    }
}

#[test]
fn parse_integer() {
    assert_eq!(integer("42"), Ok(("", 42)));
    assert_eq!(integer("-7 rest"), Ok((" rest", -7)));
    assert_eq!(integer("+3"), Ok(("", 3)));
    assert!(integer("x1").is_err());
    assert_eq!(number("4x"), Err(LineError::InvalidNumber("4x".to_string())));
    assert_eq!(number(""), Err(LineError::InvalidNumber("".to_string())));
}

#[test]
fn parse_note() {
    assert_eq!(
        instruction(": 0 4 60 la"),
        Ok(Instruction::Note(Note::new(
            NoteType::Normal,
            Beat(0),
            Beat(4),
            60,
            "la"
        )))
    );
    assert_eq!(
        instruction("* 12 2 -3 word"),
        Ok(Instruction::Note(Note::new(
            NoteType::Golden,
            Beat(12),
            Beat(2),
            -3,
            "word"
        )))
    );
}

#[test]
fn parse_note_types() {
    for (line, note_type) in [
        (": 0 1 0 a", NoteType::Normal),
        ("* 0 1 0 a", NoteType::Golden),
        ("F 0 1 0 a", NoteType::Freestyle),
        ("R 0 1 0 a", NoteType::Rap),
        ("G 0 1 0 a", NoteType::RapGolden),
    ] {
        match instruction(line) {
            Ok(Instruction::Note(note)) => assert_eq!(note.note_type(), note_type),
            other => panic!("{:?} parsed as {:?}", line, other),
        }
    }
}

#[test]
fn parse_note_text_keeps_rest_of_line() {
    match instruction(": 4 2 5  two words ") {
        Ok(Instruction::Note(note)) => assert_eq!(note.text(), " two words "),
        other => panic!("unexpected {:?}", other),
    }
    match instruction(": 4 2 5 ") {
        Ok(Instruction::Note(note)) => assert_eq!(note.text(), ""),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn parse_incomplete_note() {
    assert_eq!(instruction(": 0 4 60"), Err(LineError::IncompleteNote));
    assert_eq!(instruction(":"), Err(LineError::IncompleteNote));
}

#[test]
fn parse_note_bad_numbers() {
    assert_eq!(
        instruction(": 0 four 60 la"),
        Err(LineError::InvalidNumber("four".to_string()))
    );
    assert_eq!(
        instruction(": x 4 60 la"),
        Err(LineError::InvalidNumber("x".to_string()))
    );
    assert_eq!(
        instruction(": 0 4 6.5 la"),
        Err(LineError::InvalidNumber("6.5".to_string()))
    );
}

#[test]
fn parse_note_glued_tag() {
    assert_eq!(
        instruction(":: 0 4 60 la"),
        Err(LineError::InvalidInstruction(":: 0 4 60 la".to_string()))
    );
}

#[test]
fn parse_linebreak() {
    assert_eq!(instruction("- 4"), Ok(Instruction::Linebreak(Beat(4))));
    assert_eq!(instruction("- -2"), Ok(Instruction::Linebreak(Beat(-2))));
    assert_eq!(instruction("-"), Err(LineError::InvalidLinebreak));
    assert_eq!(
        instruction("-4"),
        Err(LineError::InvalidNumber("".to_string()))
    );
    // multi-byte separator, same as note lines accept
    assert_eq!(instruction("-\u{a0}4"), Ok(Instruction::Linebreak(Beat(4))));
    assert_eq!(
        instruction("- 4 8"),
        Err(LineError::InvalidNumber("4 8".to_string()))
    );
    assert_eq!(
        instruction("- x"),
        Err(LineError::InvalidNumber("x".to_string()))
    );
}

#[test]
fn parse_other_lines() {
    assert_eq!(instruction("#TITLE:Song"), Ok(Instruction::Header));
    assert_eq!(instruction("E"), Ok(Instruction::End));
    assert_eq!(instruction("P1"), Ok(Instruction::VoiceSwitch("P1")));
    assert_eq!(instruction("P 2"), Ok(Instruction::VoiceSwitch("P 2")));
    assert_eq!(instruction(""), Err(LineError::Empty));
    assert_eq!(
        instruction("X 0 1 2 a"),
        Err(LineError::InvalidInstruction("X 0 1 2 a".to_string()))
    );
    assert_eq!(
        instruction(" : 0 1 2 a"),
        Err(LineError::InvalidInstruction(" : 0 1 2 a".to_string()))
    );
}
