use std::collections::HashMap;

use crate::chart::note::Beat;
use crate::chart::sentence::Sentence;
use crate::error::BuildError;

/// Ordered sentences of one voice part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Voice {
    sentences: Vec<Sentence>,
}

impl Voice {
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn note_count(&self) -> usize {
        self.sentences.iter().map(|s| s.notes().len()).sum()
    }

    pub fn start_beat(&self) -> Option<Beat> {
        self.sentences.first().map(Sentence::start_beat)
    }

    pub fn end_beat(&self) -> Option<Beat> {
        self.sentences.last().map(Sentence::end_beat)
    }

    /// One line of lyrics per sentence.
    pub fn lyrics(&self) -> Vec<String> {
        self.sentences.iter().map(Sentence::text).collect()
    }
}

#[derive(Debug, Default)]
pub struct VoiceBuilder {
    sentences: Vec<Sentence>,
}

impl VoiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sentence: Sentence) -> Result<(), BuildError> {
        if let Some(previous) = self.sentences.last() {
            let start = sentence.start_beat();
            if previous.end_beat() > start {
                return Err(BuildError::SentenceOverlap {
                    start,
                    previous_end: previous.end_beat(),
                });
            }
            if let Some(linebreak) = previous.linebreak_beat() {
                if linebreak > start {
                    return Err(BuildError::LinebreakOverlap { start, linebreak });
                }
            }
        }
        self.sentences.push(sentence);
        Ok(())
    }

    pub fn finalize(self) -> Voice {
        Voice {
            sentences: self.sentences,
        }
    }
}

/// Parsed chart: voice identifier to voice. A solo chart has a single voice
/// under the empty identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chart {
    voices: HashMap<String, Voice>,
}

impl Chart {
    pub fn new(voices: HashMap<String, Voice>) -> Self {
        Self { voices }
    }

    pub fn voice(&self, key: &str) -> Option<&Voice> {
        self.voices.get(key)
    }

    pub fn solo(&self) -> Option<&Voice> {
        self.voice("")
    }

    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn into_inner(self) -> HashMap<String, Voice> {
        self.voices
    }
}

impl std::ops::Deref for Chart {
    type Target = HashMap<String, Voice>;

    fn deref(&self) -> &Self::Target {
        &self.voices
    }
}

#[cfg(test)]
fn sentence(notes: &[(i64, i64)], linebreak: Option<i64>) -> Sentence {
    let mut builder = crate::chart::sentence::SentenceBuilder::new();
    for &(start, length) in notes {
        builder
            .add(crate::chart::sentence::note(start, length))
            .unwrap();
    }
    if let Some(beat) = linebreak {
        builder.set_linebreak(Beat(beat)).unwrap();
    }
    builder.finalize().unwrap()
}

#[test]
fn test_add_sentences_in_order() {
    let mut builder = VoiceBuilder::new();
    assert_eq!(builder.add(sentence(&[(0, 4)], Some(6))), Ok(()));
    assert_eq!(builder.add(sentence(&[(6, 2), (8, 2)], None)), Ok(()));
    let voice = builder.finalize();
    assert_eq!(voice.sentences().len(), 2);
    assert_eq!(voice.note_count(), 3);
    assert_eq!(voice.start_beat(), Some(Beat(0)));
    assert_eq!(voice.end_beat(), Some(Beat(10)));
}

#[test]
fn test_sentence_starts_before_previous_ends() {
    let mut builder = VoiceBuilder::new();
    builder.add(sentence(&[(0, 4)], Some(4))).unwrap();
    assert_eq!(
        builder.add(sentence(&[(3, 1)], None)),
        Err(BuildError::SentenceOverlap {
            start: Beat(3),
            previous_end: Beat(4)
        })
    );
}

#[test]
fn test_sentence_starts_before_previous_linebreak() {
    let mut builder = VoiceBuilder::new();
    builder.add(sentence(&[(0, 4)], Some(8))).unwrap();
    assert_eq!(
        builder.add(sentence(&[(6, 1)], None)),
        Err(BuildError::LinebreakOverlap {
            start: Beat(6),
            linebreak: Beat(8)
        })
    );
    // touching the linebreak is fine
    assert_eq!(builder.add(sentence(&[(8, 1)], None)), Ok(()));
}

#[test]
fn test_empty_voice() {
    let voice = VoiceBuilder::new().finalize();
    assert!(voice.is_empty());
    assert_eq!(voice.start_beat(), None);
    assert!(voice.lyrics().is_empty());
}

#[test]
fn test_chart_lookup() {
    let mut voices = HashMap::new();
    voices.insert("P2".to_string(), Voice::default());
    voices.insert("P1".to_string(), Voice::default());
    let chart = Chart::new(voices);
    assert_eq!(chart.sorted_keys(), vec!["P1", "P2"]);
    assert!(chart.voice("P1").is_some());
    assert!(chart.solo().is_none());
    assert_eq!(chart.len(), 2);
}
