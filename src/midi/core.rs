use midly::num::{u15, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::chart::note::Note;
use crate::chart::voice::{Chart, Voice};
use crate::midi::time::{Delta, MidiTempo, Tick, MAX_TICKS_PER_BEAT};

// NoteOff sorts before NoteOn so back-to-back notes on one key do not cut each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    NoteOff(u8),
    NoteOn(u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event<T> {
    tick: T,
    event_type: EventType,
}

static MIDI_CHANNEL: u8 = 0;
static MIDDLE_C: i64 = 60;
static NORMAL_VELOCITY: u8 = 100;
static GOLDEN_VELOCITY: u8 = 127;

/// MIDI key of a chart pitch. Pitch 0 is middle C; out-of-range pitches are clamped.
pub fn note_key(pitch: i64) -> u8 {
    pitch.saturating_add(MIDDLE_C).clamp(0, 127) as u8
}

#[test]
fn test_note_key() {
    assert_eq!(note_key(0), 60);
    assert_eq!(note_key(-12), 48);
    assert_eq!(note_key(100), 127);
    assert_eq!(note_key(i64::MIN), 0);
}

fn note_events(note: &Note, ticks_per_beat: u16) -> Option<[Event<Tick>; 2]> {
    if !note.note_type().is_pitched() || note.length().0 <= 0 {
        return None;
    }
    let start = Tick::from_beat(note.start_beat(), ticks_per_beat)?;
    let end = Tick::from_beat(note.end_beat(), ticks_per_beat)?;
    let key = note_key(note.pitch());
    let vel = if note.note_type().is_golden() {
        GOLDEN_VELOCITY
    } else {
        NORMAL_VELOCITY
    };
    Some([
        Event {
            tick: start,
            event_type: EventType::NoteOn(key, vel),
        },
        Event {
            tick: end,
            event_type: EventType::NoteOff(key),
        },
    ])
}

/// Sorted absolute-time events of every pitched note in the voice. Unpitched,
/// empty and unaddressable notes are left out.
fn flatten_voice(voice: &Voice, ticks_per_beat: u16) -> Vec<Event<Tick>> {
    let mut events: Vec<Event<Tick>> = voice
        .sentences()
        .iter()
        .flat_map(|s| s.notes())
        .filter_map(|n| note_events(n, ticks_per_beat))
        .flatten()
        .collect();
    events.sort();
    events
}

fn to_delta(events: &[Event<Tick>]) -> Vec<Event<Delta>> {
    let mut time = Tick(0);
    events
        .iter()
        .map(|e| {
            let delta = e.tick.delta_since(time);
            time = e.tick;
            Event {
                tick: delta,
                event_type: e.event_type,
            }
        })
        .collect()
}

fn create_track<'a>(
    name: &'a str,
    voice: &Voice,
    ticks_per_beat: u16,
    tempo: Option<MidiTempo>,
) -> Vec<TrackEvent<'a>> {
    let mut track = vec![TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    }];
    if let Some(MidiTempo(t)) = tempo {
        track.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(t)),
        });
    }
    for event in to_delta(&flatten_voice(voice, ticks_per_beat)) {
        let message = match event.event_type {
            EventType::NoteOn(key, vel) => MidiMessage::NoteOn {
                key: u7::from(key),
                vel: u7::from(vel),
            },
            EventType::NoteOff(key) => MidiMessage::NoteOff {
                key: u7::from(key),
                vel: u7::from(0),
            },
        };
        track.push(TrackEvent {
            delta: u28::from(event.tick.0),
            kind: TrackEventKind::Midi {
                channel: u4::from(MIDI_CHANNEL),
                message,
            },
        });
    }
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

/// Renders the chart as a MIDI preview, one track per voice sorted by identifier.
///
/// A chart beat is one quarter note of `ticks_per_beat` ticks, clamped to
/// 1..=0x7FFF. The tempo event goes into the first track only.
pub fn create_smf<'a>(chart: &'a Chart, ticks_per_beat: u16, bpm: Option<u32>) -> Smf<'a> {
    let ticks_per_beat = ticks_per_beat.clamp(1, MAX_TICKS_PER_BEAT);
    let tempo = bpm.and_then(MidiTempo::from_bpm);
    let tracks = chart
        .sorted_keys()
        .into_iter()
        .enumerate()
        .filter_map(|(i, key)| {
            let (name, voice) = chart.get_key_value(key)?;
            let tempo = if i == 0 { tempo } else { None };
            Some(create_track(name.as_str(), voice, ticks_per_beat, tempo))
        })
        .collect();
    Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::from(ticks_per_beat)),
        },
        tracks,
    }
}

#[cfg(test)]
fn test_chart() -> Chart {
    crate::dsl::process::parse_lines(
        [
            "P1",
            ": 0 2 0 a",
            "* 2 2 4 b",
            "- 4",
            "F 4 2 0 c",
            "P2",
            ": 1 1 -12 d",
            "R 2 1 0 e",
            "E",
        ],
        &["P1", "P2"],
    )
    .unwrap()
}

#[test]
fn test_flatten_voice() {
    let chart = test_chart();
    let events = flatten_voice(chart.voice("P1").unwrap(), 48);
    assert_eq!(
        events,
        vec![
            Event {
                tick: Tick(0),
                event_type: EventType::NoteOn(60, 100)
            },
            Event {
                tick: Tick(96),
                event_type: EventType::NoteOff(60)
            },
            Event {
                tick: Tick(96),
                event_type: EventType::NoteOn(64, 127)
            },
            Event {
                tick: Tick(192),
                event_type: EventType::NoteOff(64)
            },
        ]
    );
    assert_eq!(
        to_delta(&events)
            .iter()
            .map(|e| e.tick)
            .collect::<Vec<_>>(),
        vec![Delta(0), Delta(96), Delta(0), Delta(96)]
    );
}

#[test]
fn test_create_smf() {
    let chart = test_chart();
    let smf = create_smf(&chart, 48, Some(120));
    assert_eq!(smf.header.timing, Timing::Metrical(u15::from(48)));
    assert_eq!(smf.tracks.len(), 2);
    // name, tempo, 2 notes, end of track
    assert_eq!(smf.tracks[0].len(), 7);
    assert_eq!(
        smf.tracks[0][0].kind,
        TrackEventKind::Meta(MetaMessage::TrackName(b"P1"))
    );
    // name, 1 pitched note, end of track
    assert_eq!(smf.tracks[1].len(), 4);
    assert_eq!(
        smf.tracks[1][1],
        TrackEvent {
            delta: u28::from(48),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOn {
                    key: u7::from(48),
                    vel: u7::from(100)
                }
            }
        }
    );
}

#[test]
fn test_save_smf() {
    let chart = test_chart();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preview.mid");
    create_smf(&chart, 96, None).save(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 2);
    assert_eq!(smf.header.timing, Timing::Metrical(u15::from(96)));
}

#[test]
fn test_create_smf_clamps_division() {
    let chart = test_chart();
    let smf = create_smf(&chart, u16::MAX, None);
    assert_eq!(smf.header.timing, Timing::Metrical(u15::from(0x7FFF)));
    let smf = create_smf(&chart, 0, None);
    assert_eq!(smf.header.timing, Timing::Metrical(u15::from(1)));
    // one tick per beat: the first two-beat note ends two ticks after it starts
    assert_eq!(smf.tracks[0][2].delta, u28::from(2));
}
