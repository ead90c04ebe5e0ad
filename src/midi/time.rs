extern crate derive_more;
use midly::num::u24;

use crate::chart::note::Beat;

// Number of ticks since the beginning of the track.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
#[repr(transparent)]
pub struct Tick(pub u32);

#[test]
fn test_add_tick() {
    assert_eq!(Tick(2) + Tick(2), Tick(4));
}

// Time since the previous MIDI event of the same track, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, derive_more::Display)]
#[repr(transparent)]
pub struct Delta(pub u32);

// A chart beat maps onto a quarter note.
pub static DEFAULT_TICKS_PER_BEAT: u16 = 48;

// Largest division a metrical MIDI header can hold.
pub static MAX_TICKS_PER_BEAT: u16 = 0x7FFF;

// Largest delta-time a standard MIDI file can encode.
pub static MAX_TICK: u32 = 0x0FFF_FFFF;

impl Tick {
    /// Position of `beat`, or `None` when it is negative or past what a MIDI
    /// file can address.
    pub fn from_beat(beat: Beat, ticks_per_beat: u16) -> Option<Tick> {
        let beats = u32::try_from(beat.0).ok()?;
        beats
            .checked_mul(ticks_per_beat as u32)
            .filter(|&t| t <= MAX_TICK)
            .map(Tick)
    }

    pub fn delta_since(self, earlier: Tick) -> Delta {
        Delta(self.0.saturating_sub(earlier.0))
    }
}

#[test]
fn test_tick_from_beat() {
    assert_eq!(Tick::from_beat(Beat(0), 48), Some(Tick(0)));
    assert_eq!(Tick::from_beat(Beat(3), 48), Some(Tick(144)));
    assert_eq!(Tick::from_beat(Beat(-1), 48), None);
    assert_eq!(Tick::from_beat(Beat(i64::MAX), 48), None);
    assert_eq!(Tick::from_beat(Beat(0x0FFF_FFFF), 2), None);
    assert_eq!(Tick(10).delta_since(Tick(4)), Delta(6));
}

/// Microseconds per quarter note. Default is 500,000 for 120bpm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiTempo(pub u24);

impl MidiTempo {
    pub fn from_bpm(bpm: u32) -> Option<Self> {
        if bpm == 0 {
            return None;
        }
        let micros = 60_000_000 / bpm;
        if micros > 0x00FF_FFFF {
            return None;
        }
        Some(MidiTempo(u24::from(micros)))
    }
}

#[test]
fn test_tempo_from_bpm() {
    assert_eq!(MidiTempo::from_bpm(120), Some(MidiTempo(u24::from(500_000))));
    assert_eq!(MidiTempo::from_bpm(0), None);
    // 3 bpm needs 20,000,000 microseconds, more than 24 bits hold
    assert_eq!(MidiTempo::from_bpm(3), None);
}
