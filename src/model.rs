//! Data model for a decoded MIDI file.
//!
//! Raw events are kept exactly as decoded so a document can be re-encoded
//! for playback; notes are the paired Note-On/Note-Off view used for
//! notation. Both are plain values: transforms clone before mutating.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// Status bytes and meta subtypes
// ═══════════════════════════════════════════════════════════════════════

pub const EVENT_NOTE_OFF: u8 = 0x80;
pub const EVENT_NOTE_ON: u8 = 0x90;
pub const EVENT_KEY_PRESSURE: u8 = 0xA0;
pub const EVENT_CONTROL_CHANGE: u8 = 0xB0;
pub const EVENT_PROGRAM_CHANGE: u8 = 0xC0;
pub const EVENT_CHANNEL_PRESSURE: u8 = 0xD0;
pub const EVENT_PITCH_BEND: u8 = 0xE0;
pub const SYSEX_EVENT_1: u8 = 0xF0;
pub const SYSEX_EVENT_2: u8 = 0xF7;
pub const META_EVENT: u8 = 0xFF;

pub const META_SEQUENCE_NAME: u8 = 0x03;
pub const META_LYRIC: u8 = 0x05;
pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_TEMPO: u8 = 0x51;
pub const META_TIME_SIGNATURE: u8 = 0x58;

/// Channel reserved for percussion in General MIDI.
pub const PERCUSSION_CHANNEL: u8 = 9;
/// Pseudo instrument id used for percussion tracks.
pub const PERCUSSION_INSTRUMENT: u8 = 128;

// ═══════════════════════════════════════════════════════════════════════
// Raw events
// ═══════════════════════════════════════════════════════════════════════

/// Event kind tag, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOff,
    NoteOn,
    KeyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    Sysex,
    Meta,
}

/// Meta event payloads. Tempo and time signature are decoded into typed
/// fields; everything else keeps its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaEvent {
    /// Microseconds per quarter note (24-bit).
    Tempo(u32),
    TimeSignature {
        numerator: u8,
        /// The denominator is stored as a power of two, as on the wire.
        denominator_log2: u8,
        /// Trailing bytes (clocks per click, 32nds per quarter), kept verbatim.
        extra: Vec<u8>,
    },
    Other { subtype: u8, data: Vec<u8> },
}

impl MetaEvent {
    pub fn subtype(&self) -> u8 {
        match self {
            MetaEvent::Tempo(_) => META_TEMPO,
            MetaEvent::TimeSignature { .. } => META_TIME_SIGNATURE,
            MetaEvent::Other { subtype, .. } => *subtype,
        }
    }

    /// The payload bytes as they appear after the length prefix.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            MetaEvent::Tempo(t) => vec![(t >> 16) as u8, (t >> 8) as u8, *t as u8],
            MetaEvent::TimeSignature { numerator, denominator_log2, extra } => {
                let mut data = vec![*numerator, *denominator_log2];
                data.extend_from_slice(extra);
                data
            }
            MetaEvent::Other { data, .. } => data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    NoteOff { number: u8, velocity: u8 },
    NoteOn { number: u8, velocity: u8 },
    KeyPressure { number: u8, pressure: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { instrument: u8 },
    ChannelPressure { pressure: u8 },
    /// The two data bytes as read, most significant first.
    PitchBend { value: u16 },
    /// `status` is 0xF0 or 0xF7.
    Sysex { status: u8, data: Vec<u8> },
    Meta(MetaEvent),
}

/// One decoded track event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Pulses since the previous event in the same track.
    pub delta_time: u32,
    /// Absolute time in pulses from the start of the track.
    pub start_time: i32,
    /// Channel for per-channel events, 0 for Sysex/Meta.
    pub channel: u8,
    pub payload: EventPayload,
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::NoteOff { .. } => EventKind::NoteOff,
            EventPayload::NoteOn { .. } => EventKind::NoteOn,
            EventPayload::KeyPressure { .. } => EventKind::KeyPressure,
            EventPayload::ControlChange { .. } => EventKind::ControlChange,
            EventPayload::ProgramChange { .. } => EventKind::ProgramChange,
            EventPayload::ChannelPressure { .. } => EventKind::ChannelPressure,
            EventPayload::PitchBend { .. } => EventKind::PitchBend,
            EventPayload::Sysex { .. } => EventKind::Sysex,
            EventPayload::Meta(_) => EventKind::Meta,
        }
    }

    /// The status byte this event is written with (channel folded in).
    pub fn status(&self) -> u8 {
        let base = match &self.payload {
            EventPayload::NoteOff { .. } => EVENT_NOTE_OFF,
            EventPayload::NoteOn { .. } => EVENT_NOTE_ON,
            EventPayload::KeyPressure { .. } => EVENT_KEY_PRESSURE,
            EventPayload::ControlChange { .. } => EVENT_CONTROL_CHANGE,
            EventPayload::ProgramChange { .. } => EVENT_PROGRAM_CHANGE,
            EventPayload::ChannelPressure { .. } => EVENT_CHANNEL_PRESSURE,
            EventPayload::PitchBend { .. } => EVENT_PITCH_BEND,
            EventPayload::Sysex { status, .. } => return *status,
            EventPayload::Meta(_) => return META_EVENT,
        };
        base | (self.channel & 0x0F)
    }

    pub fn tempo(&self) -> Option<u32> {
        match self.payload {
            EventPayload::Meta(MetaEvent::Tempo(t)) => Some(t),
            _ => None,
        }
    }

    /// Create a tempo meta event at time zero.
    pub fn tempo_event(tempo: u32) -> Self {
        Self {
            delta_time: 0,
            start_time: 0,
            channel: 0,
            payload: EventPayload::Meta(MetaEvent::Tempo(tempo)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Notes and tracks
// ═══════════════════════════════════════════════════════════════════════

/// A sounding note, reconstructed from a Note-On and its matching Note-Off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub start_time: i32,
    pub channel: u8,
    /// MIDI note number; middle C is 60.
    pub number: i32,
    /// Duration in pulses; 0 while the note is still open.
    pub duration: i32,
}

impl Note {
    pub fn new(start_time: i32, channel: u8, number: i32, duration: i32) -> Self {
        Self { start_time, channel, number, duration }
    }

    pub fn end_time(&self) -> i32 {
        self.start_time + self.duration
    }

    pub fn note_off(&mut self, end_time: i32) {
        self.duration = end_time - self.start_time;
    }
}

/// Orders notes by start time, then note number.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.number.cmp(&b.number)));
}

/// Lyric text (meta subtype 0x05) attached to a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyric {
    pub start_time: i32,
    pub channel: u8,
    pub text: String,
}

/// A logical track: the notes of one physical track, or of one channel when
/// a single multi-channel track was split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Index of the physical track these notes came from, or a synthetic
    /// number for tracks produced by splitting/merging.
    pub number: usize,
    pub notes: Vec<Note>,
    pub lyrics: Vec<Lyric>,
    /// General MIDI program, or [`PERCUSSION_INSTRUMENT`].
    pub instrument: u8,
}

impl Track {
    pub fn new(number: usize) -> Self {
        Self { number, notes: Vec::new(), lyrics: Vec::new(), instrument: 0 }
    }

    /// Build a track from a physical track's event list, pairing Note-On with
    /// Note-Off (or Note-On with velocity 0).
    pub fn from_events(events: &[RawEvent], number: usize) -> Self {
        let mut track = Track::new(number);
        for ev in events {
            match &ev.payload {
                EventPayload::NoteOn { number, velocity } if *velocity > 0 => {
                    track.add_note(Note::new(ev.start_time, ev.channel, i32::from(*number), 0));
                }
                EventPayload::NoteOn { number, .. } | EventPayload::NoteOff { number, .. } => {
                    track.note_off(ev.channel, i32::from(*number), ev.start_time);
                }
                EventPayload::ProgramChange { instrument } => {
                    track.instrument = *instrument;
                }
                EventPayload::Meta(MetaEvent::Other { subtype: META_LYRIC, data }) => {
                    track.add_lyric(Lyric {
                        start_time: ev.start_time,
                        channel: ev.channel,
                        text: String::from_utf8_lossy(data).into_owned(),
                    });
                }
                _ => {}
            }
        }
        sort_notes(&mut track.notes);
        if track.notes.first().map(|n| n.channel) == Some(PERCUSSION_CHANNEL) {
            track.instrument = PERCUSSION_INSTRUMENT;
        }
        track
    }

    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    /// Close the most recently opened note on this channel and number.
    /// A Note-Off without an open note is ignored.
    pub fn note_off(&mut self, channel: u8, number: i32, end_time: i32) {
        if let Some(note) = self
            .notes
            .iter_mut()
            .rev()
            .find(|n| n.channel == channel && n.number == number && n.duration == 0)
        {
            note.note_off(end_time);
        }
    }

    pub fn add_lyric(&mut self, lyric: Lyric) {
        self.lyrics.push(lyric);
    }

    pub fn instrument_name(&self) -> &'static str {
        instrument_name(self.instrument)
    }

    /// True if notes in this track use more than one channel.
    pub fn has_multiple_channels(&self) -> bool {
        match self.notes.first() {
            Some(first) => self.notes.iter().any(|n| n.channel != first.channel),
            None => false,
        }
    }

    pub fn end_time(&self) -> i32 {
        self.notes.iter().map(Note::end_time).max().unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Instrument names
// ═══════════════════════════════════════════════════════════════════════

/// General MIDI program names, indexed by program number, plus "Percussion" at 128.
pub const INSTRUMENT_NAMES: [&str; 129] = [
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano",
    "Honky-tonk Piano", "Electric Piano 1", "Electric Piano 2", "Harpsichord",
    "Clavi", "Celesta", "Glockenspiel", "Music Box", "Vibraphone", "Marimba",
    "Xylophone", "Tubular Bells", "Dulcimer", "Drawbar Organ", "Percussive Organ",
    "Rock Organ", "Church Organ", "Reed Organ", "Accordion", "Harmonica",
    "Tango Accordion", "Acoustic Guitar (nylon)", "Acoustic Guitar (steel)",
    "Electric Guitar (jazz)", "Electric Guitar (clean)", "Electric Guitar (muted)",
    "Overdriven Guitar", "Distortion Guitar", "Guitar harmonics", "Acoustic Bass",
    "Electric Bass (finger)", "Electric Bass (pick)", "Fretless Bass", "Slap Bass 1",
    "Slap Bass 2", "Synth Bass 1", "Synth Bass 2", "Violin", "Viola", "Cello",
    "Contrabass", "Tremolo Strings", "Pizzicato Strings", "Orchestral Harp",
    "Timpani", "String Ensemble 1", "String Ensemble 2", "SynthStrings 1",
    "SynthStrings 2", "Choir Aahs", "Voice Oohs", "Synth Voice", "Orchestra Hit",
    "Trumpet", "Trombone", "Tuba", "Muted Trumpet", "French Horn", "Brass Section",
    "SynthBrass 1", "SynthBrass 2", "Soprano Sax", "Alto Sax", "Tenor Sax",
    "Baritone Sax", "Oboe", "English Horn", "Bassoon", "Clarinet", "Piccolo",
    "Flute", "Recorder", "Pan Flute", "Blown Bottle", "Shakuhachi", "Whistle",
    "Ocarina", "Lead 1 (square)", "Lead 2 (sawtooth)", "Lead 3 (calliope)",
    "Lead 4 (chiff)", "Lead 5 (charang)", "Lead 6 (voice)", "Lead 7 (fifths)",
    "Lead 8 (bass + lead)", "Pad 1 (new age)", "Pad 2 (warm)", "Pad 3 (polysynth)",
    "Pad 4 (choir)", "Pad 5 (bowed)", "Pad 6 (metallic)", "Pad 7 (halo)",
    "Pad 8 (sweep)", "FX 1 (rain)", "FX 2 (soundtrack)", "FX 3 (crystal)",
    "FX 4 (atmosphere)", "FX 5 (brightness)", "FX 6 (goblins)", "FX 7 (echoes)",
    "FX 8 (sci-fi)", "Sitar", "Banjo", "Shamisen", "Koto", "Kalimba", "Bag pipe",
    "Fiddle", "Shanai", "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock",
    "Taiko Drum", "Melodic Tom", "Synth Drum", "Reverse Cymbal",
    "Guitar Fret Noise", "Breath Noise", "Seashore", "Bird Tweet",
    "Telephone Ring", "Helicopter", "Applause", "Gunshot", "Percussion",
];

pub fn instrument_name(instrument: u8) -> &'static str {
    INSTRUMENT_NAMES.get(usize::from(instrument)).copied().unwrap_or("")
}
