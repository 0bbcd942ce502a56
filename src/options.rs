//! Sheet-music and playback options.
//!
//! Options are plain data supplied by the host. They serialize to camelCase
//! JSON, and every field has a default so partial JSON is accepted.

use serde::{Deserialize, Serialize};

use crate::decoder::MidiFile;
use crate::error::Result;
use crate::model::PERCUSSION_INSTRUMENT;
use crate::time_signature::TimeSignature;

/// How note names are printed next to each note head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteNameStyle {
    #[default]
    None,
    /// Letter names, e.g. "C#" or "Db".
    Letter,
    /// Do-Re-Mi with Do fixed at C.
    FixedDoReMi,
    /// Do-Re-Mi with Do on the tonic of the key.
    MovableDoReMi,
    /// Numbers 1-12 with 1 fixed at C.
    FixedNumber,
    /// Numbers 1-12 with 1 on the tonic of the key.
    MovableNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MidiOptions {
    /// Which tracks to display, by index into `MidiFile::tracks`.
    pub tracks: Vec<bool>,
    /// Which tracks to silence on playback.
    pub mute: Vec<bool>,
    /// Instrument per track, used unless `use_default_instruments` is set.
    pub instruments: Vec<u8>,
    pub use_default_instruments: bool,
    /// Vertical scrolling: every staff is a full page width.
    pub scroll_vert: bool,
    /// Merge all tracks into a treble and a bass staff.
    pub two_staffs: bool,
    pub show_note_letters: NoteNameStyle,
    pub show_lyrics: bool,
    pub show_measures: bool,
    /// Pulses to shift every note by.
    pub shift_time: i32,
    /// Semitones to transpose by.
    pub transpose: i32,
    /// Tonic pitch class of the key to use; `None` guesses it.
    pub key: Option<i32>,
    /// Time signature override.
    pub time: Option<TimeSignature>,
    /// The file's own time signature.
    pub default_time: TimeSignature,
    /// Notes starting within this many milliseconds form one chord.
    pub combine_interval: i32,
    /// Playback tempo in microseconds per quarter note.
    pub tempo: i32,
    /// Playback start point in pulses.
    pub pause_time: i32,
    pub play_measures_in_loop: bool,
    pub play_measures_in_loop_start: i32,
    pub play_measures_in_loop_end: i32,
    pub last_measure: i32,
}

impl Default for MidiOptions {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            mute: Vec::new(),
            instruments: Vec::new(),
            use_default_instruments: true,
            scroll_vert: false,
            two_staffs: false,
            show_note_letters: NoteNameStyle::None,
            show_lyrics: true,
            show_measures: false,
            shift_time: 0,
            transpose: 0,
            key: None,
            time: None,
            default_time: TimeSignature::default(),
            combine_interval: 40,
            tempo: TimeSignature::DEFAULT_TEMPO,
            pause_time: 0,
            play_measures_in_loop: false,
            play_measures_in_loop_start: 0,
            play_measures_in_loop_end: 0,
            last_measure: 0,
        }
    }
}

impl MidiOptions {
    /// Default options for a decoded file. Percussion tracks start hidden
    /// and muted; files with other than two tracks default to two staffs.
    pub fn for_file(midifile: &MidiFile) -> Self {
        let num_tracks = midifile.tracks.len();
        let percussion: Vec<bool> =
            midifile.tracks.iter().map(|t| t.instrument == PERCUSSION_INSTRUMENT).collect();
        let time = midifile.time;
        let last_measure = if time.measure() > 0 { midifile.end_time() / time.measure() } else { 0 };

        Self {
            tracks: percussion.iter().map(|p| !p).collect(),
            mute: percussion,
            instruments: midifile.tracks.iter().map(|t| t.instrument).collect(),
            two_staffs: num_tracks != 2,
            default_time: time,
            tempo: time.tempo(),
            last_measure,
            play_measures_in_loop_end: last_measure,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Take the user-visible settings from previously saved options. Per-track
    /// lists are only taken when their length matches this file.
    pub fn merge(&mut self, saved: &MidiOptions) {
        if saved.tracks.len() == self.tracks.len() {
            self.tracks.clone_from(&saved.tracks);
        }
        if saved.mute.len() == self.mute.len() {
            self.mute.clone_from(&saved.mute);
        }
        if saved.instruments.len() == self.instruments.len() {
            self.instruments.clone_from(&saved.instruments);
        }
        if saved.time.is_some() {
            self.time = saved.time;
        }
        self.use_default_instruments = saved.use_default_instruments;
        self.scroll_vert = saved.scroll_vert;
        self.show_lyrics = saved.show_lyrics;
        self.two_staffs = saved.two_staffs;
        self.show_note_letters = saved.show_note_letters;
        self.transpose = saved.transpose;
        self.key = saved.key;
        self.combine_interval = saved.combine_interval;
        self.show_measures = saved.show_measures;
        self.play_measures_in_loop = saved.play_measures_in_loop;
        self.play_measures_in_loop_start = saved.play_measures_in_loop_start;
        self.play_measures_in_loop_end = saved.play_measures_in_loop_end;
    }

    pub(crate) fn track_shown(&self, tracknum: usize) -> bool {
        self.tracks.get(tracknum).copied().unwrap_or(true)
    }

    pub(crate) fn track_muted(&self, tracknum: usize) -> bool {
        self.mute.get(tracknum).copied().unwrap_or(false)
    }
}
