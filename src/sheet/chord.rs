//! Chords: notes sharing a start time, drawn on one or two stems.

use serde::Serialize;

use super::constants::*;
use super::stem::{Stem, StemDirection};
use super::symbols::AccidSymbol;
use crate::error::{MidiError, Result};
use crate::key_signature::{Accid, KeySignature, KeyState};
use crate::model::Note;
use crate::options::NoteNameStyle;
use crate::pitch::{note_scale, Clef, WhiteNote};
use crate::time_signature::{NoteDuration, TimeSignature};

/// One note of a chord, as it is placed on the staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteData {
    pub number: i32,
    pub white_note: WhiteNote,
    pub duration: NoteDuration,
    /// False when the head is pushed right of the stem to avoid a second.
    pub left_side: bool,
    pub accid: Accid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordSymbol {
    start_time: i32,
    end_time: i32,
    clef: Clef,
    has_two_stems: bool,
    notes: Vec<NoteData>,
    accid_symbols: Vec<AccidSymbol>,
    stem1: Option<Stem>,
    stem2: Option<Stem>,
    show_names: bool,
    width: i32,
}

impl ChordSymbol {
    /// Build a chord from notes with one start time, sorted by number.
    /// `state` carries the accidentals already used in the measure.
    pub fn new(
        midinotes: &[Note],
        state: &mut KeyState,
        time: &TimeSignature,
        clef: Clef,
        names: NoteNameStyle,
    ) -> Result<Self> {
        let first = midinotes
            .first()
            .ok_or_else(|| MidiError::InvalidConfiguration("chord without notes".into()))?;
        if midinotes.windows(2).any(|w| w[1].number < w[0].number) {
            return Err(MidiError::InvalidConfiguration(format!(
                "chord notes at {} not sorted by number",
                first.start_time
            )));
        }
        let start_time = first.start_time;
        let end_time = midinotes.iter().map(Note::end_time).max().unwrap_or(start_time);

        let notes = create_note_data(midinotes, state, time, names);
        let accid_symbols = notes
            .iter()
            .filter(|n| n.accid != Accid::None)
            .map(|n| AccidSymbol::new(n.accid, n.white_note, clef))
            .collect();

        let last = notes.len() - 1;
        let dur1 = notes[0].duration;
        let change = notes.iter().position(|n| n.duration != dur1);

        let (mut stem1, mut stem2, dur2) = match change {
            // Different durations: the lower group points down, the rest up.
            Some(change) => {
                let dur2 = notes[change].duration;
                let down = Stem::new(
                    notes[0].white_note,
                    notes[change - 1].white_note,
                    dur1,
                    StemDirection::Down,
                    notes_overlap(&notes[..change]),
                );
                let up = Stem::new(
                    notes[change].white_note,
                    notes[last].white_note,
                    dur2,
                    StemDirection::Up,
                    notes_overlap(&notes[change..]),
                );
                (Some(down), Some(up), dur2)
            }
            None => {
                let direction = stem_direction(notes[0].white_note, notes[last].white_note, clef);
                let stem = Stem::new(
                    notes[0].white_note,
                    notes[last].white_note,
                    dur1,
                    direction,
                    notes_overlap(&notes),
                );
                (Some(stem), None, dur1)
            }
        };
        if dur1 == NoteDuration::Whole {
            stem1 = None;
        }
        if dur2 == NoteDuration::Whole {
            stem2 = None;
        }

        let mut chord = ChordSymbol {
            start_time,
            end_time,
            clef,
            has_two_stems: change.is_some(),
            notes,
            accid_symbols,
            stem1,
            stem2,
            show_names: names != NoteNameStyle::None,
            width: 0,
        };
        chord.width = chord.min_width();
        Ok(chord)
    }

    pub fn start_time(&self) -> i32 {
        self.start_time
    }

    /// End of the longest note.
    pub fn end_time(&self) -> i32 {
        self.end_time
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn has_two_stems(&self) -> bool {
        self.has_two_stems
    }

    pub fn notes(&self) -> &[NoteData] {
        &self.notes
    }

    pub fn accid_symbols(&self) -> &[AccidSymbol] {
        &self.accid_symbols
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    /// The stem used for beaming: the one with the shorter duration when
    /// there are two.
    pub fn stem(&self) -> Option<&Stem> {
        match (&self.stem1, &self.stem2) {
            (None, s) | (s, None) => s.as_ref(),
            (Some(s1), Some(s2)) => {
                if s1.duration() < s2.duration() {
                    Some(s1)
                } else {
                    Some(s2)
                }
            }
        }
    }

    pub fn stem_mut(&mut self) -> Option<&mut Stem> {
        match (&mut self.stem1, &mut self.stem2) {
            (None, s) | (s, None) => s.as_mut(),
            (Some(s1), Some(s2)) => {
                if s1.duration() < s2.duration() {
                    Some(s1)
                } else {
                    Some(s2)
                }
            }
        }
    }

    pub fn stems(&self) -> impl Iterator<Item = &Stem> {
        self.stem1.iter().chain(self.stem2.iter())
    }

    /// Room for the note heads, plus stacked accidentals that are too close
    /// to share a column, plus the note names if shown.
    pub fn min_width(&self) -> i32 {
        let mut result = 2 * NOTE_HEIGHT + NOTE_HEIGHT * 3 / 4;
        if let Some(first) = self.accid_symbols.first() {
            result += first.min_width();
            for pair in self.accid_symbols.windows(2) {
                if pair[1].note().dist(pair[0].note()) < 6 {
                    result += pair[1].min_width();
                }
            }
        }
        if self.show_names {
            result += NOTE_NAME_WIDTH;
        }
        result
    }

    pub fn above_staff(&self) -> i32 {
        let mut topnote = self.notes[self.notes.len() - 1].white_note;
        for stem in self.stems() {
            topnote = WhiteNote::max(topnote, stem.end());
        }
        let dist = topnote.dist(WhiteNote::top(self.clef)) * NOTE_HEIGHT / 2;
        self.accid_symbols.iter().map(AccidSymbol::above_staff).fold(dist.max(0), i32::max)
    }

    pub fn below_staff(&self) -> i32 {
        let mut bottomnote = self.notes[0].white_note;
        for stem in self.stems() {
            bottomnote = WhiteNote::min(bottomnote, stem.end());
        }
        let dist = WhiteNote::bottom(self.clef).dist(bottomnote) * NOTE_HEIGHT / 2;
        self.accid_symbols.iter().map(AccidSymbol::below_staff).fold(dist.max(0), i32::max)
    }
}

fn create_note_data(
    midinotes: &[Note],
    state: &mut KeyState,
    time: &TimeSignature,
    names: NoteNameStyle,
) -> Vec<NoteData> {
    let mainkey = state.key();
    let mut notes: Vec<NoteData> = Vec::with_capacity(midinotes.len());
    for midi in midinotes {
        let white_note = state.get_white_note(midi.number);
        let accid = state.get_accidental(midi.number, time.get_measure(midi.start_time));
        // A second above the previous head goes on the other side of the stem.
        let left_side = match notes.last() {
            Some(prev) if white_note.dist(prev.white_note) == 1 => !prev.left_side,
            _ => true,
        };
        notes.push(NoteData {
            number: midi.number,
            white_note,
            duration: time.note_duration(midi.duration),
            left_side,
            accid,
            name: note_name(names, midi.number, white_note, &mainkey),
        });
    }
    notes
}

fn notes_overlap(notes: &[NoteData]) -> bool {
    notes.iter().any(|n| !n.left_side)
}

/// Up when the chord's outer notes sit, on average, below the middle
/// staff line.
pub fn stem_direction(bottom: WhiteNote, top: WhiteNote, clef: Clef) -> StemDirection {
    let middle = match clef {
        Clef::Treble => WhiteNote::new(WhiteNote::B, 5),
        Clef::Bass => WhiteNote::new(WhiteNote::D, 3),
    };
    if middle.dist(bottom) + middle.dist(top) >= 0 {
        StemDirection::Up
    } else {
        StemDirection::Down
    }
}

// ── Note names ──────────────────────────────────────────────────────

const DO_RE_MI: [&str; 12] = ["La", "Li", "Ti", "Do", "Di", "Re", "Ri", "Mi", "Fa", "Fi", "So", "Si"];
const NUMBERS: [&str; 12] = ["10", "11", "12", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// The label printed next to a note head, if any.
pub fn note_name(
    style: NoteNameStyle,
    number: i32,
    white_note: WhiteNote,
    mainkey: &KeySignature,
) -> Option<String> {
    let fixed = note_scale::from_number(number) as usize;
    let movable = || {
        let diff = note_scale::C - mainkey.notescale();
        note_scale::from_number(number + diff) as usize
    };
    let name = match style {
        NoteNameStyle::None => return None,
        NoteNameStyle::Letter => letter(number, white_note),
        NoteNameStyle::FixedDoReMi => DO_RE_MI[fixed],
        NoteNameStyle::MovableDoReMi => DO_RE_MI[movable()],
        NoteNameStyle::FixedNumber => NUMBERS[fixed],
        NoteNameStyle::MovableNumber => NUMBERS[movable()],
    };
    Some(name.to_string())
}

/// Letter name; black keys are spelled to match the white note they are
/// drawn on.
fn letter(number: i32, white_note: WhiteNote) -> &'static str {
    use note_scale::*;
    let spell = |sharp_letter: i32, sharp: &'static str, flat: &'static str| {
        if white_note.letter() == sharp_letter {
            sharp
        } else {
            flat
        }
    };
    match from_number(number) {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        E => "E",
        F => "F",
        G => "G",
        A_SHARP => spell(WhiteNote::A, "A#", "Bb"),
        C_SHARP => spell(WhiteNote::C, "C#", "Db"),
        D_SHARP => spell(WhiteNote::D, "D#", "Eb"),
        F_SHARP => spell(WhiteNote::F, "F#", "Gb"),
        G_SHARP => spell(WhiteNote::G, "G#", "Ab"),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::stem::StemSide;
    use pretty_assertions::assert_eq;

    fn c_major() -> KeyState {
        KeySignature::new(0, 0).unwrap().state()
    }

    fn chord(notes: &[(i32, i32)], clef: Clef) -> ChordSymbol {
        let notes: Vec<Note> = notes.iter().map(|&(n, d)| Note::new(0, 0, n, d)).collect();
        ChordSymbol::new(&notes, &mut c_major(), &TimeSignature::default(), clef, NoteNameStyle::None)
            .unwrap()
    }

    #[test]
    fn single_stem_direction_follows_pitch() {
        let low = chord(&[(60, 480), (64, 480)], Clef::Treble);
        assert_eq!(low.stem().map(|s| s.direction()), Some(StemDirection::Up));
        let high = chord(&[(79, 480), (83, 480)], Clef::Treble);
        assert_eq!(high.stem().map(|s| s.direction()), Some(StemDirection::Down));
        assert!(!low.has_two_stems());
    }

    #[test]
    fn mixed_durations_get_two_stems() {
        let c = chord(&[(60, 960), (64, 480), (67, 480)], Clef::Treble);
        assert!(c.has_two_stems());
        let stems: Vec<_> = c.stems().map(|s| (s.direction(), s.duration())).collect();
        assert_eq!(
            stems,
            vec![(StemDirection::Down, NoteDuration::Half), (StemDirection::Up, NoteDuration::Quarter)]
        );
        // The shorter stem is the one used for beaming.
        assert_eq!(c.stem().map(|s| s.duration()), Some(NoteDuration::Quarter));
    }

    #[test]
    fn whole_notes_have_no_stem() {
        let c = chord(&[(60, 1920)], Clef::Treble);
        assert!(c.stem().is_none());
    }

    #[test]
    fn seconds_alternate_sides() {
        let c = chord(&[(60, 480), (62, 480), (64, 480)], Clef::Treble);
        let sides: Vec<bool> = c.notes().iter().map(|n| n.left_side).collect();
        assert_eq!(sides, vec![true, false, true]);
        assert_eq!(c.stem().map(|s| s.side()), Some(StemSide::Right));
    }

    #[test]
    fn accidentals_widen_the_chord() {
        let plain = chord(&[(60, 480)], Clef::Treble);
        assert_eq!(plain.width(), 22);
        // C# and D# are a step apart, so the second accidental needs its own column.
        let sharp = chord(&[(61, 480), (63, 480)], Clef::Treble);
        assert_eq!(sharp.accid_symbols().len(), 2);
        assert_eq!(sharp.width(), 22 + 2 * ACCID_WIDTH);
    }

    #[test]
    fn unsorted_notes_are_rejected() {
        let notes = vec![Note::new(0, 0, 64, 480), Note::new(0, 0, 60, 480)];
        let err = ChordSymbol::new(
            &notes,
            &mut c_major(),
            &TimeSignature::default(),
            Clef::Treble,
            NoteNameStyle::None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn note_name_styles() {
        let c = KeySignature::new(0, 0).unwrap();
        let d = KeySignature::new(2, 0).unwrap();
        let c4 = WhiteNote::MIDDLE_C;
        assert_eq!(note_name(NoteNameStyle::Letter, 60, c4, &c).as_deref(), Some("C"));
        assert_eq!(note_name(NoteNameStyle::Letter, 61, c4, &c).as_deref(), Some("C#"));
        assert_eq!(
            note_name(NoteNameStyle::Letter, 61, WhiteNote::new(WhiteNote::D, 4), &c).as_deref(),
            Some("Db")
        );
        assert_eq!(note_name(NoteNameStyle::FixedDoReMi, 62, c4, &d).as_deref(), Some("Re"));
        assert_eq!(note_name(NoteNameStyle::MovableDoReMi, 62, c4, &d).as_deref(), Some("Do"));
        assert_eq!(note_name(NoteNameStyle::MovableNumber, 62, c4, &d).as_deref(), Some("1"));
        assert_eq!(note_name(NoteNameStyle::None, 62, c4, &d), None);
    }

    #[test]
    fn note_names_add_width() {
        let notes = vec![Note::new(0, 0, 60, 480)];
        let named = ChordSymbol::new(
            &notes,
            &mut c_major(),
            &TimeSignature::default(),
            Clef::Treble,
            NoteNameStyle::Letter,
        )
        .unwrap();
        assert_eq!(named.width(), 22 + NOTE_NAME_WIDTH);
        assert_eq!(named.notes()[0].name.as_deref(), Some("C"));
    }
}
