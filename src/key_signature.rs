//! Key signatures and per-measure accidental bookkeeping.
//!
//! [`KeySignature`] is an immutable value (number of sharps or flats).
//! The running accidental state of a measure lives in a separate
//! [`KeyState`], so one key can drive any number of independent layouts.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{MidiError, Result};
use crate::pitch::{note_scale, Clef, WhiteNote};
use crate::sheet::symbols::AccidSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accid {
    None,
    Sharp,
    Flat,
    Natural,
}

/// Size of the note-number keymap. Larger than 128 so transposed notes
/// still have an entry.
pub const KEYMAP_LEN: usize = 160;

const MAX_SHARPS: i32 = 5;
const MAX_FLATS: i32 = 6;

type KeyTable = [[Accid; 12]; 8];

// Rows are indexed by pitch class: A, A#, B, C, C#, D, D#, E, F, F#, G, G#.
const NO: Accid = Accid::None;
const SH: Accid = Accid::Sharp;
const FL: Accid = Accid::Flat;
const NA: Accid = Accid::Natural;

/// Accidental needed for each pitch class, per number of sharps.
static SHARP_KEYS: Lazy<KeyTable> = Lazy::new(|| {
    let mut keys = [[NO; 12]; 8];
    keys[0] = [NO, FL, NO, NO, SH, NO, SH, NO, NO, SH, NO, SH]; // C
    keys[1] = [NO, FL, NO, NO, SH, NO, SH, NO, NA, NO, NO, SH]; // G
    keys[2] = [NO, FL, NO, NA, NO, NO, SH, NO, NA, NO, NO, SH]; // D
    keys[3] = [NO, FL, NO, NA, NO, NO, SH, NO, NA, NO, NA, NO]; // A
    keys[4] = [NO, FL, NO, NA, NO, NA, NO, NO, NA, NO, NA, NO]; // E
    keys[5] = [NA, NO, NO, NA, NO, NA, NO, NO, NA, NO, NA, NO]; // B
    keys
});

/// Accidental needed for each pitch class, per number of flats.
static FLAT_KEYS: Lazy<KeyTable> = Lazy::new(|| {
    let mut keys = [[NO; 12]; 8];
    keys[0] = [NO, FL, NO, NO, SH, NO, SH, NO, NO, SH, NO, SH]; // C
    keys[1] = [NO, NO, NA, NO, SH, NO, FL, NO, NO, SH, NO, FL]; // F
    keys[2] = [NO, NO, NA, NO, SH, NO, NO, NA, NO, SH, NO, FL]; // B-flat
    keys[3] = [NA, NO, NA, NO, FL, NO, NO, NA, NO, SH, NO, NO]; // E-flat
    keys[4] = [NA, NO, NA, NO, NO, NA, NO, NA, NO, SH, NO, NO]; // A-flat
    keys[5] = [NA, NO, NA, NO, NO, NA, NO, NA, NO, NO, NA, NO]; // D-flat
    keys[6] = [NA, NO, NO, NA, NO, NA, NO, NA, NO, NO, NA, NO]; // G-flat
    keys
});

/// Staff letter for each pitch class when spelled with sharps.
const WHOLE_SHARPS: [i32; 12] = [
    WhiteNote::A, WhiteNote::A, WhiteNote::B, WhiteNote::C, WhiteNote::C, WhiteNote::D,
    WhiteNote::D, WhiteNote::E, WhiteNote::F, WhiteNote::F, WhiteNote::G, WhiteNote::G,
];

/// Staff letter for each pitch class when spelled with flats.
const WHOLE_FLATS: [i32; 12] = [
    WhiteNote::A, WhiteNote::B, WhiteNote::B, WhiteNote::C, WhiteNote::D, WhiteNote::D,
    WhiteNote::E, WhiteNote::E, WhiteNote::F, WhiteNote::G, WhiteNote::G, WhiteNote::A,
];

/// A key signature: some number of sharps, or some number of flats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    num_sharps: i32,
    num_flats: i32,
}

impl KeySignature {
    pub fn new(num_sharps: i32, num_flats: i32) -> Result<Self> {
        if num_sharps != 0 && num_flats != 0 {
            return Err(MidiError::InvalidConfiguration(format!(
                "key signature with {num_sharps} sharps and {num_flats} flats"
            )));
        }
        if !(0..=MAX_SHARPS).contains(&num_sharps) || !(0..=MAX_FLATS).contains(&num_flats) {
            return Err(MidiError::InvalidConfiguration(format!(
                "unsupported key signature: {num_sharps} sharps, {num_flats} flats"
            )));
        }
        Ok(Self { num_sharps, num_flats })
    }

    /// The key signature of a major key, given its tonic pitch class.
    pub fn from_notescale(notescale: i32) -> Result<Self> {
        use note_scale::*;
        let (sharps, flats) = match notescale {
            A => (3, 0),
            B_FLAT => (0, 2),
            B => (5, 0),
            C => (0, 0),
            D_FLAT => (0, 5),
            D => (2, 0),
            E_FLAT => (0, 3),
            E => (4, 0),
            F => (0, 1),
            G_FLAT => (0, 6),
            G => (1, 0),
            A_FLAT => (0, 4),
            _ => {
                return Err(MidiError::InvalidConfiguration(format!(
                    "no major key for pitch class {notescale}"
                )))
            }
        };
        Self::new(sharps, flats)
    }

    pub fn num_sharps(&self) -> i32 {
        self.num_sharps
    }

    pub fn num_flats(&self) -> i32 {
        self.num_flats
    }

    fn table(&self) -> &'static [Accid; 12] {
        if self.num_flats > 0 {
            &FLAT_KEYS[self.num_flats as usize]
        } else {
            &SHARP_KEYS[self.num_sharps as usize]
        }
    }

    /// Fresh accidental state for the first measure.
    pub fn state(&self) -> KeyState {
        KeyState::new(*self)
    }

    /// Accidentals drawn at the start of each staff for `clef`.
    pub fn symbols(&self, clef: Clef) -> Vec<AccidSymbol> {
        let count = self.num_sharps.max(self.num_flats) as usize;
        if count == 0 {
            return Vec::new();
        }
        let w = WhiteNote::new;
        let (accid, notes) = if self.num_sharps > 0 {
            let notes = match clef {
                Clef::Treble => [
                    w(WhiteNote::F, 5), w(WhiteNote::C, 5), w(WhiteNote::G, 5),
                    w(WhiteNote::D, 5), w(WhiteNote::A, 6), w(WhiteNote::E, 5),
                ],
                Clef::Bass => [
                    w(WhiteNote::F, 3), w(WhiteNote::C, 3), w(WhiteNote::G, 3),
                    w(WhiteNote::D, 3), w(WhiteNote::A, 4), w(WhiteNote::E, 3),
                ],
            };
            (Accid::Sharp, notes)
        } else {
            let notes = match clef {
                Clef::Treble => [
                    w(WhiteNote::B, 5), w(WhiteNote::E, 5), w(WhiteNote::A, 5),
                    w(WhiteNote::D, 5), w(WhiteNote::G, 4), w(WhiteNote::C, 5),
                ],
                Clef::Bass => [
                    w(WhiteNote::B, 3), w(WhiteNote::E, 3), w(WhiteNote::A, 3),
                    w(WhiteNote::D, 3), w(WhiteNote::G, 2), w(WhiteNote::C, 3),
                ],
            };
            (Accid::Flat, notes)
        };
        notes.iter().take(count).map(|&note| AccidSymbol::new(accid, note, clef)).collect()
    }

    /// Guess the key whose signature needs the fewest accidentals for
    /// these note numbers. Sharps 0..=5 are tried first, then flats 0..=6;
    /// the first strictly-better candidate wins.
    pub fn guess(notes: &[i32]) -> KeySignature {
        let mut notecount = [0usize; 12];
        for &number in notes {
            notecount[note_scale::from_number(number) as usize] += 1;
        }

        let count_for = |table: &[Accid; 12]| -> usize {
            table
                .iter()
                .zip(notecount.iter())
                .filter(|(accid, _)| **accid != Accid::None)
                .map(|(_, count)| *count)
                .sum()
        };

        let mut best = KeySignature { num_sharps: 0, num_flats: 0 };
        let mut smallest = notes.len();
        for key in 0..=MAX_SHARPS {
            let count = count_for(&SHARP_KEYS[key as usize]);
            if count < smallest {
                smallest = count;
                best = KeySignature { num_sharps: key, num_flats: 0 };
            }
        }
        for key in 0..=MAX_FLATS {
            let count = count_for(&FLAT_KEYS[key as usize]);
            if count < smallest {
                smallest = count;
                best = KeySignature { num_sharps: 0, num_flats: key };
            }
        }
        log::debug!("guessed key signature: {best}");
        best
    }

    /// Tonic pitch class of the major key with this signature.
    pub fn notescale(&self) -> i32 {
        use note_scale::*;
        const FLAT_MAJOR: [i32; 8] = [C, F, B_FLAT, E_FLAT, A_FLAT, D_FLAT, G_FLAT, B];
        const SHARP_MAJOR: [i32; 10] = [C, G, D, A, E, B, F_SHARP, C_SHARP, G_SHARP, D_SHARP];
        if self.num_flats > 0 {
            FLAT_MAJOR[self.num_flats as usize]
        } else {
            SHARP_MAJOR[self.num_sharps as usize]
        }
    }

    /// Name of a major key, e.g. "E-flat major".
    pub fn key_to_string(notescale: i32) -> &'static str {
        use note_scale::*;
        match notescale {
            A => "A major",
            B_FLAT => "B-flat major",
            B => "B major",
            C => "C major",
            D_FLAT => "D-flat major",
            D => "D major",
            E_FLAT => "E-flat major",
            E => "E major",
            F => "F major",
            G_FLAT => "G-flat major",
            G => "G major",
            A_FLAT => "A-flat major",
            _ => "",
        }
    }
}

impl std::fmt::Display for KeySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::key_to_string(self.notescale()))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Running accidental state
// ═══════════════════════════════════════════════════════════════════════

/// Accidentals still needed in the current measure, per note number.
/// Reset from the key's table whenever the measure changes.
#[derive(Debug, Clone)]
pub struct KeyState {
    key: KeySignature,
    keymap: [Accid; KEYMAP_LEN],
    prev_measure: i32,
}

impl KeyState {
    pub fn new(key: KeySignature) -> Self {
        let mut state = Self { key, keymap: [Accid::None; KEYMAP_LEN], prev_measure: 0 };
        state.reset();
        state
    }

    pub fn key(&self) -> KeySignature {
        self.key
    }

    fn reset(&mut self) {
        let table = self.key.table();
        for (number, slot) in self.keymap.iter_mut().enumerate() {
            *slot = table[note_scale::from_number(number as i32) as usize];
        }
    }

    fn at(&self, number: i32) -> Accid {
        usize::try_from(number)
            .ok()
            .and_then(|i| self.keymap.get(i).copied())
            .unwrap_or(Accid::None)
    }

    fn set(&mut self, number: i32, accid: Accid) {
        if let Some(slot) = usize::try_from(number).ok().and_then(|i| self.keymap.get_mut(i)) {
            *slot = accid;
        }
    }

    /// The accidental to draw for `notenumber` in `measure`. Consumes it, so
    /// the same pitch later in the measure needs no symbol.
    pub fn get_accidental(&mut self, notenumber: i32, measure: i32) -> Accid {
        if measure != self.prev_measure {
            self.reset();
            self.prev_measure = measure;
        }
        if notenumber <= 1 || notenumber >= 127 {
            return Accid::None;
        }

        let result = self.at(notenumber);
        match result {
            Accid::Sharp => {
                self.set(notenumber, Accid::None);
                self.set(notenumber - 1, Accid::Natural);
            }
            Accid::Flat => {
                self.set(notenumber, Accid::None);
                self.set(notenumber + 1, Accid::Natural);
            }
            Accid::Natural => {
                self.set(notenumber, Accid::None);
                let nextkey = note_scale::from_number(notenumber + 1);
                let prevkey = note_scale::from_number(notenumber - 1);
                let prev_free = self.at(notenumber - 1) == Accid::None;
                let next_free = self.at(notenumber + 1) == Accid::None;

                // A natural cancels a sharp or flat on this white key, so the
                // black key next to it now needs an explicit symbol.
                if prev_free
                    && next_free
                    && note_scale::is_black_key(nextkey)
                    && note_scale::is_black_key(prevkey)
                {
                    if self.key.num_flats == 0 {
                        self.set(notenumber + 1, Accid::Sharp);
                    } else {
                        self.set(notenumber - 1, Accid::Flat);
                    }
                } else if prev_free && note_scale::is_black_key(prevkey) {
                    self.set(notenumber - 1, Accid::Flat);
                } else if next_free && note_scale::is_black_key(nextkey) {
                    self.set(notenumber + 1, Accid::Sharp);
                }
            }
            Accid::None => {}
        }
        result
    }

    /// Staff position for `notenumber`, given the accidentals already
    /// consumed in this measure. Call before `get_accidental` for the note.
    pub fn get_white_note(&self, notenumber: i32) -> WhiteNote {
        let notescale = note_scale::from_number(notenumber) as usize;
        let mut octave = (notenumber + 3).div_euclid(12) - 1;

        let mut letter = match self.at(notenumber) {
            Accid::Flat => WHOLE_FLATS[notescale],
            Accid::Sharp | Accid::Natural => WHOLE_SHARPS[notescale],
            Accid::None => {
                let mut letter = WHOLE_SHARPS[notescale];
                if note_scale::is_black_key(notescale as i32) {
                    let prev_natural = self.at(notenumber - 1) == Accid::Natural;
                    let next_natural = self.at(notenumber + 1) == Accid::Natural;
                    if prev_natural && next_natural {
                        if self.key.num_flats > 0 {
                            letter = WHOLE_FLATS[notescale];
                        }
                    } else if next_natural {
                        letter = WHOLE_FLATS[notescale];
                    }
                }
                letter
            }
        };

        // G-flat major spells B as C-flat and B-flat as B.
        if self.key.num_flats == MAX_FLATS && notescale as i32 == note_scale::B {
            letter = WhiteNote::C;
        }
        if self.key.num_flats == MAX_FLATS && notescale as i32 == note_scale::B_FLAT {
            letter = WhiteNote::B;
        }
        if self.key.num_flats > 0 && notescale as i32 == note_scale::A_FLAT {
            octave += 1;
        }
        WhiteNote::new(letter, octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sharps: i32, flats: i32) -> KeySignature {
        KeySignature::new(sharps, flats).unwrap()
    }

    #[test]
    fn rejects_sharps_and_flats_together() {
        assert!(matches!(KeySignature::new(2, 3), Err(MidiError::InvalidConfiguration(_))));
        assert!(KeySignature::new(6, 0).is_err());
        assert!(KeySignature::new(0, 7).is_err());
        assert!(KeySignature::new(0, 6).is_ok());
    }

    #[test]
    fn guess_c_major_scale() {
        let notes = [60, 62, 64, 65, 67, 69, 71, 72];
        assert_eq!(KeySignature::guess(&notes), key(0, 0));
    }

    #[test]
    fn guess_d_major_scale() {
        let notes = [62, 64, 66, 67, 69, 71, 73, 74];
        assert_eq!(KeySignature::guess(&notes), key(2, 0));
    }

    #[test]
    fn guess_b_flat_major_scale() {
        let notes = [70, 72, 74, 75, 77, 79, 81, 82];
        assert_eq!(KeySignature::guess(&notes), key(0, 2));
    }

    #[test]
    fn major_key_helpers() {
        let eb = KeySignature::from_notescale(note_scale::E_FLAT).unwrap();
        assert_eq!(eb, key(0, 3));
        assert_eq!(eb.notescale(), note_scale::E_FLAT);
        assert_eq!(eb.to_string(), "E-flat major");
        assert_eq!(key(1, 0).to_string(), "G major");
    }

    #[test]
    fn sharp_consumed_within_measure_and_reset_after() {
        let mut state = key(0, 0).state();
        assert_eq!(state.get_accidental(61, 0), Accid::Sharp);
        assert_eq!(state.get_accidental(61, 0), Accid::None);
        // C natural after C sharp needs a natural sign.
        assert_eq!(state.get_accidental(60, 0), Accid::Natural);
        // New measure: the table is back.
        assert_eq!(state.get_accidental(61, 1), Accid::Sharp);
    }

    #[test]
    fn natural_in_g_major() {
        let mut state = key(1, 0).state();
        assert_eq!(state.get_white_note(65), WhiteNote::new(WhiteNote::F, 4));
        assert_eq!(state.get_accidental(65, 0), Accid::Natural);
        assert_eq!(state.get_accidental(65, 0), Accid::None);
        // F# now needs its sharp back.
        assert_eq!(state.get_accidental(66, 0), Accid::Sharp);
    }

    #[test]
    fn natural_between_black_keys_in_sharp_key() {
        // A major sharpens G; G natural leaves both neighbors unset.
        let mut state = key(3, 0).state();
        assert_eq!(state.get_accidental(67, 0), Accid::Natural);
        assert_eq!(state.get_accidental(68, 0), Accid::Sharp);
    }

    #[test]
    fn natural_between_black_keys_in_flat_key() {
        // A-flat major flattens A; A natural leaves both neighbors unset.
        let mut state = key(0, 4).state();
        assert_eq!(state.get_accidental(69, 0), Accid::Natural);
        assert_eq!(state.get_accidental(68, 0), Accid::Flat);
    }

    #[test]
    fn white_notes_follow_spelling() {
        let c = key(0, 0).state();
        assert_eq!(c.get_white_note(60), WhiteNote::MIDDLE_C);
        assert_eq!(c.get_white_note(61), WhiteNote::new(WhiteNote::C, 4));
        // Octaves start at A, so B-flat above middle C sits in octave 5.
        assert_eq!(c.get_white_note(70), WhiteNote::new(WhiteNote::B, 5));

        let f = key(0, 1).state();
        assert_eq!(f.get_white_note(70), WhiteNote::new(WhiteNote::B, 5));
        // A-flat belongs to the next A-based octave.
        assert_eq!(f.get_white_note(68), WhiteNote::new(WhiteNote::A, 5));
    }

    #[test]
    fn g_flat_major_spells_b_as_c() {
        let gb = key(0, 6).state();
        assert_eq!(gb.get_white_note(71).letter(), WhiteNote::C);
        assert_eq!(gb.get_white_note(70).letter(), WhiteNote::B);
    }

    #[test]
    fn key_signature_symbols() {
        let d = key(2, 0);
        let treble = d.symbols(Clef::Treble);
        assert_eq!(treble.len(), 2);
        assert_eq!(treble[0].note(), WhiteNote::new(WhiteNote::F, 5));
        assert_eq!(treble[1].note(), WhiteNote::new(WhiteNote::C, 5));
        assert!(key(0, 0).symbols(Clef::Bass).is_empty());
    }

    #[test]
    fn extreme_note_numbers_do_not_panic() {
        let mut state = key(0, 3).state();
        assert_eq!(state.get_accidental(0, 0), Accid::None);
        assert_eq!(state.get_accidental(127, 0), Accid::None);
        let _ = state.get_white_note(0);
        let _ = state.get_white_note(200);
    }
}
