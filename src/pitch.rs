//! Pitch classes, staff positions and clefs.
//!
//! Pitch classes count semitones up from A (A = 0, G# = 11). Octaves of a
//! [`WhiteNote`] also start at A, so A4 is the A just below middle C4.

use serde::{Deserialize, Serialize};

/// Pitch-class constants and conversions.
pub mod note_scale {
    pub const A: i32 = 0;
    pub const A_SHARP: i32 = 1;
    pub const B_FLAT: i32 = 1;
    pub const B: i32 = 2;
    pub const C: i32 = 3;
    pub const C_SHARP: i32 = 4;
    pub const D_FLAT: i32 = 4;
    pub const D: i32 = 5;
    pub const D_SHARP: i32 = 6;
    pub const E_FLAT: i32 = 6;
    pub const E: i32 = 7;
    pub const F: i32 = 8;
    pub const F_SHARP: i32 = 9;
    pub const G_FLAT: i32 = 9;
    pub const G: i32 = 10;
    pub const G_SHARP: i32 = 11;
    pub const A_FLAT: i32 = 11;

    /// MIDI note number of a pitch class in an A-based octave.
    pub fn to_number(notescale: i32, octave: i32) -> i32 {
        9 + notescale + octave * 12
    }

    /// Pitch class of a MIDI note number.
    pub fn from_number(number: i32) -> i32 {
        (number + 3).rem_euclid(12)
    }

    pub fn is_black_key(notescale: i32) -> bool {
        matches!(notescale, A_SHARP | C_SHARP | D_SHARP | F_SHARP | G_SHARP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Bass,
}

/// A staff position: letter A..G (0..6) and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhiteNote {
    letter: i32,
    octave: i32,
}

impl WhiteNote {
    pub const A: i32 = 0;
    pub const B: i32 = 1;
    pub const C: i32 = 2;
    pub const D: i32 = 3;
    pub const E: i32 = 4;
    pub const F: i32 = 5;
    pub const G: i32 = 6;

    pub const TOP_TREBLE: WhiteNote = WhiteNote { letter: Self::E, octave: 5 };
    pub const BOTTOM_TREBLE: WhiteNote = WhiteNote { letter: Self::F, octave: 4 };
    pub const TOP_BASS: WhiteNote = WhiteNote { letter: Self::G, octave: 3 };
    pub const BOTTOM_BASS: WhiteNote = WhiteNote { letter: Self::A, octave: 3 };
    pub const MIDDLE_C: WhiteNote = WhiteNote { letter: Self::C, octave: 4 };

    /// Letters outside 0..=6 wrap into range.
    pub const fn new(letter: i32, octave: i32) -> Self {
        Self { letter: letter.rem_euclid(7), octave }
    }

    pub fn letter(&self) -> i32 {
        self.letter
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Staff steps from `w` up to `self`.
    pub fn dist(&self, w: WhiteNote) -> i32 {
        (self.octave - w.octave) * 7 + (self.letter - w.letter)
    }

    /// Move by `amount` staff steps; never goes below A0.
    pub fn add(&self, amount: i32) -> WhiteNote {
        let num = (self.octave * 7 + self.letter + amount).max(0);
        WhiteNote { letter: num % 7, octave: num / 7 }
    }

    /// MIDI note number of the natural note at this position.
    pub fn number(&self) -> i32 {
        let offset = match self.letter {
            Self::A => note_scale::A,
            Self::B => note_scale::B,
            Self::C => note_scale::C,
            Self::D => note_scale::D,
            Self::E => note_scale::E,
            Self::F => note_scale::F,
            _ => note_scale::G,
        };
        note_scale::to_number(offset, self.octave)
    }

    /// The higher of two notes; ties return `y`.
    pub fn max(x: WhiteNote, y: WhiteNote) -> WhiteNote {
        if x.dist(y) > 0 { x } else { y }
    }

    /// The lower of two notes; ties return `y`.
    pub fn min(x: WhiteNote, y: WhiteNote) -> WhiteNote {
        if x.dist(y) < 0 { x } else { y }
    }

    /// Top line of the staff for `clef`.
    pub fn top(clef: Clef) -> WhiteNote {
        match clef {
            Clef::Treble => Self::TOP_TREBLE,
            Clef::Bass => Self::TOP_BASS,
        }
    }

    /// Bottom line of the staff for `clef`.
    pub fn bottom(clef: Clef) -> WhiteNote {
        match clef {
            Clef::Treble => Self::BOTTOM_TREBLE,
            Clef::Bass => Self::BOTTOM_BASS,
        }
    }
}

impl std::fmt::Display for WhiteNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const LETTERS: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];
        write!(f, "{}{}", LETTERS[self.letter as usize], self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_numbers() {
        assert_eq!(WhiteNote::MIDDLE_C.number(), 60);
        assert_eq!(WhiteNote::BOTTOM_TREBLE.number(), 65);
        assert_eq!(WhiteNote::TOP_TREBLE.number(), 76);
        assert_eq!(WhiteNote::TOP_BASS.number(), 55);
        assert_eq!(WhiteNote::BOTTOM_BASS.number(), 45);
    }

    #[test]
    fn pitch_classes() {
        assert_eq!(note_scale::from_number(60), note_scale::C);
        assert_eq!(note_scale::from_number(69), note_scale::A);
        assert_eq!(note_scale::from_number(70), note_scale::B_FLAT);
        assert!(note_scale::is_black_key(note_scale::F_SHARP));
        assert!(!note_scale::is_black_key(note_scale::E));
    }

    #[test]
    fn distance_and_add() {
        let c4 = WhiteNote::MIDDLE_C;
        let e4 = WhiteNote::new(WhiteNote::E, 4);
        assert_eq!(e4.dist(c4), 2);
        assert_eq!(c4.dist(e4), -2);
        assert_eq!(c4.add(2), e4);
        assert_eq!(c4.add(5), WhiteNote::new(WhiteNote::A, 5));
        assert_eq!(WhiteNote::new(WhiteNote::B, 0).add(-10), WhiteNote::new(WhiteNote::A, 0));
    }

    #[test]
    fn max_min_prefer_second_on_tie() {
        let a = WhiteNote::new(WhiteNote::C, 4);
        let b = WhiteNote::new(WhiteNote::C, 4);
        assert_eq!(WhiteNote::max(a, b), b);
        let hi = WhiteNote::new(WhiteNote::G, 4);
        assert_eq!(WhiteNote::max(a, hi), hi);
        assert_eq!(WhiteNote::min(a, hi), a);
    }

    #[test]
    fn display() {
        assert_eq!(WhiteNote::TOP_TREBLE.to_string(), "E5");
    }
}
