//! The symbols a staff is made of.
//!
//! [`MusicSymbol`] is the closed set of things that occupy horizontal space
//! on a staff. Accidentals and lyrics are not staff symbols themselves: the
//! former belong to a chord or a key signature, the latter hang below a staff.

use serde::Serialize;

use super::chord::ChordSymbol;
use super::constants::*;
use crate::key_signature::Accid;
use crate::pitch::{Clef, WhiteNote};
use crate::time_signature::NoteDuration;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MusicSymbol {
    Bar(BarSymbol),
    Chord(ChordSymbol),
    Rest(RestSymbol),
    Clef(ClefSymbol),
    Blank(BlankSymbol),
    TimeSig(TimeSigSymbol),
}

impl MusicSymbol {
    /// Pulse time the symbol is placed at.
    pub fn start_time(&self) -> i32 {
        match self {
            MusicSymbol::Bar(s) => s.start_time,
            MusicSymbol::Chord(s) => s.start_time(),
            MusicSymbol::Rest(s) => s.start_time,
            MusicSymbol::Clef(s) => s.start_time,
            MusicSymbol::Blank(s) => s.start_time,
            MusicSymbol::TimeSig(_) => TimeSigSymbol::START_TIME,
        }
    }

    pub fn min_width(&self) -> i32 {
        match self {
            MusicSymbol::Bar(_) => BAR_WIDTH,
            MusicSymbol::Chord(s) => s.min_width(),
            MusicSymbol::Rest(_) => REST_WIDTH,
            MusicSymbol::Clef(s) => s.min_width(),
            MusicSymbol::Blank(_) => 0,
            MusicSymbol::TimeSig(s) => s.min_width(),
        }
    }

    /// Current width, at least `min_width` once aligned.
    pub fn width(&self) -> i32 {
        match self {
            MusicSymbol::Bar(s) => s.width,
            MusicSymbol::Chord(s) => s.width(),
            MusicSymbol::Rest(s) => s.width,
            MusicSymbol::Clef(s) => s.width,
            MusicSymbol::Blank(s) => s.width,
            MusicSymbol::TimeSig(s) => s.width,
        }
    }

    pub fn set_width(&mut self, width: i32) {
        match self {
            MusicSymbol::Bar(s) => s.width = width,
            MusicSymbol::Chord(s) => s.set_width(width),
            MusicSymbol::Rest(s) => s.width = width,
            MusicSymbol::Clef(s) => s.width = width,
            MusicSymbol::Blank(s) => s.width = width,
            MusicSymbol::TimeSig(s) => s.width = width,
        }
    }

    /// Pixels the symbol extends above the top staff line.
    pub fn above_staff(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.above_staff(),
            MusicSymbol::Clef(s) => s.above_staff(),
            _ => 0,
        }
    }

    /// Pixels the symbol extends below the bottom staff line.
    pub fn below_staff(&self) -> i32 {
        match self {
            MusicSymbol::Chord(s) => s.below_staff(),
            MusicSymbol::Clef(s) => s.below_staff(),
            _ => 0,
        }
    }

    pub fn as_chord(&self) -> Option<&ChordSymbol> {
        match self {
            MusicSymbol::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chord_mut(&mut self) -> Option<&mut ChordSymbol> {
        match self {
            MusicSymbol::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_bar(&self) -> bool {
        matches!(self, MusicSymbol::Bar(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, MusicSymbol::Blank(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Leaf symbols
// ═══════════════════════════════════════════════════════════════════════

/// Vertical line at the start of a measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarSymbol {
    pub start_time: i32,
    pub width: i32,
}

impl BarSymbol {
    pub fn new(start_time: i32) -> Self {
        Self { start_time, width: BAR_WIDTH }
    }
}

/// A rest. Only whole, half, quarter and eighth rests are drawn; other
/// durations keep their slot but render nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSymbol {
    pub start_time: i32,
    pub duration: NoteDuration,
    pub width: i32,
}

impl RestSymbol {
    pub fn new(start_time: i32, duration: NoteDuration) -> Self {
        Self { start_time, duration, width: REST_WIDTH }
    }

    pub fn is_drawn(&self) -> bool {
        matches!(
            self.duration,
            NoteDuration::Whole | NoteDuration::Half | NoteDuration::Quarter | NoteDuration::Eighth
        )
    }
}

/// A clef. Full size at the start of a staff, small for a mid-staff change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClefSymbol {
    pub start_time: i32,
    pub clef: Clef,
    pub small: bool,
    pub width: i32,
}

impl ClefSymbol {
    pub fn new(clef: Clef, start_time: i32, small: bool) -> Self {
        let width = if small { SMALL_CLEF_WIDTH } else { CLEF_WIDTH };
        Self { start_time, clef, small, width }
    }

    pub fn min_width(&self) -> i32 {
        if self.small {
            SMALL_CLEF_WIDTH
        } else {
            CLEF_WIDTH
        }
    }

    pub fn above_staff(&self) -> i32 {
        if self.clef == Clef::Treble && !self.small {
            NOTE_HEIGHT * 2
        } else {
            0
        }
    }

    pub fn below_staff(&self) -> i32 {
        match (self.clef, self.small) {
            (Clef::Treble, false) => NOTE_HEIGHT * 2,
            (Clef::Treble, true) => NOTE_HEIGHT,
            (Clef::Bass, _) => 0,
        }
    }
}

/// Invisible padding that keeps parallel tracks aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankSymbol {
    pub start_time: i32,
    pub width: i32,
}

impl BlankSymbol {
    pub fn new(start_time: i32, width: i32) -> Self {
        Self { start_time, width }
    }
}

/// The meter shown at the very start of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSigSymbol {
    pub numerator: i32,
    pub denominator: i32,
    pub width: i32,
}

impl TimeSigSymbol {
    /// Sorts before every note, including those at pulse 0.
    pub const START_TIME: i32 = -1;

    pub fn new(numerator: i32, denominator: i32) -> Self {
        let mut sym = Self { numerator, denominator, width: 0 };
        sym.width = sym.min_width();
        sym
    }

    /// Only meters built from these digits have glyphs.
    pub fn can_draw(&self) -> bool {
        const DIGITS: [i32; 7] = [2, 3, 4, 6, 8, 9, 12];
        DIGITS.contains(&self.numerator) && DIGITS.contains(&self.denominator)
    }

    pub fn min_width(&self) -> i32 {
        if self.can_draw() {
            TIME_SIG_WIDTH
        } else {
            0
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Accidentals and lyrics
// ═══════════════════════════════════════════════════════════════════════

/// A sharp, flat or natural in front of a note or in a key signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidSymbol {
    accid: Accid,
    note: WhiteNote,
    clef: Clef,
    width: i32,
}

impl AccidSymbol {
    pub fn new(accid: Accid, note: WhiteNote, clef: Clef) -> Self {
        Self { accid, note, clef, width: ACCID_WIDTH }
    }

    pub fn accid(&self) -> Accid {
        self.accid
    }

    pub fn note(&self) -> WhiteNote {
        self.note
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn min_width(&self) -> i32 {
        ACCID_WIDTH
    }

    pub fn above_staff(&self) -> i32 {
        let mut dist = WhiteNote::top(self.clef).dist(self.note) * NOTE_HEIGHT / 2;
        match self.accid {
            Accid::Sharp | Accid::Natural => dist -= NOTE_HEIGHT,
            Accid::Flat => dist -= 3 * NOTE_HEIGHT / 2,
            Accid::None => {}
        }
        if dist < 0 {
            -dist
        } else {
            0
        }
    }

    pub fn below_staff(&self) -> i32 {
        let mut dist = WhiteNote::bottom(self.clef).dist(self.note) * NOTE_HEIGHT / 2 + NOTE_HEIGHT;
        if matches!(self.accid, Accid::Sharp | Accid::Natural) {
            dist += NOTE_HEIGHT;
        }
        dist.max(0)
    }
}

/// A lyric syllable. `x` is its offset from the first symbol of the staff
/// it was placed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricSymbol {
    pub start_time: i32,
    pub text: String,
    pub x: i32,
}

impl LyricSymbol {
    pub fn new(start_time: i32, text: impl Into<String>) -> Self {
        Self { start_time, text: text.into(), x: 0 }
    }

    /// Estimated text width; narrow letters shave half a character each.
    pub fn min_width(&self) -> i32 {
        let mut width = self.text.chars().count() as f64 * LYRIC_CHAR_WIDTH;
        for narrow in ['i', 'j', 'l'] {
            if self.text.contains(narrow) {
                width -= LYRIC_CHAR_WIDTH / 2.0;
            }
        }
        width as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_widths() {
        assert_eq!(MusicSymbol::Bar(BarSymbol::new(0)).width(), 14);
        assert_eq!(MusicSymbol::Rest(RestSymbol::new(0, NoteDuration::Quarter)).width(), 20);
        assert_eq!(ClefSymbol::new(Clef::Treble, 0, false).width, 30);
        assert_eq!(ClefSymbol::new(Clef::Bass, 0, true).width, 20);
        assert_eq!(TimeSigSymbol::new(3, 4).width, TIME_SIG_WIDTH);
        assert_eq!(TimeSigSymbol::new(5, 4).width, 0);
    }

    #[test]
    fn time_signature_sorts_first() {
        assert_eq!(MusicSymbol::TimeSig(TimeSigSymbol::new(4, 4)).start_time(), -1);
    }

    #[test]
    fn clef_extents() {
        let treble = ClefSymbol::new(Clef::Treble, 0, false);
        assert_eq!((treble.above_staff(), treble.below_staff()), (16, 16));
        let small = ClefSymbol::new(Clef::Treble, 0, true);
        assert_eq!((small.above_staff(), small.below_staff()), (0, 8));
        let bass = ClefSymbol::new(Clef::Bass, 0, false);
        assert_eq!((bass.above_staff(), bass.below_staff()), (0, 0));
    }

    #[test]
    fn accidental_extents() {
        // A sharp on the top line still needs a little headroom.
        let top = AccidSymbol::new(Accid::Sharp, WhiteNote::TOP_TREBLE, Clef::Treble);
        assert_eq!(top.above_staff(), 8);
        // Well inside the staff: nothing above.
        let mid = AccidSymbol::new(Accid::Flat, WhiteNote::new(WhiteNote::B, 5), Clef::Treble);
        assert_eq!(mid.above_staff(), 0);
        // Bottom line: the symbol hangs below.
        let low = AccidSymbol::new(Accid::Flat, WhiteNote::BOTTOM_TREBLE, Clef::Treble);
        assert_eq!(low.below_staff(), 8);
    }

    #[test]
    fn lyric_width_shrinks_for_narrow_letters() {
        assert_eq!(LyricSymbol::new(0, "over").min_width(), 26);
        assert_eq!(LyricSymbol::new(0, "lil").min_width(), 13);
    }

    #[test]
    fn only_common_rests_are_drawn() {
        assert!(RestSymbol::new(0, NoteDuration::Half).is_drawn());
        assert!(!RestSymbol::new(0, NoteDuration::Sixteenth).is_drawn());
    }
}
