//! One horizontal staff: a slice of a track's symbols with the clef and key
//! signature drawn in front of it.

use std::ops::Range;

use serde::Serialize;

use super::chord::ChordSymbol;
use super::constants::*;
use super::symbols::{AccidSymbol, ClefSymbol, LyricSymbol, MusicSymbol};
use crate::key_signature::KeySignature;
use crate::pitch::Clef;

/// Staff width limit when scrolling horizontally.
const UNBOUNDED_WIDTH: i32 = 2_000_000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    track: usize,
    #[serde(skip)]
    total_tracks: usize,
    clef: ClefSymbol,
    keys: Vec<AccidSymbol>,
    keysig_width: i32,
    symbols: Vec<MusicSymbol>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    lyrics: Vec<LyricSymbol>,
    show_measures: bool,
    measure_length: i32,
    width: i32,
    height: i32,
    /// Pixels from the top of the staff area to the top staff line.
    ytop: i32,
    start_time: i32,
    end_time: i32,
}

/// Pixels taken by the leading clef and key signature of every staff.
pub fn key_signature_width(key: &KeySignature) -> i32 {
    let clef = ClefSymbol::new(Clef::Treble, 0, false);
    let accids: i32 = key.symbols(Clef::Treble).iter().map(AccidSymbol::min_width).sum();
    clef.min_width() + accids + LEFT_MARGIN + 5
}

impl Staff {
    pub fn new(
        symbols: Vec<MusicSymbol>,
        key: &KeySignature,
        track: usize,
        total_tracks: usize,
        scroll_vert: bool,
        show_measures: bool,
        measure_length: i32,
    ) -> Self {
        let clef = symbols.iter().find_map(MusicSymbol::as_chord).map_or(Clef::Treble, ChordSymbol::clef);
        let mut staff = Staff {
            track,
            total_tracks,
            clef: ClefSymbol::new(clef, 0, false),
            keys: key.symbols(clef),
            keysig_width: key_signature_width(key),
            symbols,
            lyrics: Vec::new(),
            show_measures: show_measures && track == 0,
            measure_length,
            width: 0,
            height: 0,
            ytop: 0,
            start_time: 0,
            end_time: 0,
        };
        staff.calculate_width(scroll_vert);
        staff.calculate_height();
        staff.calculate_start_end_time();
        staff
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn ytop(&self) -> i32 {
        self.ytop
    }

    pub fn start_time(&self) -> i32 {
        self.start_time
    }

    pub fn end_time(&self) -> i32 {
        self.end_time
    }

    pub fn set_end_time(&mut self, end_time: i32) {
        self.end_time = end_time;
    }

    pub fn clef(&self) -> Clef {
        self.clef.clef
    }

    pub fn keys(&self) -> &[AccidSymbol] {
        &self.keys
    }

    pub fn keysig_width(&self) -> i32 {
        self.keysig_width
    }

    pub fn symbols(&self) -> &[MusicSymbol] {
        &self.symbols
    }

    pub fn lyrics(&self) -> &[LyricSymbol] {
        &self.lyrics
    }

    /// Room above for the tallest symbol (and measure numbers), the five
    /// lines, room below, then lyrics. The last track gets extra spacing.
    pub fn calculate_height(&mut self) {
        let mut above = self.symbols.iter().map(MusicSymbol::above_staff).max().unwrap_or(0);
        let mut below = self.symbols.iter().map(MusicSymbol::below_staff).max().unwrap_or(0);
        above = above.max(self.clef.above_staff());
        below = below.max(self.clef.below_staff());
        if self.show_measures {
            above = above.max(NOTE_HEIGHT * 3);
        }
        self.ytop = above + NOTE_HEIGHT;
        self.height = NOTE_HEIGHT * 5 + self.ytop + below;
        if !self.lyrics.is_empty() {
            self.height += NOTE_HEIGHT * 3 / 2;
        }
        if self.track + 1 == self.total_tracks {
            self.height += NOTE_HEIGHT * 3;
        }
    }

    fn calculate_width(&mut self, scroll_vert: bool) {
        self.width = if scroll_vert {
            PAGE_WIDTH
        } else {
            self.keysig_width + self.symbols.iter().map(MusicSymbol::width).sum::<i32>()
        };
    }

    fn calculate_start_end_time(&mut self) {
        self.start_time = self.symbols.first().map_or(0, MusicSymbol::start_time);
        self.end_time = 0;
        for symbol in &self.symbols {
            self.end_time = self.end_time.max(symbol.start_time());
            if let MusicSymbol::Chord(chord) = symbol {
                self.end_time = self.end_time.max(chord.end_time());
            }
        }
    }

    /// Keep the lyrics that fall within this staff's time range, with their
    /// x offsets. A lyric landing on a bar is nudged past it.
    pub fn add_lyrics(&mut self, tracklyrics: &[LyricSymbol]) {
        let mut lyrics = Vec::new();
        let mut xpos = 0;
        let mut index = 0;
        for lyric in tracklyrics {
            if lyric.start_time < self.start_time {
                continue;
            }
            if lyric.start_time > self.end_time {
                break;
            }
            while index < self.symbols.len() && self.symbols[index].start_time() < lyric.start_time {
                xpos += self.symbols[index].width();
                index += 1;
            }
            let mut placed = lyric.clone();
            placed.x = xpos;
            if self.symbols.get(index).is_some_and(MusicSymbol::is_bar) {
                placed.x += NOTE_WIDTH;
            }
            lyrics.push(placed);
        }
        self.lyrics = lyrics;
    }

    /// Measure number and x offset of every bar, when measure numbers are shown.
    pub fn measure_numbers(&self) -> Vec<(i32, i32)> {
        if !self.show_measures || self.measure_length <= 0 {
            return Vec::new();
        }
        let mut xpos = self.keysig_width;
        let mut result = Vec::new();
        for symbol in &self.symbols {
            if symbol.is_bar() {
                result.push((xpos + NOTE_WIDTH / 2, 1 + symbol.start_time() / self.measure_length));
            }
            xpos += symbol.width();
        }
        result
    }

    /// Pulse time of the symbol under horizontal position `x`.
    pub fn pulse_time_for_point(&self, x: i32) -> i32 {
        let mut xpos = self.keysig_width;
        let mut pulse = self.start_time;
        for symbol in &self.symbols {
            pulse = symbol.start_time();
            if x <= xpos + symbol.width() {
                return pulse;
            }
            xpos += symbol.width();
        }
        pulse
    }

    /// The first chord starting at or after `pulse`.
    pub fn current_note(&self, pulse: i32) -> Option<&ChordSymbol> {
        self.symbols.iter().filter_map(MusicSymbol::as_chord).find(|c| c.start_time() >= pulse)
    }
}

/// Split a track's symbols into staves no wider than the page (when
/// scrolling vertically) without breaking a measure across two staves,
/// unless a single measure does not fit.
pub fn staff_ranges(
    symbols: &[MusicSymbol],
    measurelen: i32,
    keysig_width: i32,
    scroll_vert: bool,
) -> Vec<Range<usize>> {
    let maxwidth = if scroll_vert { PAGE_WIDTH } else { UNBOUNDED_WIDTH };
    let measure = |i: usize| if measurelen > 0 { symbols[i].start_time() / measurelen } else { 0 };
    let len = symbols.len();
    let mut ranges = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start;
        let mut width = keysig_width;
        while end < len && width + symbols[end].width() < maxwidth {
            width += symbols[end].width();
            end += 1;
        }
        let mut last = if end > start { end - 1 } else { start };

        if last + 1 < len && measure(start) != measure(last) {
            // Back up to the end of the previous measure.
            let endmeasure = measure(last + 1);
            while last > start && measure(last) == endmeasure {
                last -= 1;
            }
        }
        ranges.push(start..last + 1);
        start = last + 1;
    }
    ranges
}

/// Spread the spare page width evenly over the start-time groups of a
/// vertically scrolled staff, at most two note heights each.
pub fn full_justify(symbols: &mut [MusicSymbol], keysig_width: i32) {
    let mut totalwidth = keysig_width;
    let mut groups = 0;
    let mut i = 0;
    while i < symbols.len() {
        let start = symbols[i].start_time();
        groups += 1;
        while i < symbols.len() && symbols[i].start_time() == start {
            totalwidth += symbols[i].width();
            i += 1;
        }
    }
    if groups == 0 {
        return;
    }
    let extra = ((PAGE_WIDTH - totalwidth - 1) / groups).clamp(0, NOTE_HEIGHT * 2);

    let mut i = 0;
    while i < symbols.len() {
        let start = symbols[i].start_time();
        let width = symbols[i].width();
        symbols[i].set_width(width + extra);
        i += 1;
        while i < symbols.len() && symbols[i].start_time() == start {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::symbols::{BarSymbol, RestSymbol};
    use crate::time_signature::NoteDuration;
    use pretty_assertions::assert_eq;

    fn c_major() -> KeySignature {
        KeySignature::new(0, 0).unwrap()
    }

    /// Bars every 1920 pulses with four quarter rests between them.
    fn measures(count: i32) -> Vec<MusicSymbol> {
        let mut symbols = Vec::new();
        for m in 0..count {
            symbols.push(MusicSymbol::Bar(BarSymbol::new(m * 1920)));
            for q in 0..4 {
                symbols.push(MusicSymbol::Rest(RestSymbol::new(m * 1920 + q * 480, NoteDuration::Quarter)));
            }
        }
        symbols
    }

    #[test]
    fn key_signature_widths() {
        assert_eq!(key_signature_width(&c_major()), 39);
        assert_eq!(key_signature_width(&KeySignature::new(3, 0).unwrap()), 39 + 36);
    }

    #[test]
    fn staves_end_on_measure_boundaries() {
        // Each measure is 14 + 4 * 20 = 94 pixels wide.
        let symbols = measures(20);
        let ranges = staff_ranges(&symbols, 1920, 39, true);
        assert!(ranges.len() > 1);
        for range in &ranges {
            let width: i32 = 39 + symbols[range.clone()].iter().map(MusicSymbol::width).sum::<i32>();
            assert!(width < PAGE_WIDTH);
            assert!(symbols[range.start].is_bar(), "staff starts mid-measure at {}", range.start);
        }
        assert_eq!(ranges.last().map(|r| r.end), Some(symbols.len()));
    }

    #[test]
    fn horizontal_scrolling_is_one_staff() {
        let symbols = measures(20);
        assert_eq!(staff_ranges(&symbols, 1920, 39, false), vec![0..symbols.len()]);
    }

    #[test]
    fn staff_times_and_height() {
        let staff = Staff::new(measures(2), &c_major(), 0, 1, false, false, 1920);
        assert_eq!(staff.start_time(), 0);
        assert_eq!(staff.end_time(), 1920 + 3 * 480);
        assert_eq!(staff.width(), 39 + 2 * 94);
        // Treble clef: 2 note heights above, 5 for the lines, 2 below, 3 for the last track.
        assert_eq!(staff.height(), 16 + 8 + 40 + 16 + 24);
        assert_eq!(staff.pulse_time_for_point(0), 0);
        assert_eq!(staff.pulse_time_for_point(39 + 14 + 21), 480);
    }

    #[test]
    fn lyrics_get_offsets() {
        let mut staff = Staff::new(measures(1), &c_major(), 0, 2, false, false, 1920);
        let lyrics = vec![LyricSymbol::new(0, "la"), LyricSymbol::new(480, "di"), LyricSymbol::new(5000, "da")];
        staff.add_lyrics(&lyrics);
        let placed: Vec<(i32, &str)> = staff.lyrics().iter().map(|l| (l.x, l.text.as_str())).collect();
        assert_eq!(placed, vec![(NOTE_WIDTH, "la"), (14 + 20, "di")]);
    }

    #[test]
    fn justify_adds_capped_space() {
        let mut symbols = measures(1);
        full_justify(&mut symbols, 39);
        // Four start-time groups and plenty of room, so the cap applies. The
        // bar shares pulse 0 with the first rest and takes that group's space.
        assert_eq!(symbols[0].width(), 14 + 16);
        assert_eq!(symbols[1].width(), 20);
        assert_eq!(symbols[2].width(), 20 + 16);
    }
}
