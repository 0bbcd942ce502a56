//! Joining runs of short chords with horizontal beams.
//!
//! Groups of 6, 3, 4 and 2 chords are tried in that order. A group may only
//! contain chords in one measure, with one stem duration, separated by
//! nothing but blank padding.

use super::chord::{stem_direction, ChordSymbol};
use super::stem::{Stem, StemDirection};
use super::symbols::MusicSymbol;
use crate::pitch::Clef;
use crate::time_signature::{NoteDuration, TimeSignature};

/// Beam every track's chords.
pub fn create_all_beamed_chords(allsymbols: &mut [Vec<MusicSymbol>], time: &TimeSignature) {
    let (num, denom) = (time.numerator(), time.denominator());
    if (num == 3 && denom == 4) || (num == 6 && denom == 8) || (num == 6 && denom == 4) {
        create_beamed_chords(allsymbols, time, 6, true);
    }
    create_beamed_chords(allsymbols, time, 3, true);
    create_beamed_chords(allsymbols, time, 4, true);
    create_beamed_chords(allsymbols, time, 2, true);
    create_beamed_chords(allsymbols, time, 2, false);
}

/// One pass over every track for groups of `num_chords`. A successful group
/// resumes the scan after its last chord, a failed one after its first.
fn create_beamed_chords(
    allsymbols: &mut [Vec<MusicSymbol>],
    time: &TimeSignature,
    num_chords: usize,
    start_beat: bool,
) {
    for symbols in allsymbols.iter_mut() {
        let mut start_index = 0;
        while let Some((indexes, spacing)) = find_consecutive_chords(symbols, start_index, num_chords) {
            let chords: Vec<&ChordSymbol> =
                indexes.iter().filter_map(|&i| symbols[i].as_chord()).collect();
            if can_create_beam(&chords, time, start_beat) {
                create_beam(symbols, &indexes, spacing);
                start_index = indexes[num_chords - 1] + 1;
            } else {
                start_index = indexes[0] + 1;
            }
        }
    }
}

/// Find `num_chords` chords in a row starting at or after `start_index`,
/// with only blanks between them. Returns their indexes and the pixel
/// distance from the right edge of the first to the right edge of the last.
pub fn find_consecutive_chords(
    symbols: &[MusicSymbol],
    start_index: usize,
    num_chords: usize,
) -> Option<(Vec<usize>, i32)> {
    let len = symbols.len();
    if num_chords == 0 || len < num_chords {
        return None;
    }
    let mut i = start_index;
    loop {
        let mut distance = 0;
        // A starting chord that has a stem.
        while i < len - num_chords {
            if symbols[i].as_chord().is_some_and(|c| c.stem().is_some()) {
                break;
            }
            i += 1;
        }
        if i >= len - num_chords {
            return None;
        }
        let mut indexes = vec![i];
        let mut found = true;
        for chord_index in 1..num_chords {
            i += 1;
            let remaining = num_chords - 1 - chord_index;
            while i < len - remaining && symbols[i].is_blank() {
                distance += symbols[i].width();
                i += 1;
            }
            if i >= len - remaining {
                return None;
            }
            if symbols[i].as_chord().is_none() {
                found = false;
                break;
            }
            indexes.push(i);
            distance += symbols[i].width();
        }
        if found {
            return Some((indexes, distance));
        }
    }
}

fn beat_offset_ok(start_time: i32, beat: i32, time: &TimeSignature) -> bool {
    beat <= 0 || start_time % beat <= time.quarter() / 6
}

/// Whether these chords may share a beam:
/// 6 eighths in 3/4, 6/8 or 6/4; 4 chords in duple or quadruple time (or
/// sixteenths); 3 triplets (or eighths in 12/8); any 2 chords, optionally
/// starting on a quarter beat.
pub fn can_create_beam(chords: &[&ChordSymbol], time: &TimeSignature, start_quarter: bool) -> bool {
    let (Some(first), Some(last)) = (chords.first(), chords.last()) else {
        return false;
    };
    let (Some(first_stem), Some(last_stem)) = (first.stem(), last.stem()) else {
        return false;
    };
    let measure = time.get_measure(first.start_time());
    let dur = first_stem.duration();
    let dur2 = last_stem.duration();
    let (num, denom, quarter) = (time.numerator(), time.denominator(), time.quarter());

    let dotted8_to_16 =
        chords.len() == 2 && dur == NoteDuration::DottedEighth && dur2 == NoteDuration::Sixteenth;

    match dur {
        NoteDuration::Whole
        | NoteDuration::Half
        | NoteDuration::DottedHalf
        | NoteDuration::Quarter
        | NoteDuration::DottedQuarter => return false,
        NoteDuration::DottedEighth if !dotted8_to_16 => return false,
        _ => {}
    }

    let start = first.start_time();
    match chords.len() {
        6 => {
            if dur != NoteDuration::Eighth {
                return false;
            }
            let correct_time =
                (num == 3 && denom == 4) || (num == 6 && denom == 8) || (num == 6 && denom == 4);
            if !correct_time {
                return false;
            }
            // In 6/4 the group starts on the first or fourth quarter.
            if num == 6 && denom == 4 && !beat_offset_ok(start, quarter * 3, time) {
                return false;
            }
        }
        4 => {
            if num == 3 && denom == 8 {
                return false;
            }
            let correct_time = num == 2 || num == 4 || num == 8;
            if !correct_time && dur != NoteDuration::Sixteenth {
                return false;
            }
            let beat = match dur {
                NoteDuration::Eighth => quarter * 2,
                NoteDuration::ThirtySecond => quarter / 2,
                _ => quarter,
            };
            if !beat_offset_ok(start, beat, time) {
                return false;
            }
        }
        3 => {
            let twelve_eight = num == 12 && denom == 8;
            let valid = dur == NoteDuration::Triplet || (dur == NoteDuration::Eighth && twelve_eight);
            if !valid {
                return false;
            }
            let beat = if twelve_eight { quarter / 2 * 3 } else { quarter };
            if !beat_offset_ok(start, beat, time) {
                return false;
            }
        }
        2 => {
            if start_quarter && !beat_offset_ok(start, quarter, time) {
                return false;
            }
        }
        _ => {}
    }

    for chord in chords {
        if time.get_measure(chord.start_time()) != measure {
            return false;
        }
        let Some(stem) = chord.stem() else {
            return false;
        };
        if stem.duration() != dur && !dotted8_to_16 {
            return false;
        }
        if stem.is_beam() {
            return false;
        }
    }

    // Chords with two stems already fix their direction; they must agree.
    let mut two_stem_direction = None;
    for chord in chords.iter().filter(|c| c.has_two_stems()) {
        let direction = chord.stem().map(Stem::direction);
        if two_stem_direction.is_some() && direction != two_stem_direction {
            return false;
        }
        two_stem_direction = direction;
    }
    let direction = match two_stem_direction {
        Some(direction) => direction,
        None => group_direction(first_stem, last_stem, first.clef()),
    };

    // Too far apart vertically for one beam.
    match direction {
        StemDirection::Up => first_stem.top().dist(last_stem.top()).abs() < 11,
        StemDirection::Down => first_stem.bottom().dist(last_stem.bottom()).abs() < 11,
    }
}

fn group_direction(first: &Stem, last: &Stem, clef: Clef) -> StemDirection {
    let outer = |stem: &Stem| match stem.direction() {
        StemDirection::Up => stem.top(),
        StemDirection::Down => stem.bottom(),
    };
    stem_direction(outer(first), outer(last), clef)
}

/// Join the chords at `indexes` with one beam. `spacing` is the pixel
/// distance between the first and last stem.
pub fn create_beam(symbols: &mut [MusicSymbol], indexes: &[usize], spacing: i32) {
    let chords: Vec<&ChordSymbol> = indexes.iter().filter_map(|&i| symbols[i].as_chord()).collect();
    let mut stems: Vec<Stem> = chords.iter().filter_map(|c| c.stem().copied()).collect();
    if stems.len() != indexes.len() || stems.len() < 2 {
        return;
    }
    let two_stem = chords.iter().find(|c| c.has_two_stems()).and_then(|c| c.stem()).map(Stem::direction);
    let last = stems.len() - 1;
    let direction =
        two_stem.unwrap_or_else(|| group_direction(&stems[0], &stems[last], chords[0].clef()));

    for stem in stems.iter_mut() {
        stem.change_direction(direction);
    }
    if stems.len() == 2 {
        bring_stems_closer(&mut stems);
    } else {
        line_up_stem_ends(&mut stems);
    }
    let last_stem = stems[last];
    stems[0].set_pair(&last_stem, spacing);
    for stem in stems.iter_mut().skip(1) {
        stem.set_receiver(true);
    }

    for (&index, stem) in indexes.iter().zip(stems) {
        if let Some(slot) = symbols[index].as_chord_mut().and_then(ChordSymbol::stem_mut) {
            *slot = stem;
        }
    }
}

/// Two-chord beam: move the stem ends halfway toward each other. A dotted
/// eighth beamed to a sixteenth first gets a sixteenth-length stem.
fn bring_stems_closer(stems: &mut [Stem]) {
    let [first, last] = stems else {
        return;
    };
    if first.duration() == NoteDuration::DottedEighth && last.duration() == NoteDuration::Sixteenth {
        let step = if first.direction() == StemDirection::Up { 2 } else { -2 };
        first.set_end(first.end().add(step));
    }

    let distance = first.end().dist(last.end()).abs();
    if first.direction() == StemDirection::Up {
        if first.end().dist(last.end()) > 0 {
            last.set_end(last.end().add(distance / 2));
        } else {
            first.set_end(first.end().add(distance / 2));
        }
    } else if first.end().dist(last.end()) < 0 {
        last.set_end(last.end().add(-distance / 2));
    } else {
        first.set_end(first.end().add(-distance / 2));
    }
}

/// Three or more chords: the beam slants from the first stem to the last,
/// or is flat when an inner stem is the extreme. Inner stems share one end.
fn line_up_stem_ends(stems: &mut [Stem]) {
    let last = stems.len() - 1;
    // Index of the extreme end; later stems win ties.
    let extreme = |up: bool| {
        let mut best = 0;
        for (i, stem) in stems.iter().enumerate().skip(1) {
            let d = stem.end().dist(stems[best].end());
            if (up && d >= 0) || (!up && d <= 0) {
                best = i;
            }
        }
        best
    };

    if stems[0].direction() == StemDirection::Up {
        let top_index = extreme(true);
        let top = stems[top_index].end();
        if top_index == 0 && top.dist(stems[last].end()) >= 2 {
            stems[0].set_end(top);
            stems[1].set_end(top.add(-1));
            stems[last].set_end(top.add(-2));
        } else if top_index == last && top.dist(stems[0].end()) >= 2 {
            stems[0].set_end(top.add(-2));
            stems[1].set_end(top.add(-1));
            stems[last].set_end(top);
        } else {
            stems[0].set_end(top);
            stems[1].set_end(top);
            stems[last].set_end(top);
        }
    } else {
        let bottom_index = extreme(false);
        let bottom = stems[bottom_index].end();
        if bottom_index == 0 && stems[last].end().dist(bottom) >= 2 {
            stems[1].set_end(bottom.add(1));
            stems[last].set_end(bottom.add(2));
        } else if bottom_index == last && stems[0].end().dist(bottom) >= 2 {
            stems[1].set_end(bottom.add(1));
            stems[0].set_end(bottom.add(2));
        } else {
            stems[0].set_end(bottom);
            stems[1].set_end(bottom);
            stems[last].set_end(bottom);
        }
    }

    let middle_end = stems[1].end();
    for stem in &mut stems[1..last] {
        stem.set_end(middle_end);
    }
}
