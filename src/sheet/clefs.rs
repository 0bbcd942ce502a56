//! Choosing a treble or bass clef for every measure of a track.

use crate::model::Note;
use crate::pitch::{Clef, WhiteNote};

/// The clef of each measure of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct ClefMeasures {
    clefs: Vec<Clef>,
    measure: i32,
}

impl ClefMeasures {
    /// A measure whose average note is at or above F4 is treble, at or
    /// below G3 bass; anything between keeps the track's main clef. Empty
    /// measures keep the previous clef.
    pub fn new(notes: &[Note], measure: i32) -> Self {
        let mainclef = main_clef(notes);
        let mut clefs = Vec::new();
        let mut clef = mainclef;
        let mut nextmeasure = measure;
        let mut pos = 0;

        while pos < notes.len() {
            let mut sum = 0;
            let mut count = 0;
            while pos < notes.len() && notes[pos].start_time < nextmeasure {
                sum += notes[pos].number;
                count += 1;
                pos += 1;
            }
            let avg = sum / count.max(1);
            if avg == 0 {
                // no notes: keep the previous clef
            } else if avg >= WhiteNote::BOTTOM_TREBLE.number() {
                clef = Clef::Treble;
            } else if avg <= WhiteNote::TOP_BASS.number() {
                clef = Clef::Bass;
            } else {
                clef = mainclef;
            }
            clefs.push(clef);
            if measure <= 0 {
                break;
            }
            nextmeasure += measure;
        }
        clefs.push(clef);
        Self { clefs, measure }
    }

    /// Clef for the measure containing `start_time`; past the last note the
    /// final clef is used.
    pub fn get_clef(&self, start_time: i32) -> Clef {
        let last = self.clefs.last().copied().unwrap_or(Clef::Treble);
        if self.measure <= 0 || start_time < 0 {
            return self.clefs.first().copied().unwrap_or(last);
        }
        self.clefs.get((start_time / self.measure) as usize).copied().unwrap_or(last)
    }
}

/// Treble if the average note is at or above middle C.
fn main_clef(notes: &[Note]) -> Clef {
    if notes.is_empty() {
        return Clef::Treble;
    }
    let total: i32 = notes.iter().map(|n| n.number).sum();
    if total / notes.len() as i32 >= WhiteNote::MIDDLE_C.number() {
        Clef::Treble
    } else {
        Clef::Bass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(pairs: &[(i32, i32)]) -> Vec<Note> {
        pairs.iter().map(|&(start, number)| Note::new(start, 0, number, 240)).collect()
    }

    #[test]
    fn per_measure_clefs() {
        let track = notes(&[(0, 72), (480, 76), (960, 79), (1920, 40), (2400, 43), (5760, 62)]);
        let clefs = ClefMeasures::new(&track, 1920);
        assert_eq!(clefs.get_clef(0), Clef::Treble);
        assert_eq!(clefs.get_clef(1920), Clef::Bass);
        // An empty measure keeps the clef before it.
        assert_eq!(clefs.get_clef(3840), Clef::Bass);
        // Between G3 and F4: the main clef, treble here.
        assert_eq!(clefs.get_clef(5760), Clef::Treble);
        assert_eq!(clefs.get_clef(100_000), Clef::Treble);
    }

    #[test]
    fn low_tracks_default_to_bass() {
        let track = notes(&[(0, 40), (480, 45)]);
        let clefs = ClefMeasures::new(&track, 1920);
        assert_eq!(clefs.get_clef(0), Clef::Bass);
        assert_eq!(ClefMeasures::new(&[], 1920).get_clef(0), Clef::Treble);
    }
}
