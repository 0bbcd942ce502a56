//! Note stems and the beam link between two stems.

use serde::Serialize;

use crate::pitch::WhiteNote;
use crate::time_signature::NoteDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StemDirection {
    Up,
    Down,
}

/// Which side of the note heads the stem is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StemSide {
    Left,
    Right,
}

/// The far end of a beam, stored on the first stem of a beamed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamPair {
    pub end: WhiteNote,
    pub duration: NoteDuration,
    /// Horizontal pixels from this stem to the paired stem.
    pub width: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stem {
    duration: NoteDuration,
    direction: StemDirection,
    top: WhiteNote,
    bottom: WhiteNote,
    end: WhiteNote,
    notes_overlap: bool,
    side: StemSide,
    pair: Option<BeamPair>,
    receiver: bool,
}

impl Stem {
    pub fn new(
        bottom: WhiteNote,
        top: WhiteNote,
        duration: NoteDuration,
        direction: StemDirection,
        notes_overlap: bool,
    ) -> Self {
        let mut stem = Stem {
            duration,
            direction,
            top,
            bottom,
            end: top,
            notes_overlap,
            side: StemSide::Left,
            pair: None,
            receiver: false,
        };
        stem.change_direction(direction);
        stem
    }

    pub fn duration(&self) -> NoteDuration {
        self.duration
    }

    pub fn direction(&self) -> StemDirection {
        self.direction
    }

    pub fn top(&self) -> WhiteNote {
        self.top
    }

    pub fn bottom(&self) -> WhiteNote {
        self.bottom
    }

    /// Staff position where the stem ends.
    pub fn end(&self) -> WhiteNote {
        self.end
    }

    pub fn set_end(&mut self, end: WhiteNote) {
        self.end = end;
    }

    pub fn side(&self) -> StemSide {
        self.side
    }

    pub fn pair(&self) -> Option<BeamPair> {
        self.pair
    }

    /// True for every stem after the first in a beamed group.
    pub fn receiver(&self) -> bool {
        self.receiver
    }

    pub fn set_receiver(&mut self, receiver: bool) {
        self.receiver = receiver;
    }

    /// Point the stem the other way; the side and end follow.
    pub fn change_direction(&mut self, direction: StemDirection) {
        self.direction = direction;
        self.side = if direction == StemDirection::Up || self.notes_overlap {
            StemSide::Right
        } else {
            StemSide::Left
        };
        self.end = self.calculate_end();
    }

    /// Default end position: an octave minus one step from the outer note,
    /// longer for sixteenths and thirty-seconds to leave room for flags.
    pub fn calculate_end(&self) -> WhiteNote {
        let extra = match self.duration {
            NoteDuration::Sixteenth => 2,
            NoteDuration::ThirtySecond => 4,
            _ => 0,
        };
        match self.direction {
            StemDirection::Up => self.top.add(6 + extra),
            StemDirection::Down => self.bottom.add(-6 - extra),
        }
    }

    pub fn set_pair(&mut self, pair: &Stem, width: i32) {
        self.pair = Some(BeamPair { end: pair.end, duration: pair.duration, width });
    }

    /// Whether this stem is part of a beamed group.
    pub fn is_beam(&self) -> bool {
        self.receiver || self.pair.is_some()
    }
}
