//! Time signature, measure length and note-duration bucketing.

use serde::{Deserialize, Serialize};

use crate::error::{MidiError, Result};

/// Named note durations, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteDuration {
    ThirtySecond,
    Sixteenth,
    Triplet,
    Eighth,
    DottedEighth,
    Quarter,
    DottedQuarter,
    Half,
    DottedHalf,
    Whole,
}

impl NoteDuration {
    /// The undotted duration used for stems and beams.
    pub fn stem_duration(self) -> NoteDuration {
        match self {
            NoteDuration::DottedHalf => NoteDuration::Half,
            NoteDuration::DottedQuarter => NoteDuration::Quarter,
            NoteDuration::DottedEighth => NoteDuration::Eighth,
            other => other,
        }
    }

    pub fn is_dotted(self) -> bool {
        matches!(
            self,
            NoteDuration::DottedHalf | NoteDuration::DottedQuarter | NoteDuration::DottedEighth
        )
    }
}

/// Numerator/denominator of a meter, plus pulses per quarter note and tempo.
///
/// A numerator of 5 is stored as 4: some files declare 5/4 for 4/4 music.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeSignatureFields", into = "TimeSignatureFields")]
pub struct TimeSignature {
    numerator: i32,
    denominator: i32,
    quarter: i32,
    measure: i32,
    tempo: i32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSignatureFields {
    numerator: i32,
    denominator: i32,
    quarter: i32,
    tempo: i32,
}

impl TryFrom<TimeSignatureFields> for TimeSignature {
    type Error = MidiError;

    fn try_from(f: TimeSignatureFields) -> Result<Self> {
        TimeSignature::new(f.numerator, f.denominator, f.quarter, f.tempo)
    }
}

impl From<TimeSignature> for TimeSignatureFields {
    fn from(t: TimeSignature) -> Self {
        Self { numerator: t.numerator, denominator: t.denominator, quarter: t.quarter, tempo: t.tempo }
    }
}

impl TimeSignature {
    /// Default tempo: 500,000 µs per quarter note (120 bpm).
    pub const DEFAULT_TEMPO: i32 = 500_000;

    pub fn new(numerator: i32, denominator: i32, quarter: i32, tempo: i32) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 || quarter <= 0 {
            return Err(MidiError::InvalidConfiguration(format!(
                "invalid time signature {numerator}/{denominator} with quarter note {quarter}"
            )));
        }
        let numerator = if numerator == 5 { 4 } else { numerator };
        let beat = if denominator < 4 { quarter.checked_mul(2) } else { Some(quarter / (denominator / 4)) };
        let measure = beat.and_then(|beat| numerator.checked_mul(beat)).ok_or_else(|| {
            MidiError::InvalidConfiguration(format!(
                "time signature {numerator}/{denominator} with quarter note {quarter} overflows a measure"
            ))
        })?;
        Ok(Self { numerator, denominator, quarter, measure, tempo })
    }

    pub fn numerator(&self) -> i32 {
        self.numerator
    }

    pub fn denominator(&self) -> i32 {
        self.denominator
    }

    /// Pulses per quarter note.
    pub fn quarter(&self) -> i32 {
        self.quarter
    }

    /// Pulses per measure.
    pub fn measure(&self) -> i32 {
        self.measure
    }

    /// Microseconds per quarter note.
    pub fn tempo(&self) -> i32 {
        self.tempo
    }

    /// Index of the measure containing `time`.
    pub fn get_measure(&self, time: i32) -> i32 {
        if self.measure <= 0 {
            return 0;
        }
        time / self.measure
    }

    /// The closest named duration for a span of pulses.
    pub fn note_duration(&self, duration: i32) -> NoteDuration {
        let whole = self.quarter * 4;
        if duration >= 28 * whole / 32 {
            NoteDuration::Whole
        } else if duration >= 20 * whole / 32 {
            NoteDuration::DottedHalf
        } else if duration >= 14 * whole / 32 {
            NoteDuration::Half
        } else if duration >= 10 * whole / 32 {
            NoteDuration::DottedQuarter
        } else if duration >= 7 * whole / 32 {
            NoteDuration::Quarter
        } else if duration >= 5 * whole / 32 {
            NoteDuration::DottedEighth
        } else if duration >= 6 * whole / 64 {
            NoteDuration::Eighth
        } else if duration >= 5 * whole / 64 {
            NoteDuration::Triplet
        } else if duration >= 3 * whole / 64 {
            NoteDuration::Sixteenth
        } else {
            NoteDuration::ThirtySecond
        }
    }

    /// Pulses spanned by a named duration.
    pub fn duration_to_time(&self, dur: NoteDuration) -> i32 {
        let eighth = self.quarter / 2;
        let sixteenth = eighth / 2;
        match dur {
            NoteDuration::Whole => self.quarter * 4,
            NoteDuration::DottedHalf => self.quarter * 3,
            NoteDuration::Half => self.quarter * 2,
            NoteDuration::DottedQuarter => 3 * eighth,
            NoteDuration::Quarter => self.quarter,
            NoteDuration::DottedEighth => 3 * sixteenth,
            NoteDuration::Eighth => eighth,
            NoteDuration::Triplet => self.quarter / 3,
            NoteDuration::Sixteenth => sixteenth,
            NoteDuration::ThirtySecond => sixteenth / 2,
        }
    }
}

/// 4/4 at 480 pulses per quarter and 120 bpm.
impl Default for TimeSignature {
    fn default() -> Self {
        Self { numerator: 4, denominator: 4, quarter: 480, measure: 1920, tempo: Self::DEFAULT_TEMPO }
    }
}

impl std::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimeSignature={}/{} quarter={} tempo={}",
            self.numerator, self.denominator, self.quarter, self.tempo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_four() -> TimeSignature {
        TimeSignature::new(4, 4, 480, 500_000).unwrap()
    }

    #[test]
    fn measure_lengths() {
        assert_eq!(four_four().measure(), 1920);
        assert_eq!(TimeSignature::new(3, 4, 480, 500_000).unwrap().measure(), 1440);
        assert_eq!(TimeSignature::new(6, 8, 480, 500_000).unwrap().measure(), 1440);
        assert_eq!(TimeSignature::new(2, 2, 480, 500_000).unwrap().measure(), 1920);
    }

    #[test]
    fn five_becomes_four() {
        let t = TimeSignature::new(5, 4, 480, 500_000).unwrap();
        assert_eq!(t.numerator(), 4);
        assert_eq!(t.measure(), 1920);
    }

    #[test]
    fn rejects_non_positive_fields() {
        assert!(matches!(
            TimeSignature::new(0, 4, 480, 500_000),
            Err(MidiError::InvalidConfiguration(_))
        ));
        assert!(TimeSignature::new(4, 0, 480, 500_000).is_err());
        assert!(TimeSignature::new(4, 4, 0, 500_000).is_err());
    }

    #[test]
    fn rejects_measures_that_overflow() {
        assert!(matches!(
            TimeSignature::new(1 << 30, 4, 480, 500_000),
            Err(MidiError::InvalidConfiguration(_))
        ));
        assert!(TimeSignature::new(4, 2, i32::MAX, 500_000).is_err());
    }

    #[test]
    fn duration_buckets() {
        let t = four_four();
        assert_eq!(t.note_duration(1920), NoteDuration::Whole);
        assert_eq!(t.note_duration(1440), NoteDuration::DottedHalf);
        assert_eq!(t.note_duration(960), NoteDuration::Half);
        assert_eq!(t.note_duration(720), NoteDuration::DottedQuarter);
        assert_eq!(t.note_duration(480), NoteDuration::Quarter);
        assert_eq!(t.note_duration(360), NoteDuration::DottedEighth);
        assert_eq!(t.note_duration(240), NoteDuration::Eighth);
        assert_eq!(t.note_duration(160), NoteDuration::Triplet);
        assert_eq!(t.note_duration(120), NoteDuration::Sixteenth);
        assert_eq!(t.note_duration(60), NoteDuration::ThirtySecond);
    }

    #[test]
    fn durations_map_back_to_themselves() {
        let t = four_four();
        for dur in [
            NoteDuration::Whole,
            NoteDuration::DottedHalf,
            NoteDuration::Half,
            NoteDuration::DottedQuarter,
            NoteDuration::Quarter,
            NoteDuration::DottedEighth,
            NoteDuration::Eighth,
            NoteDuration::Triplet,
            NoteDuration::Sixteenth,
            NoteDuration::ThirtySecond,
        ] {
            assert_eq!(t.note_duration(t.duration_to_time(dur)), dur);
        }
    }

    #[test]
    fn json_round_trip_validates() {
        let json = serde_json::to_string(&four_four()).unwrap();
        let back: TimeSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, four_four());
        let bad = r#"{"numerator":0,"denominator":4,"quarter":480,"tempo":500000}"#;
        assert!(serde_json::from_str::<TimeSignature>(bad).is_err());
    }
}
