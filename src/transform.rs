//! Note-level transforms applied before layout.
//!
//! Every function here works on owned or borrowed clones of a document's
//! tracks; the decoded [`MidiFile`] itself is never touched.

use crate::decoder::MidiFile;
use crate::model::{sort_notes, Lyric, Note, Track};
use crate::options::MidiOptions;
use crate::time_signature::TimeSignature;

/// Upper note of the treble staff (E5) and lower note of the bass staff
/// (A3): the split windows used before any wide chord has been seen.
const SPLIT_INITIAL_HIGH: i32 = 76;
const SPLIT_INITIAL_LOW: i32 = 45;
const OCTAVE: i32 = 12;

impl MidiFile {
    /// The tracks to lay out, with the sheet-music options applied:
    /// track selection, start-time and duration rounding, the two-staff
    /// merge, time shift and transpose.
    pub fn change_midi_notes(&self, options: &MidiOptions) -> Vec<Track> {
        let mut newtracks: Vec<Track> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(i, _)| options.track_shown(*i))
            .map(|(_, t)| t.clone())
            .collect();

        let time = options.time.unwrap_or(self.time);
        round_start_times(&mut newtracks, options.combine_interval, &self.time);
        round_durations(&mut newtracks, time.quarter());

        if options.two_staffs {
            newtracks = combine_to_two_tracks(&newtracks, self.time.measure());
        }
        if options.shift_time != 0 {
            shift_time(&mut newtracks, options.shift_time);
        }
        if options.transpose != 0 {
            transpose(&mut newtracks, options.transpose);
        }
        newtracks
    }
}

/// Move every note by `amount` pulses.
pub fn shift_time(tracks: &mut [Track], amount: i32) {
    for note in tracks.iter_mut().flat_map(|t| t.notes.iter_mut()) {
        note.start_time += amount;
    }
}

/// Move every note by `amount` semitones, never below note 0.
pub fn transpose(tracks: &mut [Track], amount: i32) {
    for note in tracks.iter_mut().flat_map(|t| t.notes.iter_mut()) {
        note.number = (note.number + amount).max(0);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Quantization
// ═══════════════════════════════════════════════════════════════════════

/// Give notes that start within `millisec` of each other the same start
/// time, so they are drawn as one chord.
pub fn round_start_times(tracks: &mut [Track], millisec: i32, time: &TimeSignature) {
    let mut starttimes: Vec<i32> =
        tracks.iter().flat_map(|t| t.notes.iter().map(|n| n.start_time)).collect();
    starttimes.sort_unstable();

    let interval = if time.tempo() > 0 {
        (i64::from(time.quarter()) * i64::from(millisec) * 1000 / i64::from(time.tempo())) as i32
    } else {
        0
    };

    for i in 1..starttimes.len() {
        if starttimes[i] - starttimes[i - 1] <= interval {
            starttimes[i] = starttimes[i - 1];
        }
    }

    for track in tracks.iter_mut() {
        let mut i = 0;
        for note in track.notes.iter_mut() {
            while i < starttimes.len() && note.start_time - interval > starttimes[i] {
                i += 1;
            }
            if let Some(&snap) = starttimes.get(i) {
                if note.start_time > snap && note.start_time - snap <= interval {
                    note.start_time = snap;
                }
            }
        }
        sort_notes(&mut track.notes);
    }
}

/// Extend each note towards the next note with a later start, rounded to
/// the longest of a quarter, eighth, triplet or sixteenth that fits.
/// A note that follows an equal, abutting note keeps its duration so the
/// two can still pair up.
pub fn round_durations(tracks: &mut [Track], quarter: i32) {
    for track in tracks.iter_mut() {
        let notes = &mut track.notes;
        let count = notes.len();
        let mut prev: Option<usize> = None;

        for i in 0..count.saturating_sub(1) {
            let p = *prev.get_or_insert(i);
            let note1 = notes[i];

            let note2 = notes[i + 1..]
                .iter()
                .find(|n| note1.start_time < n.start_time)
                .or_else(|| notes.last())
                .copied()
                .unwrap_or(note1);
            let maxduration = note2.start_time - note1.start_time;

            let mut dur = [quarter, quarter / 2, quarter / 3, quarter / 4]
                .into_iter()
                .find(|d| *d <= maxduration)
                .unwrap_or(0);
            if dur < note1.duration {
                dur = note1.duration;
            }

            let prevnote = notes[p];
            if prevnote.end_time() == note1.start_time && prevnote.duration == note1.duration {
                dur = note1.duration;
            }
            notes[i].duration = dur;
            if notes[i + 1].start_time != note1.start_time {
                prev = Some(i);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Splitting and merging
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct HighLow {
    high: i32,
    low: i32,
}

impl HighLow {
    fn widen(&mut self, number: i32) {
        self.high = self.high.max(number);
        self.low = self.low.min(number);
    }

    fn spans_octave(&self) -> bool {
        self.high - self.low > OCTAVE
    }

    /// True if `number` is nearer the high end (ties go high).
    fn nearer_high(&self, number: i32) -> bool {
        self.high - number <= number - self.low
    }
}

/// Highest and lowest notes overlapping `[starttime, endtime)`, with both
/// the interval and the look-back limited to one measure.
fn find_high_low_notes(
    notes: &[Note],
    measurelen: i32,
    startindex: usize,
    starttime: i32,
    endtime: i32,
    pair: &mut HighLow,
) {
    let endtime = endtime.min(starttime + measurelen);
    for note in notes[startindex..].iter().take_while(|n| n.start_time < endtime) {
        if note.end_time() < starttime || note.start_time + measurelen < starttime {
            continue;
        }
        pair.widen(note.number);
    }
}

/// Highest and lowest notes starting exactly at `starttime`.
fn find_exact_high_low_notes(notes: &[Note], startindex: usize, starttime: i32, pair: &mut HighLow) {
    notes[startindex..]
        .iter()
        .skip_while(|n| n.start_time < starttime)
        .take_while(|n| n.start_time == starttime)
        .for_each(|n| pair.widen(n.number));
}

/// Split a track into a top (right hand) and bottom (left hand) track.
///
/// Each note goes to whichever of the current high/low extremes it is
/// closer to. Extremes are taken from notes starting at the same time,
/// then from notes overlapping it; when neither spans more than an
/// octave the last window that did is used.
pub fn split_track(track: &Track, measurelen: i32) -> Vec<Track> {
    let notes = &track.notes;
    let mut top = Track::new(1);
    let mut bottom = Track::new(2);
    if notes.is_empty() {
        return vec![top, bottom];
    }

    let mut prev = HighLow { high: SPLIT_INITIAL_HIGH, low: SPLIT_INITIAL_LOW };
    let mut startindex = 0;

    for note in notes {
        let number = note.number;
        while startindex + 1 < notes.len() && notes[startindex].end_time() < note.start_time {
            startindex += 1;
        }

        let mut pair = HighLow { high: number, low: number };
        let mut exact = HighLow { high: number, low: number };
        find_high_low_notes(notes, measurelen, startindex, note.start_time, note.end_time(), &mut pair);
        find_exact_high_low_notes(notes, startindex, note.start_time, &mut exact);

        let far_from = |p: &HighLow| p.high - number > OCTAVE || number - p.low > OCTAVE;
        let goes_top = if far_from(&exact) {
            exact.nearer_high(number)
        } else if far_from(&pair) {
            pair.nearer_high(number)
        } else if exact.spans_octave() {
            exact.nearer_high(number)
        } else if pair.spans_octave() {
            pair.nearer_high(number)
        } else {
            prev.nearer_high(number)
        };

        if goes_top {
            top.add_note(*note);
        } else {
            bottom.add_note(*note);
        }

        if pair.spans_octave() {
            prev = pair;
        }
    }

    sort_notes(&mut top.notes);
    sort_notes(&mut bottom.notes);
    vec![top, bottom]
}

/// Merge already-sorted tracks into one, ordered by start time then note
/// number. Notes with the same start and number collapse into one, keeping
/// the longer duration.
pub fn combine_to_single_track(tracks: &[Track]) -> Track {
    let mut result = Track::new(1);
    match tracks {
        [] => return result,
        [only] => {
            result.notes = only.notes.clone();
            return result;
        }
        _ => {}
    }

    let mut noteindex = vec![0usize; tracks.len()];
    loop {
        let lowest = tracks
            .iter()
            .enumerate()
            .filter_map(|(t, track)| track.notes.get(noteindex[t]).map(|n| (t, *n)))
            .min_by(|(_, a), (_, b)| a.start_time.cmp(&b.start_time).then(a.number.cmp(&b.number)));
        let Some((tracknum, lowestnote)) = lowest else {
            break;
        };
        noteindex[tracknum] += 1;

        match result.notes.last_mut() {
            Some(prevnote)
                if prevnote.start_time == lowestnote.start_time && prevnote.number == lowestnote.number =>
            {
                prevnote.duration = prevnote.duration.max(lowestnote.duration);
            }
            _ => result.add_note(lowestnote),
        }
    }
    result
}

/// Merge all tracks, then split the result into treble and bass tracks.
/// All lyrics move to the top track.
pub fn combine_to_two_tracks(tracks: &[Track], measurelen: i32) -> Vec<Track> {
    let single = combine_to_single_track(tracks);
    let mut result = split_track(&single, measurelen);

    let mut lyrics: Vec<Lyric> = tracks.iter().flat_map(|t| t.lyrics.iter().cloned()).collect();
    if !lyrics.is_empty() {
        lyrics.sort_by_key(|l| l.start_time);
        result[0].lyrics = lyrics;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(notes: &[(i32, i32, i32)]) -> Track {
        let mut t = Track::new(0);
        for &(start, number, duration) in notes {
            t.add_note(Note::new(start, 0, number, duration));
        }
        t
    }

    fn starts(t: &Track) -> Vec<i32> {
        t.notes.iter().map(|n| n.start_time).collect()
    }

    #[test]
    fn close_start_times_merge() {
        // 40 ms at 120 bpm with 480 ppq is 38 pulses.
        let time = TimeSignature::new(4, 4, 480, 500_000).unwrap();
        let mut tracks = vec![track(&[(0, 60, 480), (480, 62, 480)]), track(&[(10, 48, 480), (500, 50, 480)])];
        round_start_times(&mut tracks, 40, &time);
        assert_eq!(starts(&tracks[0]), vec![0, 480]);
        assert_eq!(starts(&tracks[1]), vec![0, 480]);
    }

    #[test]
    fn far_start_times_stay() {
        let time = TimeSignature::new(4, 4, 480, 500_000).unwrap();
        let mut tracks = vec![track(&[(0, 60, 10), (100, 62, 10)])];
        round_start_times(&mut tracks, 40, &time);
        assert_eq!(starts(&tracks[0]), vec![0, 100]);
    }

    #[test]
    fn durations_extend_to_next_note() {
        let mut tracks = vec![track(&[(0, 60, 100), (480, 62, 100), (960, 64, 100)])];
        round_durations(&mut tracks, 480);
        let durs: Vec<i32> = tracks[0].notes.iter().map(|n| n.duration).collect();
        assert_eq!(durs, vec![480, 480, 100]);
    }

    #[test]
    fn durations_round_to_fitting_fraction() {
        let mut tracks = vec![track(&[(0, 60, 10), (200, 62, 10), (400, 64, 10)])];
        round_durations(&mut tracks, 480);
        // 480/3 = 160 is the largest fraction under a 200 pulse gap.
        assert_eq!(tracks[0].notes[0].duration, 160);
    }

    #[test]
    fn round_durations_is_idempotent() {
        let mut once = vec![track(&[(0, 60, 50), (0, 64, 30), (240, 62, 240), (480, 60, 240), (700, 65, 10), (960, 67, 5)])];
        round_durations(&mut once, 480);
        let mut twice = once.clone();
        round_durations(&mut twice, 480);
        assert_eq!(once, twice);
    }

    #[test]
    fn single_track_merge_dedupes() {
        let a = track(&[(0, 60, 100), (480, 64, 100)]);
        let b = track(&[(0, 48, 100), (0, 60, 300)]);
        let merged = combine_to_single_track(&[a, b]);
        let got: Vec<(i32, i32, i32)> = merged.notes.iter().map(|n| (n.start_time, n.number, n.duration)).collect();
        assert_eq!(got, vec![(0, 48, 100), (0, 60, 300), (480, 64, 100)]);
    }

    #[test]
    fn split_separates_hands() {
        let t = track(&[(0, 36, 480), (0, 72, 480), (480, 40, 480), (480, 76, 480)]);
        let parts = split_track(&t, 1920);
        let top: Vec<i32> = parts[0].notes.iter().map(|n| n.number).collect();
        let bottom: Vec<i32> = parts[1].notes.iter().map(|n| n.number).collect();
        assert_eq!(top, vec![72, 76]);
        assert_eq!(bottom, vec![36, 40]);
        assert_eq!(parts[0].number, 1);
        assert_eq!(parts[1].number, 2);
    }

    #[test]
    fn two_tracks_collect_lyrics_on_top() {
        let mut a = track(&[(0, 72, 480)]);
        a.add_lyric(Lyric { start_time: 480, channel: 0, text: "two".into() });
        let mut b = track(&[(0, 40, 480)]);
        b.add_lyric(Lyric { start_time: 0, channel: 0, text: "one".into() });
        let parts = combine_to_two_tracks(&[a, b], 1920);
        let texts: Vec<&str> = parts[0].lyrics.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert!(parts[1].lyrics.is_empty());
    }

    #[test]
    fn transpose_clamps_at_zero() {
        let mut tracks = vec![track(&[(0, 3, 10), (10, 60, 10)])];
        transpose(&mut tracks, -5);
        assert_eq!(tracks[0].notes[0].number, 0);
        assert_eq!(tracks[0].notes[1].number, 55);
        shift_time(&mut tracks, 100);
        assert_eq!(starts(&tracks[0]), vec![100, 110]);
    }
}
