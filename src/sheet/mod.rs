//! Sheet-music layout.
//!
//! [`SheetMusic::new`] turns a decoded [`MidiFile`] and a set of
//! [`MidiOptions`] into staves of positioned symbols:
//!
//! 1. apply the note transforms and pick the key and time signature,
//! 2. group notes into chords and add bars, rests and clef changes,
//! 3. pad every track so symbols at the same pulse line up vertically,
//! 4. cut each track into staves, justify them, and beam short chords,
//! 5. hang lyrics below the staves and size each staff.
//!
//! Nothing is drawn here; the result is plain data for a renderer.

pub mod beams;
pub mod chord;
pub mod clefs;
pub mod constants;
pub mod staff;
pub mod stem;
pub mod symbols;
pub mod widths;

use serde::Serialize;

use crate::decoder::MidiFile;
use crate::error::Result;
use crate::key_signature::KeySignature;
use crate::model::{Note, Track};
use crate::options::{MidiOptions, NoteNameStyle};
use crate::time_signature::{NoteDuration, TimeSignature};

use self::chord::ChordSymbol;
use self::clefs::ClefMeasures;
use self::constants::{LEFT_MARGIN, NOTE_WIDTH};
use self::staff::Staff;
use self::symbols::{BarSymbol, BlankSymbol, ClefSymbol, LyricSymbol, MusicSymbol, RestSymbol, TimeSigSymbol};
use self::widths::SymbolWidths;

/// A laid-out score: staves of every shown track, interleaved so the
/// first staff of each track comes before the second staff of any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMusic {
    staffs: Vec<Staff>,
    mainkey: KeySignature,
    time: TimeSignature,
    num_tracks: usize,
    show_note_letters: NoteNameStyle,
    scroll_vert: bool,
}

impl SheetMusic {
    pub fn new(file: &MidiFile, options: &MidiOptions) -> Result<Self> {
        let tracks = file.change_midi_notes(options);
        let time = options.time.unwrap_or(file.time);
        let mainkey = match options.key {
            Some(notescale) => KeySignature::from_notescale(notescale)?,
            None => guess_key(&tracks),
        };
        let num_tracks = tracks.len();
        let last_start = file.end_time() + options.shift_time;

        let mut allsymbols = Vec::with_capacity(num_tracks);
        for track in &tracks {
            let clefs = ClefMeasures::new(&track.notes, time.measure());
            let chords = create_chords(&track.notes, &mainkey, &time, &clefs, options.show_note_letters)?;
            allsymbols.push(create_symbols(chords, &clefs, &time, last_start));
        }

        let lyrics = if options.show_lyrics { get_lyrics(&tracks) } else { None };

        let widths = SymbolWidths::new(&allsymbols, lyrics.as_deref());
        align_symbols(&mut allsymbols, &widths, options.show_measures);

        let keysig_width = staff::key_signature_width(&mainkey);
        let ranges: Vec<_> = allsymbols
            .iter()
            .map(|symbols| staff::staff_ranges(symbols, time.measure(), keysig_width, options.scroll_vert))
            .collect();
        if options.scroll_vert {
            for (symbols, track_ranges) in allsymbols.iter_mut().zip(&ranges) {
                for range in track_ranges {
                    staff::full_justify(&mut symbols[range.clone()], keysig_width);
                }
            }
        }
        beams::create_all_beamed_chords(&mut allsymbols, &time);

        let mut trackstaffs: Vec<Vec<Staff>> = Vec::with_capacity(num_tracks);
        for (tracknum, (symbols, track_ranges)) in allsymbols.into_iter().zip(&ranges).enumerate() {
            let mut rest = symbols.into_iter();
            let mut list: Vec<Staff> = track_ranges
                .iter()
                .map(|range| {
                    let staff_symbols: Vec<MusicSymbol> = rest.by_ref().take(range.len()).collect();
                    Staff::new(
                        staff_symbols,
                        &mainkey,
                        tracknum,
                        num_tracks,
                        options.scroll_vert,
                        options.show_measures,
                        time.measure(),
                    )
                })
                .collect();
            // A staff ends where the next one of its track begins.
            for i in 1..list.len() {
                let next_start = list[i].start_time();
                list[i - 1].set_end_time(next_start);
            }
            trackstaffs.push(list);
        }

        let mut staffs = interleave(trackstaffs);
        if let Some(lyrics) = &lyrics {
            for staff in &mut staffs {
                if let Some(tracklyrics) = lyrics.get(staff.track()) {
                    staff.add_lyrics(tracklyrics);
                }
            }
        }
        for staff in &mut staffs {
            staff.calculate_height();
        }
        log::debug!("laid out {} tracks on {} staves, key {mainkey}, {time}", num_tracks, staffs.len());

        Ok(SheetMusic {
            staffs,
            mainkey,
            time,
            num_tracks,
            show_note_letters: options.show_note_letters,
            scroll_vert: options.scroll_vert,
        })
    }

    pub fn staffs(&self) -> &[Staff] {
        &self.staffs
    }

    pub fn main_key(&self) -> KeySignature {
        self.mainkey
    }

    pub fn time(&self) -> TimeSignature {
        self.time
    }

    pub fn num_tracks(&self) -> usize {
        self.num_tracks
    }

    pub fn show_note_letters(&self) -> NoteNameStyle {
        self.show_note_letters
    }

    /// Width of the widest staff and the summed staff heights, in pixels.
    pub fn size(&self) -> (i32, i32) {
        let width = self.staffs.iter().map(Staff::width).max().unwrap_or(0) + 2;
        let height = self.staffs.iter().map(Staff::height).sum::<i32>() + LEFT_MARGIN;
        (width, height)
    }

    /// Pulse time under the point `(x, y)`, or `None` below the last staff.
    pub fn pulse_time_for_point(&self, x: i32, y: i32) -> Option<i32> {
        let mut top = 0;
        for staff in &self.staffs {
            if y >= top && y <= top + staff.height() {
                return Some(staff.pulse_time_for_point(x));
            }
            top += staff.height();
        }
        None
    }

    /// The first chord at or after `pulse`, searching staves in order.
    pub fn current_note(&self, pulse: i32) -> Option<&ChordSymbol> {
        self.staffs.iter().find_map(|s| s.current_note(pulse))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for SheetMusic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SheetMusic staffs={}", self.staffs.len())?;
        for staff in &self.staffs {
            writeln!(
                f,
                "  Staff track={} clef={:?} start={} end={} width={} height={} symbols={}",
                staff.track(),
                staff.clef(),
                staff.start_time(),
                staff.end_time(),
                staff.width(),
                staff.height(),
                staff.symbols().len()
            )?;
        }
        Ok(())
    }
}

fn guess_key(tracks: &[Track]) -> KeySignature {
    let notenums: Vec<i32> = tracks.iter().flat_map(|t| t.notes.iter().map(|n| n.number)).collect();
    KeySignature::guess(&notenums)
}

/// One chord per distinct start time. Each track gets its own accidental
/// state.
fn create_chords(
    notes: &[Note],
    key: &KeySignature,
    time: &TimeSignature,
    clefs: &ClefMeasures,
    names: NoteNameStyle,
) -> Result<Vec<ChordSymbol>> {
    let mut state = key.state();
    let mut chords = Vec::new();
    let mut i = 0;
    while i < notes.len() {
        let start = notes[i].start_time;
        let len = notes[i..].iter().take_while(|n| n.start_time == start).count();
        let clef = clefs.get_clef(start);
        chords.push(ChordSymbol::new(&notes[i..i + len], &mut state, time, clef, names)?);
        i += len;
    }
    Ok(chords)
}

fn create_symbols(
    chords: Vec<ChordSymbol>,
    clefs: &ClefMeasures,
    time: &TimeSignature,
    last_start: i32,
) -> Vec<MusicSymbol> {
    let symbols = add_bars(chords, time, last_start);
    let symbols = add_rests(symbols, time);
    add_clef_changes(symbols, clefs)
}

/// The time signature, then chords with a bar at every measure start, up
/// to the last note of the piece, and a closing bar.
fn add_bars(chords: Vec<ChordSymbol>, time: &TimeSignature, last_start: i32) -> Vec<MusicSymbol> {
    let measure = time.measure().max(1);
    let mut symbols = vec![MusicSymbol::TimeSig(TimeSigSymbol::new(time.numerator(), time.denominator()))];
    let mut measuretime = 0;
    let mut chords = chords.into_iter().peekable();
    while let Some(chord) = chords.peek() {
        if measuretime <= chord.start_time() {
            symbols.push(MusicSymbol::Bar(BarSymbol::new(measuretime)));
            measuretime += measure;
        } else if let Some(chord) = chords.next() {
            symbols.push(MusicSymbol::Chord(chord));
        }
    }
    while measuretime < last_start {
        symbols.push(MusicSymbol::Bar(BarSymbol::new(measuretime)));
        measuretime += measure;
    }
    symbols.push(MusicSymbol::Bar(BarSymbol::new(measuretime)));
    symbols
}

/// Fill the silence before each symbol with rests.
fn add_rests(symbols: Vec<MusicSymbol>, time: &TimeSignature) -> Vec<MusicSymbol> {
    let mut prevtime = 0;
    let mut result = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let starttime = symbol.start_time();
        result.extend(get_rests(time, prevtime, starttime).into_iter().map(MusicSymbol::Rest));
        prevtime = match &symbol {
            MusicSymbol::Chord(chord) => prevtime.max(chord.end_time()),
            _ => prevtime.max(starttime),
        };
        result.push(symbol);
    }
    result
}

/// Rests covering `start..end`. Dotted spans become two rests; spans
/// shorter than an eighth get none.
pub fn get_rests(time: &TimeSignature, start: i32, end: i32) -> Vec<RestSymbol> {
    if end < start {
        return Vec::new();
    }
    let quarter = time.quarter();
    match time.note_duration(end - start) {
        dur @ (NoteDuration::Whole | NoteDuration::Half | NoteDuration::Quarter | NoteDuration::Eighth) => {
            vec![RestSymbol::new(start, dur)]
        }
        NoteDuration::DottedHalf => vec![
            RestSymbol::new(start, NoteDuration::Half),
            RestSymbol::new(start + quarter * 2, NoteDuration::Quarter),
        ],
        NoteDuration::DottedQuarter => vec![
            RestSymbol::new(start, NoteDuration::Quarter),
            RestSymbol::new(start + quarter, NoteDuration::Eighth),
        ],
        NoteDuration::DottedEighth => vec![
            RestSymbol::new(start, NoteDuration::Eighth),
            RestSymbol::new(start + quarter / 2, NoteDuration::Sixteenth),
        ],
        NoteDuration::Triplet | NoteDuration::Sixteenth | NoteDuration::ThirtySecond => Vec::new(),
    }
}

/// A small clef just before every bar where the clef changes. The clef at
/// the start of each staff is added by the staff itself.
fn add_clef_changes(symbols: Vec<MusicSymbol>, clefs: &ClefMeasures) -> Vec<MusicSymbol> {
    let mut result = Vec::with_capacity(symbols.len());
    let mut prevclef = clefs.get_clef(0);
    for symbol in symbols {
        if let MusicSymbol::Bar(bar) = &symbol {
            let clef = clefs.get_clef(bar.start_time);
            if clef != prevclef {
                result.push(MusicSymbol::Clef(ClefSymbol::new(clef, bar.start_time - 1, true)));
            }
            prevclef = clef;
        }
        result.push(symbol);
    }
    result
}

/// Give every track a symbol at every start time (blank if need be), then
/// widen the first symbol at each start time to the widest track's width.
/// Bars are left as they are, apart from room for measure numbers.
fn align_symbols(allsymbols: &mut [Vec<MusicSymbol>], widths: &SymbolWidths, show_measures: bool) {
    for (track, slot) in allsymbols.iter_mut().enumerate() {
        let symbols = std::mem::take(slot);
        let mut result: Vec<MusicSymbol> = Vec::with_capacity(symbols.len());
        let mut iter = symbols.into_iter().peekable();

        for &start in widths.start_times() {
            while let Some(bar) = iter.next_if(|s| s.is_bar() && s.start_time() <= start) {
                result.push(bar);
            }
            if iter.peek().is_some_and(|s| s.start_time() == start) {
                while let Some(symbol) = iter.next_if(|s| s.start_time() == start) {
                    result.push(symbol);
                }
            } else {
                result.push(MusicSymbol::Blank(BlankSymbol::new(start, 0)));
            }
        }
        // Closing bars lie past the last start time.
        result.extend(iter);

        let mut i = 0;
        while i < result.len() {
            if result[i].is_bar() {
                if show_measures {
                    let width = result[i].width();
                    result[i].set_width(width + NOTE_WIDTH);
                }
                i += 1;
                continue;
            }
            let start = result[i].start_time();
            let width = result[i].width() + widths.extra_width(track, start);
            result[i].set_width(width);
            while i < result.len() && result[i].start_time() == start {
                i += 1;
            }
        }
        *slot = result;
    }
}

fn get_lyrics(tracks: &[Track]) -> Option<Vec<Vec<LyricSymbol>>> {
    if tracks.iter().all(|t| t.lyrics.is_empty()) {
        return None;
    }
    Some(
        tracks
            .iter()
            .map(|t| t.lyrics.iter().map(|l| LyricSymbol::new(l.start_time, l.text.clone())).collect())
            .collect(),
    )
}

fn interleave(trackstaffs: Vec<Vec<Staff>>) -> Vec<Staff> {
    let maxstaffs = trackstaffs.iter().map(Vec::len).max().unwrap_or(0);
    let total = trackstaffs.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = trackstaffs.into_iter().map(Vec::into_iter).collect();
    let mut result = Vec::with_capacity(total);
    for _ in 0..maxstaffs {
        for iter in &mut iters {
            result.extend(iter.next());
        }
    }
    result
}
