//! Standard MIDI File decoding.
//!
//! `parse_midi` reads the MThd header, then each MTrk chunk into a list of
//! [`RawEvent`]s, and finally derives the note view ([`Track`]s), the tempo
//! and the time signature. A track that runs past the end of the buffer is
//! kept with the events read so far; every other decode error is fatal.

use crate::cursor::ByteCursor;
use crate::error::{MidiError, Result};
use crate::model::*;
use crate::time_signature::TimeSignature;

/// Bounds for `guess_measure_length`: half a second to four seconds.
const MIN_MEASURE_SECONDS_DIVISOR: i32 = 2;
const MAX_MEASURE_SECONDS: i32 = 4;

// ═══════════════════════════════════════════════════════════════════════
// Document
// ═══════════════════════════════════════════════════════════════════════

/// A decoded MIDI file. Immutable once built; transforms and the encoder
/// work on clones of its tracks and events.
#[derive(Debug, Clone)]
pub struct MidiFile {
    /// Header format: 0, 1 or 2.
    pub format: u16,
    /// Pulses per quarter note from the header.
    pub quarter_note: u16,
    /// Raw events of every physical track, including tracks without notes.
    pub events: Vec<Vec<RawEvent>>,
    /// Tracks that contain notes.
    pub tracks: Vec<Track>,
    /// True when one physical track was split into one track per channel.
    pub track_per_channel: bool,
    /// Averaged tempo and first time signature found in the file.
    pub time: TimeSignature,
    /// End time of the last sounding note.
    pub total_pulses: i32,
}

/// Decode a complete SMF byte buffer.
pub fn parse_midi(data: &[u8]) -> Result<MidiFile> {
    let mut cur = ByteCursor::new(data);

    let id = cur.read_ascii(4)?;
    if id != "MThd" {
        return Err(MidiError::format(0, "Doesn't start with MThd"));
    }
    let len = cur.read_u32()?;
    if len != 6 {
        return Err(MidiError::format(4, format!("Bad MThd header length {len}")));
    }
    let format = cur.read_u16()?;
    let num_tracks = cur.read_u16()?;
    let quarter_note = cur.read_u16()?;
    log::debug!("MIDI header: format={format} tracks={num_tracks} quarter={quarter_note}");

    let mut events = Vec::with_capacity(usize::from(num_tracks));
    let mut tracks = Vec::new();
    for tracknum in 0..usize::from(num_tracks) {
        if cur.offset() >= cur.len() {
            log::warn!("file ends before track {tracknum} of {num_tracks}");
            break;
        }
        let list = read_track(&mut cur)?;
        let track = Track::from_events(&list, tracknum);
        if !track.notes.is_empty() {
            tracks.push(track);
        }
        events.push(list);
    }

    let total_pulses = tracks.iter().map(Track::end_time).max().unwrap_or(0);

    let mut track_per_channel = false;
    if tracks.len() == 1 && tracks[0].has_multiple_channels() {
        let origin = tracks[0].number;
        log::debug!("splitting track {origin} into one track per channel");
        tracks = split_channels(&tracks[0], &events[origin]);
        track_per_channel = true;
    }

    check_start_times(&tracks)?;

    let time = file_time_signature(&events, i32::from(quarter_note))?;

    Ok(MidiFile { format, quarter_note, events, tracks, track_per_channel, time, total_pulses })
}

/// Averages every tempo event and takes the first usable time signature
/// event, falling back to 4/4.
fn file_time_signature(events: &[Vec<RawEvent>], quarter: i32) -> Result<TimeSignature> {
    let mut tempo_sum: i64 = 0;
    let mut tempo_count: i64 = 0;
    let mut meter: Option<(i32, i32)> = None;
    for ev in events.iter().flatten() {
        match &ev.payload {
            EventPayload::Meta(MetaEvent::Tempo(t)) => {
                tempo_sum += i64::from(*t);
                tempo_count += 1;
            }
            EventPayload::Meta(MetaEvent::TimeSignature { numerator, denominator_log2, .. })
                if meter.is_none() && *numerator != 0 =>
            {
                let numerator = i32::from(*numerator);
                let denominator = 1i32.checked_shl(u32::from(*denominator_log2)).unwrap_or(0);
                match TimeSignature::new(numerator, denominator, quarter, TimeSignature::DEFAULT_TEMPO) {
                    Ok(_) => meter = Some((numerator, denominator)),
                    Err(e) => log::warn!("skipping time signature at pulse {}: {e}", ev.start_time),
                }
            }
            _ => {}
        }
    }
    let tempo = if tempo_sum == 0 {
        TimeSignature::DEFAULT_TEMPO
    } else {
        (tempo_sum / tempo_count) as i32
    };
    let (numerator, denominator) = meter.unwrap_or((4, 4));
    TimeSignature::new(numerator, denominator, quarter, tempo)
}

// ═══════════════════════════════════════════════════════════════════════
// Track chunks
// ═══════════════════════════════════════════════════════════════════════

/// Read one MTrk chunk. Truncation ends the track early with what was read.
fn read_track(cur: &mut ByteCursor<'_>) -> Result<Vec<RawEvent>> {
    let header_offset = cur.offset();
    let id = cur.read_ascii(4)?;
    if id != "MTrk" {
        return Err(MidiError::format(header_offset, "Bad MTrk header"));
    }
    let tracklen = cur.read_u32()? as usize;
    let trackend = cur.offset().saturating_add(tracklen);

    let mut result = Vec::with_capacity(20);
    let mut start_time: i32 = 0;
    let mut status: u8 = 0;

    while cur.offset() < trackend {
        match read_event(cur, &mut start_time, &mut status) {
            Ok(ev) => {
                log::trace!("offset {} event {:?}", cur.offset(), ev.payload);
                result.push(ev);
            }
            Err(err) if err.is_recoverable() => {
                log::warn!("track truncated ({err}); keeping {} events", result.len());
                return Ok(result);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(result)
}

/// Read one event, honouring running status.
fn read_event(cur: &mut ByteCursor<'_>, start_time: &mut i32, status: &mut u8) -> Result<RawEvent> {
    let delta_time = cur.read_varint()?;
    let time = start_time.saturating_add(delta_time as i32);
    if cur.peek()? & 0x80 != 0 {
        *status = cur.read_byte()?;
    }
    let status_offset = cur.offset().saturating_sub(1);
    let flag = *status;
    let channel = flag & 0x0F;

    let (channel, payload) = match flag & 0xF0 {
        EVENT_NOTE_OFF => {
            let (number, velocity) = (cur.read_byte()?, cur.read_byte()?);
            (channel, EventPayload::NoteOff { number, velocity })
        }
        EVENT_NOTE_ON => {
            let (number, velocity) = (cur.read_byte()?, cur.read_byte()?);
            (channel, EventPayload::NoteOn { number, velocity })
        }
        EVENT_KEY_PRESSURE => {
            let (number, pressure) = (cur.read_byte()?, cur.read_byte()?);
            (channel, EventPayload::KeyPressure { number, pressure })
        }
        EVENT_CONTROL_CHANGE => {
            let (controller, value) = (cur.read_byte()?, cur.read_byte()?);
            (channel, EventPayload::ControlChange { controller, value })
        }
        EVENT_PROGRAM_CHANGE => (channel, EventPayload::ProgramChange { instrument: cur.read_byte()? }),
        EVENT_CHANNEL_PRESSURE => (channel, EventPayload::ChannelPressure { pressure: cur.read_byte()? }),
        EVENT_PITCH_BEND => (channel, EventPayload::PitchBend { value: cur.read_u16()? }),
        _ => match flag {
            SYSEX_EVENT_1 | SYSEX_EVENT_2 => {
                let len = cur.read_varint()? as usize;
                let data = cur.read_bytes(len)?.to_vec();
                (0, EventPayload::Sysex { status: flag, data })
            }
            META_EVENT => (0, EventPayload::Meta(read_meta(cur)?)),
            _ => return Err(MidiError::UnknownEvent { offset: status_offset, status: flag }),
        },
    };

    *start_time = time;
    Ok(RawEvent { delta_time, start_time: time, channel, payload })
}

fn read_meta(cur: &mut ByteCursor<'_>) -> Result<MetaEvent> {
    let subtype = cur.read_byte()?;
    let len = cur.read_varint()? as usize;
    let data = cur.read_bytes(len)?;
    match subtype {
        META_TEMPO => {
            if len != 3 {
                return Err(MidiError::MalformedMetaEvent {
                    offset: cur.offset(),
                    message: format!("Meta Event Tempo len == {len} != 3"),
                });
            }
            let tempo = (u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2]);
            Ok(MetaEvent::Tempo(tempo))
        }
        META_TIME_SIGNATURE => {
            if len < 2 {
                return Err(MidiError::MalformedMetaEvent {
                    offset: cur.offset(),
                    message: format!("Meta Event Time Signature len == {len} != 4"),
                });
            }
            Ok(MetaEvent::TimeSignature {
                numerator: data[0],
                denominator_log2: data[1],
                extra: data[2..].to_vec(),
            })
        }
        _ => Ok(MetaEvent::Other { subtype, data: data.to_vec() }),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Track post-processing
// ═══════════════════════════════════════════════════════════════════════

/// Split a multi-channel track into one track per channel, in order of
/// first appearance. Instruments come from program changes; channel 9 is
/// always percussion.
pub fn split_channels(origtrack: &Track, events: &[RawEvent]) -> Vec<Track> {
    let mut channel_instruments = [0u8; 16];
    for ev in events {
        if let EventPayload::ProgramChange { instrument } = ev.payload {
            channel_instruments[usize::from(ev.channel & 0x0F)] = instrument;
        }
    }
    channel_instruments[usize::from(PERCUSSION_CHANNEL)] = PERCUSSION_INSTRUMENT;

    let mut result: Vec<Track> = Vec::new();
    for note in &origtrack.notes {
        match result.iter_mut().find(|t| t.notes[0].channel == note.channel) {
            Some(track) => track.add_note(*note),
            None => {
                let mut track = Track::new(result.len() + 1);
                track.add_note(*note);
                track.instrument = channel_instruments[usize::from(note.channel & 0x0F)];
                result.push(track);
            }
        }
    }
    for lyric in &origtrack.lyrics {
        if let Some(track) = result.iter_mut().find(|t| t.notes[0].channel == lyric.channel) {
            track.add_lyric(lyric.clone());
        }
    }
    result
}

/// Notes must be in start-time order within every track.
pub(crate) fn check_start_times(tracks: &[Track]) -> Result<()> {
    for track in tracks {
        let mut prevtime = -1;
        for note in &track.notes {
            if note.start_time < prevtime {
                return Err(MidiError::format(0, "Internal parsing error: notes out of order"));
            }
            prevtime = note.start_time;
        }
    }
    Ok(())
}

/// True if `data` begins with the MThd magic.
pub fn has_midi_header(data: &[u8]) -> bool {
    data.starts_with(b"MThd")
}

impl MidiFile {
    /// Start time of the last note in any track.
    pub fn end_time(&self) -> i32 {
        self.tracks
            .iter()
            .filter_map(|t| t.notes.last())
            .map(|n| n.start_time)
            .max()
            .unwrap_or(0)
    }

    pub fn has_lyrics(&self) -> bool {
        self.tracks.iter().any(|t| !t.lyrics.is_empty())
    }

    /// Candidate measure lengths: note onsets, measured from the first note
    /// and rounded down to a multiple of 4 pulses, between 0.5 s and 4 s.
    pub fn guess_measure_length(&self) -> Vec<i32> {
        let time = &self.time;
        let mut result = Vec::new();
        if time.tempo() <= 0 {
            return result;
        }
        let pulses_per_second = (1_000_000.0 / f64::from(time.tempo()) * f64::from(time.quarter())) as i32;
        let minmeasure = pulses_per_second / MIN_MEASURE_SECONDS_DIVISOR;
        let maxmeasure = pulses_per_second * MAX_MEASURE_SECONDS;

        let firstnote = self
            .tracks
            .iter()
            .filter_map(|t| t.notes.first())
            .map(|n| n.start_time)
            .fold(time.measure() * 5, i32::min);

        // 0.06 seconds in pulses
        let interval = (i64::from(time.quarter()) * 60_000 / i64::from(time.tempo())) as i32;

        for track in &self.tracks {
            let mut prevtime = 0;
            for note in &track.notes {
                if note.start_time - prevtime <= interval {
                    continue;
                }
                prevtime = note.start_time;
                let from_first = (note.start_time - firstnote) / 4 * 4;
                if from_first < minmeasure {
                    continue;
                }
                if from_first > maxmeasure {
                    break;
                }
                if !result.contains(&from_first) {
                    result.push(from_first);
                }
            }
        }
        result.sort_unstable();
        result
    }
}

impl std::fmt::Display for MidiFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Midi File tracks={} quarter={}", self.tracks.len(), self.quarter_note)?;
        writeln!(f, "{}", self.time)?;
        for track in &self.tracks {
            writeln!(
                f,
                "Track number={} instrument={} notes={}",
                track.number,
                track.instrument_name(),
                track.notes.len()
            )?;
        }
        Ok(())
    }
}
