//! MIDI file encoding for playback.
//!
//! Re-serializes a decoded document's raw events as a Standard MIDI File,
//! optionally with playback options applied first: tempo, instruments,
//! transpose, track or channel muting, and a start offset (pause point).
//! Every call builds and returns a fresh buffer.

use crate::decoder::MidiFile;
use crate::model::*;
use crate::options::MidiOptions;

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// Encode `midifile` for playback with `options` applied.
pub fn encode_for_playback(midifile: &MidiFile, options: &MidiOptions) -> Vec<u8> {
    midifile.write(options)
}

impl MidiFile {
    /// Encode with playback options applied.
    pub fn write(&self, options: &MidiOptions) -> Vec<u8> {
        let events = self.apply_options_to_events(options);
        build_smf(&events, self.format, self.quarter_note)
    }

    /// Encode the decoded events unchanged.
    pub fn write_raw(&self) -> Vec<u8> {
        build_smf(&self.events, self.format, self.quarter_note)
    }

    /// A copy of the raw events with the playback options applied.
    ///
    /// Options index the note-bearing tracks in [`MidiFile::tracks`]; those
    /// are mapped back to physical tracks, or to channels when a single
    /// track was split per channel.
    pub fn apply_options_to_events(&self, options: &MidiOptions) -> Vec<Vec<RawEvent>> {
        if self.track_per_channel {
            return self.apply_options_per_channel(options);
        }

        let num_tracks = self.events.len();
        let mut instruments = vec![0u8; num_tracks];
        let mut keeptracks = vec![true; num_tracks];
        for (tracknum, track) in self.tracks.iter().enumerate() {
            let realtrack = track.number;
            if realtrack >= num_tracks {
                continue;
            }
            instruments[realtrack] = options.instruments.get(tracknum).copied().unwrap_or(track.instrument);
            if !options.track_shown(tracknum) || options.track_muted(tracknum) {
                keeptracks[realtrack] = false;
            }
        }

        let mut newevents = with_tempo_events(&self.events, options.tempo);
        for (tracknum, list) in newevents.iter_mut().enumerate() {
            for ev in list.iter_mut() {
                apply_common(ev, options);
                if !options.use_default_instruments {
                    if let EventPayload::ProgramChange { instrument } = &mut ev.payload {
                        *instrument = instruments[tracknum];
                    }
                }
            }
        }

        if options.pause_time != 0 {
            newevents = start_at_pause_time(newevents, options.pause_time);
        }

        let result: Vec<Vec<RawEvent>> = newevents
            .into_iter()
            .zip(keeptracks)
            .filter_map(|(list, keep)| keep.then_some(list))
            .collect();
        log::debug!("playback: {} of {} tracks kept", result.len(), num_tracks);
        result
    }

    /// Options for a file whose single track was split per channel: the
    /// options map to channels, and excluded channels are silenced by
    /// zeroing note velocities.
    fn apply_options_per_channel(&self, options: &MidiOptions) -> Vec<Vec<RawEvent>> {
        let mut instruments = [0u8; 16];
        let mut keepchannel = [true; 16];
        for (tracknum, track) in self.tracks.iter().enumerate() {
            let Some(first) = track.notes.first() else {
                continue;
            };
            let channel = usize::from(first.channel & 0x0F);
            instruments[channel] = options.instruments.get(tracknum).copied().unwrap_or(track.instrument);
            if !options.track_shown(tracknum) || options.track_muted(tracknum) {
                keepchannel[channel] = false;
            }
        }

        let mut newevents = with_tempo_events(&self.events, options.tempo);
        for ev in newevents.iter_mut().flatten() {
            apply_common(ev, options);
            let channel = usize::from(ev.channel & 0x0F);
            if !keepchannel[channel] {
                if let EventPayload::NoteOn { velocity, .. } | EventPayload::NoteOff { velocity, .. } =
                    &mut ev.payload
                {
                    *velocity = 0;
                }
            }
            if !options.use_default_instruments {
                if let EventPayload::ProgramChange { instrument } = &mut ev.payload {
                    *instrument = instruments[channel];
                }
            }
        }

        if options.pause_time != 0 {
            newevents = start_at_pause_time(newevents, options.pause_time);
        }
        newevents
    }
}

/// Clone the event lists, with a tempo event prepended to each track.
fn with_tempo_events(events: &[Vec<RawEvent>], tempo: i32) -> Vec<Vec<RawEvent>> {
    let tempo = tempo.max(0) as u32;
    events
        .iter()
        .map(|list| {
            let mut newlist = Vec::with_capacity(list.len() + 1);
            newlist.push(RawEvent::tempo_event(tempo));
            newlist.extend(list.iter().cloned());
            newlist
        })
        .collect()
}

/// Transpose note-bearing events (clamped to 0..=127) and force the tempo.
fn apply_common(ev: &mut RawEvent, options: &MidiOptions) {
    let shift = |number: &mut u8| {
        *number = (i32::from(*number) + options.transpose).clamp(0, 127) as u8;
    };
    match &mut ev.payload {
        EventPayload::NoteOn { number, .. }
        | EventPayload::NoteOff { number, .. }
        | EventPayload::KeyPressure { number, .. } => shift(number),
        EventPayload::Meta(MetaEvent::Tempo(tempo)) => *tempo = options.tempo.max(0) as u32,
        _ => {}
    }
}

/// Start playback at `pause_time`. Notes before it are dropped; other
/// events before it move to time zero (control changes keep only their
/// latest value). The first event after the pause gets a delta relative
/// to the pause point.
pub fn start_at_pause_time(list: Vec<Vec<RawEvent>>, pause_time: i32) -> Vec<Vec<RawEvent>> {
    list.into_iter()
        .map(|events| {
            let mut newevents: Vec<RawEvent> = Vec::with_capacity(events.len());
            let mut found_event_after_pause = false;
            for mut ev in events {
                if ev.start_time < pause_time {
                    match ev.kind() {
                        EventKind::NoteOn | EventKind::NoteOff => {}
                        EventKind::ControlChange => {
                            ev.delta_time = 0;
                            update_control_change(&mut newevents, ev);
                        }
                        _ => {
                            ev.delta_time = 0;
                            newevents.push(ev);
                        }
                    }
                } else if !found_event_after_pause {
                    ev.delta_time = (ev.start_time - pause_time) as u32;
                    newevents.push(ev);
                    found_event_after_pause = true;
                } else {
                    newevents.push(ev);
                }
            }
            newevents
        })
        .collect()
}

/// Overwrite the value of an earlier control change on the same channel and
/// controller, or append this one.
fn update_control_change(newevents: &mut Vec<RawEvent>, change: RawEvent) {
    let EventPayload::ControlChange { controller, value } = change.payload else {
        return;
    };
    let existing = newevents.iter_mut().find(|ev| {
        ev.channel == change.channel
            && matches!(ev.payload, EventPayload::ControlChange { controller: c, .. } if c == controller)
    });
    match existing {
        Some(ev) => ev.payload = EventPayload::ControlChange { controller, value },
        None => newevents.push(change),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Build the complete Standard MIDI File bytes.
pub fn build_smf(tracks: &[Vec<RawEvent>], format: u16, quarter: u16) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&quarter.to_be_bytes());

    for events in tracks {
        let data = encode_track(events);
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&data);
    }
    out
}

/// Encode one track's events, each with an explicit status byte.
fn encode_track(events: &[RawEvent]) -> Vec<u8> {
    let mut data = Vec::new();
    for ev in events {
        write_vlq(&mut data, ev.delta_time);
        data.push(ev.status());
        match &ev.payload {
            EventPayload::NoteOff { number, velocity } | EventPayload::NoteOn { number, velocity } => {
                data.extend_from_slice(&[*number, *velocity]);
            }
            EventPayload::KeyPressure { number, pressure } => data.extend_from_slice(&[*number, *pressure]),
            EventPayload::ControlChange { controller, value } => {
                data.extend_from_slice(&[*controller, *value]);
            }
            EventPayload::ProgramChange { instrument } => data.push(*instrument),
            EventPayload::ChannelPressure { pressure } => data.push(*pressure),
            EventPayload::PitchBend { value } => data.extend_from_slice(&value.to_be_bytes()),
            EventPayload::Sysex { data: bytes, .. } => {
                write_vlq(&mut data, bytes.len() as u32);
                data.extend_from_slice(bytes);
            }
            EventPayload::Meta(meta) => {
                let payload = meta.payload();
                data.push(meta.subtype());
                write_vlq(&mut data, payload.len() as u32);
                data.extend_from_slice(&payload);
            }
        }
    }
    data
}

/// Write a variable-length quantity (at most 4 bytes, 28 bits).
pub fn write_vlq(out: &mut Vec<u8>, value: u32) {
    let mut value = value & 0x0FFF_FFFF;
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 4];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteCursor;

    fn ev(start: i32, delta: u32, channel: u8, payload: EventPayload) -> RawEvent {
        RawEvent { delta_time: delta, start_time: start, channel, payload }
    }

    #[test]
    fn vlq_encoding() {
        let mut buf = Vec::new();
        write_vlq(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        write_vlq(&mut buf, 127);
        assert_eq!(buf, vec![0x7F]);

        buf.clear();
        write_vlq(&mut buf, 128);
        assert_eq!(buf, vec![0x81, 0x00]);

        buf.clear();
        write_vlq(&mut buf, 480);
        assert_eq!(buf, vec![0x83, 0x60]);

        buf.clear();
        write_vlq(&mut buf, 0x0FFF_FFFF);
        assert_eq!(buf, vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn vlq_reads_back() {
        for value in [0, 1, 127, 128, 8191, 16384, 2_097_151, 0x0FFF_FFFF] {
            let mut buf = Vec::new();
            write_vlq(&mut buf, value);
            assert_eq!(ByteCursor::new(&buf).read_varint().unwrap(), value);
        }
    }

    #[test]
    fn smf_header_valid() {
        let track = vec![ev(0, 0, 0, EventPayload::Meta(MetaEvent::Other { subtype: META_END_OF_TRACK, data: vec![] }))];
        let smf = build_smf(&[track], 1, 480);
        assert_eq!(&smf[0..4], b"MThd");
        assert_eq!(&smf[8..10], &1u16.to_be_bytes());
        assert_eq!(&smf[10..12], &1u16.to_be_bytes());
        assert_eq!(&smf[12..14], &480u16.to_be_bytes());
        assert_eq!(&smf[14..18], b"MTrk");
        assert_eq!(&smf[18..22], &4u32.to_be_bytes());
        assert_eq!(&smf[22..], &[0x00, 0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn channel_events_fold_channel_into_status() {
        let track = vec![
            ev(0, 0, 2, EventPayload::NoteOn { number: 60, velocity: 90 }),
            ev(0, 0, 2, EventPayload::PitchBend { value: 0x2000 }),
            ev(0, 0, 0, EventPayload::Meta(MetaEvent::Tempo(500_000))),
        ];
        let data = encode_track(&track);
        assert_eq!(
            data,
            vec![0x00, 0x92, 60, 90, 0x00, 0xE2, 0x20, 0x00, 0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]
        );
    }

    #[test]
    fn pause_drops_notes_and_zeroes_other_deltas() {
        let track = vec![
            ev(0, 0, 0, EventPayload::ProgramChange { instrument: 5 }),
            ev(0, 0, 0, EventPayload::ControlChange { controller: 7, value: 100 }),
            ev(0, 0, 0, EventPayload::NoteOn { number: 60, velocity: 90 }),
            ev(240, 240, 0, EventPayload::ControlChange { controller: 7, value: 50 }),
            ev(480, 240, 0, EventPayload::NoteOff { number: 60, velocity: 0 }),
            ev(600, 120, 0, EventPayload::NoteOn { number: 62, velocity: 90 }),
            ev(960, 360, 0, EventPayload::NoteOff { number: 62, velocity: 0 }),
        ];
        let out = start_at_pause_time(vec![track], 500);
        let got: Vec<(EventKind, u32)> = out[0].iter().map(|e| (e.kind(), e.delta_time)).collect();
        assert_eq!(
            got,
            vec![
                (EventKind::ProgramChange, 0),
                (EventKind::ControlChange, 0),
                (EventKind::NoteOn, 100),
                (EventKind::NoteOff, 360),
            ]
        );
        assert_eq!(out[0][1].payload, EventPayload::ControlChange { controller: 7, value: 50 });
    }
}
