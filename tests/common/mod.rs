//! In-memory Standard MIDI File builder shared by the integration tests.

#![allow(dead_code)]

pub fn vlq(out: &mut Vec<u8>, mut value: u32) {
    let mut buf = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        buf.push(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    buf.reverse();
    out.extend_from_slice(&buf);
}

/// Event bytes of one MTrk chunk. Every method takes the delta time from
/// the previous event.
#[derive(Default, Clone)]
pub struct TrackBuilder {
    data: Vec<u8>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, delta: u32, bytes: &[u8]) -> Self {
        vlq(&mut self.data, delta);
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn note_on(self, delta: u32, channel: u8, number: u8, velocity: u8) -> Self {
        self.raw(delta, &[0x90 | channel, number, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, number: u8) -> Self {
        self.raw(delta, &[0x80 | channel, number, 0])
    }

    /// A note-on `delta` after the previous event, closed `duration` later.
    pub fn note(self, delta: u32, channel: u8, number: u8, duration: u32) -> Self {
        self.note_on(delta, channel, number, 100).note_off(duration, channel, number)
    }

    pub fn program(self, delta: u32, channel: u8, instrument: u8) -> Self {
        self.raw(delta, &[0xC0 | channel, instrument])
    }

    pub fn control(self, delta: u32, channel: u8, controller: u8, value: u8) -> Self {
        self.raw(delta, &[0xB0 | channel, controller, value])
    }

    pub fn meta(self, delta: u32, subtype: u8, payload: &[u8]) -> Self {
        let mut bytes = vec![0xFF, subtype];
        vlq(&mut bytes, payload.len() as u32);
        bytes.extend_from_slice(payload);
        self.raw(delta, &bytes)
    }

    pub fn tempo(self, delta: u32, tempo: u32) -> Self {
        let b = tempo.to_be_bytes();
        self.meta(delta, 0x51, &b[1..])
    }

    pub fn time_signature(self, delta: u32, numerator: u8, denominator_log2: u8) -> Self {
        self.meta(delta, 0x58, &[numerator, denominator_log2, 24, 8])
    }

    pub fn lyric(self, delta: u32, text: &str) -> Self {
        self.meta(delta, 0x05, text.as_bytes())
    }

    pub fn end(self) -> Self {
        self.meta(0, 0x2F, &[])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The MTrk chunk, with its length header.
    pub fn chunk(&self) -> Vec<u8> {
        let mut out = b"MTrk".to_vec();
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

pub fn header(format: u16, num_tracks: u16, quarter: u16) -> Vec<u8> {
    let mut out = b"MThd".to_vec();
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&num_tracks.to_be_bytes());
    out.extend_from_slice(&quarter.to_be_bytes());
    out
}

pub fn smf(format: u16, quarter: u16, tracks: &[TrackBuilder]) -> Vec<u8> {
    let mut out = header(format, tracks.len() as u16, quarter);
    for track in tracks {
        out.extend(track.chunk());
    }
    out
}

/// A single-track file at 480 pulses per quarter.
pub fn single_track(track: TrackBuilder) -> Vec<u8> {
    smf(0, 480, &[track.end()])
}

/// Consecutive notes on channel 0, each `duration` long, back to back.
pub fn melody(numbers: &[u8], duration: u32) -> TrackBuilder {
    numbers.iter().fold(TrackBuilder::new(), |t, &n| t.note(0, 0, n, duration))
}
