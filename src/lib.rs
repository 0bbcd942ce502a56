//! midisheet: Standard MIDI File decoding and sheet music layout.
//!
//! Decodes SMF bytes into a [`MidiFile`], applies display and playback
//! options, lays the notes out as staves of notation symbols, and re-encodes
//! the file for playback.
//!
//! # Example
//! ```no_run
//! use midisheet::{parse_file, MidiOptions, SheetMusic};
//!
//! let midi = parse_file("path/to/song.mid").unwrap();
//! let options = MidiOptions::for_file(&midi);
//! let sheet = SheetMusic::new(&midi, &options).unwrap();
//! println!("Tracks: {}", midi.tracks.len());
//! println!("Staves: {}", sheet.staffs().len());
//! println!("Key: {}", sheet.main_key());
//! ```

pub mod cursor;
pub mod decoder;
pub mod error;
pub mod key_signature;
pub mod midi;
pub mod model;
pub mod options;
pub mod pitch;
pub mod sheet;
pub mod time_signature;
pub mod transform;

#[cfg(target_os = "android")]
pub mod android;

use std::path::Path;

pub use decoder::{has_midi_header, parse_midi, MidiFile};
pub use error::{MidiError, Result};
pub use key_signature::{Accid, KeySignature, KeyState};
pub use midi::encode_for_playback;
pub use model::*;
pub use options::{MidiOptions, NoteNameStyle};
pub use pitch::{Clef, WhiteNote};
pub use sheet::SheetMusic;
pub use time_signature::{NoteDuration, TimeSignature};

/// Decode a MIDI file from a file path.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<MidiFile> {
    let data = std::fs::read(path.as_ref())?;
    parse_bytes(&data)
}

/// Decode MIDI from raw bytes.
pub fn parse_bytes(data: &[u8]) -> Result<MidiFile> {
    parse_midi(data)
}

/// Convert a laid-out sheet to a JSON string.
/// Useful for passing data across FFI boundaries.
pub fn sheet_to_json(sheet: &SheetMusic) -> Result<String> {
    Ok(serde_json::to_string_pretty(sheet)?)
}

/// Decode MIDI bytes and lay them out with `options_json`, or with the
/// file's default options when it is `None`.
pub fn layout_bytes(data: &[u8], options_json: Option<&str>) -> Result<String> {
    let midi = parse_bytes(data)?;
    let options = load_options(&midi, options_json)?;
    let sheet = SheetMusic::new(&midi, &options)?;
    sheet_to_json(&sheet)
}

/// Decode MIDI bytes and re-encode them for playback with `options_json`
/// applied.
pub fn playback_bytes(data: &[u8], options_json: Option<&str>) -> Result<Vec<u8>> {
    let midi = parse_bytes(data)?;
    let options = load_options(&midi, options_json)?;
    Ok(encode_for_playback(&midi, &options))
}

/// Saved options are merged over the file's defaults, so partial JSON works.
fn load_options(midi: &MidiFile, options_json: Option<&str>) -> Result<MidiOptions> {
    let mut options = MidiOptions::for_file(midi);
    if let Some(json) = options_json {
        let saved = MidiOptions::from_json(json)?;
        options.merge(&saved);
        options.shift_time = saved.shift_time;
        options.pause_time = saved.pause_time;
        if saved.tempo != TimeSignature::DEFAULT_TEMPO {
            options.tempo = saved.tempo;
        }
    }
    Ok(options)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for iOS (static library) and Android
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Optional C string argument; null or invalid UTF-8 reads as `None`.
unsafe fn opt_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_str().ok()
    }
}

/// Lay out MIDI bytes and return the sheet as a JSON C string.
/// The caller must free the returned string with `midisheet_free_string`.
///
/// `options_json` may be null to use the file's default options.
///
/// # Safety
/// `data` must point to `len` valid bytes. `options_json` must be null or a
/// valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn midisheet_layout_bytes(
    data: *const u8,
    len: usize,
    options_json: *const c_char,
) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    let options = unsafe { opt_str(options_json) };

    match layout_bytes(bytes, options) {
        Ok(json) => CString::new(json).map_or(std::ptr::null_mut(), CString::into_raw),
        Err(e) => {
            log::warn!("layout failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Re-encode MIDI bytes for playback. Returns a buffer of `*out_len` bytes
/// that the caller must free with `midisheet_free_bytes`.
///
/// # Safety
/// `data` must point to `len` valid bytes, `out_len` must be a valid pointer,
/// and `options_json` must be null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn midisheet_playback_bytes(
    data: *const u8,
    len: usize,
    options_json: *const c_char,
    out_len: *mut usize,
) -> *mut u8 {
    if data.is_null() || len == 0 || out_len.is_null() {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    let options = unsafe { opt_str(options_json) };

    match playback_bytes(bytes, options) {
        Ok(encoded) => {
            let boxed = encoded.into_boxed_slice();
            unsafe { *out_len = boxed.len() };
            Box::into_raw(boxed).cast::<u8>()
        }
        Err(e) => {
            log::warn!("playback encoding failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by midisheet functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a midisheet function, or null.
#[no_mangle]
pub unsafe extern "C" fn midisheet_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

/// Free a buffer returned by `midisheet_playback_bytes`.
///
/// # Safety
/// `ptr` and `len` must come from a single `midisheet_playback_bytes` call,
/// or `ptr` must be null.
#[no_mangle]
pub unsafe extern "C" fn midisheet_free_bytes(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        unsafe {
            let slice = std::ptr::slice_from_raw_parts_mut(ptr, len);
            let _ = Box::from_raw(slice);
        }
    }
}
