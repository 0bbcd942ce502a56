//! Option handling and the note transforms applied before layout.

mod common;

use common::{melody, single_track, smf, TrackBuilder};
use midisheet::{parse_bytes, MidiFile, MidiOptions, NoteNameStyle};
use pretty_assertions::assert_eq;

fn two_tracks() -> MidiFile {
    let upper = melody(&[72, 74, 76, 77], 480).end();
    let lower = melody(&[48, 50], 960).end();
    parse_bytes(&smf(1, 480, &[upper, lower])).unwrap()
}

fn numbers(midi: &MidiFile, options: &MidiOptions) -> Vec<Vec<i32>> {
    midi.change_midi_notes(options)
        .iter()
        .map(|t| t.notes.iter().map(|n| n.number).collect())
        .collect()
}

#[test]
fn defaults_for_a_file() {
    let midi = two_tracks();
    let options = MidiOptions::for_file(&midi);
    assert_eq!(options.tracks, vec![true, true]);
    assert_eq!(options.mute, vec![false, false]);
    assert!(!options.two_staffs);
    assert_eq!(options.tempo, 500_000);
    assert_eq!(options.key, None);
    assert_eq!(options.combine_interval, 40);
    assert_eq!(options.last_measure, 0);
}

#[test]
fn percussion_starts_hidden_and_muted() {
    let drums = TrackBuilder::new().note(0, 9, 38, 480).end();
    let piano = TrackBuilder::new().note(0, 0, 60, 480).end();
    let midi = parse_bytes(&smf(1, 480, &[drums, piano])).unwrap();
    let options = MidiOptions::for_file(&midi);
    assert_eq!(options.tracks, vec![false, true]);
    assert_eq!(options.mute, vec![true, false]);
}

#[test]
fn hidden_tracks_are_dropped() {
    let midi = two_tracks();
    let mut options = MidiOptions::for_file(&midi);
    options.tracks = vec![false, true];
    assert_eq!(numbers(&midi, &options), vec![vec![48, 50]]);
}

#[test]
fn transpose_and_shift() {
    let midi = two_tracks();
    let mut options = MidiOptions::for_file(&midi);
    options.transpose = -12;
    options.shift_time = 240;
    let tracks = midi.change_midi_notes(&options);
    assert_eq!(tracks[1].notes.iter().map(|n| n.number).collect::<Vec<_>>(), vec![36, 38]);
    assert_eq!(tracks[0].notes.iter().map(|n| n.start_time).collect::<Vec<_>>(), vec![240, 720, 1200, 1680]);
    // The document itself is untouched.
    assert_eq!(midi.tracks[1].notes[0].number, 48);
}

#[test]
fn close_onsets_share_a_start_time() {
    let upper = TrackBuilder::new().note(0, 0, 72, 480).end();
    let lower = TrackBuilder::new().note(20, 0, 48, 460).end();
    let midi = parse_bytes(&smf(1, 480, &[upper, lower])).unwrap();
    let options = MidiOptions::for_file(&midi);
    let tracks = midi.change_midi_notes(&options);
    assert_eq!(tracks[1].notes[0].start_time, 0);
}

#[test]
fn two_staffs_split_by_register() {
    let track = TrackBuilder::new()
        .note_on(0, 0, 36, 100)
        .note_on(0, 0, 72, 100)
        .note_off(480, 0, 36)
        .note_off(0, 0, 72)
        .note_on(0, 0, 40, 100)
        .note_on(0, 0, 76, 100)
        .note_off(480, 0, 40)
        .note_off(0, 0, 76);
    let midi = parse_bytes(&single_track(track)).unwrap();
    let options = MidiOptions::for_file(&midi);
    assert!(options.two_staffs);
    assert_eq!(numbers(&midi, &options), vec![vec![72, 76], vec![36, 40]]);
}

#[test]
fn saved_options_merge_over_defaults() {
    let midi = two_tracks();
    let mut options = MidiOptions::for_file(&midi);
    let saved = MidiOptions::from_json(
        r#"{"tracks": [true, false, true], "transpose": 3, "showNoteLetters": "FixedDoReMi", "scrollVert": true}"#,
    )
    .unwrap();
    options.merge(&saved);
    // Wrong length: the file's own track list is kept.
    assert_eq!(options.tracks, vec![true, true]);
    assert_eq!(options.transpose, 3);
    assert_eq!(options.show_note_letters, NoteNameStyle::FixedDoReMi);
    assert!(options.scroll_vert);

    let json = options.to_json().unwrap();
    assert_eq!(MidiOptions::from_json(&json).unwrap(), options);
}
