//! JNI bindings for Android.
//!
//! These functions are called from Kotlin via the JNI bridge.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jbyteArray, jstring};
use jni::JNIEnv;

use crate::{layout_bytes, playback_bytes};

fn optional_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    if value.is_null() {
        None
    } else {
        env.get_string(value).ok().map(|s| s.into())
    }
}

/// Lay out MIDI bytes and return the sheet as JSON.
///
/// Called from Kotlin as:
///   external fun layoutBytes(data: ByteArray, optionsJson: String?): String?
#[no_mangle]
pub extern "system" fn Java_com_midisheet_app_MidiSheet_layoutBytes(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
    options_json: JString,
) -> jstring {
    let bytes = match env.convert_byte_array(&data) {
        Ok(b) => b,
        Err(_) => return std::ptr::null_mut(),
    };
    let options = optional_string(&mut env, &options_json);

    match layout_bytes(&bytes, options.as_deref()) {
        Ok(json) => match env.new_string(&json) {
            Ok(js) => js.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(e) => {
            log::warn!("layout failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Re-encode MIDI bytes for playback with the given options.
///
/// Called from Kotlin as:
///   external fun playbackBytes(data: ByteArray, optionsJson: String?): ByteArray?
#[no_mangle]
pub extern "system" fn Java_com_midisheet_app_MidiSheet_playbackBytes(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
    options_json: JString,
) -> jbyteArray {
    let bytes = match env.convert_byte_array(&data) {
        Ok(b) => b,
        Err(_) => return std::ptr::null_mut(),
    };
    let options = optional_string(&mut env, &options_json);

    match playback_bytes(&bytes, options.as_deref()) {
        Ok(encoded) => match env.byte_array_from_slice(&encoded) {
            Ok(arr) => arr.into_raw(),
            Err(_) => std::ptr::null_mut(),
        },
        Err(e) => {
            log::warn!("playback encoding failed: {e}");
            std::ptr::null_mut()
        }
    }
}
