//! Button edge to key/mouse translation.

use crate::event::{ButtonId, EmittedEvent, EventSink};
use crate::profile::Profile;

/// Translate one button edge through the profile's mapping tables.
///
/// Press, hold and mouse mappings are independent; every table that has an
/// entry for the button contributes.
pub fn translate_edge(profile: &Profile, id: ButtonId, pressed: bool, sink: &mut dyn EventSink) {
    if pressed {
        if let Some(&key) = profile.button_down_to_key_press.get(&id) {
            sink.emit(EmittedEvent::KeyTap(key));
        }
        if let Some(&key) = profile.button_down_to_key_down.get(&id) {
            sink.emit(EmittedEvent::KeyDown(key));
        }
        if let Some(&action) = profile.button_down_to_mouse_event.get(&id) {
            sink.emit(EmittedEvent::MouseButton(action));
        }
    } else {
        if let Some(&key) = profile.button_up_to_key_up.get(&id) {
            sink.emit(EmittedEvent::KeyUp(key));
        }
        if let Some(&key) = profile.button_up_to_key_press.get(&id) {
            sink.emit(EmittedEvent::KeyTap(key));
        }
        if let Some(&action) = profile.button_up_to_mouse_event.get(&id) {
            sink.emit(EmittedEvent::MouseButton(action));
        }
    }
}
