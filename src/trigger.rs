//! Analog trigger depth to synthetic button edges.

use crate::event::{ButtonId, ControllerSnapshot, EmittedEvent, EventSink};
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerSynthesizer {
    pub left_pressed: bool,
    pub right_pressed: bool,
}

fn edge(
    state: &mut bool,
    value: i16,
    depth: u16,
    id: ButtonId,
    sink: &mut dyn EventSink,
) {
    let pressed = i32::from(value) > i32::from(depth);
    if pressed != *state {
        *state = pressed;
        sink.emit(EmittedEvent::SyntheticButton { id, pressed });
    }
}

impl TriggerSynthesizer {
    pub fn update(&mut self, profile: &Profile, snapshot: &ControllerSnapshot, sink: &mut dyn EventSink) {
        let depth = profile.trigger_depth;
        edge(
            &mut self.left_pressed,
            snapshot.left_trigger,
            depth,
            ButtonId::TRIGGER_LEFT,
            sink,
        );
        edge(
            &mut self.right_pressed,
            snapshot.right_trigger,
            depth,
            ButtonId::TRIGGER_RIGHT,
            sink,
        );
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
