//! Stick deflection to movement key cadence.
//!
//! Each axis integrates its duty cycle into an accumulator. Whenever the
//! accumulator reaches ±1 a whole unit is carried out and the matching
//! direction key is held for that cycle; the first cycle that does not carry
//! releases it. Half deflection therefore taps every other cycle, full
//! deflection holds the key down.

use crate::event::{ControllerSnapshot, EmittedEvent, EventSink, KeyCode};
use crate::profile::{LookStick, Profile, StickKeys};

/// Normalised deflection beyond `min_axis`, saturating at `max_axis`.
pub fn duty_cycle(value: i16, min_axis: u16, max_axis: u16) -> f32 {
    let span = f32::from(max_axis) - f32::from(min_axis);
    let excess = (i32::from(value).abs() - i32::from(min_axis)).max(0);
    (excess as f32 / span).min(1.0)
}

fn direction(value: i16) -> f32 {
    if value > 0 {
        1.0
    } else {
        -1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisAccumulator {
    pub acc: f32,
    pub negative_held: bool,
    pub positive_held: bool,
}

impl AxisAccumulator {
    fn update(
        &mut self,
        value: i16,
        profile: &Profile,
        negative_key: KeyCode,
        positive_key: KeyCode,
        sink: &mut dyn EventSink,
    ) {
        let duty = duty_cycle(
            value,
            profile.move_speed_min_axis_value,
            profile.move_speed_max_axis_value,
        );
        if duty >= profile.move_speed_duty_cycle_min {
            self.acc += duty * direction(value);
        }

        if self.acc <= -1.0 {
            self.acc += 1.0;
            if !self.negative_held {
                sink.emit(EmittedEvent::KeyDown(negative_key));
                self.negative_held = true;
            }
        } else if self.negative_held {
            sink.emit(EmittedEvent::KeyUp(negative_key));
            self.negative_held = false;
        }

        if self.acc >= 1.0 {
            self.acc -= 1.0;
            if !self.positive_held {
                sink.emit(EmittedEvent::KeyDown(positive_key));
                self.positive_held = true;
            }
        } else if self.positive_held {
            sink.emit(EmittedEvent::KeyUp(positive_key));
            self.positive_held = false;
        }
    }

    fn release(&mut self, negative_key: KeyCode, positive_key: KeyCode, sink: &mut dyn EventSink) {
        if self.negative_held {
            sink.emit(EmittedEvent::KeyUp(negative_key));
        }
        if self.positive_held {
            sink.emit(EmittedEvent::KeyUp(positive_key));
        }
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickAccumulator {
    pub x: AxisAccumulator,
    pub y: AxisAccumulator,
}

impl StickAccumulator {
    fn update(&mut self, x: i16, y: i16, profile: &Profile, keys: &StickKeys, sink: &mut dyn EventSink) {
        self.x.update(x, profile, keys.left, keys.right, sink);
        self.y.update(y, profile, keys.up, keys.down, sink);
    }

    fn release(&mut self, keys: &StickKeys, sink: &mut dyn EventSink) {
        self.x.release(keys.left, keys.right, sink);
        self.y.release(keys.up, keys.down, sink);
    }
}

/// Movement emulation for whichever sticks are not claimed for look.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionTranslator {
    pub left: StickAccumulator,
    pub right: StickAccumulator,
}

impl MotionTranslator {
    pub fn update(&mut self, profile: &Profile, snapshot: &ControllerSnapshot, sink: &mut dyn EventSink) {
        if profile.look_stick != LookStick::Left {
            self.left.update(
                snapshot.left_x,
                snapshot.left_y,
                profile,
                &profile.left_stick_keys,
                sink,
            );
        }
        if profile.look_stick != LookStick::Right {
            self.right.update(
                snapshot.right_x,
                snapshot.right_y,
                profile,
                &profile.right_stick_keys,
                sink,
            );
        }
    }

    /// Release every held direction key and zero all accumulators.
    pub fn reset(&mut self, profile: &Profile, sink: &mut dyn EventSink) {
        self.left.release(&profile.left_stick_keys, sink);
        self.right.release(&profile.right_stick_keys, sink);
    }
}
