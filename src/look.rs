//! Stick deflection to relative mouse motion with sub-pixel carry.

use crate::event::{ControllerSnapshot, EmittedEvent, EventSink};
use crate::motion::duty_cycle;
use crate::profile::{LookStick, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookTranslator {
    pub acc_x: f64,
    pub acc_y: f64,
}

/// Pixels per second for a given deflection, signed by direction.
fn speed(value: i16, duty: f32, min_speed: f32, max_speed: f32) -> f64 {
    let magnitude = f64::from(min_speed) + f64::from(duty) * f64::from(max_speed - min_speed);
    if value > 0 {
        magnitude
    } else {
        -magnitude
    }
}

impl LookTranslator {
    /// Advance by `dt` seconds. Whole pixels are emitted, the fraction is
    /// kept for the next cycle.
    pub fn update(
        &mut self,
        profile: &Profile,
        snapshot: &ControllerSnapshot,
        dt: f32,
        sink: &mut dyn EventSink,
    ) {
        let (x, y) = match profile.look_stick {
            LookStick::Left => (snapshot.left_x, snapshot.left_y),
            LookStick::Right => (snapshot.right_x, snapshot.right_y),
            LookStick::None => return,
        };
        let dt = f64::from(dt);

        let min_axis = profile.look_speed_min_axis_value;
        let max_axis = profile.look_speed_max_axis_value;

        let duty_x = duty_cycle(x, min_axis, max_axis);
        if duty_x != 0.0 {
            self.acc_x += speed(x, duty_x, profile.look_speed_min_x, profile.look_speed_max_x) * dt;
        }
        let duty_y = duty_cycle(y, min_axis, max_axis);
        if duty_y != 0.0 {
            self.acc_y += speed(y, duty_y, profile.look_speed_min_y, profile.look_speed_max_y) * dt;
        }

        let dx = self.acc_x.trunc();
        let dy = self.acc_y.trunc();
        self.acc_x -= dx;
        self.acc_y -= dy;

        if dx != 0.0 || dy != 0.0 {
            sink.emit(EmittedEvent::MouseMove {
                dx: dx as i32,
                dy: dy as i32,
            });
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
