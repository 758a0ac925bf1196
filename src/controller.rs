use crate::event::{ButtonId, ButtonSet, ControllerEvent, ControllerSnapshot};
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};

/// Everything the device layer reports for one cycle.
#[derive(Debug, Default)]
pub struct ControllerPoll {
    pub events: Vec<ControllerEvent>,
    /// `None` while no controller is in use.
    pub snapshot: Option<ControllerSnapshot>,
}

pub trait ControllerSource {
    fn poll(&mut self) -> ControllerPoll;
}

/// Physical buttons with a stable id. Analog trigger buttons are absent on
/// purpose: their edges come from the trigger synthesizer.
fn button_id(button: Button) -> Option<ButtonId> {
    let id = match button {
        Button::South => ButtonId::A,
        Button::East => ButtonId::B,
        Button::West => ButtonId::X,
        Button::North => ButtonId::Y,
        Button::Select => ButtonId::BACK,
        Button::Mode => ButtonId::GUIDE,
        Button::Start => ButtonId::START,
        Button::LeftThumb => ButtonId::LEFT_STICK,
        Button::RightThumb => ButtonId::RIGHT_STICK,
        Button::LeftTrigger => ButtonId::LEFT_SHOULDER,
        Button::RightTrigger => ButtonId::RIGHT_SHOULDER,
        Button::DPadUp => ButtonId::DPAD_UP,
        Button::DPadDown => ButtonId::DPAD_DOWN,
        Button::DPadLeft => ButtonId::DPAD_LEFT,
        Button::DPadRight => ButtonId::DPAD_RIGHT,
        _ => return None,
    };
    Some(id)
}

const MAPPED_BUTTONS: [Button; 15] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::Select,
    Button::Mode,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Scale a gilrs stick value (-1.0..=1.0) to a signed 16-bit axis.
fn stick(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

/// Scale a trigger depth (0.0..=1.0) to 0..=32767.
fn trigger(value: f32) -> i16 {
    (value.clamp(0.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

/// Gamepad input through gilrs. Uses one gamepad at a time: the first one
/// seen, then whichever connects next after it goes away.
pub struct GamepadSource {
    gilrs: Option<Gilrs>,
    active: Option<GamepadId>,
}

impl GamepadSource {
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(g) => Some(g),
            Err(gilrs::Error::NotImplemented(g)) => {
                log::warn!("Gamepad backend not supported on this platform");
                Some(g)
            }
            Err(e) => {
                log::error!("Failed to initialize gamepad backend: {}", e);
                None
            }
        };

        let mut source = Self {
            gilrs,
            active: None,
        };
        source.adopt_first();
        source
    }

    fn adopt_first(&mut self) {
        let Some(gilrs) = &self.gilrs else { return };
        if let Some((id, gamepad)) = gilrs.gamepads().find(|(_, g)| g.is_connected()) {
            log::info!("Using controller: {}", gamepad.name());
            self.active = Some(id);
        } else {
            log::info!("No controller detected");
        }
    }

    pub fn controller_name(&self) -> Option<String> {
        let gilrs = self.gilrs.as_ref()?;
        let id = self.active?;
        Some(gilrs.gamepad(id).name().to_string())
    }

    fn snapshot(gilrs: &Gilrs, id: GamepadId) -> ControllerSnapshot {
        let gamepad = gilrs.gamepad(id);
        let depth = |button: Button| {
            gamepad
                .button_data(button)
                .map(|data| data.value())
                .unwrap_or(0.0)
        };

        let mut buttons = ButtonSet::default();
        for button in MAPPED_BUTTONS {
            if gamepad.is_pressed(button) {
                if let Some(id) = button_id(button) {
                    buttons.insert(id);
                }
            }
        }

        // gilrs reports stick Y up-positive; the profile convention is
        // up-negative.
        ControllerSnapshot {
            left_x: stick(gamepad.value(Axis::LeftStickX)),
            left_y: stick(-gamepad.value(Axis::LeftStickY)),
            right_x: stick(gamepad.value(Axis::RightStickX)),
            right_y: stick(-gamepad.value(Axis::RightStickY)),
            left_trigger: trigger(depth(Button::LeftTrigger2)),
            right_trigger: trigger(depth(Button::RightTrigger2)),
            buttons,
        }
    }
}

impl ControllerSource for GamepadSource {
    fn poll(&mut self) -> ControllerPoll {
        let mut poll = ControllerPoll::default();
        let Some(gilrs) = self.gilrs.as_mut() else {
            return poll;
        };

        while let Some(event) = gilrs.next_event() {
            match event.event {
                EventType::Connected if self.active.is_none() => {
                    let name = gilrs.gamepad(event.id).name().to_string();
                    log::info!("Using controller: {}", name);
                    self.active = Some(event.id);
                    poll.events.push(ControllerEvent::Connected { name });
                }
                EventType::Disconnected if self.active == Some(event.id) => {
                    log::info!("Controller disconnected");
                    self.active = None;
                    poll.events.push(ControllerEvent::Disconnected);
                }
                EventType::ButtonPressed(button, _) if self.active == Some(event.id) => {
                    if let Some(id) = button_id(button) {
                        poll.events.push(ControllerEvent::Button { id, pressed: true });
                    }
                }
                EventType::ButtonReleased(button, _) if self.active == Some(event.id) => {
                    if let Some(id) = button_id(button) {
                        poll.events.push(ControllerEvent::Button { id, pressed: false });
                    }
                }
                _ => {}
            }
        }

        poll.snapshot = self.active.map(|id| Self::snapshot(gilrs, id));
        poll
    }
}
