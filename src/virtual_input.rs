use crate::event::{EmittedEvent, EventSink, KeyCode};
use crate::mouse::{self, PointerButton, PointerOps};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key, RelativeAxisType};

/// Virtual keyboard and mouse that synthesized events are written to.
pub struct VirtualInput {
    device: VirtualDevice,
}

fn syn() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
}

fn key(code: u16, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY, code, value)
}

fn rel(axis: RelativeAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::RELATIVE, axis.0, value)
}

impl VirtualInput {
    pub fn new() -> std::io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1..=KeyCode::KEYBOARD_MAX {
            keys.insert(Key::new(code));
        }
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);
        keys.insert(Key::BTN_MIDDLE);

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);

        let device = VirtualDeviceBuilder::new()?
            .name("pulsekey Keyboard/Mouse")
            .input_id(InputId::new(BusType::BUS_VIRTUAL, 0x1234, 0x5679, 1))
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;

        log::info!("Created virtual keyboard/mouse");

        Ok(Self { device })
    }

    fn write(&mut self, event: EmittedEvent) -> std::io::Result<()> {
        match event {
            EmittedEvent::KeyDown(code) if !code.is_none() => {
                self.device.emit(&[key(code.0, 1), syn()])
            }
            EmittedEvent::KeyUp(code) if !code.is_none() => {
                self.device.emit(&[key(code.0, 0), syn()])
            }
            EmittedEvent::KeyTap(code) if !code.is_none() => {
                self.device
                    .emit(&[key(code.0, 1), syn(), key(code.0, 0), syn()])
            }
            EmittedEvent::KeyDown(_) | EmittedEvent::KeyUp(_) | EmittedEvent::KeyTap(_) => Ok(()),
            EmittedEvent::MouseButton(action) => mouse::perform(action, self),
            EmittedEvent::MouseMove { dx, dy } => self.device.emit(&[
                rel(RelativeAxisType::REL_X, dx),
                rel(RelativeAxisType::REL_Y, dy),
                syn(),
            ]),
            EmittedEvent::SyntheticButton { id, pressed } => {
                log::trace!("Synthetic button {} ({}) not forwarded", id.0, pressed);
                Ok(())
            }
        }
    }
}

impl EventSink for VirtualInput {
    fn emit(&mut self, event: EmittedEvent) {
        if let Err(e) = self.write(event) {
            log::warn!("Failed to emit {:?}: {}", event, e);
        }
    }
}

impl PointerOps for VirtualInput {
    fn button(&mut self, button: PointerButton, down: bool) -> std::io::Result<()> {
        let code = match button {
            PointerButton::Left => Key::BTN_LEFT,
            PointerButton::Right => Key::BTN_RIGHT,
        };
        self.device.emit(&[key(code.code(), i32::from(down)), syn()])
    }

    fn wheel(&mut self, notches: i32) -> std::io::Result<()> {
        self.device
            .emit(&[rel(RelativeAxisType::REL_WHEEL, notches), syn()])
    }
}
