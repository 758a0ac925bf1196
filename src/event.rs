use serde::Deserialize;

/// Numeric controller button id, SDL-style numbering for physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(pub u8);

impl ButtonId {
    pub const A: ButtonId = ButtonId(0);
    pub const B: ButtonId = ButtonId(1);
    pub const X: ButtonId = ButtonId(2);
    pub const Y: ButtonId = ButtonId(3);
    pub const BACK: ButtonId = ButtonId(4);
    pub const GUIDE: ButtonId = ButtonId(5);
    pub const START: ButtonId = ButtonId(6);
    pub const LEFT_STICK: ButtonId = ButtonId(7);
    pub const RIGHT_STICK: ButtonId = ButtonId(8);
    pub const LEFT_SHOULDER: ButtonId = ButtonId(9);
    pub const RIGHT_SHOULDER: ButtonId = ButtonId(10);
    pub const DPAD_UP: ButtonId = ButtonId(11);
    pub const DPAD_DOWN: ButtonId = ButtonId(12);
    pub const DPAD_LEFT: ButtonId = ButtonId(13);
    pub const DPAD_RIGHT: ButtonId = ButtonId(14);

    /// Highest id a physical controller can report.
    pub const PHYSICAL_MAX: u8 = 20;

    /// Reserved ids for the synthetic trigger buttons. Kept well above the
    /// physical range so profiles can map them like any other button.
    pub const TRIGGER_LEFT: ButtonId = ButtonId(100);
    pub const TRIGGER_RIGHT: ButtonId = ButtonId(101);

    pub fn is_physical(self) -> bool {
        self.0 <= Self::PHYSICAL_MAX
    }

    pub fn is_synthetic(self) -> bool {
        self == Self::TRIGGER_LEFT || self == Self::TRIGGER_RIGHT
    }
}

const _: () = assert!(ButtonId::PHYSICAL_MAX < ButtonId::TRIGGER_LEFT.0);
const _: () = assert!(ButtonId::PHYSICAL_MAX < ButtonId::TRIGGER_RIGHT.0);

/// Linux input key code. Zero means "unmapped" and is never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Last code of the plain keyboard block (KEY_MICMUTE).
    pub const KEYBOARD_MAX: u16 = 248;

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    LeftPress,
    LeftDown,
    LeftUp,
    RightPress,
    RightDown,
    RightUp,
    WheelDown,
    WheelUp,
}

/// Set of digital buttons currently held, indexed by physical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonSet(u32);

impl ButtonSet {
    pub fn insert(&mut self, id: ButtonId) {
        if id.is_physical() {
            self.0 |= 1 << id.0;
        }
    }

    #[cfg(test)]
    pub fn contains(&self, id: ButtonId) -> bool {
        id.is_physical() && self.0 & (1 << id.0) != 0
    }

    pub fn len(&self) -> u32 {
        self.0.count_ones()
    }
}

/// Controller state read fresh each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSnapshot {
    pub left_x: i16,
    pub left_y: i16,
    pub right_x: i16,
    pub right_y: i16,
    pub left_trigger: i16,
    pub right_trigger: i16,
    pub buttons: ButtonSet,
}

/// Notifications queued by the device layer since the previous poll.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Connected { name: String },
    Disconnected,
    Button { id: ButtonId, pressed: bool },
}

/// One-shot event handed to the output sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmittedEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    KeyTap(KeyCode),
    MouseButton(MouseAction),
    MouseMove { dx: i32, dy: i32 },
    SyntheticButton { id: ButtonId, pressed: bool },
}

/// Destination for synthesized events. Delivery is best effort; failures
/// are the sink's to report.
pub trait EventSink {
    fn emit(&mut self, event: EmittedEvent);
}

#[cfg(test)]
impl EventSink for Vec<EmittedEvent> {
    fn emit(&mut self, event: EmittedEvent) {
        self.push(event);
    }
}
