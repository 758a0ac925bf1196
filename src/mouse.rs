use crate::event::MouseAction;
use std::time::Duration;

/// Minimum hold between the down and up halves of a click. Some games drop
/// clicks shorter than this.
pub const PRESS_DURATION: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

/// Primitive pointer operations a device must provide.
pub trait PointerOps {
    fn button(&mut self, button: PointerButton, down: bool) -> std::io::Result<()>;
    fn wheel(&mut self, notches: i32) -> std::io::Result<()>;
}

/// Perform a profile mouse action as one or two primitive operations.
pub fn perform(action: MouseAction, ops: &mut impl PointerOps) -> std::io::Result<()> {
    match action {
        MouseAction::LeftPress => click(PointerButton::Left, ops),
        MouseAction::LeftDown => ops.button(PointerButton::Left, true),
        MouseAction::LeftUp => ops.button(PointerButton::Left, false),
        MouseAction::RightPress => click(PointerButton::Right, ops),
        MouseAction::RightDown => ops.button(PointerButton::Right, true),
        MouseAction::RightUp => ops.button(PointerButton::Right, false),
        MouseAction::WheelDown => ops.wheel(-1),
        MouseAction::WheelUp => ops.wheel(1),
    }
}

fn click(button: PointerButton, ops: &mut impl PointerOps) -> std::io::Result<()> {
    ops.button(button, true)?;
    spin_sleep::sleep(PRESS_DURATION);
    ops.button(button, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Debug, PartialEq)]
    enum Op {
        Button(PointerButton, bool, Instant),
        Wheel(i32),
    }

    #[derive(Default)]
    struct Recorder(Vec<Op>);

    impl PointerOps for Recorder {
        fn button(&mut self, button: PointerButton, down: bool) -> std::io::Result<()> {
            self.0.push(Op::Button(button, down, Instant::now()));
            Ok(())
        }

        fn wheel(&mut self, notches: i32) -> std::io::Result<()> {
            self.0.push(Op::Wheel(notches));
            Ok(())
        }
    }

    #[test]
    fn press_holds_for_minimum_duration() {
        let mut rec = Recorder::default();
        perform(MouseAction::RightPress, &mut rec).unwrap();
        match rec.0.as_slice() {
            [Op::Button(PointerButton::Right, true, down), Op::Button(PointerButton::Right, false, up)] => {
                assert!(*up - *down >= PRESS_DURATION);
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn down_and_up_are_single_ops() {
        let mut rec = Recorder::default();
        perform(MouseAction::LeftDown, &mut rec).unwrap();
        perform(MouseAction::LeftUp, &mut rec).unwrap();
        assert_eq!(rec.0.len(), 2);
        assert!(matches!(rec.0[0], Op::Button(PointerButton::Left, true, _)));
        assert!(matches!(rec.0[1], Op::Button(PointerButton::Left, false, _)));
    }

    #[test]
    fn wheel_moves_one_notch() {
        let mut rec = Recorder::default();
        perform(MouseAction::WheelDown, &mut rec).unwrap();
        perform(MouseAction::WheelUp, &mut rec).unwrap();
        assert_eq!(rec.0, vec![Op::Wheel(-1), Op::Wheel(1)]);
    }
}
