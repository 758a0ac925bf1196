//! Per-cycle composition of the translators, profile selection and pacing.

use crate::controller::ControllerPoll;
use crate::digital::translate_edge;
use crate::event::{ButtonId, ControllerEvent, EmittedEvent, EventSink};
use crate::look::LookTranslator;
use crate::motion::MotionTranslator;
use crate::profile::{Profile, ProfileSet};
use crate::refresh::RefreshReference;
use crate::scheduler::{FrameScheduler, Pacer, SyncSettings, Wait};
use crate::trigger::TriggerSynthesizer;
use std::collections::VecDeque;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown profile \"{0}\"")]
    UnknownProfile(String),
}

/// Translator state that lives across cycles for the active profile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineState {
    pub motion: MotionTranslator,
    pub look: LookTranslator,
    pub triggers: TriggerSynthesizer,
}

impl EngineState {
    /// Zero everything, releasing whatever the outgoing profile still holds.
    fn reset(&mut self, profile: &Profile, sink: &mut dyn EventSink) {
        self.motion.reset(profile, sink);
        self.look.reset();
        if self.triggers.left_pressed {
            translate_edge(profile, ButtonId::TRIGGER_LEFT, false, sink);
        }
        if self.triggers.right_pressed {
            translate_edge(profile, ButtonId::TRIGGER_RIGHT, false, sink);
        }
        self.triggers.reset();
    }
}

/// Sends synthetic button edges back into the engine's queue and
/// everything else to the output.
struct Router<'a> {
    out: &'a mut dyn EventSink,
    synthetic: &'a mut VecDeque<(ButtonId, bool)>,
}

impl EventSink for Router<'_> {
    fn emit(&mut self, event: EmittedEvent) {
        match event {
            EmittedEvent::SyntheticButton { id, pressed } => self.synthetic.push_back((id, pressed)),
            other => self.out.emit(other),
        }
    }
}

fn sync_settings(profile: &Profile) -> SyncSettings {
    SyncSettings {
        use_vsync: profile.use_vsync,
        offset_fraction: profile.injection_frame_offset_fraction,
        target_framerate: profile.injection_framerate,
    }
}

pub struct Engine {
    profiles: ProfileSet,
    active: usize,
    state: EngineState,
    scheduler: FrameScheduler,
    connected: bool,
    synthetic: VecDeque<(ButtonId, bool)>,
}

impl Engine {
    /// Start with the named profile, or the first by name.
    pub fn new(profiles: ProfileSet, initial: Option<&str>, now: Instant) -> Result<Self, EngineError> {
        let active = match initial {
            Some(name) => profiles
                .index_of(name)
                .ok_or_else(|| EngineError::UnknownProfile(name.to_string()))?,
            None => 0,
        };
        let scheduler = FrameScheduler::new(sync_settings(profiles.profile(active)), now);
        Ok(Self {
            profiles,
            active,
            state: EngineState::default(),
            scheduler,
            connected: false,
            synthetic: VecDeque::new(),
        })
    }

    pub fn profile(&self) -> &Profile {
        self.profiles.profile(self.active)
    }

    pub fn profile_name(&self) -> &str {
        self.profiles.name(self.active)
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    #[cfg(test)]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn sync(&self) -> SyncSettings {
        self.scheduler.settings()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn select_profile(
        &mut self,
        name: &str,
        now: Instant,
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let index = self
            .profiles
            .index_of(name)
            .ok_or_else(|| EngineError::UnknownProfile(name.to_string()))?;
        self.activate(index, now, sink);
        Ok(())
    }

    /// Cycle to the next profile by name, wrapping around.
    pub fn select_next_profile(&mut self, now: Instant, sink: &mut dyn EventSink) {
        let index = (self.active + 1) % self.profiles.len();
        self.activate(index, now, sink);
    }

    fn activate(&mut self, index: usize, now: Instant, sink: &mut dyn EventSink) {
        self.reset_state(sink);
        self.active = index;
        self.scheduler.reconfigure(sync_settings(self.profile()), now);
        let sync = self.scheduler.settings();
        log::info!(
            "Selected profile \"{}\" ({})",
            self.profile_name(),
            describe_sync(&sync)
        );
    }

    /// Deliver queued synthetic edges, then release everything, all through
    /// the active profile so every release has a delivered press.
    fn reset_state(&mut self, sink: &mut dyn EventSink) {
        let profile = self.profiles.profile(self.active);
        while let Some((id, pressed)) = self.synthetic.pop_front() {
            translate_edge(profile, id, pressed, sink);
        }
        self.state.reset(profile, sink);
    }

    pub fn set_use_vsync(&mut self, use_vsync: bool, now: Instant) {
        self.scheduler.set_use_vsync(use_vsync, now);
        log::info!("Sync mode: {}", describe_sync(&self.scheduler.settings()));
    }

    /// Returns the rate actually applied after clamping.
    pub fn set_target_framerate(&mut self, hz: u16, now: Instant) -> u16 {
        let applied = self.scheduler.set_target_framerate(hz, now);
        log::info!("Target rate: {} Hz", applied);
        applied
    }

    /// Run one sampling cycle. `dt` is the real time in seconds since the
    /// previous cycle.
    pub fn cycle(&mut self, poll: ControllerPoll, dt: f32, sink: &mut dyn EventSink) {
        // Synthetic edges queued last cycle go first, like device events
        // that were already waiting.
        while let Some((id, pressed)) = self.synthetic.pop_front() {
            translate_edge(self.profiles.profile(self.active), id, pressed, sink);
        }

        for event in poll.events {
            match event {
                ControllerEvent::Connected { name } => {
                    log::debug!("Engine attached to {}", name);
                }
                ControllerEvent::Disconnected => self.reset_state(sink),
                ControllerEvent::Button { id, pressed } => {
                    translate_edge(self.profiles.profile(self.active), id, pressed, sink);
                }
            }
        }

        self.connected = poll.snapshot.is_some();
        let Some(snapshot) = poll.snapshot else {
            return;
        };

        let profile = self.profiles.profile(self.active);
        let mut router = Router {
            out: sink,
            synthetic: &mut self.synthetic,
        };
        self.state.motion.update(profile, &snapshot, &mut router);
        self.state.look.update(profile, &snapshot, dt, &mut router);
        self.state.triggers.update(profile, &snapshot, &mut router);
    }

    /// Block until the next cycle: the refresh boundary plus phase offset
    /// when synced, the next fixed-rate deadline otherwise.
    pub fn pace(&mut self, pacer: &mut dyn Pacer, refresh: &mut dyn RefreshReference) -> Wait {
        if self.scheduler.settings().use_vsync && refresh.present(pacer) == Wait::Interrupted {
            return Wait::Interrupted;
        }
        self.scheduler.pace(pacer, refresh.period())
    }

    /// Release everything still held.
    pub fn shutdown(&mut self, sink: &mut dyn EventSink) {
        self.reset_state(sink);
    }
}

pub fn describe_sync(sync: &SyncSettings) -> String {
    if sync.use_vsync {
        format!(
            "v-sync, input at vblank + {}%",
            (sync.offset_fraction * 100.0) as i32
        )
    } else {
        format!("fixed {} Hz", sync.target_framerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ControllerSnapshot, KeyCode, MouseAction};
    use crate::profile::tests::sample;
    use crate::refresh::SoftwareVblank;
    use crate::scheduler::tests::FakePacer;
    use std::time::Duration;

    fn engine(name: &str) -> Engine {
        Engine::new(sample(), Some(name), Instant::now()).unwrap()
    }

    fn poll(snapshot: ControllerSnapshot) -> ControllerPoll {
        ControllerPoll {
            events: Vec::new(),
            snapshot: Some(snapshot),
        }
    }

    fn inputs() -> Vec<ControllerSnapshot> {
        (0..40)
            .map(|i| ControllerSnapshot {
                left_x: if i % 7 < 4 { 20000 } else { -9000 },
                left_y: -12000,
                right_x: 31000,
                right_y: (i * 800) as i16,
                left_trigger: if i % 10 < 5 { 20000 } else { 0 },
                right_trigger: 0,
                ..Default::default()
            })
            .collect()
    }

    fn run(engine: &mut Engine, inputs: &[ControllerSnapshot]) -> Vec<EmittedEvent> {
        let mut out = Vec::new();
        for s in inputs {
            engine.cycle(poll(*s), 1.0 / 120.0, &mut out);
        }
        out
    }

    #[test]
    fn unknown_initial_profile_is_rejected() {
        assert!(matches!(
            Engine::new(sample(), Some("Racing"), Instant::now()),
            Err(EngineError::UnknownProfile(_))
        ));
        let e = Engine::new(sample(), None, Instant::now()).unwrap();
        assert_eq!(e.profile_name(), "Puzzle");
    }

    #[test]
    fn trigger_edges_round_trip_through_button_tables() {
        let mut engine = engine("Shooter");
        let mut out = Vec::new();
        let pulled = ControllerSnapshot {
            left_trigger: 30000,
            ..Default::default()
        };
        engine.cycle(poll(pulled), 0.01, &mut out);
        assert!(out.is_empty(), "synthetic edge must not reach the output");

        engine.cycle(poll(pulled), 0.01, &mut out);
        assert_eq!(out, vec![EmittedEvent::MouseButton(MouseAction::LeftDown)]);

        out.clear();
        engine.cycle(poll(ControllerSnapshot::default()), 0.01, &mut out);
        engine.cycle(poll(ControllerSnapshot::default()), 0.01, &mut out);
        assert_eq!(out, vec![EmittedEvent::MouseButton(MouseAction::LeftUp)]);
    }

    #[test]
    fn button_events_are_translated() {
        let mut engine = engine("Shooter");
        let mut out = Vec::new();
        engine.cycle(
            ControllerPoll {
                events: vec![ControllerEvent::Button {
                    id: ButtonId::A,
                    pressed: true,
                }],
                snapshot: Some(ControllerSnapshot::default()),
            },
            0.01,
            &mut out,
        );
        assert_eq!(out, vec![EmittedEvent::KeyTap(KeyCode(57))]);
    }

    #[test]
    fn no_controller_is_a_pass_through() {
        let mut engine = engine("Puzzle");
        let mut out = Vec::new();
        for _ in 0..10 {
            engine.cycle(ControllerPoll::default(), 0.01, &mut out);
        }
        assert!(out.is_empty());
        assert!(!engine.is_connected());
        assert_eq!(*engine.state(), EngineState::default());
    }

    #[test]
    fn disconnect_resets_and_releases() {
        let mut engine = engine("Puzzle");
        let mut out = Vec::new();
        let held = ControllerSnapshot {
            left_x: 32767,
            ..Default::default()
        };
        engine.cycle(poll(held), 0.01, &mut out);
        assert_eq!(out, vec![EmittedEvent::KeyDown(KeyCode(106))]);

        out.clear();
        engine.cycle(
            ControllerPoll {
                events: vec![ControllerEvent::Disconnected],
                snapshot: None,
            },
            0.01,
            &mut out,
        );
        assert_eq!(out, vec![EmittedEvent::KeyUp(KeyCode(106))]);
        assert_eq!(*engine.state(), EngineState::default());
    }

    #[test]
    fn swap_matches_fresh_start() {
        let trace = inputs();

        let mut swapped = engine("Shooter");
        run(&mut swapped, &trace[..17]);
        let mut discard = Vec::new();
        swapped
            .select_profile("Puzzle", Instant::now(), &mut discard)
            .unwrap();
        assert_eq!(*swapped.state(), EngineState::default());
        let after_swap = run(&mut swapped, &trace);

        let mut fresh = engine("Puzzle");
        let from_fresh = run(&mut fresh, &trace);

        assert!(!from_fresh.is_empty());
        assert_eq!(after_swap, from_fresh);
    }

    #[test]
    fn swap_releases_with_outgoing_profile() {
        let mut engine = engine("Shooter");
        let mut out = Vec::new();
        let snapshot = ControllerSnapshot {
            left_x: 32767,
            left_trigger: 32767,
            ..Default::default()
        };
        engine.cycle(poll(snapshot), 0.01, &mut out);
        engine.cycle(poll(snapshot), 0.01, &mut out);
        out.clear();

        engine.select_next_profile(Instant::now(), &mut out);
        assert_eq!(engine.profile_name(), "Puzzle");
        assert_eq!(
            out,
            vec![
                EmittedEvent::KeyUp(KeyCode(32)),
                EmittedEvent::MouseButton(MouseAction::LeftUp),
            ]
        );
    }

    #[test]
    fn swap_delivers_queued_trigger_press_before_release() {
        let mut engine = engine("Shooter");
        let mut out = Vec::new();
        let pulled = ControllerSnapshot {
            left_trigger: 32767,
            ..Default::default()
        };
        engine.cycle(poll(pulled), 0.01, &mut out);
        assert!(out.is_empty());

        engine.select_next_profile(Instant::now(), &mut out);
        assert_eq!(
            out,
            vec![
                EmittedEvent::MouseButton(MouseAction::LeftDown),
                EmittedEvent::MouseButton(MouseAction::LeftUp),
            ]
        );
        assert_eq!(*engine.state(), EngineState::default());
    }

    #[test]
    fn swap_adopts_profile_sync_defaults() {
        let mut engine = engine("Shooter");
        assert!(engine.sync().use_vsync);
        engine.set_target_framerate(30, Instant::now());
        let mut out = Vec::new();
        engine.select_profile("Puzzle", Instant::now(), &mut out).unwrap();
        assert_eq!(
            engine.sync(),
            SyncSettings {
                use_vsync: false,
                offset_fraction: 0.0,
                target_framerate: 60,
            }
        );
        assert!(engine
            .select_profile("Racing", Instant::now(), &mut out)
            .is_err());
        assert_eq!(engine.profile_name(), "Puzzle");
    }

    #[test]
    fn synced_pacing_waits_for_boundary_then_offset() {
        let mut engine = engine("Shooter");
        let mut pacer = FakePacer::new();
        let epoch = pacer.now;
        let mut vblank = SoftwareVblank::new(100.0, epoch);
        pacer.now += Duration::from_millis(3);
        assert_eq!(engine.pace(&mut pacer, &mut vblank), Wait::Elapsed);
        // boundary at 10 ms plus half a period
        assert_eq!(pacer.now, epoch + Duration::from_millis(15));
    }

    #[test]
    fn unsynced_pacing_ignores_refresh() {
        let mut engine = engine("Puzzle");
        let mut pacer = FakePacer::new();
        let start = pacer.now;
        engine.set_target_framerate(100, start);
        let mut vblank = SoftwareVblank::new(60.0, start);
        engine.pace(&mut pacer, &mut vblank);
        engine.pace(&mut pacer, &mut vblank);
        assert_eq!(pacer.now, start + Duration::from_millis(10));
    }
}
