//! Per-application tuning profiles and their YAML loader.
//!
//! A profile file maps application names to profile records. Each record is
//! parsed and validated on its own: a broken entry is reported and skipped,
//! and only an empty result is fatal.

use crate::event::{ButtonId, KeyCode, MouseAction};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed profile document: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no valid profiles found")]
    NoValidProfiles,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ProfileError {
    ProfileError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Which physical stick drives mouse look. The other stick (or both, with
/// `None`) drives movement keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookStick {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StickKeys {
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub use_vsync: bool,
    pub injection_frame_offset_fraction: f32,
    pub injection_framerate: u16,

    #[serde(default)]
    pub button_down_to_key_press: BTreeMap<ButtonId, KeyCode>,
    #[serde(default)]
    pub button_down_to_key_down: BTreeMap<ButtonId, KeyCode>,
    #[serde(default)]
    pub button_up_to_key_press: BTreeMap<ButtonId, KeyCode>,
    #[serde(default)]
    pub button_up_to_key_up: BTreeMap<ButtonId, KeyCode>,
    #[serde(default)]
    pub button_down_to_mouse_event: BTreeMap<ButtonId, MouseAction>,
    #[serde(default)]
    pub button_up_to_mouse_event: BTreeMap<ButtonId, MouseAction>,

    pub look_stick: LookStick,
    pub left_stick_keys: StickKeys,
    pub right_stick_keys: StickKeys,

    pub move_speed_min_axis_value: u16,
    pub move_speed_max_axis_value: u16,
    pub move_speed_duty_cycle_min: f32,

    pub look_speed_min_axis_value: u16,
    pub look_speed_max_axis_value: u16,
    pub look_speed_min_x: f32,
    pub look_speed_max_x: f32,
    pub look_speed_min_y: f32,
    pub look_speed_max_y: f32,

    pub trigger_depth: u16,
}

impl Profile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.move_speed_max_axis_value <= self.move_speed_min_axis_value {
            return Err(invalid(
                "move_speed_max_axis_value",
                format!(
                    "{} must exceed move_speed_min_axis_value {}",
                    self.move_speed_max_axis_value, self.move_speed_min_axis_value
                ),
            ));
        }
        if self.look_speed_max_axis_value <= self.look_speed_min_axis_value {
            return Err(invalid(
                "look_speed_max_axis_value",
                format!(
                    "{} must exceed look_speed_min_axis_value {}",
                    self.look_speed_max_axis_value, self.look_speed_min_axis_value
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.move_speed_duty_cycle_min) {
            return Err(invalid(
                "move_speed_duty_cycle_min",
                format!("{} is outside 0..=1", self.move_speed_duty_cycle_min),
            ));
        }
        if !(0.0..1.0).contains(&self.injection_frame_offset_fraction) {
            return Err(invalid(
                "injection_frame_offset_fraction",
                format!("{} is outside 0..1", self.injection_frame_offset_fraction),
            ));
        }
        if self.injection_framerate == 0 {
            return Err(invalid("injection_framerate", "must be positive"));
        }

        let speeds = [
            ("look_speed_min_x", self.look_speed_min_x),
            ("look_speed_max_x", self.look_speed_max_x),
            ("look_speed_min_y", self.look_speed_min_y),
            ("look_speed_max_y", self.look_speed_max_y),
        ];
        for (field, speed) in speeds {
            if !speed.is_finite() {
                return Err(invalid(field, "must be a finite number"));
            }
        }

        let key_tables = [
            ("button_down_to_key_press", &self.button_down_to_key_press),
            ("button_down_to_key_down", &self.button_down_to_key_down),
            ("button_up_to_key_press", &self.button_up_to_key_press),
            ("button_up_to_key_up", &self.button_up_to_key_up),
        ];
        for (field, table) in key_tables {
            for (&id, &key) in table {
                check_button(field, id)?;
                check_key(field, key)?;
            }
        }
        for (field, table) in [
            ("button_down_to_mouse_event", &self.button_down_to_mouse_event),
            ("button_up_to_mouse_event", &self.button_up_to_mouse_event),
        ] {
            for &id in table.keys() {
                check_button(field, id)?;
            }
        }

        for (field, keys) in [
            ("left_stick_keys", &self.left_stick_keys),
            ("right_stick_keys", &self.right_stick_keys),
        ] {
            for key in [keys.left, keys.right, keys.up, keys.down] {
                check_key(field, key)?;
            }
        }

        Ok(())
    }
}

fn check_button(field: &'static str, id: ButtonId) -> Result<(), ProfileError> {
    if id.is_physical() || id.is_synthetic() {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!(
                "button id {} is neither a controller button (0..={}) nor a trigger ({} or {})",
                id.0,
                ButtonId::PHYSICAL_MAX,
                ButtonId::TRIGGER_LEFT.0,
                ButtonId::TRIGGER_RIGHT.0
            ),
        ))
    }
}

fn check_key(field: &'static str, key: KeyCode) -> Result<(), ProfileError> {
    if key.0 <= KeyCode::KEYBOARD_MAX {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("key code {} is outside 0..={}", key.0, KeyCode::KEYBOARD_MAX),
        ))
    }
}

/// Validated profiles ordered by application name.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    entries: Vec<(String, Profile)>,
}

impl ProfileSet {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse a profile document, skipping entries that fail to parse or
    /// validate.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(text)?;

        let mut entries = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            let profile = serde_yaml::from_value::<Profile>(value)
                .map_err(ProfileError::from)
                .and_then(|p| p.validate().map(|_| p));
            match profile {
                Ok(p) => entries.push((name, p)),
                Err(e) => log::warn!("Skipping profile \"{}\": {}", name, e),
            }
        }

        if entries.is_empty() {
            return Err(ProfileError::NoValidProfiles);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn name(&self, index: usize) -> &str {
        &self.entries[index].0
    }

    pub fn profile(&self, index: usize) -> &Profile {
        &self.entries[index].1
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
Shooter:
  use_vsync: true
  injection_frame_offset_fraction: 0.5
  injection_framerate: 120
  button_down_to_key_press:
    0: 57
  button_down_to_key_down:
    1: 29
  button_up_to_key_up:
    1: 29
  button_down_to_mouse_event:
    100: left_down
  button_up_to_mouse_event:
    100: left_up
  look_stick: right
  left_stick_keys: { left: 30, right: 32, up: 17, down: 31 }
  right_stick_keys: { left: 0, right: 0, up: 0, down: 0 }
  move_speed_min_axis_value: 2000
  move_speed_max_axis_value: 30000
  move_speed_duty_cycle_min: 0.1
  look_speed_min_axis_value: 4000
  look_speed_max_axis_value: 32000
  look_speed_min_x: 100.0
  look_speed_max_x: 1500.0
  look_speed_min_y: 80.0
  look_speed_max_y: 900.0
  trigger_depth: 80
Puzzle:
  use_vsync: false
  injection_frame_offset_fraction: 0.0
  injection_framerate: 60
  look_stick: none
  left_stick_keys: { left: 105, right: 106, up: 103, down: 108 }
  right_stick_keys: { left: 30, right: 32, up: 17, down: 31 }
  move_speed_min_axis_value: 8000
  move_speed_max_axis_value: 24000
  move_speed_duty_cycle_min: 0.0
  look_speed_min_axis_value: 0
  look_speed_max_axis_value: 1
  look_speed_min_x: 0.0
  look_speed_max_x: 0.0
  look_speed_min_y: 0.0
  look_speed_max_y: 0.0
  trigger_depth: 16000
"#;

    pub(crate) fn sample() -> ProfileSet {
        ProfileSet::parse(SAMPLE).expect("sample profiles parse")
    }

    #[test]
    fn parses_and_orders_by_name() {
        let set = sample();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Puzzle", "Shooter"]);

        let shooter = set.profile(set.index_of("Shooter").unwrap());
        assert_eq!(shooter.look_stick, LookStick::Right);
        assert_eq!(
            shooter.button_down_to_key_press.get(&ButtonId::A),
            Some(&KeyCode(57))
        );
        assert_eq!(
            shooter.button_down_to_mouse_event.get(&ButtonId::TRIGGER_LEFT),
            Some(&MouseAction::LeftDown)
        );
        assert_eq!(shooter.left_stick_keys.up, KeyCode(17));

        let puzzle = set.profile(set.index_of("Puzzle").unwrap());
        assert!(puzzle.button_down_to_key_press.is_empty());
        assert!(!puzzle.use_vsync);
    }

    #[test]
    fn invalid_entry_is_skipped_not_fatal() {
        let text = SAMPLE.replace(
            "move_speed_max_axis_value: 24000",
            "move_speed_max_axis_value: 100",
        );
        let set = ProfileSet::parse(&text).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.index_of("Puzzle"), None);
    }

    #[test]
    fn missing_field_is_skipped() {
        let text = SAMPLE.replace("  trigger_depth: 16000\n", "");
        let set = ProfileSet::parse(&text).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Shooter"]);
    }

    #[test]
    fn zero_valid_profiles_is_an_error() {
        let text = SAMPLE.replace("injection_framerate: 120", "injection_framerate: 0");
        let text = text.replace("trigger_depth: 16000", "trigger_depth: -1");
        assert!(matches!(
            ProfileSet::parse(&text),
            Err(ProfileError::NoValidProfiles)
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut p = sample().profile(1).clone();
        p.move_speed_duty_cycle_min = 1.5;
        assert!(matches!(
            p.validate(),
            Err(ProfileError::Invalid { field: "move_speed_duty_cycle_min", .. })
        ));

        let mut p = sample().profile(1).clone();
        p.button_down_to_key_press.insert(ButtonId(42), KeyCode(30));
        assert!(matches!(
            p.validate(),
            Err(ProfileError::Invalid { field: "button_down_to_key_press", .. })
        ));

        let mut p = sample().profile(1).clone();
        p.right_stick_keys.down = KeyCode(0x110);
        assert!(p.validate().is_err());

        let mut p = sample().profile(1).clone();
        p.look_speed_max_axis_value = p.look_speed_min_axis_value;
        assert!(p.validate().is_err());
    }

    #[test]
    fn unknown_mouse_action_rejects_entry() {
        let text = SAMPLE.replace("100: left_down", "100: middle_click");
        let set = ProfileSet::parse(&text).unwrap();
        assert_eq!(set.index_of("Shooter"), None);
    }
}
