use clap::Parser;
use std::path::PathBuf;

/// Linux gamepad-to-keyboard/mouse injector.
/// Turns stick deflection into paced key taps and sub-pixel mouse motion,
/// tuned per game by a YAML profile file.
#[derive(Parser, Debug)]
#[command(name = "pulsekey")]
pub struct Config {
    /// Profile file mapping game names to tuning profiles
    #[arg(short, long, default_value = "games.yaml")]
    pub profiles: PathBuf,

    /// Profile to start with (default: first by name)
    #[arg(short = 'g', long)]
    pub profile: Option<String>,

    /// Display refresh rate used as the v-sync reference (0 = unknown)
    #[arg(long, default_value_t = 60.0, value_parser = parse_refresh_hz)]
    pub refresh_hz: f64,

    /// Override the profile's fixed update rate
    #[arg(short, long)]
    pub framerate: Option<u16>,

    /// Start in fixed-rate mode regardless of the profile
    #[arg(long, default_value_t = false)]
    pub no_vsync: bool,

    /// Print the measured update rate every 120 cycles
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

/// Highest refresh rate accepted on the command line.
const MAX_REFRESH_HZ: f64 = 1000.0;

fn parse_refresh_hz(s: &str) -> Result<f64, String> {
    let hz: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=MAX_REFRESH_HZ).contains(&hz) {
        Ok(hz)
    } else {
        Err(format!("must be between 0 and {MAX_REFRESH_HZ}"))
    }
}
