mod config;
mod control;
mod controller;
mod digital;
mod engine;
mod event;
mod look;
mod motion;
mod mouse;
mod profile;
mod refresh;
mod scheduler;
mod trigger;
mod virtual_input;

use clap::Parser;
use config::Config;
use control::{Command, QUIT, RATE_STEP_HZ};
use controller::{ControllerSource, GamepadSource};
use engine::{describe_sync, Engine};
use profile::ProfileSet;
use refresh::{RefreshReference, SoftwareVblank};
use scheduler::{RateMeter, SpinPacer, Wait};
use std::sync::atomic::Ordering;
use std::time::Instant;
use virtual_input::VirtualInput;

fn main() {
    // Handle "pulsekey next|vsync|faster|slower|quit" before clap parsing.
    // These signal the running instance and exit immediately.
    if let Some(cmd) = std::env::args().nth(1) {
        if control::dispatch_subcommand(&cmd) {
            return;
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = Config::parse();

    let profiles = match ProfileSet::load(&config.profiles) {
        Ok(p) => p,
        Err(e) => {
            log::error!(
                "Failed to load profiles from {}: {}",
                config.profiles.display(),
                e
            );
            log::error!("At least one complete, valid profile entry is required.");
            std::process::exit(1);
        }
    };

    let available = profiles.names().collect::<Vec<_>>().join(", ");
    let now = Instant::now();
    let mut engine = match Engine::new(profiles, config.profile.as_deref(), now) {
        Ok(e) => e,
        Err(e) => {
            log::error!("{}", e);
            log::error!("Available profiles: {}", available);
            std::process::exit(1);
        }
    };
    if config.no_vsync {
        engine.set_use_vsync(false, now);
    }
    if let Some(hz) = config.framerate {
        engine.set_target_framerate(hz, now);
    }

    println!("pulsekey - Gamepad-to-Keyboard/Mouse");
    println!("  Profiles: {}", engine.profiles().len());
    println!("  Active:   {}", engine.profile_name());
    println!("  Timing:   {}", describe_sync(&engine.sync()));
    if config.refresh_hz > 0.0 {
        println!("  Refresh:  {:.2} Hz", config.refresh_hz);
    } else {
        println!("  Refresh:  unknown");
    }
    println!();

    control::signal_setup();

    let mut output = match VirtualInput::new() {
        Ok(o) => o,
        Err(e) => {
            log::error!("Failed to create virtual keyboard/mouse: {}", e);
            log::error!("Do you have /dev/uinput access? Try: sudo modprobe uinput");
            std::process::exit(1);
        }
    };

    let mut source = GamepadSource::new();
    if let Some(name) = source.controller_name() {
        println!("Controller: {}", name);
    }

    println!("Next profile: pulsekey next");
    println!("V-sync:       pulsekey vsync");
    println!("Rate:         pulsekey faster | pulsekey slower");
    println!("Quit:         pulsekey quit");
    println!();

    let mut pacer = SpinPacer::new(&QUIT);
    let mut refresh = SoftwareVblank::new(config.refresh_hz, now);
    if refresh.period().is_none() {
        log::warn!("Refresh rate unknown: v-sync mode will run unpaced at full CPU");
    }
    let mut meter = RateMeter::new(now);
    let mut last_update = now;

    loop {
        if QUIT.load(Ordering::Relaxed) {
            break;
        }

        // Selection changes land between cycles, never inside one.
        for command in control::drain() {
            let now = Instant::now();
            match command {
                Command::NextProfile => engine.select_next_profile(now, &mut output),
                Command::ToggleVsync => {
                    let use_vsync = !engine.sync().use_vsync;
                    engine.set_use_vsync(use_vsync, now);
                }
                Command::StepRate(steps) => {
                    let hz = i32::from(engine.sync().target_framerate) + steps * RATE_STEP_HZ;
                    let hz = hz.clamp(0, i32::from(u16::MAX)) as u16;
                    engine.set_target_framerate(hz, now);
                }
            }
        }

        let poll = source.poll();
        let held = poll.snapshot.map(|s| s.buttons.len()).unwrap_or(0);

        let update = Instant::now();
        let dt = (update - last_update).as_secs_f32();
        last_update = update;
        engine.cycle(poll, dt, &mut output);

        if let Some(rate) = meter.tick(Instant::now()) {
            if config.debug {
                eprintln!(
                    "[dbg] {:7.2} Hz  {}  profile \"{}\"  controller {}  held {}",
                    rate,
                    describe_sync(&engine.sync()),
                    engine.profile_name(),
                    if engine.is_connected() { "yes" } else { "no" },
                    held,
                );
            }
        }

        if engine.pace(&mut pacer, &mut refresh) == Wait::Interrupted {
            break;
        }
    }

    log::info!("Shutting down...");
    engine.shutdown(&mut output);
    log::info!("Done");
}
