use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use log::warn;
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use halcyon_core::device::vdp9918::{OUTPUT_HEIGHT, OUTPUT_WIDTH};
use halcyon_machines::{HalcyonSystem, ResetKind, system};

mod audio;
mod host_config;
mod input;
mod video;

/// Halcyon microcomputer emulator.
#[derive(Parser)]
#[command(name = "halcyon", version, about)]
struct Args {
    /// ROM image (32KB). Missing ROM boots with all-zero contents.
    rom: Option<PathBuf>,

    /// Cartridge image (16KB), overlaid at 0xC000-0xFFFF.
    #[arg(long)]
    cart: Option<PathBuf>,

    /// Window scale factor.
    #[arg(long)]
    scale: Option<u32>,

    /// CPU frequency in Hz.
    #[arg(long)]
    frequency: Option<u32>,

    /// CF backing file, loaded at start and saved on exit.
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Force the serial bit rate regardless of the programmed baud code.
    #[arg(long)]
    baud: Option<u32>,

    /// Warm reset: preserve RAM and clock state.
    #[arg(long)]
    warm: bool,

    /// Echo transmitted serial bytes to stdout.
    #[arg(long)]
    serial_stdout: bool,

    /// Config file (default: <config dir>/halcyon/halcyon.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let host = host_config::load(args.config.as_deref());
    let mut config = host.machine.clone();
    if let Some(frequency) = args.frequency {
        config.cpu_frequency_hz = frequency;
    }
    if let Some(storage) = args.storage.clone() {
        config.storage_path = Some(storage);
    }
    if let Some(baud) = args.baud {
        config.baud_override = Some(baud);
    }
    config.warm_reset |= args.warm;
    let scale = args.scale.or(host.display_scale).unwrap_or(3);

    let mut machine = HalcyonSystem::new(config);

    // Media: a missing or wrong-sized image leaves safe defaults
    if let Some(path) = &args.rom {
        match halcyon_machines::media::load_image(path, system::ROM_SIZE) {
            Ok(image) => machine.load_rom(&image),
            Err(e) => warn!("ROM not loaded, booting empty: {e}"),
        }
    }
    if let Some(path) = &args.cart {
        match halcyon_machines::media::load_image(path, system::CART_SIZE) {
            Ok(image) => machine.load_cart(&image),
            Err(e) => warn!("cartridge not loaded: {e}"),
        }
    }
    machine.attach_storage();

    // SDL setup
    let sdl_context = sdl2::init().expect("Failed to initialize SDL2");
    let sdl_video = sdl_context.video().expect("Failed to init SDL video");
    let sdl_audio = sdl_context.audio().expect("Failed to init SDL audio");
    let mut event_pump = sdl_context.event_pump().expect("Failed to get event pump");

    let video = Rc::new(RefCell::new(video::Video::new(
        &sdl_video,
        "Halcyon",
        OUTPUT_WIDTH as u32,
        OUTPUT_HEIGHT as u32,
        scale,
    )));
    {
        let video = Rc::clone(&video);
        machine.set_render_callback(move |frame| video.borrow_mut().present(frame));
    }

    let audio_out = audio::init(&sdl_audio, machine.config().sample_rate);
    if let Some((device, ring, _)) = &audio_out {
        let ring = std::sync::Arc::clone(ring);
        machine.set_audio_callback(move |samples| {
            ring.lock().unwrap().extend(samples.iter().copied());
        });
        device.resume();
    }

    if args.serial_stdout {
        machine.set_transmit_callback(|byte| {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(&[byte]);
            let _ = stdout.flush();
        });
    }

    let kind = if machine.config().warm_reset {
        ResetKind::Warm
    } else {
        ResetKind::Cold
    };
    machine.reset(kind);

    let mut joystick_mask = 0u8;
    while machine.is_alive() {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => machine.end(),

                Event::KeyDown {
                    scancode: Some(Scancode::Escape),
                    ..
                } => machine.end(),

                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => {
                    if let Some(bit) = input::scancode_to_joystick(sc) {
                        joystick_mask |= bit;
                        machine.set_joystick(joystick_mask);
                    }
                    if let Some(code) = input::scancode_to_hid(sc) {
                        machine.key_down(code);
                    }
                }

                Event::KeyUp {
                    scancode: Some(sc), ..
                } => {
                    if let Some(bit) = input::scancode_to_joystick(sc) {
                        joystick_mask &= !bit;
                        machine.set_joystick(joystick_mask);
                    }
                    if let Some(code) = input::scancode_to_hid(sc) {
                        machine.key_up(code);
                    }
                }

                _ => {}
            }
        }

        machine.pump();
        std::thread::sleep(Duration::from_millis(1));
    }

    // Fade the audio before tearing the device down
    if let Some((device, _, fade_out)) = &audio_out {
        fade_out.store(true, Ordering::Relaxed);
        std::thread::sleep(audio::fade_out_duration());
        device.pause();
    }

    machine.save_storage();
}
