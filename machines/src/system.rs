use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use chrono::{Datelike, Timelike};
use log::{info, warn};

use halcyon_core::core::{Bus, InterruptState, TICK_INTERVAL};
use halcyon_core::cpu::W65c02;
use halcyon_core::device::acia6551::Acia6551;
use halcyon_core::device::banked_ram::BankedRam;
use halcyon_core::device::cf_card::CfCard;
use halcyon_core::device::joystick::{Joystick, JoystickPort};
use halcyon_core::device::keyboard_encoder::KeyboardEncoder;
use halcyon_core::device::keyboard_matrix::KeyboardMatrix;
use halcyon_core::device::rtc_ds1511::{RtcDs1511, RtcTime};
use halcyon_core::device::sid6581::Sid6581;
use halcyon_core::device::vdp9918::Vdp9918;
use halcyon_core::device::via6522::{AttachmentRef, Via6522, ViaAttachment};

use crate::config::MachineConfig;
use crate::media;

/// System RAM: 0x0000-0x7FFF.
pub const RAM_SIZE: usize = 0x8000;
/// ROM chip size. The chip spans 0x8000-0xFFFF; its first 8KB sit under
/// the I/O window and are never visible on the bus.
pub const ROM_SIZE: usize = 0x8000;
/// Cartridge size: the 16KB decoded at 0xC000-0xFFFF.
pub const CART_SIZE: usize = 0x4000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResetKind {
    /// Power-on: clears RAM, VRAM, banked RAM, and seeds the RTC from
    /// the host wall clock.
    Cold,
    /// Front-panel reset: preserves memory and the clock, clears
    /// volatile device state.
    Warm,
}

/// The memory-mapped side of the machine: system RAM, ROM, cartridge,
/// and the eight peripheral cards behind the fixed address decoder.
///
/// | Range         | Device                                |
/// |---------------|---------------------------------------|
/// | 0x0000-0x7FFF | System RAM                            |
/// | 0x8000-0x83FF | RAM card 1 (banked)                   |
/// | 0x8400-0x87FF | RAM card 2 (banked)                   |
/// | 0x8800-0x8BFF | RTC                                   |
/// | 0x8C00-0x8FFF | Storage (CF/IDE)                      |
/// | 0x9000-0x93FF | Serial (ACIA)                         |
/// | 0x9400-0x97FF | VIA                                   |
/// | 0x9800-0x9BFF | Sound                                 |
/// | 0x9C00-0x9FFF | Video                                 |
/// | 0xA000-0xFFFF | ROM, cart overlay at 0xC000 when present |
///
/// Each card decodes only the low address bits it uses; writes to ROM
/// are ignored.
pub struct SystemBus {
    pub ram: Vec<u8>,
    rom: Vec<u8>,
    cart: Option<Vec<u8>>,

    pub ram1: BankedRam,
    pub ram2: BankedRam,
    pub rtc: RtcDs1511,
    pub storage: CfCard,
    pub serial: Acia6551,
    pub via: Via6522,
    pub sound: Sid6581,
    pub video: Vdp9918,
}

impl SystemBus {
    fn new(sample_rate: u32) -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            rom: vec![0; ROM_SIZE],
            cart: None,
            ram1: BankedRam::new(),
            ram2: BankedRam::new(),
            rtc: RtcDs1511::new(),
            storage: CfCard::new(),
            serial: Acia6551::new(),
            via: Via6522::new(),
            sound: Sid6581::new(sample_rate),
            video: Vdp9918::new(),
        }
    }

    /// Install a ROM image. Anything but an exact-size image is refused.
    pub fn load_rom(&mut self, image: &[u8]) -> bool {
        if image.len() != ROM_SIZE {
            return false;
        }
        self.rom.copy_from_slice(image);
        true
    }

    /// Install a cartridge image over 0xC000-0xFFFF.
    pub fn load_cart(&mut self, image: &[u8]) -> bool {
        if image.len() != CART_SIZE {
            return false;
        }
        self.cart = Some(image.to_vec());
        true
    }

    pub fn remove_cart(&mut self) {
        self.cart = None;
    }
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.ram[addr as usize],
            0x8000..=0x83FF => self.ram1.read(addr & 0x03FF),
            0x8400..=0x87FF => self.ram2.read(addr & 0x03FF),
            0x8800..=0x8BFF => self.rtc.read(addr & 0x001F),
            0x8C00..=0x8FFF => self.storage.read(addr & 0x000F),
            0x9000..=0x93FF => self.serial.read(addr & 0x0003),
            0x9400..=0x97FF => self.via.read(addr & 0x000F),
            0x9800..=0x9BFF => self.sound.read(addr & 0x001F),
            0x9C00..=0x9FFF => self.video.read(addr & 0x0001),
            0xA000..=0xFFFF => match &self.cart {
                Some(cart) if addr >= 0xC000 => cart[(addr - 0xC000) as usize],
                _ => self.rom[(addr - 0x8000) as usize],
            },
        }
    }

    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x7FFF => self.ram[addr as usize] = data,
            0x8000..=0x83FF => self.ram1.write(addr & 0x03FF, data),
            0x8400..=0x87FF => self.ram2.write(addr & 0x03FF, data),
            0x8800..=0x8BFF => self.rtc.write(addr & 0x001F, data),
            0x8C00..=0x8FFF => self.storage.write(addr & 0x000F, data),
            0x9000..=0x93FF => self.serial.write(addr & 0x0003, data),
            0x9400..=0x97FF => self.via.write(addr & 0x000F, data),
            0x9800..=0x9BFF => self.sound.write(addr & 0x001F, data),
            0x9C00..=0x9FFF => self.video.write(addr & 0x0001, data),
            0xA000..=0xFFFF => {} // ROM and cart are write-immune
        }
    }

    fn check_interrupts(&self) -> InterruptState {
        InterruptState {
            nmi: self.rtc.nmi_asserted(),
            irq: self.via.irq() || self.serial.irq() || self.rtc.irq() || self.video.irq(),
        }
    }
}

type RenderCallback = Box<dyn FnMut(&[u8])>;
type AudioCallback = Box<dyn FnMut(&[f32])>;
type TransmitCallback = Box<dyn FnMut(u8)>;

/// The Halcyon microcomputer: a 65C02 and ten bus participants in
/// lockstep.
///
/// The scheduler ticks the serial card every CPU cycle (baud pacing
/// needs cycle precision) and the remaining cards every `TICK_INTERVAL`
/// cycles. Device interrupts are wired by polling: the bus ORs each
/// card's interrupt output and the CPU observes the lines at its next
/// instruction boundary. Host outputs (video frame, audio samples,
/// transmitted serial bytes) leave through optional callbacks; host
/// inputs arrive through the `receive_serial`/`key_down`/`key_up`/
/// `set_joystick` methods between ticks.
pub struct HalcyonSystem {
    pub cpu: W65c02,
    pub bus: SystemBus,

    config: MachineConfig,
    clock: u64,
    alive: bool,

    last_pump: Option<Instant>,
    /// Fractional cycles owed to the wall clock.
    pending_cycles: f64,

    render: Option<RenderCallback>,
    audio: Option<AudioCallback>,
    transmit: Option<TransmitCallback>,

    // Input attachments, shared with the VIA's port lists
    keyboard_matrix: Rc<RefCell<KeyboardMatrix>>,
    keyboard_encoder: Rc<RefCell<KeyboardEncoder>>,
    joystick: Rc<RefCell<Joystick>>,
}

/// Wall-clock catch-up ceiling, in seconds of owed CPU time.
const CATCH_UP_CEILING: f64 = 0.25;

impl HalcyonSystem {
    pub fn new(config: MachineConfig) -> Self {
        let mut bus = SystemBus::new(config.sample_rate);
        bus.serial.set_baud_override(config.baud_override);

        let keyboard_matrix = Rc::new(RefCell::new(KeyboardMatrix::new(1)));
        let keyboard_encoder = Rc::new(RefCell::new(KeyboardEncoder::new(0)));
        let joystick = Rc::new(RefCell::new(Joystick::new(JoystickPort::B, 2)));

        // The matrix and encoder straddle both ports (columns out on B,
        // rows/data in on A); the joystick hangs off Port B
        bus.via
            .attach_port_a(keyboard_encoder.clone() as AttachmentRef);
        bus.via
            .attach_port_b(keyboard_encoder.clone() as AttachmentRef);
        bus.via
            .attach_port_a(keyboard_matrix.clone() as AttachmentRef);
        bus.via
            .attach_port_b(keyboard_matrix.clone() as AttachmentRef);
        bus.via.attach_port_b(joystick.clone() as AttachmentRef);

        Self {
            cpu: W65c02::new(),
            bus,
            config,
            clock: 0,
            alive: true,
            last_pump: None,
            pending_cycles: 0.0,
            render: None,
            audio: None,
            transmit: None,
            keyboard_matrix,
            keyboard_encoder,
            joystick,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    // ---- Host callbacks ----

    pub fn set_render_callback(&mut self, callback: impl FnMut(&[u8]) + 'static) {
        self.render = Some(Box::new(callback));
    }

    pub fn set_audio_callback(&mut self, callback: impl FnMut(&[f32]) + 'static) {
        self.audio = Some(Box::new(callback));
    }

    pub fn set_transmit_callback(&mut self, callback: impl FnMut(u8) + 'static) {
        self.transmit = Some(Box::new(callback));
    }

    // ---- Host inputs ----

    pub fn receive_serial(&mut self, byte: u8) {
        self.bus.serial.receive(byte);
    }

    pub fn key_down(&mut self, code: u8) {
        self.keyboard_matrix.borrow_mut().key_event(code, true);
        self.keyboard_encoder.borrow_mut().key_event(code, true);
    }

    pub fn key_up(&mut self, code: u8) {
        self.keyboard_matrix.borrow_mut().key_event(code, false);
        self.keyboard_encoder.borrow_mut().key_event(code, false);
    }

    pub fn set_joystick(&mut self, mask: u8) {
        self.joystick.borrow_mut().set_buttons(mask);
    }

    // ---- Media ----

    pub fn load_rom(&mut self, image: &[u8]) {
        if !self.bus.load_rom(image) {
            warn!(
                "ROM image refused: expected {} bytes, got {}",
                ROM_SIZE,
                image.len()
            );
        }
    }

    pub fn load_cart(&mut self, image: &[u8]) {
        if !self.bus.load_cart(image) {
            warn!(
                "cartridge image refused: expected {} bytes, got {}",
                CART_SIZE,
                image.len()
            );
        }
    }

    /// Load the CF backing file named in the config, if any. A missing
    /// or wrong-sized file leaves the store empty.
    pub fn attach_storage(&mut self) {
        let Some(path) = self.config.storage_path.clone() else {
            return;
        };
        match media::load_backing_file(&path) {
            Ok(contents) => {
                self.bus.storage.load_contents(&contents);
                info!("loaded CF backing file {}", path.display());
            }
            Err(e) => warn!("CF backing file ignored: {e}"),
        }
    }

    /// Save the CF store to the configured backing file, creating it if
    /// necessary. Called at normal shutdown; failures are logged.
    pub fn save_storage(&mut self) {
        let Some(path) = self.config.storage_path.clone() else {
            return;
        };
        if let Err(e) = media::save_backing_file(&path, self.bus.storage.contents()) {
            warn!("failed to save CF backing file: {e}");
        } else {
            info!("saved CF backing file {}", path.display());
        }
    }

    pub fn save_storage_to(&mut self, path: &Path) -> Result<(), media::MediaError> {
        media::save_backing_file(path, self.bus.storage.contents())
    }

    // ---- Lifecycle ----

    pub fn reset(&mut self, kind: ResetKind) {
        let cold = kind == ResetKind::Cold;
        if cold {
            self.bus.ram.fill(0);
        }
        self.bus.ram1.reset(cold);
        self.bus.ram2.reset(cold);
        self.bus.rtc.reset(cold, Some(host_time()));
        self.bus.storage.reset(cold);
        self.bus.serial.reset(cold);
        self.bus.via.reset(cold);
        self.bus.sound.reset(cold);
        self.bus.video.reset(cold);
        // Vector fetch last, so the CPU sees the reset device state
        self.cpu.reset(&mut self.bus);
        info!("{kind:?} reset, PC=0x{:04X}", self.cpu.pc);
    }

    /// Stop the machine: the host loop observes `is_alive()` and a
    /// `pump()` in flight finishes early.
    pub fn end(&mut self) {
        self.alive = false;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    // ---- Scheduler ----

    /// Advance one CPU cycle and fan out the device ticks.
    pub fn tick(&mut self) {
        self.cpu.tick(&mut self.bus);

        // Serial needs cycle-precise pacing
        self.bus.serial.tick(self.config.cpu_frequency_hz);
        if let Some(byte) = self.bus.serial.take_transmit() {
            if let Some(callback) = self.transmit.as_mut() {
                callback(byte);
            }
        }

        self.clock += 1;
        if self.clock % TICK_INTERVAL == 0 {
            let frequency = self.config.cpu_frequency_hz;
            self.bus.video.tick(frequency);
            self.bus.sound.tick(frequency);
            self.bus.via.tick(frequency);
            self.bus.rtc.tick(frequency);

            let frame_done = match self.bus.video.take_frame() {
                Some(frame) => {
                    if let Some(callback) = self.render.as_mut() {
                        callback(frame);
                    }
                    true
                }
                None => false,
            };
            if frame_done {
                let samples = self.bus.sound.drain_audio();
                if !samples.is_empty() {
                    if let Some(callback) = self.audio.as_mut() {
                        callback(&samples);
                    }
                }
            }
        }
    }

    /// Run exactly one video frame's worth of CPU cycles.
    pub fn run_frame(&mut self) {
        let cycles = self.config.cpu_frequency_hz as u64 / 60;
        for _ in 0..cycles {
            self.tick();
        }
    }

    /// Wall-clock catch-up: run the cycles owed since the previous call,
    /// clamped at the catch-up ceiling, carrying the fractional
    /// remainder. Call this from the host loop between event polls.
    pub fn pump(&mut self) {
        let now = Instant::now();
        let Some(last) = self.last_pump.replace(now) else {
            return; // first call establishes the epoch
        };
        if !self.alive {
            return;
        }

        let frequency = self.config.cpu_frequency_hz as f64;
        self.pending_cycles += now.duration_since(last).as_secs_f64() * frequency;
        let ceiling = frequency * CATCH_UP_CEILING;
        if self.pending_cycles > ceiling {
            self.pending_cycles = ceiling;
        }

        let owed = self.pending_cycles as u64;
        self.pending_cycles -= owed as f64;
        for _ in 0..owed {
            if !self.alive {
                break;
            }
            self.tick();
        }
    }
}

/// Current host wall-clock time as RTC seed fields.
fn host_time() -> RtcTime {
    let now = chrono::Local::now();
    RtcTime {
        year: now.year() as u16,
        month: now.month() as u8,
        day: now.day() as u8,
        weekday: now.weekday().number_from_sunday() as u8,
        hour: now.hour() as u8,
        minute: now.minute() as u8,
        second: now.second() as u8,
    }
}
