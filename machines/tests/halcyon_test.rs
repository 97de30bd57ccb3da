use std::cell::Cell;
use std::rc::Rc;

use halcyon_core::core::Bus;
use halcyon_machines::{HalcyonSystem, MachineConfig, ResetKind, system};

/// ROM image filled with NOPs: reset handler at 0xE000, IRQ handler at
/// 0xF000.
fn nop_rom() -> Vec<u8> {
    let mut rom = vec![0xEA; system::ROM_SIZE];
    rom[0x7FFC] = 0x00; // reset -> 0xE000
    rom[0x7FFD] = 0xE0;
    rom[0x7FFE] = 0x00; // IRQ/BRK -> 0xF000
    rom[0x7FFF] = 0xF0;
    rom
}

fn machine_with_rom(rom: &[u8]) -> HalcyonSystem {
    let mut machine = HalcyonSystem::new(MachineConfig::default());
    machine.load_rom(rom);
    machine.reset(ResetKind::Cold);
    machine
}

// ==========================================================================
// Address decode
// ==========================================================================

#[test]
fn test_system_ram_read_write() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.bus.write(0x0000, 0x11);
    machine.bus.write(0x7FFF, 0x22);
    assert_eq!(machine.bus.read(0x0000), 0x11);
    assert_eq!(machine.bus.read(0x7FFF), 0x22);
}

/// ROM is write-immune across the whole region.
#[test]
fn test_rom_is_write_immune() {
    let mut rom = nop_rom();
    rom[0x2000] = 0x77; // 0xA000 on the bus
    let mut machine = machine_with_rom(&rom);

    for addr in [0xA000u16, 0xC123, 0xFFFB] {
        let before = machine.bus.read(addr);
        machine.bus.write(addr, before.wrapping_add(1));
        assert_eq!(machine.bus.read(addr), before, "address {addr:04X}");
    }
    assert_eq!(machine.bus.read(0xA000), 0x77);
}

#[test]
fn test_cart_overlays_upper_rom() {
    let mut machine = machine_with_rom(&nop_rom());
    assert_eq!(machine.bus.read(0xC000), 0xEA);

    let cart = vec![0x55; system::CART_SIZE];
    machine.load_cart(&cart);
    assert_eq!(machine.bus.read(0xC000), 0x55);
    assert_eq!(machine.bus.read(0xFFFB), 0x55);
    // Below the cart window the ROM still decodes
    assert_eq!(machine.bus.read(0xA000), 0xEA);

    machine.bus.remove_cart();
    assert_eq!(machine.bus.read(0xC000), 0xEA);
}

#[test]
fn test_wrong_sized_images_are_refused() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.load_rom(&vec![0x00; 1234]);
    assert_eq!(machine.bus.read(0xA000), 0xEA, "short ROM must be refused");
    machine.load_cart(&vec![0x00; 1234]);
    assert_eq!(machine.bus.read(0xC000), 0xEA, "short cart must be refused");
}

/// Banked RAM behind the two card windows: bank-local round trips, bank
/// independence, and card independence.
#[test]
fn test_banked_ram_windows() {
    let mut machine = machine_with_rom(&nop_rom());

    machine.bus.write(0x8000, 0xA1); // card 1, bank 0
    machine.bus.write(0x83FF, 0x01); // card 1: select bank 1
    machine.bus.write(0x8000, 0xA2);
    machine.bus.write(0x8400, 0xB1); // card 2 untouched by card 1 banking
    assert_eq!(machine.bus.read(0x87FF), 0x00); // card 2 still on bank 0
    assert_eq!(machine.bus.read(0x8400), 0xB1);

    assert_eq!(machine.bus.read(0x8000), 0xA2);
    machine.bus.write(0x83FF, 0x00);
    assert_eq!(machine.bus.read(0x8000), 0xA1);
}

#[test]
fn test_device_partial_decode() {
    let mut machine = machine_with_rom(&nop_rom());
    // The serial card decodes 2 bits: 0x9000 and 0x9004 alias
    machine.bus.write(0x9003, 0x0F); // control register
    assert_eq!(machine.bus.read(0x9007), 0x0F);
}

// ==========================================================================
// Scheduler and interrupts
// ==========================================================================

/// E6 at machine level: T1 expiry raises the VIA IRQ and the CPU enters
/// the handler exactly once.
#[test]
fn test_via_timer_interrupts_cpu() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.bus.write(0x940E, 0xC0); // IER: enable T1
    machine.bus.write(0x9404, 0x01); // T1 latch low
    machine.bus.write(0x9405, 0x00); // T1 high: start

    // Two scheduler rounds of the coarse devices
    for _ in 0..256 {
        machine.tick();
    }

    assert!(machine.bus.via.irq());
    let pc = machine.cpu.pc;
    assert!(
        (0xF000..0xF100).contains(&pc),
        "CPU must be in the IRQ handler, PC={pc:04X}"
    );

    // One-shot timer, I flag set: no re-entry
    let depth = machine.cpu.sp;
    for _ in 0..256 {
        machine.tick();
    }
    assert_eq!(machine.cpu.sp, depth);
}

#[test]
fn test_boot_program_runs() {
    let mut rom = nop_rom();
    // At 0xE000: LDA #$42, STA $0200, loop: JMP loop
    let program = [0xA9, 0x42, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0xE0];
    rom[0x6000..0x6000 + program.len()].copy_from_slice(&program);
    let mut machine = machine_with_rom(&rom);

    for _ in 0..64 {
        machine.tick();
    }
    assert_eq!(machine.bus.read(0x0200), 0x42);
    assert_eq!(machine.cpu.a, 0x42);
}

/// The render callback fires once per video frame with the full RGBA
/// buffer.
#[test]
fn test_render_callback_once_per_frame() {
    let mut machine = machine_with_rom(&nop_rom());
    let frames = Rc::new(Cell::new(0u32));
    {
        let frames = frames.clone();
        machine.set_render_callback(move |buffer| {
            assert_eq!(buffer.len(), 320 * 240 * 4);
            frames.set(frames.get() + 1);
        });
    }

    machine.run_frame();
    machine.run_frame();
    let counted = frames.get();
    assert!((1..=3).contains(&counted), "got {counted} frames");
}

/// Serial transmit leaves through the callback at baud pacing.
#[test]
fn test_serial_transmit_callback() {
    let mut machine = machine_with_rom(&nop_rom());
    let sent = Rc::new(std::cell::RefCell::new(Vec::new()));
    {
        let sent = sent.clone();
        machine.set_transmit_callback(move |byte| sent.borrow_mut().push(byte));
    }

    machine.bus.write(0x9003, 0x0F); // 19200 baud
    machine.bus.write(0x9000, b'H');

    // One frame at 19200 baud is ~1042 cycles
    for _ in 0..2000 {
        machine.tick();
    }
    assert_eq!(*sent.borrow(), vec![b'H']);
}

#[test]
fn test_receive_serial_reaches_acia() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.receive_serial(0x5A);
    assert_ne!(machine.bus.read(0x9001) & 0x08, 0); // RDRF
    assert_eq!(machine.bus.read(0x9000), 0x5A);
}

// ==========================================================================
// Input paths
// ==========================================================================

/// A key press reaches the encoder; the encoded byte is readable on
/// Port A once the firmware enables the encoder via CA2.
#[test]
fn test_keyboard_encoder_path() {
    let mut machine = machine_with_rom(&nop_rom());
    // PCR: CA2 manual output low (bits 3:1 = 110)
    machine.bus.write(0x940C, 0x0C);
    machine.key_down(0x04); // HID 'a'
    for _ in 0..256 {
        machine.tick(); // let the VIA poll at a coarse tick
    }

    // Data-ready edge latched as CA1
    assert_ne!(machine.bus.read(0x940D) & 0x02, 0);
    let value = machine.bus.read(0x9401); // ORA (all inputs)
    assert_eq!(value, b'a');
    // The handshake read cleared the data-ready flag
    assert_eq!(machine.bus.read(0x940D) & 0x02, 0);
}

#[test]
fn test_joystick_reads_active_low_on_port_b() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.set_joystick(0x11); // UP + A
    let value = machine.bus.read(0x9400); // ORB, all inputs
    assert_eq!(value, !0x11);
}

// ==========================================================================
// Lifecycle
// ==========================================================================

#[test]
fn test_cold_reset_clears_ram_warm_preserves() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.bus.write(0x0100, 0x99);

    machine.reset(ResetKind::Warm);
    assert_eq!(machine.bus.read(0x0100), 0x99);

    machine.reset(ResetKind::Cold);
    assert_eq!(machine.bus.read(0x0100), 0x00);
}

#[test]
fn test_end_stops_pump() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.end();
    assert!(!machine.is_alive());
    machine.pump();
    machine.pump();
    assert_eq!(machine.clock(), 0);
}

#[test]
fn test_pump_is_capped_by_catch_up_ceiling() {
    let mut machine = machine_with_rom(&nop_rom());
    machine.pump(); // epoch
    std::thread::sleep(std::time::Duration::from_millis(5));
    machine.pump();

    let clock = machine.clock();
    assert!(clock > 0, "owed cycles must run");
    // Never more than 250 ms worth of cycles per pump
    assert!(clock <= 2_000_000 / 4);
}
