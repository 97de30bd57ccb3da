use halcyon_core::device::joystick;
use sdl2::keyboard::Scancode;

/// Translate an SDL scancode to the HID usage code the core's keyboard
/// attachments consume. SDL scancodes are themselves HID usages for the
/// keys this machine has, so the table is mostly a pass-through with an
/// explicit allowlist.
pub fn scancode_to_hid(scancode: Scancode) -> Option<u8> {
    let code = scancode as i32;
    match code {
        // Letters, digits, editing, symbols, caps, F1-F12
        0x04..=0x45 => Some(code as u8),
        // Arrows
        0x4F..=0x52 => Some(code as u8),
        // Application (menu) key
        0x65 => Some(code as u8),
        // Modifiers
        0xE0..=0xE7 => Some(code as u8),
        _ => None,
    }
}

/// Joystick-on-keyboard mapping: arrows plus Z/X/RShift/Return.
/// Returns the button bit for keys that act as the stick.
pub fn scancode_to_joystick(scancode: Scancode) -> Option<u8> {
    match scancode {
        Scancode::Up => Some(joystick::BUTTON_UP),
        Scancode::Down => Some(joystick::BUTTON_DOWN),
        Scancode::Left => Some(joystick::BUTTON_LEFT),
        Scancode::Right => Some(joystick::BUTTON_RIGHT),
        Scancode::Z => Some(joystick::BUTTON_A),
        Scancode::X => Some(joystick::BUTTON_B),
        Scancode::RShift => Some(joystick::BUTTON_SELECT),
        Scancode::Return => Some(joystick::BUTTON_START),
        _ => None,
    }
}
