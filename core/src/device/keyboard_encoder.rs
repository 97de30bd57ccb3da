use super::hid;
use super::via6522::ViaAttachment;

/// ASCII keyboard encoder attachment
///
/// Produces one encoded byte per key press on the VIA port(s) it is
/// enabled for, with a data-ready interrupt on the matching control
/// line. Key releases are discarded except for modifier state.
///
/// A port is enabled while its CA2/CB2 line is driven low; the encoder
/// raises CA1 (Port A) or CB1 (Port B) when a byte is ready and drops it
/// when the VIA reports the port data register was read.
///
/// Encoding, in priority order:
///
/// | Keys                   | Output                          |
/// |------------------------|---------------------------------|
/// | Menu/GUI               | 0x80 (0x90 with Alt)            |
/// | F1..F15                | 0x81..0x8F (0x91..0x9F with Alt)|
/// | Ctrl + letter          | 0x01..0x1A                      |
/// | Ctrl + digit/symbol    | control-code table              |
/// | Alt + Shift + key      | 0xA0..0xFF (shifted, high bit)  |
/// | Alt + key              | 0xA0..0xFF (plain, high bit)    |
/// | Shift + key            | uppercase / shifted symbol      |
/// | key                    | plain ASCII                     |
pub struct KeyboardEncoder {
    shift: bool,
    ctrl: bool,
    alt: bool,

    port_a_enabled: bool,
    port_b_enabled: bool,
    port_a: OutputLatch,
    port_b: OutputLatch,

    priority: u8,
}

#[derive(Default)]
struct OutputLatch {
    data: u8,
    ready: bool,
}

impl KeyboardEncoder {
    pub fn new(priority: u8) -> Self {
        Self {
            shift: false,
            ctrl: false,
            alt: false,
            port_a_enabled: false,
            port_b_enabled: false,
            port_a: OutputLatch::default(),
            port_b: OutputLatch::default(),
            priority,
        }
    }

    fn track_modifier(&mut self, code: u8, pressed: bool) -> bool {
        match code {
            hid::KEY_LEFT_SHIFT | hid::KEY_RIGHT_SHIFT => self.shift = pressed,
            hid::KEY_LEFT_CTRL | hid::KEY_RIGHT_CTRL => self.ctrl = pressed,
            hid::KEY_LEFT_ALT | hid::KEY_RIGHT_ALT => self.alt = pressed,
            _ => return false,
        }
        true
    }

    fn encode(&self, code: u8) -> Option<u8> {
        // Menu/GUI keys encode directly
        if matches!(code, hid::KEY_LEFT_GUI | hid::KEY_RIGHT_GUI | hid::KEY_MENU) {
            return Some(if self.alt { 0x90 } else { 0x80 });
        }

        if let Some(index) = hid::function_key(code) {
            if index <= 15 {
                let base = if self.alt { 0x90 } else { 0x80 };
                return Some(base + index);
            }
            return None;
        }

        if self.ctrl {
            if let hid::KEY_A..=hid::KEY_Z = code {
                return Some(code - hid::KEY_A + 1);
            }
            if let Some(control) = control_code(code) {
                return Some(control);
            }
        }

        if self.alt {
            let ascii = if self.shift {
                hid::to_shifted_ascii(code)?
            } else {
                hid::to_ascii(code)?
            };
            return Some(ascii | 0x80);
        }

        if self.shift {
            return hid::to_shifted_ascii(code);
        }
        hid::to_ascii(code)
    }

    fn latch(&mut self, byte: u8) {
        if self.port_a_enabled {
            self.port_a.data = byte;
            self.port_a.ready = true;
        }
        if self.port_b_enabled {
            self.port_b.data = byte;
            self.port_b.ready = true;
        }
    }
}

/// Control codes for Ctrl + non-letter keys, matching the ASCII control
/// row of a terminal keyboard.
fn control_code(code: u8) -> Option<u8> {
    Some(match code {
        0x1F => 0x00,                   // Ctrl-2 -> NUL (Ctrl-@)
        0x23 => 0x1E,                   // Ctrl-6 -> RS (Ctrl-^)
        hid::KEY_MINUS => 0x1F,         // Ctrl-- -> US (Ctrl-_)
        hid::KEY_LEFT_BRACKET => 0x1B,  // Ctrl-[ -> ESC
        hid::KEY_BACKSLASH => 0x1C,     // Ctrl-\ -> FS
        hid::KEY_RIGHT_BRACKET => 0x1D, // Ctrl-] -> GS
        hid::KEY_SPACE => 0x00,         // Ctrl-Space -> NUL
        _ => return None,
    })
}

impl ViaAttachment for KeyboardEncoder {
    fn reset(&mut self) {
        self.shift = false;
        self.ctrl = false;
        self.alt = false;
        self.port_a = OutputLatch::default();
        self.port_b = OutputLatch::default();
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn read_port_a(&mut self, _ddr: u8, _or: u8) -> u8 {
        if self.port_a_enabled {
            self.port_a.data
        } else {
            0xFF
        }
    }

    fn read_port_b(&mut self, _ddr: u8, _or: u8) -> u8 {
        if self.port_b_enabled {
            self.port_b.data
        } else {
            0xFF
        }
    }

    fn update_control_lines(&mut self, _ca1: bool, ca2: bool, _cb1: bool, cb2: bool) {
        self.port_a_enabled = !ca2;
        self.port_b_enabled = !cb2;
    }

    fn clear_interrupts(&mut self, ca1: bool, _ca2: bool, cb1: bool, _cb2: bool) {
        if ca1 {
            self.port_a.ready = false;
        }
        if cb1 {
            self.port_b.ready = false;
        }
    }

    fn has_ca1_interrupt(&self) -> bool {
        self.port_a_enabled && self.port_a.ready
    }

    fn has_cb1_interrupt(&self) -> bool {
        self.port_b_enabled && self.port_b.ready
    }

    fn key_event(&mut self, code: u8, pressed: bool) {
        if self.track_modifier(code, pressed) {
            return;
        }
        if !pressed {
            return; // releases carry no output
        }
        if let Some(byte) = self.encode(code) {
            self.latch(byte);
        }
    }
}
