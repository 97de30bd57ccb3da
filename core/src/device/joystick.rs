use super::via6522::ViaAttachment;

/// Which VIA port the joystick is wired to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JoystickPort {
    A,
    B,
}

// Button bits in the host-facing mask (active-high on the way in,
// active-low on the port).
pub const BUTTON_UP: u8 = 0x01;
pub const BUTTON_DOWN: u8 = 0x02;
pub const BUTTON_LEFT: u8 = 0x04;
pub const BUTTON_RIGHT: u8 = 0x08;
pub const BUTTON_A: u8 = 0x10;
pub const BUTTON_B: u8 = 0x20;
pub const BUTTON_SELECT: u8 = 0x40;
pub const BUTTON_START: u8 = 0x80;

/// Joystick attachment: an 8-bit button state presented active-low on
/// its configured port.
pub struct Joystick {
    port: JoystickPort,
    buttons: u8,
    priority: u8,
}

impl Joystick {
    pub fn new(port: JoystickPort, priority: u8) -> Self {
        Self {
            port,
            buttons: 0,
            priority,
        }
    }
}

impl ViaAttachment for Joystick {
    fn reset(&mut self) {
        self.buttons = 0;
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn read_port_a(&mut self, _ddr: u8, _or: u8) -> u8 {
        if self.port == JoystickPort::A {
            !self.buttons
        } else {
            0xFF
        }
    }

    fn read_port_b(&mut self, _ddr: u8, _or: u8) -> u8 {
        if self.port == JoystickPort::B {
            !self.buttons
        } else {
            0xFF
        }
    }

    fn set_buttons(&mut self, mask: u8) {
        self.buttons = mask;
    }
}
