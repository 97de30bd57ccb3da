use super::hid;
use super::via6522::ViaAttachment;

/// Keyboard matrix attachment
///
/// 8 rows by 8 columns of key switches wired across the VIA ports: the
/// firmware drives column-select lines on Port B (active-low) and reads
/// the row lines on Port A (a pressed key in a selected column pulls its
/// row low).
///
/// Matrix layout (row, column):
///
/// | Row | Columns 0-7                                  |
/// |-----|----------------------------------------------|
/// | 0   | A B C D E F G H                              |
/// | 1   | I J K L M N O P                              |
/// | 2   | Q R S T U V W X                              |
/// | 3   | Y Z 1 2 3 4 5 6                              |
/// | 4   | 7 8 9 0 Enter Esc Backspace Tab              |
/// | 5   | Space - = [ ] \ ; '                          |
/// | 6   | ` , . / Up Down Left Right                   |
/// | 7   | Shift Ctrl Alt GUI Caps FN - -               |
///
/// There are no physical function keys: F1..F10 are synthesized as the
/// FN position plus the corresponding digit.
pub struct KeyboardMatrix {
    /// Bit `col` of `keys[row]` is set while the switch is closed.
    keys: [u8; 8],
    /// Columns currently selected by the firmware (decoded active-low
    /// from Port B writes; only CPU-driven bits participate).
    selected_columns: u8,
    priority: u8,
}

const ROW_MODIFIERS: u8 = 7;
const COL_SHIFT: u8 = 0;
const COL_CTRL: u8 = 1;
const COL_ALT: u8 = 2;
const COL_GUI: u8 = 3;
const COL_CAPS: u8 = 4;
const COL_FN: u8 = 5;

impl KeyboardMatrix {
    pub fn new(priority: u8) -> Self {
        Self {
            keys: [0; 8],
            selected_columns: 0,
            priority,
        }
    }

    /// Matrix position for a HID usage, when it has a direct switch.
    fn position(code: u8) -> Option<(u8, u8)> {
        Some(match code {
            // Rows 0-2: letters A-X, eight per row
            hid::KEY_A..=0x1B => {
                let index = code - hid::KEY_A;
                (index / 8, index % 8)
            }
            // Row 3: Y Z 1-6
            0x1C => (3, 0),
            0x1D => (3, 1),
            hid::KEY_1..=0x23 => (3, 2 + (code - hid::KEY_1)),
            // Row 4: 7 8 9 0 Enter Esc Backspace Tab
            0x24..=hid::KEY_0 => (4, code - 0x24),
            hid::KEY_ENTER => (4, 4),
            hid::KEY_ESCAPE => (4, 5),
            hid::KEY_BACKSPACE => (4, 6),
            hid::KEY_TAB => (4, 7),
            // Row 5: Space - = [ ] \ ; '
            hid::KEY_SPACE => (5, 0),
            hid::KEY_MINUS => (5, 1),
            hid::KEY_EQUAL => (5, 2),
            hid::KEY_LEFT_BRACKET => (5, 3),
            hid::KEY_RIGHT_BRACKET => (5, 4),
            hid::KEY_BACKSLASH => (5, 5),
            hid::KEY_SEMICOLON => (5, 6),
            hid::KEY_APOSTROPHE => (5, 7),
            // Row 6: ` , . / arrows
            hid::KEY_GRAVE => (6, 0),
            hid::KEY_COMMA => (6, 1),
            hid::KEY_PERIOD => (6, 2),
            hid::KEY_SLASH => (6, 3),
            hid::KEY_UP => (6, 4),
            hid::KEY_DOWN => (6, 5),
            hid::KEY_LEFT => (6, 6),
            hid::KEY_RIGHT => (6, 7),
            // Row 7: modifiers
            hid::KEY_LEFT_SHIFT | hid::KEY_RIGHT_SHIFT => (ROW_MODIFIERS, COL_SHIFT),
            hid::KEY_LEFT_CTRL | hid::KEY_RIGHT_CTRL => (ROW_MODIFIERS, COL_CTRL),
            hid::KEY_LEFT_ALT | hid::KEY_RIGHT_ALT => (ROW_MODIFIERS, COL_ALT),
            hid::KEY_LEFT_GUI | hid::KEY_RIGHT_GUI | hid::KEY_MENU => (ROW_MODIFIERS, COL_GUI),
            hid::KEY_CAPS_LOCK => (ROW_MODIFIERS, COL_CAPS),
            _ => return None,
        })
    }

    /// The digit switch standing in for a function key: F1..F9 map to
    /// 1..9, F10 to 0.
    fn function_digit(index: u8) -> Option<(u8, u8)> {
        match index {
            1..=6 => Some((3, 2 + (index - 1))),
            7..=9 => Some((4, index - 7)),
            10 => Some((4, 3)),
            _ => None,
        }
    }

    fn set_key(&mut self, row: u8, col: u8, pressed: bool) {
        if pressed {
            self.keys[row as usize] |= 1 << col;
        } else {
            self.keys[row as usize] &= !(1 << col);
        }
    }
}

impl ViaAttachment for KeyboardMatrix {
    fn reset(&mut self) {
        self.keys = [0; 8];
        self.selected_columns = 0;
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    /// Row lines, active-low: a pressed key in any selected column pulls
    /// its row low.
    fn read_port_a(&mut self, _ddr: u8, _or: u8) -> u8 {
        let mut rows = 0xFF;
        for (row, &keys) in self.keys.iter().enumerate() {
            if keys & self.selected_columns != 0 {
                rows &= !(1 << row);
            }
        }
        rows
    }

    /// Column select latch: the firmware writes the columns it wants to
    /// scan low. Bits the CPU is not driving float high (unselected).
    fn write_port_b(&mut self, value: u8, ddr: u8) {
        self.selected_columns = !value & ddr;
    }

    fn key_event(&mut self, code: u8, pressed: bool) {
        if let Some(index) = hid::function_key(code) {
            // Synthesized: FN plus the matching digit
            if let Some((row, col)) = Self::function_digit(index) {
                self.set_key(ROW_MODIFIERS, COL_FN, pressed);
                self.set_key(row, col, pressed);
            }
            return;
        }
        if let Some((row, col)) = Self::position(code) {
            self.set_key(row, col, pressed);
        }
    }
}
