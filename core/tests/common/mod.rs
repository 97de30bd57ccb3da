use halcyon_core::core::{Bus, InterruptState};

/// Minimal bus for testing: flat 64KB read/write memory with
/// directly controllable interrupt lines.
pub struct TestBus {
    pub memory: Box<[u8; 0x10000]>,
    pub nmi_line: bool,
    pub irq_line: bool,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            nmi_line: false,
            irq_line: false,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn check_interrupts(&self) -> InterruptState {
        InterruptState {
            nmi: self.nmi_line,
            irq: self.irq_line,
        }
    }
}
