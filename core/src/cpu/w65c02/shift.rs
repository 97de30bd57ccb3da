use super::{StatusFlag, W65c02};
use crate::core::Bus;

impl W65c02 {
    /// Read-modify-write to memory. The hardware performs a second read of
    /// the target during the modify cycle; it is issued here so I/O-mapped
    /// targets observe it.
    pub(crate) fn rmw<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        addr: u16,
        op: fn(&mut Self, u8) -> u8,
    ) {
        let value = bus.read(addr);
        bus.read(addr);
        let result = op(self, value);
        bus.write(addr, result);
    }

    /// ASL: bit 7 -> C, shift left, 0 -> bit 0.
    pub(crate) fn perform_asl(&mut self, value: u8) -> u8 {
        self.set_flag(StatusFlag::C, value & 0x80 != 0);
        let result = value << 1;
        self.set_nz(result);
        result
    }

    /// LSR: bit 0 -> C, shift right, 0 -> bit 7.
    pub(crate) fn perform_lsr(&mut self, value: u8) -> u8 {
        self.set_flag(StatusFlag::C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_nz(result);
        result
    }

    /// ROL: rotate left through C.
    pub(crate) fn perform_rol(&mut self, value: u8) -> u8 {
        let carry_in = self.flag(StatusFlag::C) as u8;
        self.set_flag(StatusFlag::C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_nz(result);
        result
    }

    /// ROR: rotate right through C.
    pub(crate) fn perform_ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.flag(StatusFlag::C) as u8) << 7;
        self.set_flag(StatusFlag::C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_nz(result);
        result
    }

    pub(crate) fn perform_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.set_nz(result);
        result
    }

    pub(crate) fn perform_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.set_nz(result);
        result
    }
}
