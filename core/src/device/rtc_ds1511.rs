use crate::core::TICK_INTERVAL;

/// DS1511-style real-time clock
///
/// 32 register locations (offset masked to 5 bits):
///
/// | Offset    | Register                                         |
/// |-----------|--------------------------------------------------|
/// | 0x00-0x07 | Time: sec, min, hour, day, date, month, year, century (BCD) |
/// | 0x08-0x0B | Alarm: sec, min, hour, day/date (AM mask in bit 7, DY/DT in bit 6 of 0x0B) |
/// | 0x0C-0x0D | Watchdog: hundredths/tenths, seconds/ten-seconds (BCD) |
/// | 0x0E      | Control A (flags; reading clears the low four bits) |
/// | 0x0F      | Control B (enables)                              |
/// | 0x10      | Auxiliary RAM address                            |
/// | 0x13      | Auxiliary RAM data (post-increments when BME set) |
///
/// The chip keeps two copies of the time: the internal counting registers
/// and the user-visible ones. While TE is set, the internal copy is
/// re-published to the user registers each second, and user writes are
/// committed to the internal registers after a settling window of about
/// 366 us of CPU time. With TE clear the copies are frozen apart, so
/// firmware can read or load a coherent set of fields.
///
/// The month register shares its upper bits with the oscillator controls
/// (EOSC/E32K); they are stored and returned but the emulated oscillator
/// never stops.
pub struct RtcDs1511 {
    internal: TimeRegs,
    user: TimeRegs,

    alarm: [u8; 4],
    watchdog: [u8; 2],
    ctrl_a: u8,
    ctrl_b: u8,

    ram: [u8; 256],
    ram_addr: u8,

    /// Centiseconds left on the watchdog countdown.
    watchdog_count: u32,
    nmi_line: bool,

    // Cycle accumulators for the 1 Hz, 100 Hz, and settle-window clocks
    second_acc: u64,
    watchdog_acc: u64,
    commit_pending: bool,
    commit_acc: u64,
}

/// BCD time fields as they sit in the register file.
#[derive(Clone, Copy, Default)]
struct TimeRegs {
    seconds: u8,
    minutes: u8,
    hours: u8,
    day: u8, // day of week, 1-7
    date: u8,
    month: u8, // low 5 bits BCD month; upper bits EOSC/E32K
    year: u8,
    century: u8,
}

/// Wall-clock value used to seed the RTC at cold start. Provided by the
/// host layer; the core performs no host-time lookups itself.
#[derive(Clone, Copy, Debug)]
pub struct RtcTime {
    pub year: u16, // full year, e.g. 2026
    pub month: u8, // 1-12
    pub day: u8,   // 1-31
    pub weekday: u8, // 1-7
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

// Control A flag bits (low nibble clears on read)
pub const CTRL_A_IRQF: u8 = 0x01;
pub const CTRL_A_WDF: u8 = 0x02;
pub const CTRL_A_KSF: u8 = 0x04;
pub const CTRL_A_TDF: u8 = 0x08;

// Control B bits
pub const CTRL_B_WDS: u8 = 0x01; // Watchdog steers to NMI when set
pub const CTRL_B_WDE: u8 = 0x02; // Watchdog enable
pub const CTRL_B_TIE: u8 = 0x04; // Alarm (time-of-day) interrupt enable
pub const CTRL_B_BME: u8 = 0x20; // Burst mode: RAM address auto-increment
pub const CTRL_B_TE: u8 = 0x80; // Transfer enable

/// Settling window between a user time write and its commit to the
/// internal registers, in microseconds.
const COMMIT_SETTLE_US: u64 = 366;

impl RtcDs1511 {
    pub fn new() -> Self {
        Self {
            internal: TimeRegs::default(),
            user: TimeRegs::default(),
            alarm: [0; 4],
            watchdog: [0; 2],
            ctrl_a: 0,
            ctrl_b: 0,
            ram: [0; 256],
            ram_addr: 0,
            watchdog_count: 0,
            nmi_line: false,
            second_acc: 0,
            watchdog_acc: 0,
            commit_pending: false,
            commit_acc: 0,
        }
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x1F {
            0x00 => self.user.seconds,
            0x01 => self.user.minutes,
            0x02 => self.user.hours,
            0x03 => self.user.day,
            0x04 => self.user.date,
            0x05 => self.user.month,
            0x06 => self.user.year,
            0x07 => self.user.century,
            0x08..=0x0B => self.alarm[(offset as usize & 0x1F) - 0x08],
            0x0C => self.watchdog[0],
            0x0D => self.watchdog[1],
            0x0E => {
                let value = self.ctrl_a;
                self.ctrl_a &= 0xF0;
                self.nmi_line = false;
                value
            }
            0x0F => self.ctrl_b,
            0x10 => self.ram_addr,
            0x13 => {
                let value = self.ram[self.ram_addr as usize];
                if self.ctrl_b & CTRL_B_BME != 0 {
                    self.ram_addr = self.ram_addr.wrapping_add(1);
                }
                value
            }
            _ => 0,
        }
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x1F {
            0x00..=0x07 => {
                match offset & 0x07 {
                    0x00 => self.user.seconds = value & 0x7F,
                    0x01 => self.user.minutes = value & 0x7F,
                    0x02 => self.user.hours = value & 0x3F,
                    0x03 => self.user.day = value & 0x07,
                    0x04 => self.user.date = value & 0x3F,
                    0x05 => self.user.month = value,
                    0x06 => self.user.year = value,
                    _ => self.user.century = value,
                }
                if self.ctrl_b & CTRL_B_TE != 0 {
                    self.commit_pending = true;
                    self.commit_acc = 0;
                }
            }
            0x08..=0x0B => self.alarm[(offset as usize & 0x1F) - 0x08] = value,
            0x0C => {
                self.watchdog[0] = value;
                self.reload_watchdog();
            }
            0x0D => {
                self.watchdog[1] = value;
                self.reload_watchdog();
            }
            0x0E => self.ctrl_a = (value & 0xF0) | (self.ctrl_a & 0x0F),
            0x0F => self.ctrl_b = value,
            0x10 => self.ram_addr = value,
            0x13 => {
                self.ram[self.ram_addr as usize] = value;
                if self.ctrl_b & CTRL_B_BME != 0 {
                    self.ram_addr = self.ram_addr.wrapping_add(1);
                }
            }
            _ => {}
        }
    }

    /// Advance by one scheduler tick (`TICK_INTERVAL` CPU cycles).
    pub fn tick(&mut self, frequency: u32) {
        let frequency = frequency as u64;

        // Pending user->internal transfer
        if self.commit_pending {
            self.commit_acc += TICK_INTERVAL;
            if self.commit_acc >= frequency * COMMIT_SETTLE_US / 1_000_000 {
                self.commit_pending = false;
                if self.ctrl_b & CTRL_B_TE != 0 {
                    self.internal = self.user;
                }
            }
        }

        // 1 Hz clock
        self.second_acc += TICK_INTERVAL;
        while self.second_acc >= frequency {
            self.second_acc -= frequency;
            self.advance_second();
        }

        // 100 Hz watchdog clock
        if self.ctrl_b & CTRL_B_WDE != 0 && self.watchdog_count > 0 {
            self.watchdog_acc += TICK_INTERVAL;
            let centisecond = frequency / 100;
            while self.watchdog_acc >= centisecond && self.watchdog_count > 0 {
                self.watchdog_acc -= centisecond;
                self.watchdog_count -= 1;
                if self.watchdog_count == 0 {
                    self.expire_watchdog();
                }
            }
        }
    }

    fn expire_watchdog(&mut self) {
        self.ctrl_a |= CTRL_A_WDF;
        if self.ctrl_b & CTRL_B_WDS != 0 {
            // Reset-steered: pulse NMI and disarm
            self.nmi_line = true;
            self.ctrl_b &= !CTRL_B_WDE;
        } else {
            self.ctrl_a |= CTRL_A_IRQF;
        }
    }

    fn reload_watchdog(&mut self) {
        let seconds = from_bcd(self.watchdog[1]) as u32;
        let centi = from_bcd(self.watchdog[0]) as u32;
        self.watchdog_count = seconds * 100 + centi;
        self.watchdog_acc = 0;
    }

    fn advance_second(&mut self) {
        let t = &mut self.internal;
        t.seconds = bcd_increment(t.seconds);
        if from_bcd(t.seconds) >= 60 {
            t.seconds = 0;
            t.minutes = bcd_increment(t.minutes);
            if from_bcd(t.minutes) >= 60 {
                t.minutes = 0;
                t.hours = bcd_increment(t.hours);
                if from_bcd(t.hours) >= 24 {
                    t.hours = 0;
                    t.day = if from_bcd(t.day) >= 7 { 1 } else { bcd_increment(t.day) };
                    let year =
                        from_bcd(t.century) as u16 * 100 + from_bcd(t.year) as u16;
                    let month = from_bcd(t.month & 0x1F);
                    if from_bcd(t.date) >= days_in_month(month, year) {
                        t.date = 1;
                        t.month = (t.month & 0xE0) | bcd_increment(t.month & 0x1F);
                        if from_bcd(t.month & 0x1F) > 12 {
                            t.month = (t.month & 0xE0) | 1;
                            t.year = bcd_increment(t.year);
                            if from_bcd(t.year) >= 100 {
                                t.year = 0;
                                t.century = bcd_increment(t.century);
                            }
                        }
                    } else {
                        t.date = bcd_increment(t.date);
                    }
                }
            }
        }

        self.check_alarm();

        if self.ctrl_b & CTRL_B_TE != 0 {
            // Re-publish, preserving the oscillator bits the user wrote
            let eosc = self.user.month & 0xE0;
            self.user = self.internal;
            self.user.month = (self.user.month & 0x1F) | eosc;
        }
    }

    fn check_alarm(&mut self) {
        let masks = self.alarm.map(|r| r & 0x80 != 0);
        if masks.iter().all(|&m| m) {
            return; // all four AM bits set: alarm disabled
        }

        let day_or_date = if self.alarm[3] & 0x40 != 0 {
            self.internal.day
        } else {
            self.internal.date
        };
        let fields = [
            (self.alarm[0] & 0x7F, self.internal.seconds),
            (self.alarm[1] & 0x7F, self.internal.minutes),
            (self.alarm[2] & 0x3F, self.internal.hours),
            (self.alarm[3] & 0x3F, day_or_date),
        ];
        let matched = fields
            .iter()
            .zip(&masks)
            .all(|(&(alarm, time), &masked)| masked || alarm == time);

        if matched {
            self.ctrl_a |= CTRL_A_TDF;
            if self.ctrl_b & CTRL_B_TIE != 0 {
                self.ctrl_a |= CTRL_A_IRQF;
            }
        }
    }

    /// IRQ line to the CPU: asserted while IRQF is set.
    pub fn irq(&self) -> bool {
        self.ctrl_a & CTRL_A_IRQF != 0
    }

    /// NMI line: asserted by watchdog expiry when WDS steers to reset.
    pub fn nmi_asserted(&self) -> bool {
        self.nmi_line
    }

    /// Cold reset seeds the clock from the host wall clock and sets the
    /// kickstart flag. Warm reset clears the flag bits but preserves time
    /// and RAM.
    pub fn reset(&mut self, cold: bool, now: Option<RtcTime>) {
        self.ctrl_a &= 0xF0;
        self.nmi_line = false;
        self.commit_pending = false;
        self.watchdog_acc = 0;
        if !cold {
            return;
        }

        let now = now.unwrap_or(RtcTime {
            year: 2000,
            month: 1,
            day: 1,
            weekday: 7,
            hour: 0,
            minute: 0,
            second: 0,
        });
        self.internal = TimeRegs {
            seconds: to_bcd(now.second),
            minutes: to_bcd(now.minute),
            hours: to_bcd(now.hour),
            day: to_bcd(now.weekday),
            date: to_bcd(now.day),
            month: to_bcd(now.month),
            year: to_bcd((now.year % 100) as u8),
            century: to_bcd((now.year / 100) as u8),
        };
        self.user = self.internal;
        self.alarm = [0; 4];
        self.watchdog = [0; 2];
        self.watchdog_count = 0;
        self.ctrl_a = CTRL_A_KSF;
        self.ctrl_b = 0;
        self.ram = [0; 256];
        self.ram_addr = 0;
        self.second_acc = 0;
    }
}

impl Default for RtcDs1511 {
    fn default() -> Self {
        Self::new()
    }
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn bcd_increment(value: u8) -> u8 {
    to_bcd(from_bcd(value) + 1)
}

fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap { 29 } else { 28 }
        }
        _ => 31,
    }
}
