pub mod bus;

pub use bus::{Bus, InterruptState};

/// Number of CPU cycles between ticks of the coarse-scheduled cards
/// (video, sound, VIA, RTC). The serial card is ticked every cycle for
/// baud precision. Devices that derive internal rates from elapsed CPU
/// time assume each `tick()` call represents this many cycles.
pub const TICK_INTERVAL: u64 = 128;
