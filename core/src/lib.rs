pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::{Bus, InterruptState, TICK_INTERVAL, bus};
    pub use crate::cpu::W65c02;
}
