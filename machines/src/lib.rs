pub mod config;
pub mod media;
pub mod system;

pub use config::MachineConfig;
pub use system::{HalcyonSystem, ResetKind, SystemBus};
