use std::path::PathBuf;

use serde::Deserialize;

/// Machine configuration, deserializable from the frontend's TOML file.
/// Unset fields take the hardware defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MachineConfig {
    /// CPU clock in Hz.
    pub cpu_frequency_hz: u32,
    /// Host audio sample rate in Hz.
    pub sample_rate: u32,
    /// Forces the serial card's bit rate regardless of the programmed
    /// baud code (matching a fixed-rate host serial port).
    pub baud_override: Option<u32>,
    /// CF backing file, loaded at start and saved at exit.
    pub storage_path: Option<PathBuf>,
    /// Start with a warm reset (preserve RAM and clock) instead of cold.
    pub warm_reset: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            cpu_frequency_hz: 2_000_000,
            sample_rate: 44_100,
            baud_override: None,
            storage_path: None,
            warm_reset: false,
        }
    }
}
