use std::path::{Path, PathBuf};

use halcyon_machines::MachineConfig;
use log::warn;
use serde::Deserialize;

/// Frontend configuration file (`halcyon.toml`), looked up in the
/// platform config directory unless a path is given on the command
/// line. CLI arguments override anything set here.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostConfig {
    /// Integer window scale for the 320x240 output.
    pub display_scale: Option<u32>,
    /// Machine settings (CPU frequency, sample rate, baud override,
    /// storage path, warm reset).
    pub machine: MachineConfig,
}

/// Default location: `<config dir>/halcyon/halcyon.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("halcyon").join("halcyon.toml"))
}

/// Load the config file, falling back to defaults when it is missing
/// or malformed (a malformed file is reported, not fatal).
pub fn load(path: Option<&Path>) -> HostConfig {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_path() {
            Some(p) if p.exists() => p,
            _ => return HostConfig::default(),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring malformed config {}: {e}", path.display());
                HostConfig::default()
            }
        },
        Err(e) => {
            warn!("could not read config {}: {e}", path.display());
            HostConfig::default()
        }
    }
}
