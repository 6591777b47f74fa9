use dotboy_core::ppu::DMG_PALETTE;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Frames run when neither the config file nor the command line says.
pub const DEFAULT_FRAMES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub frames: u32,
    /// Directory for `.sav`/`.rtc` files. Defaults to the ROM's directory.
    pub save_dir: Option<PathBuf>,
    /// Output colors for shades 0-3, `0xRRGGBB`.
    pub palette: [u32; 4],
    pub print_serial: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            save_dir: None,
            palette: DMG_PALETTE,
            print_serial: false,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dotboy").join("dotboy.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dotboy")
            .join("dotboy.toml");
    }

    PathBuf::from("dotboy.toml")
}

pub fn load_from_file(path: &Path) -> HostConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return HostConfig::default(),
    };

    match toml::from_str::<HostConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            HostConfig::default()
        }
    }
}
