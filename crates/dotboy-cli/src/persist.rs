//! Battery RAM and RTC files next to the ROM (or in a configured directory).

use anyhow::{Context, Result};
use dotboy_core::Cartridge;
use dotboy_core::rtc::RtcSnapshot;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePaths {
    pub ram: PathBuf,
    pub rtc: PathBuf,
}

impl SavePaths {
    /// `<dir>/<rom stem>.sav` and `.rtc`, where `dir` is `save_dir` or the
    /// ROM's own directory.
    pub fn for_rom(rom: &Path, save_dir: Option<&Path>) -> Self {
        let stem = rom.file_stem().unwrap_or(rom.as_os_str());
        let dir = save_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| rom.parent().map(Path::to_path_buf).unwrap_or_default());
        let with_ext = |ext: &str| {
            let mut name = stem.to_os_string();
            name.push(ext);
            dir.join(name)
        };
        Self {
            ram: with_ext(".sav"),
            rtc: with_ext(".rtc"),
        }
    }
}

/// Load saved RAM and clock state into a battery-backed cartridge. Missing
/// files are not an error.
pub fn restore(cart: &mut Cartridge, paths: &SavePaths) -> Result<()> {
    if !cart.has_battery() {
        return Ok(());
    }

    if paths.ram.exists() {
        let data = fs::read(&paths.ram)
            .with_context(|| format!("reading save file {}", paths.ram.display()))?;
        cart.load_ram(&data);
        info!("Loaded {} bytes of cartridge RAM", data.len());
    }

    if cart.has_rtc() && paths.rtc.exists() {
        let data = fs::read(&paths.rtc)
            .with_context(|| format!("reading RTC file {}", paths.rtc.display()))?;
        match RtcSnapshot::from_bytes(&data) {
            Some(snapshot) => cart.restore_rtc(snapshot),
            None => warn!("Ignoring malformed RTC file {}", paths.rtc.display()),
        }
    }
    Ok(())
}

/// Write battery RAM and the clock snapshot back to disk.
pub fn persist(cart: &Cartridge, paths: &SavePaths) -> Result<()> {
    if !cart.has_battery() {
        return Ok(());
    }

    if !cart.ram().is_empty() {
        write_creating_dir(&paths.ram, cart.ram())?;
    }
    if let Some(snapshot) = cart.rtc_snapshot() {
        write_creating_dir(&paths.rtc, &snapshot.to_bytes())?;
    }
    Ok(())
}

fn write_creating_dir(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}
