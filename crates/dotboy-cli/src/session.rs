use crate::args::Options;
use crate::persist::{self, SavePaths};
use crate::snapshot::{write_frame_png, write_tiles_png};
use anyhow::{Context, Result};
use dotboy_core::{Cartridge, Frame, FrameSink, GameBoy};
use log::{info, warn};

/// Keeps the most recent frame and tile dump.
#[derive(Default)]
struct Capture {
    last: Option<Frame>,
    tiles: Option<Vec<u8>>,
    want_tiles: bool,
    presented: u32,
}

impl FrameSink for Capture {
    fn present(&mut self, frame: &Frame) {
        self.last = Some(frame.clone());
        self.presented += 1;
    }

    fn wants_tiles(&self) -> bool {
        self.want_tiles
    }

    fn present_tiles(&mut self, tiles: &[u8]) {
        self.tiles = Some(tiles.to_vec());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Frames handed to the host.
    pub frames: u32,
    pub cycles: u64,
    /// Every byte the program sent over the serial port.
    pub serial: Vec<u8>,
}

/// Printable form of serial output; non-text bytes are escaped.
pub fn format_serial(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' || b == b'\n' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

pub fn run(opts: &Options) -> Result<Summary> {
    let rom = std::fs::read(&opts.rom)
        .with_context(|| format!("reading ROM {}", opts.rom.display()))?;
    let mut cart = Cartridge::load(rom)
        .with_context(|| format!("loading ROM {}", opts.rom.display()))?;

    let paths = SavePaths::for_rom(&opts.rom, opts.save_dir.as_deref());
    persist::restore(&mut cart, &paths)?;

    let mut gb = GameBoy::with_revision(cart, opts.revision);
    gb.mmu.ppu.set_colors(opts.palette);

    let mut capture = Capture {
        want_tiles: opts.tiles.is_some(),
        ..Capture::default()
    };
    let mut serial = Vec::new();
    for _ in 0..opts.frames {
        gb.run_frame(&mut capture);
        let bytes = gb.mmu.take_serial();
        if opts.print_serial && !bytes.is_empty() {
            print!("{}", format_serial(&bytes));
        }
        serial.extend_from_slice(&bytes);
        if gb.cpu.is_locked() {
            warn!("CPU locked up at {}", gb.cpu.debug_state(gb.mmu.clock.cycles()));
            break;
        }
    }
    if opts.print_serial && !serial.is_empty() {
        println!();
    }

    if let Some(cart) = gb.mmu.cart() {
        persist::persist(cart, &paths)?;
    }

    if let Some(path) = &opts.screenshot {
        match &capture.last {
            Some(frame) => write_frame_png(path, frame)?,
            None => warn!("No frame completed; {} not written", path.display()),
        }
    }
    if let Some(path) = &opts.tiles {
        match &capture.tiles {
            Some(tiles) => write_tiles_png(path, tiles, opts.palette)?,
            None => warn!("No frame completed; {} not written", path.display()),
        }
    }

    let cycles = gb.mmu.clock.cycles();
    info!("Ran {} frames ({cycles} cycles)", capture.presented);
    Ok(Summary {
        frames: capture.presented,
        cycles,
        serial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_text_escapes_control_bytes() {
        assert_eq!(format_serial(b"Passed\n"), "Passed\n");
        assert_eq!(format_serial(&[0x41, 0x00, 0xFF]), "A\\x00\\xFF");
    }
}
