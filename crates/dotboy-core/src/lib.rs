//! Original Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU,
//! timer, cartridge mappers). Hosts drive it through the [`gameboy`] facade
//! and supply their own frame sinks, input sources and time sources.

/// Flag arithmetic shared by the CPU instructions.
pub mod alu;

/// Sound register file (no sample generation).
pub mod apu;

/// Cartridge mappers (MBC) and ROM/RAM/RTC handling.
pub mod cartridge;

/// Cycle and frame counters.
pub mod clock;

/// LR35902 CPU core.
pub mod cpu;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Hardware revisions and revision-specific quirks.
pub mod hardware;

/// Cartridge header parsing and checksums.
pub mod header;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

/// IE/IF registers and interrupt priority.
pub mod interrupts;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// CPU register file.
pub mod registers;

/// MBC3 real-time clock and host time sources.
pub mod rtc;

/// Serial unit and link cable plumbing.
pub mod serial;

/// Divider/timer unit.
pub mod timer;

pub use cartridge::{Cartridge, CartridgeError, MbcType};
pub use gameboy::{CYCLES_PER_FRAME, Frame, FrameSink, GameBoy};
pub use hardware::DmgRevision;
pub use input::{InputSource, JoypadState};
