#![allow(dead_code)]

use dotboy_core::header::{fix_global_checksum, fix_header_checksum};
use dotboy_core::{Cartridge, GameBoy};

const BANK_SIZE: usize = 0x4000;
pub const PROGRAM_START: u16 = 0x0150;

/// Builds a small ROM image with a valid header. The entry point jumps to
/// `PROGRAM_START`.
pub struct RomBuilder {
    rom: Vec<u8>,
}

impl RomBuilder {
    /// `banks` must be a power of two, at least 2.
    pub fn new(cart_type: u8, banks: usize, ram_size_code: u8) -> Self {
        let mut rom = vec![0u8; banks * BANK_SIZE];
        rom[0x0134..0x013C].copy_from_slice(b"TESTCART");
        rom[0x0147] = cart_type;
        rom[0x0148] = (banks / 2).trailing_zeros() as u8;
        rom[0x0149] = ram_size_code;
        // JP 0x0150
        rom[0x0100..0x0104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
        Self { rom }
    }

    pub fn plain() -> Self {
        Self::new(0x00, 2, 0x00)
    }

    /// Store the bank number in the first two bytes of every bank.
    pub fn bank_markers(mut self) -> Self {
        for bank in 0..self.rom.len() / BANK_SIZE {
            let base = bank * BANK_SIZE;
            self.rom[base] = bank as u8;
            self.rom[base + 1] = (bank >> 8) as u8;
        }
        self
    }

    pub fn at(mut self, addr: usize, bytes: &[u8]) -> Self {
        self.rom[addr..addr + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn program(self, code: &[u8]) -> Self {
        self.at(PROGRAM_START as usize, code)
    }

    pub fn build(mut self) -> Vec<u8> {
        fix_header_checksum(&mut self.rom);
        fix_global_checksum(&mut self.rom);
        self.rom
    }

    pub fn cartridge(self) -> Cartridge {
        Cartridge::load(self.build()).unwrap()
    }
}

/// A machine running `code` from `PROGRAM_START` on a plain 32 KiB ROM.
pub fn gameboy_with_program(code: &[u8]) -> GameBoy {
    GameBoy::new(RomBuilder::plain().program(code).cartridge())
}

/// Execute the entry `NOP; JP 0x0150` so the next step runs the program.
pub fn run_to_program(gb: &mut GameBoy) {
    while gb.cpu.regs.pc != PROGRAM_START {
        gb.cpu.step_instruction(&mut gb.mmu);
    }
}

/// Run `count` sub-steps and return the cycles of each.
pub fn step_n(gb: &mut GameBoy, count: usize) -> Vec<u32> {
    (0..count)
        .map(|_| gb.cpu.step_instruction(&mut gb.mmu))
        .collect()
}
