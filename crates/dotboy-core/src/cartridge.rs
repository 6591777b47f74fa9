use log::{debug, info, warn};
use thiserror::Error;

use crate::header::{self, Header};
use crate::rtc::{Mbc3Rtc, RtcSnapshot, SystemTimeSource, TimeSource};

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
/// Two ROM banks: anything smaller cannot hold the fixed and switchable windows.
pub const MIN_ROM_SIZE: usize = 0x8000;
/// 512 MBC5 banks.
pub const MAX_ROM_SIZE: usize = 0x80_0000;
const MBC2_RAM_SIZE: usize = 0x200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM image is {0} bytes, smaller than the 32 KiB minimum")]
    RomTooSmall(usize),
    #[error("ROM image is {0} bytes, larger than the 8 MiB maximum")]
    RomTooLarge(usize),
    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedCartridgeType(u8),
    #[error("invalid ROM size code {0:#04X}")]
    InvalidRomSizeCode(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

impl MbcType {
    fn from_cart_type(cart_type: u8) -> Result<Self, CartridgeError> {
        match cart_type {
            0x00 | 0x08 | 0x09 => Ok(MbcType::NoMbc),
            0x01..=0x03 => Ok(MbcType::Mbc1),
            0x05 | 0x06 => Ok(MbcType::Mbc2),
            0x0F..=0x13 => Ok(MbcType::Mbc3),
            0x19..=0x1E => Ok(MbcType::Mbc5),
            other => Err(CartridgeError::UnsupportedCartridgeType(other)),
        }
    }
}

/// Bank registers, one variant per controller.
#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        /// 5-bit BANK1 register.
        rom_bank: u8,
        /// 2-bit BANK2 register.
        high: u8,
        /// 0: BANK2 extends the ROM bank, 1: BANK2 selects the RAM bank.
        mode: u8,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        /// 0x00-0x03 selects RAM, 0x08-0x0C an RTC register.
        ram_bank: u8,
        ram_enable: bool,
        rtc: Option<Mbc3Rtc>,
        latch_pending: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
        rumble: bool,
    },
}

pub struct Cartridge {
    pub rom: Vec<u8>,
    ram: Vec<u8>,
    header: Header,
    mbc: MbcType,
    mbc_state: MbcState,
    time: Box<dyn TimeSource>,
    rumble_active: bool,
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("title", &self.header.title)
            .field("mbc", &self.mbc)
            .field("rom_len", &self.rom.len())
            .field("ram_len", &self.ram.len())
            .field("state", &self.mbc_state)
            .finish()
    }
}

impl Cartridge {
    /// Validate and map a ROM image, using the host clock for the MBC3 RTC.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        Self::load_with_time_source(data, Box::new(SystemTimeSource))
    }

    pub fn load_with_time_source(
        data: Vec<u8>,
        time: Box<dyn TimeSource>,
    ) -> Result<Self, CartridgeError> {
        if data.len() < MIN_ROM_SIZE {
            return Err(CartridgeError::RomTooSmall(data.len()));
        }
        if data.len() > MAX_ROM_SIZE {
            return Err(CartridgeError::RomTooLarge(data.len()));
        }

        let header = Header::parse(&data);
        let mbc = MbcType::from_cart_type(header.cart_type)?;
        let declared_rom = header
            .rom_size()
            .ok_or(CartridgeError::InvalidRomSizeCode(header.rom_size_code))?;

        if declared_rom != data.len() {
            warn!(
                "ROM size code {:#04X} declares {} bytes but image has {}",
                header.rom_size_code,
                declared_rom,
                data.len()
            );
        }
        let computed = header::header_checksum(&data);
        if computed != header.header_checksum {
            warn!(
                "Header checksum mismatch: stored {:#04X}, computed {:#04X}",
                header.header_checksum, computed
            );
        }
        let global = header::global_checksum(&data);
        if global != header.global_checksum {
            warn!(
                "Global checksum mismatch: stored {:#06X}, computed {:#06X}",
                header.global_checksum, global
            );
        }

        let ram_size = match mbc {
            MbcType::Mbc2 => MBC2_RAM_SIZE,
            MbcType::Mbc1 | MbcType::Mbc3 if header.ram_size() > 0x8000 => {
                warn!(
                    "RAM size code {:#04X} is too large for {:?}; using 32 KiB",
                    header.ram_size_code, mbc
                );
                0x8000
            }
            _ => header.ram_size(),
        };

        let has_rtc = matches!(header.cart_type, 0x0F | 0x10);
        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                high: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc2 => MbcState::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rtc: has_rtc.then(|| Mbc3Rtc::new(time.now())),
                latch_pending: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rumble: matches!(header.cart_type, 0x1C..=0x1E),
            },
        };

        info!(
            "Loaded ROM: {} (MBC: {:?}, ROM: {} KiB, RAM: {} KiB)",
            header.title,
            mbc,
            data.len() / 1024,
            ram_size / 1024
        );

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            header,
            mbc,
            mbc_state,
            time,
            rumble_active: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn mbc(&self) -> MbcType {
        self.mbc
    }

    fn rom_bank_count(&self) -> usize {
        self.rom.len().div_ceil(ROM_BANK_SIZE)
    }

    fn rom_byte(&self, bank: usize, addr: u16) -> u8 {
        let bank = bank % self.rom_bank_count();
        let offset = bank * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1));
        debug_assert!(offset < self.rom_bank_count() * ROM_BANK_SIZE);
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    /// Offset into external RAM for `bank` at `addr`. Small RAM chips mirror.
    fn ram_index(ram: &[u8], bank: usize, addr: u16) -> Option<usize> {
        if ram.is_empty() {
            return None;
        }
        let offset = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
        Some(offset % ram.len())
    }

    /// ROM bank currently mapped at 0x4000-0x7FFF.
    pub fn rom_bank(&self) -> usize {
        let bank = match &self.mbc_state {
            MbcState::NoMbc => 1,
            MbcState::Mbc1 {
                rom_bank,
                high,
                mode,
                ..
            } => {
                let low = (*rom_bank & 0x1F) as usize;
                let bank = if *mode == 0 {
                    ((*high as usize & 0x03) << 5) | low
                } else {
                    low
                };
                // 0x00/0x20/0x40/0x60 map to the next bank up.
                if bank & 0x1F == 0 { bank + 1 } else { bank }
            }
            MbcState::Mbc2 { rom_bank, .. } => match (*rom_bank & 0x0F) as usize {
                0 => 1,
                bank => bank,
            },
            MbcState::Mbc3 { rom_bank, .. } => match (*rom_bank & 0x7F) as usize {
                0 => 1,
                bank => bank,
            },
            MbcState::Mbc5 { rom_bank, .. } => (*rom_bank & 0x01FF) as usize,
        };
        bank % self.rom_bank_count()
    }

    /// External RAM bank currently mapped at 0xA000-0xBFFF.
    pub fn ram_bank(&self) -> usize {
        match &self.mbc_state {
            MbcState::NoMbc | MbcState::Mbc2 { .. } => 0,
            MbcState::Mbc1 { high, mode, .. } => {
                if *mode == 0 {
                    0
                } else {
                    (*high & 0x03) as usize
                }
            }
            MbcState::Mbc3 { ram_bank, .. } => (*ram_bank & 0x03) as usize,
            MbcState::Mbc5 {
                ram_bank, rumble, ..
            } => {
                if *rumble {
                    (*ram_bank & 0x07) as usize
                } else {
                    (*ram_bank & 0x0F) as usize
                }
            }
        }
    }

    pub fn ram_enabled(&self) -> bool {
        match &self.mbc_state {
            MbcState::NoMbc => true,
            MbcState::Mbc1 { ram_enable, .. }
            | MbcState::Mbc2 { ram_enable, .. }
            | MbcState::Mbc3 { ram_enable, .. }
            | MbcState::Mbc5 { ram_enable, .. } => *ram_enable,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match (&self.mbc_state, addr) {
            (MbcState::NoMbc, 0x0000..=0x7FFF) => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            (_, 0x0000..=0x3FFF) => self.rom_byte(0, addr),
            (_, 0x4000..=0x7FFF) => self.rom_byte(self.rom_bank(), addr),
            (MbcState::Mbc2 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if !*ram_enable {
                    0xFF
                } else {
                    // MBC2 has 512x4-bit internal RAM, mirrored across 0xA000-0xBFFF.
                    let idx = (addr as usize - 0xA000) & 0x01FF;
                    let nibble = self.ram.get(idx).copied().unwrap_or(0x0F) & 0x0F;
                    0xF0 | nibble
                }
            }
            (
                MbcState::Mbc3 {
                    ram_enable,
                    ram_bank,
                    rtc,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                if !*ram_enable {
                    return 0xFF;
                }
                match *ram_bank {
                    0x00..=0x03 => Self::ram_index(&self.ram, *ram_bank as usize, addr)
                        .and_then(|idx| self.ram.get(idx).copied())
                        .unwrap_or(0xFF),
                    0x08..=0x0C => rtc.as_ref().map(|r| r.read_latched(*ram_bank)).unwrap_or(0xFF),
                    _ => 0xFF,
                }
            }
            (_, 0xA000..=0xBFFF) => {
                if !self.ram_enabled() {
                    return 0xFF;
                }
                Self::ram_index(&self.ram, self.ram_bank(), addr)
                    .and_then(|idx| self.ram.get(idx).copied())
                    .unwrap_or(0xFF)
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0x0000..=0x7FFF) => {}
            (
                MbcState::Mbc1 { ram_enable, .. }
                | MbcState::Mbc3 { ram_enable, .. }
                | MbcState::Mbc5 { ram_enable, .. },
                0x0000..=0x1FFF,
            ) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x1F;
                debug!("MBC1 BANK1 <- {:#04X}", *rom_bank);
            }
            (MbcState::Mbc1 { high, .. }, 0x4000..=0x5FFF) => {
                *high = val & 0x03;
            }
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
            }
            (
                MbcState::Mbc2 {
                    rom_bank,
                    ram_enable,
                },
                0x0000..=0x3FFF,
            ) => {
                // MBC2 uses address bit 8 to select between RAMG and ROMB across the
                // entire 0x0000-0x3FFF range:
                // - bit8=0: RAM enable (RAMG)
                // - bit8=1: ROM bank select (ROMB)
                if (addr & 0x0100) == 0 {
                    *ram_enable = val & 0x0F == 0x0A;
                } else {
                    *rom_bank = val & 0x0F;
                    debug!("MBC2 ROMB <- {:#04X}", *rom_bank);
                }
            }
            (MbcState::Mbc2 { .. }, 0x4000..=0x7FFF) => {}
            (MbcState::Mbc2 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = (addr as usize - 0xA000) & 0x01FF;
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val & 0x0F;
                    }
                }
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                debug!("MBC3 ROM bank <- {:#04X}", *rom_bank);
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val;
            }
            (
                MbcState::Mbc3 {
                    latch_pending, rtc, ..
                },
                0x6000..=0x7FFF,
            ) => {
                if val == 0 {
                    *latch_pending = true;
                } else if val == 1 && *latch_pending {
                    if let Some(rtc) = rtc {
                        rtc.latch(self.time.now());
                    }
                    *latch_pending = false;
                } else {
                    *latch_pending = false;
                }
            }
            (
                MbcState::Mbc3 {
                    ram_enable,
                    ram_bank,
                    rtc,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                if !*ram_enable {
                    return;
                }
                match *ram_bank {
                    0x00..=0x03 => {
                        let bank = *ram_bank as usize;
                        if let Some(idx) = Self::ram_index(&self.ram, bank, addr) {
                            self.ram[idx] = val;
                        }
                    }
                    0x08..=0x0C => {
                        if let Some(rtc) = rtc.as_mut() {
                            rtc.write_register(*ram_bank, val, self.time.now());
                        }
                    }
                    _ => {}
                }
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
                debug!("MBC5 ROM bank <- {:#05X}", *rom_bank);
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8);
                debug!("MBC5 ROM bank <- {:#05X}", *rom_bank);
            }
            (
                MbcState::Mbc5 {
                    ram_bank, rumble, ..
                },
                0x4000..=0x5FFF,
            ) => {
                *ram_bank = val & 0x0F;
                if *rumble {
                    self.rumble_active = val & 0x08 != 0;
                }
            }
            (MbcState::Mbc5 { .. }, 0x6000..=0x7FFF) => {}
            (_, 0xA000..=0xBFFF) => {
                if !self.ram_enabled() {
                    return;
                }
                if let Some(idx) = Self::ram_index(&self.ram, self.ram_bank(), addr) {
                    self.ram[idx] = val;
                }
            }
            _ => {}
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.header.cart_type,
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }

    pub fn has_rtc(&self) -> bool {
        matches!(
            self.mbc_state,
            MbcState::Mbc3 { rtc: Some(_), .. }
        )
    }

    /// Rumble motor state for MBC5 rumble cartridges.
    pub fn rumble_active(&self) -> bool {
        self.rumble_active
    }

    /// Battery-backed RAM contents, for the host to persist.
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Restore saved RAM. Extra bytes are ignored; missing ones keep their
    /// current value.
    pub fn load_ram(&mut self, data: &[u8]) {
        if data.len() != self.ram.len() {
            warn!(
                "Save data is {} bytes, cartridge RAM is {}",
                data.len(),
                self.ram.len()
            );
        }
        for (d, s) in self.ram.iter_mut().zip(data.iter()) {
            *d = *s;
        }
    }

    pub fn rtc_snapshot(&self) -> Option<RtcSnapshot> {
        match &self.mbc_state {
            MbcState::Mbc3 { rtc: Some(rtc), .. } => Some(rtc.snapshot()),
            _ => None,
        }
    }

    /// Restore a persisted clock. The time spent while the emulator was not
    /// running is applied at the next latch.
    pub fn restore_rtc(&mut self, snapshot: RtcSnapshot) {
        if let MbcState::Mbc3 { rtc: Some(rtc), .. } = &mut self.mbc_state {
            rtc.restore(snapshot);
        }
    }
}
