//! Cartridge header fields and checksums (gbdev.io/pandocs/The_Cartridge_Header.html).

const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const CGB_FLAG: usize = 0x0143;
const CART_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;
const HEADER_CHECKSUM: usize = 0x014D;
const GLOBAL_CHECKSUM: usize = 0x014E;

/// Bytes covered by the header checksum.
const HEADER_CHECKSUM_RANGE: std::ops::RangeInclusive<usize> = 0x0134..=0x014C;

/// Smallest image that contains a complete header.
pub const HEADER_END: usize = 0x0150;

/// Parsed copy of the fields at 0x0134-0x014F.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    pub cgb_flag: u8,
    pub cart_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl Header {
    /// Parse the header. Missing bytes read as zero.
    pub fn parse(rom: &[u8]) -> Self {
        let byte = |offset: usize| rom.get(offset).copied().unwrap_or(0);

        let end = TITLE_END.min(rom.len());
        let mut title = rom.get(TITLE_START.min(end)..end).unwrap_or(&[]);
        if let Some(pos) = title.iter().position(|&b| b == 0) {
            title = &title[..pos];
        }

        Self {
            title: String::from_utf8_lossy(title).trim().to_string(),
            cgb_flag: byte(CGB_FLAG),
            cart_type: byte(CART_TYPE),
            rom_size_code: byte(ROM_SIZE),
            ram_size_code: byte(RAM_SIZE),
            header_checksum: byte(HEADER_CHECKSUM),
            global_checksum: u16::from_be_bytes([byte(GLOBAL_CHECKSUM), byte(GLOBAL_CHECKSUM + 1)]),
        }
    }

    pub fn cgb_supported(&self) -> bool {
        self.cgb_flag & 0x80 != 0
    }

    /// ROM size in bytes declared by the size code (32 KiB << code).
    pub fn rom_size(&self) -> Option<usize> {
        (self.rom_size_code <= 0x08).then(|| 0x8000usize << self.rom_size_code)
    }

    /// External RAM size in bytes declared by the size code.
    pub fn ram_size(&self) -> usize {
        match self.ram_size_code {
            0x01 => 0x800,   // 2KB
            0x02 => 0x2000,  // 8KB
            0x03 => 0x8000,  // 32KB (4 banks)
            0x04 => 0x20000, // 128KB (16 banks)
            0x05 => 0x10000, // 64KB (8 banks)
            _ => 0,
        }
    }
}

/// Header checksum: `x = x - byte - 1` over 0x0134..=0x014C.
pub fn header_checksum(rom: &[u8]) -> u8 {
    rom.get(HEADER_CHECKSUM_RANGE)
        .unwrap_or(&[])
        .iter()
        .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
}

/// Global checksum: 16-bit sum of every byte except the checksum itself.
pub fn global_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .enumerate()
        .filter(|&(i, _)| i != GLOBAL_CHECKSUM && i != GLOBAL_CHECKSUM + 1)
        .fold(0u16, |sum, (_, &b)| sum.wrapping_add(b as u16))
}

/// Store the computed header checksum at 0x014D.
pub fn fix_header_checksum(rom: &mut [u8]) {
    let sum = header_checksum(rom);
    if let Some(slot) = rom.get_mut(HEADER_CHECKSUM) {
        *slot = sum;
    }
}

/// Store the computed global checksum at 0x014E-0x014F. Run after
/// `fix_header_checksum`, since the header checksum byte is included.
pub fn fix_global_checksum(rom: &mut [u8]) {
    if rom.len() < HEADER_END {
        return;
    }
    let [hi, lo] = global_checksum(rom).to_be_bytes();
    rom[GLOBAL_CHECKSUM] = hi;
    rom[GLOBAL_CHECKSUM + 1] = lo;
}
