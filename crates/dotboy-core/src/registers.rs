use crate::hardware::DmgRevision;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const DMG0_BOOT_AF: u16 = 0x0100;
const DMG0_BOOT_BC: u16 = 0xFF13;
const DMG0_BOOT_DE: u16 = 0x00C1;
const DMG0_BOOT_HL: u16 = 0x8403;

const DMG_ABC_BOOT_AF: u16 = 0x01B0;
const DMG_ABC_BOOT_BC: u16 = 0x0013;
const DMG_ABC_BOOT_DE: u16 = 0x00D8;
const DMG_ABC_BOOT_HL: u16 = 0x014D;

#[inline(always)]
const fn hi(word: u16) -> u8 {
    (word >> 8) as u8
}

#[inline(always)]
const fn lo(word: u16) -> u8 {
    word as u8
}

#[inline(always)]
const fn with_hi(word: u16, val: u8) -> u16 {
    (word & 0x00FF) | ((val as u16) << 8)
}

#[inline(always)]
const fn with_lo(word: u16, val: u8) -> u16 {
    (word & 0xFF00) | val as u16
}

/// The LR35902 register file.
///
/// Every pair is stored as one `u16`; the 8-bit halves are views computed
/// through shifts and masks. The low nibble of F always reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Register contents after the boot ROM for the given board revision.
    pub fn post_boot(revision: DmgRevision) -> Self {
        let (af, bc, de, hl) = match revision {
            DmgRevision::Rev0 => (DMG0_BOOT_AF, DMG0_BOOT_BC, DMG0_BOOT_DE, DMG0_BOOT_HL),
            DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => (
                DMG_ABC_BOOT_AF,
                DMG_ABC_BOOT_BC,
                DMG_ABC_BOOT_DE,
                DMG_ABC_BOOT_HL,
            ),
        };
        Self {
            af,
            bc,
            de,
            hl,
            sp: BOOT_SP,
            pc: BOOT_PC,
        }
    }

    pub fn a(&self) -> u8 {
        hi(self.af)
    }

    pub fn f(&self) -> u8 {
        lo(self.af) & 0xF0
    }

    pub fn b(&self) -> u8 {
        hi(self.bc)
    }

    pub fn c(&self) -> u8 {
        lo(self.bc)
    }

    pub fn d(&self) -> u8 {
        hi(self.de)
    }

    pub fn e(&self) -> u8 {
        lo(self.de)
    }

    pub fn h(&self) -> u8 {
        hi(self.hl)
    }

    pub fn l(&self) -> u8 {
        lo(self.hl)
    }

    pub fn set_a(&mut self, val: u8) {
        self.af = with_hi(self.af, val);
    }

    pub fn set_f(&mut self, val: u8) {
        self.af = with_lo(self.af, val & 0xF0);
    }

    pub fn set_b(&mut self, val: u8) {
        self.bc = with_hi(self.bc, val);
    }

    pub fn set_c(&mut self, val: u8) {
        self.bc = with_lo(self.bc, val);
    }

    pub fn set_d(&mut self, val: u8) {
        self.de = with_hi(self.de, val);
    }

    pub fn set_e(&mut self, val: u8) {
        self.de = with_lo(self.de, val);
    }

    pub fn set_h(&mut self, val: u8) {
        self.hl = with_hi(self.hl, val);
    }

    pub fn set_l(&mut self, val: u8) {
        self.hl = with_lo(self.hl, val);
    }

    /// AF as pushed to the stack, with the unused flag bits cleared.
    pub fn af(&self) -> u16 {
        self.af & 0xFFF0
    }

    pub fn set_af(&mut self, val: u16) {
        self.af = val & 0xFFF0;
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.f() & mask != 0
    }
}
