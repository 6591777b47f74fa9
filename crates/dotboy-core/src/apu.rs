//! Sound registers without sound generation.
//!
//! Games poll and write these registers constantly, so the register file
//! behaves like the real one: unused bits read back as 1, the power bit in
//! NR52 gates writes, and wave RAM stays readable. No samples are produced.

const REG_BASE: u16 = 0xFF10;
const REG_COUNT: usize = 0x30;
const NR52: u16 = 0xFF26;
const WAVE_RAM: std::ops::RangeInclusive<u16> = 0xFF30..=0xFF3F;
const POWER: u8 = 0x80;

pub struct Apu {
    regs: [u8; REG_COUNT],
    nr52: u8,
}

impl Apu {
    /// Register contents left behind by the boot ROM.
    pub fn new() -> Self {
        let mut apu = Self {
            regs: [0; REG_COUNT],
            nr52: POWER,
        };
        for (addr, val) in [
            (0xFF10, 0x80),
            (0xFF11, 0xBF),
            (0xFF12, 0xF3),
            (0xFF14, 0xBF),
            (0xFF16, 0x3F),
            (0xFF19, 0xBF),
            (0xFF1A, 0x7F),
            (0xFF1B, 0xFF),
            (0xFF1C, 0x9F),
            (0xFF1E, 0xBF),
            (0xFF20, 0xFF),
            (0xFF23, 0xBF),
            (0xFF24, 0x77),
            (0xFF25, 0xF3),
        ] {
            apu.regs[(addr - REG_BASE) as usize] = val;
        }
        apu
    }

    fn read_mask(addr: u16) -> u8 {
        match addr {
            0xFF10 => 0x80,
            0xFF11 | 0xFF16 => 0x3F,
            0xFF12 | 0xFF17 | 0xFF21 | 0xFF22 | 0xFF24 | 0xFF25 => 0x00,
            0xFF13 | 0xFF18 | 0xFF1B | 0xFF1D | 0xFF20 => 0xFF,
            0xFF14 | 0xFF19 | 0xFF1E | 0xFF23 => 0xBF,
            0xFF1A => 0x7F,
            0xFF1C => 0x9F,
            0xFF30..=0xFF3F => 0x00,
            _ => 0xFF,
        }
    }

    pub fn powered(&self) -> bool {
        self.nr52 & POWER != 0
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        if addr == NR52 {
            // No channel ever runs, so the status bits stay clear.
            return self.nr52 | 0x70;
        }
        match addr.checked_sub(REG_BASE) {
            Some(idx) if (idx as usize) < REG_COUNT => {
                self.regs[idx as usize] | Self::read_mask(addr)
            }
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        if addr == NR52 {
            let was_on = self.powered();
            self.nr52 = val & POWER;
            if was_on && !self.powered() {
                self.power_off();
            }
            return;
        }
        if !self.powered() && !WAVE_RAM.contains(&addr) {
            return;
        }
        if let Some(idx) = addr.checked_sub(REG_BASE) {
            if let Some(reg) = self.regs.get_mut(idx as usize) {
                *reg = val;
            }
        }
    }

    /// Clear every register except wave RAM.
    fn power_off(&mut self) {
        let wave_start = (*WAVE_RAM.start() - REG_BASE) as usize;
        self.regs[..wave_start].fill(0);
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_bits_read_high() {
        let mut apu = Apu::new();
        apu.write_reg(0xFF11, 0x00);
        assert_eq!(apu.read_reg(0xFF11), 0x3F);
        apu.write_reg(0xFF13, 0x12);
        assert_eq!(apu.read_reg(0xFF13), 0xFF);
        assert_eq!(apu.read_reg(0xFF15), 0xFF);
        assert_eq!(apu.read_reg(0xFF27), 0xFF);
        assert_eq!(apu.read_reg(0xFF26), 0xF0);
    }

    #[test]
    fn power_off_clears_and_blocks_writes() {
        let mut apu = Apu::new();
        apu.write_reg(0xFF30, 0xAB);
        apu.write_reg(NR52, 0x00);
        assert_eq!(apu.read_reg(NR52), 0x70);
        assert_eq!(apu.read_reg(0xFF24), 0x00);

        apu.write_reg(0xFF24, 0x55);
        assert_eq!(apu.read_reg(0xFF24), 0x00);

        apu.write_reg(0xFF31, 0xCD);
        assert_eq!(apu.read_reg(0xFF30), 0xAB);
        assert_eq!(apu.read_reg(0xFF31), 0xCD);

        apu.write_reg(NR52, 0x80);
        apu.write_reg(0xFF24, 0x55);
        assert_eq!(apu.read_reg(0xFF24), 0x55);
    }
}
