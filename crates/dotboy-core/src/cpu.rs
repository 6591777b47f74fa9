use log::error;

use crate::alu;
use crate::hardware::DmgRevision;
use crate::interrupts::Interrupt;
use crate::mmu::Mmu;
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Registers};

// T-cycles per machine cycle
const CYCLES_PER_M_CYCLE: u32 = 4;

pub struct Cpu {
    pub regs: Registers,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    /// Set after an illegal opcode; the CPU never fetches again.
    locked: bool,
    halt_bug: bool,
    ime_enable_delay: u8,
    /// Cycles consumed by the sub-step in progress.
    pending_cycles: u32,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_revision(DmgRevision::default())
    }

    /// CPU state as the boot ROM hands over to the cartridge.
    pub fn with_revision(revision: DmgRevision) -> Self {
        Self {
            regs: Registers::post_boot(revision),
            ime: false,
            halted: false,
            stopped: false,
            locked: false,
            halt_bug: false,
            ime_enable_delay: 0,
            pending_cycles: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Formatted CPU state string for debugging. `cycles` is the bus
    /// clock's running total.
    pub fn debug_state(&self, cycles: u64) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.regs.af(),
            self.regs.bc,
            self.regs.de,
            self.regs.hl,
            self.regs.pc,
            self.regs.sp,
            cycles
        )
    }

    #[inline(always)]
    fn tick(&mut self) {
        self.pending_cycles += CYCLES_PER_M_CYCLE;
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> u8 {
        let val = mmu.read_byte(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.tick();
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    fn read8(&mut self, mmu: &mut Mmu, addr: u16) -> u8 {
        let val = mmu.read_byte(addr);
        self.tick();
        val
    }

    #[inline(always)]
    fn write8(&mut self, mmu: &mut Mmu, addr: u16, val: u8) {
        mmu.write_byte(addr, val);
        self.tick();
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(mmu, self.regs.sp, (val >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(mmu, self.regs.sp, val as u8);
    }

    fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.read8(mmu, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read8(mmu, self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    fn read_reg(&mut self, mmu: &mut Mmu, index: u8) -> u8 {
        match index {
            0 => self.regs.b(),
            1 => self.regs.c(),
            2 => self.regs.d(),
            3 => self.regs.e(),
            4 => self.regs.h(),
            5 => self.regs.l(),
            6 => self.read8(mmu, self.regs.hl),
            _ => self.regs.a(),
        }
    }

    fn write_reg(&mut self, mmu: &mut Mmu, index: u8, val: u8) {
        match index {
            0 => self.regs.set_b(val),
            1 => self.regs.set_c(val),
            2 => self.regs.set_d(val),
            3 => self.regs.set_e(val),
            4 => self.regs.set_h(val),
            5 => self.regs.set_l(val),
            6 => self.write8(mmu, self.regs.hl, val),
            _ => self.regs.set_a(val),
        }
    }

    /// BC, DE, HL, SP by opcode bits 4-5.
    fn read_pair(&self, index: u8) -> u16 {
        match index & 0x03 {
            0 => self.regs.bc,
            1 => self.regs.de,
            2 => self.regs.hl,
            _ => self.regs.sp,
        }
    }

    fn write_pair(&mut self, index: u8, val: u16) {
        match index & 0x03 {
            0 => self.regs.bc = val,
            1 => self.regs.de = val,
            2 => self.regs.hl = val,
            _ => self.regs.sp = val,
        }
    }

    /// Branch condition NZ, Z, NC, C by opcode bits 3-4.
    fn condition(&self, opcode: u8) -> bool {
        match (opcode >> 3) & 0x03 {
            0 => !self.regs.flag(FLAG_Z),
            1 => self.regs.flag(FLAG_Z),
            2 => !self.regs.flag(FLAG_C),
            _ => self.regs.flag(FLAG_C),
        }
    }

    /// ADD ADC SUB SBC AND XOR OR CP, selected by opcode bits 3-5.
    fn alu_op(&mut self, op: u8, val: u8) {
        let a = self.regs.a();
        let carry = self.regs.flag(FLAG_C);
        let (res, f) = match op {
            0 => alu::add8(a, val, false),
            1 => alu::add8(a, val, carry),
            2 => alu::sub8(a, val, false),
            3 => alu::sub8(a, val, carry),
            4 => alu::and8(a, val),
            5 => alu::xor8(a, val),
            6 => alu::or8(a, val),
            _ => (a, alu::sub8(a, val, false).1),
        };
        self.regs.set_a(res);
        self.regs.set_f(f);
    }

    fn handle_cb(&mut self, opcode: u8, mmu: &mut Mmu) {
        let r = opcode & 0x07;
        let n = (opcode >> 3) & 0x07;
        let val = self.read_reg(mmu, r);
        match opcode {
            0x00..=0x3F => {
                let carry = self.regs.flag(FLAG_C);
                let (res, f) = match n {
                    0 => alu::rlc(val),
                    1 => alu::rrc(val),
                    2 => alu::rl(val, carry),
                    3 => alu::rr(val, carry),
                    4 => alu::sla(val),
                    5 => alu::sra(val),
                    6 => alu::swap(val),
                    _ => alu::srl(val),
                };
                self.write_reg(mmu, r, res);
                self.regs.set_f(f);
            }
            // BIT (HL) only reads from memory; total timing is 12 cycles
            0x40..=0x7F => {
                let f = alu::bit(n, val, self.regs.f());
                self.regs.set_f(f);
            }
            0x80..=0xBF => self.write_reg(mmu, r, val & !(1 << n)),
            0xC0..=0xFF => self.write_reg(mmu, r, val | (1 << n)),
        }
    }

    /// Push PC and jump to the vector: two idle cycles, two writes, one
    /// more idle cycle. IME was already settled by `fetch_next`.
    fn dispatch(&mut self, mmu: &mut Mmu, interrupt: Interrupt) {
        self.ime_enable_delay = 0;
        self.tick();
        self.tick();
        let pc = self.regs.pc;
        self.push_stack(mmu, pc);
        self.regs.pc = interrupt.vector();
        self.tick();
    }

    fn finish(&mut self, mmu: &mut Mmu) -> u32 {
        let cycles = self.pending_cycles;
        self.pending_cycles = 0;
        mmu.update_time(cycles);
        cycles
    }

    /// Run whole sub-steps until at least `max_cycles` T-cycles have
    /// elapsed. Returns the cycles actually spent.
    pub fn step(&mut self, mmu: &mut Mmu, max_cycles: u32) -> u32 {
        let mut total = 0;
        while total < max_cycles {
            total += self.step_instruction(mmu);
        }
        total
    }

    /// Execute one instruction, one interrupt dispatch, or one idle machine
    /// cycle while halted, stopped, or locked. Returns the cycles spent.
    pub fn step_instruction(&mut self, mmu: &mut Mmu) -> u32 {
        self.pending_cycles = 0;

        if self.locked {
            self.tick();
            return self.finish(mmu);
        }

        if self.stopped {
            if mmu.interrupts.has_pending() || mmu.input.line_low() {
                self.stopped = false;
            } else {
                self.tick();
                return self.finish(mmu);
            }
        }

        if self.halted && !mmu.interrupts.has_pending() {
            self.tick();
            return self.finish(mmu);
        }

        // A halted CPU services the wake-up interrupt whatever IME says,
        // and the wake leaves IME untouched.
        let woke = self.halted;
        if (self.ime || woke) && mmu.interrupts.has_pending() {
            self.halted = false;
            if let Some(interrupt) = mmu.interrupts.fetch_next(&mut self.ime, woke) {
                self.dispatch(mmu, interrupt);
            }
            return self.finish(mmu);
        }

        #[cfg(feature = "cpu-trace")]
        log::trace!("{}", self.debug_state(mmu.clock.cycles()));

        let enable_after = self.ime_enable_delay == 1;
        let opcode = if self.halt_bug {
            self.halt_bug = false;
            self.read8(mmu, self.regs.pc)
        } else {
            self.fetch8(mmu)
        };
        self.execute(opcode, mmu);

        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
            if enable_after {
                self.ime = true;
            }
        }

        self.finish(mmu)
    }

    fn execute(&mut self, opcode: u8, mmu: &mut Mmu) {
        match opcode {
            0x00 => {}
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.fetch16(mmu);
                self.write_pair(opcode >> 4, val);
            }
            0x02 | 0x12 => {
                let addr = self.read_pair(opcode >> 4);
                self.write8(mmu, addr, self.regs.a());
            }
            0x22 => {
                let addr = self.regs.hl;
                self.write8(mmu, addr, self.regs.a());
                self.regs.hl = addr.wrapping_add(1);
            }
            0x32 => {
                let addr = self.regs.hl;
                self.write8(mmu, addr, self.regs.a());
                self.regs.hl = addr.wrapping_sub(1);
            }
            0x0A | 0x1A => {
                let addr = self.read_pair(opcode >> 4);
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
            }
            0x2A => {
                let addr = self.regs.hl;
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
                self.regs.hl = addr.wrapping_add(1);
            }
            0x3A => {
                let addr = self.regs.hl;
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
                self.regs.hl = addr.wrapping_sub(1);
            }
            0x03 | 0x13 | 0x23 | 0x33 => {
                let idx = opcode >> 4;
                self.write_pair(idx, self.read_pair(idx).wrapping_add(1));
                self.tick();
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let idx = opcode >> 4;
                self.write_pair(idx, self.read_pair(idx).wrapping_sub(1));
                self.tick();
            }
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                let (res, f) = alu::inc8(val, self.regs.f());
                self.write_reg(mmu, r, res);
                self.regs.set_f(f);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                let (res, f) = alu::dec8(val, self.regs.f());
                self.write_reg(mmu, r, res);
                self.regs.set_f(f);
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let val = self.fetch8(mmu);
                self.write_reg(mmu, (opcode >> 3) & 0x07, val);
            }
            // RLCA RRCA RLA RRA always clear Z
            0x07 | 0x0F | 0x17 | 0x1F => {
                let a = self.regs.a();
                let carry = self.regs.flag(FLAG_C);
                let (res, f) = match opcode {
                    0x07 => alu::rlc(a),
                    0x0F => alu::rrc(a),
                    0x17 => alu::rl(a, carry),
                    _ => alu::rr(a, carry),
                };
                self.regs.set_a(res);
                self.regs.set_f(f & !FLAG_Z);
            }
            0x08 => {
                let addr = self.fetch16(mmu);
                let sp = self.regs.sp;
                self.write8(mmu, addr, sp as u8);
                self.write8(mmu, addr.wrapping_add(1), (sp >> 8) as u8);
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                let val = self.read_pair(opcode >> 4);
                let (res, f) = alu::add16(self.regs.hl, val, self.regs.f());
                self.regs.hl = res;
                self.regs.set_f(f);
                self.tick();
            }
            0x10 => {
                // PC is left on the byte after STOP.
                mmu.timer.reset_div();
                self.stopped = true;
            }
            0x18 => {
                let offset = self.fetch8(mmu) as i8;
                self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
                self.tick();
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch8(mmu) as i8;
                if self.condition(opcode) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as i16 as u16);
                    self.tick();
                }
            }
            0x27 => {
                let (res, f) = alu::daa(self.regs.a(), self.regs.f());
                self.regs.set_a(res);
                self.regs.set_f(f);
            }
            0x2F => {
                self.regs.set_a(!self.regs.a());
                let f = self.regs.f() | FLAG_N | FLAG_H;
                self.regs.set_f(f);
            }
            0x37 => {
                let f = (self.regs.f() & FLAG_Z) | FLAG_C;
                self.regs.set_f(f);
            }
            0x3F => {
                let f = (self.regs.f() & (FLAG_Z | FLAG_C)) ^ FLAG_C;
                self.regs.set_f(f);
            }
            0x76 => {
                if !self.ime && self.ime_enable_delay == 0 && mmu.interrupts.has_pending() {
                    // HALT bug: the next opcode byte is read twice.
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
            }
            0x40..=0x7F => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.write_reg(mmu, (opcode >> 3) & 0x07, val);
            }
            0x80..=0xBF => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.alu_op((opcode >> 3) & 0x07, val);
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                self.tick();
                if self.condition(opcode) {
                    self.regs.pc = self.pop_stack(mmu);
                    self.tick();
                }
            }
            0xC1 | 0xD1 | 0xE1 => {
                let val = self.pop_stack(mmu);
                self.write_pair((opcode >> 4) & 0x03, val);
            }
            0xF1 => {
                let val = self.pop_stack(mmu);
                self.regs.set_af(val);
            }
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch16(mmu);
                if self.condition(opcode) {
                    self.regs.pc = addr;
                    self.tick();
                }
            }
            0xC3 => {
                self.regs.pc = self.fetch16(mmu);
                self.tick();
            }
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch16(mmu);
                if self.condition(opcode) {
                    self.tick();
                    let ret = self.regs.pc;
                    self.push_stack(mmu, ret);
                    self.regs.pc = addr;
                }
            }
            0xC5 | 0xD5 | 0xE5 => {
                self.tick();
                let val = self.read_pair((opcode >> 4) & 0x03);
                self.push_stack(mmu, val);
            }
            0xF5 => {
                self.tick();
                let val = self.regs.af();
                self.push_stack(mmu, val);
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.fetch8(mmu);
                self.alu_op((opcode >> 3) & 0x07, val);
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.tick();
                let ret = self.regs.pc;
                self.push_stack(mmu, ret);
                self.regs.pc = (opcode & 0x38) as u16;
            }
            0xC9 => {
                self.regs.pc = self.pop_stack(mmu);
                self.tick();
            }
            0xD9 => {
                self.regs.pc = self.pop_stack(mmu);
                self.tick();
                self.ime = true;
            }
            0xCB => {
                let cb = self.fetch8(mmu);
                self.handle_cb(cb, mmu);
            }
            0xCD => {
                let addr = self.fetch16(mmu);
                self.tick();
                let ret = self.regs.pc;
                self.push_stack(mmu, ret);
                self.regs.pc = addr;
            }
            0xE0 => {
                let addr = 0xFF00 | self.fetch8(mmu) as u16;
                self.write8(mmu, addr, self.regs.a());
            }
            0xF0 => {
                let addr = 0xFF00 | self.fetch8(mmu) as u16;
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
            }
            0xE2 => {
                let addr = 0xFF00 | self.regs.c() as u16;
                self.write8(mmu, addr, self.regs.a());
            }
            0xF2 => {
                let addr = 0xFF00 | self.regs.c() as u16;
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
            }
            0xE8 => {
                let offset = self.fetch8(mmu) as i8;
                let (res, f) = alu::add_sp(self.regs.sp, offset);
                self.regs.sp = res;
                self.regs.set_f(f);
                self.tick();
                self.tick();
            }
            0xE9 => self.regs.pc = self.regs.hl,
            0xEA => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.regs.a());
            }
            0xFA => {
                let addr = self.fetch16(mmu);
                let val = self.read8(mmu, addr);
                self.regs.set_a(val);
            }
            0xF3 => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            0xFB => {
                if !self.ime && self.ime_enable_delay == 0 {
                    self.ime_enable_delay = 2;
                }
            }
            0xF8 => {
                let offset = self.fetch8(mmu) as i8;
                let (res, f) = alu::add_sp(self.regs.sp, offset);
                self.regs.hl = res;
                self.regs.set_f(f);
                self.tick();
            }
            0xF9 => {
                self.regs.sp = self.regs.hl;
                self.tick();
            }
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                error!(
                    "Illegal opcode {opcode:#04X} at {:#06X}, CPU locked",
                    self.regs.pc.wrapping_sub(1)
                );
                self.locked = true;
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
