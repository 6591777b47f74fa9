use crate::interrupts::{Interrupt, InterruptController};

/// TIMA periods in cycles, indexed by TAC bits 0-1.
const TIMA_PERIODS: [u32; 4] = [1024, 16, 64, 256];
const TAC_ENABLE: u8 = 0x04;

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
    /// Cycles accumulated toward the next TIMA increment.
    tima_phase: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            tima_phase: 0,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => self.reset_div(),
            0xFF05 => self.tima = val,
            0xFF06 => self.tma = val,
            0xFF07 => {
                self.tac = val & 0x07;
                // Keep the position inside the current period; cycles banked
                // at a slow rate never turn into a burst at a fast one.
                self.tima_phase %= self.period();
            }
            _ => {}
        }
    }

    /// Advance the timer by `cycles` CPU cycles, requesting the Timer
    /// interrupt on every TIMA overflow.
    pub fn step(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        self.div = self.div.wrapping_add(cycles as u16);
        if !self.enabled() {
            return;
        }

        self.tima_phase += cycles;
        let period = self.period();
        while self.tima_phase >= period {
            self.tima_phase -= period;
            self.increment(interrupts);
        }
    }

    /// Reset the internal divider counter. TIMA is clocked from the same
    /// counter, so its phase restarts too.
    pub fn reset_div(&mut self) {
        self.div = 0;
        self.tima_phase = 0;
    }

    pub fn enabled(&self) -> bool {
        self.tac & TAC_ENABLE != 0
    }

    /// Current TIMA period in cycles.
    pub fn period(&self) -> u32 {
        TIMA_PERIODS[(self.tac & 0x03) as usize]
    }

    fn increment(&mut self, interrupts: &mut InterruptController) {
        if self.tima == 0xFF {
            self.tima = self.tma;
            interrupts.request(Interrupt::Timer);
        } else {
            self.tima += 1;
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
