//! Interrupt controller.
//!
//! Holds the IE (enable) and IF (pending) registers. Devices latch requests
//! into IF unconditionally; the enable mask and the CPU's IME flag are only
//! consulted when the CPU asks for the next interrupt to service.

/// Interrupt sources in priority order (VBlank highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    /// Bit in IE/IF.
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
            Interrupt::Timer => 0x04,
            Interrupt::Serial => 0x08,
            Interrupt::Joypad => 0x10,
        }
    }

    /// Handler address (gbdev.io/pandocs/Interrupts.html).
    #[inline]
    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

const INTERRUPT_MASK: u8 = 0x1F;

#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    /// IE. All eight bits are kept for readback.
    enable: u8,
    /// IF, five bits.
    pending: u8,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a request. Masking only happens at dispatch time.
    pub fn request(&mut self, interrupt: Interrupt) {
        self.pending |= interrupt.bit();
    }

    pub fn clear(&mut self, interrupt: Interrupt) {
        self.pending &= !interrupt.bit();
    }

    pub fn is_requested(&self, interrupt: Interrupt) -> bool {
        self.pending & interrupt.bit() != 0
    }

    pub fn pending(&self) -> u8 {
        self.pending
    }

    pub fn enabled(&self) -> u8 {
        self.enable
    }

    /// Value seen by the CPU at 0xFF0F.
    pub fn read_if(&self) -> u8 {
        self.pending | 0xE0
    }

    pub fn write_if(&mut self, val: u8) {
        self.pending = val & INTERRUPT_MASK;
    }

    /// Value seen by the CPU at 0xFFFF.
    pub fn read_ie(&self) -> u8 {
        self.enable
    }

    pub fn write_ie(&mut self, val: u8) {
        self.enable = val;
    }

    /// True when some interrupt is both requested and enabled, regardless of
    /// IME. This is what wakes a halted CPU.
    pub fn has_pending(&self) -> bool {
        self.enable & self.pending & INTERRUPT_MASK != 0
    }

    /// Highest-priority requested and enabled interrupt, without consuming it.
    pub fn highest(&self) -> Option<Interrupt> {
        let active = self.enable & self.pending & INTERRUPT_MASK;
        Interrupt::ALL
            .into_iter()
            .find(|interrupt| active & interrupt.bit() != 0)
    }

    /// Select the interrupt the CPU should service next.
    ///
    /// Returns `None` when the CPU is running with IME off. Otherwise the
    /// highest-priority active interrupt is acknowledged (its IF bit is
    /// cleared) and, unless the CPU is only being woken from HALT, IME is
    /// dropped.
    pub fn fetch_next(&mut self, ime: &mut bool, halted: bool) -> Option<Interrupt> {
        if !halted && !*ime {
            return None;
        }
        let interrupt = self.highest()?;
        self.clear(interrupt);
        if !halted {
            *ime = false;
        }
        Some(interrupt)
    }
}
