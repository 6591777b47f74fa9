/// Running totals since power on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    cycles: u64,
    frames: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, cycles: u32) {
        self.cycles = self.cycles.wrapping_add(cycles as u64);
    }

    pub fn mark_frame(&mut self) {
        self.frames = self.frames.wrapping_add(1);
    }

    /// T-cycles elapsed.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
