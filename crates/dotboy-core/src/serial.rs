use crate::interrupts::{Interrupt, InterruptController};

/// Internal clock transfers shift one bit every 512 cycles.
const CYCLES_PER_BIT: u32 = 512;
const TRANSFER_CYCLES: u32 = CYCLES_PER_BIT * 8;

/// No cable attached: the line floats high.
const DISCONNECTED_BYTE: u8 = 0xFF;

/// SB/SC registers. Every byte sent with the internal clock is also
/// appended to an output buffer so test ROMs that print over serial can
/// be observed by the host.
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
    /// Cycles left in the running transfer.
    transfer: Option<u32>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0,
            out_buf: Vec::new(),
            transfer: None,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val & 0x81;
                if val & 0x81 == 0x81 {
                    self.out_buf.push(self.sb);
                    self.transfer = Some(TRANSFER_CYCLES);
                } else if val & 0x80 == 0 {
                    self.transfer = None;
                }
                // External clock with no partner driving it: SC bit 7 stays
                // set and the transfer never finishes.
            }
            _ => {}
        }
    }

    pub fn step(&mut self, cycles: u32, interrupts: &mut InterruptController) {
        let Some(remaining) = self.transfer.as_mut() else {
            return;
        };
        if *remaining > cycles {
            *remaining -= cycles;
            return;
        }
        self.sb = DISCONNECTED_BYTE;
        self.sc &= 0x7F;
        self.transfer = None;
        interrupts.request(Interrupt::Serial);
    }

    pub fn transfer_active(&self) -> bool {
        self.transfer.is_some()
    }

    /// Drain every byte sent since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }

    pub fn peek_output(&self) -> &[u8] {
        &self.out_buf
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_transfer_completes_after_4096_cycles() {
        let mut ic = InterruptController::new();
        let mut serial = Serial::new();
        serial.write(0xFF01, b'A');
        serial.write(0xFF02, 0x81);
        assert_eq!(serial.peek_output(), b"A");
        assert_eq!(serial.read(0xFF02), 0xFF);

        serial.step(TRANSFER_CYCLES - 4, &mut ic);
        assert!(serial.transfer_active());
        assert!(!ic.is_requested(Interrupt::Serial));

        serial.step(4, &mut ic);
        assert!(!serial.transfer_active());
        assert!(ic.is_requested(Interrupt::Serial));
        assert_eq!(serial.read(0xFF01), 0xFF);
        assert_eq!(serial.read(0xFF02), 0x7F);
        assert_eq!(serial.take_output(), b"A".to_vec());
        assert!(serial.peek_output().is_empty());
    }

    #[test]
    fn external_clock_never_completes() {
        let mut ic = InterruptController::new();
        let mut serial = Serial::new();
        serial.write(0xFF01, 0x42);
        serial.write(0xFF02, 0x80);
        serial.step(100_000, &mut ic);
        assert!(!ic.is_requested(Interrupt::Serial));
        assert_eq!(serial.read(0xFF02), 0xFE);
        assert!(serial.peek_output().is_empty());
    }
}
