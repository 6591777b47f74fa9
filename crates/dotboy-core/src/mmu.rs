use crate::{
    apu::Apu, cartridge::Cartridge, clock::Clock, hardware::DmgRevision, input::Input,
    interrupts::InterruptController, ppu::Ppu, serial::Serial, timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;
const OAM_BYTES: u8 = 0xA0;
/// One byte moves every machine cycle.
const DMA_CYCLES_PER_BYTE: u32 = 4;

/// A running OAM DMA copy.
#[derive(Debug, Clone, Copy)]
struct OamDma {
    source: u16,
    /// Next byte to copy.
    index: u8,
    /// Cycles accumulated toward the next byte.
    phase: u32,
}

/// The address bus. Owns every memory-mapped component; the CPU borrows it
/// for the duration of a step.
pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub interrupts: InterruptController,
    pub timer: Timer,
    pub ppu: Ppu,
    pub serial: Serial,
    pub apu: Apu,
    pub input: Input,
    pub clock: Clock,
    dma: Option<OamDma>,
}

impl Mmu {
    pub fn new() -> Self {
        Self::with_revision(DmgRevision::default())
    }

    /// Memory and I/O as the boot ROM leaves them on the given revision.
    pub fn with_revision(revision: DmgRevision) -> Self {
        let mut timer = Timer::new();
        timer.div = revision.boot_div();

        let mut interrupts = InterruptController::new();
        // The boot ROM leaves a VBlank request latched.
        interrupts.write_if(0x01);

        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            interrupts,
            timer,
            ppu: Ppu::new(),
            serial: Serial::new(),
            apu: Apu::new(),
            input: Input::new(),
            clock: Clock::new(),
            dma: None,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn cart(&self) -> Option<&Cartridge> {
        self.cart.as_ref()
    }

    pub fn cart_mut(&mut self) -> Option<&mut Cartridge> {
        self.cart.as_mut()
    }

    pub fn dma_active(&self) -> bool {
        self.dma.is_some()
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cart.as_ref().map_or(0xFF, |c| c.read(addr)),
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[(addr - 0x8000) as usize]
                } else {
                    0xFF
                }
            }
            0xC000..=0xFDFF => self.wram[(addr as usize - 0xC000) & (WRAM_SIZE - 1)],
            0xFE00..=0xFE9F => {
                if self.dma.is_none() && self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                } else {
                    0xFF
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.interrupts.read_if(),
            0xFF10..=0xFF3F => self.apu.read_reg(addr),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.interrupts.read_ie(),
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[(addr - 0x8000) as usize] = val;
                } else {
                    #[cfg(feature = "ppu-trace")]
                    log::trace!("[PPU] VRAM write blocked addr={addr:04X} val={val:02X}");
                }
            }
            0xC000..=0xFDFF => self.wram[(addr as usize - 0xC000) & (WRAM_SIZE - 1)] = val,
            0xFE00..=0xFE9F => {
                if self.dma.is_none() && self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize] = val;
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val, &mut self.interrupts),
            0xFF01 | 0xFF02 => self.serial.write(addr, val),
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.interrupts.write_if(val),
            0xFF10..=0xFF3F => self.apu.write_reg(addr, val),
            0xFF46 => {
                self.ppu.write_reg(addr, val, &mut self.interrupts);
                self.start_dma(val);
            }
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val, &mut self.interrupts),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.interrupts.write_ie(val),
            _ => {}
        }
    }

    fn start_dma(&mut self, page: u8) {
        log::debug!("[DMA] OAM DMA started src={:04X}", (page as u16) << 8);
        self.dma = Some(OamDma {
            source: (page as u16) << 8,
            index: 0,
            phase: 0,
        });
    }

    /// Bus read used by OAM DMA. Ignores PPU access locks; the upper pages
    /// fold back onto work RAM.
    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self.cart.as_ref().map_or(0xFF, |c| c.read(addr)),
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            _ => self.wram[(addr as usize).wrapping_sub(0xC000) & (WRAM_SIZE - 1)],
        }
    }

    fn dma_step(&mut self, cycles: u32) {
        let Some(mut dma) = self.dma else {
            return;
        };
        dma.phase += cycles;
        while dma.phase >= DMA_CYCLES_PER_BYTE && dma.index < OAM_BYTES {
            dma.phase -= DMA_CYCLES_PER_BYTE;
            let byte = self.dma_read(dma.source.wrapping_add(dma.index as u16));
            self.ppu.oam[dma.index as usize] = byte;
            dma.index += 1;
        }
        self.dma = (dma.index < OAM_BYTES).then_some(dma);
    }

    /// Advance every clocked component by `cycles` T-cycles.
    pub fn update_time(&mut self, cycles: u32) {
        self.clock.advance(cycles);
        self.timer.step(cycles, &mut self.interrupts);
        self.serial.step(cycles, &mut self.interrupts);
        self.dma_step(cycles);
        if self.ppu.step(cycles, &mut self.interrupts) {
            self.clock.mark_frame();
        }
    }

    /// Drain bytes sent over the serial port.
    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
