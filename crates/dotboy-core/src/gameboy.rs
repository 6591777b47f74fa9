use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::Cpu,
    hardware::DmgRevision,
    input::{InputSource, JoypadState},
    mmu::Mmu,
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};

/// T-cycles from one VBlank to the next: 154 lines of 456 cycles.
pub const CYCLES_PER_FRAME: u32 = 70224;

/// A finished frame, copied out of the PPU so the core can keep drawing.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Row-major `0x00RRGGBB` pixels, 160x144.
    pub pixels: Box<[u32]>,
}

impl Frame {
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * SCREEN_WIDTH + x]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({SCREEN_WIDTH}x{SCREEN_HEIGHT})")
    }
}

/// Receives completed frames from [`GameBoy::run_frame`].
pub trait FrameSink {
    fn present(&mut self, frame: &Frame);

    /// Whether the sink also wants a tile data dump after each frame.
    fn wants_tiles(&self) -> bool {
        false
    }

    /// Raw color ids from [`crate::ppu::Ppu::tile_dump`].
    fn present_tiles(&mut self, _tiles: &[u8]) {}
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    pub revision: DmgRevision,
    input: Option<Box<dyn InputSource>>,
}

impl GameBoy {
    pub fn new(cart: Cartridge) -> Self {
        Self::with_revision(cart, DmgRevision::default())
    }

    pub fn with_revision(cart: Cartridge, revision: DmgRevision) -> Self {
        let mut mmu = Mmu::with_revision(revision);
        mmu.load_cart(cart);
        Self {
            cpu: Cpu::with_revision(revision),
            mmu,
            revision,
            input: None,
        }
    }

    pub fn from_rom(rom: Vec<u8>) -> Result<Self, CartridgeError> {
        Ok(Self::new(Cartridge::load(rom)?))
    }

    pub fn set_input_source(&mut self, source: Box<dyn InputSource>) {
        self.input = Some(source);
    }

    pub fn set_joypad(&mut self, state: JoypadState) {
        self.mmu.input.set_state(state, &mut self.mmu.interrupts);
    }

    /// Run whole instructions until at least `max_cycles` T-cycles have
    /// elapsed, polling the input source before each one.
    pub fn step(&mut self, max_cycles: u32) -> u32 {
        let mut total = 0;
        while total < max_cycles {
            if let Some(source) = self.input.as_mut() {
                let state = source.poll();
                self.mmu.input.set_state(state, &mut self.mmu.interrupts);
            }
            total += self.cpu.step_instruction(&mut self.mmu);
        }
        total
    }

    /// Copy out the completed frame, if any, and clear the ready flag.
    pub fn take_frame(&mut self) -> Option<Frame> {
        if !self.mmu.ppu.frame_ready() {
            return None;
        }
        let frame = Frame {
            pixels: self.mmu.ppu.framebuffer().to_vec().into_boxed_slice(),
        };
        self.mmu.ppu.clear_frame_flag();
        Some(frame)
    }

    /// Run one frame's worth of cycles and hand any completed frame to
    /// `sink`. Returns the cycles spent.
    pub fn run_frame(&mut self, sink: &mut dyn FrameSink) -> u32 {
        let cycles = self.step(CYCLES_PER_FRAME);
        if let Some(frame) = self.take_frame() {
            sink.present(&frame);
            if sink.wants_tiles() {
                sink.present_tiles(&self.mmu.ppu.tile_dump());
            }
        }
        cycles
    }

    /// Return to the post-boot state, keeping the cartridge and its RAM.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::with_revision(self.revision);
        self.mmu = Mmu::with_revision(self.revision);
        if let Some(cart) = cart {
            self.mmu.load_cart(cart);
        }
    }
}
