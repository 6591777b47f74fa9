use crate::interrupts::{Interrupt, InterruptController};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing constants in T-cycles
const LINE_CYCLES: u16 = 456;
const MODE2_CYCLES: u16 = 80; // OAM scan
const MODE3_CYCLES: u16 = 172; // Pixel transfer without sprites
const SPRITE_PENALTY: u16 = 6; // Extra pixel transfer cycles per sprite on the line

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;
const TOTAL_LINES: u8 = SCREEN_HEIGHT as u8 + VBLANK_LINES;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// Internal memory sizes
const VRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;

// Window X position is clipped if greater than this value
const WINDOW_X_MAX: u8 = 166;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

// Tile dump layout: 384 tiles, 16 per row
const TILE_COUNT: usize = 384;
const TILES_PER_ROW: usize = 16;
pub const TILE_DUMP_WIDTH: usize = TILES_PER_ROW * 8;
pub const TILE_DUMP_HEIGHT: usize = TILE_COUNT / TILES_PER_ROW * 8;

// LCD modes
pub const MODE_HBLANK: u8 = 0;
pub const MODE_VBLANK: u8 = 1;
pub const MODE_OAM: u8 = 2;
pub const MODE_TRANSFER: u8 = 3;

// LCDC bits
const LCDC_BG_ENABLE: u8 = 0x01;
const LCDC_OBJ_ENABLE: u8 = 0x02;
const LCDC_OBJ_SIZE: u8 = 0x04;
const LCDC_BG_MAP: u8 = 0x08;
const LCDC_TILE_DATA: u8 = 0x10;
const LCDC_WINDOW_ENABLE: u8 = 0x20;
const LCDC_WINDOW_MAP: u8 = 0x40;
const LCDC_LCD_ENABLE: u8 = 0x80;

// STAT interrupt sources
const STAT_HBLANK_IRQ: u8 = 0x08;
const STAT_VBLANK_IRQ: u8 = 0x10;
const STAT_OAM_IRQ: u8 = 0x20;
const STAT_LYC_IRQ: u8 = 0x40;

/// Default DMG palette colors in 0x00RRGGBB order.
pub const DMG_PALETTE: [u32; 4] = [0x009BBC0F, 0x008BAC0F, 0x00306230, 0x000F380F];

/// A DMG palette register expanded into its shade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    raw: u8,
    shades: [u8; 4],
}

impl Palette {
    pub fn new(raw: u8) -> Self {
        let mut shades = [0u8; 4];
        for (color_id, shade) in shades.iter_mut().enumerate() {
            *shade = (raw >> (color_id * 2)) & 0x03;
        }
        Self { raw, shades }
    }

    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// Shade (0 lightest, 3 darkest) for a 2-bit color id.
    #[inline(always)]
    pub fn shade(&self, color_id: u8) -> u8 {
        self.shades[(color_id & 0x03) as usize]
    }
}

#[derive(Copy, Clone, Default, Debug)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
    oam_index: usize,
}

pub struct Ppu {
    pub vram: [u8; VRAM_SIZE],
    pub oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    pub dma: u8,
    bgp: Palette,
    obp0: Palette,
    obp1: Palette,
    wy: u8,
    wx: u8,

    /// Internal window line counter
    win_line_counter: u8,

    /// Cycle offset within the current line (0..456).
    line_cycles: u16,

    pub framebuffer: [u32; SCREEN_WIDTH * SCREEN_HEIGHT],
    colors: [u32; 4],
    line_color_zero: [bool; SCREEN_WIDTH],
    /// Latched sprites for the current scanline
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// Indicates a completed frame is available in `framebuffer`
    frame_ready: bool,
    frame_counter: u64,
}

impl Ppu {
    /// A PPU in the post-boot configuration: display on, LY=0, start of
    /// OAM scan.
    pub fn new() -> Self {
        Self {
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            lcdc: 0x91,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            dma: 0xFF,
            bgp: Palette::new(0xFC),
            obp0: Palette::new(0xFF),
            obp1: Palette::new(0xFF),
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            line_cycles: 0,
            framebuffer: [DMG_PALETTE[0]; SCREEN_WIDTH * SCREEN_HEIGHT],
            colors: DMG_PALETTE,
            line_color_zero: [false; SCREEN_WIDTH],
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            frame_ready: false,
            frame_counter: 0,
        }
    }

    fn lcd_enabled(&self) -> bool {
        self.lcdc & LCDC_LCD_ENABLE != 0
    }

    /// Length of mode 3 on the current line.
    fn transfer_cycles(&self) -> u16 {
        MODE3_CYCLES + SPRITE_PENALTY * self.sprite_count.min(MAX_SPRITES_PER_LINE) as u16
    }

    /// Current LCD mode, derived from LY and the line cycle offset.
    pub fn mode(&self) -> u8 {
        if !self.lcd_enabled() {
            MODE_HBLANK
        } else if self.ly >= SCREEN_HEIGHT as u8 {
            MODE_VBLANK
        } else if self.line_cycles < MODE2_CYCLES {
            MODE_OAM
        } else if self.line_cycles < MODE2_CYCLES + self.transfer_cycles() {
            MODE_TRANSFER
        } else {
            MODE_HBLANK
        }
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// Cycle offset within the current line.
    pub fn line_cycles(&self) -> u16 {
        self.line_cycles
    }

    pub fn vram_accessible(&self) -> bool {
        self.mode() != MODE_TRANSFER
    }

    pub fn oam_accessible(&self) -> bool {
        !matches!(self.mode(), MODE_OAM | MODE_TRANSFER)
    }

    /// Returns true if a full frame has been rendered and is ready to display.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Returns the current framebuffer. Call `frame_ready()` to check if a
    /// frame is complete. After presenting, call `clear_frame_flag()`.
    pub fn framebuffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    /// Clears the frame ready flag after a frame has been consumed.
    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Returns the number of frames that have been completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    /// Replace the four output colors used for shades 0-3.
    pub fn set_colors(&mut self, colors: [u32; 4]) {
        self.colors = colors;
    }

    /// Returns the current value of the internal window line counter.
    pub fn window_line_counter(&self) -> u8 {
        self.win_line_counter
    }

    /// Number of sprites selected by the OAM scan of the current line.
    pub fn line_sprite_count(&self) -> usize {
        self.sprite_count
    }

    /// Render every tile in VRAM tile data as raw 2-bit color ids, 16 tiles
    /// per row, into a `TILE_DUMP_WIDTH` x `TILE_DUMP_HEIGHT` buffer.
    pub fn tile_dump(&self) -> Vec<u8> {
        let mut out = vec![0u8; TILE_DUMP_WIDTH * TILE_DUMP_HEIGHT];
        for tile in 0..TILE_COUNT {
            let base_x = (tile % TILES_PER_ROW) * 8;
            let base_y = (tile / TILES_PER_ROW) * 8;
            for row in 0..8 {
                let lo = self.vram[tile * 16 + row * 2];
                let hi = self.vram[tile * 16 + row * 2 + 1];
                for col in 0..8 {
                    let bit = 7 - col;
                    let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                    out[(base_y + row) * TILE_DUMP_WIDTH + base_x + col] = color_id;
                }
            }
        }
        out
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                let coincidence = self.lcd_enabled() && self.ly == self.lyc;
                (self.stat & 0x78) | 0x80 | self.mode() | if coincidence { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp.raw(),
            0xFF48 => self.obp0.raw(),
            0xFF49 => self.obp1.raw(),
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8, interrupts: &mut InterruptController) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.ly = 0;
                    self.line_cycles = 0;
                    self.win_line_counter = 0;
                    self.sprite_count = 0;
                } else if !was_on && self.lcd_enabled() {
                    self.ly = 0;
                    self.line_cycles = 0;
                    self.sprite_count = 0;
                    self.check_coincidence(interrupts);
                }
            }
            0xFF41 => self.stat = val & 0x78,
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                if self.lcd_enabled() {
                    self.check_coincidence(interrupts);
                }
            }
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = Palette::new(val),
            0xFF48 => self.obp0 = Palette::new(val),
            0xFF49 => self.obp1 = Palette::new(val),
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    fn check_coincidence(&mut self, interrupts: &mut InterruptController) {
        if self.ly == self.lyc && self.stat & STAT_LYC_IRQ != 0 {
            interrupts.request(Interrupt::LcdStat);
        }
    }

    fn stat_irq(&self, source: u8, interrupts: &mut InterruptController) {
        if self.stat & source != 0 {
            interrupts.request(Interrupt::LcdStat);
        }
    }

    /// Advance the PPU by `cycles`, jumping from one mode boundary to the
    /// next. Returns true if a frame was completed.
    pub fn step(&mut self, cycles: u32, interrupts: &mut InterruptController) -> bool {
        if !self.lcd_enabled() {
            return false;
        }

        let mut completed = false;
        let mut remaining = cycles;
        while remaining > 0 {
            let boundary = self.next_boundary();
            let delta = ((boundary - self.line_cycles) as u32).min(remaining);
            self.line_cycles += delta as u16;
            remaining -= delta;
            if self.line_cycles == boundary {
                completed |= self.enter_boundary(interrupts);
            }
        }
        debug_assert!(self.line_cycles < LINE_CYCLES);
        completed
    }

    /// Line cycle offset of the next mode change on this line.
    fn next_boundary(&self) -> u16 {
        if self.ly >= SCREEN_HEIGHT as u8 {
            LINE_CYCLES
        } else if self.line_cycles < MODE2_CYCLES {
            MODE2_CYCLES
        } else if self.line_cycles < MODE2_CYCLES + self.transfer_cycles() {
            MODE2_CYCLES + self.transfer_cycles()
        } else {
            LINE_CYCLES
        }
    }

    fn enter_boundary(&mut self, interrupts: &mut InterruptController) -> bool {
        if self.line_cycles == LINE_CYCLES {
            return self.next_line(interrupts);
        }

        if self.line_cycles == MODE2_CYCLES {
            // 2 -> 3
            self.oam_scan();
            #[cfg(feature = "ppu-trace")]
            log::trace!("[PPU] LY={} mode 3, {} sprites", self.ly, self.sprite_count);
        } else {
            // 3 -> 0
            self.render_scanline();
            self.stat_irq(STAT_HBLANK_IRQ, interrupts);
        }
        false
    }

    fn next_line(&mut self, interrupts: &mut InterruptController) -> bool {
        self.line_cycles = 0;
        self.sprite_count = 0;
        self.ly += 1;
        let mut completed = false;

        if self.ly == SCREEN_HEIGHT as u8 {
            self.frame_ready = true;
            self.frame_counter = self.frame_counter.wrapping_add(1);
            completed = true;
            interrupts.request(Interrupt::VBlank);
            self.stat_irq(STAT_VBLANK_IRQ, interrupts);
        } else if self.ly == TOTAL_LINES {
            self.ly = 0;
            self.win_line_counter = 0;
            self.stat_irq(STAT_OAM_IRQ, interrupts);
        } else if self.ly < SCREEN_HEIGHT as u8 {
            self.stat_irq(STAT_OAM_IRQ, interrupts);
        }

        self.check_coincidence(interrupts);
        #[cfg(feature = "ppu-trace")]
        log::trace!("[PPU] LY={} mode {}", self.ly, self.mode());
        completed
    }

    /// Collect up to 10 sprites visible on the current scanline, ordered
    /// by X then OAM index.
    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & LCDC_OBJ_SIZE != 0 { 16 } else { 8 };
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            if self.ly as i16 >= y && (self.ly as i16) < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16 - 8,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                    oam_index: i,
                };
                self.sprite_count += 1;
            }
        }
        // Insertion sort is stable, so equal X keeps OAM order.
        for i in 1..self.sprite_count {
            let mut j = i;
            while j > 0 && self.line_sprites[j - 1].x > self.line_sprites[j].x {
                self.line_sprites.swap(j - 1, j);
                j -= 1;
            }
        }
        debug_assert!(
            self.line_sprites[..self.sprite_count]
                .windows(2)
                .all(|w| (w[0].x, w[0].oam_index) < (w[1].x, w[1].oam_index))
        );
    }

    fn tile_row(&self, tile_index: u8, row: usize) -> (u8, u8) {
        let addr = if self.lcdc & LCDC_TILE_DATA != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        };
        (self.vram[addr + row * 2], self.vram[addr + row * 2 + 1])
    }

    fn render_scanline(&mut self) {
        if self.ly as usize >= SCREEN_HEIGHT {
            return;
        }
        let line = self.ly as usize * SCREEN_WIDTH;

        // With the background disabled every pixel shows color 0 and
        // sprites treat the whole line as color 0.
        let blank = self.colors[self.bgp.shade(0) as usize];
        self.framebuffer[line..line + SCREEN_WIDTH].fill(blank);
        self.line_color_zero.fill(true);

        if self.lcdc & LCDC_BG_ENABLE != 0 {
            self.render_background(line);
            self.render_window(line);
        }
        if self.lcdc & LCDC_OBJ_ENABLE != 0 {
            self.render_sprites(line);
        }
    }

    fn render_background(&mut self, line: usize) {
        let tile_map_base = if self.lcdc & LCDC_BG_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let y = self.ly.wrapping_add(self.scy) as usize;
        let tile_row = y / 8;
        let tile_y = y % 8;

        for x in 0..SCREEN_WIDTH {
            let px = (x as u8).wrapping_add(self.scx) as usize;
            let tile_col = px / 8;
            let tile_index = self.vram[tile_map_base + tile_row * 32 + tile_col];
            let (lo, hi) = self.tile_row(tile_index, tile_y);
            let bit = 7 - (px % 8);
            let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
            self.framebuffer[line + x] = self.colors[self.bgp.shade(color_id) as usize];
            self.line_color_zero[x] = color_id == 0;
        }
    }

    fn render_window(&mut self, line: usize) {
        if self.lcdc & LCDC_WINDOW_ENABLE == 0 || self.ly < self.wy || self.wx > WINDOW_X_MAX {
            return;
        }
        let window_map_base = if self.lcdc & LCDC_WINDOW_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let wx = self.wx as i16 - 7;
        let window_y = self.win_line_counter as usize;
        let tile_row = window_y / 8;
        let tile_y = window_y % 8;

        for x in wx.max(0) as usize..SCREEN_WIDTH {
            let window_x = (x as i16 - wx) as usize;
            let tile_index = self.vram[window_map_base + tile_row * 32 + window_x / 8];
            let (lo, hi) = self.tile_row(tile_index, tile_y);
            let bit = 7 - (window_x % 8);
            let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
            self.framebuffer[line + x] = self.colors[self.bgp.shade(color_id) as usize];
            self.line_color_zero[x] = color_id == 0;
        }
        self.win_line_counter = self.win_line_counter.wrapping_add(1);
    }

    fn render_sprites(&mut self, line: usize) {
        let sprite_height: i16 = if self.lcdc & LCDC_OBJ_SIZE != 0 { 16 } else { 8 };
        // A pixel belongs to the highest-priority sprite with an opaque pixel
        // there, even when that sprite ends up hidden behind the background.
        let mut claimed = [false; SCREEN_WIDTH];
        for s in &self.line_sprites[..self.sprite_count] {
            let mut tile = s.tile;
            if sprite_height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = self.ly as i16 - s.y;
            if s.flags & 0x40 != 0 {
                line_idx = sprite_height - 1 - line_idx;
            }
            let addr = (tile as usize + (line_idx as usize >> 3)) * 16 + (line_idx as usize & 7) * 2;
            let lo = self.vram[addr];
            let hi = self.vram[addr + 1];
            let palette = if s.flags & 0x10 != 0 {
                self.obp1
            } else {
                self.obp0
            };

            for px in 0..8 {
                let bit = if s.flags & 0x20 != 0 { px } else { 7 - px };
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                if color_id == 0 {
                    continue;
                }
                let sx = s.x + px as i16;
                if !(0i16..SCREEN_WIDTH as i16).contains(&sx) || claimed[sx as usize] {
                    continue;
                }
                let sx = sx as usize;
                claimed[sx] = true;
                if s.flags & 0x80 != 0 && !self.line_color_zero[sx] {
                    continue;
                }
                self.framebuffer[line + sx] = self.colors[palette.shade(color_id) as usize];
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
