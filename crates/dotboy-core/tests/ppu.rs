use dotboy_core::interrupts::{Interrupt, InterruptController};
use dotboy_core::mmu::Mmu;
use dotboy_core::ppu::{
    DMG_PALETTE, MODE_HBLANK, MODE_OAM, MODE_TRANSFER, MODE_VBLANK, Ppu, SCREEN_WIDTH,
    TILE_DUMP_HEIGHT, TILE_DUMP_WIDTH,
};

const FRAME_CYCLES: u32 = 70224;

fn expected_mode(ly: u8, line_cycles: u16) -> u8 {
    if ly >= 144 {
        MODE_VBLANK
    } else if line_cycles < 80 {
        MODE_OAM
    } else if line_cycles < 252 {
        MODE_TRANSFER
    } else {
        MODE_HBLANK
    }
}

#[test]
fn frame_walks_every_line_and_mode() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    let mut vblanks = 0;
    let mut frames = 0;

    for step in 0..FRAME_CYCLES / 4 {
        let elapsed = step * 4;
        let ly = (elapsed / 456) as u8;
        let line_cycles = (elapsed % 456) as u16;
        assert_eq!(ppu.ly(), ly, "cycle {elapsed}");
        assert_eq!(ppu.line_cycles(), line_cycles, "cycle {elapsed}");
        assert_eq!(ppu.mode(), expected_mode(ly, line_cycles), "cycle {elapsed}");

        if ppu.step(4, &mut ic) {
            frames += 1;
        }
        if ic.is_requested(Interrupt::VBlank) {
            vblanks += 1;
            ic.clear(Interrupt::VBlank);
        }
    }

    assert_eq!(frames, 1);
    assert_eq!(vblanks, 1);
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.line_cycles(), 0);
    assert!(ppu.frame_ready());
}

#[test]
fn large_steps_match_small_steps() {
    let mut ic_a = InterruptController::new();
    let mut ic_b = InterruptController::new();
    let mut a = Ppu::new();
    let mut b = Ppu::new();
    a.vram[0..16].fill(0xAA);
    b.vram[0..16].fill(0xAA);

    for _ in 0..FRAME_CYCLES / 4 {
        a.step(4, &mut ic_a);
    }
    b.step(FRAME_CYCLES, &mut ic_b);

    assert_eq!(a.ly(), b.ly());
    assert_eq!(a.framebuffer()[..], b.framebuffer()[..]);
    assert_eq!(ic_a.pending(), ic_b.pending());
}

#[test]
fn stat_reads_mode_and_coincidence() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    assert_eq!(ppu.read_reg(0xFF41), 0x86);
    ppu.write_reg(0xFF41, 0xFF, &mut ic);
    assert_eq!(ppu.read_reg(0xFF41), 0xFE);
    ppu.write_reg(0xFF45, 0x05, &mut ic);
    ppu.step(80, &mut ic);
    assert_eq!(ppu.read_reg(0xFF41), 0xFB);
}

#[test]
fn lyc_match_raises_stat() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.write_reg(0xFF45, 2, &mut ic);
    ppu.write_reg(0xFF41, 0x40, &mut ic);

    ppu.step(456, &mut ic);
    assert!(!ic.is_requested(Interrupt::LcdStat));
    ppu.step(456, &mut ic);
    assert_eq!(ppu.ly(), 2);
    assert!(ic.is_requested(Interrupt::LcdStat));
}

#[test]
fn lyc_write_matching_current_line_raises_stat() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.write_reg(0xFF41, 0x40, &mut ic);
    ppu.step(456 * 3, &mut ic);
    ic.clear(Interrupt::LcdStat);
    ppu.write_reg(0xFF45, 3, &mut ic);
    assert!(ic.is_requested(Interrupt::LcdStat));
}

#[test]
fn mode_interrupt_sources() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.write_reg(0xFF41, 0x08, &mut ic);
    ppu.step(251, &mut ic);
    assert!(!ic.is_requested(Interrupt::LcdStat));
    ppu.step(1, &mut ic);
    assert!(ic.is_requested(Interrupt::LcdStat));

    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.write_reg(0xFF41, 0x10, &mut ic);
    ppu.step(144 * 456, &mut ic);
    assert!(ic.is_requested(Interrupt::LcdStat));
    assert!(ic.is_requested(Interrupt::VBlank));
}

#[test]
fn sprites_extend_pixel_transfer() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    for i in 0..12 {
        ppu.oam[i * 4] = 16;
        ppu.oam[i * 4 + 1] = 8 + i as u8 * 8;
    }
    ppu.step(80, &mut ic);
    assert_eq!(ppu.line_sprite_count(), 10);
    ppu.step(172, &mut ic);
    assert_eq!(ppu.mode(), MODE_TRANSFER);
    ppu.step(59, &mut ic);
    assert_eq!(ppu.mode(), MODE_TRANSFER);
    ppu.step(1, &mut ic);
    assert_eq!(ppu.mode(), MODE_HBLANK);
}

#[test]
fn lcd_off_parks_ppu() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.step(456 * 5 + 100, &mut ic);
    ppu.write_reg(0xFF40, 0x11, &mut ic);
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.mode(), MODE_HBLANK);
    assert!(ppu.vram_accessible());
    assert!(ppu.oam_accessible());
    assert!(!ppu.step(FRAME_CYCLES, &mut ic));
    assert_eq!(ppu.ly(), 0);

    ppu.write_reg(0xFF40, 0x91, &mut ic);
    assert_eq!(ppu.mode(), MODE_OAM);
}

fn render_frame(ppu: &mut Ppu) {
    let mut ic = InterruptController::new();
    ppu.step(FRAME_CYCLES, &mut ic);
}

#[test]
fn background_uses_palette() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    // Tile 0 row 0: color ids 3,3,3,3,0,0,0,0 ... rows 1-7 all 2.
    ppu.vram[0] = 0xF0;
    ppu.vram[1] = 0xF0;
    for row in 1..8 {
        ppu.vram[row * 2 + 1] = 0xFF;
    }
    ppu.write_reg(0xFF47, 0xE4, &mut ic);
    render_frame(&mut ppu);

    let fb = ppu.framebuffer();
    assert_eq!(fb[0], DMG_PALETTE[3]);
    assert_eq!(fb[4], DMG_PALETTE[0]);
    assert_eq!(fb[8], DMG_PALETTE[3]);
    assert_eq!(fb[SCREEN_WIDTH], DMG_PALETTE[2]);

    // Inverted palette.
    ppu.write_reg(0xFF47, 0x1B, &mut ic);
    render_frame(&mut ppu);
    assert_eq!(ppu.framebuffer()[0], DMG_PALETTE[0]);
}

#[test]
fn background_scrolls() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    // Tile 1 solid color 1, placed at map column 1.
    for row in 0..8 {
        ppu.vram[16 + row * 2] = 0xFF;
    }
    ppu.vram[0x1801] = 1;
    ppu.write_reg(0xFF47, 0xE4, &mut ic);
    ppu.write_reg(0xFF43, 4, &mut ic);
    render_frame(&mut ppu);
    let fb = ppu.framebuffer();
    assert_eq!(fb[3], DMG_PALETTE[0]);
    assert_eq!(fb[4], DMG_PALETTE[1]);
    assert_eq!(fb[11], DMG_PALETTE[1]);
    assert_eq!(fb[12], DMG_PALETTE[0]);
}

#[test]
fn signed_tile_addressing() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    // LCDC bit 4 clear: index 0 means the tile at 0x9000.
    for row in 0..8 {
        ppu.vram[0x1000 + row * 2 + 1] = 0xFF;
    }
    ppu.write_reg(0xFF47, 0xE4, &mut ic);
    ppu.write_reg(0xFF40, 0x81, &mut ic);
    render_frame(&mut ppu);
    assert_eq!(ppu.framebuffer()[0], DMG_PALETTE[2]);
}

#[test]
fn window_covers_background() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    // Background map 1 points at tile 1 (solid color 3); window map 0 at
    // tile 0 (color 0).
    for row in 0..8 {
        ppu.vram[16 + row * 2] = 0xFF;
        ppu.vram[16 + row * 2 + 1] = 0xFF;
    }
    ppu.vram[0x1C00..0x2000].fill(1);
    ppu.write_reg(0xFF47, 0xE4, &mut ic);
    ppu.write_reg(0xFF40, 0xB9, &mut ic);
    ppu.write_reg(0xFF4A, 10, &mut ic);
    ppu.write_reg(0xFF4B, 87, &mut ic);

    ppu.step(456 * 20, &mut ic);
    assert_eq!(ppu.window_line_counter(), 10);

    render_frame(&mut ppu);
    let fb = ppu.framebuffer();
    assert_eq!(fb[9 * SCREEN_WIDTH + 80], DMG_PALETTE[3]);
    assert_eq!(fb[10 * SCREEN_WIDTH + 79], DMG_PALETTE[3]);
    assert_eq!(fb[10 * SCREEN_WIDTH + 80], DMG_PALETTE[0]);
    // Back on line 20 of the next frame.
    assert_eq!(ppu.ly(), 20);
    assert_eq!(ppu.window_line_counter(), 10);
}

#[test]
fn window_past_x_166_is_hidden() {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    ppu.write_reg(0xFF40, 0xB1, &mut ic);
    ppu.write_reg(0xFF4B, 167, &mut ic);
    ppu.step(456 * 5, &mut ic);
    assert_eq!(ppu.window_line_counter(), 0);
}

fn sprite_setup(flags: u8) -> Ppu {
    let mut ic = InterruptController::new();
    let mut ppu = Ppu::new();
    // Tile 1: solid color 3.
    ppu.vram[16..32].fill(0xFF);
    ppu.oam[0] = 16;
    ppu.oam[1] = 8;
    ppu.oam[2] = 1;
    ppu.oam[3] = flags;
    ppu.write_reg(0xFF47, 0xE4, &mut ic);
    ppu.write_reg(0xFF48, 0xE4, &mut ic);
    ppu.write_reg(0xFF49, 0x54, &mut ic);
    ppu.write_reg(0xFF40, 0x93, &mut ic);
    ppu
}

#[test]
fn sprite_draws_over_background() {
    let mut ppu = sprite_setup(0x00);
    render_frame(&mut ppu);
    let fb = ppu.framebuffer();
    assert_eq!(fb[0], DMG_PALETTE[3]);
    assert_eq!(fb[7 * SCREEN_WIDTH + 7], DMG_PALETTE[3]);
    assert_eq!(fb[8], DMG_PALETTE[0]);
    assert_eq!(fb[8 * SCREEN_WIDTH], DMG_PALETTE[0]);
}

#[test]
fn sprite_uses_second_palette() {
    let mut ppu = sprite_setup(0x10);
    render_frame(&mut ppu);
    assert_eq!(ppu.framebuffer()[0], DMG_PALETTE[1]);
}

#[test]
fn behind_background_sprite_only_shows_on_color_zero() {
    let mut ppu = sprite_setup(0x80);
    render_frame(&mut ppu);
    assert_eq!(ppu.framebuffer()[0], DMG_PALETTE[3]);

    // Background tile 0 row 0 becomes color 1 in its left half.
    let mut ppu = sprite_setup(0x80);
    ppu.vram[0] = 0xF0;
    render_frame(&mut ppu);
    let fb = ppu.framebuffer();
    assert_eq!(fb[0], DMG_PALETTE[1]);
    assert_eq!(fb[4], DMG_PALETTE[3]);
}

#[test]
fn lower_x_sprite_wins_overlap() {
    let mut ppu = sprite_setup(0x00);
    // A later OAM entry with a smaller X still wins.
    ppu.oam[4] = 16;
    ppu.oam[5] = 4;
    ppu.oam[6] = 1;
    ppu.oam[7] = 0x10;
    render_frame(&mut ppu);
    let fb = ppu.framebuffer();
    assert_eq!(fb[0], DMG_PALETTE[1]);
    assert_eq!(fb[7], DMG_PALETTE[3]);
}

/// Sprite pixel at screen `(x, y)`, with the sprite at the top-left corner
/// and the background blank.
fn pixel(ppu: &Ppu, x: usize, y: usize) -> u32 {
    ppu.framebuffer()[y * SCREEN_WIDTH + x]
}

/// Tile 1 with only its top-left pixel set (color 3).
fn corner_sprite(flags: u8) -> Ppu {
    let mut ppu = sprite_setup(flags);
    ppu.vram[16..32].fill(0);
    ppu.vram[16] = 0x80;
    ppu.vram[17] = 0x80;
    render_frame(&mut ppu);
    ppu
}

#[test]
fn sprite_flips_move_the_corner_pixel() {
    for (flags, corner) in [(0x00, (0, 0)), (0x20, (7, 0)), (0x40, (0, 7)), (0x60, (7, 7))] {
        let ppu = corner_sprite(flags);
        for (x, y) in [(0, 0), (7, 0), (0, 7), (7, 7)] {
            let expected = if (x, y) == corner {
                DMG_PALETTE[3]
            } else {
                DMG_PALETTE[0]
            };
            assert_eq!(pixel(&ppu, x, y), expected, "flags {flags:#04X} at ({x},{y})");
        }
    }
}

/// 8x16 sprite using tile index 3, so the pair is tiles 2 and 3. Tile 2's
/// top-left pixel is color 3; tile 3's bottom-right pixel is color 1.
fn tall_sprite(flags: u8) -> Ppu {
    let mut ic = InterruptController::new();
    let mut ppu = sprite_setup(flags);
    ppu.vram[16..64].fill(0);
    ppu.vram[32] = 0x80;
    ppu.vram[33] = 0x80;
    ppu.vram[48 + 14] = 0x01;
    ppu.oam[2] = 3;
    ppu.write_reg(0xFF40, 0x97, &mut ic);
    render_frame(&mut ppu);
    ppu
}

#[test]
fn tall_sprite_ignores_low_tile_bit() {
    let ppu = tall_sprite(0x00);
    assert_eq!(pixel(&ppu, 0, 0), DMG_PALETTE[3]);
    assert_eq!(pixel(&ppu, 7, 15), DMG_PALETTE[1]);
    assert_eq!(pixel(&ppu, 0, 8), DMG_PALETTE[0]);
    assert_eq!(pixel(&ppu, 0, 16), DMG_PALETTE[0]);
}

#[test]
fn tall_sprite_flips_across_both_tiles() {
    let ppu = tall_sprite(0x40);
    assert_eq!(pixel(&ppu, 7, 0), DMG_PALETTE[1]);
    assert_eq!(pixel(&ppu, 0, 15), DMG_PALETTE[3]);
    assert_eq!(pixel(&ppu, 0, 0), DMG_PALETTE[0]);

    let ppu = tall_sprite(0x60);
    assert_eq!(pixel(&ppu, 0, 0), DMG_PALETTE[1]);
    assert_eq!(pixel(&ppu, 7, 15), DMG_PALETTE[3]);
}

#[test]
fn tile_dump_lays_out_sixteen_per_row() {
    let mut ppu = Ppu::new();
    ppu.vram[0] = 0x80;
    ppu.vram[1] = 0x80;
    ppu.vram[16 * 16] = 0x01;
    let dump = ppu.tile_dump();
    assert_eq!(dump.len(), TILE_DUMP_WIDTH * TILE_DUMP_HEIGHT);
    assert_eq!((TILE_DUMP_WIDTH, TILE_DUMP_HEIGHT), (128, 192));
    assert_eq!(dump[0], 3);
    assert_eq!(dump[1], 0);
    assert_eq!(dump[8 * TILE_DUMP_WIDTH + 7], 1);
}

#[test]
fn vram_locked_during_transfer() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0x8000, 0x11);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    mmu.write_byte(0xFE00, 0x22);
    assert_eq!(mmu.read_byte(0xFE00), 0xFF);

    mmu.update_time(80);
    assert_eq!(mmu.ppu.mode(), MODE_TRANSFER);
    assert_eq!(mmu.read_byte(0x8000), 0xFF);
    mmu.write_byte(0x8000, 0x33);

    mmu.update_time(172);
    assert_eq!(mmu.ppu.mode(), MODE_HBLANK);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    mmu.write_byte(0xFE00, 0x44);
    assert_eq!(mmu.read_byte(0xFE00), 0x44);
}
