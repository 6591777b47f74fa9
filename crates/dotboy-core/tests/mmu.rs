use dotboy_core::input::button;
use dotboy_core::interrupts::Interrupt;
use dotboy_core::mmu::Mmu;
use dotboy_core::JoypadState;

/// An MMU with the LCD switched off so VRAM and OAM are always open.
fn mmu_lcd_off() -> Mmu {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF40, 0x11);
    mmu
}

#[test]
fn echo_ram_mirrors_work_ram() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xC123, 0x5A);
    assert_eq!(mmu.read_byte(0xE123), 0x5A);
    mmu.write_byte(0xFDFF, 0xA5);
    assert_eq!(mmu.read_byte(0xDDFF), 0xA5);
}

#[test]
fn unusable_and_unmapped_regions_read_ff() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFEA0, 0x12);
    assert_eq!(mmu.read_byte(0xFEA0), 0xFF);
    assert_eq!(mmu.read_byte(0xFEFF), 0xFF);
    for addr in [0xFF03, 0xFF08, 0xFF4C, 0xFF50, 0xFF7F] {
        assert_eq!(mmu.read_byte(addr), 0xFF, "{addr:#06X}");
    }
    // No cartridge inserted.
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn high_ram_round_trips() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF80, 0x01);
    mmu.write_byte(0xFFFE, 0x02);
    assert_eq!(mmu.read_byte(0xFF80), 0x01);
    assert_eq!(mmu.read_byte(0xFFFE), 0x02);
}

#[test]
fn interrupt_registers() {
    let mut mmu = Mmu::new();
    assert_eq!(mmu.read_byte(0xFF0F), 0xE1);
    mmu.write_byte(0xFF0F, 0xFF);
    assert_eq!(mmu.read_byte(0xFF0F), 0xFF);
    mmu.write_byte(0xFF0F, 0x00);
    assert_eq!(mmu.read_byte(0xFF0F), 0xE0);

    assert_eq!(mmu.read_byte(0xFFFF), 0x00);
    mmu.write_byte(0xFFFF, 0xAB);
    assert_eq!(mmu.read_byte(0xFFFF), 0xAB);
    assert_eq!(mmu.interrupts.enabled(), 0xAB);
}

#[test]
fn oam_dma_copies_one_byte_per_machine_cycle() {
    let mut mmu = mmu_lcd_off();
    for i in 0..0xA0u16 {
        mmu.write_byte(0xC000 + i, i as u8 ^ 0x55);
    }
    mmu.write_byte(0xFF46, 0xC0);
    assert_eq!(mmu.read_byte(0xFF46), 0xC0);
    assert!(mmu.dma_active());
    assert_eq!(mmu.read_byte(0xFE00), 0xFF);

    mmu.update_time(4 * 80);
    assert!(mmu.dma_active());
    assert_eq!(mmu.ppu.oam[79], 79 ^ 0x55);
    assert_eq!(mmu.ppu.oam[80], 0);
    // OAM writes from the CPU are dropped while the copy runs.
    mmu.write_byte(0xFE9F, 0x01);

    mmu.update_time(4 * 80);
    assert!(!mmu.dma_active());
    for i in 0..0xA0u16 {
        assert_eq!(mmu.read_byte(0xFE00 + i), i as u8 ^ 0x55);
    }
}

#[test]
fn oam_dma_from_echo_page_reads_work_ram() {
    let mut mmu = mmu_lcd_off();
    mmu.write_byte(0xC000, 0x11);
    mmu.write_byte(0xC09F, 0x22);
    mmu.write_byte(0xFF46, 0xE0);
    mmu.update_time(4 * 0xA0);
    assert_eq!(mmu.read_byte(0xFE00), 0x11);
    assert_eq!(mmu.read_byte(0xFE9F), 0x22);
}

#[test]
fn oam_dma_ignores_ppu_locks() {
    let mut mmu = mmu_lcd_off();
    mmu.write_byte(0x8000, 0x77);
    mmu.write_byte(0xFF40, 0x91);
    mmu.write_byte(0xFF46, 0x80);
    mmu.update_time(4 * 0xA0);
    assert_eq!(mmu.ppu.oam[0], 0x77);
}

#[test]
fn serial_output_through_bus() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF0F, 0x00);
    mmu.write_byte(0xFF01, b'H');
    mmu.write_byte(0xFF02, 0x81);
    assert_eq!(mmu.read_byte(0xFF02), 0xFF);
    mmu.update_time(4096);
    assert_eq!(mmu.read_byte(0xFF02), 0x7F);
    assert!(mmu.interrupts.is_requested(Interrupt::Serial));
    assert_eq!(mmu.take_serial(), b"H".to_vec());
    assert!(mmu.take_serial().is_empty());
}

#[test]
fn joypad_through_bus() {
    let mut mmu = Mmu::new();
    assert_eq!(mmu.read_byte(0xFF00), 0xCF);
    mmu.write_byte(0xFF0F, 0x00);
    mmu.write_byte(0xFF00, 0x20);
    mmu.input.set_state(
        JoypadState {
            dpad: button::UP,
            buttons: 0,
        },
        &mut mmu.interrupts,
    );
    assert_eq!(mmu.read_byte(0xFF00), 0xEB);
    assert!(mmu.interrupts.is_requested(Interrupt::Joypad));
}

#[test]
fn sound_registers_through_bus() {
    let mut mmu = Mmu::new();
    assert_eq!(mmu.read_byte(0xFF26), 0xF0);
    assert_eq!(mmu.read_byte(0xFF24), 0x77);
    mmu.write_byte(0xFF26, 0x00);
    assert_eq!(mmu.read_byte(0xFF26), 0x70);
    assert_eq!(mmu.read_byte(0xFF24), 0x00);
    mmu.write_byte(0xFF24, 0x55);
    assert_eq!(mmu.read_byte(0xFF24), 0x00);
    mmu.write_byte(0xFF30, 0x12);
    assert_eq!(mmu.read_byte(0xFF30), 0x12);
}

#[test]
fn clock_counts_cycles_and_frames() {
    let mut mmu = Mmu::new();
    mmu.update_time(70224);
    assert_eq!(mmu.clock.cycles(), 70224);
    assert_eq!(mmu.clock.frames(), 1);
}
