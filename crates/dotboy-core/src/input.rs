use crate::interrupts::{Interrupt, InterruptController};

pub mod button {
    pub const RIGHT: u8 = 0x01;
    pub const LEFT: u8 = 0x02;
    pub const UP: u8 = 0x04;
    pub const DOWN: u8 = 0x08;

    pub const A: u8 = 0x01;
    pub const B: u8 = 0x02;
    pub const SELECT: u8 = 0x04;
    pub const START: u8 = 0x08;
}

const SELECT_DPAD: u8 = 0x10;
const SELECT_BUTTONS: u8 = 0x20;

/// Host-side view of the pad. A set bit means the button is held.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoypadState {
    /// Right, Left, Up, Down in bits 0-3.
    pub dpad: u8,
    /// A, B, Select, Start in bits 0-3.
    pub buttons: u8,
}

/// Something the emulator can ask for the current pad state once per step.
pub trait InputSource {
    fn poll(&mut self) -> JoypadState;
}

/// The P1/JOYP register.
#[derive(Debug)]
pub struct Input {
    /// Selection bits 4-5 as last written (active-low).
    select: u8,
    dpad: u8,
    buttons: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            select: 0,
            dpad: 0,
            buttons: 0,
        }
    }

    /// Active-high mask of buttons visible through the current selection.
    fn selected(&self) -> u8 {
        let mut pressed = 0;
        if self.select & SELECT_DPAD == 0 {
            pressed |= self.dpad;
        }
        if self.select & SELECT_BUTTONS == 0 {
            pressed |= self.buttons;
        }
        pressed & 0x0F
    }

    pub fn read(&self) -> u8 {
        0xC0 | self.select | (!self.selected() & 0x0F)
    }

    pub fn write(&mut self, val: u8, interrupts: &mut InterruptController) {
        let before = self.selected();
        self.select = val & 0x30;
        self.raise_on_press(before, interrupts);
    }

    /// Replace the held buttons. Any selected line going from high to low
    /// requests the Joypad interrupt.
    pub fn set_state(&mut self, state: JoypadState, interrupts: &mut InterruptController) {
        let before = self.selected();
        self.dpad = state.dpad & 0x0F;
        self.buttons = state.buttons & 0x0F;
        self.raise_on_press(before, interrupts);
    }

    pub fn state(&self) -> JoypadState {
        JoypadState {
            dpad: self.dpad,
            buttons: self.buttons,
        }
    }

    /// True when any selected input line reads low.
    pub fn line_low(&self) -> bool {
        self.selected() != 0
    }

    fn raise_on_press(&self, before: u8, interrupts: &mut InterruptController) {
        if self.selected() & !before != 0 {
            interrupts.request(Interrupt::Joypad);
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
