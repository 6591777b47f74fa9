#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// DMG hardware revision.
///
/// Selects the register contents the boot ROM leaves behind, which differ
/// between the original Rev0 board and the later ones.
pub enum DmgRevision {
    Rev0,
    RevA,
    RevB,
    #[default]
    RevC,
}

impl DmgRevision {
    /// Internal 16-bit divider value at the moment the boot ROM hands over
    /// to the cartridge.
    #[inline]
    pub const fn boot_div(self) -> u16 {
        match self {
            DmgRevision::Rev0 => 0x1830,
            DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => 0xABCC,
        }
    }
}
