// gba-cartridge-rs/src/core/cartridge/flash/mod.rs

//! FlashROM save chips
//!
//! 64KB and 128KB parts driven by JEDEC-style command sequences written to
//! 0x0E005555 / 0x0E002AAA. The 128KB parts expose two 64KB banks.

pub mod flash_rom;

pub use flash_rom::{FlashRom, FlashState};

/// Size of one bank
pub const BANK_SIZE: usize = 64 * 1024;

/// Size of the region cleared by a sector erase
pub const SECTOR_SIZE: usize = 4 * 1024;

/// Known FlashROM parts, identified by manufacturer (low byte) and device
/// (high byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashChip {
    AtmelAt29Lv512,
    SstSt39Lf512,
    PanasonicMn63F805,
    MacronixMx29L512,
    MacronixMx29L010,
    SanyoLe26Fv10,
    Unknown(u16),
}

impl FlashChip {
    pub fn from_id(id: u16) -> Self {
        match id {
            0x3D1F => FlashChip::AtmelAt29Lv512,
            0xD4BF => FlashChip::SstSt39Lf512,
            0x1B32 => FlashChip::PanasonicMn63F805,
            0x1CC2 => FlashChip::MacronixMx29L512,
            0x09C2 => FlashChip::MacronixMx29L010,
            0x1362 => FlashChip::SanyoLe26Fv10,
            other => FlashChip::Unknown(other),
        }
    }

    /// Atmel parts write 128-byte pages and have no 4KB sector erase
    pub fn has_sector_erase(self) -> bool {
        self != FlashChip::AtmelAt29Lv512
    }
}

impl std::fmt::Display for FlashChip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashChip::AtmelAt29Lv512 => write!(f, "Atmel AT29LV512"),
            FlashChip::SstSt39Lf512 => write!(f, "SST 39LF512"),
            FlashChip::PanasonicMn63F805 => write!(f, "Panasonic MN63F805MNP"),
            FlashChip::MacronixMx29L512 => write!(f, "Macronix MX29L512"),
            FlashChip::MacronixMx29L010 => write!(f, "Macronix MX29L010"),
            FlashChip::SanyoLe26Fv10 => write!(f, "Sanyo LE26FV10N1TS"),
            FlashChip::Unknown(id) => write!(f, "unknown ({:#06X})", id),
        }
    }
}
