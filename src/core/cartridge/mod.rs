// gba-cartridge-rs/src/core/cartridge/mod.rs

//! Cartridge device module
//!
//! This module implements the devices found on a Game Boy Advance cartridge:
//! the program ROM and the three save-memory technologies (battery-backed
//! SRAM/FRAM, serial EEPROM and FlashROM). A cartridge carries at most one
//! save device.

pub mod eeprom;
pub mod flash;
pub mod interface;
pub mod rom;

// Re-export types
pub use eeprom::{EepromState, Request, SerialEeprom};
pub use flash::{FlashChip, FlashRom, FlashState};
pub use interface::{
    AccessObserver, CartridgeDescriptor, MediaInterface, MemoryId, RamDescriptor,
    RomDescriptor, SaveAccess, SaveMemory,
};
pub use rom::ProgramImage;

use std::str::FromStr;

use crate::core::memory::ConfigurationError;

/// Save memory (backing store) type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// No save memory
    None,
    /// Battery-backed SRAM or FRAM
    StaticRam,
    /// Serial EEPROM (512 bytes or 8KB)
    SerialEeprom,
    /// FlashROM (64KB or 128KB)
    FlashRom,
}

impl StoreKind {
    /// Identifier used when requesting save content from the loader
    pub fn memory_id(self) -> Option<MemoryId> {
        match self {
            StoreKind::None => None,
            StoreKind::StaticRam => Some(MemoryId::Ram),
            StoreKind::SerialEeprom => Some(MemoryId::Eeprom),
            StoreKind::FlashRom => Some(MemoryId::FlashRom),
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            StoreKind::None => 0,
            StoreKind::StaticRam => 1,
            StoreKind::SerialEeprom => 2,
            StoreKind::FlashRom => 3,
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::None => write!(f, "None"),
            StoreKind::StaticRam => write!(f, "SRAM"),
            StoreKind::SerialEeprom => write!(f, "EEPROM"),
            StoreKind::FlashRom => write!(f, "FlashROM"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = ConfigurationError;

    /// Parses the type names used by cartridge manifests
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SRAM" | "FRAM" => Ok(StoreKind::StaticRam),
            "EEPROM" => Ok(StoreKind::SerialEeprom),
            "FlashROM" => Ok(StoreKind::FlashRom),
            other => Err(ConfigurationError::UnknownStoreKind(other.to_string())),
        }
    }
}
