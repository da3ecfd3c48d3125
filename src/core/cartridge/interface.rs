// gba-cartridge-rs/src/core/cartridge/interface.rs

//! Contracts with the host: the loader that supplies image and save bytes,
//! the persistence registrations, and the save-access observer.

use bitflags::bitflags;

/// Identifies a loadable blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryId {
    Rom,
    Ram,
    Eeprom,
    FlashRom,
}

/// Program image entry of a cartridge descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RomDescriptor {
    pub name: String,
    pub size: usize,
}

/// Save memory entry of a cartridge descriptor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RamDescriptor {
    /// "SRAM", "FRAM", "EEPROM" or "FlashROM"
    pub kind: String,
    pub name: String,
    pub size: usize,
    /// FlashROM manufacturer (low byte) and device (high byte) id
    pub id: u16,
    /// Forces the EEPROM address width (6 or 14); derived from `size` if absent
    pub address_bits: Option<u8>,
}

/// Resolved cartridge description handed over by the loader
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartridgeDescriptor {
    pub title: String,
    pub rom: RomDescriptor,
    pub ram: Option<RamDescriptor>,
}

/// Loader collaborator
pub trait MediaInterface {
    /// Fill `target` with the blob `name` and return how many bytes were
    /// supplied. `target` already holds the erased pattern; returning 0 means
    /// the blob does not exist.
    fn load_request(&mut self, id: MemoryId, name: &str, target: &mut [u8]) -> usize;
}

/// Save memory registered with the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveMemory {
    pub id: MemoryId,
    pub name: String,
}

bitflags! {
    /// Save-memory accesses detected since the image was loaded
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SaveAccess: u8 {
        const RAM_READ     = 1 << 0;
        const RAM_WRITE    = 1 << 1;
        const EEPROM_WRITE = 1 << 2;
        const FLASH_UNLOCK = 1 << 3;
    }
}

/// Host-owned sink notified once per access kind
pub trait AccessObserver {
    fn detected(&mut self, access: SaveAccess);
}

impl<F: FnMut(SaveAccess)> AccessObserver for F {
    fn detected(&mut self, access: SaveAccess) {
        self(access)
    }
}
