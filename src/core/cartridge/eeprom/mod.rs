// gba-cartridge-rs/src/core/cartridge/eeprom/mod.rs

//! EEPROM support module
//!
//! Game Boy Advance cartridges use a serial EEPROM driven one bit at a time
//! through a narrow window near the top of ROM space. Two parts exist: a
//! 512 byte chip with 6 address bits and an 8KB chip with 14 address bits.

pub mod eeprom_serial;

// Re-export types
pub use eeprom_serial::{EepromState, Request, SerialEeprom};

use crate::core::memory::{ConfigurationError, LoadResult};

/// Decode window for images up to 16MB: the whole 0x0D region
pub const SMALL_IMAGE_WINDOW: (u32, u32) = (0x0F00_0000, 0x0D00_0000);

/// Decode window for larger images: only the top 256 bytes of 0x0D
pub const LARGE_IMAGE_WINDOW: (u32, u32) = (0x0FFF_FF00, 0x0DFF_FF00);

/// Capacity assumed when the descriptor declares a size of 0
pub const AUTO_DETECT_SIZE: usize = 8 * 1024;

/// Returns the (mask, match) pair that recognizes EEPROM accesses
pub fn decode_window(large_image: bool) -> (u32, u32) {
    if large_image {
        LARGE_IMAGE_WINDOW
    } else {
        SMALL_IMAGE_WINDOW
    }
}

/// Resolves the address width: an explicit width wins, otherwise it follows
/// the declared size. 0 means "detect from the first transfer".
pub fn address_bits(size: usize, explicit: Option<u8>) -> LoadResult<u8> {
    match explicit {
        Some(bits @ (6 | 14)) => Ok(bits),
        Some(bits) => Err(ConfigurationError::InvalidAddressBits(bits)),
        None if size == 0 => Ok(0),
        None if size <= 512 => Ok(6),
        None => Ok(14),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_bits_from_size() {
        assert_eq!(address_bits(512, None), Ok(6));
        assert_eq!(address_bits(8192, None), Ok(14));
        assert_eq!(address_bits(0, None), Ok(0));
        assert_eq!(address_bits(0, Some(14)), Ok(14));
        assert_eq!(address_bits(8192, Some(6)), Ok(6));
        assert_eq!(address_bits(512, Some(8)), Err(ConfigurationError::InvalidAddressBits(8)));
    }

    #[test]
    fn test_decode_window() {
        assert_eq!(decode_window(false), (0x0F00_0000, 0x0D00_0000));
        assert_eq!(decode_window(true), (0x0FFF_FF00, 0x0DFF_FF00));
    }
}
