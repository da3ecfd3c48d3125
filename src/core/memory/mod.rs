//! Sistema de memória do cartucho GBA.
//! Gerencia a decodificação dos endereços de 32-bit do barramento, as larguras
//! de acesso e o despacho para ROM, SRAM, EEPROM ou FlashROM.

pub mod bus;
pub mod cart;
pub mod map;
pub mod sram;

use std::fmt;

use crate::core::cartridge::StoreKind;

// Re-exportações para facilitar o uso
pub use bus::AccessWidth;
pub use cart::Cartridge;
pub use map::{classify, MemRegion, StoreWindow};
pub use sram::StaticRam;

/// Início da região de save (SRAM/FlashROM) no barramento
pub const SAVE_REGION: u32 = 0x0E00_0000;

/// Máscara de endereço da ROM (32 MB)
pub const ROM_ADDRESS_MASK: u32 = 0x01FF_FFFF;

/// Tamanho máximo de ROM suportado (32MB)
pub const MAX_ROM_SIZE: usize = 32 * 1024 * 1024;

/// Tamanho máximo de SRAM/FRAM
pub const MAX_SRAM_SIZE: usize = 32 * 1024;

/// Tamanho máximo de EEPROM serial
pub const MAX_EEPROM_SIZE: usize = 8 * 1024;

/// Tamanho máximo de FlashROM (dois bancos de 64KB)
pub const MAX_FLASH_SIZE: usize = 128 * 1024;

/// Erros de configuração detectados durante o `load`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Tipo de memória de save desconhecido no descritor
    UnknownStoreKind(String),
    /// ROM maior que a capacidade alocada
    RomTooLarge { size: usize, max: usize },
    /// Memória de save maior que a capacidade do dispositivo
    StoreTooLarge { kind: StoreKind, size: usize, max: usize },
    /// Largura de endereço de EEPROM diferente de 6 ou 14
    InvalidAddressBits(u8),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::UnknownStoreKind(kind) => {
                write!(f, "unknown backing store type \"{}\"", kind)
            }
            ConfigurationError::RomTooLarge { size, max } => {
                write!(f, "program image of {} bytes exceeds the {} byte maximum", size, max)
            }
            ConfigurationError::StoreTooLarge { kind, size, max } => {
                write!(f, "{} of {} bytes exceeds the {} byte maximum", kind, size, max)
            }
            ConfigurationError::InvalidAddressBits(bits) => {
                write!(f, "EEPROM address width must be 6 or 14 bits, got {}", bits)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Tipo de resultado para o carregamento do cartucho
pub type LoadResult<T> = Result<T, ConfigurationError>;
