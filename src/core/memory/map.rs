//! Decodificação de endereços do cartucho.
//! Decide, para cada acesso, qual dispositivo responde.

use crate::core::memory::{ROM_ADDRESS_MASK, SAVE_REGION};

/// Região de memória alvo de um acesso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemRegion {
    /// ROM do programa, com o índice já mascarado
    Rom(u32),
    /// SRAM/FRAM, com o índice já mascarado
    Sram(u32),
    /// Janela de reconhecimento da EEPROM serial
    Eeprom,
    /// FlashROM, endereço completo
    Flash(u32),
    /// Nada responde: valor residual do barramento
    OpenBus,
}

/// Janela de decodificação da memória de save ativa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreWindow {
    None,
    Sram { mask: u32 },
    Eeprom { mask: u32, test: u32 },
    Flash,
}

/// Classifica um endereço do barramento. A primeira regra que casa vence,
/// na mesma ordem de prioridade do hardware.
#[inline]
pub fn classify(addr: u32, window: StoreWindow) -> MemRegion {
    match window {
        StoreWindow::Sram { mask } if addr & SAVE_REGION == SAVE_REGION => {
            return MemRegion::Sram(addr & mask);
        }
        StoreWindow::Eeprom { mask, test } if addr & mask == test => {
            return MemRegion::Eeprom;
        }
        StoreWindow::Flash if addr & SAVE_REGION == SAVE_REGION => {
            return MemRegion::Flash(addr);
        }
        _ => {}
    }

    if addr < SAVE_REGION {
        MemRegion::Rom(addr & ROM_ADDRESS_MASK)
    } else {
        MemRegion::OpenBus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_EEPROM: StoreWindow = StoreWindow::Eeprom { mask: 0x0F00_0000, test: 0x0D00_0000 };
    const LARGE_EEPROM: StoreWindow = StoreWindow::Eeprom { mask: 0x0FFF_FF00, test: 0x0DFF_FF00 };

    #[test]
    fn test_rom_and_open_bus() {
        assert_eq!(classify(0x0800_1234, StoreWindow::None), MemRegion::Rom(0x0000_1234));
        assert_eq!(classify(0x0A00_0010, StoreWindow::None), MemRegion::Rom(0x0000_0010));
        assert_eq!(classify(0x0E00_0000, StoreWindow::None), MemRegion::OpenBus);
        assert_eq!(classify(0x1000_0000, StoreWindow::None), MemRegion::OpenBus);
    }

    #[test]
    fn test_sram_window() {
        let window = StoreWindow::Sram { mask: 0x7FFF };
        assert_eq!(classify(0x0E00_8001, window), MemRegion::Sram(0x0001));
        assert_eq!(classify(0x0F00_0042, window), MemRegion::Sram(0x0042));
        assert_eq!(classify(0x0D00_0000, window), MemRegion::Rom(0x0100_0000));
    }

    #[test]
    fn test_eeprom_small_image_window() {
        assert_eq!(classify(0x0D00_0000, SMALL_EEPROM), MemRegion::Eeprom);
        assert_eq!(classify(0x0DFF_FF00, SMALL_EEPROM), MemRegion::Eeprom);
        assert_eq!(classify(0x0C00_0000, SMALL_EEPROM), MemRegion::Rom(0x0000_0000));
        assert_eq!(classify(0x0E00_0000, SMALL_EEPROM), MemRegion::OpenBus);
    }

    #[test]
    fn test_eeprom_large_image_window() {
        assert_eq!(classify(0x0DFF_FF00, LARGE_EEPROM), MemRegion::Eeprom);
        assert_eq!(classify(0x0DFF_FFFE, LARGE_EEPROM), MemRegion::Eeprom);
        // The lower part of 0x0D is ROM again for images above 16MB.
        assert_eq!(classify(0x0D00_0000, LARGE_EEPROM), MemRegion::Rom(0x0100_0000));
    }

    #[test]
    fn test_flash_window() {
        assert_eq!(classify(0x0E00_5555, StoreWindow::Flash), MemRegion::Flash(0x0E00_5555));
        assert_eq!(classify(0x0800_0000, StoreWindow::Flash), MemRegion::Rom(0));
    }
}
