//! SRAM/FRAM do cartucho (bateria).
//! Array plano com endereçamento por máscara; não tem estado além do conteúdo.

use log::info;

use crate::core::memory::bus::{self, AccessWidth};
use crate::core::memory::MAX_SRAM_SIZE;

/// Save RAM estática
pub struct StaticRam {
    pub data: Box<[u8]>,
    pub size: usize,
    pub mask: u32,
}

impl StaticRam {
    /// Cria a SRAM com a capacidade máxima já alocada
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; MAX_SRAM_SIZE].into_boxed_slice(),
            size: MAX_SRAM_SIZE,
            mask: MAX_SRAM_SIZE as u32 - 1,
        }
    }

    /// Define o tamanho lógico e apaga o conteúdo para 0xFF.
    /// Tamanhos que não são potência de 2 usam a máscara da próxima potência.
    pub fn configure(&mut self, size: usize) {
        self.size = size.min(self.data.len());
        self.mask = (self.size.max(1).next_power_of_two() as u32 - 1).min(self.data.len() as u32 - 1);
        self.data[..self.size].fill(0xFF);
        info!("SRAM configurada: {} bytes (mask {:#06X})", self.size, self.mask);
    }

    /// Lê um valor; `addr` é o endereço do barramento
    #[inline]
    pub fn read(&self, addr: u32, width: AccessWidth) -> u32 {
        bus::read(&self.data, addr & self.mask, width)
    }

    /// Escreve um valor
    #[inline]
    pub fn write(&mut self, addr: u32, width: AccessWidth, value: u32) {
        bus::write(&mut self.data, addr & self.mask, width, value);
    }

    /// Conteúdo lógico (para o colaborador de persistência)
    pub fn content(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.size]
    }

    /// Salva o estado
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(4 + self.size);
        state.extend_from_slice(&(self.size as u32).to_le_bytes());
        state.extend_from_slice(self.content());
        state
    }

    /// Carrega o estado
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        if data.len() < 4 {
            return false;
        }
        let size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if size != self.size || data.len() != 4 + size {
            return false;
        }
        self.data[..size].copy_from_slice(&data[4..]);
        true
    }
}

impl Default for StaticRam {
    fn default() -> Self {
        Self::new()
    }
}
