//! Acesso little-endian em byte/halfword/word sobre arrays de bytes.
//! São as funções de leitura/escrita usadas pela ROM e pela SRAM.

/// Largura de um acesso do barramento
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    Byte,
    Half,
    Word,
}

impl AccessWidth {
    /// Alinha o endereço ao tamanho do acesso
    #[inline]
    pub fn align(self, addr: u32) -> u32 {
        match self {
            AccessWidth::Word => addr & !3,
            AccessWidth::Half => addr & !1,
            AccessWidth::Byte => addr,
        }
    }

    /// Número de bytes tocados pelo acesso
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            AccessWidth::Byte => 1,
            AccessWidth::Half => 2,
            AccessWidth::Word => 4,
        }
    }
}

/// Lê um valor little-endian de `data`, alinhando o endereço à largura.
/// Bytes além do fim do array leem como 0xFF.
#[inline]
pub fn read(data: &[u8], addr: u32, width: AccessWidth) -> u32 {
    let base = width.align(addr) as usize;
    let mut value = 0u32;
    for i in 0..width.bytes() {
        let byte = data.get(base + i).copied().unwrap_or(0xFF);
        value |= (byte as u32) << (i * 8);
    }
    value
}

/// Escreve os bytes baixos de `value` em `data`. Um acesso mais estreito
/// não toca os bytes superiores da posição.
#[inline]
pub fn write(data: &mut [u8], addr: u32, width: AccessWidth, value: u32) {
    let base = width.align(addr) as usize;
    for i in 0..width.bytes() {
        if let Some(byte) = data.get_mut(base + i) {
            *byte = (value >> (i * 8)) as u8;
        }
    }
}
