//! Núcleo do cartucho do Game Boy Advance.
//!
//! `memory` cuida do barramento (larguras de acesso, decodificação de
//! endereços, despacho); `cartridge` contém os dispositivos do cartucho.

pub mod cartridge;
pub mod memory;
