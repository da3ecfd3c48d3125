// Este é o ponto de entrada principal da biblioteca.
// O core não faz I/O: o host fornece os bytes (loader) e persiste o save.

// Módulos principais do projeto.
pub mod core;

// Re-exportações para facilitar o uso.
pub use crate::core::cartridge::{
    AccessObserver, CartridgeDescriptor, MediaInterface, MemoryId, RamDescriptor,
    RomDescriptor, SaveAccess, SaveMemory, StoreKind,
};
pub use crate::core::memory::{AccessWidth, Cartridge, ConfigurationError, LoadResult};

/// Versão do core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Função conveniente para criar um cartucho vazio (não carregado).
pub fn create_cartridge() -> Cartridge {
    Cartridge::new()
}
