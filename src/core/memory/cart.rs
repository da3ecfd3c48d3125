//! Estrutura principal do cartucho e despacho dos acessos do barramento.
//! Possui a ROM e no máximo uma memória de save ativa.

use log::{debug, info, warn};

use crate::core::cartridge::eeprom::{self, SerialEeprom};
use crate::core::cartridge::flash::FlashRom;
use crate::core::cartridge::{
    AccessObserver, CartridgeDescriptor, MediaInterface, MemoryId, ProgramImage, SaveAccess,
    SaveMemory, StoreKind,
};
use crate::core::memory::bus::AccessWidth;
use crate::core::memory::map::{classify, MemRegion, StoreWindow};
use crate::core::memory::sram::StaticRam;
use crate::core::memory::{
    ConfigurationError, LoadResult, MAX_EEPROM_SIZE, MAX_FLASH_SIZE, MAX_ROM_SIZE, MAX_SRAM_SIZE,
    SAVE_REGION,
};

/// Estrutura principal do cartucho
///
/// Todos os arrays são alocados uma única vez em `new` com a capacidade
/// máxima; `load` só ajusta tamanhos lógicos e máscaras.
pub struct Cartridge {
    pub rom: ProgramImage,
    pub ram: StaticRam,
    pub eeprom: SerialEeprom,
    pub flash: FlashRom,

    store: StoreKind,
    loaded: bool,
    title: String,
    memory: Vec<SaveMemory>,

    seen: SaveAccess,
    observer: Option<Box<dyn AccessObserver>>,
}

impl Cartridge {
    /// Cria um novo cartucho vazio
    pub fn new() -> Self {
        Self {
            rom: ProgramImage::new(),
            ram: StaticRam::new(),
            eeprom: SerialEeprom::new(),
            flash: FlashRom::new(),

            store: StoreKind::None,
            loaded: false,
            title: String::new(),
            memory: Vec::new(),

            seen: SaveAccess::empty(),
            observer: None,
        }
    }

    /// Carrega um cartucho a partir do descritor resolvido pelo loader.
    /// Em caso de erro o cartucho fica descarregado.
    pub fn load(
        &mut self,
        descriptor: &CartridgeDescriptor,
        interface: &mut dyn MediaInterface,
    ) -> LoadResult<()> {
        self.unload();
        // Um load rejeitado não deixa o save anterior exposto
        self.store = StoreKind::None;

        if descriptor.rom.size > MAX_ROM_SIZE {
            warn!("ROM rejeitada: {} bytes", descriptor.rom.size);
            return Err(ConfigurationError::RomTooLarge {
                size: descriptor.rom.size,
                max: MAX_ROM_SIZE,
            });
        }

        // Valida a memória de save antes de tocar em qualquer estado
        let store = match &descriptor.ram {
            Some(ram) => {
                let kind: StoreKind = ram.kind.parse().map_err(|err| {
                    warn!("Memória de save rejeitada: {}", err);
                    err
                })?;
                let max = match kind {
                    StoreKind::StaticRam => MAX_SRAM_SIZE,
                    StoreKind::SerialEeprom => MAX_EEPROM_SIZE,
                    StoreKind::FlashRom => MAX_FLASH_SIZE,
                    StoreKind::None => 0,
                };
                if ram.size > max {
                    warn!("{} rejeitada: {} bytes", kind, ram.size);
                    return Err(ConfigurationError::StoreTooLarge { kind, size: ram.size, max });
                }
                let bits = match kind {
                    StoreKind::SerialEeprom => eeprom::address_bits(ram.size, ram.address_bits)?,
                    _ => 0,
                };
                Some((kind, ram, bits))
            }
            None => None,
        };

        self.title = descriptor.title.clone();
        self.seen = SaveAccess::empty();

        let image = self.rom.prepare(descriptor.rom.size);
        interface.load_request(MemoryId::Rom, &descriptor.rom.name, image);
        self.rom.mirror();

        if let Some((kind, ram, bits)) = store {
            match kind {
                StoreKind::StaticRam => self.ram.configure(ram.size),
                StoreKind::SerialEeprom => {
                    let window = eeprom::decode_window(self.rom.is_large());
                    self.eeprom.configure(ram.size, bits, window);
                }
                StoreKind::FlashRom => self.flash.configure(ram.size, ram.id),
                StoreKind::None => {}
            }
            self.store = kind;

            if let Some(id) = kind.memory_id() {
                if let Some(content) = self.content_mut() {
                    let expected = content.len();
                    let supplied = interface.load_request(id, &ram.name, content);
                    if supplied > 0 && supplied < expected {
                        warn!("{}: apenas {} de {} bytes fornecidos", ram.name, supplied, expected);
                    }
                }
                self.memory.push(SaveMemory { id, name: ram.name.clone() });
            }
        }

        self.loaded = true;
        info!(
            "Cartucho carregado: \"{}\", ROM {} bytes, save: {}",
            self.title,
            self.rom.size(),
            self.store
        );

        Ok(())
    }

    /// Descarrega o cartucho. Os arrays não são liberados.
    pub fn unload(&mut self) {
        if !self.loaded {
            return;
        }
        self.loaded = false;
        self.memory.clear();
        info!("Cartucho descarregado: \"{}\"", self.title);
    }

    /// Power-on/reset: reinicia a máquina de estados da memória de save
    pub fn power(&mut self) {
        match self.store {
            StoreKind::SerialEeprom => self.eeprom.power(),
            StoreKind::FlashRom => self.flash.power(),
            StoreKind::StaticRam | StoreKind::None => {}
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store
    }

    /// Memórias registradas junto ao colaborador de persistência
    pub fn save_memory(&self) -> &[SaveMemory] {
        &self.memory
    }

    /// Janela de decodificação da memória de save ativa
    pub fn window(&self) -> StoreWindow {
        match self.store {
            StoreKind::None => StoreWindow::None,
            StoreKind::StaticRam => StoreWindow::Sram { mask: self.ram.mask },
            StoreKind::SerialEeprom => StoreWindow::Eeprom {
                mask: self.eeprom.mask,
                test: self.eeprom.test,
            },
            StoreKind::FlashRom => StoreWindow::Flash,
        }
    }

    // --- Funções principais de acesso à memória (chamadas pela CPU) ---

    /// Lê do cartucho. `open_bus` é a última instrução buscada pela CPU,
    /// devolvida quando nada responde.
    #[inline]
    pub fn read(&mut self, addr: u32, width: AccessWidth, open_bus: u32) -> u32 {
        if addr & SAVE_REGION == SAVE_REGION {
            self.detect(SaveAccess::RAM_READ);
        }

        match classify(addr, self.window()) {
            MemRegion::Sram(offset) => self.ram.read(offset, width),
            MemRegion::Eeprom => self.eeprom.read(),
            MemRegion::Flash(addr) => self.flash.read(addr as u16) as u32,
            MemRegion::Rom(offset) => self.rom.read(offset, width),
            MemRegion::OpenBus => open_bus,
        }
    }

    /// Escreve no cartucho. Escritas na ROM ou no barramento aberto somem.
    #[inline]
    pub fn write(&mut self, addr: u32, width: AccessWidth, value: u32) {
        if addr & SAVE_REGION == SAVE_REGION {
            self.detect(SaveAccess::RAM_WRITE);
        }
        if addr & 0x0F00_0000 == 0x0D00_0000 {
            self.detect(SaveAccess::EEPROM_WRITE);
        }
        if addr & 0x0E00_FFFF == 0x0E00_5555 && value & 0xFF == 0xAA {
            self.detect(SaveAccess::FLASH_UNLOCK);
        }

        match classify(addr, self.window()) {
            MemRegion::Sram(offset) => self.ram.write(offset, width, value),
            MemRegion::Eeprom => self.eeprom.write(value & 1 != 0),
            MemRegion::Flash(addr) => self.flash.write(addr as u16, value as u8),
            MemRegion::Rom(_) | MemRegion::OpenBus => {}
        }
    }

    // --- Observabilidade ---

    /// Instala o observador de acessos à memória de save
    pub fn set_observer(&mut self, observer: Box<dyn AccessObserver>) {
        self.observer = Some(observer);
    }

    /// Acessos de save detectados desde o último `load`
    pub fn seen_accesses(&self) -> SaveAccess {
        self.seen
    }

    #[inline]
    fn detect(&mut self, access: SaveAccess) {
        if self.seen.contains(access) {
            return;
        }
        self.seen.insert(access);
        debug!("Acesso de save detectado: {:?}", access);
        if let Some(observer) = self.observer.as_mut() {
            observer.detected(access);
        }
    }

    // --- Persistência ---

    /// Conteúdo da memória de save ativa
    pub fn content(&self) -> Option<&[u8]> {
        match self.store {
            StoreKind::None => None,
            StoreKind::StaticRam => Some(self.ram.content()),
            StoreKind::SerialEeprom => Some(self.eeprom.content()),
            StoreKind::FlashRom => Some(self.flash.content()),
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut [u8]> {
        match self.store {
            StoreKind::None => None,
            StoreKind::StaticRam => Some(self.ram.content_mut()),
            StoreKind::SerialEeprom => Some(self.eeprom.content_mut()),
            StoreKind::FlashRom => Some(self.flash.content_mut()),
        }
    }

    /// Ponteiro estável para o save, para hosts C; nulo sem memória de save
    pub fn content_pointer(&mut self) -> *mut libc::c_void {
        match self.content_mut() {
            Some(content) => content.as_mut_ptr() as *mut libc::c_void,
            None => std::ptr::null_mut(),
        }
    }

    /// Tamanho do save em bytes; 0 sem memória de save
    pub fn content_size(&self) -> libc::size_t {
        self.content().map_or(0, |content| content.len())
    }

    // --- Save state ---

    /// Salva o estado da memória de save ativa
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = vec![self.store.tag()];
        match self.store {
            StoreKind::None => {}
            StoreKind::StaticRam => state.extend(self.ram.save_state()),
            StoreKind::SerialEeprom => state.extend(self.eeprom.save_state()),
            StoreKind::FlashRom => state.extend(self.flash.save_state()),
        }
        state
    }

    /// Carrega o estado; rejeita estados de outro tipo de memória
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        match data.split_first() {
            Some((&tag, rest)) if tag == self.store.tag() => match self.store {
                StoreKind::None => rest.is_empty(),
                StoreKind::StaticRam => self.ram.load_state(rest),
                StoreKind::SerialEeprom => self.eeprom.load_state(rest),
                StoreKind::FlashRom => self.flash.load_state(rest),
            },
            _ => false,
        }
    }
}

impl Default for Cartridge {
    fn default() -> Self {
        Self::new()
    }
}

// Funções de interface para compatibilidade com C (FFI)
pub mod ffi {
    use super::*;
    use crate::core::cartridge::{RamDescriptor, RomDescriptor};
    use std::ffi::CStr;
    use std::os::raw::c_char;

    /// Loader sobre buffers fornecidos pelo host
    struct HostMedia<'a> {
        rom: &'a [u8],
        save: &'a [u8],
    }

    impl MediaInterface for HostMedia<'_> {
        fn load_request(&mut self, id: MemoryId, _name: &str, target: &mut [u8]) -> usize {
            let blob = match id {
                MemoryId::Rom => self.rom,
                _ => self.save,
            };
            let len = blob.len().min(target.len());
            target[..len].copy_from_slice(&blob[..len]);
            len
        }
    }

    unsafe fn host_bytes<'a>(data: *const u8, len: libc::size_t) -> &'a [u8] {
        if data.is_null() || len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(data, len)
        }
    }

    /// Largura em bytes (1, 2 ou 4)
    fn access_width(bytes: libc::size_t) -> Option<AccessWidth> {
        match bytes {
            1 => Some(AccessWidth::Byte),
            2 => Some(AccessWidth::Half),
            4 => Some(AccessWidth::Word),
            _ => None,
        }
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_create() -> *mut Cartridge {
        Box::into_raw(Box::new(Cartridge::new()))
    }

    /// # Safety
    ///
    /// `cart` deve vir de `gba_cartridge_create` e não pode ser usado depois.
    #[no_mangle]
    pub unsafe extern "C" fn gba_cartridge_destroy(cart: *mut Cartridge) {
        if !cart.is_null() {
            drop(Box::from_raw(cart));
        }
    }

    /// Carrega uma imagem a partir de buffers do host. `store` é o nome do
    /// tipo de save ("SRAM", "EEPROM", "FlashROM"...) ou nulo sem save.
    /// Devolve 0 em caso de sucesso e -1 se a configuração for rejeitada.
    ///
    /// # Safety
    ///
    /// `rom` e `save` apontam para `rom_len` e `save_len` bytes legíveis (ou
    /// são nulos); `store` é nulo ou uma string C terminada em zero.
    #[no_mangle]
    pub unsafe extern "C" fn gba_cartridge_load(
        cart: &mut Cartridge,
        rom: *const u8,
        rom_len: libc::size_t,
        store: *const c_char,
        store_size: libc::size_t,
        flash_id: u16,
        save: *const u8,
        save_len: libc::size_t,
    ) -> libc::c_int {
        let ram = if store.is_null() {
            None
        } else {
            // Nomes que não são UTF-8 caem em UnknownStoreKind
            Some(RamDescriptor {
                kind: CStr::from_ptr(store).to_string_lossy().into_owned(),
                name: "save".to_string(),
                size: store_size,
                id: flash_id,
                address_bits: None,
            })
        };

        let descriptor = CartridgeDescriptor {
            title: String::new(),
            rom: RomDescriptor { name: "rom".to_string(), size: rom_len },
            ram,
        };
        let mut media = HostMedia { rom: host_bytes(rom, rom_len), save: host_bytes(save, save_len) };

        match cart.load(&descriptor, &mut media) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_unload(cart: &mut Cartridge) {
        cart.unload();
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_power(cart: &mut Cartridge) {
        cart.power();
    }

    /// Larguras diferentes de 1, 2 e 4 devolvem `open_bus`
    #[no_mangle]
    pub extern "C" fn gba_cartridge_read(
        cart: &mut Cartridge,
        addr: u32,
        width: libc::size_t,
        open_bus: u32,
    ) -> u32 {
        match access_width(width) {
            Some(width) => cart.read(addr, width, open_bus),
            None => open_bus,
        }
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_write(cart: &mut Cartridge, addr: u32, width: libc::size_t, value: u32) {
        if let Some(width) = access_width(width) {
            cart.write(addr, width, value);
        }
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_save_data(cart: &mut Cartridge) -> *mut libc::c_void {
        cart.content_pointer()
    }

    #[no_mangle]
    pub extern "C" fn gba_cartridge_save_size(cart: &Cartridge) -> libc::size_t {
        cart.content_size()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const OPEN_BUS: u32 = 0xE3A0_0000;

        #[test]
        fn test_host_lifecycle() {
            let rom: Vec<u8> = (0..256u32).map(|n| n as u8).collect();
            let save = [0x11u8, 0x22, 0x33, 0x44];
            let store = b"SRAM\0";

            let cart = gba_cartridge_create();
            unsafe {
                let handle = &mut *cart;
                let status = gba_cartridge_load(
                    handle,
                    rom.as_ptr(),
                    rom.len(),
                    store.as_ptr() as *const c_char,
                    0x8000,
                    0,
                    save.as_ptr(),
                    save.len(),
                );
                assert_eq!(status, 0);
                assert_eq!(gba_cartridge_read(handle, 0x0800_0104, 4, OPEN_BUS), 0x0706_0504);
                assert_eq!(gba_cartridge_read(handle, 0x0E00_0000, 4, OPEN_BUS), 0x4433_2211);

                gba_cartridge_write(handle, 0x0E00_0010, 1, 0xAB);
                gba_cartridge_write(handle, 0x0E00_0011, 3, 0xCD);
                assert_eq!(gba_cartridge_read(handle, 0x0E00_0010, 2, OPEN_BUS), 0xFFAB);
                assert_eq!(gba_cartridge_read(handle, 0x0E00_0010, 8, OPEN_BUS), OPEN_BUS);

                assert_eq!(gba_cartridge_save_size(handle), 0x8000);
                let data = gba_cartridge_save_data(handle) as *const u8;
                assert!(!data.is_null());
                assert_eq!(*data.add(0x10), 0xAB);

                gba_cartridge_power(handle);
                gba_cartridge_unload(handle);
                assert!(!handle.is_loaded());
                gba_cartridge_destroy(cart);
            }
        }

        #[test]
        fn test_host_load_rejected() {
            let mut cart = Cartridge::new();
            let store = b"MysteryRAM\0";
            let status = unsafe {
                gba_cartridge_load(
                    &mut cart,
                    std::ptr::null(),
                    0,
                    store.as_ptr() as *const c_char,
                    1024,
                    0,
                    std::ptr::null(),
                    0,
                )
            };
            assert_eq!(status, -1);
            assert!(!cart.is_loaded());
            assert_eq!(gba_cartridge_save_size(&cart), 0);
            assert!(gba_cartridge_save_data(&mut cart).is_null());

            let status = unsafe {
                gba_cartridge_load(&mut cart, std::ptr::null(), 0, std::ptr::null(), 0, 0, std::ptr::null(), 0)
            };
            assert_eq!(status, 0);
            assert_eq!(cart.store_kind(), StoreKind::None);
            assert_eq!(gba_cartridge_read(&mut cart, 0x0E00_0000, 1, OPEN_BUS), OPEN_BUS);
            unsafe { gba_cartridge_destroy(std::ptr::null_mut()) };
        }
    }
}
