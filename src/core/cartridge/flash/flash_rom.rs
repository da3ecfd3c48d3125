// gba-cartridge-rs/src/core/cartridge/flash/flash_rom.rs

use log::{debug, info};

use super::{FlashChip, BANK_SIZE, SECTOR_SIZE};
use crate::core::memory::MAX_FLASH_SIZE;

/// Command register offsets
const COMMAND_ADDR: u16 = 0x5555;
const UNLOCK_ADDR: u16 = 0x2AAA;

/// Unlock bytes
const UNLOCK_1: u8 = 0xAA;
const UNLOCK_2: u8 = 0x55;

/// Commands accepted after an unlock
const CMD_CHIP_ERASE: u8 = 0x10;
const CMD_SECTOR_ERASE: u8 = 0x30;
const CMD_ERASE: u8 = 0x80;
const CMD_ID_ENTER: u8 = 0x90;
const CMD_WRITE: u8 = 0xA0;
const CMD_BANK: u8 = 0xB0;
const CMD_ID_EXIT: u8 = 0xF0;

/// FlashROM command state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashState {
    Idle,
    /// 0xAA written to 0x5555
    Unlock1,
    /// 0x55 written to 0x2AAA, next write is a command
    Unlock2,
    /// Reads return the chip id
    IdMode,
    /// Erase armed, waiting for the second unlock
    EraseMode,
    EraseUnlock1,
    /// Waiting for chip (0x10) or sector (0x30) erase
    EraseUnlock2,
    /// Next write programs one byte
    WriteMode,
    /// Next write to offset 0 selects the bank
    BankSwitch,
}

impl FlashState {
    fn tag(self) -> u8 {
        match self {
            FlashState::Idle => 0,
            FlashState::Unlock1 => 1,
            FlashState::Unlock2 => 2,
            FlashState::IdMode => 3,
            FlashState::EraseMode => 4,
            FlashState::EraseUnlock1 => 5,
            FlashState::EraseUnlock2 => 6,
            FlashState::WriteMode => 7,
            FlashState::BankSwitch => 8,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => FlashState::Idle,
            1 => FlashState::Unlock1,
            2 => FlashState::Unlock2,
            3 => FlashState::IdMode,
            4 => FlashState::EraseMode,
            5 => FlashState::EraseUnlock1,
            6 => FlashState::EraseUnlock2,
            7 => FlashState::WriteMode,
            8 => FlashState::BankSwitch,
            _ => return None,
        })
    }
}

/// FlashROM save chip
pub struct FlashRom {
    data: Box<[u8]>,
    pub size: usize,
    pub id: u16,
    pub bank: u8,
    state: FlashState,
}

impl FlashRom {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; MAX_FLASH_SIZE].into_boxed_slice(),
            size: BANK_SIZE,
            id: 0,
            bank: 0,
            state: FlashState::Idle,
        }
    }

    /// Set size and id and erase to 0xFF. A size of 0 means one bank.
    pub fn configure(&mut self, size: usize, id: u16) {
        self.size = if size == 0 { BANK_SIZE } else { size.min(self.data.len()) };
        self.id = id;
        self.bank = 0;
        self.state = FlashState::Idle;
        self.data[..self.size].fill(0xFF);

        info!("FlashROM configurada: {} bytes, chip {}", self.size, self.chip());
    }

    pub fn chip(&self) -> FlashChip {
        FlashChip::from_id(self.id)
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    /// Abort any command; content and bank survive
    pub fn power(&mut self) {
        self.state = FlashState::Idle;
    }

    fn index(&self, offset: u16) -> usize {
        (self.bank as usize) << 16 | offset as usize
    }

    /// Read one byte at `offset` (low 16 bits of the bus address)
    pub fn read(&self, offset: u16) -> u8 {
        if self.state == FlashState::IdMode {
            return match offset {
                0x0000 => self.id as u8,
                0x0001 => (self.id >> 8) as u8,
                _ => 0,
            };
        }

        self.content().get(self.index(offset)).copied().unwrap_or(0xFF)
    }

    /// Feed one byte write to the command state machine
    pub fn write(&mut self, offset: u16, byte: u8) {
        self.state = match (self.state, offset, byte) {
            (FlashState::Idle | FlashState::IdMode, COMMAND_ADDR, UNLOCK_1) => FlashState::Unlock1,
            (FlashState::Unlock1, UNLOCK_ADDR, UNLOCK_2) => FlashState::Unlock2,
            (FlashState::Unlock2, COMMAND_ADDR, command) => self.command(command),

            (FlashState::EraseMode, COMMAND_ADDR, UNLOCK_1) => FlashState::EraseUnlock1,
            (FlashState::EraseUnlock1, UNLOCK_ADDR, UNLOCK_2) => FlashState::EraseUnlock2,
            (FlashState::EraseUnlock2, COMMAND_ADDR, CMD_CHIP_ERASE) => {
                self.erase_chip();
                FlashState::Idle
            }
            (FlashState::EraseUnlock2, sector, CMD_SECTOR_ERASE) if sector & 0x0FFF == 0 => {
                self.erase_sector(sector);
                FlashState::Idle
            }

            (FlashState::WriteMode, offset, byte) => {
                self.program(offset, byte);
                FlashState::Idle
            }

            (FlashState::BankSwitch, 0x0000, bank) => {
                if self.size > BANK_SIZE {
                    self.bank = bank & 1;
                    debug!("FlashROM: banco {}", self.bank);
                }
                FlashState::Idle
            }

            // Anything out of sequence aborts without side effects
            _ => FlashState::Idle,
        };
    }

    fn command(&self, command: u8) -> FlashState {
        match command {
            CMD_ERASE => FlashState::EraseMode,
            CMD_ID_ENTER => {
                debug!("FlashROM: modo ID");
                FlashState::IdMode
            }
            CMD_WRITE => FlashState::WriteMode,
            CMD_BANK => FlashState::BankSwitch,
            CMD_ID_EXIT => FlashState::Idle,
            _ => FlashState::Idle,
        }
    }

    /// Flash cells can only be cleared: a write ANDs into the stored byte
    fn program(&mut self, offset: u16, byte: u8) {
        let index = self.index(offset);
        if let Some(cell) = self.content_mut().get_mut(index) {
            *cell &= byte;
        }
    }

    fn erase_chip(&mut self) {
        debug!("FlashROM: apagamento total");
        self.content_mut().fill(0xFF);
    }

    fn erase_sector(&mut self, offset: u16) {
        if !self.chip().has_sector_erase() {
            debug!("FlashROM: {} não suporta apagamento de setor", self.chip());
            return;
        }

        let start = self.index(offset & !0x0FFF).min(self.size);
        let end = (start + SECTOR_SIZE).min(self.size);
        debug!("FlashROM: apagamento do setor {:#07X}", start);
        self.data[start..end].fill(0xFF);
    }

    /// Logical content (for the persistence collaborator)
    pub fn content(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.size]
    }

    /// Save state
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Vec::with_capacity(8 + self.size);

        state.extend_from_slice(&(self.size as u32).to_le_bytes());
        state.extend_from_slice(&self.id.to_le_bytes());
        state.push(self.bank);
        state.push(self.state.tag());
        state.extend_from_slice(self.content());

        state
    }

    /// Load state
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        const HEADER: usize = 4 + 2 + 1 + 1;
        if data.len() < HEADER {
            return false;
        }

        let size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if size != self.size || data.len() != HEADER + size {
            return false;
        }

        let state = match FlashState::from_tag(data[7]) {
            Some(state) => state,
            None => return false,
        };

        // Only the 128KB parts have a second bank
        let bank = data[6];
        if bank > 1 || (bank > 0 && size <= BANK_SIZE) {
            return false;
        }

        self.id = u16::from_le_bytes([data[4], data[5]]);
        self.bank = bank;
        self.state = state;
        self.data[..size].copy_from_slice(&data[HEADER..]);

        true
    }
}

impl Default for FlashRom {
    fn default() -> Self {
        Self::new()
    }
}
