// gba-cartridge-rs/src/core/cartridge/eeprom/eeprom_serial.rs

use log::{debug, info, warn};

use super::AUTO_DETECT_SIZE;
use crate::core::memory::MAX_EEPROM_SIZE;

/// Bits in one EEPROM block
const BLOCK_BITS: u8 = 64;

/// Dummy bits preceding the data of a read
const READ_PREAMBLE: u8 = 4;

// Request lengths seen while the address width is still unknown.
// Read: address + stop bit. Write: address + 64 data bits + stop bit.
const READ_REQUEST_6: u8 = 6 + 1;
const READ_REQUEST_14: u8 = 14 + 1;
const WRITE_REQUEST_6: u8 = 6 + BLOCK_BITS + 1;
const WRITE_REQUEST_14: u8 = 14 + BLOCK_BITS + 1;

/// Direction of a serial transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Read,
    Write,
}

/// Serial EEPROM state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EepromState {
    /// Waiting for the start bit
    Idle,
    /// Start bit seen, the next bit selects read (1) or write (0)
    AwaitRequest,
    ReceivingAddress(Request),
    /// Address latched, waiting for the stop bit of a read request
    AwaitReadStop,
    /// Shifting out 4 dummy bits then 64 data bits
    ReadingData,
    WritingData,
    /// Block committed, waiting for the stop bit
    AwaitWriteStop,
}

impl EepromState {
    fn tag(self) -> u8 {
        match self {
            EepromState::Idle => 0,
            EepromState::AwaitRequest => 1,
            EepromState::ReceivingAddress(Request::Read) => 2,
            EepromState::ReceivingAddress(Request::Write) => 3,
            EepromState::AwaitReadStop => 4,
            EepromState::ReadingData => 5,
            EepromState::WritingData => 6,
            EepromState::AwaitWriteStop => 7,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => EepromState::Idle,
            1 => EepromState::AwaitRequest,
            2 => EepromState::ReceivingAddress(Request::Read),
            3 => EepromState::ReceivingAddress(Request::Write),
            4 => EepromState::AwaitReadStop,
            5 => EepromState::ReadingData,
            6 => EepromState::WritingData,
            7 => EepromState::AwaitWriteStop,
            _ => return None,
        })
    }
}

/// Serial EEPROM structure
#[derive(Debug, Clone)]
pub struct SerialEeprom {
    data: Box<[u8]>,
    pub size: usize,         // Logical size in bytes
    pub bits: u8,            // Address width, 0 while unresolved
    pub mask: u32,           // Decode window mask
    pub test: u32,           // Decode window match
    state: EepromState,
    offset: u8,              // Bit counter of the current phase
    address: u16,            // Latched block address
    buffer: u64,             // 64-bit data shift register
    stream: u128,            // Raw request bits while `bits` is unresolved
}

impl SerialEeprom {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; MAX_EEPROM_SIZE].into_boxed_slice(),
            size: MAX_EEPROM_SIZE,
            bits: 14,
            mask: super::SMALL_IMAGE_WINDOW.0,
            test: super::SMALL_IMAGE_WINDOW.1,
            state: EepromState::Idle,
            offset: 0,
            address: 0,
            buffer: 0,
            stream: 0,
        }
    }

    /// Set up size, address width and decode window, and erase to 0xFF.
    /// A size of 0 selects the 8KB capacity.
    pub fn configure(&mut self, size: usize, bits: u8, window: (u32, u32)) {
        self.size = if size == 0 { AUTO_DETECT_SIZE } else { size.min(self.data.len()) };
        self.bits = bits;
        self.mask = window.0;
        self.test = window.1;
        self.data[..self.size].fill(0xFF);
        self.power();

        info!(
            "EEPROM configurada: {} bytes, {} bits de endereço, janela {:#010X}/{:#010X}",
            self.size,
            if bits == 0 { "auto".to_string() } else { bits.to_string() },
            self.mask,
            self.test
        );
    }

    /// Reset the protocol state; content and resolved width survive
    pub fn power(&mut self) {
        self.state = EepromState::Idle;
        self.offset = 0;
        self.address = 0;
        self.buffer = 0;
        self.stream = 0;
    }

    pub fn state(&self) -> EepromState {
        self.state
    }

    /// Process a write; only the low bit of the bus value reaches the chip
    pub fn write(&mut self, bit: bool) {
        match self.state {
            EepromState::Idle => {
                if bit {
                    self.state = EepromState::AwaitRequest;
                }
            }

            EepromState::AwaitRequest => {
                let request = if bit { Request::Read } else { Request::Write };
                self.offset = 0;
                self.address = 0;
                self.stream = 0;
                self.state = EepromState::ReceivingAddress(request);
            }

            EepromState::ReceivingAddress(request) if self.bits == 0 => {
                self.detect_write(request, bit);
            }

            EepromState::ReceivingAddress(request) => {
                // Address, MSB first
                self.address = (self.address << 1) | bit as u16;
                self.offset += 1;

                if self.offset == self.bits {
                    self.offset = 0;
                    self.state = match request {
                        Request::Read => EepromState::AwaitReadStop,
                        Request::Write => {
                            self.buffer = 0;
                            EepromState::WritingData
                        }
                    };
                }
            }

            EepromState::AwaitReadStop => {
                // The stop bit should be 0; real parts ignore its value
                self.begin_read();
            }

            EepromState::ReadingData => {
                // Read abandoned: the write starts over from idle
                self.state = if bit { EepromState::AwaitRequest } else { EepromState::Idle };
            }

            EepromState::WritingData => {
                // 64-bit data buffer, MSB first
                self.buffer = (self.buffer << 1) | bit as u64;
                self.offset += 1;

                if self.offset == BLOCK_BITS {
                    self.commit();
                    self.state = EepromState::AwaitWriteStop;
                }
            }

            EepromState::AwaitWriteStop => {
                self.state = EepromState::Idle;
            }
        }
    }

    /// Read the serial line. Outside a read transfer the line idles high.
    pub fn read(&mut self) -> u32 {
        match self.state {
            EepromState::ReadingData => self.shift_out(),
            EepromState::ReceivingAddress(request) if self.bits == 0 => self.detect_read(request),
            _ => 1,
        }
    }

    fn shift_out(&mut self) -> u32 {
        let bit = if self.offset < READ_PREAMBLE {
            0
        } else {
            ((self.buffer >> (63 - (self.offset - READ_PREAMBLE))) & 1) as u32
        };

        self.offset += 1;
        if self.offset == READ_PREAMBLE + BLOCK_BITS {
            self.state = EepromState::Idle;
        }
        bit
    }

    /// Byte offset of the latched block
    fn block_offset(&self) -> usize {
        let blocks = (self.size / 8).max(1);
        (self.address as usize % blocks) * 8
    }

    fn begin_read(&mut self) {
        let offset = self.block_offset();
        let mut block = [0xFFu8; 8];
        block.copy_from_slice(&self.data[offset..offset + 8]);
        self.buffer = u64::from_be_bytes(block);
        self.offset = 0;
        self.state = EepromState::ReadingData;
    }

    fn commit(&mut self) {
        let offset = self.block_offset();
        self.data[offset..offset + 8].copy_from_slice(&self.buffer.to_be_bytes());
    }

    /// Width detection, write side: a request long enough can only be a
    /// 14-bit one.
    fn detect_write(&mut self, request: Request, bit: bool) {
        self.stream = (self.stream << 1) | bit as u128;
        self.offset += 1;

        match (request, self.offset) {
            (Request::Read, READ_REQUEST_14) => {
                self.resolve(14);
                self.begin_read();
            }
            (Request::Write, WRITE_REQUEST_14) => {
                self.resolve(14);
                self.commit();
                self.state = EepromState::Idle;
            }
            _ => {}
        }
    }

    /// Width detection, read side: the host stopped sending, so the number of
    /// bits on the wire tells the width.
    fn detect_read(&mut self, request: Request) -> u32 {
        match (request, self.offset) {
            (Request::Read, READ_REQUEST_6) => {
                self.resolve(6);
                self.begin_read();
                self.shift_out()
            }
            (Request::Write, WRITE_REQUEST_6) => {
                self.resolve(6);
                self.commit();
                self.state = EepromState::Idle;
                1
            }
            (_, count) => {
                warn!("EEPROM: {} bits não correspondem a 6 nem 14 bits de endereço", count);
                self.power();
                1
            }
        }
    }

    /// Fix the address width and unpack the buffered request
    fn resolve(&mut self, bits: u8) {
        let request = self.state;
        let address_mask = (1u128 << bits) - 1;

        match request {
            EepromState::ReceivingAddress(Request::Write) => {
                self.address = ((self.stream >> (BLOCK_BITS + 1)) & address_mask) as u16;
                self.buffer = (self.stream >> 1) as u64;
            }
            _ => {
                self.address = ((self.stream >> 1) & address_mask) as u16;
            }
        }

        self.bits = bits;
        self.stream = 0;
        info!("EEPROM: largura de endereço detectada: {} bits", bits);
        debug!("EEPROM: bloco {:#06X}", self.address);
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
        let mut state = Vec::with_capacity(36 + self.size);

        state.extend_from_slice(&(self.size as u32).to_le_bytes());
        state.push(self.bits);
        state.push(self.state.tag());
        state.push(self.offset);
        state.extend_from_slice(&self.address.to_le_bytes());
        state.extend_from_slice(&self.buffer.to_le_bytes());
        state.extend_from_slice(&self.stream.to_le_bytes());
        state.extend_from_slice(self.content());

        state
    }

    /// Bit counter bounds of each phase
    fn offset_valid(state: EepromState, bits: u8, offset: u8) -> bool {
        match state {
            EepromState::ReceivingAddress(Request::Read) if bits == 0 => offset < READ_REQUEST_14,
            EepromState::ReceivingAddress(Request::Write) if bits == 0 => offset < WRITE_REQUEST_14,
            EepromState::ReceivingAddress(_) => offset < bits,
            EepromState::WritingData => offset < BLOCK_BITS,
            EepromState::ReadingData => offset < READ_PREAMBLE + BLOCK_BITS,
            _ => true,
        }
    }

    /// Load state
    pub fn load_state(&mut self, data: &[u8]) -> bool {
        const HEADER: usize = 4 + 1 + 1 + 1 + 2 + 8 + 16;
        if data.len() < HEADER {
            return false;
        }

        let size = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if size != self.size || data.len() != HEADER + size {
            return false;
        }

        let state = match EepromState::from_tag(data[5]) {
            Some(state) => state,
            None => return false,
        };

        let bits = data[4];
        let offset = data[6];
        if !matches!(bits, 0 | 6 | 14) || !Self::offset_valid(state, bits, offset) {
            return false;
        }

        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(&data[9..17]);
        let mut stream = [0u8; 16];
        stream.copy_from_slice(&data[17..33]);

        self.bits = bits;
        self.state = state;
        self.offset = offset;
        self.address = u16::from_le_bytes([data[7], data[8]]);
        self.buffer = u64::from_le_bytes(buffer);
        self.stream = u128::from_le_bytes(stream);
        self.data[..size].copy_from_slice(&data[HEADER..]);

        true
    }
}

impl Default for SerialEeprom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cartridge::eeprom::{decode_window, SMALL_IMAGE_WINDOW};

    fn eeprom(size: usize, bits: u8) -> SerialEeprom {
        let mut eeprom = SerialEeprom::new();
        eeprom.configure(size, bits, SMALL_IMAGE_WINDOW);
        eeprom
    }

    fn send_address(eeprom: &mut SerialEeprom, address: u16, bits: u8) {
        for n in (0..bits).rev() {
            eeprom.write((address >> n) & 1 != 0);
        }
    }

    fn write_block(eeprom: &mut SerialEeprom, address: u16, bits: u8, value: u64) {
        eeprom.write(true);
        eeprom.write(false);
        send_address(eeprom, address, bits);
        for n in (0..64).rev() {
            eeprom.write((value >> n) & 1 != 0);
        }
        eeprom.write(false);
    }

    fn read_block(eeprom: &mut SerialEeprom, address: u16, bits: u8) -> u64 {
        eeprom.write(true);
        eeprom.write(true);
        send_address(eeprom, address, bits);
        eeprom.write(false);

        for _ in 0..READ_PREAMBLE {
            assert_eq!(eeprom.read(), 0);
        }
        let mut value = 0u64;
        for _ in 0..64 {
            value = (value << 1) | eeprom.read() as u64;
        }
        value
    }

    fn pattern(k: u16) -> u64 {
        0x0123_4567_89AB_CDEFu64.rotate_left(k as u32) ^ k as u64
    }

    #[test]
    fn test_roundtrip_6bit() {
        let mut eeprom = eeprom(512, 6);
        for k in 0..64 {
            write_block(&mut eeprom, k, 6, pattern(k));
        }
        for k in 0..64 {
            assert_eq!(read_block(&mut eeprom, k, 6), pattern(k), "block {}", k);
        }
        assert_eq!(eeprom.state(), EepromState::Idle);
    }

    #[test]
    fn test_roundtrip_14bit() {
        let mut eeprom = eeprom(8192, 14);
        for k in 0..1024 {
            write_block(&mut eeprom, k, 14, pattern(k));
            assert_eq!(read_block(&mut eeprom, k, 14), pattern(k), "block {}", k);
        }
    }

    #[test]
    fn test_block_layout_is_msb_first() {
        let mut eeprom = eeprom(512, 6);
        write_block(&mut eeprom, 2, 6, 0x0102_0304_0506_0708);
        assert_eq!(&eeprom.content()[16..24], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_high_block_addresses_alias() {
        let mut eeprom = eeprom(8192, 14);
        write_block(&mut eeprom, 1024 + 5, 14, 0xAA55);
        assert_eq!(read_block(&mut eeprom, 5, 14), 0xAA55);
    }

    #[test]
    fn test_idle_line_reads_high() {
        let mut eeprom = eeprom(8192, 14);
        assert_eq!(eeprom.read(), 1);
        eeprom.write(true);
        assert_eq!(eeprom.read(), 1);
        assert_eq!(eeprom.state(), EepromState::AwaitRequest);
    }

    #[test]
    fn test_write_completion_poll_reads_ready() {
        let mut eeprom = eeprom(512, 6);
        write_block(&mut eeprom, 1, 6, 42);
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(eeprom.read(), 1);
    }

    #[test]
    fn test_power_keeps_content() {
        let mut eeprom = eeprom(512, 6);
        write_block(&mut eeprom, 3, 6, 0xDEAD_BEEF);
        eeprom.write(true);
        eeprom.write(true);
        eeprom.power();
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(read_block(&mut eeprom, 3, 6), 0xDEAD_BEEF);
    }

    #[test]
    fn test_auto_detect_6bit_write_then_read() {
        let mut eeprom = eeprom(0, 0);
        assert_eq!(eeprom.size, 8192);
        assert_eq!(eeprom.bits, 0);

        write_block(&mut eeprom, 9, 6, 0x1122_3344_5566_7788);
        // Completion poll resolves the width.
        assert_eq!(eeprom.read(), 1);
        assert_eq!(eeprom.bits, 6);
        assert_eq!(read_block(&mut eeprom, 9, 6), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_auto_detect_14bit_write_then_read() {
        let mut eeprom = eeprom(0, 0);
        write_block(&mut eeprom, 700, 14, 0xCAFE_F00D);
        assert_eq!(eeprom.bits, 14);
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(read_block(&mut eeprom, 700, 14), 0xCAFE_F00D);
    }

    #[test]
    fn test_auto_detect_from_read_request() {
        let mut small = eeprom(0, 0);
        small.content_mut()[8 * 5..8 * 6].copy_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]);
        assert_eq!(read_block(&mut small, 5, 6), 0x0908_0706_0504_0302);
        assert_eq!(small.bits, 6);

        let mut large = eeprom(0, 0);
        large.content_mut()[8 * 300..8 * 301].copy_from_slice(&[1, 1, 2, 3, 5, 8, 13, 21]);
        assert_eq!(read_block(&mut large, 300, 14), 0x0101_0203_0508_0D15);
        assert_eq!(large.bits, 14);
    }

    #[test]
    fn test_auto_detect_rejects_odd_length() {
        let mut eeprom = eeprom(0, 0);
        eeprom.write(true);
        eeprom.write(true);
        send_address(&mut eeprom, 0, 10);
        assert_eq!(eeprom.read(), 1);
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(eeprom.bits, 0);
    }

    #[test]
    fn test_abandoned_read_restarts() {
        let mut eeprom = eeprom(512, 6);
        eeprom.write(true);
        eeprom.write(true);
        send_address(&mut eeprom, 0, 6);
        eeprom.write(false);
        eeprom.read();
        eeprom.write(false);
        assert_eq!(eeprom.state(), EepromState::Idle);
        assert_eq!(eeprom.read(), 1);
    }

    #[test]
    fn test_state_roundtrip_mid_read() {
        let mut eeprom = eeprom(512, 6);
        write_block(&mut eeprom, 4, 6, 0x8000_0000_0000_0001);
        eeprom.write(true);
        eeprom.write(true);
        send_address(&mut eeprom, 4, 6);
        eeprom.write(false);
        for _ in 0..READ_PREAMBLE {
            eeprom.read();
        }
        let state = eeprom.save_state();

        let mut restored = SerialEeprom::new();
        restored.configure(512, 6, decode_window(false));
        assert!(restored.load_state(&state));
        assert_eq!(restored.read(), 1);
        for _ in 0..62 {
            assert_eq!(restored.read(), 0);
        }
        assert_eq!(restored.read(), 1);
        assert_eq!(restored.state(), EepromState::Idle);
    }

    #[test]
    fn test_load_state_rejects_corrupt_counters() {
        let mut eeprom = eeprom(512, 6);
        write_block(&mut eeprom, 1, 6, 0x55);
        let state = eeprom.save_state();

        let corrupt = |index: usize, value: u8| {
            let mut data = state.clone();
            data[index] = value;
            data
        };

        let mut restored = SerialEeprom::new();
        restored.configure(512, 6, SMALL_IMAGE_WINDOW);

        // Address width
        assert!(!restored.load_state(&corrupt(4, 9)));
        // Read cursor past the block
        let mut reading = corrupt(5, EepromState::ReadingData.tag());
        reading[6] = 200;
        assert!(!restored.load_state(&reading));
        // Data counter past 64 bits
        let mut writing = corrupt(5, EepromState::WritingData.tag());
        writing[6] = 64;
        assert!(!restored.load_state(&writing));
        // Address counter past the resolved width
        let mut address = corrupt(5, EepromState::ReceivingAddress(Request::Read).tag());
        address[6] = 6;
        assert!(!restored.load_state(&address));
        // Auto-detect stream past the longest request
        let mut stream = corrupt(5, EepromState::ReceivingAddress(Request::Write).tag());
        stream[4] = 0;
        stream[6] = WRITE_REQUEST_14;
        assert!(!restored.load_state(&stream));

        // Rejected snapshots leave the chip usable.
        assert_eq!(restored.read(), 1);
        let mut last_bit = corrupt(5, EepromState::ReadingData.tag());
        last_bit[6] = READ_PREAMBLE + BLOCK_BITS - 1;
        assert!(restored.load_state(&last_bit));
        restored.read();
        assert_eq!(restored.state(), EepromState::Idle);
    }
}
