// gba-cartridge-rs/src/core/cartridge/rom.rs

use log::info;

use crate::core::memory::bus::{self, AccessWidth};
use crate::core::memory::MAX_ROM_SIZE;

/// Program ROM
///
/// The buffer always spans the full 32MB window; after a load everything past
/// the declared size mirrors the image, so reads never need a modulo.
pub struct ProgramImage {
    data: Box<[u8]>,
    size: usize,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self {
            data: vec![0; MAX_ROM_SIZE].into_boxed_slice(),
            size: 0,
        }
    }

    /// Declared image size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the image needs more than 24 address bits
    pub fn is_large(&self) -> bool {
        self.size > 16 * 1024 * 1024
    }

    /// Region the loader fills with `size` bytes of image
    pub(crate) fn prepare(&mut self, size: usize) -> &mut [u8] {
        self.size = size.min(self.data.len());
        self.data[..self.size].fill(0);
        &mut self.data[..self.size]
    }

    /// Repeats the image up to the end of the window
    pub(crate) fn mirror(&mut self) {
        if self.size == 0 {
            self.data.fill(0);
            return;
        }

        // Copies double in length, so every chunk starts at a multiple of
        // `size` and byte `n` ends up equal to byte `n % size`.
        let mut filled = self.size;
        while filled < self.data.len() {
            let len = filled.min(self.data.len() - filled);
            self.data.copy_within(0..len, filled);
            filled += len;
        }

        info!("ROM: {} bytes, espelhada até {} bytes", self.size, self.data.len());
    }

    /// Reads from an already masked ROM offset
    #[inline]
    pub fn read(&self, offset: u32, width: AccessWidth) -> u32 {
        bus::read(&self.data, offset, width)
    }
}

impl Default for ProgramImage {
    fn default() -> Self {
        Self::new()
    }
}
