//! Main memory.
//!
//! Memory is a sparse store of byte cells over the 8-bit address space the
//! bus can reach. Cells that were never written read as zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of addressable cells.
pub const MEMORY_SIZE: usize = 256;

/// Sparse, default-zero byte memory.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    cells: BTreeMap<u8, u8>,
}

impl Memory {
    /// Create an empty memory (every cell reads 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a memory image from `(address, value)` pairs.
    pub fn from_cells<I: IntoIterator<Item = (u8, u8)>>(cells: I) -> Self {
        let mut mem = Self::new();
        for (addr, value) in cells {
            mem.write(addr, value);
        }
        mem
    }

    /// Read a cell. Unset cells read as 0.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Write a cell.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells.insert(addr, value);
    }

    /// Was this cell ever written?
    pub fn is_set(&self, addr: u8) -> bool {
        self.cells.contains_key(&addr)
    }

    /// Copy `bytes` into consecutive cells starting at `start`.
    ///
    /// Fails if the block would run past the last address.
    pub fn load(&mut self, start: u8, bytes: &[u8]) -> Result<(), MemoryError> {
        let available = MEMORY_SIZE - start as usize;
        if bytes.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                start,
                size: bytes.len(),
                available,
            });
        }
        for (addr, byte) in (start..=u8::MAX).zip(bytes) {
            self.write(addr, *byte);
        }
        Ok(())
    }

    /// Forget every written cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Written cells in address order.
    pub fn cells(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.cells.iter().map(|(a, v)| (*a, *v))
    }

    /// Number of written cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// One past the highest written address, or 0 if nothing was written.
    pub fn extent(&self) -> usize {
        self.cells
            .keys()
            .next_back()
            .map_or(0, |last| *last as usize + 1)
    }

    /// Dump a window of memory (for debugging).
    pub fn dump(&self, start: u8, count: usize) -> Vec<(u8, u8)> {
        (start..=u8::MAX)
            .take(count)
            .map(|addr| (addr, self.read(addr)))
            .collect()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("written_cells", &self.cells.len())
            .field("extent", &self.extent())
            .finish()
    }
}

/// Errors that can occur while loading memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("block of {size} bytes at {start:#04x} exceeds the {available} cells left")]
    ProgramTooLarge {
        start: u8,
        size: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_cells_read_zero() {
        let mem = Memory::new();
        assert_eq!(mem.read(0), 0);
        assert_eq!(mem.read(0xFF), 0);
        assert!(mem.is_empty());
    }

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
        assert!(mem.is_set(10));
        assert!(!mem.is_set(11));
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load(9, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read(9), 1);
        assert_eq!(mem.read(10), 2);
        assert_eq!(mem.read(11), 3);
        assert_eq!(mem.extent(), 12);
    }

    #[test]
    fn test_load_bounds() {
        let mut mem = Memory::new();
        assert!(mem.load(0xFE, &[1, 2]).is_ok());
        assert_eq!(
            mem.load(0xFE, &[1, 2, 3]),
            Err(MemoryError::ProgramTooLarge { start: 0xFE, size: 3, available: 2 })
        );
    }

    #[test]
    fn test_dump_includes_gaps() {
        let mem = Memory::from_cells([(0, 7), (2, 9)]);
        assert_eq!(mem.dump(0, 3), vec![(0, 7), (1, 0), (2, 9)]);
        assert_eq!(mem.dump(0xFE, 10).len(), 2);
    }
}
