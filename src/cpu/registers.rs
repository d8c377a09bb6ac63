//! CPU registers.
//!
//! The machine has:
//! - PC: 8-bit program counter
//! - step: micro-step counter, 0 at every instruction boundary
//! - bus: the shared 8-bit data/address bus (only meaningful within a cycle)
//! - MAR: 8-bit memory-address register
//! - IR: 8-bit instruction register
//! - ACC: 8-bit accumulator
//! - ZF: zero flag

use serde::{Deserialize, Serialize};

/// The register file, including the sequencer's step counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: u8,
    /// Micro-step counter
    pub step: usize,
    /// Last value driven onto the bus
    pub bus: u8,
    /// Memory-address register
    pub mar: u8,
    /// Instruction register
    pub ir: u8,
    /// Accumulator
    pub acc: u8,
    /// Zero flag.
    ///
    /// Sticky: loads and adds only ever set it. Nothing clears it except an
    /// explicit `ZF_CLEAR`.
    pub zf: bool,
}

impl Registers {
    /// All registers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set ZF if the accumulator is zero; never clears it.
    #[inline]
    pub fn latch_zero(&mut self) {
        if self.acc == 0 {
            self.zf = true;
        }
    }

    /// ZF as a bus value.
    #[inline]
    pub fn zf_bit(&self) -> u8 {
        u8::from(self.zf)
    }

    /// Is the sequencer at an instruction boundary?
    pub fn at_boundary(&self) -> bool {
        self.step == 0
    }
}
