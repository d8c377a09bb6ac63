//! CPU emulation for the microcoded accumulator machine.
//!
//! This module implements the complete machine:
//! - 15 control lines driven by a (step, opcode) microcode decoder
//! - a 256-cell sparse byte memory
//! - PC, MAR, IR, ACC and a sticky zero flag around one shared 8-bit bus

pub mod control;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use control::{ControlLine, ControlWord};
pub use memory::{Memory, MemoryError};
pub use registers::Registers;
pub use decode::{DecoderBuilder, DecoderError, DecoderKey, DecoderTable, InstructionSet, Opcode};
pub use execute::{run, run_traced, Cpu, CpuState, RunOutcome, RunReport, TraceRecord};
