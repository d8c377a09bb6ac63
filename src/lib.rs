//! # acc8 Emulator
//!
//! A cycle-accurate model of a minimal 8-bit accumulator computer.
//!
//! The machine is built from discrete parts (program counter, memory-address
//! register, instruction register, accumulator, zero flag) around one shared
//! bus. A microcode decoder turns each (micro-step, opcode) pair into a
//! control word, and the execution engine applies that word's lines in a
//! fixed order every clock cycle.

pub mod cpu;
pub mod asm;
pub mod programs;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use cpu::{
    run, run_traced, ControlLine, ControlWord, Cpu, CpuState, DecoderTable, InstructionSet, Memory,
    Opcode, Registers, RunOutcome, RunReport, TraceRecord,
};
pub use asm::{assemble, disassemble, load_image, save_image, AssemblerError, ImageError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
