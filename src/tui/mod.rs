//! TUI debugger for the acc8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and bus view
//! - Live control-line display (last and next control word)
//! - Cycle and instruction stepping, run, breakpoints
//! - Disassembly, memory and trace views

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
