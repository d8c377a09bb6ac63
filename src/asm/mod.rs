//! Assembler, disassembler and image files for acc8 programs.
//!
//! This module provides:
//! - A two-pass assembler (text → memory image)
//! - A disassembler (memory image → text)
//! - Memory image file formats (hex dump, JSON)

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use image::{load_image, save_image, ImageError};
