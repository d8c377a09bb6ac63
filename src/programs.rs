//! Built-in programs.

use crate::cpu::Memory;

/// Source of the demonstration program.
///
/// Loads 15, adds 1, increments to 17, then jumps over a gap to a zero test
/// that skips the first `HLT` and halts with ACC = 1.
pub const DEMO_SOURCE: &str = "\
; demonstration program
        LDA 15
        ADC 1
        INC
        JMP TEST
        ORG 9
TEST:   LDA 0
        EQZ
        HLT          ; reached only when ZF is clear
        LDA 1
        HLT
";

/// The demonstration program as raw memory cells.
pub const DEMO_IMAGE: &[(u8, u8)] = &[
    (0, 0x00),
    (1, 0x0F),
    (2, 0x01),
    (3, 0x01),
    (4, 0x03),
    (5, 0x04),
    (6, 0x09),
    (9, 0x00),
    (10, 0x00),
    (11, 0x05),
    (12, 0x0F),
    (13, 0x00),
    (14, 0x01),
    (15, 0x0F),
];

/// A fresh memory holding the demonstration program.
pub fn demo() -> Memory {
    Memory::from_cells(DEMO_IMAGE.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    #[test]
    fn test_demo_source_matches_image() {
        assert_eq!(assemble(DEMO_SOURCE).unwrap(), demo());
    }

    #[test]
    fn test_demo_leaves_gap() {
        let mem = demo();
        assert!(!mem.is_set(7));
        assert!(!mem.is_set(8));
        assert_eq!(mem.extent(), 16);
    }
}
