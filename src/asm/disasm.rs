//! Disassembler for acc8 memory images.
//!
//! Converts memory cells back to assembler text that [`super::assemble`]
//! accepts.

use crate::cpu::{Memory, Opcode};

/// Disassemble the instruction at `addr`.
///
/// Returns the text and the number of bytes consumed. Bytes that are not an
/// opcode, and operand opcodes whose operand cell was never written, come
/// out as `DAT`.
pub fn disassemble_instruction(mem: &Memory, addr: u8) -> (String, usize) {
    let byte = mem.read(addr);
    match Opcode::from_byte(byte) {
        Some(op) if op.has_operand() => match addr.checked_add(1) {
            Some(next) if mem.is_set(next) => (format!("{} {}", op, mem.read(next)), 2),
            _ => (format!("DAT {:#04x}", byte), 1),
        },
        Some(op) => (op.to_string(), 1),
        None => (format!("DAT {:#04x}", byte), 1),
    }
}

/// Disassemble every written region of a memory image.
///
/// Gaps between written regions become `ORG` directives.
pub fn disassemble(mem: &Memory) -> String {
    let mut output = String::new();
    output.push_str("; acc8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let extent = mem.extent();
    let mut addr = 0usize;
    let mut need_org = false;

    while addr < extent {
        let cell = addr as u8;
        if !mem.is_set(cell) {
            need_org = true;
            addr += 1;
            continue;
        }
        if need_org {
            output.push_str(&format!("        ORG {}\n", addr));
            need_org = false;
        }

        let (text, len) = disassemble_instruction(mem, cell);
        let bytes: Vec<String> = (addr..addr + len)
            .map(|a| format!("{:02x}", mem.read(a as u8)))
            .collect();
        output.push_str(&format!("        {:<12}; {:03}: {}\n", text, addr, bytes.join(" ")));
        addr += len;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::programs;

    #[test]
    fn test_disassemble_operands() {
        let mem = Memory::from_cells([(0, 0x00), (1, 7), (2, 0x03), (3, 0x02)]);
        assert_eq!(disassemble_instruction(&mem, 0), ("LDA 7".to_string(), 2));
        assert_eq!(disassemble_instruction(&mem, 2), ("INC".to_string(), 1));
        assert_eq!(disassemble_instruction(&mem, 3), ("DAT 0x02".to_string(), 1));
    }

    #[test]
    fn test_disassemble_last_cell() {
        let mem = Memory::from_cells([(0xFF, 0x04)]);
        assert_eq!(disassemble_instruction(&mem, 0xFF), ("DAT 0x04".to_string(), 1));
    }

    #[test]
    fn test_missing_operand_stays_unset() {
        let mem = Memory::from_cells([(0, Opcode::Lda.byte())]);
        assert_eq!(disassemble_instruction(&mem, 0), ("DAT 0x00".to_string(), 1));
        let rebuilt = assemble(&disassemble(&mem)).unwrap();
        assert!(!rebuilt.is_set(1));
        assert_eq!(rebuilt, mem);
    }

    #[test]
    fn test_disassembly_reassembles() {
        let listing = disassemble(&programs::demo());
        assert!(listing.contains("ORG 9"));
        assert!(listing.contains("EQZ"));
        assert_eq!(assemble(&listing).unwrap(), programs::demo());
    }
}
