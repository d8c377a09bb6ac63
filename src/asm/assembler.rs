//! Simple assembler for acc8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LABEL:          ; Define a label
//!     LDA 10      ; Load the literal 10
//!     ADC 0x01    ; Add a literal
//!     INC         ; Increment the accumulator
//!     JMP LABEL   ; Jump to label
//!     EQZ         ; Skip the next byte if the zero flag is set
//!     HLT         ; Halt
//!
//!     ORG 50      ; Move the location counter (leaves a gap)
//!     DAT 42      ; Emit a raw byte
//! ```

use crate::cpu::{Memory, Opcode};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a memory image.
pub fn assemble(source: &str) -> Result<Memory, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// The assembler state.
struct Assembler {
    /// Location counter; `None` once the last address has been filled.
    current_addr: Option<u8>,
    /// Symbol table (label -> address).
    symbols: HashMap<String, u8>,
    /// Operand cells waiting for a label: (cell address, label, source line).
    pending: Vec<(u8, String, usize)>,
    /// Output image.
    output: Memory,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: Some(0),
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Memory::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Memory, AssemblerError> {
        // Pass 1: collect labels and emit code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: patch forward references
        self.resolve_references()?;

        log::debug!(
            "assembled {} bytes, {} labels",
            self.output.len(),
            self.symbols.len()
        );
        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition
        if let Some((label, rest)) = line.split_once(':') {
            let label = label.trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            let addr = self.location(line_num)?;
            if self.symbols.insert(label.clone(), addr).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = rest.trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (mnemonic, operand) = match parts.as_slice() {
            [] => return Ok(()),
            [m] => (m.to_uppercase(), None),
            [m, op] => (m.to_uppercase(), Some(*op)),
            _ => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "too many operands".into(),
                })
            }
        };

        match mnemonic.as_str() {
            // Directives
            "ORG" => {
                let op = require(operand, "ORG requires an address", line_num)?;
                let addr = parse_number(op, line_num)?;
                self.current_addr = Some(addr);
            }

            "DAT" | "DATA" => {
                let op = require(operand, "DAT requires a value", line_num)?;
                self.emit_operand(op, line_num)?;
            }

            // Instructions
            _ => {
                let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic {
                        line: line_num,
                        mnemonic: mnemonic.clone(),
                    }
                })?;

                match (opcode.has_operand(), operand) {
                    (true, Some(op)) => {
                        self.emit(opcode.byte(), line_num)?;
                        self.emit_operand(op, line_num)?;
                    }
                    (true, None) => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: format!("{} requires an operand", opcode),
                        })
                    }
                    (false, Some(_)) => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: format!("{} takes no operand", opcode),
                        })
                    }
                    (false, None) => self.emit(opcode.byte(), line_num)?,
                }
            }
        }

        Ok(())
    }

    /// Emit a numeric operand, or a placeholder patched once `operand` is defined.
    fn emit_operand(&mut self, operand: &str, line_num: usize) -> Result<(), AssemblerError> {
        if starts_numeric(operand) {
            let value = parse_number(operand, line_num)?;
            return self.emit(value, line_num);
        }

        let addr = self.location(line_num)?;
        self.pending.push((addr, operand.to_uppercase(), line_num));
        self.emit(0, line_num)
    }

    fn location(&self, line_num: usize) -> Result<u8, AssemblerError> {
        self.current_addr
            .ok_or(AssemblerError::AddressOverflow { line: line_num })
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        let addr = self.location(line_num)?;
        self.output.write(addr, byte);
        self.current_addr = addr.checked_add(1);
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (cell, label, line_num) in &self.pending {
            let addr = self.symbols.get(label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: *line_num,
                label: label.clone(),
            })?;
            self.output.write(*cell, *addr);
        }
        Ok(())
    }
}

fn require<'a>(operand: Option<&'a str>, message: &str, line_num: usize) -> Result<&'a str, AssemblerError> {
    operand.ok_or_else(|| AssemblerError::SyntaxError {
        line: line_num,
        message: message.into(),
    })
}

fn starts_numeric(operand: &str) -> bool {
    operand
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
}

/// Parse a decimal, `0x` hex or `0b` binary byte.
fn parse_number(operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
    let operand = operand.trim();
    let parsed = if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = operand.strip_prefix("0b").or_else(|| operand.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else {
        operand.parse::<i64>()
    };

    let value = parsed.map_err(|_| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("invalid number '{}'", operand),
    })?;

    u8::try_from(value).map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("duplicate label on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },

    #[error("program runs past address 0xff on line {line}")]
    AddressOverflow { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LDA 10
            ADC 0x0b
            INC
            HLT
        "#;

        let mem = assemble(source).unwrap();
        assert_eq!(mem.dump(0, 6), vec![(0, 0x00), (1, 10), (2, 0x01), (3, 11), (4, 0x03), (5, 0x0F)]);
        assert_eq!(mem.len(), 6);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            JMP END
            INC
        END: HLT
            JMP start
        "#;

        let mem = assemble(source).unwrap();
        assert_eq!(mem.read(1), 3);
        assert_eq!(mem.read(3), 0x0F);
        assert_eq!(mem.read(5), 0);
    }

    #[test]
    fn test_assemble_org_and_data() {
        let source = r#"
            DAT 42
            ORG 0x10
            DAT 0b101
            DAT 255
        "#;

        let mem = assemble(source).unwrap();
        assert_eq!(mem.read(0), 42);
        assert!(!mem.is_set(1));
        assert_eq!(mem.read(0x10), 5);
        assert_eq!(mem.read(0x11), 255);
    }

    #[test]
    fn test_assemble_errors() {
        assert_eq!(
            assemble("STA 3"),
            Err(AssemblerError::UnknownMnemonic { line: 1, mnemonic: "STA".into() })
        );
        assert_eq!(
            assemble("JMP NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, label: "NOWHERE".into() })
        );
        assert_eq!(
            assemble("A: INC\nA: HLT"),
            Err(AssemblerError::DuplicateLabel { line: 2, label: "A".into() })
        );
        assert_eq!(
            assemble("LDA 256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
        assert!(matches!(assemble("LDA"), Err(AssemblerError::SyntaxError { line: 1, .. })));
        assert!(matches!(assemble("INC 4"), Err(AssemblerError::SyntaxError { line: 1, .. })));
        assert!(matches!(assemble("DAT 0xZZ"), Err(AssemblerError::SyntaxError { line: 1, .. })));
    }

    #[test]
    fn test_assemble_address_overflow() {
        assert!(assemble("ORG 255\nHLT").is_ok());
        assert_eq!(
            assemble("ORG 255\nHLT\nHLT"),
            Err(AssemblerError::AddressOverflow { line: 3 })
        );
    }
}
