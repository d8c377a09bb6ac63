//! Presentation of execution traces and decoder tables.
//!
//! The engine only produces [`TraceRecord`]s; everything here is formatting
//! for the CLI and the debugger.

use crate::cpu::{DecoderTable, Opcode, RunOutcome, RunReport, TraceRecord};
use std::fmt::Write;

/// One trace line: the state the cycle started from and the word it applied.
///
/// ```text
/// Step #4, PC is 2, IR is 00000000, Bus is 00000001, ACC is 0, ZF 0 --- word 000000000011000 (RO AI)
/// ```
pub fn format_record(record: &TraceRecord) -> String {
    let r = &record.before;
    format!(
        "Step #{}, PC is {}, IR is {:08b}, Bus is {:08b}, ACC is {}, ZF {} --- word {:015b} ({})",
        r.step,
        r.pc,
        r.ir,
        r.bus,
        r.acc,
        r.zf_bit(),
        record.control.bits(),
        record.control,
    )
}

/// One trace record as a JSON line.
pub fn json_record(record: &TraceRecord) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

/// Final register summary for a finished run.
pub fn format_report(report: &RunReport) -> String {
    let r = &report.registers;
    let mut out = String::new();
    let _ = writeln!(out, "Cycles: {}", report.cycles);
    let _ = writeln!(
        out,
        "State:  {}",
        match report.outcome {
            RunOutcome::Halted => "halted",
            RunOutcome::BudgetExhausted => "did not halt within budget",
        }
    );
    let _ = writeln!(out, "PC:  {:3}  ({:#04x})", r.pc, r.pc);
    let _ = writeln!(out, "IR:  {:3}  ({})", r.ir, opcode_name(r.ir));
    let _ = writeln!(out, "MAR: {:3}", r.mar);
    let _ = writeln!(out, "BUS: {:3}  ({:08b})", r.bus, r.bus);
    let _ = writeln!(out, "ACC: {:3}  ({:08b})", r.acc, r.acc);
    let _ = writeln!(out, "ZF:  {}", r.zf_bit());
    let _ = write!(out, "Step: {}", r.step);
    out
}

/// Mnemonic for an IR value, `???` if it is not a built-in opcode.
pub fn opcode_name(byte: u8) -> &'static str {
    Opcode::from_byte(byte).map_or("???", Opcode::mnemonic)
}

/// Listing of a decoder table, one micro-program per opcode.
pub fn format_decoder(table: &DecoderTable) -> String {
    let mut out = String::new();
    for opcode in table.opcodes() {
        let _ = writeln!(out, "{:#04x} {}", opcode, opcode_name(opcode));
        for (step, word) in table.micro_program(opcode).iter().enumerate() {
            let _ = writeln!(out, "    T{}: {:015b}  {}", step, word.bits(), word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{ControlWord, InstructionSet, Registers};

    #[test]
    fn test_format_record() {
        let record = TraceRecord {
            cycle: 5,
            before: Registers { pc: 2, step: 4, bus: 1, mar: 1, ir: 0, acc: 0, zf: false },
            control: ControlWord::MEM_OUT | ControlWord::ACC_LOAD,
            after: Registers { pc: 2, step: 5, bus: 15, mar: 1, ir: 0, acc: 15, zf: false },
            halted: false,
        };
        assert_eq!(
            format_record(&record),
            "Step #4, PC is 2, IR is 00000000, Bus is 00000001, ACC is 0, ZF 0 --- word 000000000011000 (RO AI)"
        );
        let json = json_record(&record).unwrap();
        assert!(json.contains("\"control\":\"MEM_OUT | ACC_LOAD\""));
    }

    #[test]
    fn test_format_decoder() {
        let listing = format_decoder(&InstructionSet::Basic.decoder());
        assert!(listing.starts_with("0x00 LDA\n    T0: 000000000000101  CO MI\n"));
        assert!(listing.contains("0x0f HLT"));
        assert!(!listing.contains("JMP"));
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(opcode_name(0x05), "EQZ");
        assert_eq!(opcode_name(0x02), "???");
    }
}
