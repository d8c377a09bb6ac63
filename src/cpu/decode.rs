//! Microcode decoder.
//!
//! The decoder maps a (micro-step, opcode) pair to the control word the
//! sequencer asserts on that step. Every instruction shares the same three
//! fetch steps; from step 3 on each opcode runs its own micro-program, which
//! ends by asserting `STEP_RESET` (or `HALT`).
//!
//! Pairs with no entry decode to the empty control word: an idle step.

use super::control::ControlWord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Number of micro-steps shared by every instruction.
pub const FETCH_STEPS: usize = 3;

/// The shared fetch prefix: address the PC, latch the opcode, advance the PC.
pub const FETCH: [ControlWord; FETCH_STEPS] = [
    ControlWord::PC_OUT.union(ControlWord::MAR_IN),
    ControlWord::MEM_OUT.union(ControlWord::IR_IN),
    ControlWord::PC_INC,
];

/// Opcodes of the built-in instruction set.
///
/// 0x02 is reserved for a store instruction the hardware never wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// ACC := literal operand
    Lda = 0x00,
    /// ACC := ACC + literal operand
    Adc = 0x01,
    /// ACC := ACC + 1
    Inc = 0x03,
    /// PC := operand
    Jmp = 0x04,
    /// Skip the next byte if ZF is set (destroys ACC)
    Eqz = 0x05,
    /// Stop the machine
    Hlt = 0x0F,
}

impl Opcode {
    pub const ALL: [Opcode; 6] = [
        Opcode::Lda,
        Opcode::Adc,
        Opcode::Inc,
        Opcode::Jmp,
        Opcode::Eqz,
        Opcode::Hlt,
    ];

    /// Decode a raw instruction-register value.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|op| op.byte() == byte)
    }

    /// The raw opcode byte.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lda => "LDA",
            Opcode::Adc => "ADC",
            Opcode::Inc => "INC",
            Opcode::Jmp => "JMP",
            Opcode::Eqz => "EQZ",
            Opcode::Hlt => "HLT",
        }
    }

    /// Parse an assembler mnemonic (case-insensitive).
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(mnemonic))
    }

    /// Does the instruction read an operand byte following the opcode?
    pub const fn has_operand(self) -> bool {
        matches!(self, Opcode::Lda | Opcode::Adc | Opcode::Jmp)
    }

    /// The post-fetch micro-program (steps 3 and up).
    pub fn micro_program(self) -> &'static [ControlWord] {
        const LDA: &[ControlWord] = &[
            ControlWord::PC_OUT.union(ControlWord::MAR_IN),
            ControlWord::MEM_OUT.union(ControlWord::ACC_LOAD),
            ControlWord::STEP_RESET.union(ControlWord::PC_INC),
        ];
        const ADC: &[ControlWord] = &[
            ControlWord::PC_OUT.union(ControlWord::MAR_IN),
            ControlWord::MEM_OUT.union(ControlWord::ACC_ADD),
            ControlWord::STEP_RESET.union(ControlWord::PC_INC),
        ];
        const INC: &[ControlWord] = &[ControlWord::ACC_INC, ControlWord::STEP_RESET];
        const JMP: &[ControlWord] = &[
            ControlWord::PC_OUT.union(ControlWord::MAR_IN),
            ControlWord::MEM_OUT,
            ControlWord::PC_IN,
            ControlWord::STEP_RESET,
        ];
        // ACC := PC, ACC += ZF, PC := ACC
        const EQZ: &[ControlWord] = &[
            ControlWord::PC_OUT.union(ControlWord::ACC_LOAD),
            ControlWord::ZF_OUT,
            ControlWord::ACC_ADD,
            ControlWord::ACC_OUT,
            ControlWord::PC_IN,
            ControlWord::STEP_RESET,
        ];
        const HLT: &[ControlWord] = &[ControlWord::HALT];

        match self {
            Opcode::Lda => LDA,
            Opcode::Adc => ADC,
            Opcode::Inc => INC,
            Opcode::Jmp => JMP,
            Opcode::Eqz => EQZ,
            Opcode::Hlt => HLT,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The two instruction-set revisions of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InstructionSet {
    /// LDA, ADC, INC and HLT only.
    Basic,
    /// Basic plus JMP and EQZ.
    #[default]
    Extended,
}

impl InstructionSet {
    pub fn opcodes(self) -> &'static [Opcode] {
        match self {
            InstructionSet::Basic => &[Opcode::Lda, Opcode::Adc, Opcode::Inc, Opcode::Hlt],
            InstructionSet::Extended => &Opcode::ALL,
        }
    }

    pub fn contains(self, opcode: Opcode) -> bool {
        self.opcodes().contains(&opcode)
    }

    /// Expand this instruction set into a decoder table.
    pub fn decoder(self) -> DecoderTable {
        let mut table = DecoderTable::default();
        for &op in self.opcodes() {
            table.insert_program(op.byte(), op.micro_program());
        }
        table
    }
}

lazy_static::lazy_static! {
    /// Shared decoder for the extended instruction set.
    pub static ref EXTENDED: DecoderTable = InstructionSet::Extended.decoder();
}

/// A decoder lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecoderKey {
    pub step: usize,
    pub opcode: u8,
}

impl DecoderKey {
    pub const fn new(step: usize, opcode: u8) -> Self {
        Self { step, opcode }
    }
}

/// Immutable (step, opcode) -> control word table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderTable {
    entries: BTreeMap<DecoderKey, ControlWord>,
}

impl DecoderTable {
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::new()
    }

    /// Control word for `(step, opcode)`; empty if the pair is undefined.
    #[inline]
    pub fn lookup(&self, step: usize, opcode: u8) -> ControlWord {
        self.entries
            .get(&DecoderKey::new(step, opcode))
            .copied()
            .unwrap_or(ControlWord::empty())
    }

    /// All defined entries in key order (step-major).
    pub fn entries(&self) -> impl Iterator<Item = (DecoderKey, ControlWord)> + '_ {
        self.entries.iter().map(|(k, w)| (*k, *w))
    }

    /// The full micro-program (fetch prefix included) for one opcode.
    pub fn micro_program(&self, opcode: u8) -> Vec<ControlWord> {
        let mut steps: Vec<(usize, ControlWord)> = self
            .entries()
            .filter(|(key, _)| key.opcode == opcode)
            .map(|(key, word)| (key.step, word))
            .collect();
        steps.sort_by_key(|(step, _)| *step);
        steps.into_iter().map(|(_, word)| word).collect()
    }

    /// Opcodes with at least one defined step, ascending.
    pub fn opcodes(&self) -> Vec<u8> {
        let mut ops: Vec<u8> = self.entries.keys().map(|k| k.opcode).collect();
        ops.sort_unstable();
        ops.dedup();
        ops
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every micro-program in the table is well formed.
    pub fn validate(&self) -> Result<(), DecoderError> {
        for opcode in self.opcodes() {
            let program = self.micro_program(opcode);
            check_program(opcode, &program[FETCH_STEPS.min(program.len())..])?;
        }
        Ok(())
    }

    fn insert_program(&mut self, opcode: u8, program: &[ControlWord]) {
        for (step, word) in FETCH.iter().chain(program).enumerate() {
            self.entries.insert(DecoderKey::new(step, opcode), *word);
        }
    }
}

fn check_program(opcode: u8, program: &[ControlWord]) -> Result<(), DecoderError> {
    match program.last() {
        None => Err(DecoderError::EmptyMicroProgram(opcode)),
        Some(last) if !last.intersects(ControlWord::STEP_RESET | ControlWord::HALT) => {
            Err(DecoderError::Unterminated(opcode))
        }
        Some(_) => Ok(()),
    }
}

/// Declarative builder: one micro-program per opcode, fetch prefix implied.
#[derive(Debug, Default)]
pub struct DecoderBuilder {
    programs: Vec<(u8, Vec<ControlWord>)>,
}

impl DecoderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the post-fetch steps of `opcode`.
    pub fn instruction(mut self, opcode: u8, program: &[ControlWord]) -> Self {
        self.programs.push((opcode, program.to_vec()));
        self
    }

    /// Register a built-in opcode with its standard micro-program.
    pub fn opcode(self, opcode: Opcode) -> Self {
        self.instruction(opcode.byte(), opcode.micro_program())
    }

    pub fn build(self) -> Result<DecoderTable, DecoderError> {
        let mut table = DecoderTable::default();
        let mut seen = [false; 256];
        for (opcode, program) in &self.programs {
            if std::mem::replace(&mut seen[*opcode as usize], true) {
                return Err(DecoderError::DuplicateOpcode(*opcode));
            }
            check_program(*opcode, program)?;
            table.insert_program(*opcode, program);
        }
        Ok(table)
    }
}

/// Errors that can occur while building a decoder table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("opcode {0:#04x} defined more than once")]
    DuplicateOpcode(u8),

    #[error("opcode {0:#04x} has no steps after fetch")]
    EmptyMicroProgram(u8),

    #[error("micro-program for opcode {0:#04x} never asserts STEP_RESET or HALT on its last step")]
    Unterminated(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_prefix_shared_by_every_opcode() {
        let table = InstructionSet::Extended.decoder();
        for op in Opcode::ALL {
            for (step, word) in FETCH.iter().enumerate() {
                assert_eq!(table.lookup(step, op.byte()), *word, "{} step {}", op, step);
            }
        }
    }

    #[test]
    fn test_undefined_pairs_are_idle() {
        let table = InstructionSet::Extended.decoder();
        // reserved store opcode
        assert!(table.lookup(0, 0x02).is_empty());
        // past the end of LDA
        assert!(table.lookup(6, Opcode::Lda.byte()).is_empty());
        assert!(table.lookup(usize::MAX, 0xFF).is_empty());
    }

    #[test]
    fn test_cycle_counts() {
        let table = InstructionSet::Extended.decoder();
        let expected = [
            (Opcode::Lda, 6),
            (Opcode::Adc, 6),
            (Opcode::Inc, 5),
            (Opcode::Jmp, 7),
            (Opcode::Eqz, 9),
            (Opcode::Hlt, 4),
        ];
        for (op, len) in expected {
            assert_eq!(table.micro_program(op.byte()).len(), len, "{}", op);
        }
        assert_eq!(table.len(), 37);
    }

    #[test]
    fn test_builtin_sets_validate() {
        assert_eq!(InstructionSet::Basic.decoder().validate(), Ok(()));
        assert_eq!(InstructionSet::Extended.decoder().validate(), Ok(()));
        assert_eq!(*EXTENDED, InstructionSet::Extended.decoder());
    }

    #[test]
    fn test_basic_is_subset_of_extended() {
        let basic = InstructionSet::Basic.decoder();
        let extended = InstructionSet::Extended.decoder();
        for (key, word) in basic.entries() {
            assert_eq!(extended.lookup(key.step, key.opcode), word);
        }
        assert!(basic.lookup(0, Opcode::Jmp.byte()).is_empty());
        assert!(basic.lookup(0, Opcode::Eqz.byte()).is_empty());
        assert_eq!(basic.opcodes(), vec![0x00, 0x01, 0x03, 0x0F]);
    }

    #[test]
    fn test_builder_matches_instruction_set() {
        let built = Opcode::ALL
            .into_iter()
            .fold(DecoderTable::builder(), |b, op| b.opcode(op))
            .build()
            .unwrap();
        assert_eq!(built, InstructionSet::Extended.decoder());
    }

    #[test]
    fn test_builder_rejects_bad_programs() {
        let dup = DecoderTable::builder()
            .opcode(Opcode::Inc)
            .instruction(0x03, &[ControlWord::STEP_RESET])
            .build();
        assert_eq!(dup, Err(DecoderError::DuplicateOpcode(0x03)));

        let empty = DecoderTable::builder().instruction(0x20, &[]).build();
        assert_eq!(empty, Err(DecoderError::EmptyMicroProgram(0x20)));

        let open = DecoderTable::builder()
            .instruction(0x21, &[ControlWord::ACC_INC])
            .build();
        assert_eq!(open, Err(DecoderError::Unterminated(0x21)));
    }

    #[test]
    fn test_opcode_lookup() {
        assert_eq!(Opcode::from_byte(0x0F), Some(Opcode::Hlt));
        assert_eq!(Opcode::from_byte(0x02), None);
        assert_eq!(Opcode::from_mnemonic("eqz"), Some(Opcode::Eqz));
        assert_eq!(Opcode::from_mnemonic("STA"), None);
        assert!(Opcode::Jmp.has_operand());
        assert!(!Opcode::Inc.has_operand());
    }
}
