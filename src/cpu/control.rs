//! Control lines and control words.
//!
//! Every micro-operation of the machine is triggered by one named control
//! line. The decoder asserts a set of lines (a control word) for each
//! micro-step; the execution engine reacts to each asserted line in a fixed
//! order.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// The set of control lines asserted during one micro-step.
    ///
    /// Bit positions match the wiring of the modeled hardware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ControlWord: u16 {
        /// Program counter drives the bus.
        const PC_OUT = 1 << 0;
        /// Program counter increments.
        const PC_INC = 1 << 1;
        /// Memory-address register latches the bus.
        const MAR_IN = 1 << 2;
        /// Memory cell at MAR drives the bus.
        const MEM_OUT = 1 << 3;
        /// Accumulator latches the bus.
        const ACC_LOAD = 1 << 4;
        /// Accumulator adds the bus.
        const ACC_ADD = 1 << 5;
        /// Accumulator drives the bus.
        const ACC_OUT = 1 << 6;
        /// Instruction register latches the bus.
        const IR_IN = 1 << 7;
        /// Micro-step counter returns to 0.
        const STEP_RESET = 1 << 8;
        /// Stop the clock.
        const HALT = 1 << 9;
        /// Accumulator increments.
        const ACC_INC = 1 << 10;
        /// Program counter latches the bus.
        const PC_IN = 1 << 11;
        /// Zero flag is cleared.
        const ZF_CLEAR = 1 << 12;
        /// Zero flag is set.
        const ZF_SET = 1 << 13;
        /// Zero flag drives the bus.
        const ZF_OUT = 1 << 14;
    }
}

/// A single named control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlLine {
    PcOut,
    PcInc,
    MarIn,
    MemOut,
    AccLoad,
    AccAdd,
    AccOut,
    IrIn,
    StepReset,
    Halt,
    AccInc,
    PcIn,
    ZfClear,
    ZfSet,
    ZfOut,
}

impl ControlLine {
    /// All lines, in bit order.
    pub const ALL: [ControlLine; 15] = [
        ControlLine::PcOut,
        ControlLine::PcInc,
        ControlLine::MarIn,
        ControlLine::MemOut,
        ControlLine::AccLoad,
        ControlLine::AccAdd,
        ControlLine::AccOut,
        ControlLine::IrIn,
        ControlLine::StepReset,
        ControlLine::Halt,
        ControlLine::AccInc,
        ControlLine::PcIn,
        ControlLine::ZfClear,
        ControlLine::ZfSet,
        ControlLine::ZfOut,
    ];

    /// The order in which the engine reacts to asserted lines within a cycle.
    ///
    /// Later lines may consume the bus value driven by earlier ones, so this
    /// order is part of the machine's semantics. `StepReset` is not listed:
    /// it is resolved after every other effect, when the step counter advances.
    pub const APPLY_ORDER: [ControlLine; 14] = [
        ControlLine::PcOut,
        ControlLine::PcInc,
        ControlLine::PcIn,
        ControlLine::MarIn,
        ControlLine::MemOut,
        ControlLine::AccLoad,
        ControlLine::AccAdd,
        ControlLine::AccOut,
        ControlLine::IrIn,
        ControlLine::ZfClear,
        ControlLine::ZfSet,
        ControlLine::ZfOut,
        ControlLine::Halt,
        ControlLine::AccInc,
    ];

    /// The single-bit control word for this line.
    pub const fn word(self) -> ControlWord {
        match self {
            ControlLine::PcOut => ControlWord::PC_OUT,
            ControlLine::PcInc => ControlWord::PC_INC,
            ControlLine::MarIn => ControlWord::MAR_IN,
            ControlLine::MemOut => ControlWord::MEM_OUT,
            ControlLine::AccLoad => ControlWord::ACC_LOAD,
            ControlLine::AccAdd => ControlWord::ACC_ADD,
            ControlLine::AccOut => ControlWord::ACC_OUT,
            ControlLine::IrIn => ControlWord::IR_IN,
            ControlLine::StepReset => ControlWord::STEP_RESET,
            ControlLine::Halt => ControlWord::HALT,
            ControlLine::AccInc => ControlWord::ACC_INC,
            ControlLine::PcIn => ControlWord::PC_IN,
            ControlLine::ZfClear => ControlWord::ZF_CLEAR,
            ControlLine::ZfSet => ControlWord::ZF_SET,
            ControlLine::ZfOut => ControlWord::ZF_OUT,
        }
    }

    /// Short mnemonic used in traces and the debugger.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ControlLine::PcOut => "CO",
            ControlLine::PcInc => "CE",
            ControlLine::MarIn => "MI",
            ControlLine::MemOut => "RO",
            ControlLine::AccLoad => "AI",
            ControlLine::AccAdd => "AD",
            ControlLine::AccOut => "AO",
            ControlLine::IrIn => "II",
            ControlLine::StepReset => "SR",
            ControlLine::Halt => "HLT",
            ControlLine::AccInc => "AC+",
            ControlLine::PcIn => "J",
            ControlLine::ZfClear => "ZC",
            ControlLine::ZfSet => "ZS",
            ControlLine::ZfOut => "ZO",
        }
    }
}

impl ControlWord {
    /// Is `line` asserted in this word?
    #[inline]
    pub const fn asserts(self, line: ControlLine) -> bool {
        self.contains(line.word())
    }

    /// Iterate over the asserted lines, in bit order.
    pub fn lines(self) -> impl Iterator<Item = ControlLine> {
        ControlLine::ALL
            .into_iter()
            .filter(move |line| self.asserts(*line))
    }
}

impl From<ControlLine> for ControlWord {
    fn from(line: ControlLine) -> Self {
        line.word()
    }
}

impl FromIterator<ControlLine> for ControlWord {
    fn from_iter<I: IntoIterator<Item = ControlLine>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ControlWord::empty(), |word, line| word | line.word())
    }
}

impl fmt::Display for ControlWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let mut first = true;
        for line in self.lines() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", line.mnemonic())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_have_unique_bits() {
        let mut seen = ControlWord::empty();
        for line in ControlLine::ALL {
            assert!(!seen.intersects(line.word()), "{:?} shares a bit", line);
            assert_eq!(line.word().bits().count_ones(), 1);
            seen |= line.word();
        }
        assert_eq!(seen, ControlWord::all());
    }

    #[test]
    fn test_apply_order_covers_everything_but_step_reset() {
        let applied: ControlWord = ControlLine::APPLY_ORDER.into_iter().collect();
        assert_eq!(applied | ControlWord::STEP_RESET, ControlWord::all());
        assert!(!applied.asserts(ControlLine::StepReset));
    }

    #[test]
    fn test_membership_and_iteration() {
        let word = ControlWord::PC_OUT | ControlWord::MAR_IN;
        assert!(word.asserts(ControlLine::PcOut));
        assert!(word.asserts(ControlLine::MarIn));
        assert!(!word.asserts(ControlLine::MemOut));

        let lines: Vec<_> = word.lines().collect();
        assert_eq!(lines, vec![ControlLine::PcOut, ControlLine::MarIn]);
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlWord::empty().to_string(), "-");
        assert_eq!((ControlWord::MEM_OUT | ControlWord::IR_IN).to_string(), "RO II");
    }

    #[test]
    fn test_serde_uses_flag_names() {
        let word = ControlWord::PC_OUT | ControlWord::MAR_IN;
        let json = serde_json::to_string(&word).unwrap();
        assert_eq!(json, "\"PC_OUT | MAR_IN\"");
        let back: ControlWord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, word);
    }
}
