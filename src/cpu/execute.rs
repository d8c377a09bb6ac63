//! Cycle execution engine.
//!
//! Each cycle looks up the control word for `(step, IR)`, reacts to every
//! asserted line in [`ControlLine::APPLY_ORDER`], then advances the step
//! counter (or resets it to 0 when `STEP_RESET` is asserted). Once `HALT`
//! has been asserted no further cycle has any effect.

use crate::cpu::control::{ControlLine, ControlWord};
use crate::cpu::decode::DecoderTable;
use crate::cpu::{Memory, Registers};
use serde::{Deserialize, Serialize};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// The clock is running.
    Running,
    /// `HALT` was asserted.
    Halted,
}

/// Everything observable about one executed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// 1-based cycle number since the CPU was created or reset.
    pub cycle: u64,
    /// Registers as the cycle began; `before.step` and `before.ir` selected `control`.
    pub before: Registers,
    /// The control word that was applied.
    pub control: ControlWord,
    /// Registers after the cycle.
    pub after: Registers,
    /// Did this cycle halt the machine?
    pub halted: bool,
}

/// How a bounded run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The program asserted `HALT`.
    Halted,
    /// The cycle budget ran out first.
    BudgetExhausted,
}

/// Result of a bounded run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub registers: Registers,
    pub memory: Memory,
    /// Cycles executed during this run.
    pub cycles: u64,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn halted(&self) -> bool {
        self.outcome == RunOutcome::Halted
    }
}

/// The microcoded CPU.
#[derive(Clone)]
pub struct Cpu<'d> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Cycles executed so far.
    pub cycles: u64,
    decoder: &'d DecoderTable,
    last_control: ControlWord,
}

impl<'d> Cpu<'d> {
    /// Create a CPU with zeroed registers over a memory image.
    pub fn new(decoder: &'d DecoderTable, mem: Memory) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            state: CpuState::Running,
            cycles: 0,
            decoder,
            last_control: ControlWord::empty(),
        }
    }

    /// Zero the registers and replace memory.
    pub fn reset(&mut self, mem: Memory) {
        self.regs.reset();
        self.mem = mem;
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_control = ControlWord::empty();
    }

    pub fn decoder(&self) -> &'d DecoderTable {
        self.decoder
    }

    /// The control word the next cycle will apply.
    pub fn next_control(&self) -> ControlWord {
        self.decoder.lookup(self.regs.step, self.regs.ir)
    }

    /// The control word applied by the most recent cycle.
    pub fn last_control(&self) -> ControlWord {
        self.last_control
    }

    /// Execute one cycle.
    ///
    /// Returns `None` without touching any state once the CPU has halted.
    pub fn step(&mut self) -> Option<TraceRecord> {
        if self.is_halted() {
            return None;
        }

        let before = self.regs;
        let control = self.next_control();

        for line in ControlLine::APPLY_ORDER {
            if control.asserts(line) {
                self.apply(line);
            }
        }

        self.regs.step = if control.asserts(ControlLine::StepReset) {
            0
        } else {
            before.step.wrapping_add(1)
        };

        self.cycles += 1;
        self.last_control = control;

        Some(TraceRecord {
            cycle: self.cycles,
            before,
            control,
            after: self.regs,
            halted: self.is_halted(),
        })
    }

    /// React to one asserted control line.
    fn apply(&mut self, line: ControlLine) {
        let regs = &mut self.regs;
        match line {
            ControlLine::PcOut => regs.bus = regs.pc,
            ControlLine::PcInc => regs.pc = regs.pc.wrapping_add(1),
            ControlLine::PcIn => regs.pc = regs.bus,
            ControlLine::MarIn => regs.mar = regs.bus,
            ControlLine::MemOut => regs.bus = self.mem.read(regs.mar),
            ControlLine::AccLoad => {
                regs.acc = regs.bus;
                regs.latch_zero();
            }
            ControlLine::AccAdd => {
                regs.acc = regs.acc.wrapping_add(regs.bus);
                regs.latch_zero();
            }
            ControlLine::AccOut => regs.bus = regs.acc,
            ControlLine::IrIn => regs.ir = regs.bus,
            ControlLine::ZfClear => regs.zf = false,
            ControlLine::ZfSet => regs.zf = true,
            ControlLine::ZfOut => regs.bus = regs.zf_bit(),
            ControlLine::Halt => self.state = CpuState::Halted,
            ControlLine::AccInc => regs.acc = regs.acc.wrapping_add(1),
            // resolved by the sequencer after all other effects
            ControlLine::StepReset => {}
        }
    }

    /// Run until the current instruction completes (the step counter returns
    /// to 0), the CPU halts, or `max_cycles` cycles have run.
    pub fn step_instruction(&mut self, max_cycles: u64) -> Vec<TraceRecord> {
        let mut records = Vec::new();
        while (records.len() as u64) < max_cycles {
            let Some(record) = self.step() else { break };
            let done = record.halted || record.after.at_boundary();
            records.push(record);
            if done {
                break;
            }
        }
        records
    }

    /// Run for at most `max_cycles` cycles, handing every record to `observer`.
    ///
    /// Returns the number of cycles executed and how the run ended.
    pub fn run_with<F>(&mut self, max_cycles: u64, mut observer: F) -> (u64, RunOutcome)
    where
        F: FnMut(&TraceRecord),
    {
        let mut executed = 0;
        while executed < max_cycles {
            match self.step() {
                Some(record) => {
                    executed += 1;
                    observer(&record);
                }
                None => break,
            }
        }

        let outcome = if self.is_halted() {
            log::debug!("halted after {} cycles (pc={:#04x})", self.cycles, self.regs.pc);
            RunOutcome::Halted
        } else {
            log::warn!("no halt within {} cycles", max_cycles);
            RunOutcome::BudgetExhausted
        };
        (executed, outcome)
    }

    /// Run for at most `max_cycles` cycles.
    pub fn run(&mut self, max_cycles: u64) -> RunReport {
        let (cycles, outcome) = self.run_with(max_cycles, |_| {});
        self.report(cycles, outcome)
    }

    fn report(&self, cycles: u64, outcome: RunOutcome) -> RunReport {
        RunReport {
            registers: self.regs,
            memory: self.mem.clone(),
            cycles,
            outcome,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl std::fmt::Debug for Cpu<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Run a memory image from reset for at most `max_cycles` cycles.
pub fn run(memory: Memory, decoder: &DecoderTable, max_cycles: u64) -> RunReport {
    Cpu::new(decoder, memory).run(max_cycles)
}

/// Like [`run`], handing every cycle's record to `observer`.
pub fn run_traced<F>(memory: Memory, decoder: &DecoderTable, max_cycles: u64, observer: F) -> RunReport
where
    F: FnMut(&TraceRecord),
{
    let mut cpu = Cpu::new(decoder, memory);
    let (cycles, outcome) = cpu.run_with(max_cycles, observer);
    cpu.report(cycles, outcome)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cpu::decode::{Opcode, EXTENDED as EXTENDED_SET};
    use proptest::prelude::*;

    fn image(bytes: &[u8]) -> Memory {
        let mut mem = Memory::new();
        mem.load(0, bytes).unwrap();
        mem
    }

    /// Loads, adds and increments in a straight line, closed by `HLT`.
    fn straight_line() -> impl Strategy<Value = Vec<u8>> {
        let instruction = prop_oneof![
            any::<u8>().prop_map(|v| vec![Opcode::Lda.byte(), v]),
            any::<u8>().prop_map(|v| vec![Opcode::Adc.byte(), v]),
            Just(vec![Opcode::Inc.byte()]),
        ];
        prop::collection::vec(instruction, 0..40).prop_map(|program| {
            let mut bytes = program.concat();
            bytes.push(Opcode::Hlt.byte());
            bytes
        })
    }

    proptest! {
        #[test]
        fn random_programs_respect_budget(
            bytes in prop::collection::vec(any::<u8>(), 1..256),
            limit in 0u64..2000
        ) {
            let report = run(image(&bytes), &EXTENDED_SET, limit);
            prop_assert!(report.cycles <= limit);
            if !report.halted() {
                prop_assert_eq!(report.cycles, limit);
            }
        }

        #[test]
        fn random_programs_are_deterministic(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
            let a = run(image(&bytes), &EXTENDED_SET, 500);
            let b = run(image(&bytes), &EXTENDED_SET, 500);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn halted_cpu_never_changes(bytes in straight_line(), extra in 1usize..64) {
            let mut cpu = Cpu::new(&EXTENDED_SET, image(&bytes));
            let report = cpu.run(2000);
            prop_assert!(report.halted());
            let regs = cpu.regs;
            for _ in 0..extra {
                prop_assert!(cpu.step().is_none());
            }
            prop_assert_eq!(cpu.regs, regs);
            prop_assert_eq!(&cpu.mem, &report.memory);
        }

        #[test]
        fn memory_is_never_written(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
            let mem = image(&bytes);
            let report = run(mem.clone(), &EXTENDED_SET, 500);
            prop_assert_eq!(report.memory, mem);
        }

        #[test]
        fn instruction_boundaries_follow_fetch(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
            let mut records = Vec::new();
            run_traced(image(&bytes), &EXTENDED_SET, 300, |r| records.push(r.clone()));
            for r in records
                .iter()
                .filter(|r| r.before.step == 2 && Opcode::from_byte(r.before.ir).is_some())
            {
                prop_assert_eq!(r.after.pc, r.before.pc.wrapping_add(1));
            }
        }
    }
}
