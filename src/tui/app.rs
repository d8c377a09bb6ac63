//! Debugger application state and logic.

use crate::asm::disasm::disassemble_instruction;
use crate::cpu::decode::EXTENDED;
use crate::cpu::{Cpu, Memory, TraceRecord};
use crate::trace::format_record;
use std::collections::{HashSet, VecDeque};

/// Number of trace lines kept for display.
const TRACE_DEPTH: usize = 64;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu<'static>,
    /// Original memory image for reset.
    pub program: Memory,
    /// Breakpoints (by instruction address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
    /// Most recent cycles, newest last.
    pub trace: VecDeque<String>,
}

impl DebuggerApp {
    /// Create a new debugger over a memory image.
    pub fn new(program: Memory) -> Self {
        Self {
            cpu: Cpu::new(&EXTENDED, program.clone()),
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. 's' cycle, 'i' instruction, 'r' run, 'q' quit.".into(),
            mem_scroll: 0,
            trace: VecDeque::with_capacity(TRACE_DEPTH),
        }
    }

    fn record(&mut self, record: &TraceRecord) {
        if self.trace.len() == TRACE_DEPTH {
            self.trace.pop_front();
        }
        self.trace.push_back(format_record(record));
    }

    /// Step one clock cycle.
    pub fn step(&mut self) {
        match self.cpu.step() {
            Some(record) => {
                self.record(&record);
                self.status = format!("Cycle {}: {}", record.cycle, record.control);
                if record.halted {
                    self.running = false;
                    self.status = format!("Halted after {} cycles", self.cpu.cycles);
                }
            }
            None => {
                self.running = false;
                self.status = format!("CPU halted: {:?}", self.cpu.state);
            }
        }
    }

    /// Step to the end of the current instruction.
    pub fn step_instruction(&mut self) {
        let pc = self.cpu.regs.pc;
        // bounded so an undefined opcode cannot hang the UI
        let records = self.cpu.step_instruction(256);
        for record in &records {
            self.record(record);
        }
        self.status = if self.cpu.is_halted() {
            format!("Halted after {} cycles", self.cpu.cycles)
        } else {
            format!("PC={:03}: {} cycles", pc, records.len())
        };
    }

    /// Run until halt or breakpoint.
    pub fn run(&mut self) {
        if self.cpu.is_halted() {
            self.status = "CPU halted. Press 'x' to reset.".into();
            return;
        }
        self.running = true;
        self.status = "Running...".into();
        // move off a breakpoint we are parked on
        self.step();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let pc = self.cpu.regs.pc;
        if self.cpu.regs.at_boundary() && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.cpu.reset(self.program.clone());
        self.trace.clear();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Get disassembly starting a little before the PC.
    ///
    /// Decoding starts from address 0 so operand bytes are not shown as
    /// instructions.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u8, String, bool)> {
        let pc = self.cpu.regs.pc;
        let mut listing = Vec::new();
        let mut addr = 0usize;
        while addr <= u8::MAX as usize {
            let (text, len) = disassemble_instruction(&self.cpu.mem, addr as u8);
            listing.push((addr as u8, text, addr == pc as usize));
            addr += len;
        }

        let current = listing.iter().position(|(_, _, cur)| *cur).unwrap_or(0);
        let start = current.saturating_sub(lines / 2);
        listing.into_iter().skip(start).take(lines).collect()
    }
}

/// Run the debugger with a memory image.
pub fn run_debugger(program: Memory) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('i') => {
                            app.running = false;
                            app.step_instruction();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.mem_scroll < 31 {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
