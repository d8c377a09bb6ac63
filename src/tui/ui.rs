//! UI rendering for the debugger.

use super::app::DebuggerApp;
use crate::cpu::{ControlLine, ControlWord};
use crate::trace::opcode_name;
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(frame.area());

    // Left side: code, registers, control lines, trace, status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(6),
            Constraint::Length(4),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_control_lines(frame, left_chunks[2], app);
    draw_trace(frame, left_chunks[3], app);
    draw_status(frame, left_chunks[4], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(4)])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw disassembly view around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:03}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// Draw register state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("PC:  "),
            Span::styled(format!("{:3}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   MAR: "),
            Span::styled(format!("{:3}", regs.mar), value),
            Span::raw("   IR: "),
            Span::styled(format!("{:08b}", regs.ir), value),
            Span::raw(format!(" ({})", opcode_name(regs.ir))),
        ]),
        Line::from(vec![
            Span::raw("ACC: "),
            Span::styled(format!("{:3}", regs.acc), value),
            Span::raw("   BUS: "),
            Span::styled(format!("{:08b}", regs.bus), value),
            Span::raw("   ZF: "),
            Span::styled(
                format!("{}", regs.zf_bit()),
                if regs.zf {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ),
        ]),
        Line::from(vec![
            Span::raw("Step: "),
            Span::styled(format!("T{}", regs.step), Style::default().fg(Color::Cyan)),
            Span::raw("   Cycles: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(
                format!("{:?}", app.cpu.state),
                if app.cpu.is_running() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                },
            ),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Draw the control lines: last applied word and the next one.
fn draw_control_lines(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let content = vec![
        control_line_row("last ", app.cpu.last_control()),
        control_line_row("next ", app.cpu.next_control()),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Control Lines ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    frame.render_widget(paragraph, area);
}

fn control_line_row(label: &'static str, word: ControlWord) -> Line<'static> {
    let mut spans = vec![Span::raw(label)];
    for line in ControlLine::ALL {
        let style = if word.asserts(line) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(line.mnemonic(), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

/// Draw the most recent trace lines.
fn draw_trace(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible = (area.height as usize).saturating_sub(2);
    let skip = app.trace.len().saturating_sub(visible);
    let items: Vec<ListItem> = app
        .trace
        .iter()
        .skip(skip)
        .map(|line| ListItem::new(line.clone()))
        .collect();

    let list = List::new(items).block(Block::default().title(" Trace ").borders(Borders::ALL));

    frame.render_widget(list, area);
}

/// Draw memory view, eight cells per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let pc = app.cpu.regs.pc;
    let mar = app.cpu.regs.mar;

    let items: Vec<ListItem> = (app.mem_scroll..32)
        .take(visible_rows)
        .map(|row| {
            let base = (row * 8) as u8;
            let mut spans = vec![Span::raw(format!("{:02x}: ", base))];
            for (addr, value) in app.cpu.mem.dump(base, 8) {
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if addr == mar {
                    Style::default().fg(Color::Cyan)
                } else if app.cpu.mem.is_set(addr) {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02x} ", value), style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Cycle  i: Instruction  r: Run  p: Pause"),
        Line::from("b: Breakpoint  x: Reset  ↑↓: Scroll  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}
