//! Full-screen ratatui dashboard.

use ratatui::{
    backend::Backend,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

use super::{node_label, overview_lines, Dashboard, Theme};
use crate::data::FleetFrame;

/// Overview lines plus the block border.
const OVERVIEW_HEIGHT: u16 = 10;

/// Dashboard drawn through a ratatui [`Terminal`].
#[derive(Debug)]
pub struct TerminalDashboard<B: Backend> {
    terminal: Terminal<B>,
    theme: Theme,
}

impl<B: Backend> TerminalDashboard<B> {
    pub fn new(backend: B, theme: Theme) -> std::io::Result<Self> {
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(Self { terminal, theme })
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend + Send> Dashboard for TerminalDashboard<B> {
    fn draw(&mut self, frame: &FleetFrame) -> std::io::Result<()> {
        let theme = &self.theme;
        self.terminal.draw(|f| render(f, frame, theme))?;
        Ok(())
    }
}

/// Render one fleet frame.
pub fn render(f: &mut Frame, frame: &FleetFrame, theme: &Theme) {
    let chunks = Layout::vertical([
        Constraint::Length(1),              // Header bar
        Constraint::Length(OVERVIEW_HEIGHT), // Fleet overview
        Constraint::Min(3),                 // Node table
    ])
    .split(f.area());

    render_header(f, frame, chunks[0]);
    render_overview(f, frame, theme, chunks[1]);
    render_nodes(f, frame, theme, chunks[2]);
}

fn render_header(f: &mut Frame, frame: &FleetFrame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" TELEMATICS ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("│ {} nodes reporting │ q: quit", frame.nodes.len())),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_overview(f: &mut Frame, frame: &FleetFrame, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = overview_lines(frame)
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<23}: ", label), theme.label),
                Span::styled(value, Style::default().fg(theme.highlight)),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Overall ")
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.border));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_nodes(f: &mut Frame, frame: &FleetFrame, theme: &Theme, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Node"),
        Cell::from("Class"),
        Cell::from("Depth"),
        Cell::from("Propose(id)"),
        Cell::from("Sign(id)"),
        Cell::from("Submit(id)"),
    ])
    .height(1)
    .style(theme.header);

    let rows: Vec<Row> = frame
        .nodes
        .iter()
        .map(|n| {
            Row::new(vec![
                Cell::from(node_label(n)).style(theme.node_style(n.leader)),
                Cell::from(n.class.map(|c| c.label()).unwrap_or("-"))
                    .style(theme.class_style(n.class)),
                Cell::from(n.chain_depth.to_string()),
                Cell::from(n.propose_block.to_string()),
                Cell::from(n.sign_block.to_string()),
                Cell::from(n.submit_block.to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(18),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" Nodes ")
            .borders(Borders::ALL)
            .border_type(theme.border_type)
            .border_style(Style::default().fg(theme.border)),
    );

    f.render_widget(table, area);
}
