//! Plain terminal dashboard.
//!
//! Redraws the whole frame on every tick with crossterm commands: clear the
//! screen, move the cursor home, print, flush.

use std::io::Write;

use crossterm::{
    cursor::{MoveTo, MoveToNextLine},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use super::{node_header, node_line, overview_lines, Dashboard};
use crate::data::FleetFrame;

/// Dashboard that writes plain text to any writer.
#[derive(Debug)]
pub struct PlainDashboard<W: Write> {
    out: W,
}

impl<W: Write> PlainDashboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> std::io::Result<()> {
        queue!(self.out, Print(text), MoveToNextLine(1))
    }
}

impl<W: Write + Send> Dashboard for PlainDashboard<W> {
    fn draw(&mut self, frame: &FleetFrame) -> std::io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;

        for (label, value) in overview_lines(frame) {
            self.line(&format!("{:<23}:  {}", label, value))?;
        }
        self.line("")?;
        self.line(&node_header())?;
        for row in &frame.nodes {
            self.line(&node_line(row))?;
        }

        self.out.flush()
    }
}
