use anyhow::{Result, bail};
use tracing::info;

pub const LINES: usize = 2;

/// A two-line character display.
pub trait Display {
    /// Replaces `line` (0 or 1) with `text`.
    fn show(&mut self, line: usize, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// The characters currently on the panel, cut to the panel width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    rows: [String; LINES],
    width: usize,
}

impl LineBuffer {
    pub fn new(width: usize) -> Self {
        Self {
            rows: Default::default(),
            width: width.max(1),
        }
    }

    pub fn set(&mut self, line: usize, text: &str) -> Result<()> {
        let Some(row) = self.rows.get_mut(line) else {
            bail!("display line {line} out of range (panel has {LINES} lines)");
        };
        *row = truncate_chars(text, self.width);
        Ok(())
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
    }

    pub fn row(&self, line: usize) -> &str {
        self.rows.get(line).map(String::as_str).unwrap_or_default()
    }

    pub fn rows(&self) -> &[String; LINES] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

pub fn truncate_chars(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Full-screen terminal panel drawn with ratatui.
pub struct TerminalDisplay {
    terminal: crate::ui::PanelTerminal,
    buffer: LineBuffer,
}

impl TerminalDisplay {
    pub fn new(terminal: crate::ui::PanelTerminal, width: usize) -> Self {
        Self {
            terminal,
            buffer: LineBuffer::new(width),
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let buffer = &self.buffer;
        self.terminal
            .draw(|frame| crate::ui::draw_panel(frame, buffer))?;
        Ok(())
    }

    pub fn into_terminal(self) -> crate::ui::PanelTerminal {
        self.terminal
    }
}

impl Display for TerminalDisplay {
    fn show(&mut self, line: usize, text: &str) -> Result<()> {
        self.buffer.set(line, text)?;
        self.redraw()
    }

    fn clear(&mut self) -> Result<()> {
        self.buffer.clear();
        self.redraw()
    }
}

/// Writes every panel change to the log instead of a screen.
#[derive(Debug, Clone)]
pub struct LogDisplay {
    buffer: LineBuffer,
}

impl LogDisplay {
    pub fn new(width: usize) -> Self {
        Self {
            buffer: LineBuffer::new(width),
        }
    }
}

impl Display for LogDisplay {
    fn show(&mut self, line: usize, text: &str) -> Result<()> {
        self.buffer.set(line, text)?;
        info!(line, text = self.buffer.row(line), "display");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.buffer.clear();
        info!("display cleared");
        Ok(())
    }
}
