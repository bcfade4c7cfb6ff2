use crate::display::LineBuffer;
use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::io::{Stdout, stdout};

pub type PanelTerminal = Terminal<CrosstermBackend<Stdout>>;

const KEY_HELP: &str = "space pause  n next  b previous  i artist/album  q quit";

const PANEL_BG: Color = Color::Rgb(18, 38, 20);
const PANEL_TEXT: Color = Color::Rgb(170, 255, 120);
const BORDER: Color = Color::Rgb(70, 110, 70);
const MUTED: Color = Color::Rgb(128, 140, 150);

pub fn enter_terminal() -> Result<PanelTerminal> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut PanelTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Draws the two display rows in a bordered box sized to the panel width,
/// with the key help underneath.
pub fn draw_panel(frame: &mut Frame, buffer: &LineBuffer) {
    let area = frame.area();
    let panel_width = u16::try_from(buffer.width() + 2).unwrap_or(u16::MAX);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(panel_width), Constraint::Min(0)])
        .split(vertical[0]);

    let rows: Vec<Line> = buffer
        .rows()
        .iter()
        .map(|row| Line::from(Span::styled(row.clone(), Style::default().fg(PANEL_TEXT))))
        .collect();
    let panel = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER))
            .style(Style::default().bg(PANEL_BG)),
    );
    frame.render_widget(panel, horizontal[0]);

    let help = Paragraph::new(Span::styled(KEY_HELP, Style::default().fg(MUTED)));
    frame.render_widget(help, vertical[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn rendered_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn panel_shows_both_rows_and_key_help() {
        let mut buffer = LineBuffer::new(16);
        buffer.set(0, "♪Blue in Green").expect("set");
        buffer.set(1, "Miles Davis").expect("set");

        let mut terminal = Terminal::new(TestBackend::new(80, 8)).expect("terminal");
        terminal
            .draw(|frame| draw_panel(frame, &buffer))
            .expect("draw");

        let text = rendered_text(&terminal);
        assert!(text.contains("Blue in Green"));
        assert!(text.contains("Miles Davis"));
        assert!(text.contains("n next"));
    }
}
