use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::app::Snapshot;
use crate::{DISPLAY_NAME_LEN, MAX_STEPS, NUM_INSTRUMENTS};

const BORDER_COLOR: Color = Color::DarkGray;
const NAME_WIDTH: u16 = DISPLAY_NAME_LEN as u16 + 3;
const HELP: &str =
    " arrows move  space toggle  p/P play/stop  +/- bpm  [/] length  z/x sample  1-4 trigger  c clear  q quit";

pub fn render(snapshot: &Snapshot, f: &mut Frame) {
    let screen = f.area();
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(NUM_INSTRUMENTS as u16 + 3),
            Constraint::Length(1),
        ])
        .horizontal_margin(1)
        .split(screen);

    let area = render_outer_block(f.buffer_mut(), sections[0], Borders::TOP | Borders::BOTTOM);
    render_status_line(snapshot, f, area);

    let area = render_outer_block(f.buffer_mut(), sections[1], Borders::ALL);
    render_grid(snapshot, area, f.buffer_mut());

    let help = Paragraph::new(HELP).style(Style::default().fg(BORDER_COLOR));
    f.render_widget(help, sections[2]);
}

pub fn render_error(message: &str, f: &mut Frame) {
    let block = Block::default()
        .title(" halted ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let text = vec![
        Line::from(Span::styled(message, Style::default().fg(Color::Red))),
        Line::default(),
        Line::from(Span::styled("press q to quit", Style::default().fg(BORDER_COLOR))),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    f.render_widget(paragraph, f.area());
}

fn render_status_line(snapshot: &Snapshot, f: &mut Frame, area: Rect) {
    let playback = &snapshot.playback;
    let position = format!(
        " [ {}/{} ] ",
        playback.current_step() + 1,
        playback.pattern_length()
    );
    f.render_widget(Paragraph::new(position).alignment(Alignment::Left), area);

    let transport = if playback.is_playing() {
        Span::styled("▶ PLAY", Style::default().fg(Color::Blue))
    } else {
        Span::raw("■ STOP")
    };
    f.render_widget(Paragraph::new(transport).alignment(Alignment::Center), area);

    let settings = format!(
        "BPM {}    LEN {}  ",
        playback.bpm(),
        playback.pattern_length()
    );
    f.render_widget(Paragraph::new(settings).alignment(Alignment::Right), area);
}

fn render_grid(snapshot: &Snapshot, area: Rect, buf: &mut Buffer) {
    if area.height == 0 || area.width <= NAME_WIDTH {
        return;
    }
    let length = snapshot.playback.pattern_length();
    let playhead = snapshot
        .playback
        .is_playing()
        .then(|| snapshot.playback.current_step());

    let left = area.left() + NAME_WIDTH;
    let width = area.right().saturating_sub(left);
    let header: Vec<Span> = (0..MAX_STEPS)
        .map(|step| {
            let style = if step >= length {
                Style::default().fg(BORDER_COLOR)
            } else if Some(step) == playhead {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default().fg(Color::Indexed(241))
            };
            Span::styled(format!("{:>2}", step + 1), style)
        })
        .collect();
    buf.set_line(left, area.top(), &Line::from(header), width);

    for track in 0..NUM_INSTRUMENTS {
        let y = area.top() + 1 + track as u16;
        if y >= area.bottom() {
            break;
        }

        let marker = if snapshot.activity.is_active(track) {
            Span::styled("●", Style::default().fg(Color::Green))
        } else {
            Span::raw(" ")
        };
        let name_style = if snapshot.cursor.row == track {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let name = Line::from(vec![
            marker,
            Span::raw(" "),
            Span::styled(
                format!("{:w$}", snapshot.track_names[track], w = DISPLAY_NAME_LEN),
                name_style,
            ),
        ]);
        buf.set_line(area.left(), y, &name, NAME_WIDTH);

        let steps: Vec<Span> = (0..MAX_STEPS)
            .map(|step| {
                let on = snapshot.pattern.step(track, step);
                let symbol = if on { " x" } else { " ." };
                let style = if snapshot.cursor.row == track && snapshot.cursor.col == step {
                    Style::default().bg(Color::Green).fg(Color::Black)
                } else if step >= length {
                    Style::default().fg(BORDER_COLOR)
                } else if Some(step) == playhead {
                    if on {
                        Style::default().bg(Color::Blue).fg(Color::White)
                    } else {
                        Style::default().bg(Color::Indexed(236))
                    }
                } else if on {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                Span::styled(symbol, style)
            })
            .collect();
        buf.set_line(left, y, &Line::from(steps), width);
    }
}

fn render_outer_block(buffer: &mut Buffer, area: Rect, borders: Borders) -> Rect {
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(BORDER_COLOR));
    let inner = block.inner(area);
    block.render(area, buffer);
    inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Activity;
    use crate::pattern::{Cursor, Pattern};
    use crate::seq::PlaybackState;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn snapshot() -> Snapshot {
        Snapshot {
            pattern: Pattern::with_default_groove(),
            cursor: Cursor { row: 1, col: 2 },
            playback: PlaybackState::default(),
            track_names: [
                "kick".to_string(),
                "snare".to_string(),
                "hat".to_string(),
                "4".to_string(),
            ],
            track_slots: [0, 1, 2, 3],
            activity: Activity::default(),
        }
    }

    fn lines(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn renders_grid_and_status() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let snapshot = snapshot();
        terminal.draw(|f| render(&snapshot, f)).unwrap();
        let lines = lines(&terminal);

        assert!(lines[1].contains("BPM 120"));
        assert!(lines[1].contains("STOP"));
        let kick = lines.iter().find(|l| l.contains("kick")).unwrap();
        assert!(kick.contains(" x . . . x . . ."));
        let hat = lines.iter().find(|l| l.contains("hat")).unwrap();
        assert!(hat.contains(" x x x x x x x x"));
        assert!(lines.iter().any(|l| l.contains(" 1 2 3 4 5 6 7 8")));
    }

    #[test]
    fn small_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(12, 4)).unwrap();
        let snapshot = snapshot();
        terminal.draw(|f| render(&snapshot, f)).unwrap();
    }

    #[test]
    fn renders_error_screen() {
        let mut terminal = Terminal::new(TestBackend::new(50, 8)).unwrap();
        terminal
            .draw(|f| render_error("no .wav files found in /media", f))
            .unwrap();
        let lines = lines(&terminal);
        assert!(lines.iter().any(|l| l.contains("no .wav files found")));
        assert!(lines.iter().any(|l| l.contains("press q to quit")));
    }
}
