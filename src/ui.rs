//! Layout and drawing: playfield, sidebar, pause and game-over overlays.

use crate::app::Screen;
use crate::game::{SimState, Simulation};
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Smallest grid we will shrink to when the terminal is tiny.
pub const MIN_GRID_SIZE: u16 = 4;
/// Largest grid accepted on the command line.
pub const MAX_GRID_SIZE: u16 = 1024;

const SIDEBAR_WIDTH: u16 = 24;
/// Piece (6) + gap + Sand (7) + gap + Keys (6).
const SIDEBAR_HEIGHT: u16 = 21;

/// Duration of the game-over flash (TachyonFX fade from title colour back to the board).
const GAME_OVER_FADE_MS: u32 = 800;

/// Board size in terminal cells (border included). Two grid rows per terminal row.
fn board_outer_size(width: u16, height: u16) -> (u16, u16) {
    (width + 2, height.div_ceil(2) + 2)
}

/// Max grid size (width, height) in cells that fits the given terminal next to the sidebar.
pub fn max_grid_for_terminal(term_cols: u16, term_rows: u16) -> (u16, u16) {
    let width = term_cols.saturating_sub(2).saturating_sub(SIDEBAR_WIDTH);
    let height = term_rows.saturating_sub(2).saturating_mul(2);
    (width, height)
}

/// Draw the current screen. On game over the board stays visible under an overlay;
/// unless `no_animation`, a TachyonFX flash is created once and processed each frame.
pub fn draw(
    frame: &mut Frame,
    sim: &Simulation,
    theme: &Theme,
    screen: Screen,
    paused: bool,
    game_over_effect: &mut Option<Effect>,
    game_over_effect_time: &mut Option<Instant>,
    no_animation: bool,
    now: Instant,
) {
    let area = frame.area();
    let (playfield_area, sidebar_area) = game_layout(area, sim);
    draw_playfield(frame.buffer_mut(), sim, theme, playfield_area);
    draw_sidebar(frame.buffer_mut(), sim, theme, sidebar_area);
    match screen {
        Screen::Playing => {
            if paused {
                draw_pause_overlay(frame.buffer_mut(), theme, area);
            }
        }
        Screen::GameOver => {
            if !no_animation {
                let board = Block::default().borders(Borders::ALL).inner(playfield_area);
                apply_game_over_effect(frame, theme, board, game_over_effect, game_over_effect_time, now);
            }
            draw_game_over(frame.buffer_mut(), sim, theme, area);
        }
    }
}

/// Playfield + sidebar, centred in `area`.
fn game_layout(area: Rect, sim: &Simulation) -> (Rect, Rect) {
    let grid = sim.grid();
    let (pw, ph) = board_outer_size(grid.width() as u16, grid.height() as u16);
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(SIDEBAR_HEIGHT);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let playfield = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (playfield, inner[1])
}

/// Colour of one grid cell: the falling piece wins over sand, sand over background.
fn cell_color(sim: &Simulation, theme: &Theme, col: usize, row: usize) -> Color {
    let piece = sim.piece();
    if !sim.is_game_over() && piece.covers(col as i32, row as i32) {
        return piece.color;
    }
    sim.particle_color(col, row).unwrap_or(theme.bg)
}

fn draw_playfield(buf: &mut Buffer, sim: &Simulation, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Sandfall ", theme.title));
    let board = block.inner(area);
    block.render(area, buf);

    let grid = sim.grid();
    let (gw, gh) = (grid.width(), grid.height());
    // Upper half-block: fg is the even row, bg the odd row below it.
    for row in (0..gh).step_by(2) {
        for col in 0..gw {
            let top = cell_color(sim, theme, col, row);
            let bottom = if row + 1 < gh {
                cell_color(sim, theme, col, row + 1)
            } else {
                theme.bg
            };
            let (x, y) = (board.x + col as u16, board.y + (row / 2) as u16);
            if x < board.right() && y < board.bottom() {
                buf[(x, y)]
                    .set_symbol("▀")
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
}

fn section(buf: &mut Buffer, theme: &Theme, area: Rect, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {title} "), theme.title));
    let inner = block.inner(area);
    block.render(area, buf);
    inner
}

fn draw_sidebar(buf: &mut Buffer, sim: &Simulation, theme: &Theme, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Piece (border + 4 preview rows)
            Constraint::Length(1), // gap
            Constraint::Length(7), // Sand (border + 5 lines)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Keys (border + 4 lines)
        ])
        .split(area);

    let piece_inner = section(buf, theme, chunks[0], "Piece");
    draw_piece_preview(buf, sim.piece(), piece_inner);

    let sand_inner = section(buf, theme, chunks[2], "Sand");
    let label = Style::default().fg(theme.title);
    let value = Style::default().fg(theme.main_fg);
    let total = sim.particles().len();
    let settled = sim.settled_count();
    let stat = |name: &'static str, n: String| {
        Line::from(vec![Span::styled(name, label), Span::styled(n, value)])
    };
    let state = match sim.state() {
        SimState::Running => "running",
        SimState::GameOver => "game over",
    };
    Paragraph::new(vec![
        stat("Grains:  ", total.to_string()),
        stat("Settled: ", settled.to_string()),
        stat("Falling: ", (total - settled).to_string()),
        stat("Tick:    ", sim.tick_count().to_string()),
        stat("State:   ", state.to_string()),
    ])
    .render(sand_inner, buf);

    let keys_inner = section(buf, theme, chunks[4], "Keys");
    let hint = Style::default().fg(theme.inactive_fg);
    Paragraph::new(vec![
        Line::from(Span::styled("←/h  →/l  move", hint)),
        Line::from(Span::styled("↓/j       drop", hint)),
        Line::from(Span::styled("p pause   q quit", hint)),
        Line::from(Span::styled("r restart (game over)", hint)),
    ])
    .render(keys_inner, buf);
}

/// Current shape, two terminal columns per grid cell.
fn draw_piece_preview(buf: &mut Buffer, piece: &Piece, area: Rect) {
    let style = Style::default().fg(piece.color);
    for (dcol, drow) in piece.offsets {
        let x = area.x + 1 + (dcol as u16) * 2;
        let y = area.y + drow as u16;
        if x + 1 < area.right() && y < area.bottom() {
            buf.set_string(x, y, "██", style);
        }
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(buf: &mut Buffer, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(Span::styled(
            " P Resume    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, buf);
}

fn draw_game_over(buf: &mut Buffer, sim: &Simulation, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 30, 8);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Grains: {} ", sim.particles().len()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            " R Restart    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Sandfall ", theme.title)),
        )
        .render(popup, buf);
}

/// Create the game-over flash on first call and advance it by the time since the last frame.
fn apply_game_over_effect(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *process_time = Some(now);

    let effect = effect.get_or_insert_with(|| {
        fx::fade_from(theme.title, theme.bg, (GAME_OVER_FADE_MS, Interpolation::Linear))
            .with_area(board)
    });
    frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{ShapeSet, TetrominoKind};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[derive(Debug)]
    struct Always(TetrominoKind);

    impl crate::piece::ShapeSource for Always {
        fn next_kind(&mut self) -> TetrominoKind {
            self.0
        }
    }

    fn render(sim: &Simulation, screen: Screen, paused: bool) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(60, 24)).unwrap();
        let mut effect = None;
        let mut effect_time = None;
        terminal
            .draw(|f| {
                draw(
                    f,
                    sim,
                    &Theme::default(),
                    screen,
                    paused,
                    &mut effect,
                    &mut effect_time,
                    true,
                    Instant::now(),
                );
            })
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn board_origin(sim: &Simulation) -> (u16, u16) {
        let (playfield, _) = game_layout(Rect::new(0, 0, 60, 24), sim);
        (playfield.x + 1, playfield.y + 1)
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_max_grid_for_terminal() {
        assert_eq!(max_grid_for_terminal(80, 24), (54, 44));
        assert_eq!(max_grid_for_terminal(10, 1), (0, 0));
    }

    #[test]
    fn test_board_outer_size_rounds_odd_heights_up() {
        assert_eq!(board_outer_size(10, 30), (12, 17));
        assert_eq!(board_outer_size(10, 5), (12, 5));
    }

    #[test]
    fn test_piece_and_sand_drawn_as_half_blocks() {
        let mut sim = Simulation::new(8, 8, ShapeSet::default(), Box::new(Always(TetrominoKind::O)));
        sim.add_particle(0, 7, Color::Rgb(1, 2, 3));
        let buf = render(&sim, Screen::Playing, false);
        let (x0, y0) = board_origin(&sim);

        // O piece at col 2..=3, rows 0..=1: both halves of the first terminal row.
        let cell = &buf[(x0 + 2, y0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 255, 0));
        assert_eq!(cell.bg, Color::Rgb(255, 255, 0));

        // Grain on row 7 is the lower half of terminal row 3.
        let cell = &buf[(x0, y0 + 3)];
        assert_eq!(cell.fg, Color::Rgb(0, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(1, 2, 3));
    }

    #[test]
    fn test_pause_overlay_shown() {
        let sim = Simulation::new(8, 8, ShapeSet::default(), Box::new(Always(TetrominoKind::I)));
        assert!(!buffer_text(&render(&sim, Screen::Playing, false)).contains("Paused"));
        assert!(buffer_text(&render(&sim, Screen::Playing, true)).contains("Paused"));
    }

    #[test]
    fn test_game_over_overlay_shown() {
        let mut sim = Simulation::new(8, 8, ShapeSet::default(), Box::new(Always(TetrominoKind::I)));
        while !sim.is_game_over() {
            sim.tick();
        }
        let text = buffer_text(&render(&sim, Screen::GameOver, false));
        assert!(text.contains("Game Over"));
        assert!(text.contains(&format!("Grains: {}", sim.particles().len())));
        // Sidebar reports the state on its own, without the overlay.
        let text = buffer_text(&render(&sim, Screen::Playing, false));
        assert!(text.contains("game over"));
        assert!(!text.contains("Game Over"));
    }
}
