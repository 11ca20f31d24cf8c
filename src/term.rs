use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use crossterm::event::{poll, read, Event, KeyEvent};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, terminal};

use crate::snake::{Moved, Position};
use crate::session::{RunState, Snapshot};

pub type TermInt = u16;
pub type Coords = (TermInt, TermInt);

const EMPTY_CELL: &str = "  ";
const SNAKE_BODY_CELL: &str = "██";
const FOOD_CELL: &str = "()";
const DEAD_SNAKE_CELL: &str = "XX";

const BORDER_COLOR: Color = Color::DarkGrey;
const SNAKE_COLOR: Color = Color::DarkGreen;
const HEAD_COLOR: Color = Color::Green;
const FOOD_COLOR: Color = Color::Red;
const TEXT_COLOR: Color = Color::White;

/// Widest overlay line plus padding, so overlays always fit on screen.
const MIN_WIDTH: TermInt = 30;

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    color: Color,
}

const BLANK: Cell = Cell { ch: ' ', color: Color::Reset };

pub struct TermManager {
    width: TermInt,
    height: TermInt,
    grid: TermInt,
    stdout: Stdout,
    screen: Vec<Cell>,
    current_msg: Option<Message>,
}

struct Message {
    top_left: Coords,
    width: TermInt,
    height: TermInt,
}

/// Terminal size needed for a board of `grid` cells per side and its status line.
pub fn required_size(grid: TermInt) -> Coords {
    ((grid * 2 + 2).max(MIN_WIDTH), grid + 3)
}

impl TermManager {
    pub fn new(grid: TermInt) -> crossterm::Result<Self> {
        let (width, height) = terminal::size()?;
        let screen = vec![BLANK; width as usize * height as usize];
        Ok(TermManager { width, height, grid, stdout: stdout(), screen, current_msg: None })
    }

    pub fn get_terminal_size(&self) -> Coords {
        (self.width, self.height)
    }

    pub fn setup(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking)
    }

    pub fn restore(&mut self) -> crossterm::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.stdout, ResetColor, cursor::Show, cursor::EnableBlinking)?;
        execute!(self.stdout, LeaveAlternateScreen)
    }

    /// Key events that arrived within `timeout`, draining anything queued behind them.
    pub fn read_key_events(&self, timeout: Duration) -> crossterm::Result<Vec<KeyEvent>> {
        let mut events = vec![];
        let mut wait = timeout;

        while poll(wait)? {
            if let Event::Key(ev) = read()? {
                events.push(ev);
            }
            wait = Duration::from_millis(0);
        }

        Ok(events)
    }

    ///////////////////////////////////////////////////////////////////////////
    // Board

    /// Full redraw: border, background, food, snake and status line.
    pub fn draw_board(&mut self, snap: &Snapshot) -> crossterm::Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All))?;
        self.screen = vec![BLANK; self.width as usize * self.height as usize];
        self.current_msg = None;

        self.draw_borders()?;
        self.draw_food(snap.food)?;

        for (i, pos) in snap.snake.body().enumerate() {
            if i == 0 {
                self.draw_head(*pos, snap)?;
            } else {
                self.draw_cell(*pos, SNAKE_BODY_CELL, SNAKE_COLOR)?;
            }
        }

        self.draw_status(snap)?;
        self.flush()
    }

    /// Redraws only the cells one move touched.
    pub fn draw_move(&mut self, mov: &Moved, snap: &Snapshot) -> crossterm::Result<()> {
        self.draw_cell(mov.old_head, SNAKE_BODY_CELL, SNAKE_COLOR)?;

        if let Some(old_tail) = mov.old_tail {
            self.draw_cell(old_tail, EMPTY_CELL, Color::Reset)?;
        }

        self.draw_head(mov.new_head, snap)?;
        self.draw_food(snap.food)?;
        self.draw_status(snap)?;
        self.flush()
    }

    /// Marks the snake as dead in place.
    pub fn draw_crash(&mut self, snap: &Snapshot) -> crossterm::Result<()> {
        for pos in snap.snake.body() {
            self.draw_cell(*pos, DEAD_SNAKE_CELL, FOOD_COLOR)?;
        }
        self.draw_status(snap)?;
        self.flush()
    }

    /// The overlay matching the run state, if it has one.
    pub fn draw_overlay(&mut self, snap: &Snapshot) -> crossterm::Result<()> {
        match snap.state {
            RunState::NotStarted => self.show_message(&[
                "SNAKE",
                "",
                "Arrow keys or WASD to move",
                "Space to pause",
                "q or Ctrl+C to quit",
                "",
                "Press Enter to start",
            ]),
            RunState::Paused => self.show_message(&["Paused", "Press Space to resume"]),
            RunState::Over => {
                let title = match snap.collision {
                    Some(c) if c.is_win() => "You filled the board!",
                    _ => "Game over!",
                };
                let score = format!("Score: {}", snap.score);
                let best = if snap.new_high_score {
                    "New high score!".to_string()
                } else {
                    format!("High score: {}", snap.high_score)
                };

                self.show_message(&[
                    title,
                    &score,
                    &best,
                    "",
                    "Press Enter to play again,",
                    "or q to quit.",
                ])
            }
            RunState::Running => self.hide_message(),
        }
    }

    fn draw_borders(&mut self) -> crossterm::Result<()> {
        let width = self.grid * 2 + 2;
        let height = self.grid + 2;
        let end_x = width - 1;
        let end_y = height - 1;

        for x in 0..width {
            let ch = if x == 0 || x == end_x { '+' } else { '-' };
            self.print_at((x, 0), ch, BORDER_COLOR)?;
            self.print_at((x, end_y), ch, BORDER_COLOR)?;
        }

        for y in 1..end_y {
            self.print_at((0, y), '|', BORDER_COLOR)?;
            self.print_at((end_x, y), '|', BORDER_COLOR)?;
        }

        Ok(())
    }

    fn draw_status(&mut self, snap: &Snapshot) -> crossterm::Result<()> {
        let line = format!("Score: {:<6} High score: {}", snap.score, snap.high_score);
        let padded = format!("{:<width$}", line, width = (self.grid * 2 + 2) as usize);
        let y = self.grid + 2;

        for (x, ch) in padded.chars().enumerate() {
            self.print_at((x as TermInt, y), ch, TEXT_COLOR)?;
        }
        Ok(())
    }

    fn draw_head(&mut self, pos: Position, snap: &Snapshot) -> crossterm::Result<()> {
        let glyph: String = [snap.snake.head_char(); 2].iter().collect();
        self.draw_cell(pos, &glyph, HEAD_COLOR)
    }

    fn draw_food(&mut self, pos: Position) -> crossterm::Result<()> {
        self.draw_cell(pos, FOOD_CELL, FOOD_COLOR)
    }

    /// Grid cells are two columns wide so they look square.
    fn draw_cell(&mut self, pos: Position, glyph: &str, color: Color) -> crossterm::Result<()> {
        if !pos.within(self.grid as i32) {
            return Ok(());
        }

        let x = 1 + pos.x as TermInt * 2;
        let y = 1 + pos.y as TermInt;
        for (i, ch) in glyph.chars().take(2).enumerate() {
            self.print_at((x + i as TermInt, y), ch, color)?;
        }
        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////////
    // Messages

    pub fn show_message(&mut self, lines: &[&str]) -> crossterm::Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as TermInt;
        let center = (self.grid + 1, (self.grid + 2) / 2);
        let top_left = (
            center.0.saturating_sub(msg_width / 2),
            center.1.saturating_sub(msg_height / 2),
        );

        // Print the top and bottom empty lines
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, *y), ' ')?;
            }
        }

        // Print the message lines
        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as TermInt + 1;
            for (x_diff, ch) in padded_line.chars().enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as TermInt, y), ch)?;
            }
        }

        self.current_msg = Some(Message::new(msg_width, msg_height, top_left));
        self.flush()
    }

    pub fn hide_message(&mut self) -> crossterm::Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };
        let top_left = msg.top_left();

        // Restore the content from the screen buffer
        for y_diff in 0..msg.height() {
            for x_diff in 0..msg.width() {
                let (x, y) = (top_left.0 + x_diff, top_left.1 + y_diff);
                if let Some(cell) = self.cell_at((x, y)) {
                    queue!(
                        self.stdout,
                        cursor::MoveTo(x, y),
                        SetForegroundColor(cell.color),
                        Print(cell.ch)
                    )?;
                }
            }
        }

        self.flush()
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    pub fn flush(&mut self) -> crossterm::Result<()> {
        queue!(self.stdout, ResetColor)?;
        self.stdout.flush()?;
        Ok(())
    }

    ///////////////////////////////////////////////////////////////////////////

    fn print_at(&mut self, pos: Coords, ch: char, color: Color) -> crossterm::Result<()> {
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), SetForegroundColor(color), Print(ch))?;

        if let Some(idx) = self.index(pos) {
            self.screen[idx] = Cell { ch, color };
        }
        Ok(())
    }

    fn print_at_no_save(&mut self, pos: Coords, ch: char) -> crossterm::Result<()> {
        // Messages skip the buffer so hiding them can restore what was underneath
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), SetForegroundColor(TEXT_COLOR), Print(ch))
    }

    fn cell_at(&self, pos: Coords) -> Option<Cell> {
        self.index(pos).map(|idx| self.screen[idx])
    }

    fn index(&self, pos: Coords) -> Option<usize> {
        if pos.0 < self.width && pos.1 < self.height {
            Some(self.width as usize * pos.1 as usize + pos.0 as usize)
        } else {
            None
        }
    }
}

impl Message {
    pub fn new(width: TermInt, height: TermInt, top_left: Coords) -> Self {
        Message { width, height, top_left }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn top_left(&self) -> Coords {
        self.top_left
    }
}
