use std::{io::{Stdout, Write, stdout}, time::Duration};

use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::event::{Event, KeyEvent, read, poll};
use crossterm::style::Color;
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use log::error;

use crate::config::{COLUMNS, DOT_SIZE, ROWS};
use crate::render::Render;
use crate::Coords;

pub type TermInt = u16;
pub type TermPos = (TermInt, TermInt);

/// Each grid cell is two characters wide so the field looks square.
const CELL_WIDTH: TermInt = 2;
const HUD_ROW: TermInt = 0;
const BOARD_TOP: TermInt = 1;

pub const BOARD_WIDTH: TermInt = COLUMNS as TermInt * CELL_WIDTH + 2;
pub const BOARD_HEIGHT: TermInt = ROWS as TermInt + 2;

const BODY_CHAR: char = '█';
const FOOD_CHAR: char = '●';
const BODY_COLOR: Color = Color::Green;
const HEAD_COLOR: Color = Color::DarkYellow;
const FOOD_COLOR: Color = Color::Red;

pub struct TermManager {
    width: TermInt,
    height: TermInt,
    stdout: Stdout,
    screen: Vec<char>,
    current_msg: Option<Message>,
    hud: Hud,
}

struct Message {
    top_left: TermPos,
    width: TermInt,
    height: TermInt,
}

#[derive(Default)]
struct Hud {
    score: u32,
    high_score: u32,
    seconds: f64,
}

impl TermManager {
    pub fn new() -> crossterm::Result<Self> {
        let (width, height) = terminal::size()?;
        let stdout = stdout();
        let screen = vec![' '; width as usize * height as usize];
        Ok(TermManager { width, height, stdout, screen, current_msg: None, hud: Hud::default() })
    }

    pub fn setup(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking)
    }

    pub fn restore(&mut self) -> crossterm::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.stdout, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
    }

    pub fn read_key_blocking(&self) -> crossterm::Result<KeyEvent> {
        loop {
            if let Event::Key(ev) = read()? {
                return Ok(ev);
            }
        }
    }

    pub fn read_key_events_queue(&self) -> crossterm::Result<Vec<KeyEvent>> {
        let mut events = vec![];

        while poll(Duration::from_millis(1))? {
            if let Event::Key(ev) = read()? {
                events.push(ev);
            }
        }

        Ok(events)
    }

    pub fn get_terminal_size(&self) -> TermPos {
        (self.width, self.height)
    }

    pub fn fits_board(&self) -> bool {
        self.width >= BOARD_WIDTH && self.height >= BOARD_TOP + BOARD_HEIGHT
    }

    pub fn draw_borders(&mut self) -> crossterm::Result<()> {
        let end_x = BOARD_WIDTH - 1;
        let end_y = BOARD_TOP + BOARD_HEIGHT - 1;

        for x in 0..BOARD_WIDTH {
            let ch = if x == 0 || x == end_x {'+'} else {'-'};
            self.print_at((x, BOARD_TOP), ch)?;
            self.print_at((x, end_y), ch)?;
        }

        for y in BOARD_TOP + 1..end_y {
            self.print_at((0, y), '|')?;
            self.print_at((end_x, y), '|')?;
        }

        self.flush()
    }

    pub fn show_message(&mut self, lines: &[&str]) -> crossterm::Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as TermInt;
        let center = (BOARD_WIDTH / 2, BOARD_TOP + BOARD_HEIGHT / 2);
        let top_left = (
            center.0.saturating_sub(msg_width / 2),
            center.1.saturating_sub(msg_height / 2),
        );

        // Blank rows above and below the text
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, *y), ' ')?;
            }
        }

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

        // Put back whatever the message covered
        for y_diff in 0..msg.height() {
            for x_diff in 0..msg.width() {
                let (x, y) = (top_left.0 + x_diff, top_left.1 + y_diff);
                let ch = self.screen[self.width as usize * y as usize + x as usize];
                self.print_at_no_save((x, y), ch)?;
            }
        }

        self.flush()
    }

    pub fn print_at(&mut self, pos: TermPos, ch: char) -> crossterm::Result<()> {
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), style::Print(ch))?;
        self.screen[self.width as usize * pos.1 as usize + pos.0 as usize] = ch;
        Ok(())
    }

    pub fn clear(&mut self) -> crossterm::Result<()> {
        execute!(self.stdout, terminal::Clear(ClearType::All))?;
        self.screen = vec![' '; self.width as usize * self.height as usize];
        self.current_msg = None;
        Ok(())
    }

    pub fn flush(&mut self) -> crossterm::Result<()> {
        self.stdout.flush()?;
        Ok(())
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn print_at_no_save(&mut self, pos: TermPos, ch: char) -> crossterm::Result<()> {
        // For messages: the screen buffer keeps what lies underneath
        queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), style::Print(ch))
    }

    fn paint_cell(&mut self, cell: Coords, ch: char, color: Color) -> crossterm::Result<()> {
        let (x, y) = cell_to_term(cell);
        queue!(self.stdout, style::SetForegroundColor(color))?;
        for dx in 0..CELL_WIDTH {
            self.print_at((x + dx, y), ch)?;
        }
        queue!(self.stdout, style::ResetColor)
    }

    fn draw_frame(&mut self, segments: &[Coords], head_index: usize, food: Coords) -> crossterm::Result<()> {
        self.hide_message()?;

        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let (x, y) = cell_to_term((col * DOT_SIZE, row * DOT_SIZE));
                for dx in 0..CELL_WIDTH {
                    self.print_at((x + dx, y), ' ')?;
                }
            }
        }

        for (i, pos) in segments.iter().enumerate() {
            if i != head_index {
                self.paint_cell(*pos, BODY_CHAR, BODY_COLOR)?;
            }
        }

        // Head last so it stays visible when the body folds onto it
        if let Some(head) = segments.get(head_index) {
            self.paint_cell(*head, BODY_CHAR, HEAD_COLOR)?;
        }

        self.paint_cell(food, FOOD_CHAR, FOOD_COLOR)?;
        self.flush()
    }

    fn draw_hud(&mut self) -> crossterm::Result<()> {
        let line = format!(
            "Score: {:<4} High: {:<4} Time: {:>2}",
            self.hud.score,
            self.hud.high_score,
            whole_seconds(self.hud.seconds)
        );
        let padded = format!("{:<width$}", line, width = BOARD_WIDTH as usize);

        for (x, ch) in padded.chars().enumerate() {
            self.print_at((x as TermInt, HUD_ROW), ch)?;
        }

        self.flush()
    }
}

impl Render for TermManager {
    fn frame(&mut self, segments: &[Coords], head_index: usize, food: Coords) {
        report(self.draw_frame(segments, head_index, food));
    }

    fn countdown(&mut self, n: u32) {
        let text = n.to_string();
        report(self.show_message(&["Get ready", "", &text]));
    }

    fn score(&mut self, n: u32) {
        self.hud.score = n;
        report(self.draw_hud());
    }

    fn time(&mut self, seconds: f64) {
        self.hud.seconds = seconds;
        report(self.draw_hud());
    }

    fn high_score(&mut self, n: u32) {
        self.hud.high_score = n;
        report(self.draw_hud());
    }
}

impl Message {
    pub fn new(width: TermInt, height: TermInt, top_left: TermPos) -> Self {
        Message { width, height, top_left }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn top_left(&self) -> TermPos {
        self.top_left
    }
}

fn cell_to_term((x, y): Coords) -> TermPos {
    let col = (x / DOT_SIZE) as TermInt;
    let row = (y / DOT_SIZE) as TermInt;
    (1 + col * CELL_WIDTH, BOARD_TOP + 1 + row)
}

fn whole_seconds(seconds: f64) -> u64 {
    seconds.max(0.0).floor() as u64
}

fn report(res: crossterm::Result<()>) {
    if let Err(e) = res {
        error!("terminal write failed: {}", e);
    }
}
