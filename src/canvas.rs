use crossterm::Command;
use crossterm::style::{Color, SetForegroundColor};

use crate::display_width::{char_width, display_width, truncate};

/// Placeholder for the second column of a double-width character.
const WIDE_TAIL: char = '\0';

pub const DIR_L: u8 = 1;
pub const DIR_R: u8 = 2;
pub const DIR_U: u8 = 4;
pub const DIR_D: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub color: Option<Color>,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        color: None,
    };
}

/// Colors for one drawn element: its outline and its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paint {
    pub line: Option<Color>,
    pub text: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxStyle {
    Square,
    Rounded,
}

impl BoxStyle {
    fn corners(self) -> [char; 4] {
        match self {
            BoxStyle::Square => ['┌', '┐', '└', '┘'],
            BoxStyle::Rounded => ['╭', '╮', '╰', '╯'],
        }
    }
}

/// Mutable character grid. Coordinates are signed; anything outside the
/// grid is silently dropped so drawing can never fault.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: isize, y: isize) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn get(&self, x: isize, y: isize) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn set(&mut self, x: isize, y: isize, ch: char, color: Option<Color>) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        // Overwriting either half of a wide char blanks the other half.
        if self.cells[i].ch == WIDE_TAIL && i % self.width > 0 && self.cells[i - 1].ch != WIDE_TAIL {
            self.cells[i - 1] = Cell::BLANK;
        }
        if ch != WIDE_TAIL
            && (i + 1) % self.width != 0
            && self.cells[i].ch != WIDE_TAIL
            && self.cells[i + 1].ch == WIDE_TAIL
        {
            self.cells[i + 1] = Cell::BLANK;
        }
        self.cells[i] = Cell { ch, color };
    }

    /// Set a line glyph, joining it with a line glyph already in the cell.
    /// Text, arrowheads and other non-line glyphs are never replaced.
    pub fn set_merge(&mut self, x: isize, y: isize, ch: char, color: Option<Color>) {
        let Some(existing) = self.get(x, y) else {
            return;
        };
        if existing.ch != ' ' && box_connections(existing.ch) == 0 {
            return;
        }
        self.set(x, y, merge_box_drawing(existing.ch, ch), color);
    }

    /// Add connection directions to an existing line glyph, keeping its color.
    /// Cells that hold no line glyph are left alone.
    pub fn connect(&mut self, x: isize, y: isize, dirs: u8) {
        let Some(existing) = self.get(x, y) else {
            return;
        };
        let conn = box_connections(existing.ch);
        if conn == 0 {
            return;
        }
        if let Some(ch) = connections_to_char(conn | dirs) {
            self.set(x, y, ch, existing.color);
        }
    }

    /// Horizontal run from `x0` to `x1` inclusive, in either order.
    pub fn hline(&mut self, x0: isize, x1: isize, y: isize, ch: char, color: Option<Color>) {
        for x in x0.min(x1)..=x0.max(x1) {
            self.set_merge(x, y, ch, color);
        }
    }

    /// Vertical run from `y0` to `y1` inclusive, in either order.
    pub fn vline(&mut self, x: isize, y0: isize, y1: isize, ch: char, color: Option<Color>) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.set_merge(x, y, ch, color);
        }
    }

    pub fn write_text(&mut self, x: isize, y: isize, s: &str, color: Option<Color>) {
        let mut offset = 0;
        for ch in s.chars() {
            self.set(x + offset, y, ch, color);
            let w = char_width(ch);
            for j in 1..w {
                self.set(x + offset + j as isize, y, WIDE_TAIL, color);
            }
            offset += w as isize;
        }
    }

    /// Write `s` centered in the `width` columns starting at `x`,
    /// truncating it when it does not fit.
    pub fn write_centered(&mut self, x: isize, y: isize, width: usize, s: &str, color: Option<Color>) {
        let text = truncate(s, width);
        let pad = (width - display_width(&text)) / 2;
        self.write_text(x + pad as isize, y, &text, color);
    }

    pub fn draw_box(&mut self, x: isize, y: isize, w: usize, h: usize, style: BoxStyle, color: Option<Color>) {
        if w < 2 || h < 2 {
            return;
        }
        let right = x + w as isize - 1;
        let bottom = y + h as isize - 1;
        let [tl, tr, bl, br] = style.corners();

        for col in (x + 1)..right {
            self.set(col, y, '─', color);
            self.set(col, bottom, '─', color);
        }
        for row in (y + 1)..bottom {
            self.set(x, row, '│', color);
            self.set(right, row, '│', color);
        }
        self.set(x, y, tl, color);
        self.set(right, y, tr, color);
        self.set(x, bottom, bl, color);
        self.set(right, bottom, br, color);
    }

    /// Diamond outline. Boxes narrower than five columns get a minimal
    /// cross of tees instead.
    pub fn draw_diamond(&mut self, x: isize, y: isize, w: usize, h: usize, color: Option<Color>) {
        if w < 2 || h < 2 {
            return;
        }
        let right = x + w as isize - 1;
        let bottom = y + h as isize - 1;

        if w < 5 {
            let cx = x + (w / 2) as isize;
            let cy = y + (h / 2) as isize;
            self.set(cx, y, '┬', color);
            self.set(cx, bottom, '┴', color);
            self.set(x, cy, '├', color);
            self.set(right, cy, '┤', color);
            return;
        }

        for col in (x + 1)..right {
            self.set(col, y, '─', color);
            self.set(col, bottom, '─', color);
        }
        for row in (y + 1)..bottom {
            self.set(x, row, '│', color);
            self.set(right, row, '│', color);
        }
        self.set(x, y, '╱', color);
        self.set(right, y, '╲', color);
        self.set(x, bottom, '╲', color);
        self.set(right, bottom, '╱', color);
    }

    /// Snapshot the grid.
    pub fn freeze(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }
}

/// Immutable rendered snapshot of a [`Canvas`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x])
    }

    fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        // `max(1)` keeps `chunks` happy for a zero-width frame.
        self.cells.chunks(self.width.max(1))
    }

    /// Text without color, trailing spaces trimmed from every row.
    pub fn to_plain(&self) -> String {
        self.rows()
            .map(|row| {
                let line: String = row.iter().map(|c| c.ch).filter(|&ch| ch != WIDE_TAIL).collect();
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full-width text with color escapes. A color change is emitted only
    /// where a cell's color differs from the previous cell's.
    pub fn to_ansi(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 2);
        let mut current: Option<Color> = None;
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for cell in row.iter().filter(|c| c.ch != WIDE_TAIL) {
                if cell.color != current {
                    push_color(&mut out, cell.color.unwrap_or(Color::Reset));
                    current = cell.color;
                }
                out.push(cell.ch);
            }
        }
        if current.is_some() {
            push_color(&mut out, Color::Reset);
        }
        out
    }
}

fn push_color(out: &mut String, color: Color) {
    // Formatting into a String cannot fail.
    let _ = SetForegroundColor(color).write_ansi(out);
}

pub fn box_connections(ch: char) -> u8 {
    match ch {
        '─' | '═' | '╌' => DIR_L | DIR_R,
        '│' | '║' | '┊' | '┆' => DIR_U | DIR_D,
        '┌' | '╭' => DIR_R | DIR_D,
        '┐' | '╮' => DIR_L | DIR_D,
        '└' | '╰' => DIR_R | DIR_U,
        '┘' | '╯' => DIR_L | DIR_U,
        '┬' => DIR_L | DIR_R | DIR_D,
        '┴' => DIR_L | DIR_R | DIR_U,
        '├' => DIR_U | DIR_D | DIR_R,
        '┤' => DIR_U | DIR_D | DIR_L,
        '┼' => DIR_L | DIR_R | DIR_U | DIR_D,
        _ => 0,
    }
}

pub fn connections_to_char(conn: u8) -> Option<char> {
    match conn {
        c if c == DIR_L | DIR_R => Some('─'),
        c if c == DIR_U | DIR_D => Some('│'),
        c if c == DIR_R | DIR_D => Some('┌'),
        c if c == DIR_L | DIR_D => Some('┐'),
        c if c == DIR_R | DIR_U => Some('└'),
        c if c == DIR_L | DIR_U => Some('┘'),
        c if c == DIR_L | DIR_R | DIR_D => Some('┬'),
        c if c == DIR_L | DIR_R | DIR_U => Some('┴'),
        c if c == DIR_U | DIR_D | DIR_R => Some('├'),
        c if c == DIR_U | DIR_D | DIR_L => Some('┤'),
        c if c == DIR_L | DIR_R | DIR_U | DIR_D => Some('┼'),
        _ => None,
    }
}

fn merge_box_drawing(existing: char, new_char: char) -> char {
    let ec = box_connections(existing);
    let nc = box_connections(new_char);
    if ec == 0 || nc == 0 || ec == nc {
        return new_char;
    }
    connections_to_char(ec | nc).unwrap_or(new_char)
}
