/*
    Drawing operations bound to grammar symbols
*/

use std::fmt::Display;
use std::str::FromStr;

// Named colors understood by the `color` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Brown,
    Black,
    Gray,
    White,
}

impl NamedColor {
    pub const ALL: [NamedColor; 11] = [
        NamedColor::Red,
        NamedColor::Orange,
        NamedColor::Yellow,
        NamedColor::Green,
        NamedColor::Blue,
        NamedColor::Purple,
        NamedColor::Pink,
        NamedColor::Brown,
        NamedColor::Black,
        NamedColor::Gray,
        NamedColor::White,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NamedColor::Red => "red",
            NamedColor::Orange => "orange",
            NamedColor::Yellow => "yellow",
            NamedColor::Green => "green",
            NamedColor::Blue => "blue",
            NamedColor::Purple => "purple",
            NamedColor::Pink => "pink",
            NamedColor::Brown => "brown",
            NamedColor::Black => "black",
            NamedColor::Gray => "gray",
            NamedColor::White => "white",
        }
    }
}

impl FromStr for NamedColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NamedColor::ALL
            .into_iter()
            .find(|color| color.as_str() == s)
            .ok_or(())
    }
}

impl Display for NamedColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// The argument of a `color` operation, as written in the grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Named(NamedColor),
    // Includes the leading `#`, three or six hex digits
    Hex(String),
    Rgb(u8, u8, u8),
}

impl Color {
    pub fn is_hex(text: &str) -> bool {
        match text.strip_prefix('#') {
            Some(digits) => {
                (digits.len() == 3 || digits.len() == 6)
                    && digits.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => false,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Named(name) => write!(f, "{}", name),
            Color::Hex(hex) => write!(f, "{}", hex),
            Color::Rgb(r, g, b) => write!(f, "{} {} {}", r, g, b),
        }
    }
}

/// What a symbol does when the derived string is rendered.
///
/// The textual form (`Display`) is the translation string it was parsed
/// from: `draw` strokes a line, `forward` moves without drawing and `angle`
/// turns left.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Nop,
    Push,
    Pop,
    Draw(f64),
    Move(f64),
    Turn(f64),
    SetColor(Color),
}

impl Operation {
    pub fn opcode(&self) -> &'static str {
        match self {
            Operation::Nop => "nop",
            Operation::Push => "push",
            Operation::Pop => "pop",
            Operation::Draw(_) => "draw",
            Operation::Move(_) => "forward",
            Operation::Turn(_) => "angle",
            Operation::SetColor(_) => "color",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Nop | Operation::Push | Operation::Pop => write!(f, "{}", self.opcode()),
            Operation::Draw(n) | Operation::Move(n) | Operation::Turn(n) => {
                write!(f, "{} {}", self.opcode(), n)
            }
            Operation::SetColor(color) => write!(f, "{} {}", self.opcode(), color),
        }
    }
}
