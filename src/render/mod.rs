/*
    This module interprets derived strings as drawing commands
*/

pub mod turtle;

use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error_handling::*;
use crate::grammar::*;

// Everything a canvas must be able to do for `render` to drive it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Forward,
    PenUp,
    PenDown,
    Left,
    Goto,
    SetHeading,
    SetPenColor,
    SetPenWidth,
    Position,
    Heading,
    PenColor,
    Show,
    Hide,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::Forward,
        Capability::PenUp,
        Capability::PenDown,
        Capability::Left,
        Capability::Goto,
        Capability::SetHeading,
        Capability::SetPenColor,
        Capability::SetPenWidth,
        Capability::Position,
        Capability::Heading,
        Capability::PenColor,
        Capability::Show,
        Capability::Hide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Forward => "forward",
            Capability::PenUp => "pen_up",
            Capability::PenDown => "pen_down",
            Capability::Left => "left",
            Capability::Goto => "goto",
            Capability::SetHeading => "set_heading",
            Capability::SetPenColor => "set_pen_color",
            Capability::SetPenWidth => "set_pen_width",
            Capability::Position => "position",
            Capability::Heading => "heading",
            Capability::PenColor => "pen_color",
            Capability::Show => "show",
            Capability::Hide => "hide",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// Channel range a canvas expects for RGB colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    // [0, 1]
    #[default]
    Unit,
    // [0, 255]
    Byte,
}

// A color as handed to and read back from a canvas
#[derive(Debug, Clone, PartialEq)]
pub enum PenColor {
    Named(NamedColor),
    Hex(String),
    Rgb(f64, f64, f64),
}

impl PenColor {
    pub fn from_color(color: &Color, mode: ColorMode) -> Self {
        match color {
            Color::Named(name) => PenColor::Named(*name),
            Color::Hex(hex) => PenColor::Hex(hex.clone()),
            Color::Rgb(r, g, b) => {
                let scale = match mode {
                    ColorMode::Unit => 255.0,
                    ColorMode::Byte => 1.0,
                };
                PenColor::Rgb(*r as f64 / scale, *g as f64 / scale, *b as f64 / scale)
            }
        }
    }
}

impl Default for PenColor {
    fn default() -> Self {
        PenColor::Named(NamedColor::Black)
    }
}

/// A turtle-style drawing surface.
///
/// Headings are in degrees, counter-clockwise, and `left` turns towards
/// positive angles. A canvas that cannot perform some operation reports it
/// through [`Canvas::supports`] and is rejected before anything is drawn.
pub trait Canvas {
    fn forward(&mut self, distance: f64);
    fn pen_up(&mut self);
    fn pen_down(&mut self);
    fn left(&mut self, angle: f64);
    fn goto(&mut self, x: f64, y: f64);
    fn set_heading(&mut self, angle: f64);
    fn set_pen_color(&mut self, color: PenColor);
    fn set_pen_width(&mut self, width: u32);
    fn position(&self) -> (f64, f64);
    fn heading(&self) -> f64;
    fn pen_color(&self) -> PenColor;
    fn show(&mut self);
    fn hide(&mut self);

    fn color_mode(&self) -> ColorMode {
        ColorMode::Unit
    }

    fn supports(&self, _capability: Capability) -> bool {
        true
    }
}

// Saved by `push`, restored by `pop`
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingState {
    pub position: (f64, f64),
    pub heading: f64,
    pub color: PenColor,
}

#[derive(Debug, PartialEq, Error)]
pub enum RenderErrorType {
    #[error("L-system is not drawable, define `translations` in its description")]
    NotDrawable,
    #[error("Symbol `{symbol}` at position {index} is not in the alphabet")]
    InvalidInstructionString { symbol: Symbol, index: usize },
    #[error("Canvas does not support: {}", .0.iter().join(", "))]
    InvalidCanvas(Vec<Capability>),
    #[error("`pop` at position {index} with no saved drawing state")]
    StackUnderflow { index: usize },
}

impl ErrorType for RenderErrorType {}

pub type RenderError = Error<RenderErrorType>;
pub type RenderResult = Result<(), RenderError>;

struct Session<'c, C: Canvas + ?Sized> {
    canvas: &'c mut C,
    stack: Vec<DrawingState>,
    mode: ColorMode,
}

impl<'c, C: Canvas + ?Sized> Session<'c, C> {
    fn save(&self) -> DrawingState {
        DrawingState {
            position: self.canvas.position(),
            heading: self.canvas.heading(),
            color: self.canvas.pen_color(),
        }
    }

    fn restore(&mut self, state: DrawingState) {
        self.canvas.pen_up();
        self.canvas.goto(state.position.0, state.position.1);
        self.canvas.set_heading(state.heading);
        self.canvas.set_pen_color(state.color);
        self.canvas.pen_down();
    }

    fn apply(&mut self, index: usize, operation: &Operation) -> Result<(), RenderErrorType> {
        match operation {
            Operation::Nop => {}
            Operation::Push => {
                let state = self.save();
                self.stack.push(state);
            }
            Operation::Pop => {
                let state = self.stack.pop().ok_or(RenderErrorType::StackUnderflow { index })?;
                self.restore(state);
            }
            Operation::Draw(length) => self.canvas.forward(*length),
            Operation::Move(length) => {
                self.canvas.pen_up();
                self.canvas.forward(*length);
                self.canvas.pen_down();
            }
            Operation::Turn(angle) => self.canvas.left(*angle),
            Operation::SetColor(color) => self.canvas.set_pen_color(PenColor::from_color(color, self.mode)),
        }
        Ok(())
    }
}

fn check_preconditions<'g, C: Canvas + ?Sized>(grammar: &'g Grammar, instructions: &str, canvas: &C) -> Result<&'g Drawing, RenderErrorType> {
    let drawing = grammar.drawing().ok_or(RenderErrorType::NotDrawable)?;

    if let Some((index, symbol)) = instructions.chars().enumerate().find(|(_, symbol)| !grammar.contains(*symbol)) {
        return Err(RenderErrorType::InvalidInstructionString { symbol, index });
    }

    let missing = Capability::ALL
        .into_iter()
        .filter(|capability| !canvas.supports(*capability))
        .collect_vec();
    if !missing.is_empty() {
        return Err(RenderErrorType::InvalidCanvas(missing));
    }

    Ok(drawing)
}

fn run<C: Canvas + ?Sized>(drawing: &Drawing, instructions: &str, canvas: &mut C) -> Result<(), RenderErrorType> {
    let mode = canvas.color_mode();
    let mut session = Session {
        canvas,
        stack: Vec::new(),
        mode,
    };

    session.canvas.set_pen_width(drawing.width());
    session.canvas.show();

    let dispatched = instructions.chars().enumerate().try_for_each(|(index, symbol)| {
        // The alphabet check guarantees an operation for every symbol
        let operation = drawing
            .operation(symbol)
            .ok_or(RenderErrorType::InvalidInstructionString { symbol, index })?;
        session.apply(index, operation)
    });

    // Hidden on failure too, whatever was drawn before it stays drawn
    session.canvas.hide();
    dispatched?;

    if !session.stack.is_empty() {
        warn!(unclosed = session.stack.len(), "render finished with saved states still on the stack");
    }
    Ok(())
}

/// Draws `instructions` onto `canvas` using the grammar's operation table.
///
/// Preconditions are checked in order before anything is drawn: the grammar
/// must be drawable, every symbol must be in its alphabet, and the canvas
/// must support every [`Capability`].
///
/// A `pop` without a matching `push` stops the render. The canvas is hidden
/// but keeps the strokes drawn up to that point.
pub fn render<C: Canvas + ?Sized>(grammar: &Grammar, instructions: &str, canvas: &mut C) -> RenderResult {
    let error = |error| RenderError::new(grammar.source().clone(), error);

    let drawing = check_preconditions(grammar, instructions, canvas).map_err(error)?;
    run(drawing, instructions, canvas).map_err(error)?;

    debug!(source = %grammar.source(), symbols = instructions.chars().count(), "rendered");
    Ok(())
}
