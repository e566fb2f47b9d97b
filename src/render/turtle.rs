/*
    An in-memory turtle that records strokes and writes them out as SVG
*/

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use itertools::{Itertools, MinMaxResult};

use super::{Canvas, ColorMode, PenColor};

pub const DEFAULT_MARGIN: f64 = 10.0;

// A straight stroke left behind by the pen
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: PenColor,
    pub width: u32,
}

/// Starts at the origin facing east (heading 0) with the pen down, drawing
/// in black with width 1. The y axis points up.
#[derive(Debug, Clone)]
pub struct TurtleCanvas {
    position: (f64, f64),
    heading: f64,
    pen_down: bool,
    color: PenColor,
    width: u32,
    visible: bool,
    color_mode: ColorMode,
    segments: Vec<Segment>,
}

impl Default for TurtleCanvas {
    fn default() -> Self {
        TurtleCanvas::new()
    }
}

impl TurtleCanvas {
    pub fn new() -> Self {
        TurtleCanvas {
            position: (0.0, 0.0),
            heading: 0.0,
            pen_down: true,
            color: PenColor::default(),
            width: 1,
            visible: false,
            color_mode: ColorMode::Unit,
            segments: Vec::new(),
        }
    }

    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn move_to(&mut self, to: (f64, f64)) {
        if self.pen_down {
            self.segments.push(Segment {
                from: self.position,
                to,
                color: self.color.clone(),
                width: self.width,
            });
        }
        self.position = to;
    }

    // ((min_x, min_y), (max_x, max_y)) over every stroke end point
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let points = self.segments.iter().flat_map(|segment| [segment.from, segment.to]).collect_vec();

        let range = |values: MinMaxResult<f64>| match values {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(value) => Some((value, value)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        };
        let (min_x, max_x) = range(points.iter().map(|point| point.0).minmax_by(f64::total_cmp))?;
        let (min_y, max_y) = range(points.iter().map(|point| point.1).minmax_by(f64::total_cmp))?;

        Some(((min_x, min_y), (max_x, max_y)))
    }

    fn svg_color(&self, color: &PenColor) -> String {
        match color {
            PenColor::Named(name) => name.as_str().to_string(),
            PenColor::Hex(hex) => hex.clone(),
            PenColor::Rgb(r, g, b) => {
                let scale = match self.color_mode {
                    ColorMode::Unit => 255.0,
                    ColorMode::Byte => 1.0,
                };
                let channel = |value: f64| (value * scale).round().clamp(0.0, 255.0) as u8;
                format!("rgb({},{},{})", channel(*r), channel(*g), channel(*b))
            }
        }
    }

    /// Renders every recorded stroke, fitted to its bounding box plus `margin`
    /// on each side. SVG's y axis points down, so the drawing is flipped.
    pub fn to_svg(&self, margin: f64) -> String {
        let ((min_x, min_y), (max_x, max_y)) = self.bounds().unwrap_or(((0.0, 0.0), (0.0, 0.0)));
        let width = max_x - min_x + 2.0 * margin;
        let height = max_y - min_y + 2.0 * margin;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.3}" height="{:.3}" viewBox="0 0 {:.3} {:.3}">"#,
            width, height, width, height
        );
        for segment in &self.segments {
            let (x1, y1) = (segment.from.0 - min_x + margin, max_y - segment.from.1 + margin);
            let (x2, y2) = (segment.to.0 - min_x + margin, max_y - segment.to.1 + margin);
            let _ = writeln!(
                svg,
                r#"  <line x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" stroke="{}" stroke-width="{}" stroke-linecap="round"/>"#,
                x1, y1, x2, y2, self.svg_color(&segment.color), segment.width
            );
        }
        svg.push_str("</svg>\n");

        return svg;
    }

    pub fn save_svg(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.to_svg(DEFAULT_MARGIN))
    }
}

impl Canvas for TurtleCanvas {
    fn forward(&mut self, distance: f64) {
        let radians = self.heading.to_radians();
        let to = (
            self.position.0 + distance * radians.cos(),
            self.position.1 + distance * radians.sin(),
        );
        self.move_to(to);
    }

    fn pen_up(&mut self) {
        self.pen_down = false;
    }

    fn pen_down(&mut self) {
        self.pen_down = true;
    }

    fn left(&mut self, angle: f64) {
        self.heading = (self.heading + angle).rem_euclid(360.0);
    }

    fn goto(&mut self, x: f64, y: f64) {
        self.move_to((x, y));
    }

    fn set_heading(&mut self, angle: f64) {
        self.heading = angle.rem_euclid(360.0);
    }

    fn set_pen_color(&mut self, color: PenColor) {
        self.color = color;
    }

    fn set_pen_width(&mut self, width: u32) {
        self.width = width;
    }

    fn position(&self) -> (f64, f64) {
        self.position
    }

    fn heading(&self) -> f64 {
        self.heading
    }

    fn pen_color(&self) -> PenColor {
        self.color.clone()
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn color_mode(&self) -> ColorMode {
        self.color_mode
    }
}
