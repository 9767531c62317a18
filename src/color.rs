//! Sequential color ramps mapped onto a break set.

use rgb::RGB8;
use serde::{Deserialize, Serialize};

use crate::breaks::BreakSet;

/// ColorBrewer sequential ramps, 9 classes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    #[default]
    OrRd,
    YlOrRd,
    Blues,
}

const OR_RD: [RGB8; 9] = [
    RGB8::new(0xff, 0xf7, 0xec),
    RGB8::new(0xfe, 0xe8, 0xc8),
    RGB8::new(0xfd, 0xd4, 0x9e),
    RGB8::new(0xfd, 0xbb, 0x84),
    RGB8::new(0xfc, 0x8d, 0x59),
    RGB8::new(0xef, 0x65, 0x48),
    RGB8::new(0xd7, 0x30, 0x1f),
    RGB8::new(0xb3, 0x00, 0x00),
    RGB8::new(0x7f, 0x00, 0x00),
];

const YL_OR_RD: [RGB8; 9] = [
    RGB8::new(0xff, 0xff, 0xcc),
    RGB8::new(0xff, 0xed, 0xa0),
    RGB8::new(0xfe, 0xd9, 0x76),
    RGB8::new(0xfe, 0xb2, 0x4c),
    RGB8::new(0xfd, 0x8d, 0x3c),
    RGB8::new(0xfc, 0x4e, 0x2a),
    RGB8::new(0xe3, 0x1a, 0x1c),
    RGB8::new(0xbd, 0x00, 0x26),
    RGB8::new(0x80, 0x00, 0x26),
];

const BLUES: [RGB8; 9] = [
    RGB8::new(0xf7, 0xfb, 0xff),
    RGB8::new(0xde, 0xeb, 0xf7),
    RGB8::new(0xc6, 0xdb, 0xef),
    RGB8::new(0x9e, 0xca, 0xe1),
    RGB8::new(0x6b, 0xae, 0xd6),
    RGB8::new(0x42, 0x92, 0xc6),
    RGB8::new(0x21, 0x71, 0xb5),
    RGB8::new(0x08, 0x51, 0x9c),
    RGB8::new(0x08, 0x30, 0x6b),
];

impl Palette {
    pub fn stops(&self) -> &'static [RGB8] {
        match self {
            Palette::OrRd => &OR_RD,
            Palette::YlOrRd => &YL_OR_RD,
            Palette::Blues => &BLUES,
        }
    }

    /// Samples the ramp at `t` in [0, 1], stops evenly spaced.
    pub fn sample(&self, t: f64) -> RGB8 {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let scaled = t * (stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(stops.len() - 2);
        let local = scaled - lower as f64;

        lerp(stops[lower], stops[lower + 1], local)
    }
}

fn lerp(a: RGB8, b: RGB8, t: f64) -> RGB8 {
    let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGB8::new(channel(a.r, b.r), channel(a.g, b.g), channel(a.b, b.b))
}

pub fn to_hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Maps values to colors: the i-th break sits at ramp position i/(n-1) and
/// values in between interpolate. Values outside the breaks clamp to the ends.
#[derive(Debug, Clone)]
pub struct ColorScale {
    palette: Palette,
    domain: Vec<f64>,
}

impl ColorScale {
    pub fn new(palette: Palette, breaks: &BreakSet) -> Self {
        Self {
            palette,
            domain: breaks.values().to_vec(),
        }
    }

    pub fn position(&self, value: f64) -> f64 {
        let n = self.domain.len();
        if n < 2 || value <= self.domain[0] {
            return 0.0;
        }
        if value >= self.domain[n - 1] {
            return 1.0;
        }

        let segment = self
            .domain
            .windows(2)
            .position(|w| value >= w[0] && value <= w[1])
            .unwrap_or(0);
        let (lo, hi) = (self.domain[segment], self.domain[segment + 1]);
        let local = if hi > lo { (value - lo) / (hi - lo) } else { 0.0 };

        (segment as f64 + local) / (n - 1) as f64
    }

    pub fn color(&self, value: f64) -> RGB8 {
        self.palette.sample(self.position(value))
    }

    pub fn hex(&self, value: f64) -> String {
        to_hex(self.color(value))
    }
}
