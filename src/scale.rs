//! Linear value scales
//!
//! Wind speed drives both the marker radius and its color. All four scales
//! share the domain `[0, max_wind_speed]` of the retained observations.

use serde::Serialize;

/// Marker radius range, in degrees of arc
pub const RADIUS_RANGE: [f64; 2] = [0.5, 5.0];
pub const RED_RANGE: [f64; 2] = [0.0, 255.0];
pub const GREEN_RANGE: [f64; 2] = [255.0, 0.0];
pub const BLUE_RANGE: [f64; 2] = [0.0, 0.0];

/// Maps a numeric domain onto a range, optionally rounding the output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
    round: bool,
}

impl LinearScale {
    pub fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self { domain, range, round: false }
    }

    /// Same mapping with outputs rounded to the nearest integer
    pub fn rounded(mut self) -> Self {
        self.round = true;
        self
    }

    /// A collapsed domain maps every input to the start of the range
    pub fn apply(&self, x: f64) -> f64 {
        let [d0, d1] = self.domain;
        let [r0, r1] = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 || !span.is_finite() { 0.0 } else { (x - d0) / span };
        let y = r0 + (r1 - r0) * t;
        if self.round {
            y.round()
        } else {
            y
        }
    }
}

/// RGBA color with an opaque-or-fractional alpha, as written into SVG
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

/// The scales derived from one observation set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StormScales {
    pub radius: LinearScale,
    pub red: LinearScale,
    pub green: LinearScale,
    pub blue: LinearScale,
}

impl StormScales {
    pub fn from_max(max_wind_speed: f64) -> Self {
        let domain = [0.0, max_wind_speed];
        Self {
            radius: LinearScale::new(domain, RADIUS_RANGE),
            red: LinearScale::new(domain, RED_RANGE).rounded(),
            green: LinearScale::new(domain, GREEN_RANGE).rounded(),
            blue: LinearScale::new(domain, BLUE_RANGE).rounded(),
        }
    }

    /// Angular radius in degrees for a wind speed
    pub fn radius(&self, wind_speed: f64) -> f64 {
        self.radius.apply(wind_speed)
    }

    pub fn color(&self, wind_speed: f64) -> Rgba {
        Rgba {
            r: channel(self.red.apply(wind_speed)),
            g: channel(self.green.apply(wind_speed)),
            b: channel(self.blue.apply(wind_speed)),
            a: 1.0,
        }
    }
}

fn channel(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}
