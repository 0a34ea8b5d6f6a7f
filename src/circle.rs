//! Spherical circles
//!
//! A storm marker is a circle on the sphere, not on the screen, so it keeps
//! its true shape and size near the limb of the globe.

use std::f64::consts::TAU;

use geo::{Coord, LineString, Polygon};

use crate::projection::Rotation;
use crate::sphere::{to_spherical, LonLat};

/// Default angular step between ring points, in degrees
pub const DEFAULT_PRECISION: f64 = 6.0;

/// Generates closed rings at a fixed angular distance from an origin
#[derive(Debug, Clone, Copy)]
pub struct CircleGenerator {
    precision: f64,
}

impl Default for CircleGenerator {
    fn default() -> Self {
        Self { precision: DEFAULT_PRECISION }
    }
}

impl CircleGenerator {
    /// Non-positive or non-finite precision falls back to the default
    pub fn new(precision: f64) -> Self {
        if precision.is_finite() && precision > 0.0 {
            Self { precision }
        } else {
            Self::default()
        }
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Polygon whose exterior lies `angular_radius` degrees from `origin`.
    ///
    /// Points run in decreasing azimuth around the origin, the first point is
    /// repeated at the end. A radius that is not positive gives an empty ring.
    pub fn make_circle(&self, origin: LonLat, angular_radius: f64) -> Polygon<f64> {
        if !(angular_radius.is_finite() && angular_radius > 0.0)
            || !origin.iter().all(|c| c.is_finite())
        {
            return Polygon::new(LineString::new(Vec::new()), Vec::new());
        }

        let radius = angular_radius.to_radians();
        let (sr, cr) = radius.sin_cos();
        // The rotation that brings `origin` to the view center; its inverse
        // carries the ring from around +x back to around `origin`.
        let to_origin = Rotation::new(-origin[0], -origin[1], 0.0).matrix();

        let steps = (360.0 / self.precision).ceil().max(3.0) as usize;
        let step = TAU / steps as f64;

        let mut ring: Vec<Coord<f64>> = (0..steps)
            .map(|i| {
                let t = TAU - i as f64 * step;
                let local = [cr, -sr * t.cos(), -sr * t.sin()];
                let [x, y] = to_spherical(to_origin.invert(local));
                Coord { x, y }
            })
            .collect();
        ring.push(ring[0]);

        Polygon::new(LineString::new(ring), Vec::new())
    }
}

/// Circle with the default precision
pub fn make_circle(origin: LonLat, angular_radius: f64) -> Polygon<f64> {
    CircleGenerator::default().make_circle(origin, angular_radius)
}
