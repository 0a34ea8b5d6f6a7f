//! Orthographic projection of the globe
//!
//! The projector owns the whole projection state. Translation, scale and clip
//! angle are fixed when the view is created; only the rotation changes, and
//! only through [`GeoProjector::rotate`].

use serde::{Deserialize, Serialize};

use crate::sphere::{to_cartesian, LonLat};

/// Rotation triple in degrees: yaw (lambda), pitch (phi), roll (gamma)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rotation {
    pub lambda: f64,
    pub phi: f64,
    pub gamma: f64,
}

impl Rotation {
    pub const fn new(lambda: f64, phi: f64, gamma: f64) -> Self {
        Self { lambda, phi, gamma }
    }

    /// Precomputed trig for rotating many points
    pub fn matrix(&self) -> RotationMatrix {
        let (sin_l, cos_l) = self.lambda.to_radians().sin_cos();
        let (sin_p, cos_p) = self.phi.to_radians().sin_cos();
        let (sin_g, cos_g) = self.gamma.to_radians().sin_cos();
        RotationMatrix { sin_l, cos_l, sin_p, cos_p, sin_g, cos_g }
    }
}

impl From<[f64; 3]> for Rotation {
    fn from(r: [f64; 3]) -> Self {
        Self::new(r[0], r[1], r[2])
    }
}

impl From<Rotation> for [f64; 3] {
    fn from(r: Rotation) -> Self {
        [r.lambda, r.phi, r.gamma]
    }
}

/// Yaw about the polar axis, then pitch and roll
#[derive(Debug, Clone, Copy)]
pub struct RotationMatrix {
    sin_l: f64,
    cos_l: f64,
    sin_p: f64,
    cos_p: f64,
    sin_g: f64,
    cos_g: f64,
}

impl RotationMatrix {
    /// World frame to view frame. The view center is +x.
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        let x = v[0] * self.cos_l - v[1] * self.sin_l;
        let y = v[0] * self.sin_l + v[1] * self.cos_l;
        let z = v[2];

        let k = z * self.cos_p + x * self.sin_p;
        [
            x * self.cos_p - z * self.sin_p,
            y * self.cos_g - k * self.sin_g,
            k * self.cos_g + y * self.sin_g,
        ]
    }

    /// View frame back to world frame
    pub fn invert(&self, v: [f64; 3]) -> [f64; 3] {
        let k = v[2] * self.cos_g - v[1] * self.sin_g;
        let x = v[0] * self.cos_p + k * self.sin_p;
        let y = v[1] * self.cos_g + v[2] * self.sin_g;
        let z = k * self.cos_p - v[0] * self.sin_p;

        [
            x * self.cos_l + y * self.sin_l,
            -x * self.sin_l + y * self.cos_l,
            z,
        ]
    }
}

/// Everything that determines where a point lands on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionState {
    pub translate: [f64; 2],
    pub scale: f64,
    pub rotation: Rotation,
    /// Degrees from the view center beyond which points are hidden
    pub clip_angle: f64,
}

impl ProjectionState {
    /// Globe of `diameter` pixels centered on a surface with `margin` on every side
    pub fn for_canvas(diameter: f64, margin: f64, rotation: Rotation, clip_angle: f64) -> Self {
        let radius = diameter / 2.0;
        Self {
            translate: [radius + margin, radius + margin],
            scale: radius,
            rotation,
            clip_angle,
        }
    }
}

/// Owns the projection state and maps positions to plane coordinates
#[derive(Debug, Clone)]
pub struct GeoProjector {
    state: ProjectionState,
}

impl GeoProjector {
    pub fn new(state: ProjectionState) -> Self {
        Self { state }
    }

    pub fn rotation(&self) -> Rotation {
        self.state.rotation
    }

    /// Replace the rotation; every later projection uses it
    pub fn rotate(&mut self, rotation: Rotation) {
        self.state.rotation = rotation;
    }

    /// Plane coordinates of a position, `None` when it lies beyond the clip angle
    pub fn project(&self, point: LonLat) -> Option<[f64; 2]> {
        let view = self.view();
        let v = view.to_view(point);
        view.is_visible(v).then(|| view.to_screen(v))
    }

    /// Snapshot of the current state for projecting a batch of points
    pub fn view(&self) -> ViewTransform {
        let clip = self.state.clip_angle.to_radians();
        ViewTransform {
            matrix: self.state.rotation.matrix(),
            translate: self.state.translate,
            scale: self.state.scale,
            clip_cos: clip.cos(),
            clip_sin: clip.sin(),
        }
    }
}

/// Derived from a [`ProjectionState`] on demand, never stored
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    matrix: RotationMatrix,
    translate: [f64; 2],
    scale: f64,
    clip_cos: f64,
    clip_sin: f64,
}

impl ViewTransform {
    /// Unit vector of a position in the view frame
    pub fn to_view(&self, point: LonLat) -> [f64; 3] {
        self.matrix.apply(to_cartesian(point))
    }

    pub fn is_visible(&self, v: [f64; 3]) -> bool {
        v[0] > self.clip_cos
    }

    pub fn to_screen(&self, v: [f64; 3]) -> [f64; 2] {
        [
            self.translate[0] + self.scale * v[1],
            self.translate[1] - self.scale * v[2],
        ]
    }

    /// Azimuth of a view vector around the view center
    pub fn azimuth(v: [f64; 3]) -> f64 {
        v[2].atan2(v[1])
    }

    /// Screen point on the clip circle at the given azimuth (radians)
    pub fn horizon_point(&self, azimuth: f64) -> [f64; 2] {
        let (sin_a, cos_a) = azimuth.sin_cos();
        self.to_screen([self.clip_cos, self.clip_sin * cos_a, self.clip_sin * sin_a])
    }

    /// Screen radius of the clip circle
    pub fn horizon_radius(&self) -> f64 {
        self.scale * self.clip_sin
    }

    /// Screen position of the view center
    pub fn center(&self) -> [f64; 2] {
        self.translate
    }
}
