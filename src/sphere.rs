//! Sphere vectors
//!
//! Coordinates are `[longitude, latitude]` in degrees, the same order the
//! boundary dataset uses.

/// A `[longitude, latitude]` pair in degrees
pub type LonLat = [f64; 2];

/// Unit vector for a position (x toward lon 0/lat 0, z toward the north pole)
pub fn to_cartesian(p: LonLat) -> [f64; 3] {
    let lon = p[0].to_radians();
    let lat = p[1].to_radians();
    let cos_lat = lat.cos();
    [cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin()]
}

/// Position of a (not necessarily normalized) vector
pub fn to_spherical(v: [f64; 3]) -> LonLat {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return [0.0, 0.0];
    }
    let z = (v[2] / len).clamp(-1.0, 1.0);
    [v[1].atan2(v[0]).to_degrees(), z.asin().to_degrees()]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    if len == 0.0 {
        v
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}
