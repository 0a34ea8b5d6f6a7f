//! Projected paths
//!
//! Projects polygon geometry through a [`GeoProjector`], cutting rings at the
//! clip circle. A ring that crosses the horizon is closed again along the
//! horizon, walking the same way round as the hidden part of the ring, so
//! the visible piece still fills the right side.

use std::f64::consts::{PI, TAU};
use std::fmt::Write;

use geo::{Contains, LineString, MultiPolygon, Point, Polygon};

use crate::projection::{GeoProjector, ViewTransform};
use crate::sphere::normalize;

/// Angular step used when following the horizon
const HORIZON_STEP: f64 = PI / 90.0;

/// Bisection steps when locating where an edge leaves the visible cap
const CROSSING_ITERATIONS: usize = 48;

/// Screen polygons of one drawable for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedPath {
    polygons: MultiPolygon<f64>,
}

impl Default for ProjectedPath {
    fn default() -> Self {
        Self { polygons: MultiPolygon::new(Vec::new()) }
    }
}

impl ProjectedPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// SVG path data, one closed subpath per ring
    pub fn to_svg_data(&self) -> String {
        let mut d = String::new();
        for polygon in &self.polygons {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                // Rings are stored closed; `Z` stands in for the repeated point
                let open = &ring.0[..ring.0.len().saturating_sub(1)];
                for (i, c) in open.iter().enumerate() {
                    let cmd = if i == 0 { 'M' } else { 'L' };
                    // Writing into a String cannot fail
                    let _ = write!(d, "{}{:.2},{:.2}", cmd, c.x, c.y);
                }
                d.push('Z');
            }
        }
        d
    }

    /// Whether a screen point falls inside a visible polygon and outside its holes
    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.polygons.contains(&Point::new(point[0], point[1]))
    }
}

/// Project every polygon of a country outline
pub fn project_multi_polygon(projector: &GeoProjector, geometry: &MultiPolygon<f64>) -> ProjectedPath {
    let view = projector.view();
    let polygons = geometry.iter().filter_map(|p| clip_polygon(&view, p)).collect();
    ProjectedPath { polygons: MultiPolygon::new(polygons) }
}

pub fn project_polygon(projector: &GeoProjector, polygon: &Polygon<f64>) -> ProjectedPath {
    let view = projector.view();
    let polygons = clip_polygon(&view, polygon).into_iter().collect();
    ProjectedPath { polygons: MultiPolygon::new(polygons) }
}

/// A hidden exterior drops the polygon along with its holes
fn clip_polygon(view: &ViewTransform, polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clip_ring(view, polygon.exterior())?;
    let interiors = polygon
        .interiors()
        .iter()
        .filter_map(|ring| clip_ring(view, ring))
        .map(LineString::from)
        .collect();
    Some(Polygon::new(LineString::from(exterior), interiors))
}

/// Visible stretch of a ring, bounded by horizon crossings
struct Run {
    points: Vec<[f64; 3]>,
    /// Hidden vertices between this run's exit and the next run's entry
    hidden: Vec<[f64; 3]>,
}

fn clip_ring(view: &ViewTransform, ring: &LineString<f64>) -> Option<Vec<[f64; 2]>> {
    let mut points: Vec<[f64; 3]> = ring.coords().map(|c| view.to_view([c.x, c.y])).collect();
    if points.len() > 1 && ring.is_closed() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return None;
    }

    let visible: Vec<bool> = points.iter().map(|&v| view.is_visible(v)).collect();
    if visible.iter().all(|&v| v) {
        return Some(points.iter().map(|&v| view.to_screen(v)).collect());
    }

    // First visible vertex that follows a hidden one; none means fully hidden
    let start = (0..n).find(|&i| visible[i] && !visible[(i + n - 1) % n])?;

    let mut runs: Vec<Run> = Vec::new();
    let mut current = vec![crossing(view, points[start], points[(start + n - 1) % n]), points[start]];

    for k in 1..n {
        let i = (start + k) % n;
        let prev = (start + k - 1) % n;
        let (a, b) = (points[prev], points[i]);
        match (visible[prev], visible[i]) {
            (true, true) => current.push(b),
            (true, false) => {
                current.push(crossing(view, a, b));
                runs.push(Run {
                    points: std::mem::take(&mut current),
                    hidden: vec![b],
                });
            }
            (false, false) => {
                if let Some(run) = runs.last_mut() {
                    run.hidden.push(b);
                }
            }
            (false, true) => current = vec![crossing(view, b, a), b],
        }
    }

    let mut screen = Vec::new();
    for (j, run) in runs.iter().enumerate() {
        screen.extend(run.points.iter().map(|&v| view.to_screen(v)));
        let exit = run.points[run.points.len() - 1];
        let entry = runs[(j + 1) % runs.len()].points[0];
        follow_horizon(view, exit, &run.hidden, entry, &mut screen);
    }
    Some(screen)
}

/// Point where the great-circle edge from `inside` to `outside` meets the clip circle
fn crossing(view: &ViewTransform, inside: [f64; 3], outside: [f64; 3]) -> [f64; 3] {
    let lerp = |t: f64| {
        normalize([
            inside[0] + (outside[0] - inside[0]) * t,
            inside[1] + (outside[1] - inside[1]) * t,
            inside[2] + (outside[2] - inside[2]) * t,
        ])
    };
    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..CROSSING_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if view.is_visible(lerp(mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lerp(lo)
}

/// Arc along the horizon from `exit` to `entry`, endpoints excluded
fn follow_horizon(
    view: &ViewTransform,
    exit: [f64; 3],
    hidden: &[[f64; 3]],
    entry: [f64; 3],
    out: &mut Vec<[f64; 2]>,
) {
    let from = ViewTransform::azimuth(exit);
    let mut sweep = 0.0;
    let mut last = from;
    for &v in hidden.iter().chain(std::iter::once(&entry)) {
        let azimuth = ViewTransform::azimuth(v);
        sweep += wrap_angle(azimuth - last);
        last = azimuth;
    }

    let steps = (sweep.abs() / HORIZON_STEP).ceil() as usize;
    for i in 1..steps {
        out.push(view.horizon_point(from + sweep * i as f64 / steps as f64));
    }
}

/// Wrap to (-PI, PI]
fn wrap_angle(a: f64) -> f64 {
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::make_circle;
    use crate::projection::{ProjectionState, Rotation};
    use geo::Coord;

    fn projector(rotation: Rotation) -> GeoProjector {
        GeoProjector::new(ProjectionState::for_canvas(400.0, 25.0, rotation, 90.0))
    }

    fn distance_from_center(c: &Coord<f64>) -> f64 {
        ((c.x - 225.0).powi(2) + (c.y - 225.0).powi(2)).sqrt()
    }

    fn square(min: f64, max: f64) -> LineString<f64> {
        LineString::from(vec![[min, min], [max, min], [max, max], [min, max]])
    }

    #[test]
    fn test_visible_circle_keeps_every_point() {
        let path = project_polygon(&projector(Rotation::default()), &make_circle([10.0, 10.0], 5.0));
        assert_eq!(path.polygons.0.len(), 1);
        // 60 distinct points, closed again by geo
        assert_eq!(path.polygons.0[0].exterior().0.len(), 61);
    }

    #[test]
    fn test_hidden_circle_is_empty() {
        let path = project_polygon(&projector(Rotation::default()), &make_circle([180.0, 0.0], 5.0));
        assert!(path.is_empty());
        assert_eq!(path.to_svg_data(), "");
    }

    #[test]
    fn test_limb_circle_is_cut_at_horizon() {
        let p = projector(Rotation::default());
        let path = project_polygon(&p, &make_circle([90.0, 0.0], 5.0));
        assert_eq!(path.polygons.0.len(), 1);
        let exterior = path.polygons.0[0].exterior();
        for c in exterior.coords() {
            assert!(distance_from_center(c) <= 200.0 + 1e-6);
        }
        // The cut edge runs along the horizon
        let on_horizon = exterior
            .coords()
            .filter(|c| (distance_from_center(c) - 200.0).abs() < 1e-3)
            .count();
        assert!(on_horizon >= 2);
    }

    #[test]
    fn test_horizon_arc_follows_hidden_side() {
        // A big cap centered just behind the east limb: the visible part is
        // a crescent along the east edge, so the horizon arc must stay east.
        let p = projector(Rotation::default());
        let path = project_polygon(&p, &make_circle([100.0, 0.0], 40.0));
        assert!(path.polygons.0[0].exterior().coords().all(|c| c.x >= 225.0 - 1e-6));
        assert!(path.contains([420.0, 225.0]));
        assert!(!path.contains([30.0, 225.0]));
    }

    #[test]
    fn test_svg_data_format() {
        let polygon = Polygon::new(LineString::from(vec![[1.0, 2.0], [3.5, 4.25], [5.0, 6.0]]), Vec::new());
        let path = ProjectedPath { polygons: MultiPolygon::new(vec![polygon]) };
        assert_eq!(path.to_svg_data(), "M1.00,2.00L3.50,4.25L5.00,6.00Z");
    }

    #[test]
    fn test_contains_respects_holes() {
        let polygon = Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]);
        let path = ProjectedPath { polygons: MultiPolygon::new(vec![polygon]) };
        assert!(path.contains([2.0, 2.0]));
        assert!(!path.contains([5.0, 5.0]));
        assert!(!path.contains([12.0, 5.0]));
        assert_eq!(path.to_svg_data().matches('Z').count(), 2);
    }

    #[test]
    fn test_hole_is_projected_with_its_shell() {
        let p = projector(Rotation::default());
        let shell = make_circle([0.0, 0.0], 20.0);
        let hole = make_circle([0.0, 0.0], 5.0);
        let polygon = Polygon::new(shell.exterior().clone(), vec![hole.exterior().clone()]);
        let path = project_polygon(&p, &polygon);
        assert_eq!(path.polygons.0[0].interiors().len(), 1);
        // Screen center sits inside the hole
        assert!(!path.contains([225.0, 225.0]));
        // 10 degrees east of center is in the ring between hole and shell
        assert!(path.contains([225.0 + 200.0 * 10f64.to_radians().sin(), 225.0]));
    }

    #[test]
    fn test_multi_polygon_projection_is_deterministic() {
        let p = projector(Rotation::new(-80.0, 15.0, 0.0));
        let geometry = MultiPolygon::new(vec![make_circle([95.0, 20.0], 30.0), make_circle([-40.0, 0.0], 10.0)]);
        let first = project_multi_polygon(&p, &geometry);
        assert_eq!(first.to_svg_data(), project_multi_polygon(&p, &geometry).to_svg_data());
        assert_eq!(first.polygons.0.len(), 2);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_angle(PI), PI);
    }
}
