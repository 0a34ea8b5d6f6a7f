//! Drawables and frame output
//!
//! The renderer holds one drawable per country and one per retained storm
//! observation. Drawables keep their geographic geometry for the life of
//! the view; only their projected paths are recomputed, by [`Renderer::redraw`].
//! Either collection may still be unbound while its dataset is loading.

use std::fmt::Write;

use geo::{MultiPolygon, Polygon};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::circle::CircleGenerator;
use crate::data::{CountryFeature, StormSet};
use crate::path::{project_multi_polygon, project_polygon, ProjectedPath};
use crate::projection::GeoProjector;
use crate::scale::Rgba;

/// Colors and opacities of the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub background: String,
    pub ocean: String,
    pub land_fill: String,
    pub land_stroke: String,
    pub land_stroke_width: f64,
    pub storm_opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: "black".to_string(),
            ocean: "midnightblue".to_string(),
            land_fill: "steelblue".to_string(),
            land_stroke: "black".to_string(),
            land_stroke_width: 0.5,
            storm_opacity: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CountryDrawable {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub path: ProjectedPath,
}

#[derive(Debug, Clone)]
pub struct StormDrawable {
    pub geometry: Polygon<f64>,
    pub fill: Rgba,
    pub wind_speed: f64,
    pub path: ProjectedPath,
}

/// Globe disc on screen, taken from the projection at the last redraw
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sphere {
    center: [f64; 2],
    radius: f64,
}

pub struct Renderer {
    style: Style,
    circles: CircleGenerator,
    countries: Option<Vec<CountryDrawable>>,
    storms: Option<Vec<StormDrawable>>,
    sphere: Option<Sphere>,
}

impl Renderer {
    pub fn new(style: Style, circles: CircleGenerator) -> Self {
        Self {
            style,
            circles,
            countries: None,
            storms: None,
            sphere: None,
        }
    }

    /// One drawable per feature. Paths stay empty until the next redraw.
    pub fn bind_countries(&mut self, features: &[CountryFeature]) {
        let drawables = features
            .iter()
            .map(|f| CountryDrawable {
                name: f.name.clone(),
                geometry: f.geometry.clone(),
                path: ProjectedPath::empty(),
            })
            .collect::<Vec<_>>();
        debug!("Bound {} country drawables", drawables.len());
        self.countries = Some(drawables);
    }

    /// One marker per retained observation, sized and colored by wind speed
    pub fn bind_storms(&mut self, set: &StormSet) {
        let drawables = set
            .storms
            .iter()
            .filter_map(|obs| {
                let wind_speed = obs.positive_wind_speed()?;
                let origin = obs.position()?;
                Some(StormDrawable {
                    geometry: self.circles.make_circle(origin, set.scales.radius(wind_speed)),
                    fill: set.scales.color(wind_speed),
                    wind_speed,
                    path: ProjectedPath::empty(),
                })
            })
            .collect::<Vec<_>>();
        debug!("Bound {} storm drawables", drawables.len());
        self.storms = Some(drawables);
    }

    pub fn countries_bound(&self) -> bool {
        self.countries.is_some()
    }

    pub fn storms_bound(&self) -> bool {
        self.storms.is_some()
    }

    pub fn countries(&self) -> &[CountryDrawable] {
        self.countries.as_deref().unwrap_or(&[])
    }

    pub fn storms(&self) -> &[StormDrawable] {
        self.storms.as_deref().unwrap_or(&[])
    }

    /// Recompute every bound path from the projector's current state
    pub fn redraw(&mut self, projector: &GeoProjector) {
        let view = projector.view();
        self.sphere = Some(Sphere {
            center: view.center(),
            radius: view.horizon_radius(),
        });

        if let Some(countries) = self.countries.as_mut() {
            for country in countries.iter_mut() {
                country.path = project_multi_polygon(projector, &country.geometry);
            }
        }
        if let Some(storms) = self.storms.as_mut() {
            for storm in storms.iter_mut() {
                storm.path = project_polygon(projector, &storm.geometry);
            }
        }
    }

    pub fn visible_countries(&self) -> usize {
        self.countries().iter().filter(|c| !c.path.is_empty()).count()
    }

    pub fn visible_storms(&self) -> usize {
        self.storms().iter().filter(|s| !s.path.is_empty()).count()
    }

    /// Name of the topmost country under a screen point
    pub fn country_at(&self, point: [f64; 2]) -> Option<&str> {
        self.countries()
            .iter()
            .rev()
            .find(|c| c.path.contains(point))
            .map(|c| c.name.as_str())
    }

    /// The frame as an SVG document of `width` x `height` pixels
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let style = &self.style;
        let mut svg = String::with_capacity(64 * 1024);

        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = width,
            h = height
        );
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="{}"/>"#,
            width,
            height,
            escape(&style.background)
        );
        if let Some(sphere) = self.sphere {
            let _ = writeln!(
                svg,
                r#"<circle class="sphere" cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
                sphere.center[0],
                sphere.center[1],
                sphere.radius,
                escape(&style.ocean)
            );
        }

        svg.push_str("<g class=\"countries\">\n");
        for country in self.countries().iter().filter(|c| !c.path.is_empty()) {
            let _ = writeln!(
                svg,
                r#"<path class="country" d="{}" fill="{}" fill-rule="evenodd" stroke="{}" stroke-width="{}"><title>{}</title></path>"#,
                country.path.to_svg_data(),
                escape(&style.land_fill),
                escape(&style.land_stroke),
                style.land_stroke_width,
                escape(&country.name)
            );
        }
        svg.push_str("</g>\n");

        svg.push_str("<g class=\"storms\">\n");
        for storm in self.storms().iter().filter(|s| !s.path.is_empty()) {
            let _ = writeln!(
                svg,
                r#"<path class="point" d="{}" fill="{}" fill-opacity="{}" stroke="none"/>"#,
                storm.path.to_svg_data(),
                storm.fill.to_css(),
                style.storm_opacity
            );
        }
        svg.push_str("</g>\n</svg>\n");
        svg
    }
}
