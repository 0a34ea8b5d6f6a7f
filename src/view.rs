//! Globe view session
//!
//! Owns the projector, renderer and drag controller for one window or one
//! headless render. Nothing here is global; every view starts from its own
//! configuration.

use tracing::info;

use crate::circle::CircleGenerator;
use crate::data::{CountryFeature, Dataset, LoadEvent, StormSet};
use crate::input::{InputController, InputOutcome, PointerEvent};
use crate::log_error;
use crate::projection::{GeoProjector, ProjectionState, Rotation};
use crate::render::{Renderer, Style};

pub struct GlobeView {
    projector: GeoProjector,
    renderer: Renderer,
    input: InputController,
    size: [u32; 2],
    /// Bumped whenever the frame content changes
    revision: u64,
}

impl GlobeView {
    pub fn new(state: ProjectionState, size: [u32; 2], style: Style, circles: CircleGenerator) -> Self {
        let projector = GeoProjector::new(state);
        let mut renderer = Renderer::new(style, circles);
        renderer.redraw(&projector);
        Self {
            projector,
            renderer,
            input: InputController::new(),
            size,
            revision: 0,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rotation(&self) -> Rotation {
        self.projector.rotation()
    }

    pub fn bind_countries(&mut self, countries: &[CountryFeature]) {
        self.renderer.bind_countries(countries);
        self.renderer.redraw(&self.projector);
        self.revision += 1;
    }

    pub fn bind_storms(&mut self, storms: &StormSet) {
        self.renderer.bind_storms(storms);
        self.renderer.redraw(&self.projector);
        self.revision += 1;
    }

    pub fn bind(&mut self, dataset: &Dataset) {
        self.bind_countries(&dataset.countries);
        self.bind_storms(&dataset.storms);
    }

    /// Bind a finished load. A failed load binds an empty collection.
    pub fn apply(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Countries(Ok(countries)) => {
                info!("Countries ready: {}", countries.len());
                self.bind_countries(&countries);
            }
            LoadEvent::Countries(Err(e)) => {
                log_error!(e, dataset = "countries");
                self.bind_countries(&[]);
            }
            LoadEvent::Storms(Ok(storms)) => {
                info!(
                    "Storms ready: {} (max wind {})",
                    storms.storms.len(),
                    storms.max_wind_speed
                );
                self.bind_storms(&storms);
            }
            LoadEvent::Storms(Err(e)) => {
                log_error!(e, dataset = "storms");
                self.bind_storms(&StormSet::empty());
            }
        }
    }

    pub fn pointer(&mut self, event: PointerEvent) -> InputOutcome {
        let outcome = self.input.handle(event, &mut self.projector, &mut self.renderer);
        if outcome == InputOutcome::Rotated {
            self.revision += 1;
        }
        outcome
    }

    /// Set the rotation directly and redraw
    pub fn rotate_to(&mut self, rotation: Rotation) {
        self.projector.rotate(rotation);
        self.renderer.redraw(&self.projector);
        self.revision += 1;
    }

    /// Country name under a surface point, for the tooltip
    pub fn hover(&self, point: [f64; 2]) -> Option<&str> {
        self.renderer.country_at(point)
    }

    pub fn svg(&self) -> String {
        self.renderer.to_svg(self.size[0], self.size[1])
    }
}
