//! Native globe viewer using egui
//!
//! The frame is rendered to SVG, rasterized and shown as a texture. Primary
//! button drags rotate the globe; hovering a country shows its name.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

use eframe::egui;
use tracing::{debug, info};

use crate::config::{Environment, GlobeConfig};
use crate::data::LoadEvent;
use crate::input::PointerEvent;
use crate::log_error;
use crate::raster;
use crate::view::GlobeView;

/// Run the native globe viewer
pub fn run_viewer(config: GlobeConfig, env: Environment, runtime: tokio::runtime::Handle) -> anyhow::Result<()> {
    let side = config.canvas.size() as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([side + 32.0, side + 72.0])
            .with_title("Storm Globe"),
        ..Default::default()
    };

    eframe::run_native(
        "Storm Globe",
        options,
        Box::new(move |cc| Ok(Box::new(GlobeApp::new(cc, &config, &env, &runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

struct GlobeApp {
    view: GlobeView,
    loads: Option<Receiver<LoadEvent>>,
    texture: Option<egui::TextureHandle>,
    /// View revision the texture was rendered from
    texture_revision: Option<u64>,
}

impl GlobeApp {
    fn new(
        cc: &eframe::CreationContext<'_>,
        config: &GlobeConfig,
        env: &Environment,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let paths = config.dataset_paths(env);
        info!("Loading {:?} and {:?}", paths.countries, paths.storms);

        let ctx = cc.egui_ctx.clone();
        let notify: Arc<dyn Fn() + Send + Sync> = Arc::new(move || ctx.request_repaint());
        let loads = config.pipeline().spawn_loads(runtime, paths, notify);

        Self {
            view: config.view(),
            loads: Some(loads),
            texture: None,
            texture_revision: None,
        }
    }

    fn poll_loads(&mut self) {
        let Some(loads) = &self.loads else { return };
        loop {
            match loads.try_recv() {
                Ok(event) => self.view.apply(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("All dataset loads finished");
                    self.loads = None;
                    break;
                }
            }
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if self.texture_revision == Some(self.view.revision()) {
            return;
        }
        let pixmap = match raster::rasterize(&self.view.svg()) {
            Ok(p) => p,
            Err(e) => {
                log_error!(e, revision = self.view.revision());
                return;
            }
        };
        let image = raster::to_color_image(&pixmap);
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("globe", image, egui::TextureOptions::LINEAR)),
        }
        self.texture_revision = Some(self.view.revision());
    }

    fn status(&self) -> String {
        let rotation = self.view.rotation();
        let renderer = self.view.renderer();
        let countries = if renderer.countries_bound() {
            renderer.countries().len().to_string()
        } else {
            "loading".to_string()
        };
        let storms = if renderer.storms_bound() {
            renderer.storms().len().to_string()
        } else {
            "loading".to_string()
        };
        format!(
            "rotation ({:.0}, {:.0}, {:.0}) | countries: {} | storms: {}",
            rotation.lambda, rotation.phi, rotation.gamma, countries, storms
        )
    }
}

impl eframe::App for GlobeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loads();
        self.refresh_texture(ctx);

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status());
                ui.label("| Drag: rotate");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = &self.texture else {
                ui.spinner();
                return;
            };
            let [w, h] = self.view.size();
            let size = egui::vec2(w as f32, h as f32);
            let response = ui.add(egui::Image::new((texture.id(), size)).sense(egui::Sense::drag()));
            let origin = response.rect.min;
            let local = |p: egui::Pos2| [(p.x - origin.x) as f64, (p.y - origin.y) as f64];

            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
                    self.view.pointer(PointerEvent::Down(local(pos)));
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) && response.drag_delta() != egui::Vec2::ZERO {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.view.pointer(PointerEvent::Move(local(pos)));
                }
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.view.pointer(PointerEvent::Up);
            }

            let hovered = response
                .hover_pos()
                .and_then(|pos| self.view.hover(local(pos)))
                .map(str::to_string);
            if let Some(name) = hovered {
                response.on_hover_text_at_pointer(name);
            }
        });

        // Pick up a rotation made this frame
        if self.texture_revision != Some(self.view.revision()) {
            ctx.request_repaint();
        }
    }
}
