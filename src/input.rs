//! Drag-to-rotate gesture
//!
//! One pointer at a time. A drag changes yaw and pitch by one degree per
//! pixel of travel from where the gesture started; roll is never touched.

use tracing::{debug, trace};

use crate::projection::{GeoProjector, Rotation};
use crate::render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down([f64; 2]),
    Move([f64; 2]),
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor_point: [f64; 2],
        anchor_rotation: Rotation,
    },
}

/// What the host should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Nothing changed
    Ignored,
    /// A gesture started or ended; the host suppresses its default drag handling
    Captured,
    /// Rotation changed and the renderer was redrawn
    Rotated,
}

#[derive(Debug, Default)]
pub struct InputController {
    state: DragState,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        projector: &mut GeoProjector,
        renderer: &mut Renderer,
    ) -> InputOutcome {
        match (self.state, event) {
            (DragState::Idle, PointerEvent::Down(point)) => {
                let rotation = projector.rotation();
                debug!("Drag started at {:?} from rotation {:?}", point, rotation);
                self.state = DragState::Dragging {
                    anchor_point: point,
                    anchor_rotation: rotation,
                };
                InputOutcome::Captured
            }
            (DragState::Dragging { anchor_point, anchor_rotation }, PointerEvent::Move(point)) => {
                let rotation = drag_rotation(anchor_point, anchor_rotation, point);
                trace!("Drag to {:?} -> {:?}", point, rotation);
                projector.rotate(rotation);
                renderer.redraw(projector);
                InputOutcome::Rotated
            }
            (DragState::Dragging { .. }, PointerEvent::Up) => {
                debug!("Drag ended at rotation {:?}", projector.rotation());
                self.state = DragState::Idle;
                InputOutcome::Captured
            }
            // A second press keeps the first gesture's anchor; moves and
            // releases without a gesture do nothing
            (DragState::Dragging { .. }, PointerEvent::Down(_))
            | (DragState::Idle, PointerEvent::Move(_))
            | (DragState::Idle, PointerEvent::Up) => InputOutcome::Ignored,
        }
    }
}

/// Rotation after dragging from `anchor` to `current`
pub fn drag_rotation(anchor: [f64; 2], anchor_rotation: Rotation, current: [f64; 2]) -> Rotation {
    let dx = anchor[0] - current[0];
    let dy = current[1] - anchor[1];
    Rotation::new(anchor_rotation.lambda + dx, anchor_rotation.phi + dy, anchor_rotation.gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::CircleGenerator;
    use crate::projection::ProjectionState;
    use crate::render::Style;

    fn setup(rotation: Rotation) -> (InputController, GeoProjector, Renderer) {
        let projector = GeoProjector::new(ProjectionState::for_canvas(400.0, 25.0, rotation, 90.0));
        let renderer = Renderer::new(Style::default(), CircleGenerator::default());
        (InputController::new(), projector, renderer)
    }

    #[test]
    fn test_drag_rotation_delta() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::new(10.0, 20.0, 0.0));

        let outcome = input.handle(PointerEvent::Down([100.0, 100.0]), &mut projector, &mut renderer);
        assert_eq!(outcome, InputOutcome::Captured);
        let outcome = input.handle(PointerEvent::Move([120.0, 90.0]), &mut projector, &mut renderer);
        assert_eq!(outcome, InputOutcome::Rotated);
        assert_eq!(projector.rotation(), Rotation::new(-10.0, 10.0, 0.0));
    }

    #[test]
    fn test_moves_are_relative_to_anchor() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::default());
        input.handle(PointerEvent::Down([50.0, 50.0]), &mut projector, &mut renderer);
        input.handle(PointerEvent::Move([40.0, 55.0]), &mut projector, &mut renderer);
        input.handle(PointerEvent::Move([30.0, 60.0]), &mut projector, &mut renderer);
        assert_eq!(projector.rotation(), Rotation::new(20.0, 10.0, 0.0));
    }

    #[test]
    fn test_gamma_is_preserved() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::new(0.0, 0.0, 15.0));
        input.handle(PointerEvent::Down([0.0, 0.0]), &mut projector, &mut renderer);
        input.handle(PointerEvent::Move([-30.0, 12.0]), &mut projector, &mut renderer);
        assert_eq!(projector.rotation().gamma, 15.0);
    }

    #[test]
    fn test_move_while_idle_is_noop() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::new(5.0, 5.0, 0.0));
        let outcome = input.handle(PointerEvent::Move([300.0, 300.0]), &mut projector, &mut renderer);
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(projector.rotation(), Rotation::new(5.0, 5.0, 0.0));
        assert_eq!(input.handle(PointerEvent::Up, &mut projector, &mut renderer), InputOutcome::Ignored);
    }

    #[test]
    fn test_release_ends_gesture() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::default());
        input.handle(PointerEvent::Down([0.0, 0.0]), &mut projector, &mut renderer);
        input.handle(PointerEvent::Move([10.0, 0.0]), &mut projector, &mut renderer);
        input.handle(PointerEvent::Up, &mut projector, &mut renderer);
        assert_eq!(input.state, DragState::Idle);

        input.handle(PointerEvent::Move([100.0, 100.0]), &mut projector, &mut renderer);
        assert_eq!(projector.rotation(), Rotation::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn test_second_press_keeps_anchor() {
        let (mut input, mut projector, mut renderer) = setup(Rotation::default());
        input.handle(PointerEvent::Down([0.0, 0.0]), &mut projector, &mut renderer);
        let outcome = input.handle(PointerEvent::Down([50.0, 50.0]), &mut projector, &mut renderer);
        assert_eq!(outcome, InputOutcome::Ignored);

        input.handle(PointerEvent::Move([10.0, 10.0]), &mut projector, &mut renderer);
        assert_eq!(projector.rotation(), Rotation::new(-10.0, 10.0, 0.0));
    }
}
