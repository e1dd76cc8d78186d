//! Data passed to gesture callbacks.

use std::time::Instant;

use lattice_gesture_core::Point;

use crate::pointer::{PointerEvent, PointerId, PointerKind};
use crate::widget::WidgetId;

/// Describes the pointer sample behind a recognized gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDetail {
    /// Widget the recognizer is attached to.
    pub target: WidgetId,
    pub pointer: PointerId,
    pub time: Instant,
    pub kind: PointerKind,
    /// Position relative to the target's origin at hit-test time.
    pub position: Point,
    /// Position in window coordinates.
    pub window_position: Point,
}

impl GestureDetail {
    /// Build a detail from `event` for a target whose origin is `origin`.
    pub fn from_event(target: WidgetId, origin: Point, event: &PointerEvent) -> Self {
        Self {
            target,
            pointer: event.pointer,
            time: event.time,
            kind: event.kind,
            position: event.position.relative_to(origin),
            window_position: event.position,
        }
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn window_x(&self) -> f32 {
        self.window_position.x
    }

    pub fn window_y(&self) -> f32 {
        self.window_position.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerAction;

    #[test]
    fn test_local_position() {
        let event = PointerEvent::new(
            3,
            PointerKind::Mouse,
            PointerAction::Up,
            Point::new(25.0, 40.0),
            Instant::now(),
        );
        let detail = GestureDetail::from_event(WidgetId(9), Point::new(20.0, 30.0), &event);
        assert_eq!(detail.target, WidgetId(9));
        assert_eq!((detail.x(), detail.y()), (5.0, 10.0));
        assert_eq!((detail.window_x(), detail.window_y()), (25.0, 40.0));
        assert_eq!(detail.pointer, PointerId(3));
    }
}
