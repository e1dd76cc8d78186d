//! Pointer events delivered by the host input layer.

use std::fmt;
use std::time::Instant;

use lattice_gesture_core::Point;

/// Identifies one continuous touch or mouse-button contact.
///
/// Stable from down to up. Ids may be reused by later contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u64);

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PointerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Mouse or trackpad button.
    Mouse,
    /// Finger on a touch screen.
    Touch,
    /// Stylus.
    Pen,
}

impl PointerKind {
    /// Whether the device makes direct contact with the screen.
    ///
    /// Direct-contact input delays tap-down feedback.
    pub fn is_direct_contact(self) -> bool {
        matches!(self, Self::Touch | Self::Pen)
    }
}

/// Phase of a pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    /// Contact started.
    Down,
    /// Contact moved (drag).
    Move,
    /// Contact ended.
    Up,
}

/// One sample of a pointer interaction, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub kind: PointerKind,
    pub action: PointerAction,
    pub position: Point,
    /// True for the primary mouse button or the first touch contact.
    pub is_primary: bool,
    pub time: Instant,
}

impl PointerEvent {
    /// Creates a primary pointer event.
    pub fn new(
        pointer: impl Into<PointerId>,
        kind: PointerKind,
        action: PointerAction,
        position: Point,
        time: Instant,
    ) -> Self {
        Self {
            pointer: pointer.into(),
            kind,
            action,
            position,
            is_primary: true,
            time,
        }
    }

    /// Marks the event as coming from a secondary button or touch.
    pub fn secondary(mut self) -> Self {
        self.is_primary = false;
        self
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Distance between this event and a point.
    pub fn distance_to(&self, point: Point) -> f32 {
        self.position.distance_to(point)
    }

    /// Distance between the positions of two events.
    pub fn distance_from(&self, other: &PointerEvent) -> f32 {
        self.position.distance_to(other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let now = Instant::now();
        let event = PointerEvent::new(7, PointerKind::Touch, PointerAction::Down, Point::new(3.0, 4.0), now);
        assert_eq!(event.pointer, PointerId(7));
        assert!(event.is_primary);
        assert_eq!(event.distance_to(Point::ZERO), 5.0);
        assert!(!event.secondary().is_primary);
    }

    #[test]
    fn test_direct_contact() {
        assert!(PointerKind::Touch.is_direct_contact());
        assert!(PointerKind::Pen.is_direct_contact());
        assert!(!PointerKind::Mouse.is_direct_contact());
    }

    #[test]
    fn test_pointer_id_display() {
        assert_eq!(PointerId(42).to_string(), "#42");
    }
}
