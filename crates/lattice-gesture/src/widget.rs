//! The widget-tree view the gesture system needs from its host.

use std::fmt;

use lattice_gesture_core::Rect;

/// Identifies a widget in the host's tree.
///
/// The gesture system never owns widgets; an id is a weak reference that the
/// host keeps meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl From<u64> for WidgetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Read access to the host's widget tree for hit testing.
pub trait WidgetTree {
    /// Children of `widget`, back-most first.
    fn children(&self, widget: WidgetId) -> Vec<WidgetId>;

    /// Bounds of `widget` in window coordinates, or `None` if it has not been
    /// laid out (the widget and its subtree are skipped).
    fn bounds(&self, widget: WidgetId) -> Option<Rect>;
}
