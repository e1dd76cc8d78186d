//! Finding the gesture-aware widgets under a point.

use lattice_gesture_core::Point;

use crate::error::{GestureError, Result};
use crate::handler::GestureBinding;
use crate::logging::targets;
use crate::widget::{WidgetId, WidgetTree};

/// Widgets under a pointer, deepest first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitTestResult {
    widgets: Vec<WidgetId>,
}

impl HitTestResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a widget. A widget can be in the result only once.
    pub fn add(&mut self, widget: WidgetId) -> Result<()> {
        if self.contains(widget) {
            return Err(GestureError::DuplicateHitTarget { widget });
        }
        self.widgets.push(widget);
        Ok(())
    }

    pub fn remove(&mut self, widget: WidgetId) -> bool {
        match self.widgets.iter().position(|&w| w == widget) {
            Some(index) => {
                self.widgets.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, widget: WidgetId) -> bool {
        self.widgets.contains(&widget)
    }

    pub fn widgets(&self) -> &[WidgetId] {
        &self.widgets
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.widgets.iter().copied()
    }
}

/// Collect every widget with a gesture handler whose bounds contain `point`.
///
/// Children are tested before their parent, front-most child first, and even
/// when the parent itself misses (children may overflow). Each hit widget's
/// origin is recorded on its handler for widget-local callback positions.
pub fn hit_test<T: WidgetTree + ?Sized>(
    tree: &T,
    root: WidgetId,
    point: Point,
    binding: &GestureBinding,
) -> HitTestResult {
    let mut result = HitTestResult::new();
    hit_test_recursive(tree, root, point, binding, &mut result);
    tracing::trace!(target: targets::HIT_TEST, ?point, hits = result.len(), "hit test");
    result
}

fn hit_test_recursive<T: WidgetTree + ?Sized>(
    tree: &T,
    widget: WidgetId,
    point: Point,
    binding: &GestureBinding,
    result: &mut HitTestResult,
) {
    let Some(bounds) = tree.bounds(widget) else {
        return;
    };

    for child in tree.children(widget).into_iter().rev() {
        hit_test_recursive(tree, child, point, binding, result);
    }

    if !bounds.contains(point) {
        return;
    }
    if let Some(handler) = binding.find_handler(widget) {
        match result.add(widget) {
            Ok(()) => handler.set_origin(bounds.origin),
            Err(err) => {
                tracing::warn!(target: targets::HIT_TEST, %widget, %err, "widget reached twice");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_rejects_duplicates() {
        let mut result = HitTestResult::new();
        result.add(WidgetId(1)).unwrap();
        result.add(WidgetId(2)).unwrap();
        assert!(matches!(
            result.add(WidgetId(1)),
            Err(GestureError::DuplicateHitTarget { widget }) if widget == WidgetId(1)
        ));
        assert_eq!(result.widgets(), &[WidgetId(1), WidgetId(2)]);

        assert!(result.remove(WidgetId(1)));
        assert!(!result.remove(WidgetId(1)));
        assert_eq!(result.iter().collect::<Vec<_>>(), vec![WidgetId(2)]);
    }
}
