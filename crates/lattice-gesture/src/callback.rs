//! Gesture callback storage and registration handles.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::detail::GestureDetail;
use crate::recognizer::RecognizerKind;
use crate::widget::WidgetId;

new_key_type! {
    /// Identifies one registered callback within its action list.
    pub struct CallbackId;
}

/// A gesture callback.
pub type GestureCallback = Rc<dyn Fn(&GestureDetail)>;

/// Every callback slot a recognizer can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureAction {
    TapDown,
    TapUp,
    Tap,
    TapCancel,
    DoubleTap,
    LongPress,
    LongPressMove,
    LongPressUp,
    LongPressCancel,
    PanDown,
    PanUpdate,
    PanUp,
    PanCancel,
}

impl GestureAction {
    /// The recognizer that fires this action.
    pub fn recognizer_kind(self) -> RecognizerKind {
        match self {
            Self::TapDown | Self::TapUp | Self::Tap | Self::TapCancel => RecognizerKind::Tap,
            Self::DoubleTap => RecognizerKind::DoubleTap,
            Self::LongPress | Self::LongPressMove | Self::LongPressUp | Self::LongPressCancel => {
                RecognizerKind::LongPress
            }
            Self::PanDown | Self::PanUpdate | Self::PanUp | Self::PanCancel => RecognizerKind::Pan,
        }
    }
}

impl fmt::Display for GestureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TapDown => "tap-down",
            Self::TapUp => "tap-up",
            Self::Tap => "tap",
            Self::TapCancel => "tap-cancel",
            Self::DoubleTap => "double-tap",
            Self::LongPress => "long-press",
            Self::LongPressMove => "long-press-move",
            Self::LongPressUp => "long-press-up",
            Self::LongPressCancel => "long-press-cancel",
            Self::PanDown => "pan-down",
            Self::PanUpdate => "pan-update",
            Self::PanUp => "pan-up",
            Self::PanCancel => "pan-cancel",
        };
        f.write_str(name)
    }
}

/// Returned by every callback registration; pass it back to remove the
/// callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle {
    pub widget: WidgetId,
    pub action: GestureAction,
    pub id: CallbackId,
}

impl CallbackHandle {
    /// The kind of recognizer the callback is registered on.
    pub fn kind(&self) -> RecognizerKind {
        self.action.recognizer_kind()
    }
}

/// Callbacks for one action, fired in registration order.
#[derive(Default)]
struct CallbackList {
    callbacks: SlotMap<CallbackId, GestureCallback>,
    order: Vec<CallbackId>,
}

impl CallbackList {
    fn add(&mut self, callback: GestureCallback) -> CallbackId {
        let id = self.callbacks.insert(callback);
        self.order.push(id);
        id
    }

    fn remove(&mut self, id: CallbackId) -> bool {
        if self.callbacks.remove(id).is_none() {
            return false;
        }
        self.order.retain(|&existing| existing != id);
        true
    }

    fn snapshot(&self) -> Vec<GestureCallback> {
        self.order
            .iter()
            .filter_map(|id| self.callbacks.get(*id).cloned())
            .collect()
    }
}

/// Per-recognizer callback lists, keyed by action.
///
/// Callbacks run with no internal borrow held, so they may register or remove
/// callbacks. A callback added while an action fires runs from the next fire.
#[derive(Default)]
pub(crate) struct CallbackRegistry {
    lists: RefCell<HashMap<GestureAction, CallbackList>>,
}

impl CallbackRegistry {
    pub(crate) fn add(&self, action: GestureAction, callback: GestureCallback) -> CallbackId {
        self.lists
            .borrow_mut()
            .entry(action)
            .or_default()
            .add(callback)
    }

    pub(crate) fn remove(&self, action: GestureAction, id: CallbackId) -> bool {
        self.lists
            .borrow_mut()
            .get_mut(&action)
            .is_some_and(|list| list.remove(id))
    }

    pub(crate) fn clear(&self) {
        self.lists.borrow_mut().clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lists
            .borrow()
            .values()
            .all(|list| list.callbacks.is_empty())
    }

    pub(crate) fn has(&self, action: GestureAction) -> bool {
        self.lists
            .borrow()
            .get(&action)
            .is_some_and(|list| !list.callbacks.is_empty())
    }

    pub(crate) fn emit(&self, action: GestureAction, detail: &GestureDetail) {
        let callbacks = match self.lists.borrow().get(&action) {
            Some(list) => list.snapshot(),
            None => return,
        };
        for callback in callbacks {
            callback(detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::{PointerAction, PointerEvent, PointerKind};
    use lattice_gesture_core::Point;
    use std::time::Instant;

    fn detail() -> GestureDetail {
        let event = PointerEvent::new(
            1,
            PointerKind::Mouse,
            PointerAction::Up,
            Point::ZERO,
            Instant::now(),
        );
        GestureDetail::from_event(WidgetId(1), Point::ZERO, &event)
    }

    #[test]
    fn test_emit_in_registration_order() {
        let registry = CallbackRegistry::default();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut ids = Vec::new();
        for n in 0..3 {
            let seen = seen.clone();
            ids.push(registry.add(
                GestureAction::Tap,
                Rc::new(move |_: &GestureDetail| seen.borrow_mut().push(n)),
            ));
        }
        assert!(registry.remove(GestureAction::Tap, ids[1]));
        let seen_late = seen.clone();
        registry.add(
            GestureAction::Tap,
            Rc::new(move |_: &GestureDetail| seen_late.borrow_mut().push(9)),
        );

        registry.emit(GestureAction::Tap, &detail());
        assert_eq!(*seen.borrow(), vec![0, 2, 9]);
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = CallbackRegistry::default();
        assert!(registry.is_empty());

        let id = registry.add(GestureAction::TapDown, Rc::new(|_: &GestureDetail| {}));
        assert!(registry.has(GestureAction::TapDown));
        assert!(!registry.remove(GestureAction::TapUp, id));
        assert!(registry.remove(GestureAction::TapDown, id));
        assert!(!registry.remove(GestureAction::TapDown, id));
        assert!(registry.is_empty());

        registry.add(GestureAction::PanUp, Rc::new(|_: &GestureDetail| {}));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_callback_may_register_during_emit() {
        let registry = Rc::new(CallbackRegistry::default());
        let inner = registry.clone();
        registry.add(
            GestureAction::PanUpdate,
            Rc::new(move |_: &GestureDetail| {
                inner.add(GestureAction::PanUpdate, Rc::new(|_: &GestureDetail| {}));
            }),
        );
        registry.emit(GestureAction::PanUpdate, &detail());
        assert_eq!(
            registry.lists.borrow()[&GestureAction::PanUpdate].order.len(),
            2
        );
    }

    #[test]
    fn test_action_kind() {
        assert_eq!(GestureAction::TapCancel.recognizer_kind(), RecognizerKind::Tap);
        assert_eq!(GestureAction::PanUpdate.recognizer_kind(), RecognizerKind::Pan);
        assert_eq!(GestureAction::LongPressUp.recognizer_kind(), RecognizerKind::LongPress);
        assert_eq!(GestureAction::DoubleTap.to_string(), "double-tap");
    }
}
