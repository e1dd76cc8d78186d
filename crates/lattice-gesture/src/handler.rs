//! Per-widget recognizer registries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use lattice_gesture_core::Point;

use crate::error::{GestureError, Result};
use crate::logging::targets;
use crate::pointer::PointerEvent;
use crate::recognizer::{Recognizer, RecognizerKind};
use crate::widget::WidgetId;

/// The recognizers attached to one widget, at most one per kind.
#[derive(Debug)]
pub struct GestureHandler {
    widget: WidgetId,
    recognizers: RefCell<Vec<Recognizer>>,
}

impl GestureHandler {
    pub fn new(widget: WidgetId) -> Self {
        Self {
            widget,
            recognizers: RefCell::new(Vec::new()),
        }
    }

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    /// Attach a recognizer. Fails if one of the same kind is already attached.
    pub fn add_gesture_recognizer(&self, recognizer: Recognizer) -> Result<()> {
        let kind = recognizer.kind();
        let mut recognizers = self.recognizers.borrow_mut();
        if recognizers.iter().any(|r| r.kind() == kind) {
            tracing::error!(
                target: targets::DISPATCH,
                widget = %self.widget,
                %kind,
                "recognizer already registered"
            );
            return Err(GestureError::DuplicateRecognizer {
                widget: self.widget,
                kind,
            });
        }
        recognizers.push(recognizer);
        Ok(())
    }

    /// Detach the recognizer of `kind`, clearing its callbacks and timers.
    pub fn remove_gesture_recognizer(&self, kind: RecognizerKind) -> Option<Recognizer> {
        let removed = {
            let mut recognizers = self.recognizers.borrow_mut();
            let index = recognizers.iter().position(|r| r.kind() == kind)?;
            recognizers.remove(index)
        };
        removed.as_dyn().clear();
        Some(removed)
    }

    pub fn find_gesture_recognizer(&self, kind: RecognizerKind) -> Option<Recognizer> {
        self.recognizers
            .borrow()
            .iter()
            .find(|r| r.kind() == kind)
            .cloned()
    }

    /// Recognizers in registration order.
    pub fn recognizers(&self) -> Vec<Recognizer> {
        self.recognizers.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.borrow().is_empty()
    }

    /// Record where the widget sat when it was last hit-tested.
    pub fn set_origin(&self, origin: Point) {
        for recognizer in self.recognizers.borrow().iter() {
            recognizer.gesture_target().set_origin(origin);
        }
    }

    /// Forward `event` to every recognizer that allows it, in registration
    /// order.
    ///
    /// Every allowed recognizer sees the event even if an earlier one fails;
    /// the first error is returned.
    pub fn handle_pointer_event(&self, event: &PointerEvent) -> Result<()> {
        let mut result = Ok(());
        for recognizer in self.recognizers() {
            let recognizer = recognizer.as_dyn();
            if !recognizer.pointer_allowed(event) {
                continue;
            }
            if let Err(err) = recognizer.handle_allowed_pointer(event)
                && result.is_ok()
            {
                result = Err(err);
            }
        }
        result
    }

    /// Clear and detach every recognizer.
    pub fn clear(&self) {
        let recognizers = std::mem::take(&mut *self.recognizers.borrow_mut());
        for recognizer in recognizers {
            recognizer.as_dyn().clear();
        }
    }
}

/// Maps widgets to their gesture handlers.
#[derive(Debug, Default)]
pub struct GestureBinding {
    handlers: RefCell<HashMap<WidgetId, Rc<GestureHandler>>>,
}

impl GestureBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_handler(&self, widget: WidgetId) -> Option<Rc<GestureHandler>> {
        self.handlers.borrow().get(&widget).cloned()
    }

    /// Attach `recognizer` to `widget`, creating the widget's handler if needed.
    pub fn add_gesture_recognizer(&self, widget: WidgetId, recognizer: Recognizer) -> Result<()> {
        let handler = self
            .handlers
            .borrow_mut()
            .entry(widget)
            .or_insert_with(|| Rc::new(GestureHandler::new(widget)))
            .clone();
        handler.add_gesture_recognizer(recognizer)
    }

    pub fn find_gesture_recognizer(
        &self,
        widget: WidgetId,
        kind: RecognizerKind,
    ) -> Option<Recognizer> {
        self.find_handler(widget)?.find_gesture_recognizer(kind)
    }

    /// Detach one recognizer. The handler goes away with its last recognizer.
    pub fn remove_gesture_recognizer(
        &self,
        widget: WidgetId,
        kind: RecognizerKind,
    ) -> Option<Recognizer> {
        let handler = self.find_handler(widget)?;
        let removed = handler.remove_gesture_recognizer(kind);
        if handler.is_empty() {
            self.handlers.borrow_mut().remove(&widget);
        }
        removed
    }

    /// Drop everything registered for a destroyed widget.
    ///
    /// Returns `false` if the widget had no handler.
    pub fn clear_widget(&self, widget: WidgetId) -> bool {
        let handler = self.handlers.borrow_mut().remove(&widget);
        match handler {
            Some(handler) => {
                tracing::trace!(target: targets::DISPATCH, %widget, "gesture handler cleared");
                handler.clear();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, widget: WidgetId) -> bool {
        self.handlers.borrow().contains_key(&widget)
    }

    /// Number of widgets with a handler.
    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }
}
