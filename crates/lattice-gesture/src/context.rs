//! The gesture service for one window.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lattice_gesture_core::{ThreadAffinity, TimerDriver, TimerQueue};

use crate::arena_manager::GestureArenaManager;
use crate::callback::{CallbackHandle, GestureAction};
use crate::config::GestureConfig;
use crate::detail::GestureDetail;
use crate::error::{GestureError, Result};
use crate::handler::GestureBinding;
use crate::hit_test::{HitTestResult, hit_test};
use crate::logging::targets;
use crate::pointer::{PointerAction, PointerEvent, PointerId};
use crate::recognizer::{GestureTarget, Recognizer, RecognizerEnv, RecognizerKind};
use crate::widget::{WidgetId, WidgetTree};

/// Owns the arena manager, recognizer registry and gesture timers of one
/// window, and turns raw pointer events into gesture callbacks.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Instant;
///
/// use lattice_gesture::{
///     GestureContext, Point, PointerAction, PointerEvent, PointerKind, Rect, WidgetId,
///     WidgetTree,
/// };
///
/// struct Single;
///
/// impl WidgetTree for Single {
///     fn children(&self, _widget: WidgetId) -> Vec<WidgetId> {
///         Vec::new()
///     }
///     fn bounds(&self, _widget: WidgetId) -> Option<Rect> {
///         Some(Rect::new(0.0, 0.0, 100.0, 100.0))
///     }
/// }
///
/// let context = GestureContext::default();
/// let button = WidgetId(1);
/// let taps = Rc::new(Cell::new(0));
/// let counter = taps.clone();
/// context.on_tap(button, move |_| counter.set(counter.get() + 1)).unwrap();
///
/// let now = Instant::now();
/// for action in [PointerAction::Down, PointerAction::Up] {
///     let event = PointerEvent::new(1, PointerKind::Mouse, action, Point::new(5.0, 5.0), now);
///     context.handle_pointer_event(&Single, button, &event).unwrap();
/// }
/// assert_eq!(taps.get(), 1);
/// ```
pub struct GestureContext {
    config: Rc<GestureConfig>,
    arena: Rc<GestureArenaManager>,
    timers: Rc<TimerQueue>,
    binding: GestureBinding,
    hit_tests: RefCell<HashMap<PointerId, HitTestResult>>,
    affinity: ThreadAffinity,
}

static_assertions::assert_not_impl_any!(GestureContext: Send, Sync);

impl Default for GestureContext {
    fn default() -> Self {
        Self::with_valid_config(GestureConfig::default())
    }
}

impl GestureContext {
    /// Create a context bound to the current thread.
    pub fn new(config: GestureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: GestureConfig) -> Self {
        Self {
            config: Rc::new(config),
            arena: Rc::new(GestureArenaManager::new()),
            timers: TimerQueue::new(),
            binding: GestureBinding::new(),
            hit_tests: RefCell::new(HashMap::new()),
            affinity: ThreadAffinity::current(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn arena_manager(&self) -> &Rc<GestureArenaManager> {
        &self.arena
    }

    pub fn binding(&self) -> &GestureBinding {
        &self.binding
    }

    pub fn timers(&self) -> &Rc<TimerQueue> {
        &self.timers
    }

    /// Services for recognizers created outside the `on_*` helpers.
    pub fn recognizer_env(&self) -> RecognizerEnv {
        RecognizerEnv::new(self.arena.clone(), self.timers.clone(), self.config.clone())
    }

    /// Let `driver` wake the host loop whenever a gesture timer is due.
    pub fn attach_timer_driver(&self, driver: &TimerDriver) {
        driver.attach(&self.timers);
    }

    pub fn on_tap(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::Tap, callback)
    }

    pub fn on_tap_down(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::TapDown, callback)
    }

    pub fn on_tap_up(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::TapUp, callback)
    }

    pub fn on_tap_cancel(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::TapCancel, callback)
    }

    pub fn on_double_tap(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::DoubleTap, callback)
    }

    pub fn on_long_press(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::LongPress, callback)
    }

    pub fn on_long_press_move(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::LongPressMove, callback)
    }

    pub fn on_long_press_up(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::LongPressUp, callback)
    }

    pub fn on_long_press_cancel(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::LongPressCancel, callback)
    }

    pub fn on_pan_down(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::PanDown, callback)
    }

    pub fn on_pan_update(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::PanUpdate, callback)
    }

    pub fn on_pan_up(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::PanUp, callback)
    }

    pub fn on_pan_cancel(
        &self,
        widget: WidgetId,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.register(widget, GestureAction::PanCancel, callback)
    }

    /// Register `callback` for `action` on the widget's recognizer of the
    /// matching kind, creating the recognizer on first use.
    pub fn register(
        &self,
        widget: WidgetId,
        action: GestureAction,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Result<CallbackHandle> {
        self.affinity.debug_assert_owner();
        let recognizer = self.recognizer_for(widget, action.recognizer_kind())?;
        let id = recognizer.callbacks().add(action, Rc::new(callback));
        tracing::trace!(target: targets::DISPATCH, %widget, %action, "callback registered");
        Ok(CallbackHandle { widget, action, id })
    }

    fn recognizer_for(&self, widget: WidgetId, kind: RecognizerKind) -> Result<Recognizer> {
        if let Some(existing) = self.binding.find_gesture_recognizer(widget, kind) {
            return Ok(existing);
        }
        let recognizer = Recognizer::new(kind, GestureTarget::new(widget), self.recognizer_env());
        self.binding.add_gesture_recognizer(widget, recognizer.clone())?;
        Ok(recognizer)
    }

    /// Remove one callback. Returns `false` if it was already gone.
    pub fn remove_callback(&self, handle: CallbackHandle) -> bool {
        self.binding
            .find_gesture_recognizer(handle.widget, handle.kind())
            .is_some_and(|recognizer| recognizer.remove_callback(handle.action, handle.id))
    }

    /// Drop every recognizer and callback of a destroyed widget.
    pub fn clear_widget(&self, widget: WidgetId) -> bool {
        self.affinity.debug_assert_owner();
        self.binding.clear_widget(widget)
    }

    /// Feed one pointer event through hit testing and the gesture arena.
    ///
    /// Gesture timers due at or before `event.time` fire first. Down
    /// hit-tests `root`'s subtree, dispatches to every hit widget and closes
    /// the pointer's arena. Move reuses that hit-test result. Up
    /// dispatches and then sweeps the arena. Events for a pointer with no
    /// recorded down are ignored.
    #[tracing::instrument(
        skip_all,
        target = "lattice_gesture::dispatch",
        level = "trace",
        fields(pointer = %event.pointer, action = ?event.action)
    )]
    pub fn handle_pointer_event<T: WidgetTree + ?Sized>(
        &self,
        tree: &T,
        root: WidgetId,
        event: &PointerEvent,
    ) -> Result<()> {
        self.affinity.assert_owner("pointer event dispatch");
        let pointer = event.pointer;

        // Deadlines that lapsed before this event happened come first.
        let expired = self.timers.process_expired(event.time);
        if expired > 0 {
            tracing::trace!(target: targets::DISPATCH, %pointer, expired, "caught up on gesture timers");
        }

        match event.action {
            PointerAction::Down => {
                if self.hit_tests.borrow().contains_key(&pointer) {
                    tracing::error!(target: targets::DISPATCH, %pointer, "pointer down without a matching up");
                    return Err(GestureError::HitTestExists { pointer });
                }
                let result = hit_test(tree, root, event.position, &self.binding);
                self.hit_tests.borrow_mut().insert(pointer, result.clone());
                let dispatched = self.dispatch(&result, event);
                let closed = self.arena.close(pointer);
                dispatched.and(closed)
            }
            PointerAction::Move => {
                let result = self.hit_tests.borrow().get(&pointer).cloned();
                match result {
                    Some(result) => self.dispatch(&result, event),
                    None => {
                        tracing::trace!(target: targets::DISPATCH, %pointer, "move without down ignored");
                        Ok(())
                    }
                }
            }
            PointerAction::Up => {
                let result = self.hit_tests.borrow_mut().remove(&pointer);
                match result {
                    Some(result) => {
                        let dispatched = self.dispatch(&result, event);
                        let swept = self.arena.sweep(pointer);
                        dispatched.and(swept)
                    }
                    None => {
                        tracing::trace!(target: targets::DISPATCH, %pointer, "up without down ignored");
                        Ok(())
                    }
                }
            }
        }
    }

    fn dispatch(&self, result: &HitTestResult, event: &PointerEvent) -> Result<()> {
        let mut outcome = Ok(());
        for widget in result.iter() {
            let Some(handler) = self.binding.find_handler(widget) else {
                continue;
            };
            if let Err(err) = handler.handle_pointer_event(event)
                && outcome.is_ok()
            {
                outcome = Err(err);
            }
        }
        outcome
    }

    /// Whether a down has been seen for `pointer` without its up.
    pub fn is_tracking(&self, pointer: PointerId) -> bool {
        self.hit_tests.borrow().contains_key(&pointer)
    }

    /// Run every gesture timer due at `now`. Returns how many fired.
    pub fn process_timers(&self, now: Instant) -> usize {
        self.timers.process_expired(now)
    }

    /// Time until the next gesture timer is due, if any.
    pub fn time_until_next_timer(&self, now: Instant) -> Option<Duration> {
        self.timers.time_until_next(now)
    }
}

impl std::fmt::Debug for GestureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureContext")
            .field("config", &self.config)
            .field("arenas", &self.arena.len())
            .field("widgets", &self.binding.len())
            .field("pointers", &self.hit_tests.borrow().len())
            .finish()
    }
}
