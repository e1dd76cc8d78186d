//! Gesture recognizers.
//!
//! A recognizer is a small state machine attached to one widget. It watches
//! the pointer events routed to that widget, competes in the pointer's
//! [gesture arena](crate::GestureArenaManager) and fires callbacks once it
//! wins (or loses after reporting progress).
//!
//! The set of recognizers is closed: [`RecognizerKind`] names them and
//! [`Recognizer`] holds one of them.

mod double_tap;
mod long_press;
mod pan;
mod tap;

pub use double_tap::DoubleTapGestureRecognizer;
pub use long_press::LongPressGestureRecognizer;
pub use pan::PanGestureRecognizer;
pub use tap::TapGestureRecognizer;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use lattice_gesture_core::{Point, Timer, TimerQueue};

use crate::arena::GestureArenaMember;
use crate::arena_manager::GestureArenaManager;
use crate::callback::{CallbackId, CallbackRegistry, GestureAction};
use crate::config::GestureConfig;
use crate::detail::GestureDetail;
use crate::error::Result;
use crate::pointer::PointerEvent;
use crate::widget::WidgetId;

/// Progress of a recognizer through one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    /// Idle, not tracking a pointer.
    #[default]
    Ready,
    /// Tracking a pointer, outcome not yet decided.
    Possible,
    /// Won the arena; the gesture is in progress.
    Accepted,
}

/// The closed set of recognizer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognizerKind {
    Tap,
    DoubleTap,
    LongPress,
    Pan,
}

impl fmt::Display for RecognizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tap => "tap",
            Self::DoubleTap => "double-tap",
            Self::LongPress => "long-press",
            Self::Pan => "pan",
        })
    }
}

/// Behavior shared by every recognizer.
pub trait GestureRecognizer: GestureArenaMember {
    fn kind(&self) -> RecognizerKind;

    /// Widget this recognizer is attached to.
    fn target(&self) -> WidgetId;

    fn state(&self) -> GestureState;

    /// Whether `event` should be handed to
    /// [`handle_allowed_pointer`](Self::handle_allowed_pointer).
    ///
    /// A recognizer without callbacks, or a non-primary event, is not
    /// allowed.
    fn pointer_allowed(&self, event: &PointerEvent) -> bool;

    /// Advance the state machine with an allowed event.
    fn handle_allowed_pointer(&self, event: &PointerEvent) -> Result<()>;

    /// Drop every callback, cancel timers and return to [`GestureState::Ready`].
    fn clear(&self);
}

/// Services every recognizer of a gesture context shares.
#[derive(Clone)]
pub struct RecognizerEnv {
    arena: Rc<GestureArenaManager>,
    timers: Rc<TimerQueue>,
    config: Rc<GestureConfig>,
}

impl RecognizerEnv {
    pub fn new(
        arena: Rc<GestureArenaManager>,
        timers: Rc<TimerQueue>,
        config: Rc<GestureConfig>,
    ) -> Self {
        Self {
            arena,
            timers,
            config,
        }
    }

    pub fn arena(&self) -> &Rc<GestureArenaManager> {
        &self.arena
    }

    pub fn timers(&self) -> &Rc<TimerQueue> {
        &self.timers
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}

impl fmt::Debug for RecognizerEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognizerEnv")
            .field("arenas", &self.arena.len())
            .field("timers", &self.timers.active_count())
            .field("config", &self.config)
            .finish()
    }
}

/// The widget a recognizer reports to, and its origin at the last hit test.
#[derive(Debug)]
pub struct GestureTarget {
    widget: WidgetId,
    origin: Cell<Point>,
}

impl GestureTarget {
    pub fn new(widget: WidgetId) -> Rc<Self> {
        Rc::new(Self {
            widget,
            origin: Cell::new(Point::ZERO),
        })
    }

    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    pub fn origin(&self) -> Point {
        self.origin.get()
    }

    pub fn set_origin(&self, origin: Point) {
        self.origin.set(origin);
    }

    /// Describe `event` relative to this target.
    pub fn detail(&self, event: &PointerEvent) -> GestureDetail {
        GestureDetail::from_event(self.widget, self.origin(), event)
    }
}

/// The one pending timer a recognizer may own.
///
/// Every [`arm`](Self::arm) bumps a generation so a callback from a timer
/// that was replaced or cancelled can tell it is stale.
#[derive(Default)]
pub(crate) struct TimerSlot {
    current: RefCell<Option<Timer>>,
    generation: Cell<u64>,
}

impl TimerSlot {
    /// Cancel any pending timer and return the generation for the next one.
    pub(crate) fn arm(&self) -> u64 {
        self.cancel();
        self.generation.get()
    }

    pub(crate) fn set(&self, timer: Timer) {
        *self.current.borrow_mut() = Some(timer);
    }

    /// Called from a timer callback. True if the timer of `generation` is
    /// still the pending one; the slot is emptied.
    pub(crate) fn fired(&self, generation: u64) -> bool {
        if generation != self.generation.get() {
            return false;
        }
        self.current.borrow_mut().take().is_some()
    }

    pub(crate) fn cancel(&self) {
        if let Some(timer) = self.current.borrow_mut().take() {
            timer.cancel();
        }
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.current.borrow().is_some()
    }
}

/// One recognizer of any kind.
#[derive(Clone)]
pub enum Recognizer {
    Tap(Rc<TapGestureRecognizer>),
    DoubleTap(Rc<DoubleTapGestureRecognizer>),
    LongPress(Rc<LongPressGestureRecognizer>),
    Pan(Rc<PanGestureRecognizer>),
}

impl Recognizer {
    /// Create an empty recognizer of `kind` for `target`.
    pub fn new(kind: RecognizerKind, target: Rc<GestureTarget>, env: RecognizerEnv) -> Self {
        match kind {
            RecognizerKind::Tap => Self::Tap(TapGestureRecognizer::new(target, env)),
            RecognizerKind::DoubleTap => {
                Self::DoubleTap(DoubleTapGestureRecognizer::new(target, env))
            }
            RecognizerKind::LongPress => {
                Self::LongPress(LongPressGestureRecognizer::new(target, env))
            }
            RecognizerKind::Pan => Self::Pan(PanGestureRecognizer::new(target, env)),
        }
    }

    pub fn kind(&self) -> RecognizerKind {
        self.as_dyn().kind()
    }

    /// Borrow as the shared recognizer interface.
    pub fn as_dyn(&self) -> &dyn GestureRecognizer {
        match self {
            Self::Tap(r) => r.as_ref(),
            Self::DoubleTap(r) => r.as_ref(),
            Self::LongPress(r) => r.as_ref(),
            Self::Pan(r) => r.as_ref(),
        }
    }

    /// The target this recognizer reports to.
    pub fn gesture_target(&self) -> &Rc<GestureTarget> {
        match self {
            Self::Tap(r) => &r.target,
            Self::DoubleTap(r) => &r.target,
            Self::LongPress(r) => &r.target,
            Self::Pan(r) => &r.target,
        }
    }

    pub fn as_tap(&self) -> Option<&Rc<TapGestureRecognizer>> {
        match self {
            Self::Tap(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_double_tap(&self) -> Option<&Rc<DoubleTapGestureRecognizer>> {
        match self {
            Self::DoubleTap(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_long_press(&self) -> Option<&Rc<LongPressGestureRecognizer>> {
        match self {
            Self::LongPress(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_pan(&self) -> Option<&Rc<PanGestureRecognizer>> {
        match self {
            Self::Pan(r) => Some(r),
            _ => None,
        }
    }

    /// Register a callback. `None` if this recognizer never fires `action`.
    pub fn add_callback(
        &self,
        action: GestureAction,
        callback: impl Fn(&GestureDetail) + 'static,
    ) -> Option<CallbackId> {
        if action.recognizer_kind() != self.kind() {
            return None;
        }
        Some(self.callbacks().add(action, Rc::new(callback)))
    }

    /// Remove a callback registered with [`add_callback`](Self::add_callback).
    pub fn remove_callback(&self, action: GestureAction, id: CallbackId) -> bool {
        self.callbacks().remove(action, id)
    }

    pub(crate) fn callbacks(&self) -> &CallbackRegistry {
        match self {
            Self::Tap(r) => &r.callbacks,
            Self::DoubleTap(r) => &r.callbacks,
            Self::LongPress(r) => &r.callbacks,
            Self::Pan(r) => &r.callbacks,
        }
    }
}

impl fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recognizer = self.as_dyn();
        f.debug_struct("Recognizer")
            .field("kind", &recognizer.kind())
            .field("target", &recognizer.target())
            .field("state", &recognizer.state())
            .finish()
    }
}

impl From<Rc<TapGestureRecognizer>> for Recognizer {
    fn from(r: Rc<TapGestureRecognizer>) -> Self {
        Self::Tap(r)
    }
}

impl From<Rc<DoubleTapGestureRecognizer>> for Recognizer {
    fn from(r: Rc<DoubleTapGestureRecognizer>) -> Self {
        Self::DoubleTap(r)
    }
}

impl From<Rc<LongPressGestureRecognizer>> for Recognizer {
    fn from(r: Rc<LongPressGestureRecognizer>) -> Self {
        Self::LongPress(r)
    }
}

impl From<Rc<PanGestureRecognizer>> for Recognizer {
    fn from(r: Rc<PanGestureRecognizer>) -> Self {
        Self::Pan(r)
    }
}
