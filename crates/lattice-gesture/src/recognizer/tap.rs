//! Single-tap recognition.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{GestureRecognizer, GestureState, GestureTarget, RecognizerEnv, RecognizerKind, TimerSlot};
use crate::arena::{ArenaMember, GestureArenaMember};
use crate::callback::{CallbackId, CallbackRegistry, GestureAction};
use crate::detail::GestureDetail;
use crate::error::Result;
use crate::logging::targets;
use crate::pointer::{PointerAction, PointerEvent, PointerId};
use crate::widget::WidgetId;

#[derive(Debug, Default)]
struct TapTracking {
    state: GestureState,
    init_event: Option<PointerEvent>,
    up_event: Option<PointerEvent>,
    sent_tap_down: bool,
}

/// Recognizes a press and release without significant movement.
///
/// Fires `tap-down` when the press is reported (at once for mouse input,
/// after the tap-down delay for touch and pen), then `tap-up` and `tap` on
/// release, or `tap-cancel` if the press is lost after `tap-down`.
pub struct TapGestureRecognizer {
    this: Weak<Self>,
    pub(crate) target: Rc<GestureTarget>,
    env: RecognizerEnv,
    pub(crate) callbacks: CallbackRegistry,
    tracking: RefCell<TapTracking>,
    timer: TimerSlot,
}

static_assertions::assert_not_impl_any!(TapGestureRecognizer: Send, Sync);

impl TapGestureRecognizer {
    pub fn new(target: Rc<GestureTarget>, env: RecognizerEnv) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            target,
            env,
            callbacks: CallbackRegistry::default(),
            tracking: RefCell::new(TapTracking::default()),
            timer: TimerSlot::default(),
        })
    }

    pub fn on_tap_down(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::TapDown, Rc::new(callback))
    }

    pub fn on_tap_up(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::TapUp, Rc::new(callback))
    }

    pub fn on_tap(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::Tap, Rc::new(callback))
    }

    pub fn on_tap_cancel(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::TapCancel, Rc::new(callback))
    }

    fn member(&self) -> Option<ArenaMember> {
        self.this.upgrade().map(|this| this as ArenaMember)
    }

    fn resolve(&self, pointer: PointerId, accepted: bool) -> Result<()> {
        match self.member() {
            Some(member) => self.env.arena().resolve(pointer, &member, accepted),
            None => Ok(()),
        }
    }

    fn handle_down(&self, event: &PointerEvent) -> Result<()> {
        if self.tracking.borrow().state != GestureState::Ready {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "tap: already tracking");
            return Ok(());
        }
        let Some(member) = self.member() else {
            return Ok(());
        };

        {
            let mut tracking = self.tracking.borrow_mut();
            tracking.state = GestureState::Possible;
            tracking.init_event = Some(*event);
            tracking.up_event = None;
            tracking.sent_tap_down = false;
        }
        if let Err(err) = self.env.arena().add(event.pointer, member) {
            self.reset();
            return Err(err);
        }

        if event.kind.is_direct_contact() {
            let generation = self.timer.arm();
            let this = self.this.clone();
            let timer = self.env.timers().start(
                event.time,
                self.env.config().tap_down_delay,
                move || {
                    if let Some(this) = this.upgrade()
                        && this.timer.fired(generation)
                    {
                        this.send_tap_down();
                    }
                },
            );
            self.timer.set(timer);
        } else {
            self.send_tap_down();
        }
        Ok(())
    }

    fn handle_move(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return Ok(());
        };
        if init.pointer != event.pointer
            || event.distance_from(&init) < self.env.config().min_pan_distance
        {
            return Ok(());
        }

        match state {
            GestureState::Possible => {
                tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "tap: moved too far");
                self.resolve(init.pointer, false)
            }
            GestureState::Accepted => {
                let sent_down = self.tracking.borrow().sent_tap_down;
                self.reset();
                if sent_down {
                    self.callbacks.emit(GestureAction::TapCancel, &self.target.detail(event));
                }
                Ok(())
            }
            GestureState::Ready => Ok(()),
        }
    }

    fn handle_up(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return Ok(());
        };

        match state {
            GestureState::Possible => {
                self.tracking.borrow_mut().up_event = Some(*event);
                self.resolve(init.pointer, init.pointer == event.pointer)
            }
            GestureState::Accepted if init.pointer == event.pointer => {
                self.reset();
                self.send_tap_up_and_tap(event);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Report the press once. Only while tracking.
    fn send_tap_down(&self) {
        let init = {
            let mut tracking = self.tracking.borrow_mut();
            if tracking.sent_tap_down || tracking.state == GestureState::Ready {
                return;
            }
            tracking.sent_tap_down = true;
            tracking.init_event
        };
        if let Some(init) = init {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %init.pointer, "tap-down");
            self.callbacks.emit(GestureAction::TapDown, &self.target.detail(&init));
        }
    }

    fn send_tap_up_and_tap(&self, up: &PointerEvent) {
        tracing::trace!(target: targets::RECOGNIZER, pointer = %up.pointer, "tap");
        let detail = self.target.detail(up);
        self.callbacks.emit(GestureAction::TapUp, &detail);
        self.callbacks.emit(GestureAction::Tap, &detail);
    }

    fn reset(&self) {
        self.timer.cancel();
        *self.tracking.borrow_mut() = TapTracking::default();
    }
}

impl GestureArenaMember for TapGestureRecognizer {
    fn accept_gesture(&self, pointer: PointerId) {
        let tracking_pointer = self
            .tracking
            .borrow()
            .init_event
            .map(|init| init.pointer);
        if tracking_pointer != Some(pointer) {
            return;
        }

        self.timer.cancel();
        self.send_tap_down();

        let up = self.tracking.borrow().up_event;
        match up {
            Some(up) => {
                self.reset();
                self.send_tap_up_and_tap(&up);
            }
            None => self.tracking.borrow_mut().state = GestureState::Accepted,
        }
    }

    fn reject_gesture(&self, pointer: PointerId) {
        let (sent_down, init) = {
            let tracking = self.tracking.borrow();
            (tracking.sent_tap_down, tracking.init_event)
        };
        let Some(init) = init else {
            return;
        };
        if init.pointer != pointer {
            return;
        }
        self.reset();
        if sent_down {
            tracing::trace!(target: targets::RECOGNIZER, %pointer, "tap-cancel");
            self.callbacks.emit(GestureAction::TapCancel, &self.target.detail(&init));
        }
    }
}

impl GestureRecognizer for TapGestureRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Tap
    }

    fn target(&self) -> WidgetId {
        self.target.widget()
    }

    fn state(&self) -> GestureState {
        self.tracking.borrow().state
    }

    fn pointer_allowed(&self, event: &PointerEvent) -> bool {
        event.is_primary && !self.callbacks.is_empty()
    }

    fn handle_allowed_pointer(&self, event: &PointerEvent) -> Result<()> {
        match event.action {
            PointerAction::Down => self.handle_down(event),
            PointerAction::Move => self.handle_move(event),
            PointerAction::Up => self.handle_up(event),
        }
    }

    fn clear(&self) {
        self.callbacks.clear();
        self.reset();
    }
}
