//! Pan (drag) recognition.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{GestureRecognizer, GestureState, GestureTarget, RecognizerEnv, RecognizerKind};
use crate::arena::{ArenaMember, GestureArenaMember};
use crate::callback::{CallbackId, CallbackRegistry, GestureAction};
use crate::detail::GestureDetail;
use crate::error::Result;
use crate::logging::targets;
use crate::pointer::{PointerAction, PointerEvent, PointerId};
use crate::widget::WidgetId;

#[derive(Debug, Default)]
struct PanTracking {
    state: GestureState,
    init_event: Option<PointerEvent>,
}

/// Recognizes a pointer dragged past the movement threshold.
///
/// `pan-down` reports the original press once the pan wins, followed by a
/// `pan-update` for every move and `pan-up` on release.
pub struct PanGestureRecognizer {
    this: Weak<Self>,
    pub(crate) target: Rc<GestureTarget>,
    env: RecognizerEnv,
    pub(crate) callbacks: CallbackRegistry,
    tracking: RefCell<PanTracking>,
}

static_assertions::assert_not_impl_any!(PanGestureRecognizer: Send, Sync);

impl PanGestureRecognizer {
    pub fn new(target: Rc<GestureTarget>, env: RecognizerEnv) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            target,
            env,
            callbacks: CallbackRegistry::default(),
            tracking: RefCell::new(PanTracking::default()),
        })
    }

    pub fn on_pan_down(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::PanDown, Rc::new(callback))
    }

    pub fn on_pan_update(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::PanUpdate, Rc::new(callback))
    }

    pub fn on_pan_up(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::PanUp, Rc::new(callback))
    }

    pub fn on_pan_cancel(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::PanCancel, Rc::new(callback))
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

    fn snapshot(&self) -> (GestureState, Option<PointerEvent>) {
        let tracking = self.tracking.borrow();
        (tracking.state, tracking.init_event)
    }

    fn handle_down(&self, event: &PointerEvent) -> Result<()> {
        if self.tracking.borrow().init_event.is_some() {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "pan: already tracking");
            return Ok(());
        }
        let Some(member) = self.member() else {
            return Ok(());
        };

        *self.tracking.borrow_mut() = PanTracking {
            state: GestureState::Possible,
            init_event: Some(*event),
        };
        if let Err(err) = self.env.arena().add(event.pointer, member) {
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    fn handle_move(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = self.snapshot();
        let Some(init) = init else {
            return Ok(());
        };
        if init.pointer != event.pointer {
            return Ok(());
        }

        match state {
            GestureState::Accepted => self.send(GestureAction::PanUpdate, event),
            GestureState::Possible
                if event.distance_from(&init) >= self.env.config().min_pan_distance =>
            {
                tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "pan: threshold reached");
                self.resolve(init.pointer, true)?;
                // Winning inside the resolve above sent pan-down; this move
                // is the first update.
                if self.snapshot().0 == GestureState::Accepted {
                    self.send(GestureAction::PanUpdate, event);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_up(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = self.snapshot();
        let Some(init) = init else {
            return Ok(());
        };
        if init.pointer != event.pointer {
            return Ok(());
        }

        match state {
            GestureState::Accepted => {
                self.reset();
                self.send(GestureAction::PanUp, event);
                Ok(())
            }
            GestureState::Possible => self.resolve(init.pointer, false),
            GestureState::Ready => Ok(()),
        }
    }

    fn send(&self, action: GestureAction, event: &PointerEvent) {
        tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, %action);
        self.callbacks.emit(action, &self.target.detail(event));
    }

    fn reset(&self) {
        *self.tracking.borrow_mut() = PanTracking::default();
    }
}

impl GestureArenaMember for PanGestureRecognizer {
    fn accept_gesture(&self, pointer: PointerId) {
        let (state, init) = self.snapshot();
        let Some(init) = init else {
            return;
        };
        if init.pointer != pointer || state != GestureState::Possible {
            return;
        }
        self.tracking.borrow_mut().state = GestureState::Accepted;
        self.send(GestureAction::PanDown, &init);
    }

    fn reject_gesture(&self, pointer: PointerId) {
        let (state, init) = self.snapshot();
        let Some(init) = init else {
            return;
        };
        if init.pointer != pointer {
            return;
        }
        self.reset();
        if state == GestureState::Possible {
            self.send(GestureAction::PanCancel, &init);
        }
    }
}

impl GestureRecognizer for PanGestureRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Pan
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
