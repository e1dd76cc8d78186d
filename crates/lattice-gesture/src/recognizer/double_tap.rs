//! Double-tap recognition.
//!
//! A double tap spans two pointers: the first tap's pointer and the second
//! tap's pointer each get their own arena. The recognizer holds the first
//! arena open across the gap so nothing else can claim it, and fires once it
//! wins the second one.

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
struct DoubleTapTracking {
    first_tap: Option<PointerEvent>,
    second_tap: Option<PointerEvent>,
    /// Pointer whose arena rejected this recognizer before any tap completed.
    rejected: Option<PointerId>,
    /// Pointers whose arenas this recognizer already won.
    won: Vec<PointerId>,
}

/// Recognizes two taps in quick succession close to each other.
pub struct DoubleTapGestureRecognizer {
    this: Weak<Self>,
    pub(crate) target: Rc<GestureTarget>,
    env: RecognizerEnv,
    pub(crate) callbacks: CallbackRegistry,
    tracking: RefCell<DoubleTapTracking>,
    timer: TimerSlot,
}

static_assertions::assert_not_impl_any!(DoubleTapGestureRecognizer: Send, Sync);

impl DoubleTapGestureRecognizer {
    pub fn new(target: Rc<GestureTarget>, env: RecognizerEnv) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            target,
            env,
            callbacks: CallbackRegistry::default(),
            tracking: RefCell::new(DoubleTapTracking::default()),
            timer: TimerSlot::default(),
        })
    }

    pub fn on_double_tap(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::DoubleTap, Rc::new(callback))
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

    fn first_tap(&self) -> Option<PointerEvent> {
        self.tracking.borrow().first_tap
    }

    fn handle_down(&self, event: &PointerEvent) -> Result<()> {
        if let Some(first) = self.first_tap()
            && event.distance_from(&first) >= self.env.config().min_pan_distance
        {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "double-tap: second down too far, restarting");
            self.abandon()?;
        }
        match self.member() {
            Some(member) => self.env.arena().add(event.pointer, member),
            None => Ok(()),
        }
    }

    fn handle_move(&self, event: &PointerEvent) -> Result<()> {
        match self.first_tap() {
            Some(first)
                if first.pointer != event.pointer
                    && event.distance_from(&first) >= self.env.config().min_pan_distance =>
            {
                self.resolve(event.pointer, false)
            }
            _ => Ok(()),
        }
    }

    fn handle_up(&self, event: &PointerEvent) -> Result<()> {
        let pointer = event.pointer;
        let (first, rejected, won) = {
            let tracking = self.tracking.borrow();
            (
                tracking.first_tap,
                tracking.rejected,
                tracking.won.contains(&pointer),
            )
        };

        if rejected == Some(pointer) {
            self.tracking.borrow_mut().rejected = None;
            return self.resolve(pointer, false);
        }

        match first {
            None => {
                if won || self.env.arena().hold(pointer) {
                    self.start_first_tap(event);
                }
                Ok(())
            }
            Some(first) if first.pointer != pointer => {
                self.tracking.borrow_mut().second_tap = Some(*event);
                tracing::trace!(target: targets::RECOGNIZER, %pointer, "double-tap: second tap");
                self.resolve(first.pointer, true)?;
                if won {
                    self.reset();
                    self.send(event);
                    Ok(())
                } else {
                    self.resolve(pointer, true)
                }
            }
            Some(_) => Ok(()),
        }
    }

    fn start_first_tap(&self, event: &PointerEvent) {
        tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "double-tap: first tap");
        self.tracking.borrow_mut().first_tap = Some(*event);

        let generation = self.timer.arm();
        let this = self.this.clone();
        let timer = self.env.timers().start(
            event.time,
            self.env.config().double_tap_timeout,
            move || {
                if let Some(this) = this.upgrade()
                    && this.timer.fired(generation)
                {
                    tracing::trace!(target: targets::RECOGNIZER, "double-tap: timed out");
                    if let Err(err) = this.abandon() {
                        tracing::error!(target: targets::RECOGNIZER, %err, "double-tap: failed to abandon");
                    }
                }
            },
        );
        self.timer.set(timer);
    }

    /// Give up the current sequence: withdraw from and release the first
    /// pointer's arena, then start over.
    fn abandon(&self) -> Result<()> {
        let Some(first) = self.first_tap() else {
            self.reset();
            return Ok(());
        };
        let withdrawn = self.resolve(first.pointer, false);
        let released = self.env.arena().release(first.pointer);
        self.reset();
        withdrawn.and(released)
    }

    fn send(&self, event: &PointerEvent) {
        tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "double-tap");
        self.callbacks
            .emit(GestureAction::DoubleTap, &self.target.detail(event));
    }

    fn reset(&self) {
        self.timer.cancel();
        *self.tracking.borrow_mut() = DoubleTapTracking::default();
    }
}

impl GestureArenaMember for DoubleTapGestureRecognizer {
    fn accept_gesture(&self, pointer: PointerId) {
        let second = {
            let mut tracking = self.tracking.borrow_mut();
            match (tracking.first_tap, tracking.second_tap) {
                (Some(_), Some(second)) if second.pointer == pointer => Some(second),
                _ => {
                    if !tracking.won.contains(&pointer) {
                        tracking.won.push(pointer);
                    }
                    None
                }
            }
        };
        if let Some(second) = second {
            self.reset();
            self.send(&second);
        }
    }

    fn reject_gesture(&self, pointer: PointerId) {
        let first = {
            let mut tracking = self.tracking.borrow_mut();
            tracking.won.retain(|&won| won != pointer);
            if tracking.first_tap.is_none() {
                tracking.rejected = Some(pointer);
                return;
            }
            tracking.first_tap
        };
        match first {
            Some(first) if first.pointer != pointer => {
                if let Err(err) = self.abandon() {
                    tracing::error!(target: targets::RECOGNIZER, %err, "double-tap: failed to abandon");
                }
            }
            _ => self.reset(),
        }
    }
}

impl GestureRecognizer for DoubleTapGestureRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::DoubleTap
    }

    fn target(&self) -> WidgetId {
        self.target.widget()
    }

    fn state(&self) -> GestureState {
        if self.first_tap().is_some() {
            GestureState::Possible
        } else {
            GestureState::Ready
        }
    }

    fn pointer_allowed(&self, event: &PointerEvent) -> bool {
        event.is_primary && self.callbacks.has(GestureAction::DoubleTap)
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
        if let Err(err) = self.abandon() {
            tracing::error!(target: targets::RECOGNIZER, %err, "double-tap: failed to abandon on clear");
        }
    }
}
