//! Long-press recognition.

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
struct LongPressTracking {
    state: GestureState,
    init_event: Option<PointerEvent>,
    /// The arena picked this recognizer before the timeout elapsed.
    arena_won: bool,
}

/// Recognizes a pointer held in place for the long-press timeout.
///
/// Claims the pointer when the timeout elapses and fires `long-press`; while
/// the press continues it reports `long-press-move`, and `long-press-up` on
/// release.
pub struct LongPressGestureRecognizer {
    this: Weak<Self>,
    pub(crate) target: Rc<GestureTarget>,
    env: RecognizerEnv,
    pub(crate) callbacks: CallbackRegistry,
    tracking: RefCell<LongPressTracking>,
    timer: TimerSlot,
}

static_assertions::assert_not_impl_any!(LongPressGestureRecognizer: Send, Sync);

impl LongPressGestureRecognizer {
    pub fn new(target: Rc<GestureTarget>, env: RecognizerEnv) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            target,
            env,
            callbacks: CallbackRegistry::default(),
            tracking: RefCell::new(LongPressTracking::default()),
            timer: TimerSlot::default(),
        })
    }

    pub fn on_long_press(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::LongPress, Rc::new(callback))
    }

    pub fn on_long_press_move(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::LongPressMove, Rc::new(callback))
    }

    pub fn on_long_press_up(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::LongPressUp, Rc::new(callback))
    }

    pub fn on_long_press_cancel(&self, callback: impl Fn(&GestureDetail) + 'static) -> CallbackId {
        self.callbacks.add(GestureAction::LongPressCancel, Rc::new(callback))
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

    fn init_event(&self) -> Option<PointerEvent> {
        self.tracking.borrow().init_event
    }

    fn handle_down(&self, event: &PointerEvent) -> Result<()> {
        if self.init_event().is_some() {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "long-press: already tracking");
            return Ok(());
        }
        let Some(member) = self.member() else {
            return Ok(());
        };

        *self.tracking.borrow_mut() = LongPressTracking {
            init_event: Some(*event),
            ..Default::default()
        };
        if let Err(err) = self.env.arena().add(event.pointer, member) {
            self.reset();
            return Err(err);
        }

        let generation = self.timer.arm();
        let this = self.this.clone();
        let timer = self.env.timers().start(
            event.time,
            self.env.config().long_press_timeout,
            move || {
                if let Some(this) = this.upgrade()
                    && this.timer.fired(generation)
                {
                    this.on_timeout();
                }
            },
        );
        self.timer.set(timer);
        Ok(())
    }

    fn on_timeout(&self) {
        let (init, arena_won) = {
            let tracking = self.tracking.borrow();
            (tracking.init_event, tracking.arena_won)
        };
        let Some(init) = init else {
            return;
        };

        if arena_won {
            self.tracking.borrow_mut().state = GestureState::Accepted;
            self.send(GestureAction::LongPress, &init);
            return;
        }

        self.tracking.borrow_mut().state = GestureState::Possible;
        tracing::trace!(target: targets::RECOGNIZER, pointer = %init.pointer, "long-press: timeout, claiming pointer");
        if let Err(err) = self.resolve(init.pointer, true) {
            tracing::error!(target: targets::RECOGNIZER, %err, "long-press: failed to claim pointer");
        }
    }

    fn handle_move(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return Ok(());
        };
        if init.pointer != event.pointer {
            return Ok(());
        }

        if state == GestureState::Accepted {
            self.send(GestureAction::LongPressMove, event);
            return Ok(());
        }
        if event.distance_from(&init) >= self.env.config().min_pan_distance {
            tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, "long-press: moved too far");
            self.timer.cancel();
            let result = self.resolve(init.pointer, false);
            self.reset();
            return result;
        }
        Ok(())
    }

    fn handle_up(&self, event: &PointerEvent) -> Result<()> {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return Ok(());
        };
        if init.pointer != event.pointer {
            return Ok(());
        }

        if state == GestureState::Accepted {
            self.reset();
            self.send(GestureAction::LongPressUp, event);
            return Ok(());
        }
        let result = self.resolve(init.pointer, false);
        self.reset();
        result
    }

    fn send(&self, action: GestureAction, event: &PointerEvent) {
        tracing::trace!(target: targets::RECOGNIZER, pointer = %event.pointer, %action);
        self.callbacks.emit(action, &self.target.detail(event));
    }

    fn reset(&self) {
        self.timer.cancel();
        *self.tracking.borrow_mut() = LongPressTracking::default();
    }
}

impl GestureArenaMember for LongPressGestureRecognizer {
    fn accept_gesture(&self, pointer: PointerId) {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return;
        };
        if init.pointer != pointer {
            return;
        }

        if state == GestureState::Possible {
            self.timer.cancel();
            self.tracking.borrow_mut().state = GestureState::Accepted;
            self.send(GestureAction::LongPress, &init);
        } else if self.timer.is_pending() {
            tracing::trace!(target: targets::RECOGNIZER, %pointer, "long-press: won before timeout");
            self.tracking.borrow_mut().arena_won = true;
        } else {
            self.reset();
        }
    }

    fn reject_gesture(&self, pointer: PointerId) {
        let (state, init) = {
            let tracking = self.tracking.borrow();
            (tracking.state, tracking.init_event)
        };
        let Some(init) = init else {
            return;
        };
        if init.pointer != pointer {
            return;
        }
        self.reset();
        if state == GestureState::Possible {
            self.send(GestureAction::LongPressCancel, &init);
        }
    }
}

impl GestureRecognizer for LongPressGestureRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::LongPress
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena_manager::GestureArenaManager;
    use crate::config::GestureConfig;
    use crate::pointer::PointerKind;
    use lattice_gesture_core::{Point, TimerQueue};
    use std::time::{Duration, Instant};

    fn setup() -> (RecognizerEnv, Rc<LongPressGestureRecognizer>, Rc<RefCell<Vec<&'static str>>>) {
        let env = RecognizerEnv::new(
            Rc::new(GestureArenaManager::new()),
            TimerQueue::new(),
            Rc::new(GestureConfig::default()),
        );
        let recognizer = LongPressGestureRecognizer::new(GestureTarget::new(WidgetId(1)), env.clone());
        let log = Rc::new(RefCell::new(Vec::new()));
        for (action, name) in [
            (GestureAction::LongPress, "press"),
            (GestureAction::LongPressMove, "move"),
            (GestureAction::LongPressUp, "up"),
            (GestureAction::LongPressCancel, "cancel"),
        ] {
            let log = log.clone();
            recognizer
                .callbacks
                .add(action, Rc::new(move |_: &GestureDetail| log.borrow_mut().push(name)));
        }
        (env, recognizer, log)
    }

    fn event(action: PointerAction, x: f32, time: Instant) -> PointerEvent {
        PointerEvent::new(5, PointerKind::Touch, action, Point::new(x, 0.0), time)
    }

    #[test]
    fn test_lone_long_press_fires_after_timeout() {
        let (env, lp, log) = setup();
        let t0 = Instant::now();

        lp.handle_allowed_pointer(&event(PointerAction::Down, 0.0, t0)).unwrap();
        env.arena().close(PointerId(5)).unwrap();
        assert!(log.borrow().is_empty());

        env.timers().process_expired(t0 + Duration::from_millis(500));
        assert_eq!(lp.state(), GestureState::Accepted);

        lp.handle_allowed_pointer(&event(PointerAction::Move, 30.0, t0)).unwrap();
        lp.handle_allowed_pointer(&event(PointerAction::Up, 30.0, t0)).unwrap();
        assert_eq!(*log.borrow(), vec!["press", "move", "up"]);
        assert_eq!(lp.state(), GestureState::Ready);
    }

    #[test]
    fn test_early_up_never_fires() {
        let (env, lp, log) = setup();
        let t0 = Instant::now();

        lp.handle_allowed_pointer(&event(PointerAction::Down, 0.0, t0)).unwrap();
        env.arena().close(PointerId(5)).unwrap();
        lp.handle_allowed_pointer(&event(PointerAction::Up, 0.0, t0)).unwrap();

        env.timers().process_expired(t0 + Duration::from_secs(2));
        assert!(log.borrow().is_empty());
        assert_eq!(env.timers().active_count(), 0);
    }

    #[test]
    fn test_move_beyond_threshold_withdraws() {
        let (env, lp, log) = setup();
        let t0 = Instant::now();
        let rival: ArenaMember = LongPressGestureRecognizer::new(GestureTarget::new(WidgetId(2)), env.clone());

        lp.handle_allowed_pointer(&event(PointerAction::Down, 0.0, t0)).unwrap();
        env.arena().add(PointerId(5), rival).unwrap();
        env.arena().close(PointerId(5)).unwrap();

        lp.handle_allowed_pointer(&event(PointerAction::Move, 12.0, t0)).unwrap();
        assert!(!env.arena().contains(PointerId(5)));
        env.timers().process_expired(t0 + Duration::from_secs(1));
        assert!(log.borrow().is_empty());
    }
}
