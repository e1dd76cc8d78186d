//! One-shot timers for gesture recognition.
//!
//! Recognizers need short deadlines (delayed tap-down, long-press, double-tap
//! timeout). The [`TimerQueue`] keeps those deadlines on the owner thread and
//! runs their callbacks only from [`TimerQueue::process_expired`], which the
//! host calls from its event loop. A [`TimerDriver`](crate::TimerDriver) can
//! wake the loop when the next deadline passes.
//!
//! Deadlines are computed from explicit [`Instant`]s (usually the timestamp of
//! the pointer event that started the timer), which keeps recognition
//! deterministic under test.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::{CoreError, Result};
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

type TimerCallback = Box<dyn FnOnce()>;
type DeadlineListener = Box<dyn Fn(Instant)>;

/// Internal timer data.
struct TimerData {
    /// When this timer should fire.
    deadline: Instant,
    /// Taken when the timer fires.
    callback: Option<TimerCallback>,
}

/// An entry in the timer queue (min-heap by fire time).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        // Timers with the same deadline fire in start order.
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
    next_seq: u64,
}

/// Owner-thread queue of one-shot timers.
pub struct TimerQueue {
    state: RefCell<QueueState>,
    listener: RefCell<Option<DeadlineListener>>,
    affinity: ThreadAffinity,
}

static_assertions::assert_not_impl_any!(TimerQueue: Send, Sync);

impl TimerQueue {
    /// Create a new, empty timer queue bound to the current thread.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(QueueState::default()),
            listener: RefCell::new(None),
            affinity: ThreadAffinity::current(),
        })
    }

    /// Install a listener told about every newly scheduled deadline.
    ///
    /// [`TimerDriver::attach`](crate::TimerDriver::attach) uses this to learn
    /// when it must wake the owner thread.
    pub fn set_deadline_listener(&self, listener: impl Fn(Instant) + 'static) {
        *self.listener.borrow_mut() = Some(Box::new(listener));
    }

    /// Remove the deadline listener, if any.
    pub fn clear_deadline_listener(&self) {
        self.listener.borrow_mut().take();
    }

    /// Start a one-shot timer that fires `duration` after `start`.
    ///
    /// The returned [`Timer`] cancels the callback; dropping it does not.
    pub fn start(
        self: &Rc<Self>,
        start: Instant,
        duration: Duration,
        callback: impl FnOnce() + 'static,
    ) -> Timer {
        self.affinity.debug_assert_owner();

        let deadline = start + duration;
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.timers.insert(TimerData {
                deadline,
                callback: Some(Box::new(callback)),
            });
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(TimerQueueEntry {
                id,
                fire_time: deadline,
                seq,
            });
            id
        };

        tracing::trace!(target: targets::TIMER, ?id, ?duration, "timer started");

        if let Some(listener) = self.listener.borrow().as_ref() {
            listener(deadline);
        }

        Timer {
            id,
            queue: Rc::downgrade(self),
        }
    }

    /// Stop and remove a timer.
    ///
    /// Returns an error if the timer already fired or was cancelled.
    pub fn stop(&self, id: TimerId) -> Result<()> {
        self.affinity.debug_assert_owner();
        match self.state.borrow_mut().timers.remove(id) {
            Some(_) => {
                tracing::trace!(target: targets::TIMER, ?id, "timer stopped");
                Ok(())
            }
            None => Err(CoreError::InvalidTimerId),
        }
    }

    /// Check if a timer is still waiting to fire.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.state.borrow().timers.contains_key(id)
    }

    /// Get the number of pending timers.
    pub fn active_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut state = self.state.borrow_mut();
        // Clean up stopped timers from the front of the queue.
        while let Some(entry) = state.queue.peek() {
            if state.timers.contains_key(entry.id) {
                return Some(entry.fire_time);
            }
            state.queue.pop();
        }
        None
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire every timer whose deadline is at or before `now`.
    ///
    /// Timers are popped one at a time and the queue is not borrowed while a
    /// callback runs, so a callback may start or cancel other timers. A timer
    /// cancelled by an earlier callback in the same pass does not fire.
    ///
    /// Returns the number of callbacks that ran.
    #[tracing::instrument(skip(self), target = "lattice_gesture_core::timer", level = "trace")]
    pub fn process_expired(&self, now: Instant) -> usize {
        self.affinity.assert_owner("timer processing");

        let mut fired = 0;
        while let Some((id, callback)) = self.pop_expired(now) {
            tracing::trace!(target: targets::TIMER, ?id, "timer fired");
            callback();
            fired += 1;
        }
        fired
    }

    fn pop_expired(&self, now: Instant) -> Option<(TimerId, TimerCallback)> {
        let mut state = self.state.borrow_mut();
        loop {
            let entry = *state.queue.peek()?;
            if entry.fire_time > now {
                return None;
            }
            state.queue.pop();

            let Some(mut data) = state.timers.remove(entry.id) else {
                continue;
            };
            debug_assert!(data.deadline <= now);
            if let Some(callback) = data.callback.take() {
                return Some((entry.id, callback));
            }
        }
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("active", &self.active_count())
            .finish()
    }
}

/// Handle to a started one-shot timer.
///
/// [`cancel`](Self::cancel) is idempotent: cancelling twice, or cancelling a
/// timer that already fired, does nothing.
#[derive(Debug, Clone)]
pub struct Timer {
    id: TimerId,
    queue: Weak<TimerQueue>,
}

impl Timer {
    /// The id of this timer.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Cancel the timer so its callback never runs.
    pub fn cancel(&self) {
        if let Some(queue) = self.queue.upgrade() {
            let _ = queue.stop(self.id);
        }
    }

    /// Whether the timer is still waiting to fire.
    pub fn is_active(&self) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|queue| queue.is_active(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_fires_after_deadline() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();

        let timer = queue.start(start, Duration::from_millis(100), move || flag.set(true));
        assert!(timer.is_active());

        assert_eq!(queue.process_expired(start + Duration::from_millis(99)), 0);
        assert!(!fired.get());

        assert_eq!(queue.process_expired(start + Duration::from_millis(100)), 1);
        assert!(fired.get());
        assert!(!timer.is_active());
        assert_eq!(queue.active_count(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();

        let timer = queue.start(start, Duration::from_millis(10), move || {
            counter.set(counter.get() + 1)
        });
        timer.cancel();
        timer.cancel();

        assert_eq!(queue.process_expired(start + Duration::from_secs(1)), 0);
        assert_eq!(fired.get(), 0);
        assert!(queue.stop(timer.id()).is_err());
    }

    #[test]
    fn test_fire_order_and_time_until_next() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, ms) in [("late", 30u64), ("early", 10), ("middle", 20)] {
            let order = order.clone();
            queue.start(start, Duration::from_millis(ms), move || {
                order.borrow_mut().push(label)
            });
        }

        assert_eq!(
            queue.time_until_next(start),
            Some(Duration::from_millis(10))
        );
        queue.process_expired(start + Duration::from_millis(50));
        assert_eq!(*order.borrow(), vec!["early", "middle", "late"]);
        assert_eq!(queue.time_until_next(start), None);
    }

    #[test]
    fn test_callback_cancels_later_expired_timer() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let second_fired = Rc::new(Cell::new(false));

        let flag = second_fired.clone();
        let second = queue.start(start, Duration::from_millis(20), move || flag.set(true));
        queue.start(start, Duration::from_millis(10), move || second.cancel());

        assert_eq!(queue.process_expired(start + Duration::from_millis(30)), 1);
        assert!(!second_fired.get());
    }

    #[test]
    fn test_callback_can_start_timer() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let fired = Rc::new(Cell::new(false));

        let inner_queue = queue.clone();
        let flag = fired.clone();
        queue.start(start, Duration::from_millis(10), move || {
            let flag = flag.clone();
            inner_queue.start(start, Duration::from_millis(15), move || flag.set(true));
        });

        queue.process_expired(start + Duration::from_millis(10));
        assert!(!fired.get());
        queue.process_expired(start + Duration::from_millis(15));
        assert!(fired.get());
    }

    #[test]
    fn test_deadline_listener() {
        let queue = TimerQueue::new();
        let start = Instant::now();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        queue.set_deadline_listener(move |deadline| sink.borrow_mut().push(deadline));
        queue.start(start, Duration::from_millis(5), || {});
        queue.clear_deadline_listener();
        queue.start(start, Duration::from_millis(6), || {});

        assert_eq!(*seen.borrow(), vec![start + Duration::from_millis(5)]);
    }

    #[test]
    fn test_handle_outlives_queue() {
        let queue = TimerQueue::new();
        let timer = queue.start(Instant::now(), Duration::from_millis(5), || {});
        drop(queue);
        assert!(!timer.is_active());
        timer.cancel();
    }
}
