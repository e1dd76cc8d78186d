//! Background wake-ups for the owner-thread timer queue.
//!
//! The [`TimerQueue`] never runs callbacks on its own; something has to call
//! [`TimerQueue::process_expired`] on the owner thread once a deadline passes.
//! Hosts with their own event loop can use [`TimerQueue::time_until_next`] as
//! a poll timeout. Hosts without one can spawn a [`TimerDriver`]: a small
//! thread that sleeps until the earliest announced deadline and then sends a
//! [`TimerWake`] back over a channel. The driver only ever sees `Instant`s;
//! gesture state stays on the owner thread.
//!
//! ```no_run
//! use lattice_gesture_core::{TimerDriver, TimerQueue};
//! use std::time::Instant;
//!
//! let queue = TimerQueue::new();
//! let driver = TimerDriver::spawn()?;
//! driver.attach(&queue);
//!
//! // In the owner thread's loop:
//! while let Ok(_wake) = driver.wakeups().recv() {
//!     queue.process_expired(Instant::now());
//! }
//! # Ok::<(), lattice_gesture_core::CoreError>(())
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::error::{CoreError, Result};
use crate::logging::targets;
use crate::timer::TimerQueue;

/// Default name for the driver thread.
const DEFAULT_THREAD_NAME: &str = "lattice-gesture-timer";

/// Message sent to the owner thread when at least one deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerWake {
    /// The deadline that triggered this wake-up.
    pub deadline: Instant,
}

enum DriverCommand {
    Schedule(Instant),
    Shutdown,
}

/// Thread that turns announced deadlines into [`TimerWake`] messages.
pub struct TimerDriver {
    commands: Sender<DriverCommand>,
    wakeups: Receiver<TimerWake>,
    thread: Option<JoinHandle<()>>,
}

impl TimerDriver {
    /// Spawn a driver thread with the default name.
    pub fn spawn() -> Result<Self> {
        Self::spawn_named(DEFAULT_THREAD_NAME)
    }

    /// Spawn a driver thread with a custom name.
    pub fn spawn_named(name: impl Into<String>) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (wake_tx, wake_rx) = unbounded();

        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || driver_loop(command_rx, wake_tx))
            .map_err(|err| CoreError::DriverSpawn(err.to_string()))?;

        Ok(Self {
            commands: command_tx,
            wakeups: wake_rx,
            thread: Some(thread),
        })
    }

    /// Announce a deadline; a [`TimerWake`] is sent once it passes.
    pub fn schedule(&self, deadline: Instant) -> Result<()> {
        self.commands
            .send(DriverCommand::Schedule(deadline))
            .map_err(|_| CoreError::DriverDisconnected)
    }

    /// Forward every deadline started on `queue` to this driver.
    pub fn attach(&self, queue: &TimerQueue) {
        let commands = self.commands.clone();
        queue.set_deadline_listener(move |deadline| {
            if commands.send(DriverCommand::Schedule(deadline)).is_err() {
                tracing::warn!(target: targets::DRIVER, "timer driver gone, deadline dropped");
            }
        });
        if let Some(deadline) = queue.next_deadline()
            && let Err(err) = self.schedule(deadline)
        {
            tracing::warn!(target: targets::DRIVER, %err, "timer driver gone, pending deadline dropped");
        }
    }

    /// Channel on which wake-ups arrive. Receive on the owner thread.
    pub fn wakeups(&self) -> &Receiver<TimerWake> {
        &self.wakeups
    }

    /// Stop the driver thread and wait for it to exit.
    pub fn shutdown(&mut self) {
        let _ = self.commands.send(DriverCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!(target: targets::DRIVER, "timer driver thread panicked");
        }
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TimerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerDriver")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

fn driver_loop(commands: Receiver<DriverCommand>, wakeups: Sender<TimerWake>) {
    let mut pending: BinaryHeap<Reverse<Instant>> = BinaryHeap::new();

    loop {
        let next = match pending.peek() {
            Some(Reverse(deadline)) => {
                let deadline = *deadline;
                commands.recv_deadline(deadline).map_err(|err| match err {
                    RecvTimeoutError::Timeout => Some(deadline),
                    RecvTimeoutError::Disconnected => None,
                })
            }
            None => commands.recv().map_err(|_| None),
        };

        match next {
            Ok(DriverCommand::Schedule(deadline)) => pending.push(Reverse(deadline)),
            Ok(DriverCommand::Shutdown) | Err(None) => break,
            Err(Some(deadline)) => {
                // Collapse every deadline that has passed into one wake-up.
                let now = Instant::now();
                while pending.peek().is_some_and(|Reverse(d)| *d <= now) {
                    pending.pop();
                }
                tracing::trace!(target: targets::DRIVER, ?deadline, "waking owner thread");
                if wakeups.send(TimerWake { deadline }).is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(target: targets::DRIVER, "timer driver stopped");
}
