//! Core systems for Lattice Gesture.
//!
//! This crate provides the platform-independent building blocks the gesture
//! arena is built on:
//!
//! - **Geometry**: [`Point`], [`Size`] and [`Rect`] for hit testing and slop checks
//! - **Timers**: an owner-thread [`TimerQueue`] of one-shot, cancellable timers
//! - **Timer Driver**: a background [`TimerDriver`] that wakes the owner thread
//! - **Thread Affinity**: [`ThreadAffinity`] checks for owner-thread-only state
//! - **Logging**: `tracing` target names in [`logging`]
//!
//! # Timer Example
//!
//! ```
//! use lattice_gesture_core::TimerQueue;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::{Duration, Instant};
//!
//! let queue = TimerQueue::new();
//! let start = Instant::now();
//! let fired = Rc::new(Cell::new(false));
//!
//! let flag = fired.clone();
//! let timer = queue.start(start, Duration::from_millis(500), move || flag.set(true));
//!
//! // Nothing fires before the deadline.
//! queue.process_expired(start + Duration::from_millis(100));
//! assert!(!fired.get());
//!
//! // Cancelling is idempotent.
//! timer.cancel();
//! timer.cancel();
//! queue.process_expired(start + Duration::from_secs(1));
//! assert!(!fired.get());
//! ```

mod driver;
mod error;
pub mod geometry;
pub mod logging;
pub mod thread_check;
mod timer;

pub use driver::{TimerDriver, TimerWake};
pub use error::{CoreError, Result};
pub use geometry::{Point, Rect, Size};
pub use thread_check::ThreadAffinity;
pub use timer::{Timer, TimerId, TimerQueue};
