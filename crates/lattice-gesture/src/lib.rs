//! Gesture disambiguation for Lattice.
//!
//! Raw pointer events go in, high-level gesture callbacks come out. Several
//! recognizers may be interested in the same pointer; they compete in a
//! per-pointer **gesture arena** and exactly one of them wins.
//!
//! - **Pointer model**: [`PointerEvent`], [`PointerId`], [`PointerKind`]
//! - **Hit testing**: [`hit_test`] over a host-provided [`WidgetTree`]
//! - **Arena**: [`GestureArena`] and the [`GestureArenaManager`] protocol
//!   (add, close, sweep, hold, release, resolve)
//! - **Recognizers**: tap, double-tap, long-press and pan, see [`recognizer`]
//! - **Registry**: [`GestureHandler`] per widget, [`GestureBinding`] per window
//! - **Service**: [`GestureContext`] ties everything together for one window
//!
//! Everything here lives on one thread: contexts and recognizers are neither
//! `Send` nor `Sync`. Timers only fire from
//! [`GestureContext::process_timers`]; a [`TimerDriver`] can wake the host
//! loop when one is due.
//!
//! # Logging
//!
//! Uses `tracing` with the targets in [`logging::targets`]. Arena resolutions
//! are logged at `debug`, per-event flow at `trace`, protocol violations at
//! `error`.

mod arena;
mod arena_manager;
mod callback;
mod config;
mod context;
mod detail;
mod error;
mod handler;
mod hit_test;
mod pointer;
pub mod recognizer;
mod widget;

pub use lattice_gesture_core::logging;
pub use lattice_gesture_core::{Point, Rect, Size, TimerDriver, TimerWake};

pub use arena::{ArenaMember, GestureArena, GestureArenaMember};
pub use arena_manager::GestureArenaManager;
pub use callback::{CallbackHandle, CallbackId, GestureAction, GestureCallback};
pub use config::{
    DEFAULT_DOUBLE_TAP_TIMEOUT_MS, DEFAULT_LONG_PRESS_TIMEOUT_MS, DEFAULT_MIN_PAN_DISTANCE,
    DEFAULT_TAP_DOWN_DELAY_MS, GestureConfig,
};
pub use context::GestureContext;
pub use detail::GestureDetail;
pub use error::{GestureError, Result};
pub use handler::{GestureBinding, GestureHandler};
pub use hit_test::{HitTestResult, hit_test};
pub use pointer::{PointerAction, PointerEvent, PointerId, PointerKind};
pub use recognizer::{
    DoubleTapGestureRecognizer, GestureRecognizer, GestureState, GestureTarget,
    LongPressGestureRecognizer, PanGestureRecognizer, Recognizer, RecognizerEnv, RecognizerKind,
    TapGestureRecognizer,
};
pub use widget::{WidgetId, WidgetTree};
