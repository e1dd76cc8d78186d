//! Logging targets for Lattice Gesture.
//!
//! Lattice Gesture uses the `tracing` crate for instrumentation. The library
//! never installs a subscriber; applications pick their own:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_gesture::arena=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Timer queue target.
    pub const TIMER: &str = "lattice_gesture_core::timer";
    /// Background timer driver target.
    pub const DRIVER: &str = "lattice_gesture_core::driver";
    /// Gesture arena and arena manager target.
    pub const ARENA: &str = "lattice_gesture::arena";
    /// Recognizer state machine target.
    pub const RECOGNIZER: &str = "lattice_gesture::recognizer";
    /// Hit testing target.
    pub const HIT_TEST: &str = "lattice_gesture::hit_test";
    /// Pointer dispatch target.
    pub const DISPATCH: &str = "lattice_gesture::dispatch";
}
