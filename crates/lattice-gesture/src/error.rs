//! Error types for the gesture system.

use crate::pointer::PointerId;
use crate::recognizer::RecognizerKind;
use crate::widget::WidgetId;

/// Result type alias for gesture operations.
pub type Result<T> = std::result::Result<T, GestureError>;

/// Errors that can occur in the gesture system.
///
/// Apart from configuration errors, every variant is a protocol violation by
/// the dispatching code. The operation that reports it leaves arena state
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    /// A member tried to join an arena that is already closed.
    #[error("gesture arena for pointer {pointer} is closed")]
    ArenaClosed { pointer: PointerId },

    /// Resolution was attempted while the arena was still open.
    #[error("gesture arena for pointer {pointer} must be closed before it is resolved")]
    ArenaOpen { pointer: PointerId },

    /// A recognizer of the same kind is already attached to the widget.
    #[error("{kind} recognizer is already registered on widget {widget}")]
    DuplicateRecognizer {
        widget: WidgetId,
        kind: RecognizerKind,
    },

    /// A widget was added twice to one hit-test result.
    #[error("widget {widget} is already in the hit-test result")]
    DuplicateHitTarget { widget: WidgetId },

    /// A down event arrived for a pointer that still has a hit-test result.
    #[error("hit-test result already exists for pointer {pointer}")]
    HitTestExists { pointer: PointerId },

    /// A configuration value is out of range.
    #[error("invalid gesture configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse gesture configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl GestureError {
    /// Whether this error reports a bug in the calling dispatch code.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::ConfigParse(_))
    }
}
