//! Tunable gesture constants.
//!
//! ```
//! use std::time::Duration;
//! use lattice_gesture::GestureConfig;
//!
//! let config = GestureConfig::from_toml_str(
//!     "long_press_timeout_ms = 650\nmin_pan_distance = 12.0\n",
//! )
//! .unwrap();
//! assert_eq!(config.long_press_timeout, Duration::from_millis(650));
//! assert_eq!(config.tap_down_delay, Duration::from_millis(100));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GestureError, Result};

/// Default delay before touch input reports tap-down, in milliseconds.
///
/// Gives a competing gesture a chance to claim the pointer first.
pub const DEFAULT_TAP_DOWN_DELAY_MS: u64 = 100;

/// Default long-press timeout in milliseconds.
///
/// A pointer must be held for at least this duration to trigger a long-press.
pub const DEFAULT_LONG_PRESS_TIMEOUT_MS: u64 = 500;

/// Default double-tap timeout in milliseconds.
///
/// The second tap must arrive within this duration of the first one's up.
pub const DEFAULT_DOUBLE_TAP_TIMEOUT_MS: u64 = 300;

/// Default movement threshold in pixels.
///
/// Movement at or beyond this distance cancels taps and long-presses and
/// starts a pan.
pub const DEFAULT_MIN_PAN_DISTANCE: f32 = 10.0;

/// Configuration shared by every recognizer of a gesture context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Delay before tap-down fires for touch and pen input.
    #[serde(rename = "tap_down_delay_ms", with = "duration_ms")]
    pub tap_down_delay: Duration,
    /// Duration a pointer must be held for a long-press.
    #[serde(rename = "long_press_timeout_ms", with = "duration_ms")]
    pub long_press_timeout: Duration,
    /// Maximum time between the first tap's up and the second tap.
    #[serde(rename = "double_tap_timeout_ms", with = "duration_ms")]
    pub double_tap_timeout: Duration,
    /// Movement threshold shared by all recognizers.
    pub min_pan_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_down_delay: Duration::from_millis(DEFAULT_TAP_DOWN_DELAY_MS),
            long_press_timeout: Duration::from_millis(DEFAULT_LONG_PRESS_TIMEOUT_MS),
            double_tap_timeout: Duration::from_millis(DEFAULT_DOUBLE_TAP_TIMEOUT_MS),
            min_pan_distance: DEFAULT_MIN_PAN_DISTANCE,
        }
    }
}

impl GestureConfig {
    /// Create a configuration with the default constants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tap-down delay.
    pub fn with_tap_down_delay(mut self, delay: Duration) -> Self {
        self.tap_down_delay = delay;
        self
    }

    /// Set the long-press timeout.
    pub fn with_long_press_timeout(mut self, timeout: Duration) -> Self {
        self.long_press_timeout = timeout;
        self
    }

    /// Set the double-tap timeout.
    pub fn with_double_tap_timeout(mut self, timeout: Duration) -> Self {
        self.double_tap_timeout = timeout;
        self
    }

    /// Set the movement threshold.
    pub fn with_min_pan_distance(mut self, distance: f32) -> Self {
        self.min_pan_distance = distance;
        self
    }

    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.min_pan_distance.is_finite() || self.min_pan_distance < 0.0 {
            return Err(GestureError::InvalidConfig(format!(
                "min_pan_distance must be a finite, non-negative number, got {}",
                self.min_pan_distance
            )));
        }
        Ok(())
    }
}

/// Serialize a [`Duration`] as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
