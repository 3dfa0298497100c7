//! Position scale conversion and motion state
//!
//! The Slide API uses 1.0 for fully closed and 0.0 for fully open; the
//! accessory platform uses 0 for fully closed and 100 for fully open.

use std::cmp::Ordering;

/// Reported-scale extreme: fully open.
pub const FULLY_OPEN: u8 = 100;

/// Reported-scale extreme: fully closed.
pub const FULLY_CLOSED: u8 = 0;

/// Motion state as reported to the accessory host. Discriminants follow
/// the host platform's position-state values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Decreasing = 0,
    Increasing = 1,
    Stopped = 2,
}

impl PositionState {
    /// Direction of travel implied by a target relative to the current
    /// position.
    pub fn from_positions(target: u8, current: u8) -> Self {
        match target.cmp(&current) {
            Ordering::Equal => PositionState::Stopped,
            Ordering::Less => PositionState::Decreasing,
            Ordering::Greater => PositionState::Increasing,
        }
    }
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Decreasing => write!(f, "Decreasing"),
            PositionState::Increasing => write!(f, "Increasing"),
            PositionState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Convert a device-native position (1.0 closed, 0.0 open) to the reported
/// scale (0 closed, 100 open).
pub fn to_reported(raw: f64) -> u8 {
    (100.0 - raw * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Convert a reported position back to the device-native scale.
pub fn to_raw(reported: u8) -> f64 {
    f64::from(FULLY_OPEN - reported.min(FULLY_OPEN)) / 100.0
}

/// Snap a reported position to an extreme when it is within `tolerance`.
/// The mechanism cannot settle exactly at the ends of travel, so readings
/// close to an extreme are treated as at rest there.
pub fn snap_to_extremes(position: u8, tolerance: u8) -> u8 {
    if position.abs_diff(FULLY_OPEN) <= tolerance {
        FULLY_OPEN
    } else if position.abs_diff(FULLY_CLOSED) <= tolerance {
        FULLY_CLOSED
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_round_trip_is_exact() {
        for reported in 0..=100u8 {
            assert_eq!(to_reported(to_raw(reported)), reported);
        }
    }

    #[test]
    fn raw_round_trip_within_rounding() {
        for step in 0..=100u32 {
            let raw = f64::from(step) / 100.0;
            assert!((to_raw(to_reported(raw)) - raw).abs() < 0.005);
        }
    }

    #[test]
    fn scales_are_inverted() {
        assert_eq!(to_reported(1.0), 0);
        assert_eq!(to_reported(0.0), 100);
        assert!((to_raw(0) - 1.0).abs() < f64::EPSILON);
        assert!((to_raw(100) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn conversion_clamps_out_of_range_input() {
        assert_eq!(to_reported(1.4), 0);
        assert_eq!(to_reported(-0.2), 100);
        assert!((to_raw(250) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snaps_near_extremes_only() {
        assert_eq!(snap_to_extremes(93, 7), 100);
        assert_eq!(snap_to_extremes(4, 7), 0);
        assert_eq!(snap_to_extremes(50, 7), 50);
        assert_eq!(snap_to_extremes(92, 7), 92);
        assert_eq!(snap_to_extremes(8, 7), 8);
    }

    #[test]
    fn motion_state_follows_target_versus_current() {
        assert_eq!(PositionState::from_positions(50, 50), PositionState::Stopped);
        assert_eq!(
            PositionState::from_positions(20, 80),
            PositionState::Decreasing
        );
        assert_eq!(
            PositionState::from_positions(80, 20),
            PositionState::Increasing
        );
    }
}
