//! Charge power curve and the state of one held press.

use serde::{Deserialize, Serialize};

use crate::math::{ratio_ms, Fixed, PlanarVec};

/// Power for a press held `elapsed_ms`.
///
/// Rises linearly from 0 to just under 1 across `max_hold_ms`. Holding for
/// `max_hold_ms` or longer overcharges: the power drops to 0.
#[must_use]
pub fn power_for_hold(elapsed_ms: u64, max_hold_ms: u64) -> Fixed {
    if elapsed_ms >= max_hold_ms {
        return Fixed::ZERO;
    }
    ratio_ms(elapsed_ms, max_hold_ms)
}

/// One press from acceptance to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerChargeSession {
    /// Caller clock when the press was accepted.
    pub hold_start_ms: u64,
    /// Hold time at the last update.
    pub elapsed_hold_ms: u64,
    /// Latest ground point under the pointer.
    pub hold_position: PlanarVec,
    /// Unit vector from the figure toward the hold point, if they are far enough apart.
    pub direction: Option<PlanarVec>,
    /// Whether the hold reached the overcharge limit.
    pub overcharged: bool,
}

impl PowerChargeSession {
    /// Begin a charge at `now_ms` with the pointer over `hold_position`.
    #[must_use]
    pub const fn begin(now_ms: u64, hold_position: PlanarVec) -> Self {
        Self {
            hold_start_ms: now_ms,
            elapsed_hold_ms: 0,
            hold_position,
            direction: None,
            overcharged: false,
        }
    }

    /// Refresh hold time. Returns `true` the first time the hold overcharges.
    pub fn update_time(&mut self, now_ms: u64, max_hold_ms: u64) -> bool {
        self.elapsed_hold_ms = now_ms.saturating_sub(self.hold_start_ms);
        let was = self.overcharged;
        self.overcharged = self.elapsed_hold_ms >= max_hold_ms;
        self.overcharged && !was
    }

    /// Move the hold point and recompute the direction from `figure`.
    pub fn update_hold(&mut self, hold_position: PlanarVec, figure: PlanarVec, min_distance: Fixed) {
        self.hold_position = hold_position;
        self.direction = (hold_position - figure).try_normalize(min_distance);
    }

    /// Power at the last update.
    #[must_use]
    pub fn power(&self, max_hold_ms: u64) -> Fixed {
        power_for_hold(self.elapsed_hold_ms, max_hold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_power_curve() {
        assert_eq!(power_for_hold(0, 2000), Fixed::ZERO);
        assert_eq!(power_for_hold(1000, 2000), Fixed::from_num(0.5));
        assert_eq!(power_for_hold(1500, 2000), Fixed::from_num(0.75));
    }

    #[test]
    fn test_overcharge_drops_to_zero() {
        assert_eq!(power_for_hold(2000, 2000), Fixed::ZERO);
        assert_eq!(power_for_hold(9000, 2000), Fixed::ZERO);
    }

    #[test]
    fn test_session_overcharge_reported_once() {
        let mut charge = PowerChargeSession::begin(1_000, PlanarVec::ZERO);
        assert!(!charge.update_time(2_000, 2000));
        assert!(charge.update_time(3_000, 2000));
        assert!(!charge.update_time(3_500, 2000));
        assert!(charge.overcharged);
        assert_eq!(charge.power(2000), Fixed::ZERO);
    }

    #[test]
    fn test_direction_needs_distance() {
        let figure = PlanarVec::ZERO;
        let mut charge = PowerChargeSession::begin(0, PlanarVec::ZERO);
        charge.update_hold(PlanarVec::from_f32(0.005, 0.0), figure, Fixed::from_num(0.01));
        assert_eq!(charge.direction, None);

        charge.update_hold(PlanarVec::from_f32(0.0, -0.2), figure, Fixed::from_num(0.01));
        let dir = charge.direction.unwrap();
        assert_eq!(dir.x, Fixed::ZERO);
        assert!(dir.z < Fixed::from_num(-0.99));
    }

    proptest! {
        #[test]
        fn prop_power_in_unit_range(elapsed in 0u64..10_000, max in 1u64..5_000) {
            let p = power_for_hold(elapsed, max);
            prop_assert!(p >= Fixed::ZERO);
            prop_assert!(p < Fixed::ONE);
            if elapsed >= max {
                prop_assert_eq!(p, Fixed::ZERO);
            }
        }

        #[test]
        fn prop_power_monotonic_below_max(a in 0u64..2_000, b in 0u64..2_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(power_for_hold(lo, 2000) <= power_for_hold(hi, 2000));
        }
    }
}
