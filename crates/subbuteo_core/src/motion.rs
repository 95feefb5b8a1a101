//! Debounced "is anything still moving" detector.

use crate::math::Fixed;

/// Tracks whether play is in motion.
///
/// Motion starts on the first frame whose speed exceeds the threshold, and
/// stops only after `settle_frames` consecutive frames at or below it, so a
/// ball rolling to rest does not flicker between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionMonitor {
    threshold: Fixed,
    settle_frames: u32,
    in_motion: bool,
    quiet_frames: u32,
}

impl MotionMonitor {
    /// Monitor that starts at rest.
    #[must_use]
    pub const fn new(threshold: Fixed, settle_frames: u32) -> Self {
        Self {
            threshold,
            settle_frames,
            in_motion: false,
            quiet_frames: 0,
        }
    }

    /// Whether play is currently in motion.
    #[must_use]
    pub const fn in_motion(&self) -> bool {
        self.in_motion
    }

    /// Feed one frame's combined speed. Returns the new state when it changes.
    pub fn sample(&mut self, speed: Fixed) -> Option<bool> {
        if speed > self.threshold {
            self.quiet_frames = 0;
            if !self.in_motion {
                self.in_motion = true;
                return Some(true);
            }
            return None;
        }

        if self.in_motion {
            self.quiet_frames += 1;
            if self.quiet_frames >= self.settle_frames {
                self.in_motion = false;
                self.quiet_frames = 0;
                return Some(false);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> Fixed {
        Fixed::from_num(0.5)
    }

    #[test]
    fn test_starts_immediately() {
        let mut monitor = MotionMonitor::new(Fixed::from_num(0.01), 30);
        assert_eq!(monitor.sample(Fixed::ZERO), None);
        assert_eq!(monitor.sample(fast()), Some(true));
        assert_eq!(monitor.sample(fast()), None);
        assert!(monitor.in_motion());
    }

    #[test]
    fn test_stops_after_settle_frames() {
        let mut monitor = MotionMonitor::new(Fixed::from_num(0.01), 30);
        monitor.sample(fast());
        for _ in 0..29 {
            assert_eq!(monitor.sample(Fixed::ZERO), None);
        }
        assert_eq!(monitor.sample(Fixed::ZERO), Some(false));
        assert!(!monitor.in_motion());
    }

    #[test]
    fn test_speed_spike_restarts_settling() {
        let mut monitor = MotionMonitor::new(Fixed::from_num(0.01), 30);
        monitor.sample(fast());
        for _ in 0..20 {
            monitor.sample(Fixed::ZERO);
        }
        assert_eq!(monitor.sample(fast()), None);
        for _ in 0..29 {
            assert_eq!(monitor.sample(Fixed::ZERO), None);
        }
        assert_eq!(monitor.sample(Fixed::ZERO), Some(false));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let threshold = Fixed::from_num(0.01);
        let mut monitor = MotionMonitor::new(threshold, 30);
        assert_eq!(monitor.sample(threshold), None);
    }
}
