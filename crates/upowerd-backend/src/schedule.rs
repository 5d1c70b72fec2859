//! Per-device refresh cadence: slower steady-state polling, with a
//! temporary fast window right after a state transition so the rate
//! estimate converges quickly.

use std::time::{Duration, Instant};

use upowerd_device::DeviceKind;

/// Steady-state cadence for line-power sources and peripherals.
pub const LINE_POWER_OR_PERIPHERAL_INTERVAL: Duration = Duration::from_secs(30);

/// Steady-state cadence for system batteries and UPSes.
pub const BATTERY_INTERVAL: Duration = Duration::from_secs(60);

/// Cadence while inside the post-transition fast window.
pub const POST_TRANSITION_INTERVAL: Duration = Duration::from_secs(10);

/// How long the fast window lasts after a transition.
pub const POST_TRANSITION_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Tracks the last state transition for one device so the scheduler can
/// decide whether it's still in the fast window.
#[derive(Debug, Default)]
pub struct RefreshSchedule {
    transitioned_at: Option<Instant>,
}

impl RefreshSchedule {
    /// A schedule with no recorded transition, i.e. steady-state cadence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the device's state changed at `now`, entering the fast
    /// window.
    pub fn note_transition(&mut self, now: Instant) {
        self.transitioned_at = Some(now);
    }

    /// The interval to wait before the next scheduled refresh.
    pub fn interval_for(&self, kind: DeviceKind, now: Instant) -> Duration {
        if let Some(transitioned_at) = self.transitioned_at {
            if now.saturating_duration_since(transitioned_at) < POST_TRANSITION_WINDOW {
                return POST_TRANSITION_INTERVAL;
            }
        }

        match kind {
            DeviceKind::Battery | DeviceKind::Ups => BATTERY_INTERVAL,
            _ => LINE_POWER_OR_PERIPHERAL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_defaults_to_slow_cadence() {
        let schedule = RefreshSchedule::new();
        assert_eq!(
            schedule.interval_for(DeviceKind::Battery, Instant::now()),
            BATTERY_INTERVAL
        );
    }

    #[test]
    fn line_power_defaults_to_faster_cadence_than_battery() {
        let schedule = RefreshSchedule::new();
        assert_eq!(
            schedule.interval_for(DeviceKind::LinePower, Instant::now()),
            LINE_POWER_OR_PERIPHERAL_INTERVAL
        );
    }

    #[test]
    fn recent_transition_forces_fast_cadence_regardless_of_kind() {
        let mut schedule = RefreshSchedule::new();
        let now = Instant::now();
        schedule.note_transition(now);
        assert_eq!(schedule.interval_for(DeviceKind::Battery, now), POST_TRANSITION_INTERVAL);
    }

    #[test]
    fn fast_cadence_expires_after_the_window() {
        let mut schedule = RefreshSchedule::new();
        let transition_time = Instant::now();
        schedule.note_transition(transition_time);
        let later = transition_time + POST_TRANSITION_WINDOW + Duration::from_secs(1);
        assert_eq!(schedule.interval_for(DeviceKind::Battery, later), BATTERY_INTERVAL);
    }
}
