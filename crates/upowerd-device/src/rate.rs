//! Exponentially-weighted rate smoothing for `energy_rate`.

use crate::types::DeviceState;

/// Minimum interval between samples for a rate update to be trusted.
/// Shorter gaps are symptomatic of duplicate or out-of-order refresh events.
const MIN_SAMPLE_INTERVAL_SECS: u64 = 10;

/// Smoothing factor for the EWMA. Higher weights recent samples more; chosen
/// to converge within a handful of refresh ticks without being noisy on a
/// single outlier.
const EWMA_ALPHA: f64 = 0.3;

/// Tracks the energy/time of the previous sample and the current smoothed
/// rate, so `energy_rate` doesn't jump around on every noisy reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateSmoother {
    last_energy_wh: Option<f64>,
    last_update_secs: Option<u64>,
    smoothed_rate_w: f64,
}

impl RateSmoother {
    /// Creates a smoother with no prior sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in a new `(energy, timestamp)` sample and returns the current
    /// smoothed rate magnitude in watts.
    ///
    /// `instantaneous_w`, if the source reports `power_now` or
    /// `current_now × voltage_now` directly, is blended into the EWMA instead
    /// of the energy-delta estimate, which is noisier.
    ///
    /// Resets to zero when `state` transitions into `fully_charged` or
    /// `empty`; discards samples closer together than
    /// [`MIN_SAMPLE_INTERVAL_SECS`] or whose energy delta reverses sign
    /// against the smoothed trend (a `Δt`/`Δenergy` glitch, often seen right
    /// after resume).
    pub fn update(
        &mut self,
        energy_wh: f64,
        now_secs: u64,
        state: DeviceState,
        instantaneous_w: Option<f64>,
    ) -> f64 {
        if matches!(state, DeviceState::FullyCharged | DeviceState::Empty) {
            self.smoothed_rate_w = 0.0;
            self.last_energy_wh = Some(energy_wh);
            self.last_update_secs = Some(now_secs);
            return 0.0;
        }

        if !matches!(state, DeviceState::Charging | DeviceState::Discharging) {
            self.last_energy_wh = Some(energy_wh);
            self.last_update_secs = Some(now_secs);
            return self.smoothed_rate_w;
        }

        if let Some(sample_w) = instantaneous_w {
            self.blend(sample_w.abs());
            self.last_energy_wh = Some(energy_wh);
            self.last_update_secs = Some(now_secs);
            return self.smoothed_rate_w;
        }

        let (Some(prev_energy), Some(prev_time)) = (self.last_energy_wh, self.last_update_secs)
        else {
            self.last_energy_wh = Some(energy_wh);
            self.last_update_secs = Some(now_secs);
            return self.smoothed_rate_w;
        };

        let delta_t = now_secs.saturating_sub(prev_time);
        if delta_t < MIN_SAMPLE_INTERVAL_SECS {
            return self.smoothed_rate_w;
        }

        let delta_energy = energy_wh - prev_energy;
        let expected_sign_negative = matches!(state, DeviceState::Discharging);
        let sign_flip = (expected_sign_negative && delta_energy > 0.0)
            || (!expected_sign_negative && delta_energy < 0.0);

        if sign_flip {
            self.last_energy_wh = Some(energy_wh);
            self.last_update_secs = Some(now_secs);
            return self.smoothed_rate_w;
        }

        let sample_w = (delta_energy / delta_t as f64).abs() * 3600.0;
        self.blend(sample_w);

        self.last_energy_wh = Some(energy_wh);
        self.last_update_secs = Some(now_secs);
        self.smoothed_rate_w
    }

    fn blend(&mut self, sample_w: f64) {
        if self.last_energy_wh.is_none() {
            self.smoothed_rate_w = sample_w;
        } else {
            self.smoothed_rate_w = EWMA_ALPHA * sample_w + (1.0 - EWMA_ALPHA) * self.smoothed_rate_w;
        }
    }
}
