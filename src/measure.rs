//! Readout calculators: rate, beat error, amplitude and bph guessing.

use std::f64::consts::PI;

use crate::constants::{PRESET_BPH, SECS_PER_DAY};

/// Rate deviation in seconds per day.
///
/// A watch beating exactly `bph` times per hour completes one period (tic +
/// toc) every `7200 / bph` seconds.
///
/// # Arguments
/// * `bph` - Nominal beat rate
/// * `sample_rate` - Samples per second of the stream
/// * `period` - Measured period in samples
pub fn rate(bph: u32, sample_rate: f64, period: f64) -> f64 {
    (7200.0 / (bph as f64 * period / sample_rate) - 1.0) * SECS_PER_DAY
}

/// Beat error in milliseconds from the engine's sample offset.
pub fn beat_error_ms(be: f64, sample_rate: f64) -> f64 {
    be.abs() * 1000.0 / sample_rate
}

/// Balance amplitude in degrees from the two pulse durations.
///
/// Returns `None` when a pulse is missing or the two half-beat amplitudes
/// are physically implausible: each must lie in `(lift_angle, 360)` and
/// they must agree within 60°.
pub fn amplitude(lift_angle: f64, tic_pulse: f64, toc_pulse: f64, period: f64) -> Option<f64> {
    if tic_pulse <= 0.0 || toc_pulse <= 0.0 {
        return None;
    }
    let tic_amp = lift_angle * 0.5 / (PI * tic_pulse / period).sin();
    let toc_amp = lift_angle * 0.5 / (PI * toc_pulse / period).sin();

    let plausible = |amp: f64| lift_angle < amp && amp < 360.0;
    if plausible(tic_amp) && plausible(toc_amp) && (tic_amp - toc_amp).abs() < 60.0 {
        Some((tic_amp + toc_amp) / 2.0)
    } else {
        None
    }
}

/// Pulse duration, as a fraction of the period, produced by amplitude `amp`.
pub fn amplitude_to_time(lift_angle: f64, amp: f64) -> f64 {
    (lift_angle / (2.0 * amp)).asin() / PI
}

/// Closest preset beat rate for a period given in seconds.
///
/// Earlier presets win exact ties.
pub fn guess_bph(period_secs: f64) -> u32 {
    let bph = 7200.0 / period_secs;
    let mut min = bph;
    let mut best = PRESET_BPH[0];

    for &preset in PRESET_BPH.iter() {
        let diff = (bph - preset as f64).abs();
        if diff < min {
            min = diff;
            best = preset;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate_zero_at_nominal_period() {
        let sample_rate = 48000.0;
        let period = sample_rate * 3600.0 / 21600.0 * 2.0;
        assert_relative_eq!(rate(21600, sample_rate, period), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rate_sign() {
        let sample_rate = 44100.0;
        let nominal = 7200.0 / 28800.0 * sample_rate;
        // Shorter period: watch runs fast
        assert!(rate(28800, sample_rate, nominal * (1.0 - 1e-5)) > 0.0);
        assert!(rate(28800, sample_rate, nominal * (1.0 + 1e-5)) < 0.0);
        assert_relative_eq!(
            rate(28800, sample_rate, nominal / (1.0 + 10.0 / SECS_PER_DAY)),
            10.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_beat_error_ms() {
        assert_relative_eq!(beat_error_ms(-44.1, 44100.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(beat_error_ms(22.05, 44100.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_amplitude_symmetric_pulses() {
        let expected = 52.0 / (2.0 * (PI * 300.0 / 10000.0).sin());
        let amp = amplitude(52.0, 300.0, 300.0, 10000.0).unwrap();
        assert_relative_eq!(amp, expected, epsilon = 1e-9);
        assert!(amp >= 26.0);
    }

    #[test]
    fn test_amplitude_invalid_pulses() {
        assert!(amplitude(52.0, 0.0, 300.0, 10000.0).is_none());
        assert!(amplitude(52.0, 300.0, -1.0, 10000.0).is_none());
    }

    #[test]
    fn test_amplitude_out_of_range() {
        // Very short pulses imply more than a full turn
        assert!(amplitude(52.0, 5.0, 5.0, 10000.0).is_none());
        // Half-period pulses imply less than the lift angle
        assert!(amplitude(52.0, 5000.0, 5000.0, 10000.0).is_none());
    }

    #[test]
    fn test_amplitude_disagreement() {
        // ~276° vs ~207°
        assert!(amplitude(52.0, 300.0, 400.0, 10000.0).is_none());
        // ~276° vs ~255°
        assert!(amplitude(52.0, 300.0, 325.0, 10000.0).is_some());
    }

    #[test]
    fn test_amplitude_to_time_inverts_amplitude() {
        let period = 12000.0;
        let pulse = amplitude_to_time(52.0, 270.0) * period;
        assert_relative_eq!(
            amplitude(52.0, pulse, pulse, period).unwrap(),
            270.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_guess_bph_presets_roundtrip() {
        for &preset in PRESET_BPH.iter() {
            assert_eq!(guess_bph(7200.0 / preset as f64), preset);
        }
    }

    #[test]
    fn test_guess_bph_nearest() {
        assert_eq!(guess_bph(7200.0 / 21650.0), 21600);
        assert_eq!(guess_bph(7200.0 / 28000.0), 28800);
        assert_eq!(guess_bph(7200.0 / 1000.0), 12000);
    }

    #[test]
    fn test_guess_bph_tie_prefers_earlier() {
        // 0.125 s period is 57600 bph, exactly between 43200 and 72000
        assert_eq!(guess_bph(0.125), 43200);
    }
}
