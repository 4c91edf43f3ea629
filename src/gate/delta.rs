use crate::gate::baseline::Baseline;

/// TASK window interpretation against the current baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeltaReport {
    /// No REST baseline yet; only the raw window mean is available.
    WaitingForBaseline { window_mean: f64 },
    Delta {
        delta: f64,
        window_mean: f64,
        baseline_mean: f64,
    },
}

/// Task minus rest. Pure; reads the baseline, never writes it.
pub fn compute_delta(window_mean: f64, baseline: &Baseline) -> DeltaReport {
    match baseline.value() {
        None => DeltaReport::WaitingForBaseline { window_mean },
        Some(baseline_mean) => DeltaReport::Delta {
            delta: window_mean - baseline_mean,
            window_mean,
            baseline_mean,
        },
    }
}
