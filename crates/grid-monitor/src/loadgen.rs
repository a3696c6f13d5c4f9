// crates/grid-monitor/src/loadgen.rs
// ============================================================================
// Module: Load Variation (data generator)
// Description: The optional "nudge load profile for realism" step named in
//              spec.md §4.10 step 1.
// Purpose: Let the monitoring loop exercise the zone engines against a
//          moving target without requiring any particular data generator
//          to exist — the loop runs identically with none configured.
// Dependencies: grid-core, rand
// ============================================================================

//! ## Overview
//! Several source paths referenced a `vary_loads`-style data generator
//! method that was never defined anywhere in the retrieved sources
//! (SPEC_FULL.md's open questions). Rather than fabricate its exact
//! behavior, this module defines the narrow seam the loop calls through —
//! [`LoadGenerator::vary_loads`] — and the loop tolerates the seam being
//! entirely absent (`MonitoringLoop` takes `Option<Arc<dyn LoadGenerator>>`).
//! Two concrete implementations are provided: [`RandomWalkLoadGenerator`]
//! (a conservative default) and [`DailyProfileLoadGenerator`], grounded on
//! `original_source/src/simulation/data_generator.py`'s `apply_daily_profile`
//! — the nearest thing the system this control plane was distilled from
//! has to a named load-variation method.

use std::sync::atomic::Ordering;

use grid_core::SimulationFacade;
use rand::Rng;

/// A pluggable source of cycle-to-cycle load variation. Implementations
/// must never panic and should keep changes small relative to baseline
/// load, since every mutation still passes through the facade's ordinary
/// (non-sandboxed) setters and is visible to the next detection pass.
pub trait LoadGenerator: Send + Sync {
    /// Nudges zero or more loads in `facade` in place.
    fn vary_loads(&self, facade: &mut SimulationFacade);
}

/// Scales every load by an independent factor drawn uniformly from
/// `[1.0 - swing, 1.0 + swing]` each cycle, matching ordinary minute-to-
/// minute load fluctuation rather than anything event-like.
pub struct RandomWalkLoadGenerator {
    swing: f64,
}

impl RandomWalkLoadGenerator {
    /// Builds a generator that varies each load by up to `swing` (a
    /// fraction, e.g. `0.02` for +/-2%) per cycle.
    #[must_use]
    pub fn new(swing: f64) -> Self {
        Self { swing: swing.abs() }
    }
}

impl Default for RandomWalkLoadGenerator {
    fn default() -> Self {
        Self::new(0.02)
    }
}

impl LoadGenerator for RandomWalkLoadGenerator {
    fn vary_loads(&self, facade: &mut SimulationFacade) {
        let load_ids: Vec<_> = facade.state().loads.iter().map(|l| l.id).collect();
        let mut rng = rand::thread_rng();
        for id in load_ids {
            let factor = 1.0 + rng.gen_range(-self.swing..=self.swing);
            let _ = facade.scale_load(id, factor);
        }
    }
}

/// Scales every load by a single shared daily load-factor curve instead of
/// an independent-per-load random walk, grounded on
/// `original_source/src/simulation/data_generator.py`'s `apply_daily_profile`:
/// a two-peak sinusoid (morning and evening) clamped to `[0.5, 1.2]`.
pub struct DailyProfileLoadGenerator {
    hour: std::sync::atomic::AtomicU64,
}

impl DailyProfileLoadGenerator {
    /// Builds a generator starting at `start_hour` (`0..24`, wraps).
    #[must_use]
    pub fn new(start_hour: u64) -> Self {
        Self { hour: std::sync::atomic::AtomicU64::new(start_hour % 24) }
    }

    /// The load factor `apply_daily_profile` computes for `hour` (`0..24`):
    /// a morning ramp centered near 06:00 plus an evening peak centered
    /// near 17:00, clamped to `[0.5, 1.2]`.
    #[must_use]
    pub fn load_factor_for_hour(hour: f64) -> f64 {
        use std::f64::consts::PI;
        let factor = 0.7
            + 0.3 * (0.5 * (PI * (hour - 6.0) / 12.0).sin() + 0.3 * (PI * (hour - 17.0) / 4.0).sin());
        factor.clamp(0.5, 1.2)
    }
}

impl Default for DailyProfileLoadGenerator {
    /// Starts the clock at midnight, matching the original's default run
    /// from hour 0.
    fn default() -> Self {
        Self::new(0)
    }
}

impl LoadGenerator for DailyProfileLoadGenerator {
    fn vary_loads(&self, facade: &mut SimulationFacade) {
        let hour = self.hour.fetch_add(1, Ordering::Relaxed) % 24;
        let factor = Self::load_factor_for_hour(hour as f64);
        let load_ids: Vec<_> = facade.state().loads.iter().map(|l| l.id).collect();
        for id in load_ids {
            let _ = facade.scale_load(id, factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_profile_factor_stays_within_the_original_clamp_bounds() {
        for hour in 0..24 {
            let factor = DailyProfileLoadGenerator::load_factor_for_hour(hour as f64);
            assert!((0.5..=1.2).contains(&factor), "hour {hour} produced out-of-range factor {factor}");
        }
    }

    #[test]
    fn daily_profile_advances_one_hour_per_cycle_and_wraps() {
        let generator = DailyProfileLoadGenerator::new(23);
        let mut facade = SimulationFacade::with_canonical_case();
        generator.vary_loads(&mut facade);
        assert_eq!(generator.hour.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn random_walk_keeps_load_within_its_configured_swing() {
        let mut facade = SimulationFacade::with_canonical_case();
        let before: Vec<f64> = facade.state().loads.iter().map(|l| l.p_mw).collect();
        let generator = RandomWalkLoadGenerator::new(0.02);
        generator.vary_loads(&mut facade);
        for (load, before_mw) in facade.state().loads.iter().zip(before) {
            let ratio = load.p_mw / before_mw.max(f64::EPSILON);
            assert!((0.97..=1.03).contains(&ratio), "load {} moved by more than its swing", load.id);
        }
    }
}
