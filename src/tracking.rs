// src/tracking.rs - Two-threshold rep state machine
use crate::error::{EngineError, Result};
use crate::profile::{ExerciseProfile, PositionCue, Stage};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepState {
    pub stage: Stage,
    pub prev_stage: Stage,
    pub rep_count: u32,
    /// Informational only, never consulted by transitions.
    pub last_angle: Option<f64>,
}

impl Default for RepState {
    fn default() -> Self {
        Self {
            stage: Stage::Up,
            prev_stage: Stage::Up,
            rep_count: 0,
            last_angle: None,
        }
    }
}

/// Outcome of feeding one angle sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RepUpdate {
    pub stage: Stage,
    pub prev_stage: Stage,
    pub rep_count: u32,
    pub counted: bool,
    pub angle: f64,
    pub feedback: String,
    pub cue: Option<PositionCue>,
}

/// Stage and rep counter for one exercise session.
///
/// The profile is supplied on every update rather than stored, so a tracker
/// is plain data that the session store can own behind a lock.
#[derive(Debug, Clone, Default)]
pub struct RepTracker {
    state: RepState,
}

impl RepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = RepState::default();
    }

    /// Feeds one angle sample (degrees) through the profile's transitions.
    ///
    /// Angles outside `[0, 180]` or non-finite are rejected with
    /// [`EngineError::InvalidAngle`] and leave the tracker untouched.
    pub fn update(&mut self, profile: &ExerciseProfile, angle: f64) -> Result<RepUpdate> {
        if !angle.is_finite() || !(0.0..=180.0).contains(&angle) {
            return Err(EngineError::InvalidAngle(angle));
        }

        let state = &mut self.state;
        let prev_stage = state.stage;
        let mut counted = false;

        if let Some(target) = profile.region_stage(angle) {
            if target != state.stage {
                debug!(
                    exercise = %profile.name,
                    from = %state.stage,
                    to = %target,
                    angle,
                    "stage transition"
                );
                state.stage = target;
                if target == profile.count_on {
                    state.rep_count += 1;
                    counted = true;
                    info!(exercise = %profile.name, reps = state.rep_count, "rep counted");
                }
            }
        }

        state.prev_stage = prev_stage;
        state.last_angle = Some(angle);

        Ok(RepUpdate {
            stage: state.stage,
            prev_stage,
            rep_count: state.rep_count,
            counted,
            angle,
            feedback: profile.feedback_for(angle).to_string(),
            cue: profile.cue_for(angle).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileRegistry;
    use proptest::prelude::*;

    fn profile(id: &str) -> &'static ExerciseProfile {
        ProfileRegistry::builtin().get(id).unwrap()
    }

    fn feed(tracker: &mut RepTracker, id: &str, angles: &[f64]) -> Vec<RepUpdate> {
        angles
            .iter()
            .map(|&a| tracker.update(profile(id), a).unwrap())
            .collect()
    }

    #[test]
    fn starts_up_with_zero_reps() {
        let state = RepTracker::new().state();
        assert_eq!(state.stage, Stage::Up);
        assert_eq!(state.prev_stage, Stage::Up);
        assert_eq!(state.rep_count, 0);
        assert_eq!(state.last_angle, None);
    }

    #[test]
    fn squat_sequence_counts_one_rep() {
        let mut tracker = RepTracker::new();
        let updates = feed(&mut tracker, "squat", &[170.0, 80.0, 75.0, 170.0]);

        assert_eq!(updates[0].stage, Stage::Up);
        assert_eq!(updates[1].stage, Stage::Down);
        assert_eq!(updates[1].prev_stage, Stage::Up);
        assert_eq!(updates[2].stage, Stage::Down);
        assert!(!updates[2].counted);
        assert_eq!(updates[3].stage, Stage::Up);
        assert_eq!(updates[3].prev_stage, Stage::Down);
        assert!(updates[3].counted);

        let state = tracker.state();
        assert_eq!(state.stage, Stage::Up);
        assert_eq!(state.rep_count, 1);
        assert_eq!(state.last_angle, Some(170.0));
    }

    #[test]
    fn bicep_curl_counts_on_contraction() {
        let mut tracker = RepTracker::new();
        let updates = feed(&mut tracker, "bicep", &[160.0, 40.0, 160.0, 40.0, 160.0]);

        assert_eq!(updates[0].stage, Stage::Down);
        assert!(updates[1].counted);
        assert!(!updates[2].counted);
        assert_eq!(tracker.state().rep_count, 2);
        assert_eq!(tracker.state().stage, Stage::Down);
    }

    #[test]
    fn pushup_full_cycle_counts_once() {
        let mut tracker = RepTracker::new();
        feed(&mut tracker, "pushup", &[170.0, 70.0, 170.0, 170.0, 165.0]);
        assert_eq!(tracker.state().rep_count, 1);
    }

    #[test]
    fn threshold_values_themselves_sit_in_the_band() {
        let mut tracker = RepTracker::new();
        feed(&mut tracker, "squat", &[90.0, 160.0, 90.0]);
        assert_eq!(tracker.state().stage, Stage::Up);
        assert_eq!(tracker.state().rep_count, 0);
    }

    #[test]
    fn feedback_is_independent_of_stage() {
        let mut tracker = RepTracker::new();
        let update = tracker.update(profile("squat"), 100.0).unwrap();
        assert_eq!(update.stage, Stage::Up);
        assert_eq!(update.feedback, "Good form");
        assert_eq!(update.cue.unwrap().message, "Good Squat");

        let update = tracker.update(profile("squat"), 50.0).unwrap();
        assert_eq!(update.feedback, "Adjust your squat depth");
    }

    #[test]
    fn invalid_angle_leaves_state_untouched() {
        let mut tracker = RepTracker::new();
        feed(&mut tracker, "squat", &[80.0]);
        let before = tracker.state();

        for bad in [-1.0, 180.5, f64::NAN, f64::INFINITY] {
            let err = tracker.update(profile("squat"), bad).unwrap_err();
            assert!(matches!(err, EngineError::InvalidAngle(_)));
        }
        assert_eq!(tracker.state(), before);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut tracker = RepTracker::new();
        feed(&mut tracker, "squat", &[80.0, 170.0, 80.0]);
        tracker.reset();
        assert_eq!(tracker.state(), RepState::default());
    }

    proptest! {
        #[test]
        fn prop_squat_band_never_changes_state(
            first in prop_oneof![Just(170.0f64), Just(70.0f64)],
            jitter in proptest::collection::vec(91.0f64..159.0, 1..200),
        ) {
            let mut tracker = RepTracker::new();
            tracker.update(profile("squat"), first).unwrap();
            let settled = tracker.state();

            for angle in jitter {
                let update = tracker.update(profile("squat"), angle).unwrap();
                prop_assert_eq!(update.stage, settled.stage);
                prop_assert_eq!(update.rep_count, settled.rep_count);
                prop_assert!(!update.counted);
            }
        }

        #[test]
        fn prop_rep_count_never_decreases(
            angles in proptest::collection::vec(0.0f64..=180.0, 1..300),
        ) {
            let mut tracker = RepTracker::new();
            let mut last = 0;
            for angle in angles {
                let update = tracker.update(profile("pushup"), angle).unwrap();
                prop_assert!(update.rep_count >= last);
                prop_assert!(update.rep_count <= last + 1);
                last = update.rep_count;
            }
        }
    }
}
