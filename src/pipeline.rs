// src/pipeline.rs - Frame → joints → angle → session store
use crate::error::{EngineError, Result};
use crate::geometry::joint_angle;
use crate::landmarks::JointSet;
use crate::mediapipe_bridge::PoseEstimator;
use crate::profile::{normalize_id, ExerciseProfile, ProfileRegistry};
use crate::session::{Ack, FrameResult, SessionId, SessionKey, SessionStore};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Measures the profile's tracked angle in one joint set.
pub fn measure_angle(profile: &ExerciseProfile, joints: &JointSet) -> Result<f64> {
    let point = |joint| {
        joints.get(joint).ok_or_else(|| EngineError::MissingLandmark {
            exercise: profile.name.clone(),
            joint,
        })
    };

    let triple = &profile.joints;
    let a = point(triple.proximal)?;
    let b = point(triple.vertex)?;
    let c = point(triple.distal)?;
    Ok(joint_angle(a, b, c))
}

/// Rep counting over already-extracted joints. Cheap to clone; clones share
/// the same session store.
#[derive(Debug, Clone)]
pub struct RepEngine {
    registry: Arc<ProfileRegistry>,
    store: Arc<SessionStore>,
}

impl Default for RepEngine {
    fn default() -> Self {
        Self::new(ProfileRegistry::builtin().clone())
    }
}

impl RepEngine {
    pub fn new(registry: ProfileRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            store: Arc::new(SessionStore::new()),
        }
    }

    pub fn with_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Resolves an exercise identifier (or alias) to its store key.
    pub fn key_for(&self, session: &SessionId, exercise_id: &str) -> Result<SessionKey> {
        let profile = self.registry.get(exercise_id)?;
        Ok(SessionKey::new(session.clone(), profile.name.clone()))
    }

    /// Processes one frame's joints. `None` means the pose model saw nobody.
    ///
    /// Unknown exercises are rejected before any state is touched. A joint
    /// set lacking one of the profile's joints is handled like a frame with
    /// no person in it.
    pub fn process(
        &self,
        session: &SessionId,
        exercise_id: &str,
        joints: Option<&JointSet>,
    ) -> Result<FrameResult> {
        let profile = self.registry.get(exercise_id)?;
        let key = SessionKey::new(session.clone(), profile.name.clone());

        let angle = match joints {
            None => None,
            Some(joints) => match measure_angle(profile, joints) {
                Ok(angle) => Some(angle),
                Err(err) => {
                    warn!(session = %key, error = %err, "degrading frame to no detection");
                    None
                }
            },
        };

        match self.store.update(&key, profile, angle) {
            Err(EngineError::InvalidAngle(angle)) => {
                debug_assert!(
                    (0.0..=180.0).contains(&angle),
                    "joint angle out of range: {angle}"
                );
                warn!(session = %key, angle, "discarding out-of-range joint angle");
                Ok(self.store.no_detection(&key))
            }
            other => other,
        }
    }

    /// Resets one session's counter for an exercise. Always acknowledges;
    /// identifiers that were never used (or are not registered) create no
    /// state.
    pub fn reset(&self, session: &SessionId, exercise_id: &str) -> Ack {
        let exercise = self
            .registry
            .get(exercise_id)
            .map(|profile| profile.name.clone())
            .unwrap_or_else(|_| normalize_id(exercise_id));
        self.store.reset(&SessionKey::new(session.clone(), exercise))
    }
}

/// Full per-frame path: runs the pose model, then the [`RepEngine`].
pub struct FramePipeline<E> {
    estimator: E,
    engine: RepEngine,
}

impl<E: PoseEstimator> FramePipeline<E> {
    pub fn new(estimator: E) -> Self {
        Self::with_engine(estimator, RepEngine::default())
    }

    pub fn with_engine(estimator: E, engine: RepEngine) -> Self {
        Self { estimator, engine }
    }

    pub fn engine(&self) -> &RepEngine {
        &self.engine
    }

    /// Estimator failures are returned as [`EngineError::Estimator`] and
    /// leave all counters untouched.
    pub fn process_frame(
        &self,
        session: &SessionId,
        exercise_id: &str,
        frame: &DynamicImage,
    ) -> Result<FrameResult> {
        // Reject unknown exercises before paying for inference
        self.engine.registry().get(exercise_id)?;

        let joints = self
            .estimator
            .estimate(frame)
            .map_err(EngineError::Estimator)?;
        debug!(
            session = %session,
            exercise = exercise_id,
            detected = joints.is_some(),
            "pose estimated"
        );

        self.engine.process(session, exercise_id, joints.as_ref())
    }

    pub fn reset(&self, session: &SessionId, exercise_id: &str) -> Ack {
        self.engine.reset(session, exercise_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Joint;
    use crate::session::{StageReport, NO_PERSON_FEEDBACK};

    fn estimator<F>(f: F) -> F
    where
        F: Fn(&DynamicImage) -> anyhow::Result<Option<JointSet>> + Send + Sync,
    {
        f
    }

    /// Left leg with the knee bent to `degrees`.
    fn squat_pose(degrees: f64) -> JointSet {
        let knee = (0.5, 0.5);
        let theta = degrees.to_radians();
        JointSet::new()
            .with(Joint::LeftHip, knee.0, knee.1 - 0.2)
            .with(Joint::LeftKnee, knee.0, knee.1)
            .with(
                Joint::LeftAnkle,
                knee.0 + 0.2 * theta.sin(),
                knee.1 - 0.2 * theta.cos(),
            )
    }

    #[test]
    fn measures_knee_angle() {
        let squat = ProfileRegistry::builtin().get("squat").unwrap();
        let angle = measure_angle(squat, &squat_pose(75.0)).unwrap();
        assert!((angle - 75.0).abs() < 1e-6);
    }

    #[test]
    fn missing_joint_is_reported() {
        let squat = ProfileRegistry::builtin().get("squat").unwrap();
        let joints = JointSet::new().with(Joint::LeftHip, 0.5, 0.3);
        let err = measure_angle(squat, &joints).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingLandmark { joint: Joint::LeftKnee, .. }
        ));
    }

    #[test]
    fn missing_joint_degrades_to_no_detection() {
        let engine = RepEngine::default();
        let session = SessionId::from("s1");
        let arm_only = JointSet::new()
            .with(Joint::RightShoulder, 0.5, 0.3)
            .with(Joint::RightElbow, 0.5, 0.5)
            .with(Joint::RightWrist, 0.5, 0.7);

        let result = engine.process(&session, "squat", Some(&arm_only)).unwrap();
        assert_eq!(result.feedback, NO_PERSON_FEEDBACK);
        assert_eq!(result.stage, StageReport::Unknown);
        assert!(engine.store().keys().is_empty());
    }

    #[test]
    fn unknown_exercise_creates_no_state() {
        let engine = RepEngine::default();
        let session = SessionId::from("s1");

        let err = engine
            .process(&session, "lunge", Some(&squat_pose(80.0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownExercise(ref id) if id == "lunge"));

        let err = engine.process(&session, "lunge", None).unwrap_err();
        assert!(matches!(err, EngineError::UnknownExercise(_)));
        assert!(engine.store().keys().is_empty());
    }

    #[test]
    fn aliases_share_one_counter() {
        let engine = RepEngine::default();
        let session = SessionId::from("s1");
        let curl = |deg: f64| {
            let theta = deg.to_radians();
            JointSet::new()
                .with(Joint::RightShoulder, 0.5, 0.3)
                .with(Joint::RightElbow, 0.5, 0.5)
                .with(
                    Joint::RightWrist,
                    0.5 + 0.2 * theta.sin(),
                    0.5 - 0.2 * theta.cos(),
                )
        };

        engine.process(&session, "bicep", Some(&curl(160.0))).unwrap();
        let result = engine.process(&session, "curl", Some(&curl(40.0))).unwrap();
        assert_eq!(result.exercise, "bicep");
        assert_eq!(result.rep_count, 1);
    }

    #[test]
    fn reset_of_unregistered_exercise_still_acks() {
        let engine = RepEngine::default();
        let ack = engine.reset(&SessionId::from("s1"), "Lunge");
        assert!(!ack.existed);
        assert_eq!(ack.key.exercise, "lunge");
    }

    #[test]
    fn frame_pipeline_short_circuits_on_no_detection() {
        let pipeline = FramePipeline::new(estimator(|_| Ok(None)));
        let frame = DynamicImage::new_rgb8(2, 2);
        let result = pipeline
            .process_frame(&SessionId::from("s1"), "pushup", &frame)
            .unwrap();
        assert!(!result.is_detected());
        assert!(pipeline.engine().store().keys().is_empty());
    }

    #[test]
    fn frame_pipeline_propagates_estimator_failure() {
        let pipeline = FramePipeline::new(estimator(|_| Err(anyhow::anyhow!("inference timed out"))));
        let frame = DynamicImage::new_rgb8(2, 2);
        let err = pipeline
            .process_frame(&SessionId::from("s1"), "squat", &frame)
            .unwrap_err();
        assert!(matches!(err, EngineError::Estimator(_)));
    }

    #[test]
    fn frame_pipeline_counts_reps() {
        let pipeline = FramePipeline::new(estimator(|frame| {
            // Frame width encodes the knee angle for this test
            Ok(Some(squat_pose(frame.width() as f64)))
        }));
        let session = SessionId::from("s1");

        let mut last = None;
        for deg in [170, 80, 75, 170] {
            let frame = DynamicImage::new_rgb8(deg, 1);
            last = Some(pipeline.process_frame(&session, "squat", &frame).unwrap());
        }

        let last = last.unwrap();
        assert_eq!(last.rep_count, 1);
        assert_eq!(last.stage, StageReport::Up);
        assert_eq!(last.prev_stage, StageReport::Down);
    }
}
