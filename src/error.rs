// src/error.rs
use crate::landmarks::Joint;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),
    #[error("Landmark {joint:?} missing for exercise {exercise}")]
    MissingLandmark { exercise: String, joint: Joint },
    #[error("Invalid joint angle: {0} (expected 0..=180 degrees)")]
    InvalidAngle(f64),
    #[error("Invalid profile for {exercise}: {reason}")]
    InvalidProfile { exercise: String, reason: String },
    #[error("Exercise identifier registered twice: {0}")]
    DuplicateExercise(String),
    #[error("Pose estimator failed: {0}")]
    Estimator(#[source] anyhow::Error),
}

impl EngineError {
    pub(crate) fn invalid_profile(exercise: &str, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            exercise: exercise.to_string(),
            reason: reason.into(),
        }
    }
}
