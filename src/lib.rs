// src/lib.rs
//! Repetition counting and form feedback from 2D pose landmarks.
//!
//! Frames go through an external [`PoseEstimator`]; the tracked joint angle
//! of the selected exercise drives a two-threshold [`RepTracker`] held per
//! session in a [`SessionStore`].

pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod landmarks;
pub mod mediapipe_bridge;
pub mod pipeline;
pub mod profile;
pub mod session;
pub mod tracking;

pub use config::EngineConfig;
pub use data::{SessionRecorder, SessionSummary};
pub use error::{EngineError, Result};
pub use geometry::joint_angle;
pub use landmarks::{Joint, JointSet, Point2D};
pub use mediapipe_bridge::{MediaPipeWrapper, PoseEstimator};
pub use pipeline::{measure_angle, FramePipeline, RepEngine};
pub use profile::{
    builtin_profiles, CueStatus, ExerciseProfile, FeedbackBand, JointTriple, PositionCue,
    PositionCues, ProfileRegistry, Stage, StageThresholds,
};
pub use session::{Ack, FrameResult, SessionId, SessionKey, SessionStore, StageReport};
pub use tracking::{RepState, RepTracker, RepUpdate};
