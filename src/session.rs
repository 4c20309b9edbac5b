// src/session.rs - Per-session rep trackers with per-key locking
use crate::error::Result;
use crate::profile::{ExerciseProfile, PositionCue, Stage};
use crate::tracking::{RepState, RepTracker};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const NO_PERSON_FEEDBACK: &str = "No person detected";

/// Identifies one user/client session. Counters are never shared across
/// sessions, even for the same exercise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SessionKey {
    pub session: SessionId,
    /// Canonical exercise name (aliases resolved).
    pub exercise: String,
}

impl SessionKey {
    pub fn new(session: SessionId, exercise: impl Into<String>) -> Self {
        Self {
            session,
            exercise: exercise.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.exercise)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageReport {
    Up,
    Down,
    Unknown,
}

impl From<Stage> for StageReport {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Up => StageReport::Up,
            Stage::Down => StageReport::Down,
        }
    }
}

/// What the caller sees for one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub exercise: String,
    pub feedback: String,
    pub rep_count: u32,
    pub stage: StageReport,
    pub prev_stage: StageReport,
    pub angle: Option<f64>,
    pub cue: Option<PositionCue>,
}

impl FrameResult {
    pub fn is_detected(&self) -> bool {
        self.stage != StageReport::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub key: SessionKey,
    /// Whether a tracker existed for the key before the reset.
    pub existed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub active_sessions: usize,
    pub total_reps: u64,
}

type SharedTracker = Arc<Mutex<RepTracker>>;

/// Owns every [`RepTracker`], one per [`SessionKey`].
///
/// The map lock is only held long enough to find or insert a tracker; all
/// state changes happen under that tracker's own mutex, so updates to
/// different keys never wait on each other.
#[derive(Debug, Default)]
pub struct SessionStore {
    trackers: RwLock<HashMap<SessionKey, SharedTracker>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, key: &SessionKey) -> Option<SharedTracker> {
        self.trackers.read().get(key).cloned()
    }

    fn get_or_create(&self, key: &SessionKey) -> SharedTracker {
        if let Some(tracker) = self.existing(key) {
            return tracker;
        }
        self.trackers
            .write()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(RepTracker::new())))
            .clone()
    }

    /// Feeds one frame's angle, or reports the current counters unchanged
    /// when `angle` is `None` (no person detected).
    ///
    /// A tracker is created lazily on the first detected frame only.
    pub fn update(
        &self,
        key: &SessionKey,
        profile: &ExerciseProfile,
        angle: Option<f64>,
    ) -> Result<FrameResult> {
        let Some(angle) = angle else {
            return Ok(self.no_detection(key));
        };

        let tracker = self.get_or_create(key);
        let update = tracker.lock().update(profile, angle)?;

        Ok(FrameResult {
            exercise: key.exercise.clone(),
            feedback: update.feedback,
            rep_count: update.rep_count,
            stage: update.stage.into(),
            prev_stage: update.prev_stage.into(),
            angle: Some(update.angle),
            cue: update.cue,
        })
    }

    /// Read-only view used when no person is in frame.
    pub fn no_detection(&self, key: &SessionKey) -> FrameResult {
        let rep_count = self
            .snapshot(key)
            .map(|state| state.rep_count)
            .unwrap_or(0);

        FrameResult {
            exercise: key.exercise.clone(),
            feedback: NO_PERSON_FEEDBACK.to_string(),
            rep_count,
            stage: StageReport::Unknown,
            prev_stage: StageReport::Unknown,
            angle: None,
            cue: None,
        }
    }

    /// Reinitializes the key's tracker. Unknown keys are left uncreated.
    pub fn reset(&self, key: &SessionKey) -> Ack {
        let existed = match self.existing(key) {
            Some(tracker) => {
                tracker.lock().reset();
                true
            }
            None => false,
        };
        info!(session = %key, existed, "counter reset");
        Ack {
            key: key.clone(),
            existed,
        }
    }

    pub fn snapshot(&self, key: &SessionKey) -> Option<RepState> {
        self.existing(key).map(|tracker| tracker.lock().state())
    }

    /// Drops the key's tracker entirely, e.g. when a client disconnects.
    pub fn remove(&self, key: &SessionKey) -> bool {
        self.trackers.write().remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<SessionKey> {
        let mut keys: Vec<_> = self.trackers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> StoreStats {
        let trackers = self.trackers.read();
        let total_reps = trackers
            .values()
            .map(|tracker| u64::from(tracker.lock().state().rep_count))
            .sum();

        StoreStats {
            active_sessions: trackers.len(),
            total_reps,
        }
    }
}
