// src/mediapipe_bridge.rs - Seam to the external pose-estimation model
use crate::landmarks::JointSet;
use anyhow::Result;
use image::DynamicImage;

/// An external pose model: given a frame, returns the detected joints, or
/// `None` when no person is in view.
///
/// Implementations own their own timeouts; the engine never retries.
pub trait PoseEstimator: Send + Sync {
    fn estimate(&self, frame: &DynamicImage) -> Result<Option<JointSet>>;
}

impl<F> PoseEstimator for F
where
    F: Fn(&DynamicImage) -> Result<Option<JointSet>> + Send + Sync,
{
    fn estimate(&self, frame: &DynamicImage) -> Result<Option<JointSet>> {
        self(frame)
    }
}

/// Wraps a backend that emits raw MediaPipe pose landmarks (`[x, y, z]` in
/// landmark-index order, empty when nothing was detected).
pub struct MediaPipeWrapper<B> {
    backend: B,
    min_landmarks: usize,
}

impl<B> MediaPipeWrapper<B>
where
    B: Fn(&DynamicImage) -> Result<Vec<[f64; 3]>> + Send + Sync,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            min_landmarks: 1,
        }
    }

    /// Treat results with fewer landmarks than this as "no detection".
    pub fn with_min_landmarks(mut self, min_landmarks: usize) -> Self {
        self.min_landmarks = min_landmarks.max(1);
        self
    }
}

impl<B> PoseEstimator for MediaPipeWrapper<B>
where
    B: Fn(&DynamicImage) -> Result<Vec<[f64; 3]>> + Send + Sync,
{
    fn estimate(&self, frame: &DynamicImage) -> Result<Option<JointSet>> {
        let landmarks = (self.backend)(frame)?;
        if landmarks.len() < self.min_landmarks {
            return Ok(None);
        }
        Ok(Some(JointSet::from_landmarks(&landmarks)))
    }
}
