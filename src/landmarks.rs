// src/landmarks.rs - Named pose joints and per-frame joint sets
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalized image-space position, both axes in [0, 1].
pub type Point2D = Point2<f64>;

/// The 33 body landmarks of the MediaPipe pose topology, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Joint {
    pub const ALL: [Joint; 33] = [
        Joint::Nose,
        Joint::LeftEyeInner,
        Joint::LeftEye,
        Joint::LeftEyeOuter,
        Joint::RightEyeInner,
        Joint::RightEye,
        Joint::RightEyeOuter,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::MouthLeft,
        Joint::MouthRight,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftPinky,
        Joint::RightPinky,
        Joint::LeftIndex,
        Joint::RightIndex,
        Joint::LeftThumb,
        Joint::RightThumb,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    /// Position of this joint in a MediaPipe pose landmark array.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Joint> {
        Self::ALL.get(index).copied()
    }
}

/// Wire form of a single joint position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

/// Joint positions detected in a single frame.
///
/// A frame where no person was found is represented by the absence of a
/// `JointSet` (`Option<JointSet>`), never by an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<Joint, Landmark>", into = "HashMap<Joint, Landmark>")]
pub struct JointSet {
    joints: HashMap<Joint, Point2D>,
}

impl JointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a MediaPipe-ordered landmark array. The z component
    /// is ignored and entries with non-finite x/y are skipped.
    pub fn from_landmarks(landmarks: &[[f64; 3]]) -> Self {
        let joints = landmarks
            .iter()
            .enumerate()
            .filter_map(|(idx, lm)| {
                let joint = Joint::from_index(idx)?;
                let point = Point2D::new(lm[0], lm[1]);
                is_finite(&point).then_some((joint, point))
            })
            .collect();
        Self { joints }
    }

    pub fn with(mut self, joint: Joint, x: f64, y: f64) -> Self {
        self.insert(joint, Point2D::new(x, y));
        self
    }

    pub fn insert(&mut self, joint: Joint, point: Point2D) {
        self.joints.insert(joint, point);
    }

    /// Returns the joint's position if it was detected with finite coordinates.
    pub fn get(&self, joint: Joint) -> Option<Point2D> {
        self.joints.get(&joint).copied().filter(is_finite)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

fn is_finite(point: &Point2D) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

impl From<HashMap<Joint, Landmark>> for JointSet {
    fn from(raw: HashMap<Joint, Landmark>) -> Self {
        let joints = raw
            .into_iter()
            .map(|(joint, lm)| (joint, Point2D::new(lm.x, lm.y)))
            .collect();
        Self { joints }
    }
}

impl From<JointSet> for HashMap<Joint, Landmark> {
    fn from(set: JointSet) -> Self {
        set.joints
            .into_iter()
            .map(|(joint, p)| (joint, Landmark { x: p.x, y: p.y }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_mediapipe_order() {
        assert_eq!(Joint::LeftShoulder.index(), 11);
        assert_eq!(Joint::RightWrist.index(), 16);
        assert_eq!(Joint::LeftHip.index(), 23);
        assert_eq!(Joint::RightFootIndex.index(), 32);
        assert_eq!(Joint::from_index(25), Some(Joint::LeftKnee));
        assert_eq!(Joint::from_index(33), None);
    }

    #[test]
    fn from_landmarks_skips_non_finite_entries() {
        let mut raw = vec![[0.5, 0.5, 0.0]; 33];
        raw[Joint::RightElbow.index()] = [f64::NAN, 0.4, 0.0];

        let set = JointSet::from_landmarks(&raw);
        assert_eq!(set.len(), 32);
        assert!(set.get(Joint::RightElbow).is_none());
        assert_eq!(set.get(Joint::RightWrist), Some(Point2D::new(0.5, 0.5)));
    }

    #[test]
    fn get_filters_non_finite_points() {
        let set = JointSet::new().with(Joint::LeftKnee, f64::INFINITY, 0.2);
        assert!(set.get(Joint::LeftKnee).is_none());
    }

    #[test]
    fn deserializes_from_named_joints() {
        let json = r#"{"RIGHT_SHOULDER": {"x": 0.1, "y": 0.2}, "LEFT_HIP": {"x": 0.3, "y": 0.4}}"#;
        let set: JointSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get(Joint::RightShoulder), Some(Point2D::new(0.1, 0.2)));
        assert_eq!(set.get(Joint::LeftHip), Some(Point2D::new(0.3, 0.4)));
        assert!(set.get(Joint::Nose).is_none());
    }
}
