// src/profile.rs - Exercise profiles and the registry that resolves them
//
// Every exercise is described by data: which three joints form the tracked
// angle, where the extended and contracted regions begin, which stage the
// extended region corresponds to, and which stage entry counts a rep.
use crate::error::{EngineError, Result};
use crate::landmarks::Joint;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Up,
    Down,
}

impl Stage {
    pub fn opposite(self) -> Stage {
        match self {
            Stage::Up => Stage::Down,
            Stage::Down => Stage::Up,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Up => write!(f, "up"),
            Stage::Down => write!(f, "down"),
        }
    }
}

/// The tracked angle is measured at `vertex`, between `proximal` and `distal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointTriple {
    pub proximal: Joint,
    pub vertex: Joint,
    pub distal: Joint,
}

impl JointTriple {
    pub fn new(proximal: Joint, vertex: Joint, distal: Joint) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    pub fn as_array(&self) -> [Joint; 3] {
        [self.proximal, self.vertex, self.distal]
    }
}

/// Two distinct thresholds, in degrees. Angles strictly between them fall in
/// the hysteresis band and never change the stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageThresholds {
    pub extended_above: f64,
    pub contracted_below: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBand {
    /// Exclusive lower bound of the good range.
    pub good_above: f64,
    /// Exclusive upper bound of the good range.
    pub good_below: f64,
    pub good_message: String,
    pub fault_message: String,
}

impl FeedbackBand {
    pub fn classify(&self, angle: f64) -> &str {
        if angle > self.good_above && angle < self.good_below {
            &self.good_message
        } else {
            &self.fault_message
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueStatus {
    Good,
    Perfect,
    Progress,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCue {
    pub message: String,
    pub status: CueStatus,
}

impl PositionCue {
    pub fn new(message: &str, status: CueStatus) -> Self {
        Self {
            message: message.to_string(),
            status,
        }
    }
}

/// Coaching cue for where the limb currently is, keyed on the same
/// thresholds as the stage regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCues {
    pub extended: PositionCue,
    pub contracted: PositionCue,
    pub between: PositionCue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub joints: JointTriple,
    pub thresholds: StageThresholds,
    /// Stage reached when the angle rises above `extended_above`.
    pub extended_stage: Stage,
    /// Entering this stage from the opposite one counts a rep.
    pub count_on: Stage,
    pub feedback: FeedbackBand,
    #[serde(default)]
    pub cues: Option<PositionCues>,
}

impl ExerciseProfile {
    /// Stage implied by the angle, or `None` inside the hysteresis band.
    pub fn region_stage(&self, angle: f64) -> Option<Stage> {
        if angle > self.thresholds.extended_above {
            Some(self.extended_stage)
        } else if angle < self.thresholds.contracted_below {
            Some(self.extended_stage.opposite())
        } else {
            None
        }
    }

    pub fn feedback_for(&self, angle: f64) -> &str {
        self.feedback.classify(angle)
    }

    pub fn cue_for(&self, angle: f64) -> Option<&PositionCue> {
        let cues = self.cues.as_ref()?;
        let cue = if angle > self.thresholds.extended_above {
            &cues.extended
        } else if angle < self.thresholds.contracted_below {
            &cues.contracted
        } else {
            &cues.between
        };
        Some(cue)
    }

    /// Canonical name followed by aliases, normalized for lookup.
    pub fn identifiers(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|id| normalize_id(id))
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_str();
        if normalize_id(name).is_empty() {
            return Err(EngineError::invalid_profile(name, "name must not be empty"));
        }

        let t = &self.thresholds;
        for (field, value) in [
            ("extended_above", t.extended_above),
            ("contracted_below", t.contracted_below),
            ("good_above", self.feedback.good_above),
            ("good_below", self.feedback.good_below),
        ] {
            if !(0.0..=180.0).contains(&value) {
                return Err(EngineError::invalid_profile(
                    name,
                    format!("{field} must be within 0..=180 degrees, got {value}"),
                ));
            }
        }

        if t.contracted_below >= t.extended_above {
            return Err(EngineError::invalid_profile(
                name,
                "contracted_below must be lower than extended_above",
            ));
        }
        if self.feedback.good_above >= self.feedback.good_below {
            return Err(EngineError::invalid_profile(
                name,
                "good_above must be lower than good_below",
            ));
        }

        let [a, b, c] = self.joints.as_array();
        if a == b || b == c || a == c {
            return Err(EngineError::invalid_profile(name, "joints must be distinct"));
        }

        Ok(())
    }
}

pub(crate) fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

static BUILTIN: Lazy<ProfileRegistry> = Lazy::new(|| {
    let profiles = builtin_profiles();
    let index = profiles
        .iter()
        .enumerate()
        .flat_map(|(slot, profile)| profile.identifiers().map(move |id| (id, slot)))
        .collect();
    ProfileRegistry { profiles, index }
});

/// Squat, bicep curl and push-up, as shipped.
pub fn builtin_profiles() -> Vec<ExerciseProfile> {
    vec![
        ExerciseProfile {
            name: "squat".to_string(),
            aliases: vec![],
            joints: JointTriple::new(Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle),
            thresholds: StageThresholds {
                extended_above: 160.0,
                contracted_below: 90.0,
            },
            extended_stage: Stage::Up,
            count_on: Stage::Up,
            feedback: FeedbackBand {
                good_above: 60.0,
                good_below: 160.0,
                good_message: "Good form".to_string(),
                fault_message: "Adjust your squat depth".to_string(),
            },
            cues: Some(PositionCues {
                extended: PositionCue::new("Stand Tall", CueStatus::Good),
                contracted: PositionCue::new("Too Low!", CueStatus::Bad),
                between: PositionCue::new("Good Squat", CueStatus::Perfect),
            }),
        },
        ExerciseProfile {
            name: "bicep".to_string(),
            aliases: vec![
                "curl".to_string(),
                "bicep_curl".to_string(),
                "bicep-curl".to_string(),
            ],
            joints: JointTriple::new(Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist),
            // Arm extended is the curl's resting "down" stage
            thresholds: StageThresholds {
                extended_above: 150.0,
                contracted_below: 50.0,
            },
            extended_stage: Stage::Down,
            count_on: Stage::Up,
            feedback: FeedbackBand {
                good_above: 30.0,
                good_below: 160.0,
                good_message: "Good form".to_string(),
                fault_message: "Keep your elbow steady".to_string(),
            },
            cues: Some(PositionCues {
                extended: PositionCue::new("Arm Extended", CueStatus::Good),
                contracted: PositionCue::new("Curl Complete!", CueStatus::Perfect),
                between: PositionCue::new("Keep Curling!", CueStatus::Progress),
            }),
        },
        ExerciseProfile {
            name: "pushup".to_string(),
            aliases: vec!["push-up".to_string(), "push_up".to_string()],
            joints: JointTriple::new(Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist),
            thresholds: StageThresholds {
                extended_above: 160.0,
                contracted_below: 90.0,
            },
            extended_stage: Stage::Up,
            count_on: Stage::Up,
            feedback: FeedbackBand {
                good_above: 45.0,
                good_below: 160.0,
                good_message: "Good form".to_string(),
                fault_message: "Keep your body straight".to_string(),
            },
            cues: Some(PositionCues {
                extended: PositionCue::new("Up Position", CueStatus::Good),
                contracted: PositionCue::new("Push-Up Done!", CueStatus::Perfect),
                between: PositionCue::new("Going Down...", CueStatus::Progress),
            }),
        },
    ]
}

/// Immutable lookup from exercise identifier to profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<ExerciseProfile>,
    index: HashMap<String, usize>,
}

impl ProfileRegistry {
    /// Process-wide registry holding [`builtin_profiles`].
    pub fn builtin() -> &'static ProfileRegistry {
        &BUILTIN
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = ExerciseProfile>) -> Result<Self> {
        let mut registry = Self::default();
        for profile in profiles {
            registry.register(profile)?;
        }
        Ok(registry)
    }

    fn register(&mut self, profile: ExerciseProfile) -> Result<()> {
        profile.validate()?;

        let ids: Vec<String> = profile.identifiers().collect();
        for (i, id) in ids.iter().enumerate() {
            if self.index.contains_key(id) || ids[..i].contains(id) {
                return Err(EngineError::DuplicateExercise(id.clone()));
            }
        }

        let slot = self.profiles.len();
        self.index.extend(ids.into_iter().map(|id| (id, slot)));
        self.profiles.push(profile);
        Ok(())
    }

    pub fn get(&self, exercise_id: &str) -> Result<&ExerciseProfile> {
        self.index
            .get(&normalize_id(exercise_id))
            .map(|&slot| &self.profiles[slot])
            .ok_or_else(|| EngineError::UnknownExercise(exercise_id.to_string()))
    }

    pub fn joints_for(&self, exercise_id: &str) -> Result<JointTriple> {
        self.get(exercise_id).map(|p| p.joints)
    }

    pub fn thresholds_for(&self, exercise_id: &str) -> Result<StageThresholds> {
        self.get(exercise_id).map(|p| p.thresholds)
    }

    pub fn contains(&self, exercise_id: &str) -> bool {
        self.index.contains_key(&normalize_id(exercise_id))
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ExerciseProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
