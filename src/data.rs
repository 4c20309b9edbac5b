// src/data.rs - Per-session frame log with CSV and JSON summary export
use crate::profile::CueStatus;
use crate::session::{FrameResult, StageReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    frame: usize,
    timestamp: String,
    exercise: &'a str,
    detected: bool,
    angle: Option<f64>,
    stage: StageReport,
    prev_stage: StageReport,
    rep_count: u32,
    feedback: &'a str,
    cue: Option<&'a str>,
    cue_status: Option<CueStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_name: String,
    pub total_frames: usize,
    pub detected_frames: usize,
    pub detection_rate: f64,
    /// Final rep count per exercise.
    pub reps: BTreeMap<String, u32>,
    pub cue_counts: BTreeMap<String, usize>,
    pub started_at: Option<DateTime<Local>>,
    pub ended_at: Option<DateTime<Local>>,
}

pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    frames: Vec<(DateTime<Local>, FrameResult)>,
}

impl SessionRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            frames: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn record(&mut self, result: FrameResult) {
        self.record_at(Local::now(), result);
    }

    pub fn record_at(&mut self, at: DateTime<Local>, result: FrameResult) {
        self.frames.push((at, result));
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("reps.csv");
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);

        for (i, (at, result)) in self.frames.iter().enumerate() {
            writer.serialize(FrameRecord {
                frame: i,
                timestamp: at.to_rfc3339(),
                exercise: &result.exercise,
                detected: result.is_detected(),
                angle: result.angle,
                stage: result.stage,
                prev_stage: result.prev_stage,
                rep_count: result.rep_count,
                feedback: &result.feedback,
                cue: result.cue.as_ref().map(|c| c.message.as_str()),
                cue_status: result.cue.as_ref().map(|c| c.status),
            })?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    pub fn summary(&self) -> SessionSummary {
        let total_frames = self.frames.len();
        let detected_frames = self.frames.iter().filter(|(_, r)| r.is_detected()).count();

        let mut reps = BTreeMap::new();
        let mut cue_counts = BTreeMap::new();
        for (_, result) in &self.frames {
            reps.insert(result.exercise.clone(), result.rep_count);
            if let Some(cue) = &result.cue {
                *cue_counts.entry(cue.message.clone()).or_insert(0) += 1;
            }
        }

        SessionSummary {
            session_name: self.session_name.clone(),
            total_frames,
            detected_frames,
            detection_rate: if total_frames == 0 {
                0.0
            } else {
                detected_frames as f64 / total_frames as f64
            },
            reps,
            cue_counts,
            started_at: self.frames.first().map(|(at, _)| *at),
            ended_at: self.frames.last().map(|(at, _)| *at),
        }
    }

    pub fn export_summary_json(&self) -> Result<PathBuf> {
        let path = self.session_dir().join("summary.json");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
