// src/main.rs - Replays a recorded landmark trace through the rep engine
//
// Each trace line is a JSON object:
//   {"session": "alice", "exercise": "squat", "joints": {"LEFT_HIP": {"x": 0.5, "y": 0.3}, ...}}
//   {"session": "alice", "exercise": "squat", "joints": null}     (no person detected)
//   {"session": "alice", "exercise": "squat", "reset": true}
use anyhow::{Context, Result};
use clap::Parser;
use rep_tracker::{EngineConfig, JointSet, RepEngine, SessionId, SessionRecorder};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "rep_tracker",
    version,
    about = "Count exercise reps from a recorded pose landmark trace",
    long_about = None
)]
struct Args {
    /// JSON-lines trace of per-frame joints.
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// Path to a JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write per-session CSV logs and summaries after the replay.
    #[arg(long, default_value_t = false)]
    export: bool,

    /// Override the export directory from the config.
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct TraceLine {
    session: Option<String>,
    exercise: String,
    #[serde(default)]
    joints: Option<JointSet>,
    #[serde(default)]
    reset: bool,
}

fn init_logging(level: &str) {
    let level = level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match args.config.as_deref() {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.export_dir {
        config.export_dir = dir;
    }

    let engine = RepEngine::new(config.build_registry()?);
    let trace = tokio::fs::read_to_string(&args.trace)
        .await
        .with_context(|| format!("Failed to read trace {}", args.trace.display()))?;

    let mut recorders: BTreeMap<String, SessionRecorder> = BTreeMap::new();

    for (line_no, line) in trace.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }

        let entry: TraceLine = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed trace line");
                continue;
            }
        };

        let session_name = entry
            .session
            .unwrap_or_else(|| config.default_session.clone());
        let session = SessionId::new(session_name.clone());

        if entry.reset {
            let ack = engine.reset(&session, &entry.exercise);
            println!("{}", json!({ "line": line_no, "reset": ack }));
            continue;
        }

        match engine.process(&session, &entry.exercise, entry.joints.as_ref()) {
            Ok(result) => {
                println!("{}", serde_json::to_string(&result)?);
                if args.export {
                    recorders
                        .entry(session_name.clone())
                        .or_insert_with(|| {
                            SessionRecorder::new(&config.export_dir, Some(session_name))
                        })
                        .record(result);
                }
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "frame rejected");
                println!("{}", json!({ "line": line_no, "error": e.to_string() }));
            }
        }
    }

    for recorder in recorders.values() {
        let csv_path = recorder.export_csv()?;
        let summary_path = recorder.export_summary_json()?;
        info!(
            session = recorder.session_name(),
            csv = %csv_path.display(),
            summary = %summary_path.display(),
            "session exported"
        );
    }

    let stats = engine.store().stats();
    info!(
        sessions = stats.active_sessions,
        total_reps = stats.total_reps,
        "replay finished"
    );
    Ok(())
}
