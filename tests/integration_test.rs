// Integration tests for the DPS meter
// These drive the full pipeline through the public API

use dps_meter::capture::{CapturedFrame, FrameSource, TranscriptSource};
use dps_meter::combat_log::{CombatLogOptions, Multiplier};
use dps_meter::ocr::{PassthroughRecognizer, Recognizer};
use dps_meter::{CaptureError, OcrError, Pipeline, PipelineConfig};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const SKILLS: [&str; 9] = [
    "Fireball",
    "Frost Nova",
    "Lightning Bolt",
    "Arcane Missile",
    "Meteor Strike",
    "Poison Cloud",
    "Shadow Lance",
    "Holy Smite Wave",
    "Earthquake",
];

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        capture_fps: 1000,
        worker_threads: 4,
        poll_interval: Duration::from_millis(20),
        ..PipelineConfig::default()
    }
}

fn skill_line(index: usize) -> String {
    format!(
        "Used {} against Golem and dealt {} damage.",
        SKILLS[index],
        (index + 1) * 100
    )
}

/// A screen showing `lines` between two half-visible boundary entries
fn screen(top: &str, lines: &[String]) -> String {
    format!("{top}.\n{}\nhalf visible bottom", lines.join("\n"))
}

/// Screen `k` of a log scrolling by one entry per frame, four entries visible
fn scrolling_screen(k: usize, top: &str) -> String {
    let lines: Vec<String> = (k..k + 4).map(skill_line).collect();
    screen(top, &lines)
}

#[test]
fn test_transcript_replay_end_to_end() {
    let dir = TempDir::new().unwrap();
    let l1 = "Used Fireball against Golem and dealt 1,250 Critical damage.";
    let l2 = "Used Frost Nova against Golem and dealt 750 damage.";
    let l3 = "You have received 120 experience points.";
    let l4 = "Dealt additional damage of 40 to Stone Golem.";
    let l5 = "Used Fireball against Golem and dealt 1,000 damage.";
    let l6 = "Used Lightning Bolt against Golem and dealt 2,000 Smite damage.";
    let l7 = "Used Fireball against Golem and dealt 500 [Perfect] damage.";

    let transcript = format!(
        "=== 1000\nst line.\n{l1}\n{l2}\n{l3}\n{l4}\ncut\n\
         === 1500\n{l1}\n{l2}\n{l3}\n{l4}\n{l5}\ncut\n\
         === 1600\n{l1}\n{l2}\n{l3}\n{l4}\n{l5}\ncut\n\
         === 2700\n{l2}\n{l3}\n{l4}\n{l5}\n{l6}\n{l7}\ncut\n"
    );
    let transcript_path = dir.path().join("session.txt");
    fs::write(&transcript_path, transcript).unwrap();
    let log_path = dir.path().join("logs").join("combat_log.log");

    let config = PipelineConfig {
        combat_log: CombatLogOptions {
            save_to: Some(log_path.clone()),
            ..CombatLogOptions::default()
        },
        ..fast_config()
    };
    let mut pipeline = Pipeline::new(config);
    let stats = pipeline.stats();

    let source = TranscriptSource::from_path(&transcript_path).unwrap();
    pipeline.start(source, Arc::new(PassthroughRecognizer)).unwrap();
    let summary = pipeline.join().unwrap();

    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.delivered, 3);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.event_count, 6);
    assert_eq!(snapshot.total_damage, 1_250 + 750 + 40 + 1_000 + 2_000 + 500);
    assert_eq!(snapshot.last_timestamp, 2_700);
    // Only the two events of the last snapshot are inside the window
    assert!((snapshot.moving_average - 1_250.0).abs() < f64::EPSILON);
    assert!((snapshot.average - 5_540.0 / 6.0).abs() < 1e-9);

    let fireball = &snapshot.skills["Fireball"];
    assert_eq!(fireball.hits, 3);
    assert_eq!(fireball.total_damage, 2_750);
    assert_eq!(fireball.by_multiplier[&Multiplier::Critical].total_damage, 1_250);
    assert_eq!(fireball.by_multiplier[&Multiplier::Perfect].total_damage, 500);

    let smite = snapshot.skills["Lightning Bolt"].by_multiplier[&Multiplier::Smite];
    assert_eq!(smite.hits, 1);
    assert_eq!(smite.total_damage, 2_000);

    assert_eq!(stats.history().len(), 3);

    let saved = fs::read_to_string(&log_path).unwrap();
    let saved: Vec<&str> = saved.lines().collect();
    assert_eq!(saved.len(), 7);
    assert!(saved[0].ends_with(l1));
    assert!(saved[2].ends_with(l3));
    assert!(saved[4].ends_with(l5));
    assert!(saved[6].ends_with(l7));
}

/// Sleeps for the delay written in the top boundary line ("delay 40.")
struct DelayedRecognizer;

impl Recognizer<String> for DelayedRecognizer {
    fn recognize(&self, image: &String) -> Result<String, OcrError> {
        if image.starts_with("FAIL") {
            return Err(OcrError::RecognitionFailed("unreadable frame".into()));
        }
        let delay = image
            .strip_prefix("delay ")
            .and_then(|rest| rest.split('.').next())
            .and_then(|ms| ms.parse().ok())
            .unwrap_or(0);
        thread::sleep(Duration::from_millis(delay));
        Ok(image.clone())
    }
}

#[test]
fn test_out_of_order_completion_is_processed_in_order() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("combat_log.log");

    // Earlier frames take longer, so workers finish them last
    let frames: Vec<(u64, String)> = (0..6)
        .map(|k| {
            let delay = (5 - k) * 15;
            (10_000 + k as u64 * 100, scrolling_screen(k, &format!("delay {delay}")))
        })
        .collect();

    let config = PipelineConfig {
        combat_log: CombatLogOptions {
            save_to: Some(log_path.clone()),
            ..CombatLogOptions::default()
        },
        ..fast_config()
    };
    let mut pipeline = Pipeline::new(config);
    let stats = pipeline.stats();
    pipeline
        .start(TranscriptSource::from_frames(frames), Arc::new(DelayedRecognizer))
        .unwrap();
    let summary = pipeline.join().unwrap();

    assert_eq!(summary.dispatched, 6);
    assert_eq!(summary.delivered, 6);

    // Every entry exactly once, in log order
    let saved = fs::read_to_string(&log_path).unwrap();
    let saved: Vec<&str> = saved.lines().collect();
    assert_eq!(saved.len(), SKILLS.len());
    for (index, line) in saved.iter().enumerate() {
        assert!(line.ends_with(&skill_line(index)), "line {index}: {line}");
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.event_count, SKILLS.len() as u64);
    assert!(snapshot.skills.values().all(|skill| skill.hits == 1));
    assert_eq!(snapshot.last_timestamp, 10_500);
}

#[test]
fn test_recognition_failure_does_not_stall_the_pipeline() {
    let frames = vec![
        (1_000, scrolling_screen(0, "delay 0")),
        (1_100, scrolling_screen(1, "FAIL")),
        (1_200, scrolling_screen(2, "delay 0")),
    ];

    let mut pipeline = Pipeline::new(fast_config());
    let stats = pipeline.stats();
    pipeline
        .start(TranscriptSource::from_frames(frames), Arc::new(DelayedRecognizer))
        .unwrap();
    let summary = pipeline.join().unwrap();

    assert_eq!(summary.delivered, 3);

    // The failed frame resets the overlap memory, so the next frame counts
    // all of its visible entries again
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.event_count, 8);
    assert_eq!(snapshot.skills["Arcane Missile"].hits, 2);
    assert_eq!(snapshot.skills["Fireball"].hits, 1);
    assert_eq!(snapshot.last_timestamp, 1_200);
}

#[test]
fn test_oversized_numerals_do_not_kill_the_consumer() {
    let huge = "Used Fireball against Golem and dealt 18,446,744,073,709,551,615 damage.";
    let normal = "Used Frost Nova against Golem and dealt 750 damage.";
    let frames = vec![
        (1_000, screen("top", &[huge.to_string(), normal.to_string()])),
        (1_100, scrolling_screen(0, "delay 0")),
        (1_200, scrolling_screen(1, "delay 0")),
    ];

    let mut pipeline = Pipeline::new(fast_config());
    let stats = pipeline.stats();
    pipeline
        .start(TranscriptSource::from_frames(frames), Arc::new(DelayedRecognizer))
        .unwrap();
    let summary = pipeline.join().unwrap();

    assert_eq!(summary.delivered, 3);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_damage, u64::MAX);
    assert_eq!(snapshot.last_timestamp, 1_200);
    assert_eq!(snapshot.skills["Arcane Missile"].hits, 1);
}

/// Endless source of ever-changing frames
struct EndlessSource {
    next: u64,
}

impl FrameSource for EndlessSource {
    type Image = String;

    fn capture(&mut self) -> Result<CapturedFrame<String>, CaptureError> {
        self.next += 1;
        Ok(CapturedFrame::new(format!("frame {}", self.next), self.next))
    }
}

/// Slow recognizer so work is still in flight when stop is requested
struct SlowRecognizer;

impl Recognizer<String> for SlowRecognizer {
    fn recognize(&self, image: &String) -> Result<String, OcrError> {
        thread::sleep(Duration::from_millis(25));
        Ok(image.clone())
    }
}

#[test]
fn test_stop_drains_in_flight_results() {
    let config = PipelineConfig {
        capture_fps: 200,
        worker_threads: 2,
        ..fast_config()
    };
    let mut pipeline = Pipeline::new(config);
    pipeline
        .start(EndlessSource { next: 0 }, Arc::new(SlowRecognizer))
        .unwrap();

    thread::sleep(Duration::from_millis(150));
    assert!(!pipeline.is_finished());

    let summary = pipeline.stop().unwrap();
    assert!(summary.dispatched > 0);
    assert_eq!(summary.delivered, summary.dispatched);
    assert!(pipeline.state().is_stopped());
}
