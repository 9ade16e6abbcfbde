use anyhow::{bail, Context};
use dps_meter::capture::TranscriptSource;
use dps_meter::ocr::PassthroughRecognizer;
use dps_meter::{AppResult, Config, Pipeline, PipelineSummary, StatsSnapshot};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LOG_TARGET_STARTUP: &str = "dps_meter::startup";
const STATS_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/DpsMeter/logs/dps-meter.YYYY-MM-DD.log`
/// (`~/.config` on Linux, `%APPDATA%` on Windows). Debug builds also log to
/// the console. `RUST_LOG` overrides the default `info` filter, e.g.
/// `RUST_LOG=info,dps_meter::damage=info`.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("DpsMeter").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "dps-meter.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Logging initialized, log directory: {}",
        log_dir.display()
    );
}

fn main() -> AppResult<()> {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "dps-meter v{}",
        env!("CARGO_PKG_VERSION")
    );

    let Some(transcript) = std::env::args().nth(1) else {
        bail!("usage: dps-meter <TRANSCRIPT>");
    };

    let config_path = Config::config_path()?;
    let config = Config::load_from(&config_path).context("Failed to load configuration")?;
    let base_dir = config_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let source = TranscriptSource::from_path(&transcript)
        .with_context(|| format!("Failed to open transcript {transcript}"))?;
    tracing::info!("Replaying {} frames from {}", source.remaining(), transcript);

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    let mut pipeline = Pipeline::new(config.pipeline_config(&base_dir));
    let stats = pipeline.stats();
    pipeline.start(source, Arc::new(PassthroughRecognizer))?;

    let mut last_report = Instant::now();
    while !pipeline.is_finished() && !interrupted.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
        if last_report.elapsed() >= STATS_REPORT_INTERVAL {
            let snapshot = stats.snapshot();
            tracing::info!(
                "Total {} over {} hits, avg {:.2}, moving avg {:.2}",
                snapshot.total_damage,
                snapshot.event_count,
                snapshot.average,
                snapshot.moving_average
            );
            last_report = Instant::now();
        }
    }

    let summary = if interrupted.load(Ordering::SeqCst) {
        pipeline.stop()?
    } else {
        pipeline.join()?
    };
    print_summary(&summary, &stats.snapshot());
    Ok(())
}

fn print_summary(summary: &PipelineSummary, stats: &StatsSnapshot) {
    println!(
        "Frames: {} dispatched, {} unchanged, {} processed in {:.1}s",
        summary.dispatched,
        summary.skipped,
        summary.delivered,
        summary.running_for.as_secs_f64()
    );
    if summary.backlog_warnings > 0 {
        println!(
            "Recognition fell behind {} times, consider more worker_threads",
            summary.backlog_warnings
        );
    }
    println!(
        "Damage: {} total over {} hits (avg {:.2}, last window {:.2})",
        stats.total_damage, stats.event_count, stats.average, stats.moving_average
    );

    for (skill, summary) in &stats.skills {
        println!(
            "  {skill}: {} total, {} hits, {:.1} avg",
            summary.total_damage,
            summary.hits,
            summary.total_damage as f64 / summary.hits.max(1) as f64
        );
        for (multiplier, tally) in &summary.by_multiplier {
            let label = if multiplier.label().is_empty() {
                "Normal"
            } else {
                multiplier.label()
            };
            println!("    {label}: {} hits, {} total", tally.hits, tally.total_damage);
        }
    }
}
