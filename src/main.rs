//! Presence Engine CLI
//!
//! Tracks hand, facing and posture signals from perception results.

use chrono::Utc;
use clap::{Parser, Subcommand};
use presence_engine::{
    config::{Config, SourceConfig},
    core::{
        FrameLoop, GeometricClassifier, ManualClock, MonotonicClock, ReportBuilder,
        SessionReport, StopReason,
    },
    source::{load_recording, replay::parse_line, ChannelSource, FrameSender, SourceError},
    transparency::{create_shared_log_with_persistence, SharedTransparencyLog},
    PRIVACY_DECLARATION, VERSION,
};
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "presence-engine")]
#[command(version = VERSION)]
#[command(about = "Privacy-first presence tracking from camera landmarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track signals from perception frames streamed as JSON lines on stdin
    Start {
        /// Detectors to consume (face, hand, pose, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Frame interval in milliseconds (overrides the config file)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Serve live metrics on this port (requires server feature)
        #[arg(long)]
        serve: Option<u16>,
    },

    /// Run a recorded session through the engine
    Replay {
        /// JSON lines recording of perception frames
        file: PathBuf,

        /// Write a session report to the export directory
        #[arg(long)]
        export: bool,
    },

    /// Show configuration and cumulative statistics
    Status {
        /// Clear the cumulative statistics
        #[arg(long)]
        reset: bool,
    },

    /// Display privacy declaration
    Privacy,

    /// Combine exported session reports
    Export {
        /// Directory holding session reports
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format (json or jsonl)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration
    Config,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            sources,
            interval_ms,
            serve,
        } => {
            cmd_start(&sources, interval_ms, serve);
        }
        Commands::Replay { file, export } => {
            cmd_replay(&file, export);
        }
        Commands::Status { reset } => {
            cmd_status(reset);
        }
        Commands::Privacy => {
            cmd_privacy();
        }
        Commands::Export { output, format } => {
            cmd_export(output, &format);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_start(sources: &str, interval_ms: Option<u64>, serve: Option<u16>) {
    println!("Presence Engine v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    config.sources = SourceConfig::from_csv(sources);
    if let Some(ms) = interval_ms {
        config.frame_interval = Duration::from_millis(ms);
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let transparency_log =
        create_shared_log_with_persistence(config.data_path.join("transparency.json"));

    let classifier = GeometricClassifier::with_config(config.classifier);
    let mut frame_loop = match FrameLoop::new(MonotonicClock::new(), classifier, &config) {
        Ok(frame_loop) => frame_loop.with_transparency_log(Arc::clone(&transparency_log)),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if std::io::stdin().is_terminal() {
        let e = SourceError::Unavailable(
            "stdin is a terminal; pipe perception frames as JSON lines".to_string(),
        );
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Starting engine...");
    for (name, enabled) in [
        ("Face", config.sources.face),
        ("Hand", config.sources.hand),
        ("Pose", config.sources.pose),
    ] {
        println!(
            "  {name}: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
    println!(
        "  Frame interval: {}ms",
        config.frame_interval.as_millis()
    );

    // Serve live metrics if requested
    #[cfg(feature = "server")]
    let _server = serve.and_then(|port| start_server(port, &frame_loop));
    #[cfg(not(feature = "server"))]
    if serve.is_some() {
        eprintln!("Warning: --serve flag ignored (server feature not enabled at compile time)");
    }

    let report_builder = ReportBuilder::new();
    println!("Session ID: {}", report_builder.session_id());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut source = ChannelSource::new(config.channel_capacity);
    if let Err(e) = source.start() {
        eprintln!("Error starting frame source: {e}");
        std::process::exit(1);
    }
    let sender = match source.sender() {
        Ok(sender) => sender,
        Err(e) => {
            eprintln!("Error starting frame source: {e}");
            std::process::exit(1);
        }
    };
    source.close();
    spawn_stdin_reader(sender);

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let (snapshot, reason) = match frame_loop.run(&mut source, &running) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!();
    match reason {
        StopReason::Cancelled => println!("Stopping engine..."),
        StopReason::SourceClosed => println!("Input ended, stopping engine..."),
    }

    let report = report_builder.build(&snapshot, frame_loop.trackers());
    print_metrics(&report);
    export_report(&report, &config.export_path, &transparency_log);

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    // Final stats
    println!();
    println!("{}", transparency_log.summary());
}

/// Read frames from stdin on a dedicated thread. Dropping the sender at EOF
/// ends the session.
fn spawn_stdin_reader(sender: FrameSender) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for (index, line) in stdin.lock().lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("failed to read stdin: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line, index + 1) {
                Ok(frame) => {
                    sender.send(frame);
                }
                Err(e) => tracing::warn!("skipping frame: {e}"),
            }
        }
        tracing::debug!("stdin reader finished");
    });
}

#[cfg(feature = "server")]
fn start_server<C, K>(
    port: u16,
    frame_loop: &FrameLoop<C, K>,
) -> Option<(tokio::runtime::Runtime, tokio::sync::oneshot::Sender<()>)>
where
    C: presence_engine::core::Clock,
    K: presence_engine::core::Classifier,
{
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Warning: Could not start server runtime: {e}");
            return None;
        }
    };
    let config = presence_engine::server::ServerConfig::new(port);
    match runtime.block_on(presence_engine::server::run(config, frame_loop.subscribe())) {
        Ok((addr, shutdown_tx)) => {
            println!("  Live metrics: http://{addr}/metrics");
            Some((runtime, shutdown_tx))
        }
        Err(e) => {
            eprintln!("Warning: Could not start server: {e}");
            None
        }
    }
}

fn cmd_replay(file: &Path, export: bool) {
    let frames = match load_recording(file) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("Error loading recording: {e}");
            std::process::exit(1);
        }
    };

    let config = Config::load().unwrap_or_default();
    let classifier = GeometricClassifier::with_config(config.classifier);
    let mut frame_loop = match FrameLoop::new(ManualClock::new(), classifier, &config) {
        Ok(frame_loop) => frame_loop,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let report_builder = ReportBuilder::new();

    let snapshot = frame_loop.replay(&frames);

    let report = report_builder.build(&snapshot, frame_loop.trackers());
    match serde_json::to_string_pretty(&report.metrics) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing metrics: {e}"),
    }

    if export {
        let log = frame_loop.transparency_log().clone();
        export_report(&report, &config.export_path, &log);
    }
}

fn print_metrics(report: &SessionReport) {
    let metrics = &report.metrics;
    println!(
        "[{}] {} frames over {:.1}s",
        report.ended_at_utc.format("%H:%M:%S"),
        report.frames_processed,
        report.duration_secs
    );
    println!(
        "  Hand:        {} detections, {:.1}s",
        metrics.hand_detection_counter, metrics.hand_detection_duration
    );
    println!(
        "  Not facing:  {} detections, {:.1}s",
        metrics.not_facing_counter, metrics.not_facing_duration
    );
    println!(
        "  Bad posture: {} detections, {:.1}s",
        metrics.bad_posture_detection_counter, metrics.bad_posture_duration
    );
}

fn export_report(report: &SessionReport, export_dir: &Path, log: &SharedTransparencyLog) {
    let export_path = export_dir.join(report.file_name());

    if let Some(parent) = export_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match serde_json::to_string_pretty(report) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&export_path, json) {
                eprintln!("Error writing session report: {e}");
            } else {
                println!("Exported session report to {export_path:?}");
                log.record_report_exported();
            }
        }
        Err(e) => {
            eprintln!("Error serializing session report: {e}");
        }
    }
}

fn cmd_status(reset: bool) {
    let config = Config::load().unwrap_or_default();
    let stats_path = config.data_path.join("transparency.json");

    if reset {
        let log = create_shared_log_with_persistence(stats_path);
        log.reset();
        match log.save() {
            Ok(()) => println!("Cumulative statistics cleared."),
            Err(e) => {
                eprintln!("Error clearing statistics: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Presence Engine Status");
    println!("======================");
    println!();

    // Show config
    println!("Configuration:");
    for (name, enabled) in [
        ("Face", config.sources.face),
        ("Hand", config.sources.hand),
        ("Pose", config.sources.pose),
    ] {
        println!(
            "  {name} detector: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
    println!("  Frame interval: {}ms", config.frame_interval.as_millis());
    println!(
        "  Facing limits: yaw {}°, pitch {}°",
        config.classifier.max_yaw_deg, config.classifier.max_pitch_deg
    );
    println!();

    // Load and show transparency stats if available
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for (key, label) in [
                    ("frames_processed", "Frames processed"),
                    ("frames_without_result", "Frames without a result"),
                    ("classification_failures", "Dropped observations"),
                    ("clock_anomalies", "Clock anomalies"),
                    ("reports_exported", "Reports exported"),
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {label}: {value}");
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_privacy() {
    println!("{PRIVACY_DECLARATION}");
}

fn cmd_export(output: Option<PathBuf>, format: &str) {
    let config = Config::load().unwrap_or_default();
    let export_dir = output.unwrap_or(config.export_path.clone());

    // Find all session reports
    let session_files: Vec<PathBuf> = std::fs::read_dir(&export_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().map(|e| e == "json").unwrap_or(false)
                        && p.file_name()
                            .and_then(|n| n.to_str())
                            .map(|n| n.starts_with("session_"))
                            .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    if session_files.is_empty() {
        println!("No session reports found in {export_dir:?}");
        println!("Run 'presence-engine start' to record a session.");
        return;
    }

    println!(
        "Found {} session report(s) in {:?}",
        session_files.len(),
        export_dir
    );

    let mut reports: Vec<SessionReport> = Vec::new();
    for file in &session_files {
        match std::fs::read_to_string(file) {
            Ok(content) => match serde_json::from_str::<SessionReport>(&content) {
                Ok(report) => reports.push(report),
                Err(e) => eprintln!("Warning: Skipping {file:?}: {e}"),
            },
            Err(e) => eprintln!("Warning: Could not read {file:?}: {e}"),
        }
    }
    reports.sort_by_key(|r| r.started_at_utc);

    println!("Total reports: {}", reports.len());

    let output_path = export_dir.join(format!(
        "export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        if format == "jsonl" { "jsonl" } else { "json" }
    ));

    let result = if format == "jsonl" {
        // JSON Lines format
        let lines: Vec<String> = reports
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect();
        std::fs::write(&output_path, lines.join("\n"))
    } else {
        // Pretty JSON format
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => std::fs::write(&output_path, json),
            Err(e) => {
                eprintln!("Error serializing: {e}");
                return;
            }
        }
    };

    match result {
        Ok(_) => println!("Exported to {output_path:?}"),
        Err(e) => eprintln!("Error writing export: {e}"),
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
