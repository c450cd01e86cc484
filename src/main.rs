//! PsyScan CLI
//!
//! Usage:
//!   psyscan score --brow-dist 0.1 --eye-ratio 0.05    # Single evaluation
//!   psyscan score --sample sample.json --json         # From a JSON sample
//!   psyscan live --seed 7 --cycles 50                 # Real-time loop (synthetic capture)
//!   psyscan live --interactive                        # Enter toggles a trigger interval
//!   psyscan serve --addr 127.0.0.1:3000 --live        # HTTP API (+ live feed)

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use psyscan::config::{Config, Profile, RealtimeConfig, ScoringConfig};
use psyscan::core::{
    run_server, AnalyzeRequest, AnalyzeResponse, AppState, BroadcastRenderer, LoopSignals,
    LoopSummary, OutputFormat, RealTimeLoopController, Renderer, ScoringEngine, SyntheticCamera,
    SyntheticEmotions, SyntheticFace, Tee, TerminalRenderer,
};
use psyscan::types::{Emotion, LoopState, Mode};
use psyscan::{Error, Result, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "psyscan",
    version = VERSION,
    about = "PsyScan - Score stress/deception indicators from biometric signals",
    long_about = "PsyScan combines a pulse proxy, motor jitter and facial tension flags\n\
                  into a bounded 0-100 score with a verdict tier, and maps the dominant\n\
                  emotion to a coarse personality profile.\n\n\
                  Commands:\n  \
                  score  Score one sample\n  \
                  live   Run the real-time loop over synthetic capture\n  \
                  serve  HTTP API server\n\n\
                  Verdicts:\n  \
                  NEUTRAL / COHERENT      - Below the mid threshold\n  \
                  COGNITIVE CONFLICT      - Above mid\n  \
                  HIGH DECEPTION / PANIC  - Above high"
)]
struct Cli {
    /// JSON configuration file (overrides on top of the profile)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scoring constant table
    #[arg(long, global = true, value_enum, default_value_t = Profile::Extended)]
    profile: Profile,

    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single sample
    Score(ScoreArgs),
    /// Run the real-time analysis loop
    Live(LiveArgs),
    /// Run as HTTP API server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Read the sample from a JSON file instead of flags
    #[arg(long)]
    sample: Option<PathBuf>,

    #[arg(long, default_value_t = 0.0)]
    baseline_jitter: f64,

    #[arg(long, default_value_t = 0.0)]
    current_jitter: f64,

    #[arg(long, default_value_t = 0.5)]
    brow_dist: f64,

    #[arg(long, default_value_t = 0.5)]
    eye_ratio: f64,

    #[arg(long, default_value_t = 0.0)]
    mouth_tension: f64,

    #[arg(long, default_value_t = 0.0)]
    pulse_val: f64,

    /// Sample falls within a trigger interval
    #[arg(long)]
    triggered: bool,

    #[arg(long, value_enum, default_value_t = Mode::Mouse)]
    mode: Mode,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct SyntheticArgs {
    /// Seed for the synthetic camera and models
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Probability that landmark or emotion inference fails in a cycle
    #[arg(long, default_value_t = 0.1)]
    fail_rate: f64,

    /// Facial tension of the synthetic subject, 0..1
    #[arg(long, default_value_t = 0.3)]
    stress: f64,

    /// Heart rate the synthetic camera simulates
    #[arg(long, default_value_t = 72.0)]
    bpm: f64,

    /// Green-channel swing of the simulated pulse, 8-bit intensity units
    #[arg(long, default_value_t = 1.0)]
    pulse_amplitude: f64,

    /// Let the emotion model emit an out-of-set label
    #[arg(long)]
    unknown_label: bool,
}

#[derive(Args, Debug)]
struct LiveArgs {
    #[command(flatten)]
    synthetic: SyntheticArgs,

    /// Stop after this many cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Pause between cycles (milliseconds)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Output one JSON object per cycle
    #[arg(long)]
    json: bool,

    /// Start inside a trigger interval
    #[arg(long)]
    triggered: bool,

    /// Enter on stdin starts or ends a trigger interval
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Attach a live loop feed at /ws/live
    #[arg(long)]
    live: bool,

    #[command(flatten)]
    synthetic: SyntheticArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match Config::load(cli.config.as_deref(), cli.profile) {
        Ok(config) => match cli.command {
            Command::Score(ref args) => run_score(&config, args, cli.no_color),
            Command::Live(ref args) => run_live(config, args, cli.no_color).await,
            Command::Serve(ref args) => run_serve(config, args).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries results only
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("psyscan=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// SCORE
// =============================================================================

fn run_score(config: &Config, args: &ScoreArgs, no_color: bool) -> Result<()> {
    let request = match &args.sample {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<AnalyzeRequest>(&text)?
        }
        None => AnalyzeRequest {
            baseline_jitter: args.baseline_jitter,
            current_jitter: args.current_jitter,
            brow_dist: args.brow_dist,
            eye_ratio: args.eye_ratio,
            mouth_tension: Some(args.mouth_tension),
            pulse_val: args.pulse_val,
            is_triggered: args.triggered,
            mode: Some(args.mode),
        },
    };

    let (sample, mode) = request.into_sample(&config.scoring)?;
    let engine = ScoringEngine::new(config.scoring.clone());
    let result = engine.score(&sample);
    let terms = result.terms;
    let response = AnalyzeResponse::new(result, mode, config.scoring.fingerprint());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_score(&response, &config.scoring, no_color);
        println!(
            "  terms: pulse={:.2} jitter={:.2} facial={:.2}",
            terms.pulse, terms.jitter, terms.facial
        );
    }
    Ok(())
}

fn print_score(response: &AnalyzeResponse, scoring: &ScoringConfig, no_color: bool) {
    let verdict = if no_color {
        response.verdict.clone()
    } else {
        response.verdict.as_str().color(response.tier.color()).bold().to_string()
    };
    println!("score={:.2} verdict={} profile={}", response.score, verdict, scoring.profile);
    println!("  {}", response.mind_state);
    if !response.scientific_feedback.is_empty() {
        println!("  {}", response.scientific_feedback);
    }
}

// =============================================================================
// LIVE
// =============================================================================

type SyntheticLoop = RealTimeLoopController<SyntheticCamera, SyntheticFace, SyntheticEmotions>;

fn synthetic_loop(
    config: &Config,
    realtime: RealtimeConfig,
    args: &SyntheticArgs,
    signals: LoopSignals,
) -> SyntheticLoop {
    let mut emotions = SyntheticEmotions::new(args.seed).with_failure_rate(args.fail_rate);
    if args.unknown_label {
        let labels = Emotion::ALL
            .iter()
            .map(|e| e.as_str().to_string())
            .chain(std::iter::once("contempt".to_string()));
        emotions = emotions.with_labels(labels);
    }

    RealTimeLoopController::new(
        SyntheticCamera::new(args.seed)
            .with_bpm(args.bpm)
            .with_pulse_amplitude(args.pulse_amplitude),
        SyntheticFace::new(args.seed)
            .with_failure_rate(args.fail_rate)
            .with_stress(args.stress),
        emotions,
        config.scoring.clone(),
        realtime,
        signals,
    )
}

/// Run the loop on a blocking thread until it stops
async fn spawn_loop<R>(
    config: &Config,
    realtime: RealtimeConfig,
    args: &SyntheticArgs,
    signals: LoopSignals,
    mut renderer: R,
) -> Result<LoopSummary>
where
    R: Renderer + Send + 'static,
{
    let config = config.clone();
    let args = args.clone();
    tokio::task::spawn_blocking(move || {
        let mut controller = synthetic_loop(&config, realtime, &args, signals);
        controller.run(&mut renderer)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Ctrl-C requests a cooperative stop
fn stop_on_ctrl_c(signals: &LoopSignals) {
    let signals = signals.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current cycle");
            signals.request_stop();
        }
    });
}

/// Enter on stdin flips the trigger flag. A plain thread, so a pending read
/// never holds up runtime shutdown.
fn toggle_trigger_on_enter(signals: &LoopSignals) {
    let signals = signals.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() {
                break;
            }
            let triggered = signals.toggle_triggered();
            tracing::info!(triggered, "trigger interval {}", if triggered { "started" } else { "ended" });
        }
    });
}

async fn run_live(config: Config, args: &LiveArgs, no_color: bool) -> Result<()> {
    let mut realtime = config.realtime.clone();
    if args.cycles.is_some() {
        realtime.max_cycles = args.cycles;
    }
    if let Some(ms) = args.interval_ms {
        realtime.cycle_interval_ms = ms;
    }
    realtime.validate()?;

    let format = if args.json {
        OutputFormat::JsonLines
    } else if no_color {
        OutputFormat::Parseable
    } else {
        OutputFormat::Terminal
    };

    let signals = LoopSignals::new();
    signals.set_triggered(args.triggered);
    stop_on_ctrl_c(&signals);
    if args.interactive {
        toggle_trigger_on_enter(&signals);
    }

    let summary = spawn_loop(
        &config,
        realtime,
        &args.synthetic,
        signals,
        TerminalRenderer::stdout(format),
    )
    .await?;

    print_summary(&summary, no_color);
    Ok(())
}

fn print_summary(summary: &LoopSummary, no_color: bool) {
    let reason = summary
        .exit_reason
        .map(|r| format!("{} ({})", r.code(), r.description()))
        .unwrap_or_else(|| "-".to_string());
    if no_color {
        eprintln!(
            "[{}] cycles={} analyzed={} degraded={} exit={}",
            summary.state, summary.cycles, summary.analyzed, summary.degraded, reason
        );
    } else {
        eprintln!(
            "{}[{}]{} cycles={} analyzed={} degraded={} exit={}",
            summary.state.color_code(),
            summary.state,
            LoopState::color_reset(),
            summary.cycles,
            summary.analyzed,
            summary.degraded,
            reason
        );
    }
}

// =============================================================================
// SERVE
// =============================================================================

async fn run_serve(config: Config, args: &ServeArgs) -> Result<()> {
    let mut state = AppState::new(&config);
    let signals = LoopSignals::new();

    let feed = if args.live {
        let (tx, _) = broadcast::channel(64);
        state = state.with_live_feed(tx.clone());
        let config = config.clone();
        let synthetic = args.synthetic.clone();
        let signals = signals.clone();
        Some(tokio::spawn(async move {
            let realtime = config.realtime.clone();
            // Echo each cycle to stdout as well as to WebSocket subscribers
            let renderer = Tee(
                BroadcastRenderer::new(tx),
                TerminalRenderer::stdout(OutputFormat::Parseable),
            );
            spawn_loop(&config, realtime, &synthetic, signals, renderer).await
        }))
    } else {
        None
    };

    tokio::select! {
        result = run_server(&args.addr, state) => {
            signals.request_stop();
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            signals.request_stop();
        }
    }

    if let Some(feed) = feed {
        match feed.await {
            Ok(Ok(summary)) => tracing::info!(cycles = summary.cycles, "live feed stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "live feed ended with an error"),
            Err(e) => tracing::warn!(error = %e, "live feed task failed"),
        }
    }
    Ok(())
}
