// FaceGate session simulator
// Replays a JSON detection script through a real capture session

use anyhow::{bail, Context, Result};
use facegate::callbacks::{ChannelCallbacks, SessionEvent};
use facegate::orchestrator::CaptureOrchestrator;
use facegate::scheduler::ManualTicker;
use facegate::testing::{ScriptedDetector, SyntheticSource};
use facegate::{DetectionResult, FaceGateConfig, Phase, Variant};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const USAGE: &str =
    "Usage: facegate-sim <registration|login> <script.json> [--config <path>] [--reject <n>] [--json]";

struct Options {
    variant: Variant,
    script: PathBuf,
    config: Option<PathBuf>,
    reject: usize,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut reject = 0;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.get(i).context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--reject" => {
                i += 1;
                let count = args.get(i).context("--reject needs a count")?;
                reject = count.parse().context("--reject needs a number")?;
            }
            "--json" => json = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if positional.len() != 2 {
        bail!(USAGE);
    }
    let variant = positional[0].parse::<Variant>().map_err(anyhow::Error::msg)?;

    Ok(Options {
        variant,
        script: PathBuf::from(&positional[1]),
        config,
        reject,
        json,
    })
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to serialize event: {}", e),
        }
        return;
    }

    match event {
        SessionEvent::Status(update) => println!("[{}] {}", update.phase.as_str(), update.message),
        SessionEvent::Success { payload, .. } => {
            println!("[payload] {} bytes submitted", payload.len())
        }
        SessionEvent::Failure { message, .. } => println!("[failure] {}", message),
        SessionEvent::Closed { .. } => println!("[closed]"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    facegate::init_logging();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args)?;

    let config = match &options.config {
        Some(path) => FaceGateConfig::load_from_file(path)?,
        None => FaceGateConfig::load_or_default(),
    };
    let settings = config.session_settings(options.variant);

    let contents = fs::read_to_string(&options.script)
        .with_context(|| format!("Failed to read script {}", options.script.display()))?;
    let script: Vec<Option<DetectionResult>> =
        serde_json::from_str(&contents).context("Script must be a JSON array of detections or null")?;
    let ticks = script.len();

    let (callbacks, mut events, verdicts) = ChannelCallbacks::with_verdicts();
    for index in 0..ticks.max(options.reject) {
        verdicts.send(index >= options.reject)?;
    }

    let detector = Arc::new(ScriptedDetector::new(script));
    let mut orchestrator = CaptureOrchestrator::new(
        Arc::new(SyntheticSource::new()),
        detector,
        settings.clone(),
        Arc::new(callbacks),
    );

    let json = options.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event, json);
        }
    });

    if let Err(e) = orchestrator.initialize().await {
        drop(orchestrator);
        printer.await?;
        bail!(e);
    }

    let (ticker, tick_handle) = ManualTicker::new();
    let handle = orchestrator.spawn(ticker);

    let controller = handle.controller();
    ctrlc::set_handler(move || {
        controller.stop();
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut interval = tokio::time::interval(settings.poll_interval);
    for _ in 0..ticks {
        interval.tick().await;
        if handle.is_finished() || !tick_handle.tick() {
            break;
        }
    }
    drop(tick_handle);

    let report = handle.wait().await?;
    printer.await?;

    if options.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "Session {} ended {} after {} ticks ({} detector calls, {} accepted, {} attempts)",
            report.session_id,
            report.final_phase.as_str(),
            report.stats.ticks,
            report.stats.detector_calls,
            report.samples_accepted,
            report.attempts
        );
    }

    if report.final_phase == Phase::Failed {
        std::process::exit(1);
    }
    Ok(())
}
