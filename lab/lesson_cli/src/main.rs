use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use boundary_lesson::{
    readout::{instruction_text, metrics_panel},
    Dataset, DatasetGenerator, EventSink, FileEventSink, GenerationMode, GenerationParams,
    LessonConfig, LessonController, LessonEvent, LessonStage, LessonTelemetry, MemoryEventBus,
    TickFrame, TickInput,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};

mod autopilot;
mod keys;

use autopilot::Autopilot;
use keys::{parse_line, Command};

#[derive(Parser, Debug)]
#[command(name = "boundary-lab", version, about = "Steer a linear decision boundary through staged lessons")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a scripted session that steers toward the hidden boundary.
    Demo(DemoArgs),
    /// Reads held keys from stdin, one line per tick batch.
    Play(PlayArgs),
    /// Generates a dataset and writes it as JSON.
    Generate(GenerateArgs),
    /// Prints the effective configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Lesson configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Generator seed; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory for the JSON-lines session log.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Optional file receiving lesson events as JSON lines.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct DemoArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Frames per second of the tick loop.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Stop after this many ticks.
    #[arg(long, default_value_t = 5_000)]
    max_ticks: u64,
    /// Print the metrics panel every N ticks.
    #[arg(long, default_value_t = 60)]
    report_every: u64,
    /// Ticks to linger in the terminal stage before quitting.
    #[arg(long, default_value_t = 120)]
    xor_ticks: u64,
    /// Ticks to wait at the hidden boundary for the gate before giving up.
    #[arg(long, default_value_t = 180)]
    patience: u64,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Seconds simulated per tick.
    #[arg(long, default_value_t = 0.1)]
    dt: f32,
    /// Replaces the first stage's dataset with one loaded from JSON.
    #[arg(long)]
    dataset: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Separable,
    Xor,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Separable => Self::Separable,
            ModeArg::Xor => Self::Xor,
        }
    }
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[arg(long, value_enum, default_value_t = ModeArg::Separable)]
    mode: ModeArg,
    #[arg(long, default_value_t = 100)]
    count: usize,
    #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
    low: f32,
    #[arg(long, default_value_t = 30.0, allow_hyphen_values = true)]
    high: f32,
    #[arg(long, default_value_t = 0.0)]
    noise: f32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output path; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Demo(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_demo(args))
        }
        Commands::Play(args) => run_play(&args),
        Commands::Generate(args) => run_generate(&args),
        Commands::Config { config } => {
            print!("{}", load_config(config.as_deref())?.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<LessonConfig> {
    path.map_or_else(|| Ok(LessonConfig::default()), LessonConfig::load)
}

fn build_controller(args: &SessionArgs, bus: Arc<MemoryEventBus>) -> Result<LessonController> {
    let config = load_config(args.config.as_deref())?;
    let mut telemetry = LessonTelemetry::builder("boundary-lab");
    if let Some(dir) = &args.log_dir {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
        telemetry = telemetry.log_path(dir.join(format!("session-{stamp}.log")));
    }
    telemetry = match &args.event_log {
        Some(path) => telemetry.event_sink(Arc::new(TeeSink {
            bus,
            file: FileEventSink::new(path)?,
        })),
        None => telemetry.event_sink(bus),
    };
    let mut builder = LessonController::builder()
        .config(config)
        .telemetry(telemetry.build()?);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    builder.build()
}

/// Fans events out to the in-process bus and an event log file.
struct TeeSink {
    bus: Arc<MemoryEventBus>,
    file: FileEventSink,
}

impl EventSink for TeeSink {
    fn publish(&self, event: LessonEvent) -> Result<()> {
        self.file.publish(event.clone())?;
        self.bus.publish(event)
    }
}

/// Prints events until every sender is gone; resolves to the number printed.
fn spawn_printer(mut events: broadcast::Receiver<LessonEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut printed = 0;
        loop {
            match events.recv().await {
                Ok(event) if event.event_type == "lesson.advance.ignored" => {}
                Ok(event) => {
                    println!("[{}] {}", event.event_type, event.payload);
                    printed += 1;
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break printed,
            }
        }
    })
}

async fn run_demo(args: DemoArgs) -> Result<()> {
    let bus = Arc::new(MemoryEventBus::new(256));
    let printer = spawn_printer(bus.subscribe());

    let mut lesson = build_controller(&args.session, Arc::clone(&bus))?;
    let dt = 1.0 / args.fps.max(1) as f32;
    let pilot = Autopilot::new(lesson.config(), dt);
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut instruction = lesson.instruction();
    let mut waited = 0_u64;
    let mut xor_ticks = 0_u64;
    println!("{}\n", instruction_text(instruction));
    while lesson.ticks() < args.max_ticks {
        ticker.tick().await;
        let target = lesson.ground_truth();
        let input = pilot.next_input(lesson.classifier(), target, instruction);
        let frame = lesson.tick(&input, dt)?;
        instruction = frame.instruction;

        if frame.advanced {
            waited = 0;
            println!("\n{}\n", instruction_text(instruction));
        }
        if frame.advanced || frame.tick % args.report_every.max(1) == 0 {
            print_frame(&frame);
        }
        if frame.stage == LessonStage::Xor {
            xor_ticks += 1;
            if xor_ticks >= args.xor_ticks {
                break;
            }
        } else if target.is_some_and(|t| pilot.settled(frame.classifier, t)) {
            waited += 1;
            if waited >= args.patience {
                println!(
                    "gate stayed closed at the hidden boundary in {:?}; noise too high for the threshold",
                    frame.stage
                );
                break;
            }
        }
    }
    println!("\nfinal state:");
    println!("{}", metrics_panel(lesson.classifier(), lesson.metrics()));
    // The controller's telemetry holds the other sender; the printer drains
    // what is queued and stops on `Closed`.
    drop(lesson);
    drop(bus);
    printer.await?;
    Ok(())
}

fn run_play(args: &PlayArgs) -> Result<()> {
    let bus = Arc::new(MemoryEventBus::new(64));
    let mut lesson = build_controller(&args.session, bus)?;
    if let Some(path) = &args.dataset {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        let dataset: Dataset =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        lesson.load_dataset(Dataset::from_points(dataset.mode(), dataset.points().to_vec()), None);
    }

    println!("{}", instruction_text(lesson.instruction()));
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        match parse_line(&line?) {
            Ok(Command::Quit) => break,
            Ok(Command::Ticks { input, repeat }) => {
                let mut frame = lesson.tick(&input, args.dt)?;
                let held = TickInput {
                    advance: false,
                    ..input
                };
                for _ in 1..repeat {
                    frame = lesson.tick(&held, args.dt)?;
                }
                if frame.advanced {
                    println!("{}", instruction_text(frame.instruction));
                }
                print_frame(&frame);
            }
            Err(err) => println!("{err}"),
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut generator = DatasetGenerator::new(
        args.seed,
        config.min_weight_magnitude,
        config.max_weight_magnitude,
    )?;
    let params = GenerationParams {
        count: args.count,
        low: args.low,
        high: args.high,
        noise: args.noise,
        mode: args.mode.into(),
    };
    let (dataset, truth) = generator.generate(&params)?;
    let body = serde_json::to_string_pretty(&dataset)?;
    match &args.out {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "wrote {} points ({} positive) to {}",
                dataset.len(),
                dataset.positive_count(),
                path.display()
            );
        }
        None => println!("{body}"),
    }
    if let Some(truth) = truth {
        eprintln!("ground truth: weight {} bias {}", truth.weight, truth.bias);
    }
    Ok(())
}

fn print_frame(frame: &TickFrame) {
    let correct = frame.evaluation.map_or(0, |e| e.correct);
    println!(
        "tick {} | {:?} | line angle {:.1}° | {} / {} correct",
        frame.tick,
        frame.stage,
        frame.boundary.angle_degrees(),
        correct,
        frame.outcomes.len()
    );
    println!("{}", metrics_panel(frame.classifier, &frame.metrics));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str) -> LessonEvent {
        LessonEvent {
            id: event_type.into(),
            source: "demo".into(),
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339(),
            payload: json!({ "stage": "sharp" }),
        }
    }

    #[tokio::test]
    async fn printer_drains_queued_events_before_stopping() {
        let bus = Arc::new(MemoryEventBus::new(16));
        let printer = spawn_printer(bus.subscribe());
        for kind in [
            "lesson.dataset.generated",
            "lesson.advance.ignored",
            "lesson.stage.ready",
            "lesson.stage.advanced",
            "lesson.dataset.generated",
        ] {
            bus.publish(event(kind)).unwrap();
        }
        drop(bus);
        assert_eq!(printer.await.unwrap(), 4);
    }
}
