#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Boundary lab lesson core: synthetic point generation, live evaluation of a
//! user-steered linear classifier, and the staged lesson plan that gates progress.

/// Typed precondition errors.
#[path = "../error.rs"]
pub mod error;

/// Constructor-time configuration.
#[path = "../config.rs"]
pub mod config;

/// Box-Muller normal sampling.
#[path = "../sampler.rs"]
pub mod sampler;

/// Labeled point generation.
#[path = "../generator.rs"]
pub mod generator;

/// User-controlled classifier state.
#[path = "../classifier.rs"]
pub mod classifier;

/// Per-tick evaluation and metrics.
#[path = "../evaluator.rs"]
pub mod evaluator;

/// JSON-lines journal.
#[path = "../journal.rs"]
pub mod journal;

/// Lesson event records and sinks.
#[path = "../events.rs"]
pub mod events;

/// Telemetry helpers for logging/event emission.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Text readouts for display sinks.
#[path = "../readout.rs"]
pub mod readout;

/// Lesson state machine and tick loop.
#[path = "../lesson.rs"]
pub mod lesson;

pub use classifier::{BoundaryLine, ClassifierParams, ClassifierState, Direction, Steering};
pub use config::{LessonConfig, StageConfig};
pub use error::LessonError;
pub use evaluator::{evaluate, safe_log, Evaluation, Metrics};
pub use events::{EventSink, FileEventSink, LessonEvent, MemoryEventBus};
pub use generator::{
    Dataset, DatasetGenerator, GenerationMode, GenerationParams, GroundTruth, Outcome, Point,
    Position,
};
pub use journal::{JsonLogger, LogLevel, LogRecord};
pub use lesson::{
    InstructionKey, LessonController, LessonControllerBuilder, LessonStage, TickFrame, TickInput,
};
pub use sampler::NormalSampler;
pub use telemetry::{LessonTelemetry, LessonTelemetryBuilder};
