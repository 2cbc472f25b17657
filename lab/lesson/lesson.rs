//! Lesson plan: `Sharp -> Fuzzy -> Xor`, advanced by the learner once the
//! current stage's accuracy gate is open.
//!
//! Every call to [`LessonController::tick`] runs the same ordered pipeline:
//! integrate held input into the classifier, evaluate the whole dataset
//! against the updated params, then check the gate and (on an advance signal)
//! swap in the next stage's dataset. A regeneration resets the classifier to
//! the origin and clears every metric, including the best values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    classifier::{BoundaryLine, ClassifierParams, ClassifierState, Direction, Steering},
    config::{LessonConfig, StageConfig},
    evaluator::{evaluate, Evaluation, Metrics},
    generator::{Dataset, DatasetGenerator, GenerationMode, GroundTruth, Outcome},
    journal::LogLevel,
    telemetry::LessonTelemetry,
};

/// Parts of the lesson, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStage {
    /// Noiseless separable points.
    Sharp,
    /// Separable points with position noise.
    Fuzzy,
    /// XOR points; no line separates them. Terminal.
    Xor,
}

impl LessonStage {
    /// Label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sharp => "sharp",
            Self::Fuzzy => "fuzzy",
            Self::Xor => "xor",
        }
    }

    /// Stage unlocked by advancing, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Sharp => Some(Self::Fuzzy),
            Self::Fuzzy => Some(Self::Xor),
            Self::Xor => None,
        }
    }

    /// Generative model used for this stage's dataset.
    #[must_use]
    pub const fn mode(self) -> GenerationMode {
        match self {
            Self::Sharp | Self::Fuzzy => GenerationMode::Separable,
            Self::Xor => GenerationMode::Xor,
        }
    }
}

/// Which instruction text the text sink should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKey {
    /// Task description and controls.
    Controls,
    /// Gate open: the learner may advance.
    CloseEnough,
    /// Terminal XOR stage.
    XorExplore,
}

/// Input sampled by the host for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Weight-decrease key held.
    pub weight_decrease: bool,
    /// Weight-increase key held.
    pub weight_increase: bool,
    /// Bias-decrease key held.
    pub bias_decrease: bool,
    /// Bias-increase key held.
    pub bias_increase: bool,
    /// Advance key pressed this tick (edge-triggered).
    pub advance: bool,
}

impl TickInput {
    /// Input that only presses advance.
    #[must_use]
    pub fn advance() -> Self {
        Self {
            advance: true,
            ..Self::default()
        }
    }

    /// Directions for the classifier.
    #[must_use]
    pub const fn steering(&self) -> Steering {
        Steering {
            weight: Direction::from_keys(self.weight_decrease, self.weight_increase),
            bias: Direction::from_keys(self.bias_decrease, self.bias_increase),
        }
    }
}

/// State pushed to the renderer and text sinks after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickFrame {
    /// 1-based tick index.
    pub tick: u64,
    /// Stage after this tick.
    pub stage: LessonStage,
    /// Instruction text key.
    pub instruction: InstructionKey,
    /// Decision boundary to draw.
    pub boundary: BoundaryLine,
    /// Classifier params after integration (or after reset, when advanced).
    pub classifier: ClassifierParams,
    /// Metrics after this tick.
    pub metrics: Metrics,
    /// This tick's evaluation pass. `None` when the dataset was empty or was
    /// replaced this tick, so it always describes [`TickFrame::outcomes`].
    pub evaluation: Option<Evaluation>,
    /// Outcome per point of the current dataset.
    pub outcomes: Vec<Outcome>,
    /// Whether the stage changed this tick.
    pub advanced: bool,
    /// Generation id of the current dataset.
    pub generation: Uuid,
}

/// Orchestrates generation, classifier integration, evaluation, and stage gating.
#[derive(Debug)]
pub struct LessonController {
    config: LessonConfig,
    generator: DatasetGenerator,
    classifier: ClassifierState,
    dataset: Dataset,
    ground_truth: Option<GroundTruth>,
    metrics: Metrics,
    stage: LessonStage,
    tick: u64,
    gate_was_open: bool,
    telemetry: Option<LessonTelemetry>,
}

impl LessonController {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> LessonControllerBuilder {
        LessonControllerBuilder::default()
    }

    /// Runs one tick: integrate, evaluate, gate, and maybe advance.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Result<TickFrame> {
        self.tick += 1;
        self.classifier.integrate(input.steering(), dt);
        let evaluation = evaluate(
            &mut self.dataset,
            self.classifier.params(),
            &mut self.metrics,
        );

        let threshold_met = evaluation.is_some() && self.threshold_met();
        if threshold_met && !self.gate_was_open {
            let payload = json!({
                "stage": self.stage.label(),
                "accuracy": self.metrics.accuracy,
                "threshold": self.stage_config(self.stage).accuracy_threshold,
            });
            self.log(LogLevel::Info, "lesson.stage.ready", payload.clone());
            self.event("lesson.stage.ready", payload);
        }
        self.gate_was_open = threshold_met;

        let mut advanced = false;
        if input.advance {
            match self.stage.next() {
                Some(next) if threshold_met => {
                    self.advance_to(next)?;
                    advanced = true;
                }
                _ => {
                    let payload = json!({
                        "stage": self.stage.label(),
                        "accuracy": self.metrics.accuracy,
                        "terminal": self.stage.next().is_none(),
                    });
                    self.log(LogLevel::Debug, "lesson.advance.ignored", payload.clone());
                    self.event("lesson.advance.ignored", payload);
                }
            }
        }

        Ok(TickFrame {
            tick: self.tick,
            stage: self.stage,
            instruction: self.instruction(),
            boundary: self.classifier.params().boundary(),
            classifier: self.classifier.params(),
            metrics: self.metrics,
            evaluation: evaluation.filter(|_| !advanced),
            outcomes: self.dataset.outcomes(),
            advanced,
            generation: self.dataset.generation(),
        })
    }

    /// Installs an externally built dataset into the current stage.
    ///
    /// Same effect as a regeneration: classifier back to the origin, metrics cleared.
    pub fn load_dataset(&mut self, dataset: Dataset, ground_truth: Option<GroundTruth>) {
        self.install(dataset, ground_truth, "external");
    }

    /// Places the classifier at `params` without touching metrics.
    pub fn set_classifier(&mut self, params: ClassifierParams) {
        self.classifier.set(params);
    }

    /// Instruction key for the current state.
    #[must_use]
    pub fn instruction(&self) -> InstructionKey {
        if self.stage.next().is_none() {
            InstructionKey::XorExplore
        } else if !self.dataset.is_empty() && self.threshold_met() {
            InstructionKey::CloseEnough
        } else {
            InstructionKey::Controls
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> LessonStage {
        self.stage
    }

    /// Current metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Current classifier params.
    #[must_use]
    pub const fn classifier(&self) -> ClassifierParams {
        self.classifier.params()
    }

    /// Current dataset.
    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Hidden boundary of the current dataset, when it has one.
    #[must_use]
    pub const fn ground_truth(&self) -> Option<GroundTruth> {
        self.ground_truth
    }

    /// Configuration the controller was built with.
    #[must_use]
    pub const fn config(&self) -> &LessonConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    fn threshold_met(&self) -> bool {
        self.metrics.accuracy >= self.stage_config(self.stage).accuracy_threshold
    }

    const fn stage_config(&self, stage: LessonStage) -> &StageConfig {
        match stage {
            LessonStage::Sharp => &self.config.sharp,
            LessonStage::Fuzzy => &self.config.fuzzy,
            LessonStage::Xor => &self.config.xor,
        }
    }

    fn generate_for(&mut self, stage: LessonStage) -> Result<(Dataset, Option<GroundTruth>)> {
        let params = self.stage_config(stage).params(stage.mode());
        self.generator
            .generate(&params)
            .with_context(|| format!("generating {} dataset", stage.label()))
    }

    // The new dataset is fully built before the stage or dataset changes.
    fn advance_to(&mut self, next: LessonStage) -> Result<()> {
        let (dataset, truth) = self.generate_for(next)?;
        let from = self.stage;
        self.stage = next;
        self.install(dataset, truth, "generated");
        let payload = json!({ "from": from.label(), "to": next.label() });
        self.log(LogLevel::Info, "lesson.stage.advanced", payload.clone());
        self.event("lesson.stage.advanced", payload);
        Ok(())
    }

    fn install(&mut self, dataset: Dataset, ground_truth: Option<GroundTruth>, origin: &str) {
        self.dataset = dataset;
        self.ground_truth = ground_truth;
        self.classifier.reset();
        self.metrics.reset();
        self.gate_was_open = false;
        let payload = json!({
            "stage": self.stage.label(),
            "origin": origin,
            "generation": self.dataset.generation(),
            "mode": self.dataset.mode().label(),
            "count": self.dataset.len(),
            "positives": self.dataset.positive_count(),
        });
        self.log(LogLevel::Info, "lesson.dataset.generated", payload.clone());
        self.event("lesson.dataset.generated", payload);
    }

    fn log(&self, level: LogLevel, message: &str, metadata: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.log(level, message, self.tick, metadata);
        }
    }

    fn event(&self, event_type: &str, payload: Value) {
        if let Some(telemetry) = self.telemetry.as_ref() {
            let _ = telemetry.event(event_type, payload);
        }
    }
}

/// Builder for [`LessonController`].
#[derive(Debug, Default)]
pub struct LessonControllerBuilder {
    config: LessonConfig,
    seed: Option<u64>,
    telemetry: Option<LessonTelemetry>,
}

impl LessonControllerBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: LessonConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the dataset generator; unseeded builders draw a random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: LessonTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validates the configuration and generates the `Sharp` dataset.
    pub fn build(self) -> Result<LessonController> {
        self.config.validate().context("invalid lesson config")?;
        let seed = self.seed.unwrap_or_else(rand::random);
        let generator = DatasetGenerator::new(
            seed,
            self.config.min_weight_magnitude,
            self.config.max_weight_magnitude,
        )?;
        let mut controller = LessonController {
            classifier: ClassifierState::new(
                self.config.weight_sensitivity,
                self.config.bias_sensitivity,
            ),
            config: self.config,
            generator,
            dataset: Dataset::from_points(GenerationMode::Separable, Vec::new()),
            ground_truth: None,
            metrics: Metrics::default(),
            stage: LessonStage::Sharp,
            tick: 0,
            gate_was_open: false,
            telemetry: self.telemetry,
        };
        controller.log(
            LogLevel::Info,
            "lesson.start",
            json!({ "seed": seed, "stage": LessonStage::Sharp.label() }),
        );
        let (dataset, truth) = controller.generate_for(LessonStage::Sharp)?;
        controller.install(dataset, truth, "generated");
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::MemoryEventBus, generator::Point};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn controller(seed: u64) -> LessonController {
        LessonController::builder().seed(seed).build().unwrap()
    }

    fn still() -> TickInput {
        TickInput::default()
    }

    /// Grid points labeled by `y > 2x`, keeping clear of the line.
    fn slope_two_dataset() -> Dataset {
        let mut points = Vec::new();
        for i in -10..=10 {
            for j in -10..=10 {
                let (x, y) = (i as f32 * 3.0, j as f32 * 3.0);
                if (y - 2.0 * x).abs() > 0.5 {
                    points.push(Point::new(x, y, 2.0 * x < y));
                }
            }
        }
        Dataset::from_points(GenerationMode::Separable, points)
    }

    #[test]
    fn starts_in_sharp_at_the_origin() {
        let lesson = controller(1);
        assert_eq!(lesson.stage(), LessonStage::Sharp);
        assert_eq!(lesson.dataset().len(), 100);
        assert_eq!(lesson.classifier(), ClassifierParams::default());
        assert_eq!(*lesson.metrics(), Metrics::default());
        assert!(lesson.ground_truth().is_some());
        assert_eq!(lesson.instruction(), InstructionKey::Controls);
    }

    #[test]
    fn input_is_integrated_before_evaluation() {
        let mut lesson = controller(2);
        let input = TickInput {
            weight_increase: true,
            bias_decrease: true,
            ..TickInput::default()
        };
        let frame = lesson.tick(&input, 0.5).unwrap();
        assert!((frame.classifier.weight - 0.5).abs() < 1e-6);
        assert!((frame.classifier.bias + 5.0).abs() < 1e-6);
        let expected = lesson
            .dataset()
            .points()
            .iter()
            .filter(|p| frame.classifier.predict(p.position.x, p.position.y) == p.label)
            .count();
        assert_eq!(frame.evaluation.unwrap().correct, expected);
        assert!(frame.outcomes.iter().all(|o| *o != Outcome::Unclassified));
    }

    #[test]
    fn perfect_line_then_advance_moves_to_fuzzy() {
        let mut lesson = controller(3);
        lesson.load_dataset(slope_two_dataset(), Some(GroundTruth { weight: 2.0, bias: 0.0 }));
        lesson.set_classifier(ClassifierParams::new(2.0, 0.0));

        let frame = lesson.tick(&still(), 0.016).unwrap();
        assert_eq!(frame.evaluation.map(|e| e.correct), Some(frame.outcomes.len()));
        assert!(frame.metrics.accuracy >= 0.98);
        assert_eq!(frame.instruction, InstructionKey::CloseEnough);
        assert!(!frame.advanced);
        let old_generation = frame.generation;

        let frame = lesson.tick(&TickInput::advance(), 0.016).unwrap();
        assert!(frame.advanced);
        assert_eq!(frame.stage, LessonStage::Fuzzy);
        assert!(frame.evaluation.is_none());
        assert!(frame.metrics.accuracy.abs() < f32::EPSILON);
        assert!(frame.metrics.loss.is_infinite());
        assert!(frame.metrics.best_accuracy.abs() < f32::EPSILON);
        assert!(frame.metrics.best_loss.is_infinite());
        assert_eq!(frame.classifier, ClassifierParams::default());
        assert_ne!(frame.generation, old_generation);
        assert!(frame.outcomes.iter().all(|o| *o == Outcome::Unclassified));
        assert_eq!(frame.instruction, InstructionKey::Controls);
        assert_eq!(lesson.dataset().len(), lesson.config().fuzzy.count);
        assert_eq!(lesson.dataset().mode(), GenerationMode::Separable);
    }

    #[test]
    fn advance_below_threshold_is_ignored() {
        let bus = Arc::new(MemoryEventBus::new(16));
        let telemetry = LessonTelemetry::builder("lesson").event_sink(bus.clone()).build().unwrap();
        let mut lesson = LessonController::builder().seed(4).telemetry(telemetry).build().unwrap();
        lesson.load_dataset(slope_two_dataset(), None);
        lesson.set_classifier(ClassifierParams::new(0.0, 1000.0));
        let frame = lesson.tick(&TickInput::advance(), 0.016).unwrap();
        assert!(!frame.advanced);
        assert_eq!(frame.stage, LessonStage::Sharp);
        assert!(frame.metrics.accuracy < 0.98);
        assert_eq!(bus.of_type("lesson.advance.ignored").len(), 1);
        assert!(bus.of_type("lesson.stage.advanced").is_empty());
    }

    #[test]
    fn bests_reset_exactly_at_regeneration() {
        let mut lesson = controller(5);
        let truth = lesson.ground_truth().unwrap();
        let mut previous = *lesson.metrics();
        let nudge = TickInput {
            bias_increase: true,
            ..TickInput::default()
        };
        for _ in 0..30 {
            let frame = lesson.tick(&nudge, 0.1).unwrap();
            assert!(frame.metrics.best_accuracy >= previous.best_accuracy);
            assert!(frame.metrics.best_loss <= previous.best_loss);
            previous = frame.metrics;
        }
        lesson.set_classifier(ClassifierParams::new(truth.weight, truth.bias));
        let before = lesson.tick(&still(), 0.0).unwrap();
        assert!((before.metrics.best_accuracy - 1.0).abs() < f32::EPSILON);
        assert!(before.metrics.best_loss.abs() < f32::EPSILON);
        let after = lesson.tick(&TickInput::advance(), 0.0).unwrap();
        assert!(after.advanced);
        assert!(after.metrics.best_accuracy.abs() < f32::EPSILON);
        assert!(after.metrics.best_loss.is_infinite());
    }

    #[test]
    fn full_progression_reaches_terminal_xor() {
        let mut config = LessonConfig::default();
        config.fuzzy.noise = 1.0;
        let dir = tempdir().unwrap();
        let bus = Arc::new(MemoryEventBus::new(32));
        let telemetry = LessonTelemetry::builder("lesson")
            .log_path(dir.path().join("lesson.log"))
            .event_sink(bus.clone())
            .build()
            .unwrap();
        let mut lesson = LessonController::builder()
            .config(config)
            .seed(6)
            .telemetry(telemetry)
            .build()
            .unwrap();

        for expected in [LessonStage::Fuzzy, LessonStage::Xor] {
            let truth = lesson.ground_truth().unwrap();
            lesson.set_classifier(ClassifierParams::new(truth.weight, truth.bias));
            let frame = lesson.tick(&TickInput::advance(), 0.016).unwrap();
            assert!(frame.advanced, "stuck before {expected:?}");
            assert_eq!(frame.stage, expected);
        }
        assert_eq!(lesson.dataset().mode(), GenerationMode::Xor);
        assert!(lesson.ground_truth().is_none());

        let frame = lesson.tick(&TickInput::advance(), 0.016).unwrap();
        assert!(!frame.advanced);
        assert_eq!(frame.stage, LessonStage::Xor);
        assert_eq!(frame.instruction, InstructionKey::XorExplore);

        assert_eq!(bus.of_type("lesson.stage.advanced").len(), 2);
        assert_eq!(bus.of_type("lesson.dataset.generated").len(), 3);
        assert_eq!(bus.of_type("lesson.stage.ready").len(), 2);
        let log = std::fs::read_to_string(dir.path().join("lesson.log")).unwrap();
        assert!(log.contains("lesson.start"));
        assert!(log.contains("\"to\":\"xor\""));
    }

    #[test]
    fn empty_dataset_keeps_the_loop_total() {
        let mut lesson = controller(7);
        lesson.load_dataset(Dataset::from_points(GenerationMode::Xor, Vec::new()), None);
        let frame = lesson.tick(&TickInput::advance(), 0.016).unwrap();
        assert!(frame.evaluation.is_none());
        assert_eq!(frame.metrics, Metrics::default());
        assert!(!frame.advanced);
        assert!(frame.outcomes.is_empty());
    }

    #[test]
    fn same_seed_same_lesson() {
        let a = controller(8);
        let b = controller(8);
        assert_eq!(a.dataset().points(), b.dataset().points());
        assert_eq!(a.ground_truth(), b.ground_truth());
    }

    #[test]
    fn invalid_config_fails_fast() {
        let mut config = LessonConfig::default();
        config.sharp.low = 10.0;
        config.sharp.high = -10.0;
        let err = LessonController::builder().config(config).build().unwrap_err();
        assert!(format!("{err:#}").contains("invalid sampling range"));
    }
}
