use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::LessonError, sampler::NormalSampler};

/// 2-D coordinates of a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Classification outcome tag; renderers map it to a visual style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Not evaluated against the current dataset yet.
    #[default]
    Unclassified,
    /// Prediction matches the label.
    Correct,
    /// Prediction disagrees with the label.
    Incorrect,
}

/// Labeled point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stored (possibly noisy) position.
    pub position: Position,
    /// Class label; `true` means above the generating boundary.
    pub label: bool,
    /// Latest evaluation outcome.
    #[serde(default)]
    pub outcome: Outcome,
}

impl Point {
    /// Creates an unclassified point.
    #[must_use]
    pub const fn new(x: f32, y: f32, label: bool) -> Self {
        Self {
            position: Position::new(x, y),
            label,
            outcome: Outcome::Unclassified,
        }
    }
}

/// Generative model used to label points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Labels come from a hidden linear boundary.
    Separable,
    /// Labels come from the sign of `x * y`.
    Xor,
}

impl GenerationMode {
    /// Label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Separable => "separable",
            Self::Xor => "xor",
        }
    }
}

/// Parameters of one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Number of points.
    pub count: usize,
    /// Lower bound of the uniform coordinate range.
    pub low: f32,
    /// Upper bound of the uniform coordinate range.
    pub high: f32,
    /// Scale of the per-axis normal perturbation.
    pub noise: f32,
    /// Labeling model.
    pub mode: GenerationMode,
}

impl GenerationParams {
    /// Checks the range and noise preconditions.
    pub fn validate(&self) -> Result<(), LessonError> {
        if !(self.low.is_finite() && self.high.is_finite() && self.low < self.high) {
            return Err(LessonError::InvalidRange {
                low: self.low,
                high: self.high,
            });
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(LessonError::InvalidNoise(self.noise));
        }
        Ok(())
    }
}

/// Hidden boundary `y = weight * x + bias` that labeled a separable dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// Slope.
    pub weight: f32,
    /// Intercept.
    pub bias: f32,
}

/// Ordered set of labeled points from a single generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    generation: Uuid,
    mode: GenerationMode,
    points: Vec<Point>,
}

impl Dataset {
    /// Wraps externally built points as a fresh generation.
    #[must_use]
    pub fn from_points(mode: GenerationMode, points: Vec<Point>) -> Self {
        Self {
            generation: Uuid::new_v4(),
            mode,
            points,
        }
    }

    /// Identifier of this generation.
    #[must_use]
    pub const fn generation(&self) -> Uuid {
        self.generation
    }

    /// Model that produced the labels.
    #[must_use]
    pub const fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Points in stable order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable access used by evaluation.
    pub fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the dataset has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points labeled `true`.
    #[must_use]
    pub fn positive_count(&self) -> usize {
        self.points.iter().filter(|point| point.label).count()
    }

    /// Outcome of every point, in order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.points.iter().map(|point| point.outcome).collect()
    }
}

/// Builds labeled point sets from an injected seedable RNG.
#[derive(Debug, Clone)]
pub struct DatasetGenerator {
    rng: SmallRng,
    min_weight_magnitude: f32,
    max_weight_magnitude: f32,
}

impl DatasetGenerator {
    /// Creates a generator with ground-truth slopes drawn from `[min, max]`.
    pub fn new(
        seed: u64,
        min_weight_magnitude: f32,
        max_weight_magnitude: f32,
    ) -> Result<Self, LessonError> {
        Self::with_rng(
            SmallRng::seed_from_u64(seed),
            min_weight_magnitude,
            max_weight_magnitude,
        )
    }

    /// Creates a generator around an existing RNG.
    pub fn with_rng(
        rng: SmallRng,
        min_weight_magnitude: f32,
        max_weight_magnitude: f32,
    ) -> Result<Self, LessonError> {
        let valid = min_weight_magnitude.is_finite()
            && max_weight_magnitude.is_finite()
            && min_weight_magnitude >= 0.0
            && min_weight_magnitude <= max_weight_magnitude;
        if !valid {
            return Err(LessonError::InvalidMagnitudes {
                min: min_weight_magnitude,
                max: max_weight_magnitude,
            });
        }
        Ok(Self {
            rng,
            min_weight_magnitude,
            max_weight_magnitude,
        })
    }

    /// Generates according to `params.mode`. Separable runs also return their ground truth.
    pub fn generate(
        &mut self,
        params: &GenerationParams,
    ) -> Result<(Dataset, Option<GroundTruth>), LessonError> {
        match params.mode {
            GenerationMode::Separable => self
                .generate_separable(params.count, params.low, params.high, params.noise)
                .map(|(dataset, truth)| (dataset, Some(truth))),
            GenerationMode::Xor => self
                .generate_xor(params.count, params.low, params.high, params.noise)
                .map(|dataset| (dataset, None)),
        }
    }

    /// Points labeled by a random hidden line; `true` when the point lies above it.
    pub fn generate_separable(
        &mut self,
        count: usize,
        low: f32,
        high: f32,
        noise: f32,
    ) -> Result<(Dataset, GroundTruth), LessonError> {
        GenerationParams {
            count,
            low,
            high,
            noise,
            mode: GenerationMode::Separable,
        }
        .validate()?;

        let magnitude = self.rng.gen::<f32>()
            * (self.max_weight_magnitude - self.min_weight_magnitude)
            + self.min_weight_magnitude;
        let weight = if self.rng.gen_bool(0.5) {
            -magnitude
        } else {
            magnitude
        };
        let bias = self.uniform(low, high) / 2.0;
        let truth = GroundTruth { weight, bias };

        let points = (0..count)
            .map(|_| {
                let x = self.uniform(low, high);
                let y = self.uniform(low, high);
                let label = weight * x + bias < y;
                self.perturbed(x, y, label, noise)
            })
            .collect();
        Ok((Dataset::from_points(GenerationMode::Separable, points), truth))
    }

    /// Points labeled `true` in the first and third quadrants.
    pub fn generate_xor(
        &mut self,
        count: usize,
        low: f32,
        high: f32,
        noise: f32,
    ) -> Result<Dataset, LessonError> {
        GenerationParams {
            count,
            low,
            high,
            noise,
            mode: GenerationMode::Xor,
        }
        .validate()?;

        let points = (0..count)
            .map(|_| {
                let x = self.uniform(low, high);
                let y = self.uniform(low, high);
                self.perturbed(x, y, x * y > 0.0, noise)
            })
            .collect();
        Ok(Dataset::from_points(GenerationMode::Xor, points))
    }

    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        self.rng.gen::<f32>() * (high - low) + low
    }

    // Labels are fixed before the stored position is perturbed.
    fn perturbed(&mut self, x: f32, y: f32, label: bool, noise: f32) -> Point {
        let dx = self.rng.sample(NormalSampler::STANDARD);
        let dy = self.rng.sample(NormalSampler::STANDARD);
        Point::new(noise.mul_add(dx, x), noise.mul_add(dy, y), label)
    }
}
