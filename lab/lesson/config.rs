use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::LessonError,
    generator::{GenerationMode, GenerationParams},
};

/// Generation recipe and advance gate for one lesson stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Number of points.
    pub count: usize,
    /// Lower coordinate bound.
    pub low: f32,
    /// Upper coordinate bound.
    pub high: f32,
    /// Per-axis position noise scale.
    pub noise: f32,
    /// Accuracy at which the stage counts as solved.
    pub accuracy_threshold: f32,
}

impl StageConfig {
    const fn with(noise: f32, accuracy_threshold: f32) -> Self {
        Self {
            count: 100,
            low: -30.0,
            high: 30.0,
            noise,
            accuracy_threshold,
        }
    }

    /// Generation params for this stage under `mode`.
    #[must_use]
    pub const fn params(&self, mode: GenerationMode) -> GenerationParams {
        GenerationParams {
            count: self.count,
            low: self.low,
            high: self.high,
            noise: self.noise,
            mode,
        }
    }

    fn validate(&self, mode: GenerationMode) -> Result<(), LessonError> {
        self.params(mode).validate()?;
        if !(0.0..=1.0).contains(&self.accuracy_threshold) {
            return Err(LessonError::InvalidThreshold(self.accuracy_threshold));
        }
        Ok(())
    }
}

/// Stage table as written in TOML. Absent keys keep that stage's own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageOverrides {
    count: Option<usize>,
    low: Option<f32>,
    high: Option<f32>,
    noise: Option<f32>,
    accuracy_threshold: Option<f32>,
}

impl StageOverrides {
    fn over(self, base: StageConfig) -> StageConfig {
        StageConfig {
            count: self.count.unwrap_or(base.count),
            low: self.low.unwrap_or(base.low),
            high: self.high.unwrap_or(base.high),
            noise: self.noise.unwrap_or(base.noise),
            accuracy_threshold: self.accuracy_threshold.unwrap_or(base.accuracy_threshold),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLessonConfig {
    #[serde(default = "default_min_weight_magnitude")]
    min_weight_magnitude: f32,
    #[serde(default = "default_max_weight_magnitude")]
    max_weight_magnitude: f32,
    #[serde(default = "default_weight_sensitivity")]
    weight_sensitivity: f32,
    #[serde(default = "default_bias_sensitivity")]
    bias_sensitivity: f32,
    #[serde(default)]
    sharp: StageOverrides,
    #[serde(default)]
    fuzzy: StageOverrides,
    #[serde(default)]
    xor: StageOverrides,
}

impl From<RawLessonConfig> for LessonConfig {
    fn from(raw: RawLessonConfig) -> Self {
        Self {
            min_weight_magnitude: raw.min_weight_magnitude,
            max_weight_magnitude: raw.max_weight_magnitude,
            weight_sensitivity: raw.weight_sensitivity,
            bias_sensitivity: raw.bias_sensitivity,
            sharp: raw.sharp.over(default_sharp()),
            fuzzy: raw.fuzzy.over(default_fuzzy()),
            xor: raw.xor.over(default_xor()),
        }
    }
}

/// Constructor-time lesson configuration. Not re-read at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLessonConfig")]
pub struct LessonConfig {
    /// Smallest ground-truth slope magnitude.
    pub min_weight_magnitude: f32,
    /// Largest ground-truth slope magnitude.
    pub max_weight_magnitude: f32,
    /// Weight change per second of held input.
    pub weight_sensitivity: f32,
    /// Bias change per second of held input.
    pub bias_sensitivity: f32,
    /// Noiseless separable stage.
    pub sharp: StageConfig,
    /// Noisy separable stage.
    pub fuzzy: StageConfig,
    /// XOR stage.
    pub xor: StageConfig,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            min_weight_magnitude: default_min_weight_magnitude(),
            max_weight_magnitude: default_max_weight_magnitude(),
            weight_sensitivity: default_weight_sensitivity(),
            bias_sensitivity: default_bias_sensitivity(),
            sharp: default_sharp(),
            fuzzy: default_fuzzy(),
            xor: default_xor(),
        }
    }
}

impl LessonConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lesson config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every precondition the generators and classifier rely on.
    pub fn validate(&self) -> Result<(), LessonError> {
        let magnitudes_ok = self.min_weight_magnitude.is_finite()
            && self.max_weight_magnitude.is_finite()
            && self.min_weight_magnitude >= 0.0
            && self.min_weight_magnitude <= self.max_weight_magnitude;
        if !magnitudes_ok {
            return Err(LessonError::InvalidMagnitudes {
                min: self.min_weight_magnitude,
                max: self.max_weight_magnitude,
            });
        }
        for (name, value) in [
            ("weight_sensitivity", self.weight_sensitivity),
            ("bias_sensitivity", self.bias_sensitivity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LessonError::InvalidSensitivity { name, value });
            }
        }
        self.sharp.validate(GenerationMode::Separable)?;
        self.fuzzy.validate(GenerationMode::Separable)?;
        self.xor.validate(GenerationMode::Xor)
    }
}

const fn default_min_weight_magnitude() -> f32 {
    0.5
}

const fn default_max_weight_magnitude() -> f32 {
    3.0
}

const fn default_weight_sensitivity() -> f32 {
    1.0
}

const fn default_bias_sensitivity() -> f32 {
    10.0
}

const fn default_sharp() -> StageConfig {
    StageConfig::with(0.0, 0.98)
}

const fn default_fuzzy() -> StageConfig {
    StageConfig::with(10.0, 0.8)
}

// No line beats about 2/3 over the XOR population; 0.75 is only reached when
// a small sample happens to be lopsided, so this gate rarely opens.
const fn default_xor() -> StageConfig {
    StageConfig::with(0.0, 0.75)
}
