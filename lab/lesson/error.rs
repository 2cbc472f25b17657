use thiserror::Error;

/// Precondition violations raised by generation and configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LessonError {
    /// Sampling interval is empty, inverted, or not finite.
    #[error("invalid sampling range: low {low} must be finite and below high {high}")]
    InvalidRange {
        /// Lower bound.
        low: f32,
        /// Upper bound.
        high: f32,
    },
    /// Noise scale is negative or not finite.
    #[error("invalid noise scale: {0}")]
    InvalidNoise(f32),
    /// Ground-truth weight magnitudes are unusable.
    #[error("invalid weight magnitudes: min {min}, max {max}")]
    InvalidMagnitudes {
        /// Smallest magnitude.
        min: f32,
        /// Largest magnitude.
        max: f32,
    },
    /// Accuracy threshold outside `[0, 1]`.
    #[error("accuracy threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),
    /// Steering rate is negative or not finite.
    #[error("invalid sensitivity for {name}: {value}")]
    InvalidSensitivity {
        /// Which rate.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
}
