use serde::{Deserialize, Serialize};

/// Weight and bias of the decision boundary `y = weight * x + bias`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Slope.
    pub weight: f32,
    /// Intercept.
    pub bias: f32,
}

impl ClassifierParams {
    /// Creates params.
    #[must_use]
    pub const fn new(weight: f32, bias: f32) -> Self {
        Self { weight, bias }
    }

    /// Predicts `true` when the point lies above the line.
    #[must_use]
    pub fn predict(&self, x: f32, y: f32) -> bool {
        self.weight * x + self.bias < y
    }

    /// Line description for renderers.
    #[must_use]
    pub fn boundary(&self) -> BoundaryLine {
        BoundaryLine {
            intercept_y: self.bias,
            angle_radians: self.weight.atan(),
        }
    }
}

/// Renderer-facing boundary: a line through `(0, intercept_y)` rotated by `angle_radians`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLine {
    /// Where the line crosses the y axis.
    pub intercept_y: f32,
    /// Rotation from the x axis.
    pub angle_radians: f32,
}

impl BoundaryLine {
    /// Rotation in degrees.
    #[must_use]
    pub fn angle_degrees(&self) -> f32 {
        self.angle_radians.to_degrees()
    }
}

/// Steering direction derived from a pair of held keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Move the value down.
    Decrease,
    /// Leave the value alone.
    #[default]
    Hold,
    /// Move the value up.
    Increase,
}

impl Direction {
    /// Resolves a key pair; increase wins when both are held.
    #[must_use]
    pub const fn from_keys(decrease: bool, increase: bool) -> Self {
        if increase {
            Self::Increase
        } else if decrease {
            Self::Decrease
        } else {
            Self::Hold
        }
    }

    /// -1, 0, or +1.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Decrease => -1.0,
            Self::Hold => 0.0,
            Self::Increase => 1.0,
        }
    }
}

/// Directions applied to weight and bias for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Steering {
    /// Weight direction.
    pub weight: Direction,
    /// Bias direction.
    pub bias: Direction,
}

/// Live classifier driven by continuous directional input.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierState {
    params: ClassifierParams,
    weight_rate: f32,
    bias_rate: f32,
}

impl ClassifierState {
    /// Creates a classifier at the origin with the given steering rates (units per second).
    #[must_use]
    pub const fn new(weight_rate: f32, bias_rate: f32) -> Self {
        Self {
            params: ClassifierParams::new(0.0, 0.0),
            weight_rate,
            bias_rate,
        }
    }

    /// Current params.
    #[must_use]
    pub const fn params(&self) -> ClassifierParams {
        self.params
    }

    /// Advances weight and bias by `rate * direction * dt`. Values are unbounded.
    pub fn integrate(&mut self, steering: Steering, dt: f32) {
        self.params.weight += self.weight_rate * steering.weight.sign() * dt;
        self.params.bias += self.bias_rate * steering.bias.sign() * dt;
    }

    /// Jumps straight to the given params.
    pub fn set(&mut self, params: ClassifierParams) {
        self.params = params;
    }

    /// Back to `(0, 0)`.
    pub fn reset(&mut self) {
        self.params = ClassifierParams::default();
    }
}
