use boundary_lesson::{ClassifierParams, GroundTruth, InstructionKey, LessonConfig, TickInput};

/// Scripted learner for demos: holds keys toward the hidden boundary and
/// presses advance as soon as the gate opens. It steers; it does not learn.
#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    weight_step: f32,
    bias_step: f32,
}

impl Autopilot {
    /// Creates an autopilot whose dead zone matches one tick of movement.
    #[must_use]
    pub fn new(config: &LessonConfig, dt: f32) -> Self {
        Self {
            weight_step: config.weight_sensitivity * dt,
            bias_step: config.bias_sensitivity * dt,
        }
    }

    /// Input for the next tick.
    #[must_use]
    pub fn next_input(
        &self,
        current: ClassifierParams,
        target: Option<GroundTruth>,
        instruction: InstructionKey,
    ) -> TickInput {
        let mut input = TickInput {
            advance: instruction == InstructionKey::CloseEnough,
            ..TickInput::default()
        };
        if let Some(target) = target {
            let dw = target.weight - current.weight;
            let db = target.bias - current.bias;
            input.weight_increase = dw > self.weight_step / 2.0;
            input.weight_decrease = dw < -self.weight_step / 2.0;
            input.bias_increase = db > self.bias_step / 2.0;
            input.bias_decrease = db < -self.bias_step / 2.0;
        }
        input
    }

    /// Whether `current` sits inside the dead zone around `target`.
    #[must_use]
    pub fn settled(&self, current: ClassifierParams, target: GroundTruth) -> bool {
        (target.weight - current.weight).abs() <= self.weight_step / 2.0
            && (target.bias - current.bias).abs() <= self.bias_step / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steers_toward_target_and_advances_when_open() {
        let pilot = Autopilot::new(&LessonConfig::default(), 0.1);
        let target = GroundTruth {
            weight: 2.0,
            bias: -5.0,
        };
        let input = pilot.next_input(ClassifierParams::default(), Some(target), InstructionKey::Controls);
        assert!(input.weight_increase && input.bias_decrease);
        assert!(!input.advance);

        let input = pilot.next_input(
            ClassifierParams::new(2.0, -5.0),
            Some(target),
            InstructionKey::CloseEnough,
        );
        assert_eq!(
            input,
            TickInput {
                advance: true,
                ..TickInput::default()
            }
        );
        assert!(pilot.settled(ClassifierParams::new(2.04, -5.4), target));
    }
}
