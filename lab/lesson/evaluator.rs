use serde::{Deserialize, Serialize};

use crate::{
    classifier::ClassifierParams,
    generator::{Dataset, Outcome},
};

/// Substitute for `ln` of non-positive inputs.
pub const LOG_FLOOR: f32 = -100.0;

/// Natural log clamped at [`LOG_FLOOR`], like the log inside `BCELoss`.
#[must_use]
pub fn safe_log(x: f32) -> f32 {
    if x > 0.0 {
        x.ln()
    } else {
        LOG_FLOOR
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Points classified correctly.
    pub correct: usize,
    /// Points evaluated.
    pub total: usize,
    /// `correct / total`.
    pub accuracy: f32,
    /// Mean clamped binary cross-entropy.
    pub loss: f32,
}

/// Live and best metrics within a lesson stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Accuracy of the latest pass.
    pub accuracy: f32,
    /// Loss of the latest pass.
    pub loss: f32,
    /// Highest accuracy since the last reset.
    pub best_accuracy: f32,
    /// Lowest loss since the last reset.
    pub best_loss: f32,
}

impl Metrics {
    /// Folds a pass into the live and best values.
    pub fn record(&mut self, evaluation: &Evaluation) {
        self.accuracy = evaluation.accuracy;
        self.loss = evaluation.loss;
        self.best_accuracy = self.best_accuracy.max(evaluation.accuracy);
        self.best_loss = self.best_loss.min(evaluation.loss);
    }

    /// Accuracy 0, loss infinite, bests cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            accuracy: 0.0,
            loss: f32::INFINITY,
            best_accuracy: 0.0,
            best_loss: f32::INFINITY,
        }
    }
}

/// Classifies every point, stamps its outcome, and folds the pass into `metrics`.
///
/// The loss treats the hard prediction (0 or 1) as the probability term, so
/// every misclassified point contributes `-LOG_FLOOR` and every correct one 0.
/// An empty dataset is a no-op: nothing is recorded and `None` is returned.
pub fn evaluate(
    dataset: &mut Dataset,
    params: ClassifierParams,
    metrics: &mut Metrics,
) -> Option<Evaluation> {
    if dataset.is_empty() {
        return None;
    }
    let mut correct = 0_usize;
    let mut total_loss = 0.0_f32;
    for point in dataset.points_mut() {
        let prediction = params.predict(point.position.x, point.position.y);
        if prediction == point.label {
            correct += 1;
            point.outcome = Outcome::Correct;
        } else {
            point.outcome = Outcome::Incorrect;
        }
        let p = f32::from(u8::from(prediction));
        let label = f32::from(u8::from(point.label));
        total_loss -= label * safe_log(p) + (1.0 - label) * safe_log(1.0 - p);
    }
    let total = dataset.len();
    let evaluation = Evaluation {
        correct,
        total,
        accuracy: correct as f32 / total as f32,
        loss: total_loss / total as f32,
    };
    metrics.record(&evaluation);
    Some(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{DatasetGenerator, GenerationMode, Point};

    fn diagonal_dataset() -> Dataset {
        Dataset::from_points(
            GenerationMode::Separable,
            vec![
                Point::new(0.0, 5.0, true),
                Point::new(0.0, -5.0, false),
                Point::new(3.0, 10.0, true),
                Point::new(3.0, 2.0, false),
            ],
        )
    }

    #[test]
    fn safe_log_clamps_non_positive() {
        assert!((safe_log(0.0) - LOG_FLOOR).abs() < f32::EPSILON);
        assert!((safe_log(-1.0) - LOG_FLOOR).abs() < f32::EPSILON);
        assert!((safe_log(2.0) - 2.0_f32.ln()).abs() < f32::EPSILON);
        assert!(safe_log(1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn perfect_boundary_scores_full_accuracy_and_zero_loss() {
        let mut dataset = diagonal_dataset();
        let mut metrics = Metrics::default();
        let evaluation = evaluate(&mut dataset, ClassifierParams::new(2.0, 0.0), &mut metrics).unwrap();
        assert_eq!(evaluation.correct, 4);
        assert!((metrics.accuracy - 1.0).abs() < f32::EPSILON);
        assert!(metrics.loss.abs() < f32::EPSILON);
        assert!(dataset.outcomes().iter().all(|o| *o == Outcome::Correct));
    }

    #[test]
    fn misclassified_points_cost_the_log_floor() {
        let mut dataset = diagonal_dataset();
        let mut metrics = Metrics::default();
        // Line far above every point: everything predicted `false`.
        evaluate(&mut dataset, ClassifierParams::new(0.0, 100.0), &mut metrics).unwrap();
        assert!((metrics.accuracy - 0.5).abs() < f32::EPSILON);
        assert!((metrics.loss - 50.0).abs() < 1e-4);
        assert!(metrics.loss.is_finite());
        assert_eq!(
            dataset.outcomes(),
            vec![
                Outcome::Incorrect,
                Outcome::Correct,
                Outcome::Incorrect,
                Outcome::Correct
            ]
        );
    }

    #[test]
    fn outcomes_follow_the_latest_params() {
        let mut dataset = diagonal_dataset();
        let mut metrics = Metrics::default();
        evaluate(&mut dataset, ClassifierParams::new(2.0, 0.0), &mut metrics);
        evaluate(&mut dataset, ClassifierParams::new(0.0, 100.0), &mut metrics);
        assert_eq!(dataset.outcomes()[0], Outcome::Incorrect);
    }

    #[test]
    fn bests_are_monotonic_between_resets() {
        let (mut dataset, _) = DatasetGenerator::new(21, 0.5, 3.0)
            .unwrap()
            .generate_separable(200, -30.0, 30.0, 5.0)
            .unwrap();
        let mut metrics = Metrics::default();
        let mut previous = metrics;
        for step in 0..40 {
            let params = ClassifierParams::new((step as f32 - 20.0) / 5.0, (step % 7) as f32 * 3.0);
            evaluate(&mut dataset, params, &mut metrics).unwrap();
            assert!(metrics.best_accuracy >= previous.best_accuracy);
            assert!(metrics.best_loss <= previous.best_loss);
            assert!(metrics.loss.is_finite());
            assert!(metrics.best_accuracy >= metrics.accuracy);
            previous = metrics;
        }
        metrics.reset();
        assert!(metrics.best_accuracy.abs() < f32::EPSILON);
        assert!(metrics.best_loss.is_infinite());
    }

    #[test]
    fn empty_dataset_is_a_no_op() {
        let mut dataset = Dataset::from_points(GenerationMode::Xor, Vec::new());
        let mut metrics = Metrics::default();
        assert!(evaluate(&mut dataset, ClassifierParams::default(), &mut metrics).is_none());
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn ground_truth_classifies_noiseless_data_perfectly() {
        let (mut dataset, truth) = DatasetGenerator::new(8, 0.5, 3.0)
            .unwrap()
            .generate_separable(1000, -30.0, 30.0, 0.0)
            .unwrap();
        let mut metrics = Metrics::default();
        let params = ClassifierParams::new(truth.weight, truth.bias);
        let evaluation = evaluate(&mut dataset, params, &mut metrics).unwrap();
        assert_eq!(evaluation.correct, 1000);
        assert!((metrics.accuracy - 1.0).abs() < f32::EPSILON);
    }
}
