//! Text readouts for display sinks: metric fields and the instruction catalogue.

use indexmap::IndexMap;

use crate::{classifier::ClassifierParams, evaluator::Metrics, lesson::InstructionKey};

const TASK: &str =
    "Find a line that best separates the red and blue dots. Bright dots are misclassified.";

const CONTROLS: &str = "Controls:\n\
     Press A or D to decrease or increase weight.\n\
     Press S or W to decrease or increase bias.";

/// Instruction text shown for a key.
#[must_use]
pub fn instruction_text(key: InstructionKey) -> String {
    match key {
        InstructionKey::Controls => format!("{TASK}\n{CONTROLS}"),
        InstructionKey::CloseEnough => {
            format!("{TASK}\n\nClose enough. Press Space to continue.")
        }
        InstructionKey::XorExplore => format!(
            "No single line separates these dots. Get as close as you can.\n{CONTROLS}\n\
             Press Q to quit."
        ),
    }
}

/// Formats with at most three decimals, dropping trailing zeros. Infinite values print as `∞`.
#[must_use]
pub fn format_value(value: f32) -> String {
    if value.is_infinite() {
        let infinity = if value > 0.0 { "∞" } else { "-∞" };
        return infinity.into();
    }
    if value.is_nan() {
        return "NaN".into();
    }
    let fixed = format!("{value:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".into(),
        other => other.into(),
    }
}

/// Ordered label/value pairs for the metrics panel.
#[must_use]
pub fn metric_fields(params: ClassifierParams, metrics: &Metrics) -> IndexMap<&'static str, String> {
    let mut fields = IndexMap::new();
    fields.insert("Weight", format_value(params.weight));
    fields.insert("Bias", format_value(params.bias));
    fields.insert("Accuracy", format_value(metrics.accuracy));
    fields.insert("Loss", format_value(metrics.loss));
    fields.insert("Best accuracy", format_value(metrics.best_accuracy));
    fields.insert("Best loss", format_value(metrics.best_loss));
    fields
}

/// Metrics panel as newline-separated `Label: value` lines.
#[must_use]
pub fn metrics_panel(params: ClassifierParams, metrics: &Metrics) -> String {
    metric_fields(params, metrics)
        .into_iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}
