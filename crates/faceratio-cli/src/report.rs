use faceratio_core::{Evaluation, FacialMetrics};

const RULE_WIDTH: usize = 60;

/// Human-readable report: one block per evaluation, then every raw field.
pub fn render(metrics: &FacialMetrics, evaluations: &[Evaluation]) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut lines = vec![
        String::new(),
        heavy.clone(),
        "  FACIAL PROPORTION REPORT".to_string(),
        heavy.clone(),
    ];
    lines.extend(evaluations.iter().flat_map(|eval| {
        [
            format!("  {}  {}", eval.status.symbol(), eval.description),
            format!(
                "       measured: {:.2}   |   ideal: {:.2}",
                eval.measured, eval.ideal
            ),
            String::new(),
        ]
    }));
    lines.extend([light.clone(), "  RAW DATA".to_string(), light]);
    lines.extend(
        metrics
            .fields()
            .into_iter()
            .map(|(name, value)| format!("  {name:<35}: {value:?}")),
    );
    lines.push(heavy);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
