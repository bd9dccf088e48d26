//! TAP-format experiment reporting.
//!
//! One test point per item, passing when the retrieval arm is fully
//! correct. Failures carry a YAML diagnostic block comparing both arms.

use super::{percent, ArmResult, ArmTally, ExperimentRun, ItemResult};

/// TAP v14 report for `run`.
pub fn render_tap(run: &ExperimentRun) -> String {
    let mut lines = vec![
        "TAP version 14".to_string(),
        format!("1..{}", run.items.len()),
    ];

    for (i, result) in run.items.iter().enumerate() {
        let n = i + 1;
        if result.with_retrieval.fully_correct {
            lines.push(format!("ok {} - {}", n, result.item.input));
        } else {
            lines.push(format!("not ok {} - {}", n, result.item.input));
            diagnostics(result, &mut lines);
        }
    }

    lines.push(format!("# tests          {}", run.items.len()));
    lines.push(format!("# fully correct  {}", run.with_retrieval.fully_correct));
    lines.push(format!(
        "# not correct    {}",
        run.items.len() - run.with_retrieval.fully_correct
    ));
    lines.join("\n")
}

fn diagnostics(result: &ItemResult, lines: &mut Vec<String>) {
    let item = &result.item;
    lines.push("  ---".to_string());
    let expected = match item.expected_function {
        Some(f) => format!("{}/{}/{}", item.expected_case, item.expected_role, f),
        None => format!("{}/{}", item.expected_case, item.expected_role),
    };
    lines.push(format!("  expected: {}", expected));
    if !item.explanation.is_empty() {
        lines.push(format!("  why: {}", quoted(&item.explanation, 200)));
    }
    arm_block("with_retrieval", &result.with_retrieval, lines);
    arm_block("without_retrieval", &result.without_retrieval, lines);
    lines.push("  ...".to_string());
}

fn arm_block(name: &str, arm: &ArmResult, lines: &mut Vec<String>) {
    lines.push(format!("  {}:", name));
    lines.push(format!("    got: {}", arm.label()));
    lines.push(format!("    attempts: {}", arm.session.attempts.len()));
    lines.push(format!("    candidates: [{}]", arm.session.candidates.join(", ")));
    if let Some(error) = &arm.session.error {
        lines.push(format!("    error: {}", quoted(error, 200)));
    } else if let Some(explanation) = arm
        .session
        .attempts
        .last()
        .and_then(|a| a.result.explanation())
    {
        lines.push(format!("    last_rejection: {}", quoted(explanation, 200)));
    }
}

/// Side-by-side counts and the retrieval improvement.
pub fn render_summary(run: &ExperimentRun) -> String {
    let mut lines = vec![format!("Experiment summary: {} items", run.items.len())];
    tally_block("without retrieval (baseline)", &run.without_retrieval, &mut lines);
    tally_block("with retrieval", &run.with_retrieval, &mut lines);

    let relative = match run.relative_improvement() {
        Some(pct) => format!("{:.1}% relative", pct),
        None => "no baseline to compare".to_string(),
    };
    lines.push(format!(
        "Retrieval improvement: {:+} fully correct ({})",
        run.improvement(),
        relative
    ));
    lines.join("\n")
}

fn tally_block(title: &str, tally: &ArmTally, lines: &mut Vec<String>) {
    let row = |label: &str, count: usize| {
        format!(
            "  {:<18} {}/{} ({:.1}%)",
            label,
            count,
            tally.total,
            percent(count, tally.total)
        )
    };
    lines.push(format!("{}:", title));
    lines.push(row("valid", tally.valid));
    lines.push(row("correct case", tally.correct_case));
    lines.push(row("correct role", tally.correct_role));
    lines.push(row("correct function", tally.correct_function));
    lines.push(row("fully correct", tally.fully_correct));
    lines.push(format!("  {:<18} {}", "attempts", tally.attempts));
    if tally.errors > 0 {
        lines.push(format!("  {:<18} {}", "errors", tally.errors));
    }
}

/// Single-line, double-quoted, truncated text for YAML diagnostics.
fn quoted(s: &str, max_chars: usize) -> String {
    let oneline: String = s
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect::<String>()
        .replace('"', "\\\"");
    if oneline.chars().count() <= max_chars {
        format!("\"{}\"", oneline)
    } else {
        let cut: String = oneline.chars().take(max_chars).collect();
        format!("\"{}...\"", cut)
    }
}
