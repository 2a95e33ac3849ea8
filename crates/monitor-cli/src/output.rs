use monitor_core::RunSummary;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_summary(status: &str, summary: &RunSummary) {
    print!("{}", format_summary(status, summary));
}

/// Headline followed by one right-aligned counter per line.
fn format_summary(status: &str, summary: &RunSummary) -> String {
    let rows = [
        ("pages", summary.pages),
        ("considered", summary.considered),
        ("skipped", summary.skipped),
        ("dispatched", summary.dispatched),
        ("accepted", summary.succeeded),
        ("failed", summary.failed),
    ];
    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = rows
        .iter()
        .map(|(_, value)| value.to_string().len())
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "Requested availability for {} sources (status: {status})\n\n",
        summary.dispatched
    );
    for (label, value) in rows {
        out.push_str(&format!(
            "  {label:<label_width$}  {value:>value_width$}\n"
        ));
    }
    out
}
