//! Text rendering of an exposure result.

use std::fmt::Write;

use common::GexResult;

const RULE_WIDTH: usize = 60;
const TOP_STRIKES: usize = 10;

/// Render the analysis shown by `hedgeiq status`.
pub fn render_report(result: &GexResult) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "FLOW-BASED GEX ANALYSIS");
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "Spot:       {}", money(result.spot_price));
    let _ = writeln!(out, "Computed:   {}", result.timestamp.to_rfc3339());
    if let Some(snapshot_at) = result.snapshot_at {
        let _ = writeln!(out, "Snapshot:   {}", snapshot_at.to_rfc3339());
    }

    if result.is_empty() {
        let _ = writeln!(out, "\nNo exposure data: no dealer positions on live instruments.");
        let _ = write!(out, "{}", heavy);
        return out;
    }

    let _ = writeln!(out, "\nNet GEX:    {}", money(result.net_gex));
    let _ = writeln!(out, "  -> {}", result.regime().label());

    match result.flip_level {
        Some(flip) => {
            let distance = (flip - result.spot_price) / result.spot_price * 100.0;
            let _ = writeln!(out, "\nFlip level: {} ({:+.2}% from spot)", money(flip), distance);
            if result.spot_price > flip {
                let _ = writeln!(out, "  -> spot above flip");
            } else {
                let _ = writeln!(out, "  -> spot below flip");
            }
        }
        None => {
            let _ = writeln!(out, "\nFlip level: none within range");
        }
    }

    let _ = writeln!(
        out,
        "\nMax support:    {} (GEX {})",
        money(result.max_support.0 as f64),
        money(result.max_support.1)
    );
    let _ = writeln!(
        out,
        "Max resistance: {} (GEX {})",
        money(result.max_resistance.0 as f64),
        money(result.max_resistance.1)
    );

    let _ = writeln!(out, "\n{}", light);
    let _ = writeln!(out, "TOP STRIKES BY |GEX|");
    let _ = writeln!(out, "{}", light);

    let mut rows: Vec<_> = result.gex_by_strike.iter().collect();
    rows.sort_by(|a, b| b.gex.abs().total_cmp(&a.gex.abs()));
    for row in rows.into_iter().take(TOP_STRIKES) {
        let level = if row.gex > 0.0 { "SUPPORT" } else { "RESISTANCE" };
        let _ = writeln!(
            out,
            "{:>12} | GEX {:>16} | pos {:>10.1} | {}",
            money(row.strike as f64),
            money(row.gex),
            row.dealer_position,
            level
        );
    }
    let _ = write!(out, "{}", heavy);
    out
}

/// `$1,234,567` with sign, rounded to whole units.
fn money(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
