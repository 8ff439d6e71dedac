//! Text rendering of impact results.
//!
//! The renderer works only from an [`ImpactResult`] and the period metadata it
//! carries. It never recomputes statistics, so any front end (terminal, web
//! page, notebook) can reuse the same wording.

use crate::results::ImpactResult;

const LABEL_WIDTH: usize = 18;
const COLUMN_WIDTH: usize = 24;

/// Full report: header, summary table and narrative.
pub fn render_report(result: &ImpactResult) -> String {
    let mut out = String::new();
    out.push_str(&render_header(result));
    out.push('\n');
    out.push_str(&render_summary_table(result));
    out.push('\n');
    out.push_str(&render_narrative(result));
    out
}

/// Target, controls and period boundaries.
pub fn render_header(result: &ImpactResult) -> String {
    let meta = &result.metadata;
    let mut out = String::new();
    out.push_str(&format!(
        "Counterfactual impact analysis: {}\n",
        meta.target_name
    ));
    out.push_str(&format!("Controls: {}\n", meta.control_names.join(", ")));
    out.push_str(&format!(
        "Pre-period:  {} ({} observations)\n",
        meta.pre_period,
        meta.pre_observations()
    ));
    out.push_str(&format!(
        "Post-period: {} ({} observations)\n",
        meta.post_period,
        meta.post_observations()
    ));
    out
}

/// Average / cumulative table of actual, predicted, band and effects.
pub fn render_summary_table(result: &ImpactResult) -> String {
    let avg_band = result.average_band;
    let cum_band = result.cumulative_band;
    let relative = match result.relative_effect {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "undefined".to_string(),
    };
    let band_label = format!("{}% CI", format_percent(result.confidence_level()));

    let rows = [
        ("", "Average".to_string(), "Cumulative".to_string()),
        (
            "Actual",
            format!("{:.2}", result.mean_actual),
            format!("{:.2}", result.sum_actual()),
        ),
        (
            "Predicted",
            format!("{:.2}", result.mean_predicted),
            format!("{:.2}", result.sum_predicted()),
        ),
        (
            band_label.as_str(),
            format!("[{:.2}, {:.2}]", avg_band.lower, avg_band.upper),
            format!("[{:.2}, {:.2}]", cum_band.lower, cum_band.upper),
        ),
        (
            "Absolute effect",
            format!("{:.2}", result.average_effect()),
            format!("{:.2}", result.cumulative_impact),
        ),
        ("Relative effect", relative.clone(), relative),
    ];

    let mut out = String::new();
    for (label, average, cumulative) in &rows {
        out.push_str(&format!(
            "{:<lw$}{:>cw$}{:>cw$}\n",
            label,
            average,
            cumulative,
            lw = LABEL_WIDTH,
            cw = COLUMN_WIDTH
        ));
    }
    out
}

/// Narrative paragraph with the verdict.
pub fn render_narrative(result: &ImpactResult) -> String {
    let meta = &result.metadata;
    let mut out = String::new();

    out.push_str(&format!(
        "During the post-period ({}), {} averaged {:.2} against a counterfactual prediction of {:.2}, \
         an average absolute effect of {:.2}. ",
        meta.post_period,
        meta.target_name,
        result.mean_actual,
        result.mean_predicted,
        result.average_effect()
    ));

    match result.relative_effect {
        Some(r) => out.push_str(&format!(
            "Summed over {} observations the cumulative effect was {:.2}, a {}. ",
            meta.post_observations(),
            result.cumulative_impact,
            format_relative_effect(r)
        )),
        None => out.push_str(&format!(
            "Summed over {} observations the cumulative effect was {:.2}; the relative effect is undefined \
             because the counterfactual sums to zero. ",
            meta.post_observations(),
            result.cumulative_impact
        )),
    }

    let verdict = if result.effect_detected {
        "detected"
    } else {
        "not detected"
    };
    out.push_str(&format!(
        "The two-sided test of the cumulative effect gives p = {:.3}; a causal effect was {} at the {}% confidence level.\n",
        result.p_value,
        verdict,
        format_percent(result.confidence_level())
    ));
    out.push_str(
        "Bands and p-value rely on a normal approximation that ignores coefficient uncertainty in the cumulative test.\n",
    );
    out
}

/// `"{:.1}% increase"` or `"{:.1}% decrease"` for a relative effect given as a fraction.
pub fn format_relative_effect(relative: f64) -> String {
    let direction = if relative >= 0.0 { "increase" } else { "decrease" };
    format!("{:.1}% {}", (relative * 100.0).abs(), direction)
}

/// 0.95 → "95", 0.975 → "97.5"
fn format_percent(fraction: f64) -> String {
    let text = format!("{:.1}", fraction * 100.0);
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}
