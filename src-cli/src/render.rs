//! Terminal rendering of job views.

use chrono::{DateTime, Local, Utc};
use quantview::presentation::job_title;
use quantview::{present, AnalysisSummary, FailureView, Job, JobStatus, ViewError};

fn glyph(icon: &str) -> &'static str {
    match icon {
        "database" => "[data]",
        "search" => "[news]",
        "bot" => "[ai]",
        "check-circle" => "[done]",
        "x-circle" => "[fail]",
        _ => "[wait]",
    }
}

/// One line describing where a job currently is.
pub fn status_line(job: &Job) -> String {
    let shown = present(job.status());
    let stage = match job.status().stage() {
        Some(stage @ 1..=3) => format!(" ({}/3)", stage),
        _ => String::new(),
    };
    format!(
        "{} {}{}: {}",
        glyph(shown.icon),
        job_title(job),
        stage,
        shown.message
    )
}

pub fn local_time(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%d %b %Y, %H:%M")
        .to_string()
}

/// A row of the history listing.
pub fn history_row(job: &Job) -> String {
    let when = job
        .created_at()
        .map(local_time)
        .unwrap_or_else(|| "-".to_string());
    let outcome = match job.status() {
        JobStatus::Success => "succeeded",
        JobStatus::Failed => "failed",
        other => other.as_str(),
    };
    format!(
        "{:<38} {:<14} {:<20} {}",
        job.id(),
        job.ticker(),
        when,
        outcome
    )
}

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("₹{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

fn plain(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

/// The results view of a successful job.
pub fn summary(job: &Job, summary: &AnalysisSummary) -> String {
    let mut out = Vec::new();
    let name = summary
        .company_name
        .clone()
        .unwrap_or_else(|| job.ticker().to_string());
    out.push(format!("{} ({})", name, job.ticker()));
    out.push(format!(
        "  {} / {}   CEO: {}",
        text(&summary.sector),
        text(&summary.industry),
        text(&summary.ceo)
    ));

    let change = match (summary.price_change(), summary.price_change_percent()) {
        (Some(abs), Some(pct)) => format!(" ({:+.2}, {:+.2}%)", abs, pct),
        _ => String::new(),
    };
    out.push(format!("  Price:      {}{}", money(summary.current_price), change));
    out.push(format!(
        "  Day range:  {} - {}",
        money(summary.day_low),
        money(summary.day_high)
    ));
    out.push(format!(
        "  52 weeks:   {} - {}",
        money(summary.fifty_two_week_low),
        money(summary.fifty_two_week_high)
    ));
    let market_cap = summary
        .market_cap_crore()
        .map(|cr| format!("₹{:.2} Cr", cr))
        .unwrap_or_else(|| "N/A".to_string());
    out.push(format!("  Market cap: {}", market_cap));
    out.push(format!("  P/E:        {}", plain(summary.pe_ratio)));

    if let Some(report) = &summary.report {
        out.push(String::new());
        out.push("Analyst report".to_string());
        out.extend(report.lines().map(|line| format!("  {}", line)));
    }

    out.push(String::new());
    if summary.headlines().is_empty() {
        out.push("No news articles found for this symbol.".to_string());
    } else {
        out.push("Market intelligence".to_string());
        for article in summary.headlines() {
            let source = article.source.as_deref().unwrap_or("unknown source");
            match &article.sentiment {
                Some(sentiment) => {
                    out.push(format!("  [{}] {} ({})", sentiment, article.title, source))
                }
                None => out.push(format!("  {} ({})", article.title, source)),
            }
        }
    }

    out.join("\n")
}

pub fn failure(view: &FailureView) -> String {
    [
        view.headline.to_string(),
        format!("  {}", view.explanation),
        format!("  {}", view.hint),
        format!("  Technical details: {}", view.technical_detail),
    ]
    .join("\n")
}

pub fn error(err: &ViewError) -> String {
    format!("{}\n  {}", err.message, err.detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantview::JobResult;
    use serde_json::json;

    #[test]
    fn test_status_line_shows_stage() {
        let job = Job::from_parts("j1", "TCS.NS", JobStatus::IntelligenceGathering, None);
        let line = status_line(&job);
        assert!(line.starts_with("[news] Analysis for TCS.NS (2/3)"));
        assert!(line.ends_with("scanning news..."));

        let queued = status_line(&Job::pending("j2", "INFY.NS"));
        assert_eq!(
            queued,
            "[wait] Analysis for INFY.NS: Your analysis is in the queue."
        );
    }

    #[test]
    fn test_history_row_without_timestamp() {
        let job = Job::from_parts(
            "j3",
            "NOPE.NS",
            JobStatus::Failed,
            Some(json!({ "error": "delisted" })),
        );
        let row = history_row(&job);
        assert!(row.starts_with("j3"));
        assert!(row.contains("NOPE.NS"));
        assert!(row.contains(" - "));
        assert!(row.ends_with("failed"));
    }

    #[test]
    fn test_summary_handles_missing_fields() {
        let job = Job::from_parts(
            "j4",
            "SBIN.NS",
            JobStatus::Success,
            Some(json!({ "current_price": 812.4, "previous_close": 800.0 })),
        );
        let result: &JobResult = job.result().unwrap();
        let rendered = summary(&job, &AnalysisSummary::from_result(result).unwrap());

        assert!(rendered.starts_with("SBIN.NS (SBIN.NS)"));
        assert!(rendered.contains("₹812.40 (+12.40, +1.55%)"));
        assert!(rendered.contains("Market cap: N/A"));
        assert!(rendered.contains("No news articles found"));
    }
}
