//! Typed view of a successful analysis result.
//!
//! The service result is an open JSON object; this picks out the fields the
//! results view shows. Anything missing or of the wrong shape becomes `None`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::job::JobResult;

/// Headlines shown in the market intelligence section.
pub const MAX_HEADLINES: usize = 9;

const RUPEES_PER_CRORE: f64 = 10_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsArticle {
    pub title: String,
    pub url: Option<String>,
    pub source: Option<String>,
    /// `Positive`, `Negative` or `Neutral` as labelled by the service.
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub ceo: Option<String>,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    /// Markdown report written by the analyst agent.
    pub report: Option<String>,
    pub articles: Vec<NewsArticle>,
}

impl AnalysisSummary {
    /// Extracts the summary of a successful result; `None` for failures.
    pub fn from_result(result: &JobResult) -> Option<Self> {
        result.analysis().map(Self::from_fields)
    }

    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let report = fields
            .get("llm_analysis")
            .and_then(Value::as_object)
            .and_then(|analysis| text(analysis, "llm_report"));

        let articles = fields
            .get("intelligence_briefing")
            .and_then(Value::as_object)
            .and_then(|briefing| briefing.get("articles"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(article).collect())
            .unwrap_or_default();

        Self {
            company_name: text(fields, "company_name"),
            sector: text(fields, "sector"),
            industry: text(fields, "industry"),
            ceo: text(fields, "ceo"),
            current_price: number(fields, "current_price"),
            previous_close: number(fields, "previous_close"),
            day_high: number(fields, "day_high"),
            day_low: number(fields, "day_low"),
            fifty_two_week_high: number(fields, "fifty_two_week_high"),
            fifty_two_week_low: number(fields, "fifty_two_week_low"),
            market_cap: number(fields, "market_cap"),
            pe_ratio: number(fields, "pe_ratio"),
            report,
            articles,
        }
    }

    /// Absolute move since the previous close.
    pub fn price_change(&self) -> Option<f64> {
        Some(self.current_price? - self.previous_close?)
    }

    /// Move since the previous close, in percent. `None` on a zero close.
    pub fn price_change_percent(&self) -> Option<f64> {
        let previous = self.previous_close?;
        if previous == 0.0 {
            return None;
        }
        Some(self.price_change()? / previous * 100.0)
    }

    /// Market capitalisation in crore.
    pub fn market_cap_crore(&self) -> Option<f64> {
        self.market_cap.map(|cap| cap / RUPEES_PER_CRORE)
    }

    /// The headlines worth showing, in delivered order.
    pub fn headlines(&self) -> &[NewsArticle] {
        &self.articles[..self.articles.len().min(MAX_HEADLINES)]
    }
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() && s != "N/A" => Some(s.clone()),
        _ => None,
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn article(item: &Value) -> Option<NewsArticle> {
    let fields = item.as_object()?;
    Some(NewsArticle {
        title: text(fields, "title")?,
        url: text(fields, "url"),
        source: text(fields, "source"),
        sentiment: text(fields, "sentiment"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis(value: Value) -> JobResult {
        match value {
            Value::Object(fields) => JobResult::Analysis(fields),
            _ => panic!("analysis fixtures must be objects"),
        }
    }

    #[test]
    fn test_full_result() {
        let result = analysis(json!({
            "company_name": "Reliance Industries Limited",
            "sector": "Energy",
            "industry": "Oil & Gas Refining & Marketing",
            "ceo": "Mukesh Ambani",
            "current_price": 2950.5,
            "previous_close": 2900.0,
            "day_high": 2960.0,
            "day_low": 2895.25,
            "fifty_two_week_high": 3217.9,
            "fifty_two_week_low": 2220.3,
            "market_cap": 19_960_000_000_000_i64,
            "pe_ratio": 28.4,
            "intelligence_briefing": {
                "articles": [
                    { "title": "Reliance beats estimates", "url": "https://news.example/1", "source": "Mint", "sentiment": "Positive" },
                    { "title": "Refining margins slip", "source": "ET", "sentiment": "Negative" }
                ]
            },
            "llm_analysis": { "llm_report": "## Verdict\nHold." }
        }));

        let summary = AnalysisSummary::from_result(&result).unwrap();
        assert_eq!(summary.company_name.as_deref(), Some("Reliance Industries Limited"));
        assert_eq!(summary.ceo.as_deref(), Some("Mukesh Ambani"));
        assert_eq!(summary.price_change(), Some(50.5));
        let percent = summary.price_change_percent().unwrap();
        assert!((percent - 1.7413).abs() < 1e-3);
        assert_eq!(summary.market_cap_crore(), Some(1_996_000.0));
        assert_eq!(summary.report.as_deref(), Some("## Verdict\nHold."));
        assert_eq!(summary.articles.len(), 2);
        assert_eq!(summary.articles[1].url, None);
        assert_eq!(summary.articles[0].sentiment.as_deref(), Some("Positive"));
    }

    #[test]
    fn test_missing_and_malformed_fields_are_none() {
        let result = analysis(json!({
            "company_name": "N/A",
            "market_cap": "N/A",
            "pe_ratio": null,
            "current_price": "101.5",
            "intelligence_briefing": { "articles": [ { "url": "no title" }, 7 ] },
            "llm_analysis": "not an object"
        }));

        let summary = AnalysisSummary::from_result(&result).unwrap();
        assert_eq!(summary.company_name, None);
        assert_eq!(summary.market_cap_crore(), None);
        assert_eq!(summary.pe_ratio, None);
        assert_eq!(summary.current_price, Some(101.5));
        assert_eq!(summary.price_change(), None);
        assert!(summary.articles.is_empty());
        assert_eq!(summary.report, None);
    }

    #[test]
    fn test_zero_previous_close_has_no_percent() {
        let summary = AnalysisSummary::from_fields(
            json!({ "current_price": 10.0, "previous_close": 0.0 })
                .as_object()
                .unwrap(),
        );
        assert_eq!(summary.price_change(), Some(10.0));
        assert_eq!(summary.price_change_percent(), None);
    }

    #[test]
    fn test_headlines_are_capped() {
        let articles: Vec<Value> = (0..12)
            .map(|i| json!({ "title": format!("Headline {}", i) }))
            .collect();
        let summary = AnalysisSummary::from_fields(
            json!({ "intelligence_briefing": { "articles": articles } })
                .as_object()
                .unwrap(),
        );
        assert_eq!(summary.articles.len(), 12);
        assert_eq!(summary.headlines().len(), MAX_HEADLINES);
        assert_eq!(summary.headlines()[0].title, "Headline 0");
    }

    #[test]
    fn test_failure_has_no_summary() {
        let failed = JobResult::Failure {
            error: "No data".into(),
            details: Map::new(),
        };
        assert!(AnalysisSummary::from_result(&failed).is_none());
    }
}
