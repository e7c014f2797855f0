//! Output formatters

pub mod json;
pub mod markdown;
pub mod terminal;

use crate::app::OutputFormat;
use anirec_core::{AnimeRecommendation, CatalogMatch, MetricsSnapshot};
use std::time::Duration;

/// Format options
pub struct FormatOptions {
    pub query: Option<String>,
    pub refined_query: Option<String>,
    pub elapsed: Option<Duration>,
}

/// Format the ranked recommendation list
pub fn format_recommendations(
    recommendations: &[AnimeRecommendation],
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_recommendations(recommendations, options),
        OutputFormat::Md => markdown::format_recommendations(recommendations, options),
        OutputFormat::Cli => terminal::format_recommendations(recommendations, options),
    }
}

/// Format raw retrieval matches
pub fn format_matches(
    matches: &[CatalogMatch],
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_matches(matches, options),
        OutputFormat::Md => markdown::format_matches(matches, options),
        OutputFormat::Cli => terminal::format_matches(matches, options),
    }
}

/// One-line request summary for a provider client
pub fn format_usage(label: &str, metrics: &MetricsSnapshot) -> String {
    format!(
        "{}: {} requests, {} errors, {} cache hits, avg {:.0}ms",
        label,
        metrics.total_requests,
        metrics.total_errors,
        metrics.cache_hits,
        metrics.avg_latency_ms
    )
}

/// Shorten long synopses for list views
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ninja story about ", 5), "ninja...");
        // counts characters, not bytes
        assert_eq!(truncate_chars("進撃の巨人", 2), "進撃...");
    }

    #[test]
    fn test_format_usage() {
        let metrics = MetricsSnapshot {
            total_requests: 2,
            total_errors: 0,
            cache_hits: 1,
            cache_misses: 1,
            cache_hit_rate: 50.0,
            avg_latency_ms: 412.6,
        };
        assert_eq!(
            format_usage("groq llama-3.3-70b-versatile", &metrics),
            "groq llama-3.3-70b-versatile: 2 requests, 0 errors, 1 cache hits, avg 413ms"
        );
    }
}
