//! JSON output formatter

use super::FormatOptions;
use anirec_core::{AnimeRecommendation, CatalogMatch};

pub fn format_recommendations(recs: &[AnimeRecommendation], options: &FormatOptions) -> String {
    let output = serde_json::json!({
        "query": options.query,
        "refined_query": options.refined_query,
        "recommendations": recs,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_matches(matches: &[CatalogMatch], _options: &FormatOptions) -> String {
    let output: Vec<serde_json::Value> = matches
        .iter()
        .map(|m| {
            serde_json::json!({
                "title": m.title,
                "similarity": m.similarity,
                "metadata": m.metadata,
            })
        })
        .collect();

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string()) + "\n"
}
