//! Markdown output formatter

use super::FormatOptions;
use anirec_core::{AnimeRecommendation, CatalogMatch};

pub fn format_recommendations(recs: &[AnimeRecommendation], options: &FormatOptions) -> String {
    let mut output = String::from("# Recommended Anime\n\n");

    if let Some(query) = &options.query {
        output.push_str(&format!("> {}\n\n", query));
    }

    for (i, r) in recs.iter().enumerate() {
        output.push_str(&format!("## {}. {}\n\n", i + 1, r.title));
        if let Some(image) = &r.image_url {
            output.push_str(&format!("![{}]({})\n\n", r.title, image));
        }

        let field = |v: Option<String>| v.unwrap_or_else(|| "N/A".to_string());
        output.push_str(&format!("- **Score**: {}\n", field(r.score.map(|s| format!("{:.2}", s)))));
        output.push_str(&format!("- **Episodes**: {}\n", field(r.episodes.map(|e| e.to_string()))));
        output.push_str(&format!("- **Rating**: {}\n", field(r.rating.clone())));
        output.push_str(&format!("- **Genres**: {}\n", field(r.genres.clone())));
        output.push_str(&format!("- **Demographic**: {}\n", field(r.demographic.clone())));

        if let Some(description) = &r.description {
            output.push_str(&format!("\n{}\n", description));
        }
        output.push_str("\n---\n\n");
    }

    if recs.is_empty() {
        output.push_str("*No recommendations found*\n");
    }

    output
}

pub fn format_matches(matches: &[CatalogMatch], _options: &FormatOptions) -> String {
    let mut output = String::from("# Catalog Matches\n\n");

    for (i, m) in matches.iter().enumerate() {
        output.push_str(&format!(
            "{}. **{}** (similarity: {:.3})\n",
            i + 1,
            m.title,
            m.similarity
        ));
    }

    if matches.is_empty() {
        output.push_str("*No results found*\n");
    }

    output
}
