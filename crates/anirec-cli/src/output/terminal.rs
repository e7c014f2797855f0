//! Terminal output formatter

use super::{truncate_chars, FormatOptions};
use anirec_core::{AnimeRecommendation, CatalogMatch};

const SYNOPSIS_CHARS: usize = 280;

pub fn format_recommendations(recs: &[AnimeRecommendation], options: &FormatOptions) -> String {
    let mut output = String::new();

    if let Some(refined) = &options.refined_query {
        output.push_str(&format!("Refined query: {}\n\n", refined));
    }

    if recs.is_empty() {
        output.push_str("No recommendations found. Try rephrasing your request.\n");
        return output;
    }

    for (i, rec) in recs.iter().enumerate() {
        let score = rec
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "N/A".to_string());
        output.push_str(&format!("{}. {} [{}]\n", i + 1, rec.title, score));

        let mut facts = Vec::new();
        if let Some(episodes) = rec.episodes {
            facts.push(format!("{} episodes", episodes));
        }
        if let Some(demographic) = &rec.demographic {
            facts.push(demographic.clone());
        }
        if let Some(rating) = &rec.rating {
            facts.push(rating.clone());
        }
        if !facts.is_empty() {
            output.push_str(&format!("   {}\n", facts.join(" | ")));
        }
        if let Some(genres) = &rec.genres {
            output.push_str(&format!("   Genres: {}\n", genres));
        }
        if let Some(description) = &rec.description {
            output.push_str(&format!("   {}\n", truncate_chars(description, SYNOPSIS_CHARS)));
        }
        if let Some(image) = &rec.image_url {
            output.push_str(&format!("   {}\n", image));
        }
        output.push('\n');
    }

    if let Some(elapsed) = options.elapsed {
        output.push_str(&format!("Completed in {:.2}s\n", elapsed.as_secs_f64()));
    }

    output
}

pub fn format_matches(matches: &[CatalogMatch], _options: &FormatOptions) -> String {
    let mut output = String::new();

    for m in matches {
        let score_pct = (m.similarity * 100.0).round() as i32;
        let id = m.metadata.id.as_deref().unwrap_or("-");
        output.push_str(&format!("{:>3}% {} #{}\n", score_pct, m.title, id));
        if let Some(genres) = m.metadata.genres_joined() {
            output.push_str(&format!("     {}\n", genres));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_lines() {
        let rec = AnimeRecommendation {
            title: "Naruto".to_string(),
            description: Some("A young ninja.".to_string()),
            score: Some(7.91),
            image_url: None,
            episodes: Some(220),
            rating: None,
            genres: Some("Action, Shounen".to_string()),
            demographic: Some("Shounen".to_string()),
        };
        let options = FormatOptions {
            query: None,
            refined_query: None,
            elapsed: None,
        };

        let out = format_recommendations(&[rec], &options);
        assert!(out.starts_with("1. Naruto [7.91]\n"));
        assert!(out.contains("220 episodes | Shounen"));
        assert!(out.contains("Genres: Action, Shounen"));
    }

    #[test]
    fn test_empty_recommendations_message() {
        let options = FormatOptions {
            query: None,
            refined_query: Some("mecha".to_string()),
            elapsed: None,
        };
        let out = format_recommendations(&[], &options);
        assert!(out.contains("Refined query: mecha"));
        assert!(out.contains("No recommendations found"));
    }
}
