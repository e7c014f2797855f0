//! Typed contracts shared by retrieval, the model gateway and the pipeline
//!
//! Catalog matches come out of a vector index; recommendations and refined
//! queries come out of a language model as structured JSON and are only ever
//! represented through these structs.

use crate::llm::OutputSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// A single retrieval result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub title: String,
    /// Title, genres, synopsis and themes as embedded
    pub content: String,
    pub metadata: CatalogMetadata,
    /// Similarity to the query under the store's embedding space
    pub similarity: f32,
}

/// Catalog metadata; every field is absent when the catalog had no value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CatalogMetadata {
    /// Read metadata from a loosely typed index payload.
    ///
    /// Hosted indexes store whatever the ingester wrote: numbers may arrive as
    /// strings, genres as a comma separated string, and "Unknown" stands in
    /// for missing values.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| map.get(*k))
                .find_map(value_as_text)
        };
        let number = |keys: &[&str]| -> Option<f64> {
            keys.iter()
                .filter_map(|k| map.get(*k))
                .find_map(value_as_number)
        };

        let genres = keys_value(map, &["genres", "Genres"]).and_then(|v| match v {
            Value::Array(items) => {
                let list: Vec<String> = items.iter().filter_map(value_as_text).collect();
                (!list.is_empty()).then_some(list)
            }
            other => value_as_text(other).map(|s| split_genres(&s)),
        });

        Self {
            id: text(&["id", "mal_id", "MAL_ID"]),
            score: number(&["score", "Score"]),
            episodes: number(&["episodes", "Episodes"])
                .filter(|n| *n >= 0.0)
                .map(|n| n.round() as u32),
            rating: text(&["rating", "Rating"]),
            genres: genres.filter(|g| !g.is_empty()),
            demographic: text(&["demographic", "Demographic"]),
            image_url: text(&["image_url", "Image URL", "poster"]),
        }
    }

    /// Genres joined for display and for model output
    pub fn genres_joined(&self) -> Option<String> {
        self.genres.as_ref().map(|g| g.join(", "))
    }
}

fn keys_value<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(text)
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Split a "Action, Adventure, Comedy" style field
pub fn split_genres(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .collect()
}

/// Output of the query refinement call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedQuery {
    pub refined_query: String,
}

impl RefinedQuery {
    pub fn output_schema() -> OutputSchema {
        OutputSchema::new(
            "refined_query",
            json!({
                "type": "object",
                "properties": {
                    "refined_query": {
                        "type": "string",
                        "description": "The refined and contextualized search query based on user input"
                    }
                },
                "required": ["refined_query"],
                "additionalProperties": false
            }),
        )
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeRecommendation {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub demographic: Option<String>,
}

/// The recommendation list shape requested from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub anime_titles: Vec<AnimeRecommendation>,
}

impl RecommendationList {
    pub fn output_schema() -> OutputSchema {
        let nullable = |kind: &str, description: &str| {
            json!({ "type": [kind, "null"], "description": description })
        };

        OutputSchema::new(
            "recommended_anime",
            json!({
                "type": "object",
                "properties": {
                    "anime_titles": {
                        "type": "array",
                        "description": "Recommended anime with details",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string", "description": "Official title" },
                                "description": nullable("string", "Complete synopsis"),
                                "score": nullable("number", "Rating score out of 10"),
                                "image_url": nullable("string", "Poster image URL"),
                                "episodes": nullable("integer", "Total episode count"),
                                "rating": nullable("string", "Age classification"),
                                "genres": nullable("string", "All applicable genres, comma separated"),
                                "demographic": nullable("string", "Shounen, Seinen, Shoujo, etc.")
                            },
                            "required": [
                                "title", "description", "score", "image_url",
                                "episodes", "rating", "genres", "demographic"
                            ],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["anime_titles"],
                "additionalProperties": false
            }),
        )
    }
}

/// Episode counts sometimes come back as `24.0`
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_number)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

/// Normalized form used to compare titles across sources
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_pinecone_style_payload() {
        let payload = json!({
            "id": 20,
            "score": "7.91",
            "genres": "Action, Adventure, Comedy, Super Power, Martial Arts, Shounen",
            "episodes": 220.0,
            "rating": "PG-13 - Teens 13 or older",
            "demographic": "Unknown",
            "image_url": "https://cdn.myanimelist.net/images/anime/13/17405.jpg"
        });
        let meta = CatalogMetadata::from_json_map(payload.as_object().unwrap());

        assert_eq!(meta.id.as_deref(), Some("20"));
        assert_eq!(meta.score, Some(7.91));
        assert_eq!(meta.episodes, Some(220));
        assert_eq!(meta.genres.as_ref().map(|g| g.len()), Some(6));
        assert_eq!(meta.demographic, None);
        assert!(meta.image_url.is_some());
    }

    #[test]
    fn test_absent_metadata_is_omitted_not_defaulted() {
        let meta = CatalogMetadata::from_json_map(&Map::new());
        assert_eq!(meta, CatalogMetadata::default());

        let serialized = serde_json::to_value(&meta).unwrap();
        assert_eq!(serialized, json!({}));
    }

    #[test]
    fn test_recommendation_requires_title() {
        let missing = json!({ "description": "A ninja story", "score": 8.0 });
        assert!(serde_json::from_value::<AnimeRecommendation>(missing).is_err());

        let minimal = json!({ "title": "Naruto" });
        let rec: AnimeRecommendation = serde_json::from_value(minimal).unwrap();
        assert_eq!(rec.title, "Naruto");
        assert_eq!(rec.score, None);
    }

    #[test]
    fn test_episodes_accept_whole_floats_only() {
        let rec: AnimeRecommendation =
            serde_json::from_value(json!({ "title": "Bleach", "episodes": 366.0 })).unwrap();
        assert_eq!(rec.episodes, Some(366));

        let rec: AnimeRecommendation =
            serde_json::from_value(json!({ "title": "Bleach", "episodes": "12.5" })).unwrap();
        assert_eq!(rec.episodes, None);
    }

    #[test]
    fn test_title_key_normalizes_case_and_spacing() {
        assert_eq!(title_key("  One   Piece "), "one piece");
        assert_eq!(title_key("K-On!"), title_key("k-on!"));
    }

    #[test]
    fn test_schemas_require_every_field() {
        let schema = RecommendationList::output_schema();
        let required = &schema.schema["properties"]["anime_titles"]["items"]["required"];
        assert_eq!(required.as_array().unwrap().len(), 8);
        assert_eq!(RefinedQuery::output_schema().name, "refined_query");
    }
}
