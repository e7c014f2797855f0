//! Structured model operations: query refinement and recommendation synthesis
//!
//! Both calls request a JSON shape from the model and deserialize it into the
//! typed contracts in [`crate::schema`]. Recommendation output is then checked
//! against the retrieved context: the context decides which titles may appear
//! and supplies authoritative field values, web enrichment only fills gaps.

use super::{ChatMessage, LanguageModel};
use crate::enrich::EnrichmentRecord;
use crate::error::{AnirecError, Result};
use crate::schema::{
    title_key, AnimeRecommendation, CatalogMatch, RecommendationList, RefinedQuery,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const REFINE_SYSTEM_PROMPT: &str = "\
You rewrite anime requests into search queries for a semantic catalog search.
Turn the user's raw request into one precise, detailed description of what they want.
- Identify the themes, genres, moods and characteristics they mention
- Expand abbreviations and shorthand (e.g. \"isekai\", \"SoL\", \"mecha\")
- Clarify vague or ambiguous terms
- Keep the user's original intent; do not add preferences they did not express
Respond only with JSON matching the requested schema.";

const RECOMMEND_SYSTEM_PROMPT: &str = "\
You are an anime recommendation specialist. You receive two information sources:
1. RETRIEVED CONTEXT: catalog entries from the internal database. This is the primary, authoritative source.
2. WEB SEARCH RESULTS: external, real-time information. This is a secondary source.

Source priority:
- Recommend ONLY titles that appear in the retrieved context. Never introduce a title found only in web search results.
- Prefer values from the retrieved context for every field.
- Use web search results only to fill fields that are missing or unclear in the retrieved context, and only for titles already in the retrieved context.
- If no source has a value for a field, return null. Never invent values.

Selection:
- Rank the allowed titles by relevance to the user's query: thematic fit, genre match and quality.
- Return no duplicates and no loosely related titles.

For each title return: title (as written in the retrieved context), description (complete synopsis), score (out of 10), image_url (poster), episodes (total count), rating (age classification), genres (comma separated), demographic (Shounen, Seinen, Shoujo, ...).
Respond only with JSON matching the requested schema, without commentary.";

/// Language-model gateway bound to one provider
pub struct Gateway {
    model: Arc<dyn LanguageModel>,
}

impl Gateway {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Rewrite a raw user request into a search-optimized description
    pub async fn refine(&self, raw_query: &str) -> Result<RefinedQuery> {
        let raw_query = raw_query.trim();
        if raw_query.is_empty() {
            return Err(AnirecError::InvalidInput("query is empty".to_string()));
        }

        let messages = vec![
            ChatMessage::system(REFINE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Refine the following input into a detailed and precise query:\n\nInput: {}",
                raw_query
            )),
        ];

        let value = self
            .model
            .complete_structured(messages, &RefinedQuery::output_schema())
            .await?;

        let refined: RefinedQuery = serde_json::from_value(value).map_err(|e| {
            AnirecError::SynthesisFailure(format!("refinement does not match schema: {}", e))
        })?;

        let text = refined.refined_query.trim();
        if text.is_empty() {
            return Err(AnirecError::SynthesisFailure(
                "refinement returned an empty query".to_string(),
            ));
        }

        Ok(RefinedQuery {
            refined_query: text.to_string(),
        })
    }

    /// Select and describe the top `count` titles from the retrieved context
    ///
    /// Returns fewer than `count` items only when fewer distinct titles were
    /// retrieved, and an empty list without calling the model when nothing was.
    /// A reply left short after filtering is a [`AnirecError::SynthesisFailure`].
    pub async fn recommend(
        &self,
        refined_query: &str,
        context: &[CatalogMatch],
        enrichment: &HashMap<String, EnrichmentRecord>,
        count: usize,
    ) -> Result<Vec<AnimeRecommendation>> {
        if context.is_empty() {
            tracing::info!("No retrieved context; skipping synthesis");
            return Ok(Vec::new());
        }
        if count == 0 {
            tracing::debug!("Zero recommendations requested; skipping synthesis");
            return Ok(Vec::new());
        }

        let expected = count.min(distinct_titles(context));
        let messages = vec![
            ChatMessage::system(RECOMMEND_SYSTEM_PROMPT),
            ChatMessage::user(build_recommend_prompt(
                refined_query,
                context,
                enrichment,
                expected,
            )?),
        ];

        let value = self
            .model
            .complete_structured(messages, &RecommendationList::output_schema())
            .await?;

        let list: RecommendationList = serde_json::from_value(value).map_err(|e| {
            AnirecError::SynthesisFailure(format!("recommendations do not match schema: {}", e))
        })?;

        let returned = list.anime_titles.len();
        let recommendations = enforce_source_priority(list.anime_titles, context, count);

        if recommendations.len() < expected {
            return Err(AnirecError::SynthesisFailure(format!(
                "only {} of {} returned titles are distinct retrieved titles, {} required",
                recommendations.len(),
                returned,
                expected
            )));
        }

        Ok(recommendations)
    }
}

fn distinct_titles(context: &[CatalogMatch]) -> usize {
    context
        .iter()
        .map(|m| title_key(&m.title))
        .collect::<HashSet<_>>()
        .len()
}

fn build_recommend_prompt(
    refined_query: &str,
    context: &[CatalogMatch],
    enrichment: &HashMap<String, EnrichmentRecord>,
    expected: usize,
) -> Result<String> {
    let retrieved: Vec<_> = context
        .iter()
        .map(|m| {
            json!({
                "title": m.title,
                "content": m.content,
                "metadata": m.metadata,
            })
        })
        .collect();

    // Sorted so identical inputs produce identical prompts (and cache keys)
    let mut web: Vec<_> = enrichment.values().collect();
    web.sort_by(|a, b| a.title.cmp(&b.title));

    Ok(format!(
        "User's query:\n{}\n\nRetrieved context:\n{}\n\nWeb search results:\n{}\n\n\
         Return exactly {} anime from the retrieved context with all required details.",
        refined_query,
        serde_json::to_string_pretty(&retrieved)?,
        serde_json::to_string_pretty(&web)?,
        expected
    ))
}

/// Apply the source-priority rules to raw model output.
///
/// Drops titles outside the retrieved context and duplicates, keeps model order,
/// truncates to `count`, and overlays retrieved metadata wherever the catalog
/// has a value. Model-provided values (which may come from web enrichment) are
/// kept only where the catalog is silent.
pub fn enforce_source_priority(
    raw: Vec<AnimeRecommendation>,
    context: &[CatalogMatch],
    count: usize,
) -> Vec<AnimeRecommendation> {
    let allowed: HashMap<String, &CatalogMatch> = context
        .iter()
        .map(|m| (title_key(&m.title), m))
        .collect();

    let mut seen = HashSet::new();
    let mut output = Vec::with_capacity(count);

    for rec in raw {
        if output.len() == count {
            break;
        }

        let key = title_key(&rec.title);
        let Some(source) = allowed.get(&key) else {
            tracing::warn!("Dropping '{}': not in retrieved context", rec.title);
            continue;
        };
        if !seen.insert(key) {
            tracing::debug!("Dropping duplicate '{}'", rec.title);
            continue;
        }

        output.push(overlay_catalog(rec, source));
    }

    output
}

fn overlay_catalog(rec: AnimeRecommendation, source: &CatalogMatch) -> AnimeRecommendation {
    let meta = &source.metadata;
    let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

    AnimeRecommendation {
        title: source.title.clone(),
        description: non_blank(rec.description).or_else(|| synopsis_from_content(&source.content)),
        score: meta.score.or(rec.score),
        image_url: meta.image_url.clone().or(non_blank(rec.image_url)),
        episodes: meta.episodes.or(rec.episodes),
        rating: meta.rating.clone().or(non_blank(rec.rating)),
        genres: meta.genres_joined().or(non_blank(rec.genres)),
        demographic: meta.demographic.clone().or(non_blank(rec.demographic)),
    }
}

fn synopsis_from_content(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("Synopsis:"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
