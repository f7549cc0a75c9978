//! Key-point extraction via a Gemini-style generative endpoint.
//!
//! The model output is untrusted text: it gets unfenced, parsed defensively,
//! and on any failure the caller still receives a well-formed list with a
//! single explanatory entry instead of an error, since key points are
//! supplementary.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

// Models love wrapping JSON answers in markdown fences despite instructions.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```\s*$").unwrap());

/// Extracts salient points from review text with a single generative call.
pub struct KeyPointExtractor {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl KeyPointExtractor {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }

    /// Always returns a non-empty list. A failed call yields a single
    /// explanatory entry rather than an empty result, so the caller can see
    /// what happened.
    pub async fn extract(&self, review_text: &str) -> Vec<String> {
        match self.generate(review_text).await {
            Ok(raw) => parse_key_points(&raw),
            Err(e) => {
                eprintln!("❌ Key point extraction failed: {}", e);
                vec![format!("Error extracting key points: {}", e)]
            }
        }
    }

    fn build_prompt(review_text: &str) -> String {
        format!(
            "Analyze this product review and extract the key points.\n\
             Provide the output as a JSON array of strings, where each string is a key point.\n\
             Focus on important aspects like quality, price, features, pros, and cons.\n\
             Keep each point concise (max 15 words), preserve the sentiment of the review in each point,\n\
             and write the points in the same language as the review.\n\
             \n\
             Review: {}\n\
             \n\
             Return ONLY the JSON array, no other text.\n\
             Example format: [\"Good quality\", \"Fast delivery\", \"Expensive price\"]",
            review_text
        )
    }

    // Single call, no retry loop: a failure here surfaces as data, never as
    // a pipeline failure.
    async fn generate(&self, review_text: &str) -> Result<String> {
        let url = format!("{}?key={}", self.api_url, self.api_key);

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Self::build_prompt(review_text),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.3,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 1024,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Gemini request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Gemini API error {}", response.status());
        }

        let body: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        body.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.trim().to_string())
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))
    }
}

/// Strips a surrounding triple-backtick fence (with optional `json` tag).
/// Unfenced input comes back untouched.
pub fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Parses the model output as a JSON array of strings; anything else is
/// wrapped whole as a single-element list.
pub fn parse_key_points(raw: &str) -> Vec<String> {
    let cleaned = strip_code_fence(raw.trim());
    match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(points) => points,
        Err(_) => vec![cleaned.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json_array() {
        let points = parse_key_points(r#"["Good quality", "Fast delivery", "Expensive price"]"#);
        assert_eq!(points, vec!["Good quality", "Fast delivery", "Expensive price"]);
    }

    #[test]
    fn test_fenced_json_parses_identically() {
        let unfenced = r#"["Good quality", "Expensive price"]"#;
        let fenced = "```json\n[\"Good quality\", \"Expensive price\"]\n```";
        let fenced_no_tag = "```\n[\"Good quality\", \"Expensive price\"]\n```";

        assert_eq!(parse_key_points(fenced), parse_key_points(unfenced));
        assert_eq!(parse_key_points(fenced_no_tag), parse_key_points(unfenced));
    }

    #[test]
    fn test_unparsable_output_wrapped_as_single_point() {
        let points = parse_key_points("The battery is good but the screen scratches");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0], "The battery is good but the screen scratches");
    }

    #[test]
    fn test_non_string_array_wrapped_whole() {
        let points = parse_key_points(r#"[{"point": "quality"}]"#);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_strip_fence_leaves_inner_backticks_alone() {
        assert_eq!(strip_code_fence("no fence here"), "no fence here");
        assert_eq!(strip_code_fence("```json\n[]\n```"), "[]");
    }

    #[tokio::test]
    async fn test_extract_failure_is_visible_as_data() {
        let extractor = KeyPointExtractor::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9".to_string(),
            "test-key".to_string(),
        );

        let points = extractor.extract("Great phone, love the camera").await;
        assert_eq!(points.len(), 1);
        assert!(points[0].starts_with("Error extracting key points:"));
    }
}
